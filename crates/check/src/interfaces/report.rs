use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};

/// What kind of divergence a [`Mismatch`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// A scalar slot holds a different word.
    Value,
    /// The length word at an array's primary slot differs.
    Length,
    /// A derived array element or mapping entry holds a different word.
    Entry,
}

/// A detected divergence between expected and observed storage content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    /// The id of the descriptor that produced this mismatch.
    pub descriptor_id: String,
    /// The human label of the contract.
    pub contract_name: String,
    /// The contract whose storage diverged.
    pub contract_address: String,
    /// The configured slot name, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_name: Option<String>,
    /// The configured slot address, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_address: Option<String>,
    /// The specific derived key that was checked, for array entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// What diverged.
    pub kind: MismatchKind,
    /// The previous, expected value.
    pub expected: String,
    /// The newly observed value. Length mismatches are reported without one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<String>,
}

impl Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            MismatchKind::Value => "slot value changed",
            MismatchKind::Length => "array length changed",
            MismatchKind::Entry => "array entry changed",
        };
        write!(f, "[{}] {what} in {}", self.descriptor_id, self.contract_name)?;
        write!(f, " ({})", self.contract_address)?;

        if let Some(slot_name) = &self.slot_name {
            write!(f, " slot name: {slot_name}")?;
        }
        if let Some(slot_address) = &self.slot_address {
            write!(f, " slot address: {slot_address}")?;
        }
        if let Some(key) = &self.key {
            write!(f, " key: {key}")?;
        }

        write!(f, " previous: {}", self.expected)?;
        match &self.observed {
            Some(observed) => write!(f, " new: {observed}"),
            None => Ok(()),
        }
    }
}

/// A descriptor-level failure, as recorded in a run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    /// The category of the failure.
    pub kind: ErrorKind,
    /// The rendered cause.
    pub message: String,
}

impl From<&Error> for CheckFailure {
    fn from(error: &Error) -> Self {
        Self { kind: error.kind(), message: error.to_string() }
    }
}

impl From<Error> for CheckFailure {
    fn from(error: Error) -> Self {
        Self::from(&error)
    }
}

/// The result of checking a single descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Every compared value matched.
    Ok {
        /// The descriptor id.
        id: String,
    },
    /// At least one value diverged.
    Mismatch {
        /// The descriptor id.
        id: String,
        /// Each divergence, in check order.
        mismatches: Vec<Mismatch>,
    },
    /// The descriptor could not be checked.
    Error {
        /// The descriptor id.
        id: String,
        /// Why the check failed.
        cause: CheckFailure,
    },
}

impl Outcome {
    /// The id of the descriptor this outcome belongs to.
    pub fn id(&self) -> &str {
        match self {
            Outcome::Ok { id } | Outcome::Mismatch { id, .. } | Outcome::Error { id, .. } => id,
        }
    }

    /// Converts the result of a single check into an outcome.
    pub fn from_result(id: &str, result: Result<Vec<Mismatch>, Error>) -> Self {
        match result {
            Ok(mismatches) if mismatches.is_empty() => Outcome::Ok { id: id.to_string() },
            Ok(mismatches) => Outcome::Mismatch { id: id.to_string(), mismatches },
            Err(e) => Outcome::Error { id: id.to_string(), cause: e.into() },
        }
    }
}

/// Counts of each outcome in a [`RunReport`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Descriptors checked.
    pub checked: usize,
    /// Descriptors with no divergence.
    pub ok: usize,
    /// Descriptors with at least one mismatch.
    pub mismatched: usize,
    /// Total mismatches across all descriptors.
    pub mismatches: usize,
    /// Descriptors that could not be checked.
    pub errors: usize,
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked={} ok={} mismatched={} mismatches={} errors={}",
            self.checked, self.ok, self.mismatched, self.mismatches, self.errors
        )
    }
}

/// The per-run result: one [`Outcome`] per descriptor, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Outcomes, in the order the descriptors were supplied.
    pub outcomes: Vec<Outcome>,
}

impl RunReport {
    /// Every mismatch in the run, in report order.
    pub fn mismatches(&self) -> impl Iterator<Item = &Mismatch> {
        self.outcomes.iter().flat_map(|outcome| match outcome {
            Outcome::Mismatch { mismatches, .. } => mismatches.as_slice(),
            _ => &[][..],
        })
    }

    /// Every descriptor-level error in the run, as `(descriptor id, cause)`.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &CheckFailure)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            Outcome::Error { id, cause } => Some((id.as_str(), cause)),
            _ => None,
        })
    }

    /// Whether any descriptor diverged.
    pub fn has_mismatches(&self) -> bool {
        self.outcomes.iter().any(|outcome| matches!(outcome, Outcome::Mismatch { .. }))
    }

    /// Whether any descriptor could not be checked.
    pub fn has_errors(&self) -> bool {
        self.outcomes.iter().any(|outcome| matches!(outcome, Outcome::Error { .. }))
    }

    /// Whether every descriptor matched.
    pub fn is_clean(&self) -> bool {
        !self.has_mismatches() && !self.has_errors()
    }

    /// Outcome counts.
    pub fn summary(&self) -> RunSummary {
        self.outcomes.iter().fold(
            RunSummary { checked: self.outcomes.len(), ..Default::default() },
            |mut summary, outcome| {
                match outcome {
                    Outcome::Ok { .. } => summary.ok += 1,
                    Outcome::Mismatch { mismatches, .. } => {
                        summary.mismatched += 1;
                        summary.mismatches += mismatches.len();
                    }
                    Outcome::Error { .. } => summary.errors += 1,
                }
                summary
            },
        )
    }
}
