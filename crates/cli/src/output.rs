use std::env;

use eyre::{eyre, Result};
use slotwatch_check::RunReport;
use slotwatch_common::utils::io::file::write_file;

/// Exit status of a run with no mismatches and no errors.
pub(crate) const EXIT_CLEAN: i32 = 0;
/// Bit set in the exit status when at least one slot diverged.
pub(crate) const EXIT_MISMATCH: i32 = 1;
/// Bit set in the exit status when at least one descriptor could not be checked.
pub(crate) const EXIT_ERROR: i32 = 2;
/// Exit status when the command failed before any report was produced.
pub(crate) const EXIT_STARTUP: i32 = 4;

/// The process exit status for a finished run. Mismatches and errors are independent bits, so
/// a run with both exits with `3`.
pub(crate) fn exit_code(report: &RunReport) -> i32 {
    let mut code = EXIT_CLEAN;
    if report.has_mismatches() {
        code |= EXIT_MISMATCH;
    }
    if report.has_errors() {
        code |= EXIT_ERROR;
    }
    code
}

/// build a standardized output path for the given parameters. follows the following cases:
/// - if `output` is empty or `print`, return `None`
/// - if `output` is the default value (`output`), return `{cwd}/output/{filename}`
/// - if `output` is specified, return `{output}/{filename}`
pub(crate) fn build_output_path(output: &str, filename: &str) -> Result<Option<String>> {
    match output {
        "" | "print" => Ok(None),
        "output" => {
            let cwd = env::current_dir()?
                .into_os_string()
                .into_string()
                .map_err(|_| eyre!("Unable to get current working directory"))?;
            Ok(Some(format!("{}/output/{}", cwd, filename)))
        }
        _ => Ok(Some(format!("{}/{}", output.trim_end_matches('/'), filename))),
    }
}

/// The report filename, prefixed with `name` when one is given.
pub(crate) fn report_filename(name: &str) -> String {
    if name.is_empty() {
        "report.json".to_string()
    } else {
        format!("{}-report.json", name)
    }
}

/// Writes `report` as pretty json to the location `output` selects, or prints it when `output`
/// is `print`. Returns the path written, if any.
pub(crate) fn write_report(report: &RunReport, output: &str, name: &str) -> Result<Option<String>> {
    let json = serde_json::to_string_pretty(report)?;

    if output == "print" {
        println!("{}", json);
        return Ok(None);
    }

    let path = build_output_path(output, &report_filename(name))?;
    if let Some(path) = &path {
        write_file(path, &json)?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotwatch_check::{CheckFailure, ErrorKind, Mismatch, MismatchKind, Outcome};

    fn mismatch(id: &str) -> Outcome {
        Outcome::Mismatch {
            id: id.to_string(),
            mismatches: vec![Mismatch {
                descriptor_id: id.to_string(),
                contract_name: "Vault".to_string(),
                contract_address: "0x0000000000000000000000000000000000000001".to_string(),
                slot_name: Some("owner".to_string()),
                slot_address: Some("0x0".to_string()),
                key: None,
                kind: MismatchKind::Value,
                expected: "0x1".to_string(),
                observed: Some("0x2".to_string()),
            }],
        }
    }

    fn error(id: &str) -> Outcome {
        Outcome::Error {
            id: id.to_string(),
            cause: CheckFailure { kind: ErrorKind::Transport, message: "timed out".to_string() },
        }
    }

    fn ok(id: &str) -> Outcome {
        Outcome::Ok { id: id.to_string() }
    }

    #[test]
    fn test_exit_code_clean() {
        assert_eq!(exit_code(&RunReport::default()), EXIT_CLEAN);
        assert_eq!(exit_code(&RunReport { outcomes: vec![ok("a"), ok("b")] }), EXIT_CLEAN);
    }

    #[test]
    fn test_exit_code_bits() {
        assert_eq!(exit_code(&RunReport { outcomes: vec![ok("a"), mismatch("b")] }), 1);
        assert_eq!(exit_code(&RunReport { outcomes: vec![error("a"), ok("b")] }), 2);
        assert_eq!(exit_code(&RunReport { outcomes: vec![mismatch("a"), error("b")] }), 3);
    }

    #[test]
    fn test_output_disabled() {
        assert_eq!(build_output_path("", "report.json").expect("failed to build path"), None);
        assert_eq!(build_output_path("print", "report.json").expect("failed to build path"), None);
    }

    #[test]
    fn test_output_default() {
        let path = build_output_path("output", "report.json")
            .expect("failed to build output path")
            .expect("path should be set");
        assert!(path.ends_with("/output/report.json"));
    }

    #[test]
    fn test_output_specified() {
        let path = build_output_path("/some_dir/", "nightly-report.json")
            .expect("failed to build output path");
        assert_eq!(path, Some("/some_dir/nightly-report.json".to_string()));
    }

    #[test]
    fn test_report_filename() {
        assert_eq!(report_filename(""), "report.json");
        assert_eq!(report_filename("nightly"), "nightly-report.json");
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let output = dir.path().to_str().expect("temp dir should be utf-8");
        let report = RunReport { outcomes: vec![ok("a"), mismatch("b"), error("c")] };

        let path = write_report(&report, output, "nightly")
            .expect("failed to write report")
            .expect("path should be set");
        assert!(path.ends_with("nightly-report.json"));

        let written = std::fs::read_to_string(&path).expect("failed to read report");
        let parsed: RunReport = serde_json::from_str(&written).expect("report should parse");
        assert_eq!(parsed, report);
    }
}
