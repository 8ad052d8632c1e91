//! Delivery of finished run reports.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use colored::Colorize;
use serde::Serialize;
use slotwatch_check::{Outcome, RunReport, RunSummary};
use slotwatch_common::utils::http::post_json_to_url;
use tracing::{debug, error};

/// A channel a finished [`RunReport`] is delivered to.
#[async_trait]
pub(crate) trait Notifier: Send + Sync {
    /// A short name for log lines.
    fn name(&self) -> &'static str;

    /// Delivers `report`.
    async fn notify(&self, report: &RunReport) -> eyre::Result<()>;
}

/// Delivers `report` to every notifier. A failed delivery is logged and never aborts the
/// remaining ones.
pub(crate) async fn deliver(report: &RunReport, notifiers: &[Box<dyn Notifier>]) {
    for notifier in notifiers {
        match notifier.notify(report).await {
            Ok(()) => debug!("delivered report via {}", notifier.name()),
            Err(e) => error!("failed to deliver report via {}: {}", notifier.name(), e),
        }
    }
}

/// Prints a colored, one-line-per-finding rendering of the report to stdout.
#[derive(Debug, Default)]
pub(crate) struct ConsoleNotifier;

impl ConsoleNotifier {
    /// The uncolored lines [`ConsoleNotifier`] prints for `report`, summary last.
    pub(crate) fn render(report: &RunReport) -> Vec<String> {
        let mut lines = Vec::new();

        for outcome in &report.outcomes {
            match outcome {
                Outcome::Ok { id } => lines.push(format!("ok       {}", id)),
                Outcome::Mismatch { mismatches, .. } => {
                    lines.extend(mismatches.iter().map(|mismatch| format!("mismatch {}", mismatch)))
                }
                Outcome::Error { id, cause } => {
                    lines.push(format!("error    [{}] {}: {}", id, cause.kind, cause.message))
                }
            }
        }

        lines.push(format!("summary  {}", report.summary()));
        lines
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn notify(&self, report: &RunReport) -> eyre::Result<()> {
        for line in Self::render(report) {
            let line = line.as_str();
            let colored = match line.split_once(' ').map(|(status, _)| status) {
                Some("ok") => line.green(),
                Some("mismatch") => line.yellow(),
                Some("error") => line.red(),
                _ if report.is_clean() => line.bold(),
                _ => line.bold().red(),
            };
            println!("{}", colored);
        }
        Ok(())
    }
}

/// The json body posted by [`WebhookNotifier`].
#[derive(Debug, Serialize)]
pub(crate) struct WebhookPayload<'a> {
    /// A plain text digest of the run, for chat integrations.
    pub(crate) text: String,
    /// When the report was delivered, RFC 3339.
    pub(crate) timestamp: String,
    /// Outcome counts.
    pub(crate) summary: RunSummary,
    /// The full report.
    pub(crate) report: &'a RunReport,
}

impl<'a> WebhookPayload<'a> {
    pub(crate) fn new(report: &'a RunReport) -> Self {
        let summary = report.summary();
        let mut text = vec![format!("slotwatch: {}", summary)];
        text.extend(report.mismatches().map(|mismatch| mismatch.to_string()));
        text.extend(report.errors().map(|(id, cause)| format!("[{}] {}", id, cause.message)));

        Self {
            text: text.join("\n"),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            summary,
            report,
        }
    }
}

/// POSTs the report as json to a webhook.
#[derive(Debug)]
pub(crate) struct WebhookNotifier {
    url: String,
    timeout: u64,
    retries: u8,
    notify_clean: bool,
}

impl WebhookNotifier {
    pub(crate) fn new(url: &str, timeout: u64, notify_clean: bool) -> Self {
        Self { url: url.to_string(), timeout, retries: 2, notify_clean }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn notify(&self, report: &RunReport) -> eyre::Result<()> {
        if report.is_clean() && !self.notify_clean {
            debug!("run is clean, skipping webhook");
            return Ok(());
        }

        post_json_to_url(&self.url, &WebhookPayload::new(report), self.timeout, self.retries)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotwatch_check::{CheckFailure, ErrorKind, Mismatch, MismatchKind};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn report() -> RunReport {
        RunReport {
            outcomes: vec![
                Outcome::Ok { id: "a".to_string() },
                Outcome::Mismatch {
                    id: "b".to_string(),
                    mismatches: vec![Mismatch {
                        descriptor_id: "b".to_string(),
                        contract_name: "Vault".to_string(),
                        contract_address: "0xB".to_string(),
                        slot_name: None,
                        slot_address: Some("0x1".to_string()),
                        key: None,
                        kind: MismatchKind::Length,
                        expected: "3".to_string(),
                        observed: None,
                    }],
                },
                Outcome::Error {
                    id: "c".to_string(),
                    cause: CheckFailure {
                        kind: ErrorKind::Transport,
                        message: "timed out".to_string(),
                    },
                },
            ],
        }
    }

    struct CountingNotifier {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn notify(&self, _report: &RunReport) -> eyre::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                eyre::bail!("channel down");
            }
            Ok(())
        }
    }

    #[test]
    fn test_console_render() {
        let lines = ConsoleNotifier::render(&report());

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "ok       a");
        assert_eq!(
            lines[1],
            "mismatch [b] array length changed in Vault (0xB) slot address: 0x1 previous: 3"
        );
        assert_eq!(lines[2], "error    [c] transport: timed out");
        assert_eq!(lines[3], "summary  checked=3 ok=1 mismatched=1 mismatches=1 errors=1");
    }

    #[test]
    fn test_webhook_payload() {
        let report = report();
        let payload = WebhookPayload::new(&report);

        assert_eq!(payload.summary, report.summary());
        assert_eq!(
            payload.text,
            "slotwatch: checked=3 ok=1 mismatched=1 mismatches=1 errors=1\n\
             [b] array length changed in Vault (0xB) slot address: 0x1 previous: 3\n\
             [c] timed out"
        );

        let json = serde_json::to_value(&payload).expect("payload should serialize");
        assert_eq!(json["report"]["outcomes"][1]["status"], "mismatch");
        assert!(json["timestamp"].as_str().is_some_and(|t| t.ends_with('Z')));
    }

    #[tokio::test]
    async fn test_clean_run_skips_webhook() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/unreachable", 1, false);
        let clean = RunReport { outcomes: vec![Outcome::Ok { id: "a".to_string() }] };

        assert!(notifier.notify(&clean).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_stop_others() {
        let calls = Arc::new(AtomicUsize::new(0));
        let notifiers: Vec<Box<dyn Notifier>> = vec![
            Box::new(CountingNotifier { calls: calls.clone(), fail: true }),
            Box::new(CountingNotifier { calls: calls.clone(), fail: false }),
        ];

        deliver(&report(), &notifiers).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
