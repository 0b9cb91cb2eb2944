// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print job execution: stage, build, submit (or simulate), clean up, count.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use boothprint_core::error::Result;
use boothprint_core::types::PrintRequest;
use boothprint_print::staging::stage;
use boothprint_print::{PrintCommand, Spooler};

use super::config_store::ConfigStore;

/// How a successful print request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintOutcome {
    /// Dry-run mode: the command was only logged.
    Simulated { command: PrintCommand },
    Printed {
        command: PrintCommand,
        /// `lp`'s request-id line.
        response: String,
        /// Supply counter after this job.
        remaining: Option<i64>,
    },
}

#[derive(Debug, Clone)]
pub struct PrintService {
    store: Arc<ConfigStore>,
    spooler: Spooler,
    staging_dir: PathBuf,
}

impl PrintService {
    pub fn new(store: Arc<ConfigStore>, spooler: Spooler, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            spooler,
            staging_dir: staging_dir.into(),
        }
    }

    /// Run one print request to completion.  The staged image is removed
    /// before this returns, whatever happened.
    pub async fn print(&self, request: &PrintRequest) -> Result<PrintOutcome> {
        let staged = stage(&request.image, &self.staging_dir).await?;
        let config = self.store.snapshot().await;
        let command = PrintCommand::build(request, &config, staged.path());

        if config.dry_run {
            info!(command = %command, "dry run, print command not executed");
            staged.remove().await;
            return Ok(PrintOutcome::Simulated { command });
        }

        let submitted = self.spooler.submit(&command).await;
        staged.remove().await;
        let response = submitted?;

        // The job is already with CUPS; a failed counter write must not turn
        // it into an error.
        let remaining = match self.store.record_successful_print().await {
            Ok(remaining) => remaining,
            Err(e) => {
                warn!(error = %e, "print succeeded but supply counter was not saved");
                config.approximative_remaining
            }
        };

        Ok(PrintOutcome::Printed {
            command,
            response,
            remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use boothprint_core::{BoothError, ImageSource};
    use boothprint_print::runner::testing::RecordingRunner;
    use serde_json::json;

    use super::*;

    struct Fixture {
        service: PrintService,
        runner: Arc<RecordingRunner>,
        store: Arc<ConfigStore>,
        dir: tempfile::TempDir,
    }

    async fn fixture(runner: RecordingRunner, config: serde_json::Value) -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, config.to_string()).expect("seed config");
        let staging = dir.path().join("uploads");
        std::fs::create_dir(&staging).expect("staging dir");

        let runner = Arc::new(runner);
        let spooler = Spooler::new(runner.clone());
        let store = Arc::new(ConfigStore::open(config_path, spooler.clone()).await);
        let service = PrintService::new(store.clone(), spooler, staging);
        Fixture {
            service,
            runner,
            store,
            dir,
        }
    }

    fn base64_request() -> PrintRequest {
        PrintRequest::new(
            ImageSource::Base64 {
                payload: "data:image/jpeg;base64,AAAA".into(),
            },
            Vec::new(),
        )
    }

    fn staging_is_empty(dir: &tempfile::TempDir) -> bool {
        std::fs::read_dir(dir.path().join("uploads"))
            .expect("read staging")
            .next()
            .is_none()
    }

    #[tokio::test]
    async fn dry_run_spawns_nothing_and_cleans_up() {
        let f = fixture(RecordingRunner::new(), json!({"dryRun": true, "approximativeRemaining": 5})).await;

        let outcome = f.service.print(&base64_request()).await.expect("print");
        assert!(matches!(outcome, PrintOutcome::Simulated { .. }));
        assert!(f.runner.calls().is_empty());
        assert!(staging_is_empty(&f.dir));
        assert_eq!(f.store.snapshot().await.approximative_remaining, Some(5));
    }

    #[tokio::test]
    async fn live_print_runs_lp_and_decrements() {
        let f = fixture(
            RecordingRunner::new().with_stdout("lp", "request id is QW410-3 (1 file(s))\n"),
            json!({"dryRun": false, "defaultPrinter": "QW410", "approximativeRemaining": 5}),
        )
        .await;

        match f.service.print(&base64_request()).await.expect("print") {
            PrintOutcome::Printed {
                command,
                response,
                remaining,
            } => {
                assert_eq!(command.flags, ["-d", "QW410"]);
                assert_eq!(response, "request id is QW410-3 (1 file(s))");
                assert_eq!(remaining, Some(4));
            }
            other => panic!("expected a live print, got {other:?}"),
        }

        let calls = f.runner.calls_to("lp");
        assert_eq!(calls.len(), 1);
        assert!(calls[0][3].ends_with(".jpg"));
        assert!(staging_is_empty(&f.dir));
    }

    #[tokio::test]
    async fn exhausted_counter_stays_at_zero() {
        let f = fixture(RecordingRunner::new(), json!({"approximativeRemaining": 0})).await;
        f.service.print(&base64_request()).await.expect("print");
        assert_eq!(f.store.snapshot().await.approximative_remaining, Some(0));
    }

    #[tokio::test]
    async fn failed_print_cleans_up_and_keeps_counter() {
        let f = fixture(
            RecordingRunner::new().with_failure("lp", "lp: Error - The printer or class does not exist."),
            json!({"defaultPrinter": "Ghost", "approximativeRemaining": 5}),
        )
        .await;

        let err = f.service.print(&base64_request()).await.expect_err("should fail");
        assert_eq!(err.detail(), "lp: Error - The printer or class does not exist.");
        assert!(staging_is_empty(&f.dir));
        assert_eq!(f.store.snapshot().await.approximative_remaining, Some(5));
    }

    #[tokio::test]
    async fn bad_base64_never_reaches_the_spooler() {
        let f = fixture(RecordingRunner::new(), json!({})).await;
        let request = PrintRequest::new(
            ImageSource::Base64 {
                payload: "%%%".into(),
            },
            Vec::new(),
        );
        let err = f.service.print(&request).await.expect_err("should fail");
        assert!(matches!(err, BoothError::InvalidImageData(_)));
        assert!(f.runner.calls().is_empty());
    }
}
