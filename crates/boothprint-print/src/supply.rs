// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Supply refresh.
//
// Runs the site's supply probe script.  The script talks to the printer
// firmware and may rewrite the config file itself; it also reports the
// media counter as a `Prints remaining: N` line on stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, instrument};

use boothprint_core::error::{BoothError, Result};

use crate::runner::CommandRunner;

const REMAINING_MARKER: &str = "Prints remaining:";

/// What a successful script run told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyReport {
    pub stdout: String,
    /// Counter read from the script's report line, if it printed one.
    pub prints_remaining: Option<i64>,
}

/// Runs the supply probe script.
#[derive(Debug, Clone)]
pub struct SupplyProbe {
    runner: Arc<dyn CommandRunner>,
    script: PathBuf,
}

impl SupplyProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, script: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            script: script.into(),
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Run the script with no arguments.  A spawn failure or non-zero exit is
    /// `BoothError::SupplyRefresh` carrying the script's stderr.
    #[instrument(skip(self), fields(script = %self.script.display()))]
    pub async fn refresh(&self) -> Result<SupplyReport> {
        let program = self.script.to_string_lossy();
        let output = self.runner.run(&program, &[]).await.map_err(|e| {
            error!(error = %e, "could not run supply script");
            BoothError::SupplyRefresh(format!("{program}: {e}"))
        })?;

        if !output.success {
            let stderr = output.diagnostic(&program);
            error!(stderr = %stderr, "supply script failed");
            return Err(BoothError::SupplyRefresh(stderr));
        }

        let prints_remaining = parse_prints_remaining(&output.stdout);
        info!(?prints_remaining, "supply refreshed");
        Ok(SupplyReport {
            stdout: output.stdout,
            prints_remaining,
        })
    }
}

/// Find the last `Prints remaining: N` in `text`.
pub fn parse_prints_remaining(text: &str) -> Option<i64> {
    text.lines().rev().find_map(|line| {
        let (_, rest) = line.split_once(REMAINING_MARKER)?;
        let digits: String = rest
            .trim_start()
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::RecordingRunner;

    #[test]
    fn report_line_is_found() {
        assert_eq!(parse_prints_remaining("Prints remaining: 320\n"), Some(320));
        assert_eq!(
            parse_prints_remaining("probing QW410\nmarker: Prints remaining:  42 (2x6)\n"),
            Some(42)
        );
        assert_eq!(parse_prints_remaining("Prints remaining: unknown"), None);
        assert_eq!(parse_prints_remaining(""), None);
    }

    #[tokio::test]
    async fn script_runs_without_arguments() {
        let runner = Arc::new(
            RecordingRunner::new().with_stdout("./scripts/refresh_supply.sh", "Prints remaining: 700\n"),
        );
        let probe = SupplyProbe::new(runner.clone(), "./scripts/refresh_supply.sh");

        let report = probe.refresh().await.expect("refresh");
        assert_eq!(report.prints_remaining, Some(700));
        assert_eq!(runner.calls(), [["./scripts/refresh_supply.sh"]]);
    }

    #[tokio::test]
    async fn script_failure_carries_stderr() {
        let runner = Arc::new(
            RecordingRunner::new().with_failure("./refresh.sh", "usb: device QW410 not found\n"),
        );
        let probe = SupplyProbe::new(runner, "./refresh.sh");
        match probe.refresh().await {
            Err(BoothError::SupplyRefresh(stderr)) => {
                assert_eq!(stderr, "usb: device QW410 not found");
            }
            other => panic!("expected supply error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_script_is_a_supply_error() {
        let runner = Arc::new(RecordingRunner::new().with_spawn_error("./gone.sh", "No such file or directory"));
        let probe = SupplyProbe::new(runner, "./gone.sh");
        let err = probe.refresh().await.expect_err("should fail");
        assert!(err.detail().contains("No such file or directory"));
    }
}
