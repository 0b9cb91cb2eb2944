// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CUPS command-line facade.
//
//   - `lp`                 print submission
//   - `lpstat -e`          destination listing
//   - `lpstat -p NAME -l`  long status (fallback when IPP is unreachable)
//   - `lpoptions`          option schema, current values and default updates

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use boothprint_core::error::{BoothError, Result, SpoolerOp};
use boothprint_core::types::PrinterOptions;

use crate::command::PrintCommand;
use crate::options::{parse_current_options, printer_options};
use crate::runner::{CommandRunner, ProcessOutput};

const LPSTAT_PROGRAM: &str = "lpstat";
const LPOPTIONS_PROGRAM: &str = "lpoptions";

/// Handle on the host spooler.  Cheap to clone.
#[derive(Debug, Clone)]
pub struct Spooler {
    runner: Arc<dyn CommandRunner>,
}

impl Spooler {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Submit a print job and wait for `lp` to exit.  Returns `lp`'s stdout
    /// (the request id line).
    #[instrument(skip(self, command), fields(file = %command.file.display()))]
    pub async fn submit(&self, command: &PrintCommand) -> Result<String> {
        info!(command = %command, "executing print command");
        let output = self
            .exec(SpoolerOp::Print, command.program(), &command.args())
            .await?;
        let stdout = output.stdout.trim().to_string();
        info!(response = %stdout, "print accepted");
        Ok(stdout)
    }

    /// Names of all destinations CUPS knows about.
    #[instrument(skip(self))]
    pub async fn list_printers(&self) -> Result<Vec<String>> {
        let output = self
            .exec(SpoolerOp::ListPrinters, LPSTAT_PROGRAM, &["-e".to_string()])
            .await?;
        let printers: Vec<String> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        debug!(count = printers.len(), "listed printers");
        Ok(printers)
    }

    /// Option schema for `printer`, cross-referenced with its current
    /// values.
    ///
    /// The current-values query is best effort: if it fails the schema is
    /// still returned, with only the PPD defaults flagged.
    #[instrument(skip(self))]
    pub async fn printer_options(&self, printer: &str) -> Result<PrinterOptions> {
        let current_args = vec!["-p".to_string(), printer.to_string()];
        let schema_args = vec!["-p".to_string(), printer.to_string(), "-l".to_string()];

        let (current, schema) = tokio::join!(
            self.exec(SpoolerOp::QueryOptions, LPOPTIONS_PROGRAM, &current_args),
            self.exec(SpoolerOp::QueryOptions, LPOPTIONS_PROGRAM, &schema_args),
        );

        let current = match current {
            Ok(output) => parse_current_options(&output.stdout),
            Err(e) => {
                warn!(error = %e, "current option query failed, using PPD defaults only");
                Default::default()
            }
        };
        let schema = schema?;

        let options = printer_options(&schema.stdout, &current);
        debug!(count = options.options.len(), "parsed printer options");
        Ok(options)
    }

    /// Store default options for `printer` (or the CUPS default destination
    /// when `None`) with `lpoptions -o`.  No-op for an empty option list.
    #[instrument(skip(self, options), fields(count = options.len()))]
    pub async fn set_default_options(
        &self,
        printer: Option<&str>,
        options: &[(String, String)],
    ) -> Result<()> {
        if options.is_empty() {
            debug!("no printer options to apply");
            return Ok(());
        }

        let mut args = Vec::with_capacity(options.len() * 2 + 2);
        if let Some(name) = printer {
            args.push("-p".to_string());
            args.push(name.to_string());
        }
        for (name, value) in options {
            args.push("-o".to_string());
            args.push(format!("{name}={value}"));
        }

        self.exec(SpoolerOp::SetOptions, LPOPTIONS_PROGRAM, &args).await?;
        info!("printer options applied");
        Ok(())
    }

    /// `lpstat -p NAME -l` output, trimmed.
    #[instrument(skip(self))]
    pub async fn long_status(&self, printer: &str) -> Result<String> {
        let args = vec!["-p".to_string(), printer.to_string(), "-l".to_string()];
        let output = self.exec(SpoolerOp::Status, LPSTAT_PROGRAM, &args).await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Run one spooler command, turning spawn failures and non-zero exits
    /// into `BoothError::Spooler` with the diagnostic text.
    async fn exec(&self, op: SpoolerOp, program: &str, args: &[String]) -> Result<ProcessOutput> {
        let output = self.runner.run(program, args).await.map_err(|e| {
            error!(program, error = %e, "could not run spooler command");
            BoothError::Spooler {
                op,
                stderr: format!("{program}: {e}"),
            }
        })?;

        if !output.success {
            let stderr = output.diagnostic(program);
            error!(program, %op, stderr = %stderr, "spooler command failed");
            return Err(BoothError::Spooler { op, stderr });
        }

        Ok(output)
    }
}
