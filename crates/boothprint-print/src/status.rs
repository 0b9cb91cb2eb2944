// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer status.
//
// Asks the local CUPS scheduler for Get-Printer-Attributes over IPP
// (RFC 8011 §4.2.5) using the `ipp` crate's async client.  When IPP is not
// reachable, falls back to `lpstat -p NAME -l`.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use ipp::prelude::*;
use tracing::{debug, error, instrument, warn};

use boothprint_core::error::{BoothError, Result};
use boothprint_core::types::PrinterStatus;

use crate::spooler::Spooler;

/// Flattened attribute-name → display-value map.
pub type PrinterAttributes = HashMap<String, String>;

/// Source of IPP printer attributes.
#[async_trait]
pub trait AttributeProbe: Send + Sync + fmt::Debug {
    async fn printer_attributes(&self, printer: &str) -> Result<PrinterAttributes>;
}

/// Queries `<base>/printers/<name>` on a CUPS server.
#[derive(Debug, Clone)]
pub struct IppProbe {
    /// Scheduler URI, e.g. `ipp://localhost:631`.
    base_uri: String,
}

impl IppProbe {
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
        }
    }

    pub fn printer_uri(&self, printer: &str) -> String {
        format!("{}/printers/{}", self.base_uri.trim_end_matches('/'), printer)
    }
}

#[async_trait]
impl AttributeProbe for IppProbe {
    #[instrument(skip(self))]
    async fn printer_attributes(&self, printer: &str) -> Result<PrinterAttributes> {
        let target = self.printer_uri(printer);
        let uri: Uri = target
            .parse()
            .map_err(|e| BoothError::PrinterUnreachable(format!("invalid URI '{target}': {e}")))?;

        let operation = IppOperationBuilder::get_printer_attributes(uri.clone()).build();
        let client = AsyncIppClient::new(uri);

        debug!(uri = %target, "sending Get-Printer-Attributes");
        let response = client
            .send(operation)
            .await
            .map_err(|e| BoothError::PrinterUnreachable(format!("Get-Printer-Attributes: {e}")))?;

        if !response.header().status_code().is_success() {
            let code = response.header().status_code();
            error!(status = ?code, "Get-Printer-Attributes failed");
            return Err(BoothError::PrinterUnreachable(format!(
                "Get-Printer-Attributes returned status {code:?}"
            )));
        }

        let attrs = flatten_attributes(response.attributes());
        debug!(count = attrs.len(), "received printer attributes");
        Ok(attrs)
    }
}

/// Status of `printer`: IPP first, `lpstat` second.
pub async fn query_status(
    probe: &dyn AttributeProbe,
    spooler: &Spooler,
    printer: &str,
) -> Result<PrinterStatus> {
    match probe.printer_attributes(printer).await {
        Ok(attrs) => Ok(status_from_attributes(printer, &attrs)),
        Err(ipp_err) => {
            warn!(printer, error = %ipp_err, "IPP status unavailable, falling back to lpstat");
            match spooler.long_status(printer).await {
                Ok(text) => Ok(PrinterStatus::Cups {
                    printer: printer.to_string(),
                    status: text.clone(),
                    cups_status: text,
                }),
                Err(lpstat_err) => {
                    error!(printer, error = %lpstat_err, "lpstat status failed");
                    Err(BoothError::PrinterUnreachable(lpstat_err.detail()))
                }
            }
        }
    }
}

/// Pick the interesting attributes out of a Get-Printer-Attributes reply.
/// `ipp_status` keeps the whole reply as sorted `name = value` lines.
pub fn status_from_attributes(printer: &str, attrs: &PrinterAttributes) -> PrinterStatus {
    let mut names: Vec<&String> = attrs.keys().collect();
    names.sort();
    let dump = names
        .into_iter()
        .map(|name| format!("{name} = {}", attrs[name]))
        .collect::<Vec<_>>()
        .join("\n");

    PrinterStatus::Ipp {
        printer: printer.to_string(),
        ipp_status: dump,
        printer_state: attrs.get("printer-state").cloned(),
        printer_state_message: attrs
            .get("printer-state-message")
            .filter(|m| !m.is_empty())
            .cloned(),
        remaining_prints_message: attrs.get("marker-message").cloned(),
    }
}

/// Flatten all attribute groups in an IPP response into a single map.
fn flatten_attributes(attrs: &IppAttributes) -> PrinterAttributes {
    let mut map = HashMap::new();
    for group in attrs.groups() {
        for (name, attr) in group.attributes() {
            map.insert(name.clone(), format!("{}", attr.value()));
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::runner::testing::RecordingRunner;

    #[derive(Debug)]
    struct FixedProbe(Option<PrinterAttributes>);

    #[async_trait]
    impl AttributeProbe for FixedProbe {
        async fn printer_attributes(&self, _printer: &str) -> Result<PrinterAttributes> {
            self.0
                .clone()
                .ok_or_else(|| BoothError::PrinterUnreachable("connection refused".into()))
        }
    }

    fn attrs() -> PrinterAttributes {
        HashMap::from([
            ("printer-state".to_string(), "idle".to_string()),
            ("printer-state-message".to_string(), String::new()),
            ("marker-message".to_string(), "Prints remaining: 320".to_string()),
            ("printer-name".to_string(), "QW410".to_string()),
        ])
    }

    #[test]
    fn printer_uri_joins_base_and_name() {
        let probe = IppProbe::new("ipp://localhost:631/");
        assert_eq!(probe.printer_uri("QW410"), "ipp://localhost:631/printers/QW410");
    }

    #[test]
    fn interesting_attributes_are_extracted() {
        match status_from_attributes("QW410", &attrs()) {
            PrinterStatus::Ipp {
                ipp_status,
                printer_state,
                printer_state_message,
                remaining_prints_message,
                ..
            } => {
                assert_eq!(printer_state.as_deref(), Some("idle"));
                assert_eq!(printer_state_message, None);
                assert_eq!(remaining_prints_message.as_deref(), Some("Prints remaining: 320"));
                assert!(ipp_status.starts_with("marker-message = Prints remaining: 320\n"));
            }
            other => panic!("expected IPP status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ipp_answer_wins() {
        let runner = Arc::new(RecordingRunner::new());
        let spooler = Spooler::new(runner.clone());
        let status = query_status(&FixedProbe(Some(attrs())), &spooler, "QW410")
            .await
            .expect("status");
        assert!(matches!(status, PrinterStatus::Ipp { .. }));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn lpstat_is_the_fallback() {
        let runner = Arc::new(
            RecordingRunner::new()
                .with_stdout("lpstat -p QW410 -l", "printer QW410 is idle.  enabled since Sat\n"),
        );
        let spooler = Spooler::new(runner);
        let status = query_status(&FixedProbe(None), &spooler, "QW410")
            .await
            .expect("status");
        assert_eq!(
            status,
            PrinterStatus::Cups {
                printer: "QW410".into(),
                status: "printer QW410 is idle.  enabled since Sat".into(),
                cups_status: "printer QW410 is idle.  enabled since Sat".into(),
            }
        );
    }

    #[tokio::test]
    async fn both_failing_is_unreachable() {
        let runner = Arc::new(
            RecordingRunner::new().with_failure("lpstat", "lpstat: Invalid destination name in list \"QW410\"."),
        );
        let spooler = Spooler::new(runner);
        let err = query_status(&FixedProbe(None), &spooler, "QW410")
            .await
            .expect_err("should fail");
        assert!(matches!(err, BoothError::PrinterUnreachable(_)));
        assert!(err.to_string().contains("Invalid destination"));
    }
}
