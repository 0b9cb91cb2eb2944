// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for booth operators.
//
// The `message` strings double as the `human_error` field the booth app
// displays, so several of them are fixed wording the app already knows.

use crate::error::{BoothError, SpoolerOp};

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary shown by the booth app.
    pub message: String,
    /// What the operator should try.
    pub suggestion: String,
    /// Whether sending the same request again may succeed.
    pub retriable: bool,
}

impl HumanError {
    fn new(message: &str, suggestion: impl Into<String>, retriable: bool) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            retriable,
        }
    }
}

/// Convert a `BoothError` into something an operator standing at the booth
/// can act on.
pub fn humanize_error(err: &BoothError) -> HumanError {
    match err {
        BoothError::NoImageData => HumanError::new(
            "No image data provided",
            "Send the photo as a `photo` upload or as a base64 `image` field.",
            false,
        ),

        BoothError::InvalidImageData(_) => HumanError::new(
            "Error processing image data",
            "The image field is not valid base64. Re-export the photo and try again.",
            false,
        ),

        BoothError::MissingPrinter => HumanError::new(
            "Missing printer parameter",
            "Add ?printer=<name> to the request. GET /printers lists the names.",
            false,
        ),

        BoothError::Upload(_) => HumanError::new(
            "Upload rejected",
            "Send a single photo of at most 10 MB.",
            false,
        ),

        BoothError::Spooler { op, stderr } => humanize_spooler_error(*op, stderr),

        BoothError::PrinterUnreachable(_) => HumanError::new(
            "Printer is offline or not responding",
            "Check the printer is switched on and connected, then try again.",
            true,
        ),

        BoothError::SupplyRefresh(_) => HumanError::new(
            "Could not refresh supply level",
            "The supply probe needs the printer connected over USB. Reconnect it and try again.",
            true,
        ),

        BoothError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError::new(
                    "The print server can't write its files",
                    "Check the permissions of the config file and the uploads directory.",
                    false,
                )
            } else {
                HumanError::new(
                    "There was a problem reading or writing a file",
                    "Try again. If this keeps happening, the SD card may be full.",
                    true,
                )
            }
        }

        BoothError::Serialization(_) => HumanError::new(
            "The print server had an internal data problem",
            "Try again. If this keeps happening, check config.json is valid JSON.",
            true,
        ),
    }
}

/// Pick the message for the operation, then refine the suggestion from
/// whatever CUPS printed on stderr.
fn humanize_spooler_error(op: SpoolerOp, stderr: &str) -> HumanError {
    let message = match op {
        SpoolerOp::Print => "Print failed",
        SpoolerOp::ListPrinters => "Error listing printers",
        SpoolerOp::QueryOptions => "Error fetching printer options",
        SpoolerOp::SetOptions => "Error setting printer options",
        SpoolerOp::Status => "Printer is offline or not responding",
    };

    let lower = stderr.to_ascii_lowercase();
    let (suggestion, retriable) = if lower.contains("does not exist") || lower.contains("unknown printer") {
        ("The printer name is not known to CUPS. Pick one from GET /printers.".to_string(), false)
    } else if lower.contains("not accepting") || lower.contains("disabled") {
        ("The print queue is paused. Run `cupsenable` / `cupsaccept` for the printer.".to_string(), false)
    } else if lower.contains("unable to connect") || lower.contains("connection refused") {
        ("CUPS is not running. Start it with `systemctl start cups`.".to_string(), true)
    } else if lower.contains("no such file") || lower.contains("not found") {
        ("The CUPS command-line tools are missing. Install the `cups-client` package.".to_string(), false)
    } else if lower.contains("unknown option") || lower.contains("bad option") {
        ("One of the printer options was rejected. Check GET /printer-options.".to_string(), false)
    } else {
        (format!("Try again. If this keeps happening, restart the printer. (Detail: {stderr})"), true)
    };

    HumanError {
        message: message.into(),
        suggestion,
        retriable,
    }
}
