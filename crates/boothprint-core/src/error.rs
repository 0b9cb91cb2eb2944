// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Boothprint.

use std::fmt;

use thiserror::Error;

/// Which spooler interaction failed.  Drives the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpoolerOp {
    /// `lp` print submission.
    Print,
    /// `lpstat -e` destination listing.
    ListPrinters,
    /// `lpoptions -l` schema or current-value query.
    QueryOptions,
    /// `lpoptions -o` default-option update.
    SetOptions,
    /// `lpstat -p -l` status query.
    Status,
}

impl fmt::Display for SpoolerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Print => "print",
            Self::ListPrinters => "list printers",
            Self::QueryOptions => "query options",
            Self::SetOptions => "set options",
            Self::Status => "printer status",
        };
        f.write_str(name)
    }
}

/// Top-level error type for all Boothprint operations.
#[derive(Debug, Error)]
pub enum BoothError {
    // -- Client input --
    #[error("No image data provided")]
    NoImageData,

    #[error("Error processing image data: {0}")]
    InvalidImageData(String),

    #[error("Missing printer parameter")]
    MissingPrinter,

    #[error("Upload error: {0}")]
    Upload(String),

    // -- External processes --
    /// The spooler exited non-zero or could not be spawned.  `stderr` is the
    /// process diagnostic, verbatim and trimmed.
    #[error("spooler {op} failed: {stderr}")]
    Spooler { op: SpoolerOp, stderr: String },

    #[error("printer unreachable: {0}")]
    PrinterUnreachable(String),

    #[error("supply refresh failed: {0}")]
    SupplyRefresh(String),

    // -- Persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BoothError {
    /// Whether the caller sent something we cannot act on.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NoImageData | Self::InvalidImageData(_) | Self::MissingPrinter | Self::Upload(_)
        )
    }

    /// Text for the machine-facing `error` field.
    ///
    /// Process failures surface the diagnostic verbatim; everything else uses
    /// the display form.
    pub fn detail(&self) -> String {
        match self {
            Self::Spooler { stderr, .. } => stderr.clone(),
            Self::SupplyRefresh(stderr) => stderr.clone(),
            // The calling app matches on this exact string.
            Self::InvalidImageData(_) => "Error processing image data".into(),
            other => other.to_string(),
        }
    }

    /// Diagnostic output of the failed process, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Spooler { stderr, .. } | Self::SupplyRefresh(stderr) => Some(stderr),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BoothError>;
