// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP error responses.
//
// The booth app reads two body shapes.  Print and status calls answer with
// the `{status, error, human_error, data}` envelope; everything else uses a
// plain `{status: "error", ...}` object.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value, json};

use boothprint_core::error::BoothError;
use boothprint_core::human_errors::humanize_error;
use boothprint_core::types::Envelope;

/// A `BoothError` plus the body shape its endpoint uses.
#[derive(Debug)]
pub enum ApiError {
    Envelope(BoothError),
    Plain(BoothError),
}

impl ApiError {
    pub fn error(&self) -> &BoothError {
        match self {
            Self::Envelope(e) | Self::Plain(e) => e,
        }
    }

    /// 400 for anything the client can fix, 500 otherwise.
    pub fn status_code(&self) -> StatusCode {
        status_for(self.error())
    }
}

impl From<BoothError> for ApiError {
    fn from(err: BoothError) -> Self {
        Self::Plain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::Envelope(err) => {
                let human = humanize_error(&err);
                (status, Json(Envelope::failed(err.detail(), human.message))).into_response()
            }
            Self::Plain(err) => (status, Json(plain_body(&err))).into_response(),
        }
    }
}

pub fn status_for(err: &BoothError) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Machine-readable code for the plain body.
pub fn error_code(err: &BoothError) -> &'static str {
    match err {
        BoothError::NoImageData => "NO_IMAGE_DATA",
        BoothError::InvalidImageData(_) => "INVALID_IMAGE_DATA",
        BoothError::MissingPrinter => "MISSING_PRINTER",
        BoothError::Upload(_) => "UPLOAD_ERROR",
        BoothError::Spooler { .. } => "SPOOLER_ERROR",
        BoothError::PrinterUnreachable(_) => "PRINTER_UNREACHABLE",
        BoothError::SupplyRefresh(_) => "SUPPLY_ERROR",
        BoothError::Io(_) | BoothError::Serialization(_) => "SERVER_ERROR",
    }
}

/// `{status: "error", error, message, human_error, suggestion, code}`, plus
/// `stderr` when a process failed.
pub fn plain_body(err: &BoothError) -> Map<String, Value> {
    let human = humanize_error(err);
    let mut body = Map::new();
    body.insert("status".into(), json!("error"));
    body.insert("error".into(), json!(err.detail()));
    body.insert("message".into(), json!(err.to_string()));
    body.insert("human_error".into(), json!(human.message));
    body.insert("suggestion".into(), json!(human.suggestion));
    body.insert("code".into(), json!(error_code(err)));
    if let Some(stderr) = err.stderr() {
        body.insert("stderr".into(), json!(stderr));
    }
    body
}

/// Body for a request that panicked.  Carries no detail.
pub fn internal_error_body() -> Value {
    json!({
        "status": "error",
        "message": "Internal server error",
        "code": "SERVER_ERROR",
    })
}
