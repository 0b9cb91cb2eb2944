// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// GET /printers, /printer-options, /printer-status

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use boothprint_core::error::BoothError;
use boothprint_core::types::Envelope;
use boothprint_print::status::query_status;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let printers = state.spooler.list_printers().await?;
    Ok(Json(json!({ "printers": printers })))
}

#[derive(Debug, Deserialize)]
pub struct OptionsQuery {
    printer: Option<String>,
}

/// Option schema of `?printer=NAME`, keyed by option name.
pub async fn options(
    State(state): State<AppState>,
    Query(query): Query<OptionsQuery>,
) -> Result<Json<Value>, ApiError> {
    let printer = query
        .printer
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or(BoothError::MissingPrinter)?;

    let options = state.spooler.printer_options(&printer).await?;
    Ok(Json(options.to_json()))
}

/// Status of the configured printer, or the fallback status printer when
/// none is configured.
pub async fn status(State(state): State<AppState>) -> Result<Json<Envelope>, ApiError> {
    let printer = state
        .store
        .snapshot()
        .await
        .default_printer
        .unwrap_or_else(|| state.settings.status_printer.clone());

    let status = query_status(state.status_probe.as_ref(), &state.spooler, &printer)
        .await
        .map_err(ApiError::Envelope)?;
    let data = serde_json::to_value(status).map_err(|e| ApiError::Envelope(e.into()))?;
    Ok(Json(Envelope::ok(Some(data))))
}
