// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// GET/POST /config

use axum::extract::{FromRequest, Request, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde_json::{Map, Value, json};
use tracing::debug;

use boothprint_core::error::BoothError;
use boothprint_core::{ConfigDelta, PrinterConfig};

use crate::error::{ApiError, plain_body};
use crate::state::AppState;

pub async fn show(State(state): State<AppState>) -> Json<PrinterConfig> {
    Json(state.store.snapshot().await)
}

/// Merge the posted fields into the config and save it.  `printerOption_*`
/// fields and a `printerOptions` object are pushed to the spooler as
/// default options.
///
/// If that push fails the config is still saved; the response is a 500
/// carrying the spooler's stderr next to the saved fields.
pub async fn save(State(state): State<AppState>, req: Request) -> Result<Response, ApiError> {
    let body = read_delta_body(&state, req).await?;
    let delta = ConfigDelta::from_json(&body);
    let update = state.store.update(&delta).await?;
    let saved = config_fields(&update.config)?;

    let (status, mut body) = match &update.spooler_error {
        None => {
            let mut body = Map::new();
            body.insert("status".into(), json!("saved"));
            (StatusCode::OK, body)
        }
        Some(err) => (StatusCode::INTERNAL_SERVER_ERROR, plain_body(err)),
    };
    for (key, value) in saved {
        body.entry(key).or_insert(value);
    }

    Ok((status, Json(body)).into_response())
}

/// JSON or url-encoded form.  Form values arrive as strings and go through
/// the same coercion as JSON strings.  Any other body is an empty update.
async fn read_delta_body(state: &AppState, req: Request) -> Result<Map<String, Value>, ApiError> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        let Json(body) = Json::<Map<String, Value>>::from_request(req, state)
            .await
            .map_err(|e| BoothError::Upload(e.body_text()))?;
        return Ok(body);
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, state)
            .await
            .map_err(|e| BoothError::Upload(e.body_text()))?;
        return Ok(fields
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect());
    }

    debug!(content_type = %content_type, "config body ignored");
    Ok(Map::new())
}

fn config_fields(config: &PrinterConfig) -> Result<Map<String, Value>, ApiError> {
    match serde_json::to_value(config) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Ok(Map::new()),
        Err(e) => Err(ApiError::Plain(e.into())),
    }
}
