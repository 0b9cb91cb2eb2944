// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP routes.

pub mod config;
pub mod print;
pub mod printers;
pub mod supply;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::routing::{get, post};

use crate::middleware::{catch_panic, log_requests};
use crate::state::AppState;

/// Build the service router.
///
/// The body limit leaves room for one maximum-size photo plus text fields,
/// or the same photo base64-encoded in JSON.  Per-part limits are enforced
/// by the print handler.
pub fn router(state: AppState) -> Router {
    let body_limit = state.settings.max_upload_bytes.saturating_mul(2);

    Router::new()
        .route("/config", get(config::show).post(config::save))
        .route("/printers", get(printers::list))
        .route("/printer-options", get(printers::options))
        .route("/printer-status", get(printers::status))
        .route("/print/image", post(print::image))
        .route("/refresh-supply", post(supply::refresh))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(log_requests))
        .layer(from_fn(catch_panic))
        .with_state(state)
}
