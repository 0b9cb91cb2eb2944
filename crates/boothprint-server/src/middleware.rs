// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request middleware.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::Json;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use tracing::{debug, error, info};

use crate::error::internal_error_body;

/// Log every request line, and the status once the handler is done.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    info!(%method, %uri, "request");

    let started = Instant::now();
    let response = next.run(req).await;
    debug!(
        %method,
        %uri,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "response"
    );
    response
}

/// Turn a panicking handler into a generic 500 instead of a dropped
/// connection.
pub async fn catch_panic(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            error!(%method, %uri, %reason, "handler panicked");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(internal_error_body())).into_response()
        }
    }
}
