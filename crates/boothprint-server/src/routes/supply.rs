// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// POST /refresh-supply

use axum::Json;
use axum::extract::State;

use boothprint_core::types::SupplyLevels;

use crate::error::ApiError;
use crate::state::AppState;

/// Run the supply probe script and report the counters it left behind.
pub async fn refresh(State(state): State<AppState>) -> Result<Json<SupplyLevels>, ApiError> {
    let levels = state.store.refresh_supply(&state.supply).await?;
    Ok(Json(levels))
}
