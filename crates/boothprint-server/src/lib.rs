// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Boothprint server: the HTTP surface of the print station.  Handlers are
// thin: they decode the request, call into `services`, and shape the reply.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod settings;
pub mod state;

pub use routes::router;
pub use settings::Settings;
pub use state::AppState;
