// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer between the HTTP handlers and the spooler crates.

pub mod config_store;
pub mod print_service;

pub use config_store::{ConfigStore, ConfigUpdate};
pub use print_service::{PrintOutcome, PrintService};
