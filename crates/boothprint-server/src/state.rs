// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared state handed to every request handler.

use std::sync::Arc;

use boothprint_print::{AttributeProbe, CommandRunner, Spooler, SupplyProbe};

use crate::services::{ConfigStore, PrintService};
use crate::settings::Settings;

/// Everything a handler needs.  Cheap to clone: all fields are `Arc`s or
/// wrap one.
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<ConfigStore>,
    pub spooler: Spooler,
    pub printer: PrintService,
    pub status_probe: Arc<dyn AttributeProbe>,
    pub supply: SupplyProbe,
}

impl AppState {
    /// Wire the services together.  `runner` executes every external program
    /// and `status_probe` answers IPP status queries; `main` passes the real
    /// ones, tests pass fakes.
    pub async fn new(
        settings: Settings,
        runner: Arc<dyn CommandRunner>,
        status_probe: Arc<dyn AttributeProbe>,
    ) -> Self {
        let spooler = Spooler::new(runner.clone());
        let store = Arc::new(ConfigStore::open(settings.config_path.clone(), spooler.clone()).await);
        let printer = PrintService::new(store.clone(), spooler.clone(), settings.staging_dir.clone());
        let supply = SupplyProbe::new(runner, settings.supply_script.clone());

        Self {
            settings: Arc::new(settings),
            store,
            spooler,
            printer,
            status_probe,
            supply,
        }
    }
}
