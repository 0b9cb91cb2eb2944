// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Configuration store.
//
// Owns the in-memory `PrinterConfig` and its file.  Every mutation takes the
// same async mutex, so a config update, a supply refresh and the post-print
// counter decrement never interleave.  The lock is held across spooler and
// script calls on purpose: the file must reflect the order they finished in.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use boothprint_core::config::merge;
use boothprint_core::error::{BoothError, Result};
use boothprint_core::types::SupplyLevels;
use boothprint_core::{ConfigDelta, PrinterConfig};
use boothprint_print::{Spooler, SupplyProbe};

/// Result of a `/config` update.
#[derive(Debug)]
pub struct ConfigUpdate {
    /// The config as saved.
    pub config: PrinterConfig,
    /// Set when pushing printer options into the spooler failed.  The config
    /// was still saved.
    pub spooler_error: Option<BoothError>,
}

#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    spooler: Spooler,
    current: Mutex<PrinterConfig>,
}

impl ConfigStore {
    /// Load the config at `path` (or defaults) and take ownership of it.
    pub async fn open(path: impl Into<PathBuf>, spooler: Spooler) -> Self {
        let path = path.into();
        let current = load(&path).await;
        Self {
            path,
            spooler,
            current: Mutex::new(current),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current config.
    pub async fn snapshot(&self) -> PrinterConfig {
        self.current.lock().await.clone()
    }

    /// Apply a partial update.
    ///
    /// Printer options go to the spooler first, against the printer the
    /// update leaves configured.  The merged config is persisted whether or
    /// not that push worked; only a failed write is an `Err`.
    pub async fn update(&self, delta: &ConfigDelta) -> Result<ConfigUpdate> {
        let mut current = self.current.lock().await;
        let merged = merge(&current, delta);

        let spooler_error = match self
            .spooler
            .set_default_options(merged.default_printer.as_deref(), &delta.printer_options)
            .await
        {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "printer options not applied, saving config anyway");
                Some(e)
            }
        };

        persist(&self.path, &merged).await?;
        *current = merged.clone();
        info!(
            dry_run = merged.dry_run,
            printer = merged.default_printer.as_deref().unwrap_or("<cups default>"),
            "configuration saved"
        );

        Ok(ConfigUpdate {
            config: merged,
            spooler_error,
        })
    }

    /// Count a finished print against the supply counter.  Returns the
    /// counter afterwards.
    pub async fn record_successful_print(&self) -> Result<Option<i64>> {
        let mut current = self.current.lock().await;
        if current.record_print() {
            persist(&self.path, &current).await?;
            debug!(remaining = ?current.approximative_remaining, "supply counter decremented");
        }
        Ok(current.approximative_remaining)
    }

    /// Re-read the file, replacing the in-memory copy.  A file that exists
    /// but can't be read or parsed leaves the in-memory copy in place.
    pub async fn reload(&self) -> PrinterConfig {
        let mut current = self.current.lock().await;
        let config = self.reread(&current).await;
        *current = config.clone();
        config
    }

    async fn reread(&self, current: &PrinterConfig) -> PrinterConfig {
        match read(&self.path).await {
            Some(config) => config,
            None => {
                warn!(path = %self.path.display(), "keeping the loaded config");
                current.clone()
            }
        }
    }

    /// Run the supply probe, then pick up whatever it wrote to the config
    /// file.  A `Prints remaining` line in its output resets both counters.
    pub async fn refresh_supply(&self, probe: &SupplyProbe) -> Result<SupplyLevels> {
        let mut current = self.current.lock().await;

        let report = probe.refresh().await?;
        let mut config = self.reread(&current).await;
        if let Some(remaining) = report.prints_remaining {
            config.set_supply(remaining);
            persist(&self.path, &config).await?;
        }
        *current = config;

        Ok(SupplyLevels {
            initial_remaining: current.initial_remaining,
            approximative_remaining: current.approximative_remaining,
        })
    }
}

/// Read `path`.  A missing or unreadable file yields the default config.
pub async fn load(path: &Path) -> PrinterConfig {
    read(path).await.unwrap_or_else(|| {
        warn!(path = %path.display(), "using default config");
        PrinterConfig::default()
    })
}

/// Defaults when there is no file yet; `None` when the file is there but
/// unreadable or not valid JSON.
async fn read(path: &Path) -> Option<PrinterConfig> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "no config file yet, using defaults");
            return Some(PrinterConfig::default());
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read config");
            return None;
        }
    };

    match serde_json::from_str(&text) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config is not valid JSON");
            None
        }
    }
}

/// Write `config` as pretty JSON next to `path`, then rename it into place
/// so readers never see a half-written file.
pub async fn persist(path: &Path, config: &PrinterConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config.json".into());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    tokio::fs::write(&tmp, json).await.map_err(|e| {
        error!(path = %tmp.display(), error = %e, "could not write config");
        BoothError::Io(e)
    })?;
    tokio::fs::rename(&tmp, path).await.map_err(|e| {
        error!(path = %path.display(), error = %e, "could not replace config");
        BoothError::Io(e)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use boothprint_core::SpoolerOp;
    use boothprint_print::runner::testing::RecordingRunner;
    use serde_json::{Value, json};

    use super::*;

    fn delta(body: Value) -> ConfigDelta {
        match body {
            Value::Object(map) => ConfigDelta::from_json(&map),
            _ => panic!("test body must be an object"),
        }
    }

    async fn store_with(
        runner: RecordingRunner,
        initial: Option<Value>,
    ) -> (ConfigStore, Arc<RecordingRunner>, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        if let Some(initial) = initial {
            std::fs::write(&path, initial.to_string()).expect("seed config");
        }
        let runner = Arc::new(runner);
        let store = ConfigStore::open(&path, Spooler::new(runner.clone())).await;
        (store, runner, dir)
    }

    #[tokio::test]
    async fn missing_or_corrupt_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(load(&dir.path().join("nope.json")).await, PrinterConfig::default());

        let corrupt = dir.path().join("config.json");
        std::fs::write(&corrupt, "{ not json").expect("write");
        assert_eq!(load(&corrupt).await, PrinterConfig::default());
    }

    #[tokio::test]
    async fn persisted_merge_reads_back_identically() {
        let (store, _, _dir) = store_with(
            RecordingRunner::new(),
            Some(json!({"dryRun": true, "defaultPrinter": "QW410", "transpose": true})),
        )
        .await;

        let d = delta(json!({"dryRun": "false", "approximativeRemaining": "12"}));
        let expected = merge(&load(store.path()).await, &d);
        let update = store.update(&d).await.expect("update");

        assert_eq!(update.config, expected);
        assert_eq!(load(store.path()).await, expected);
        assert_eq!(expected.extra["transpose"], json!(true));
        assert!(update.spooler_error.is_none());
    }

    #[tokio::test]
    async fn update_pushes_options_to_the_resulting_printer() {
        let (store, runner, _dir) =
            store_with(RecordingRunner::new(), Some(json!({"defaultPrinter": "QW410"}))).await;

        store
            .update(&delta(json!({"defaultPrinter": "DS620", "printerOption_Cutter": "2inch"})))
            .await
            .expect("update");

        assert_eq!(runner.calls(), [["lpoptions", "-p", "DS620", "-o", "Cutter=2inch"]]);
    }

    #[tokio::test]
    async fn spooler_failure_still_saves() {
        let (store, _, _dir) = store_with(
            RecordingRunner::new().with_failure("lpoptions", "lpoptions: Unknown printer or class."),
            None,
        )
        .await;

        let update = store
            .update(&delta(json!({"dryRun": true, "printerOptions": {"Media": "2x6"}})))
            .await
            .expect("update");

        match update.spooler_error {
            Some(BoothError::Spooler { op, stderr }) => {
                assert_eq!(op, SpoolerOp::SetOptions);
                assert_eq!(stderr, "lpoptions: Unknown printer or class.");
            }
            other => panic!("expected spooler error, got {other:?}"),
        }
        assert!(load(store.path()).await.dry_run);
        assert!(store.snapshot().await.dry_run);
    }

    #[tokio::test]
    async fn counter_decrements_and_stops_at_zero() {
        let (store, _, _dir) =
            store_with(RecordingRunner::new(), Some(json!({"approximativeRemaining": 1}))).await;

        assert_eq!(store.record_successful_print().await.expect("record"), Some(0));
        assert_eq!(store.record_successful_print().await.expect("record"), Some(0));
        assert_eq!(load(store.path()).await.approximative_remaining, Some(0));
    }

    #[tokio::test]
    async fn absent_counter_is_left_alone() {
        let (store, _, _dir) = store_with(RecordingRunner::new(), None).await;
        assert_eq!(store.record_successful_print().await.expect("record"), None);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn reload_picks_up_external_edits() {
        let (store, _, _dir) = store_with(RecordingRunner::new(), Some(json!({"dryRun": false}))).await;
        std::fs::write(store.path(), r#"{"dryRun": true}"#).expect("edit");
        assert!(store.reload().await.dry_run);
    }

    #[tokio::test]
    async fn supply_refresh_resets_counters() {
        let (store, _, dir) = store_with(
            RecordingRunner::new(),
            Some(json!({"defaultPrinter": "QW410", "approximativeRemaining": 3, "initialRemaining": 400})),
        )
        .await;
        let probe = SupplyProbe::new(
            Arc::new(RecordingRunner::new().with_stdout("./refresh.sh", "Prints remaining: 700\n")),
            "./refresh.sh",
        );

        let levels = store.refresh_supply(&probe).await.expect("refresh");
        assert_eq!(
            levels,
            SupplyLevels {
                initial_remaining: Some(700),
                approximative_remaining: Some(700)
            }
        );
        let saved = load(&dir.path().join("config.json")).await;
        assert_eq!(saved.approximative_remaining, Some(700));
        assert_eq!(saved.default_printer.as_deref(), Some("QW410"));
    }

    #[tokio::test]
    async fn supply_refresh_without_report_just_reloads() {
        let (store, _, _dir) =
            store_with(RecordingRunner::new(), Some(json!({"approximativeRemaining": 3}))).await;
        // The script rewrote the file behind our back.
        std::fs::write(store.path(), r#"{"approximativeRemaining": 9, "initialRemaining": 10}"#)
            .expect("edit");
        let probe = SupplyProbe::new(Arc::new(RecordingRunner::new()), "./refresh.sh");

        let levels = store.refresh_supply(&probe).await.expect("refresh");
        assert_eq!(levels.approximative_remaining, Some(9));
        assert_eq!(levels.initial_remaining, Some(10));
    }

    #[tokio::test]
    async fn corrupt_file_after_supply_refresh_keeps_loaded_config() {
        let (store, _, _dir) = store_with(
            RecordingRunner::new(),
            Some(json!({
                "dryRun": true,
                "defaultPrinter": "QW410",
                "margins": {"top": 0, "right": 0, "bottom": 0, "left": 0}
            })),
        )
        .await;
        // The script left a half-written file behind.
        std::fs::write(store.path(), "{ truncated").expect("edit");
        let probe = SupplyProbe::new(Arc::new(RecordingRunner::new()), "./refresh.sh");

        store.refresh_supply(&probe).await.expect("refresh");
        let kept = store.snapshot().await;
        assert!(kept.dry_run);
        assert_eq!(kept.default_printer.as_deref(), Some("QW410"));
        assert_eq!(kept.extra["margins"]["top"], json!(0));

        store.update(&delta(json!({"approximativeRemaining": 5}))).await.expect("update");
        let saved = load(store.path()).await;
        assert!(saved.dry_run);
        assert_eq!(saved.default_printer.as_deref(), Some("QW410"));
        assert!(saved.extra.contains_key("margins"));
    }

    #[tokio::test]
    async fn reload_ignores_a_corrupt_file() {
        let (store, _, _dir) = store_with(RecordingRunner::new(), Some(json!({"dryRun": true}))).await;
        std::fs::write(store.path(), "{ not json").expect("edit");
        assert!(store.reload().await.dry_run);
    }

    #[tokio::test]
    async fn failed_supply_refresh_keeps_config() {
        let (store, _, _dir) =
            store_with(RecordingRunner::new(), Some(json!({"approximativeRemaining": 3}))).await;
        let probe = SupplyProbe::new(
            Arc::new(RecordingRunner::new().with_failure("./refresh.sh", "no printer")),
            "./refresh.sh",
        );

        let err = store.refresh_supply(&probe).await.expect_err("should fail");
        assert_eq!(err.stderr(), Some("no printer"));
        assert_eq!(store.snapshot().await.approximative_remaining, Some(3));
    }
}
