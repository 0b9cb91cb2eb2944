// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process settings, resolved from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::warn;

const DEFAULT_BIND: &str = "0.0.0.0:3000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Where things live and how big uploads may be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind: SocketAddr,
    /// Persisted `PrinterConfig` (`config.json`).
    pub config_path: PathBuf,
    /// Scratch directory for uploads and decoded images.
    pub staging_dir: PathBuf,
    pub supply_script: PathBuf,
    /// CUPS scheduler for IPP status queries.
    pub cups_uri: String,
    /// Printer whose status is reported when no default is configured.
    pub status_printer: String,
    /// Per-file and per-field upload limit.
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            config_path: PathBuf::from("./config.json"),
            staging_dir: PathBuf::from("./uploads"),
            supply_script: PathBuf::from("./scripts/refresh_supply.sh"),
            cups_uri: "ipp://localhost:631".into(),
            status_printer: "QW410".into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Settings {
    /// Read `BOOTHPRINT_*` variables.  Unset or empty variables keep their
    /// defaults; unparsable ones are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = Self::default();

        if let Some(raw) = get("BOOTHPRINT_BIND") {
            match raw.parse() {
                Ok(addr) => settings.bind = addr,
                Err(e) => warn!(value = %raw, error = %e, "invalid BOOTHPRINT_BIND, using {DEFAULT_BIND}"),
            }
        }
        if let Some(path) = get("BOOTHPRINT_CONFIG") {
            settings.config_path = path.into();
        }
        if let Some(path) = get("BOOTHPRINT_STAGING_DIR") {
            settings.staging_dir = path.into();
        }
        if let Some(path) = get("BOOTHPRINT_SUPPLY_SCRIPT") {
            settings.supply_script = path.into();
        }
        if let Some(uri) = get("BOOTHPRINT_CUPS_URI") {
            settings.cups_uri = uri;
        }
        if let Some(printer) = get("BOOTHPRINT_STATUS_PRINTER") {
            settings.status_printer = printer;
        }
        if let Some(raw) = get("BOOTHPRINT_MAX_UPLOAD_BYTES") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => settings.max_upload_bytes = n,
                _ => warn!(
                    value = %raw,
                    "invalid BOOTHPRINT_MAX_UPLOAD_BYTES, using {DEFAULT_MAX_UPLOAD_BYTES}"
                ),
            }
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_a_stock_install() {
        let settings = from(&[]);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.bind.to_string(), DEFAULT_BIND);
        assert_eq!(settings.max_upload_bytes, 10_485_760);
    }

    #[test]
    fn variables_override_defaults() {
        let settings = from(&[
            ("BOOTHPRINT_BIND", "127.0.0.1:8080"),
            ("BOOTHPRINT_CONFIG", "/etc/boothprint/config.json"),
            ("BOOTHPRINT_STATUS_PRINTER", " DS620 "),
            ("BOOTHPRINT_MAX_UPLOAD_BYTES", "2048"),
        ]);
        assert_eq!(settings.bind.port(), 8080);
        assert_eq!(settings.config_path, PathBuf::from("/etc/boothprint/config.json"));
        assert_eq!(settings.status_printer, "DS620");
        assert_eq!(settings.max_upload_bytes, 2048);
    }

    #[test]
    fn bad_values_fall_back() {
        let settings = from(&[
            ("BOOTHPRINT_BIND", "port 3000"),
            ("BOOTHPRINT_MAX_UPLOAD_BYTES", "0"),
            ("BOOTHPRINT_CUPS_URI", ""),
        ]);
        assert_eq!(settings, Settings::default());
    }
}
