// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persisted printer configuration and partial-update reconciliation.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::types::{OPTION_FIELD_PREFIX, field_text};

/// Persisted print station settings (`config.json`).
///
/// Fields written by other versions of the service are kept in `extra` and
/// written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterConfig {
    /// Simulate prints without calling the spooler.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub dry_run: bool,
    /// Spooler destination; `None` lets CUPS pick its default.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_printer")]
    pub default_printer: Option<String>,
    /// Prints left on the installed media, counted down after each job.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_count")]
    pub approximative_remaining: Option<i64>,
    /// Media capacity reported by the last supply refresh.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_count")]
    pub initial_remaining: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PrinterConfig {
    /// Count one finished print against the supply counter.
    ///
    /// Returns `true` if the counter changed.  An absent or exhausted counter
    /// is left alone so it never goes negative.
    pub fn record_print(&mut self) -> bool {
        match self.approximative_remaining {
            Some(n) if n > 0 => {
                self.approximative_remaining = Some(n - 1);
                true
            }
            _ => false,
        }
    }

    /// Reset both supply counters to a freshly probed level.
    pub fn set_supply(&mut self, remaining: i64) {
        self.initial_remaining = Some(remaining);
        self.approximative_remaining = Some(remaining);
    }
}

/// A partial configuration update as posted to `/config`.
///
/// Outer `Option` = field present in the request; inner `None` = clear it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDelta {
    pub dry_run: Option<bool>,
    pub default_printer: Option<Option<String>>,
    pub approximative_remaining: Option<Option<i64>>,
    pub initial_remaining: Option<Option<i64>>,
    /// Default options to push into the spooler's option store, in request
    /// order.  Never persisted.
    pub printer_options: Vec<(String, String)>,
}

impl ConfigDelta {
    /// Pick the recognised fields out of a JSON body.  Everything else is
    /// ignored.
    pub fn from_json(body: &Map<String, Value>) -> Self {
        let mut delta = Self::default();

        for (key, value) in body {
            match key.as_str() {
                "dryRun" => delta.dry_run = coerce_bool(value),
                "defaultPrinter" => delta.default_printer = Some(coerce_printer(value)),
                "approximativeRemaining" => delta.approximative_remaining = coerce_count(value),
                "initialRemaining" => delta.initial_remaining = coerce_count(value),
                "printerOptions" => {
                    if let Value::Object(options) = value {
                        for (name, v) in options {
                            if !name.is_empty() {
                                delta.printer_options.push((name.clone(), field_text(v)));
                            }
                        }
                    }
                }
                other => {
                    if let Some(name) = other.strip_prefix(OPTION_FIELD_PREFIX)
                        && !name.is_empty()
                    {
                        delta.printer_options.push((name.to_string(), field_text(value)));
                    }
                }
            }
        }

        delta
    }
}

/// Overlay `delta` on `current`.  Fields the delta does not mention keep
/// their current value.
pub fn merge(current: &PrinterConfig, delta: &ConfigDelta) -> PrinterConfig {
    let mut merged = current.clone();

    if let Some(dry_run) = delta.dry_run {
        merged.dry_run = dry_run;
    }
    if let Some(printer) = &delta.default_printer {
        merged.default_printer = printer.clone();
    }
    if let Some(remaining) = delta.approximative_remaining {
        merged.approximative_remaining = remaining;
    }
    if let Some(initial) = delta.initial_remaining {
        merged.initial_remaining = initial;
    }

    merged
}

// -- Coercion ------------------------------------------------------------------
//
// The booth app posts form-ish JSON: booleans arrive as "true"/"false" and
// counters as strings about as often as they arrive typed.

/// `null` → not present; strings compare against "true"; numbers are
/// truthy when non-zero.
fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => Some(s.trim().eq_ignore_ascii_case("true")),
        Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        _ => None,
    }
}

/// Empty or `null` clears; anything else is the trimmed name.
fn coerce_printer(value: &Value) -> Option<String> {
    let name = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!name.is_empty()).then_some(name)
}

/// `Some(None)` clears the counter, `None` means the value was unusable.
fn coerce_count(value: &Value) -> Option<Option<i64>> {
    let parsed = match value {
        Value::Null => return Some(None),
        Value::Number(n) => n.as_i64(),
        Value::String(s) if s.trim().is_empty() => return Some(None),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.filter(|n| *n >= 0).map(Some)
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_bool(&value).unwrap_or(false))
}

fn lenient_printer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_printer(&value))
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_count(&value).flatten())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delta(body: Value) -> ConfigDelta {
        match body {
            Value::Object(map) => ConfigDelta::from_json(&map),
            _ => panic!("test body must be an object"),
        }
    }

    fn configured() -> PrinterConfig {
        PrinterConfig {
            dry_run: false,
            default_printer: Some("QW410".into()),
            approximative_remaining: Some(5),
            initial_remaining: Some(400),
            extra: Map::new(),
        }
    }

    #[test]
    fn missing_default_printer_is_left_alone() {
        let merged = merge(&configured(), &delta(json!({"dryRun": true})));
        assert_eq!(merged.default_printer.as_deref(), Some("QW410"));
        assert!(merged.dry_run);
    }

    #[test]
    fn empty_default_printer_clears_it() {
        let merged = merge(&configured(), &delta(json!({"defaultPrinter": ""})));
        assert_eq!(merged.default_printer, None);

        let merged = merge(&configured(), &delta(json!({"defaultPrinter": null})));
        assert_eq!(merged.default_printer, None);
    }

    #[test]
    fn string_booleans_are_coerced() {
        let merged = merge(&configured(), &delta(json!({"dryRun": "true"})));
        assert!(merged.dry_run);
        let merged = merge(&merged, &delta(json!({"dryRun": "false"})));
        assert!(!merged.dry_run);
        let merged = merge(&merged, &delta(json!({"dryRun": "TRUE"})));
        assert!(merged.dry_run);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let d = delta(json!({"colour": "blue", "margins": {"top": 3}}));
        assert_eq!(d, ConfigDelta::default());
        assert_eq!(merge(&configured(), &d), configured());
    }

    #[test]
    fn counters_accept_strings_and_clear_on_empty() {
        let merged = merge(&configured(), &delta(json!({"approximativeRemaining": "12"})));
        assert_eq!(merged.approximative_remaining, Some(12));

        let merged = merge(&configured(), &delta(json!({"initialRemaining": ""})));
        assert_eq!(merged.initial_remaining, None);

        let merged = merge(&configured(), &delta(json!({"approximativeRemaining": "lots"})));
        assert_eq!(merged.approximative_remaining, Some(5));
    }

    #[test]
    fn printer_options_are_collected_in_order() {
        let d = delta(json!({
            "printerOption_Media": "2x6",
            "defaultPrinter": "QW410",
            "printerOptions": {"Cutter": "Enabled"},
            "printerOption_": "ignored",
        }));
        assert_eq!(
            d.printer_options,
            vec![
                ("Media".to_string(), "2x6".to_string()),
                ("Cutter".to_string(), "Enabled".to_string()),
            ]
        );
    }

    #[test]
    fn record_print_never_goes_negative() {
        let mut config = configured();
        assert!(config.record_print());
        assert_eq!(config.approximative_remaining, Some(4));

        config.approximative_remaining = Some(0);
        assert!(!config.record_print());
        assert_eq!(config.approximative_remaining, Some(0));

        config.approximative_remaining = None;
        assert!(!config.record_print());
        assert_eq!(config.approximative_remaining, None);
    }

    #[test]
    fn legacy_fields_survive_a_round_trip() {
        let raw = json!({
            "printer": "",
            "margins": {"top": 0, "right": 0, "bottom": 0, "left": 0},
            "transpose": false,
            "paperSize": "4x6",
            "dryRun": "true",
            "defaultPrinter": ""
        });
        let config: PrinterConfig = serde_json::from_value(raw).expect("parse");
        assert!(config.dry_run);
        assert_eq!(config.default_printer, None);
        assert_eq!(config.extra["paperSize"], json!("4x6"));

        let written = serde_json::to_value(&config).expect("serialize");
        assert_eq!(written["margins"]["top"], json!(0));
        assert!(written.get("defaultPrinter").is_none());
        assert!(written.get("approximativeRemaining").is_none());
    }
}
