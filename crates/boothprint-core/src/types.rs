// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Boothprint print station.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request fields with this prefix are passed to the spooler as `-o name=value`.
pub const OPTION_FIELD_PREFIX: &str = "printerOption_";

/// Render a request field value the way it would appear in a form post.
pub fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Where the image for a print job comes from.  Resolved once at the HTTP
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Multipart upload already written to disk by the HTTP layer.
    Uploaded { path: PathBuf },
    /// Base64 payload, optionally wrapped in a `data:image/...;base64,` URI.
    Base64 { payload: String },
}

/// One `/print/image` call.
#[derive(Debug, Clone)]
pub struct PrintRequest {
    pub image: ImageSource,
    /// Every non-image field in request order.
    pub fields: Vec<(String, String)>,
}

impl PrintRequest {
    pub fn new(image: ImageSource, fields: Vec<(String, String)>) -> Self {
        Self { image, fields }
    }

    /// Build a request from a JSON body.  `image` is the base64 field; an
    /// empty or missing `image` yields `None`.
    pub fn from_json(body: &Map<String, Value>) -> Option<Self> {
        let payload = body.get("image").map(field_text).filter(|s| !s.is_empty())?;
        let fields = body
            .iter()
            .filter(|(key, _)| key.as_str() != "image")
            .map(|(key, value)| (key.clone(), field_text(value)))
            .collect();
        Some(Self::new(ImageSource::Base64 { payload }, fields))
    }

    /// First value for `name`, if the request carried it.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// One selectable value of a printer option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionValue {
    pub value: String,
    /// Spooler default or currently configured value.
    pub default: bool,
}

/// A printer option as listed by `lpoptions -l`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDescriptor {
    pub label: String,
    pub values: Vec<OptionValue>,
}

/// Option schema for one printer plus the supply marker message, in the
/// order the spooler listed the options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrinterOptions {
    pub options: Vec<(String, OptionDescriptor)>,
    pub marker_message: Option<String>,
}

impl PrinterOptions {
    pub fn get(&self, key: &str) -> Option<&OptionDescriptor> {
        self.options.iter().find(|(k, _)| k == key).map(|(_, d)| d)
    }

    /// Response body: one key per option, `markerMessage` last.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        for (key, descriptor) in &self.options {
            // Serializing a plain struct of strings and bools cannot fail.
            let value = serde_json::to_value(descriptor).unwrap_or(Value::Null);
            body.insert(key.clone(), value);
        }
        if let Some(message) = &self.marker_message {
            body.insert("markerMessage".into(), Value::String(message.clone()));
        }
        Value::Object(body)
    }
}

/// Printer status as reported by IPP, or by `lpstat` when IPP is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PrinterStatus {
    Ipp {
        printer: String,
        ipp_status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        printer_state: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        printer_state_message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        remaining_prints_message: Option<String>,
    },
    Cups {
        printer: String,
        status: String,
        cups_status: String,
    },
}

/// Supply counters returned by `/refresh-supply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyLevels {
    pub initial_remaining: Option<i64>,
    pub approximative_remaining: Option<i64>,
}

/// Response shape the booth app expects from print and status calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub status: bool,
    pub error: Option<String>,
    pub human_error: Option<String>,
    pub data: Option<Value>,
}

impl Envelope {
    pub fn ok(data: Option<Value>) -> Self {
        Self {
            status: true,
            error: None,
            human_error: None,
            data,
        }
    }

    pub fn failed(error: String, human_error: String) -> Self {
        Self {
            status: false,
            error: Some(error),
            human_error: Some(human_error),
            data: None,
        }
    }
}
