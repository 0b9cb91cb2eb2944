// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Parsers for `lpoptions` output.
//
// Two formats:
//   - `lpoptions -p NAME -l` lists the option schema, one option per line:
//         Media/Media Size: *4x6 2x6 5x7
//     A leading `*` marks the PPD default.
//   - `lpoptions -p NAME` prints the current values as shell-quoted
//     `key=value` pairs on one line:
//         copies=1 device-uri=usb://DNP/QW410 marker-message='Prints remaining: 120'

use std::collections::HashMap;

use boothprint_core::types::{OptionDescriptor, OptionValue, PrinterOptions};

/// Current-options key carrying the media supply message.
pub const MARKER_MESSAGE_KEY: &str = "marker-message";

/// Combine the schema listing with the current values.
pub fn printer_options(listing: &str, current: &HashMap<String, String>) -> PrinterOptions {
    PrinterOptions {
        options: parse_option_listing(listing, current),
        marker_message: current.get(MARKER_MESSAGE_KEY).cloned(),
    }
}

/// Parse `lpoptions -l` output.  Lines that don't look like
/// `KEY[/Label]: values...` are skipped.
///
/// A value is flagged as default if it carries the `*` marker or matches the
/// printer's current value for that key (case-insensitive), so a default
/// changed with `lpoptions -o` shows up even though the PPD still marks the
/// old one.
pub fn parse_option_listing(
    listing: &str,
    current: &HashMap<String, String>,
) -> Vec<(String, OptionDescriptor)> {
    listing
        .lines()
        .filter_map(parse_listing_line)
        .map(|line| {
            let current_value = lookup_current(current, &line.key);
            let values = line
                .values
                .iter()
                .map(|raw| {
                    let (value, marked) = match raw.strip_prefix('*') {
                        Some(v) => (v, true),
                        None => (*raw, false),
                    };
                    let is_current = current_value.is_some_and(|c| c.eq_ignore_ascii_case(value));
                    OptionValue {
                        value: value.to_string(),
                        default: marked || is_current,
                    }
                })
                .collect();
            let label = line.label.unwrap_or(line.key.as_str()).to_string();
            (line.key, OptionDescriptor { label, values })
        })
        .collect()
}

struct ListingLine<'a> {
    key: String,
    label: Option<&'a str>,
    values: Vec<&'a str>,
}

fn parse_listing_line(line: &str) -> Option<ListingLine<'_>> {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return None;
    }

    let key_len = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(line.len());
    if key_len == 0 {
        return None;
    }
    let (key, rest) = line.split_at(key_len);

    // The label runs to the first colon followed by whitespace.
    let (label, rest) = match rest.strip_prefix('/') {
        Some(after_slash) => {
            let end = find_separator(after_slash)?;
            (Some(&after_slash[..end]), &after_slash[end..])
        }
        None => (None, rest),
    };

    let values_text = rest.strip_prefix(':')?;
    if !values_text.starts_with(char::is_whitespace) {
        return None;
    }
    let values: Vec<&str> = values_text.split_whitespace().collect();
    if values.is_empty() {
        return None;
    }

    Some(ListingLine {
        key: key.to_string(),
        label: label.filter(|l| !l.is_empty()),
        values,
    })
}

/// Byte offset of the first `:` that is followed by whitespace.
fn find_separator(text: &str) -> Option<usize> {
    text.char_indices()
        .find(|&(i, c)| c == ':' && text[i + 1..].starts_with(char::is_whitespace))
        .map(|(i, _)| i)
}

/// Current values are keyed by IPP-style names (`media`) while the schema
/// uses PPD names (`Media`); try exact first.
fn lookup_current<'a>(current: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    current
        .get(key)
        .or_else(|| {
            current
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
        .map(String::as_str)
}

/// Parse `lpoptions -p NAME` output into a map.  Handles single quotes,
/// double quotes and backslash escapes the way CUPS writes them.
pub fn parse_current_options(output: &str) -> HashMap<String, String> {
    split_shell_words(output)
        .into_iter()
        .filter_map(|word| {
            let (key, value) = word.split_once('=')?;
            (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

fn split_shell_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                for q in chars.by_ref() {
                    if q == '\'' {
                        break;
                    }
                    word.push(q);
                }
            }
            '"' => {
                in_word = true;
                while let Some(q) = chars.next() {
                    match q {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                word.push(escaped);
                            }
                        }
                        other => word.push(other),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(escaped) = chars.next() {
                    word.push(escaped);
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            other => {
                in_word = true;
                word.push(other);
            }
        }
    }
    if in_word {
        words.push(word);
    }

    words
}
