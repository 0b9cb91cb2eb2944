// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `lp` invocation builder.
//
// Turns a print request plus a config snapshot into the argument vector for
// `lp`.  Flag order is fixed: destination, copies, advanced options, then the
// staged image as the only positional argument.

use std::fmt;
use std::path::{Path, PathBuf};

use boothprint_core::types::{OPTION_FIELD_PREFIX, PrintRequest};
use boothprint_core::PrinterConfig;

/// CUPS print submission command.
pub const LP_PROGRAM: &str = "lp";

/// Request fields that carry a copy count, in priority order.
const COPIES_FIELDS: [&str; 2] = ["number_of_copies", "copies"];

/// A fully resolved `lp` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintCommand {
    /// Flags, in emission order.
    pub flags: Vec<String>,
    /// Staged image to print.
    pub file: PathBuf,
}

impl PrintCommand {
    /// Build the command for `request` against a config snapshot.
    pub fn build(request: &PrintRequest, config: &PrinterConfig, file: &Path) -> Self {
        let mut flags = Vec::new();

        if let Some(printer) = &config.default_printer {
            flags.push("-d".to_string());
            flags.push(printer.clone());
        }

        if let Some(copies) = resolve_copies(request) {
            flags.push("-n".to_string());
            flags.push(copies.to_string());
        }

        for (name, value) in resolve_options(request) {
            flags.push("-o".to_string());
            flags.push(format!("{name}={value}"));
        }

        Self {
            flags,
            file: file.to_path_buf(),
        }
    }

    pub fn program(&self) -> &'static str {
        LP_PROGRAM
    }

    /// Arguments to pass to the process, file last.
    pub fn args(&self) -> Vec<String> {
        let mut args = self.flags.clone();
        args.push(self.file.to_string_lossy().into_owned());
        args
    }
}

/// Shell-like rendering for logs, e.g. `lp -d QW410 "uploads/print_1.jpg"`.
/// Never executed.
impl fmt::Display for PrintCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(LP_PROGRAM)?;
        for flag in &self.flags {
            if flag.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
                write!(f, " '{}'", flag.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {flag}")?;
            }
        }
        write!(f, " \"{}\"", self.file.display())
    }
}

/// Copy count from the first copies field present.  Anything that is not a
/// positive integer yields `None`; the field is then dropped silently.
pub fn resolve_copies(request: &PrintRequest) -> Option<u32> {
    let raw = COPIES_FIELDS.iter().find_map(|name| request.field(name))?;
    raw.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

/// `printerOption_<name>` fields as `(name, value)` pairs, in request order.
pub fn resolve_options(request: &PrintRequest) -> Vec<(String, String)> {
    request
        .fields
        .iter()
        .filter_map(|(key, value)| {
            let name = key.strip_prefix(OPTION_FIELD_PREFIX)?;
            (!name.is_empty()).then(|| (name.to_string(), value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use boothprint_core::ImageSource;

    fn request(fields: &[(&str, &str)]) -> PrintRequest {
        PrintRequest::new(
            ImageSource::Base64 { payload: "AAAA".into() },
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn config(printer: Option<&str>) -> PrinterConfig {
        PrinterConfig {
            default_printer: printer.map(String::from),
            ..PrinterConfig::default()
        }
    }

    #[test]
    fn default_printer_only() {
        let cmd = PrintCommand::build(&request(&[]), &config(Some("QW410")), Path::new("uploads/a.jpg"));
        assert_eq!(cmd.args(), ["-d", "QW410", "uploads/a.jpg"]);
        assert_eq!(cmd.to_string(), r#"lp -d QW410 "uploads/a.jpg""#);
    }

    #[test]
    fn no_printer_means_no_destination_flag() {
        let cmd = PrintCommand::build(&request(&[]), &config(None), Path::new("a.jpg"));
        assert_eq!(cmd.args(), ["a.jpg"]);
    }

    #[test]
    fn positive_copies_emit_n() {
        for raw in ["1", "2", " 7 ", "250"] {
            let cmd = PrintCommand::build(&request(&[("copies", raw)]), &config(None), Path::new("a.jpg"));
            assert_eq!(cmd.flags, ["-n", raw.trim()], "copies = {raw:?}");
        }
    }

    #[test]
    fn bad_copies_are_dropped() {
        for raw in ["0", "-2", "two", "", "1.5", "3x"] {
            let cmd = PrintCommand::build(&request(&[("copies", raw)]), &config(None), Path::new("a.jpg"));
            assert!(cmd.flags.is_empty(), "copies = {raw:?} produced {:?}", cmd.flags);
        }
    }

    #[test]
    fn number_of_copies_wins_over_copies() {
        let req = request(&[("copies", "5"), ("number_of_copies", "2")]);
        assert_eq!(resolve_copies(&req), Some(2));

        // The first field found decides, even when its value is unusable.
        let req = request(&[("number_of_copies", "many"), ("copies", "5")]);
        assert_eq!(resolve_copies(&req), None);
    }

    #[test]
    fn flags_follow_fixed_order() {
        let req = request(&[
            ("printerOption_Cutter", "Enabled"),
            ("copies", "2"),
            ("event", "wedding"),
            ("printerOption_Media", "2x6"),
        ]);
        let cmd = PrintCommand::build(&req, &config(Some("QW410")), Path::new("s.jpg"));
        assert_eq!(
            cmd.args(),
            ["-d", "QW410", "-n", "2", "-o", "Cutter=Enabled", "-o", "Media=2x6", "s.jpg"]
        );
    }

    #[test]
    fn option_values_are_not_shell_interpreted() {
        let req = request(&[("printerOption_Title", "Ann's $(party)")]);
        let cmd = PrintCommand::build(&req, &config(None), Path::new("s.jpg"));
        assert_eq!(cmd.args()[1], "Title=Ann's $(party)");
        assert_eq!(cmd.to_string(), r#"lp -o 'Title=Ann'\''s $(party)' "s.jpg""#);
    }
}
