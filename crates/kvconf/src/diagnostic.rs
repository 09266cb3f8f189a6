//! Diagnostic rendering for conversion errors.

use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::{ConfError, ConfErrorKind};

impl ConfError {
    /// Render this error with ariadne against `source`.
    pub fn render(&self, filename: &str, source: &str) -> String {
        let mut output = Vec::new();
        self.write_report(filename, source, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| format!("{}", self))
    }

    /// Write the error report to a writer.
    pub fn write_report<W: std::io::Write>(&self, filename: &str, source: &str, writer: W) {
        let report = self.build_report(filename);
        let _ = report
            .finish()
            .write((filename, Source::from(source)), writer);
    }

    fn build_report<'a>(
        &self,
        filename: &'a str,
    ) -> ariadne::ReportBuilder<'static, (&'a str, std::ops::Range<usize>)> {
        let range: std::ops::Range<usize> = self.span.map(Into::into).unwrap_or(0..0);
        let mut report =
            Report::build(ReportKind::Error, (filename, range.clone())).with_message(self.message());

        if self.span.is_some() {
            report = report.with_label(
                Label::new((filename, range))
                    .with_message(self.label())
                    .with_color(Color::Red),
            );
        }
        if let Some(help) = self.help() {
            report = report.with_help(help);
        }
        report
    }

    fn message(&self) -> String {
        match &self.key {
            Some(key) => format!("cannot apply '{}'", key),
            None => "conversion failed".to_string(),
        }
    }

    fn label(&self) -> String {
        self.kind.to_string()
    }

    fn help(&self) -> Option<String> {
        match &self.kind {
            ConfErrorKind::NoConversion { type_name, .. } => Some(format!(
                "register a converter for {} or a factory named after the value",
                type_name
            )),
            ConfErrorKind::UnknownType { .. } => {
                Some("type names must be registered with the engine's type registry".into())
            }
            ConfErrorKind::IndexOutOfRange { .. } => {
                Some("raise the member's limit with `max_len`".into())
            }
            _ => None,
        }
    }
}
