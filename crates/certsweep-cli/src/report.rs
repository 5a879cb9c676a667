//! Report rendering and output
//!
//! JSON renders the whole report as `{"results": [...]}`. CSV renders one row
//! per result with the same fields. The numeric status code is never written.

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use certsweep_core::ScanReport;

use crate::Result;

/// CSV header, used as-is when there are no rows to derive it from.
const CSV_HEADERS: [&str; 6] = ["name", "port", "context", "namespace", "cert_issuer", "error"];

/// Report output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated values (default)
    #[default]
    Csv,
    /// JSON
    Json,
}

impl OutputFormat {
    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Render `report` in `format`.
pub fn render(report: &ScanReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(report)?),
        OutputFormat::Csv => render_csv(report),
    }
}

fn render_csv(report: &ScanReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if report.is_empty() {
        writer.write_record(CSV_HEADERS)?;
    }
    for row in &report.results {
        writer.serialize(row)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes)
        .map_err(|e| crate::Error::Other(format!("csv output is not utf-8: {}", e)))
}

/// Write rendered output to `path`, or stdout when no path is given.
///
/// Returns the number of bytes written to the file.
pub fn write_output(path: Option<&Path>, rendered: &str) -> Result<Option<usize>> {
    match path {
        Some(path) => {
            std::fs::write(path, rendered).map_err(|e| {
                crate::Error::command_failed(format!("unable to write {}: {}", path.display(), e))
            })?;
            Ok(Some(rendered.len()))
        }
        None => {
            println!("{}", rendered);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certsweep_core::{Context, ProbeStatus, ServiceProbeResult, ServiceRef};

    fn sample() -> ScanReport {
        let prod = Context::new("prod", "default");
        let mut api = ServiceProbeResult::discovered(ServiceRef::new("api", "443"), &prod);
        api.succeed("Let's Encrypt");
        let mut db = ServiceProbeResult::discovered(ServiceRef::new("db", "5432"), &prod);
        db.fail(
            ProbeStatus::HandshakeFailed,
            "tls: first record does not look like a TLS handshake, eof",
        );
        ScanReport {
            results: vec![api, db],
        }
    }

    #[test]
    fn json_wraps_results() {
        let rendered = render(&sample(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        let results = value["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["cert_issuer"], "Let's Encrypt");
        assert!(results[1].get("status").is_none());
    }

    #[test]
    fn csv_has_header_and_quotes_commas() {
        let rendered = render(&sample(), OutputFormat::Csv).unwrap();
        let mut lines = rendered.lines();

        assert_eq!(lines.next(), Some("name,port,context,namespace,cert_issuer,error"));
        assert_eq!(lines.next(), Some("api,443,prod,default,Let's Encrypt,"));
        assert_eq!(
            lines.next(),
            Some(concat!(
                "db,5432,prod,default,,",
                "\"tls: first record does not look like a TLS handshake, eof\"",
            ))
        );
    }

    #[test]
    fn empty_report_still_renders() {
        let empty = ScanReport::default();
        assert_eq!(
            render(&empty, OutputFormat::Csv).unwrap().trim_end(),
            "name,port,context,namespace,cert_issuer,error"
        );
        assert_eq!(render(&empty, OutputFormat::Json).unwrap(), r#"{"results":[]}"#);
    }

    #[test]
    fn writes_file_and_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        let written = write_output(Some(&path), "a,b\n").unwrap();
        assert_eq!(written, Some(4));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
    }
}
