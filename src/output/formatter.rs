//! Output formatters for conformance results
//!
//! Provides table, JSON, CSV and one-line summary formats.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::warn;

use crate::models::{RequestResult, RunSummary, ScenarioReport, ScenarioStatus, TestStatus};

const CSV_HEADER: [&str; 9] = [
    "service",
    "operation",
    "index",
    "container_id",
    "status",
    "failure",
    "duration_ms",
    "pages",
    "message",
];

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format a single request result
    pub fn format_result(&self, result: &RequestResult) -> String {
        match self.format {
            OutputFormat::Table => self.format_result_table(result),
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(result),
            OutputFormat::Csv => csv_rows(std::iter::once(("", "", result)), false),
            OutputFormat::Summary => format!(
                "{} {} ({}ms)",
                result.status.symbol(),
                result.name(),
                result.duration_ms
            ),
        }
    }

    /// Format one scenario report
    pub fn format_report(&self, report: &ScenarioReport) -> String {
        match self.format {
            OutputFormat::Table => self.format_report_table(report),
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(report),
            OutputFormat::Csv => csv_rows(report_rows(report), true),
            OutputFormat::Summary => self.format_report_brief(report),
        }
    }

    /// Format a run across many scenarios
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(summary),
            OutputFormat::Csv => csv_rows(summary.scenarios.iter().flat_map(report_rows), true),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn json<T: Serialize>(&self, value: &T) -> String {
        if self.format == OutputFormat::JsonPretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }

    fn status_label(&self, status: TestStatus) -> String {
        let label = format!("{} {}", status.symbol(), status);
        if !self.colorize {
            return label;
        }
        let color = match status {
            TestStatus::Pass => "32",
            TestStatus::Fail | TestStatus::Error => "31",
        };
        format!("\x1b[{color}m{label}\x1b[0m")
    }

    fn format_result_table(&self, result: &RequestResult) -> String {
        let mut line = format!(
            "{:12} {:24} {} [{:>6}ms]",
            result.name(),
            result.container_id,
            self.status_label(result.status),
            result.duration_ms
        );
        if let Some(pages) = result.pages {
            line.push_str(&format!(" {pages} page(s)"));
        }
        if let Some(message) = &result.message {
            line.push_str(&format!("\n{:15}{}", "", message));
        }
        line
    }

    fn format_report_table(&self, report: &ScenarioReport) -> String {
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!(
            "║  {:48} {:>10}  ║\n",
            report.key.to_string(),
            report.status.to_string()
        ));
        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        if let Some(reason) = &report.reason {
            output.push_str(&format!("  {reason}\n"));
        }
        for result in &report.results {
            output.push_str(&format!("  {}\n", self.format_result_table(result)));
        }

        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        output.push_str(&format!(
            "║  Total: {:3} | Pass: {:3} | Fail: {:3} | Error: {:3}            ║\n",
            report.total, report.passed, report.failed, report.errors
        ));
        output.push_str(&format!(
            "║  Pass Rate: {:5.1}% | Duration: {:8}ms                     ║\n",
            report.pass_rate(),
            report.total_duration_ms
        ));
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        output
    }

    fn format_report_brief(&self, report: &ScenarioReport) -> String {
        match report.status {
            ScenarioStatus::Completed => format!(
                "{}: {}/{} passed ({:.1}%) in {}ms",
                report.key,
                report.passed,
                report.total,
                report.pass_rate(),
                report.total_duration_ms
            ),
            ScenarioStatus::Skipped | ScenarioStatus::Cancelled => format!(
                "{}: {} ({})",
                report.key,
                report.status,
                report.reason.as_deref().unwrap_or("no reason given")
            ),
        }
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str(
            "\n┌──────────────────────────────────────┬────────────┬───────┬───────┬───────┐\n",
        );
        output.push_str(
            "│ Operation                            │ Status     │ Pass  │ Fail  │ Error │\n",
        );
        output.push_str(
            "├──────────────────────────────────────┼────────────┼───────┼───────┼───────┤\n",
        );

        for report in &summary.scenarios {
            output.push_str(&format!(
                "│ {:36} │ {:10} │ {:5} │ {:5} │ {:5} │\n",
                report.key.to_string(),
                report.status.to_string(),
                report.passed,
                report.failed,
                report.errors
            ));
        }
        for aborted in &summary.aborted {
            output.push_str(&format!(
                "│ {:36} │ {:10} │ {:>5} │ {:>5} │ {:>5} │\n",
                aborted.key.to_string(),
                "ABORTED",
                "-",
                "-",
                "-"
            ));
        }

        output.push_str(
            "└──────────────────────────────────────┴────────────┴───────┴───────┴───────┘\n",
        );

        let rate = format!("{:.1}%", summary.pass_rate());
        let rate = if self.colorize {
            let color = if summary.is_all_passed() { "32" } else { "31" };
            format!("\x1b[{color}m{rate}\x1b[0m")
        } else {
            rate
        };
        output.push_str(&format!(
            " Requests: {} | Pass: {} | Fail: {} | Error: {} | Pass Rate: {}\n",
            summary.requests, summary.passed, summary.failed, summary.errors, rate
        ));

        for aborted in &summary.aborted {
            output.push_str(&format!(" ! {}: {}\n", aborted.key, aborted.error));
        }

        output
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        format!(
            "{} scenario(s), {} skipped, {} cancelled, {} aborted: {}/{} requests passed ({:.1}%) in {}ms",
            summary.scenarios.len(),
            summary.skipped,
            summary.cancelled,
            summary.aborted.len(),
            summary.passed,
            summary.requests,
            summary.pass_rate(),
            summary.total_duration_ms
        )
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

fn report_rows(report: &ScenarioReport) -> impl Iterator<Item = (&str, &str, &RequestResult)> {
    report
        .results
        .iter()
        .map(|r| (report.key.service.as_str(), report.key.operation.as_str(), r))
}

fn csv_rows<'a>(
    rows: impl Iterator<Item = (&'a str, &'a str, &'a RequestResult)>,
    header: bool,
) -> String {
    let mut buffer = Vec::new();
    if let Err(err) = write_csv(&mut buffer, rows, header) {
        warn!("Failed to format results as CSV: {}", err);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Stream result rows as CSV into `out`
pub fn write_csv<'a, W: Write>(
    out: W,
    rows: impl Iterator<Item = (&'a str, &'a str, &'a RequestResult)>,
    header: bool,
) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);

    if header {
        writer.write_record(CSV_HEADER)?;
    }
    for (service, operation, result) in rows {
        writer.write_record([
            service.to_string(),
            operation.to_string(),
            result.index.to_string(),
            result.container_id.clone(),
            result.status.to_string(),
            result.failure.map(|f| f.to_string()).unwrap_or_default(),
            result.duration_ms.to_string(),
            result.pages.map(|p| p.to_string()).unwrap_or_default(),
            result.message.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a run summary to a file
pub fn write_summary_to_file(
    path: impl AsRef<Path>,
    summary: &RunSummary,
    format: OutputFormat,
) -> Result<()> {
    let path = path.as_ref();
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    if format == OutputFormat::Csv {
        let rows = summary.scenarios.iter().flat_map(report_rows);
        write_csv(&mut file, rows, true)
            .with_context(|| format!("Failed to write CSV to {}", path.display()))?;
    } else {
        let content = ResultFormatter::new(format).no_color().format_summary(summary);
        file.write_all(content.as_bytes())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AbortedScenario, FailureKind, OperationKey};

    fn report() -> ScenarioReport {
        ScenarioReport::new(
            OperationKey::new("widgets", "ListWidgets"),
            ScenarioStatus::Completed,
            vec![
                RequestResult::pass(0, "c1", 12).with_pages(Some(2)),
                RequestResult::fail(1, "c2", 7, "field \"Id\" differs, got w-2"),
            ],
        )
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("TABLE"), Some(OutputFormat::Table));
        assert_eq!(
            OutputFormat::from_str("json-pretty"),
            Some(OutputFormat::JsonPretty)
        );
        assert_eq!(OutputFormat::from_str("unknown"), None);
    }

    #[test]
    fn test_format_result_summary() {
        let formatter = ResultFormatter::new(OutputFormat::Summary);
        let output = formatter.format_result(&RequestResult::pass(3, "c4", 100));
        assert_eq!(output, "✓ request:3 (100ms)");
    }

    #[test]
    fn test_table_without_color() {
        let formatter = ResultFormatter::new(OutputFormat::Table).no_color();
        let output = formatter.format_report(&report());
        assert!(output.contains("widgets.ListWidgets"));
        assert!(output.contains("✗ FAIL"));
        assert!(output.contains("2 page(s)"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_csv_escapes_messages() {
        let formatter = ResultFormatter::new(OutputFormat::Csv);
        let output = formatter.format_report(&report());

        let mut reader = csv::Reader::from_reader(output.as_bytes());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][4], "PASS");
        assert_eq!(&rows[0][7], "2");
        assert_eq!(&rows[1][5], "validation");
        assert_eq!(&rows[1][8], "field \"Id\" differs, got w-2");
    }

    #[test]
    fn test_json_summary() {
        let summary = RunSummary::new(vec![report()], Vec::new());
        let formatter = ResultFormatter::new(OutputFormat::Json);
        let value: serde_json::Value =
            serde_json::from_str(&formatter.format_summary(&summary)).unwrap();
        assert_eq!(value["requests"], 2);
        assert_eq!(value["scenarios"][0]["key"]["service"], "widgets");
    }

    #[test]
    fn test_brief_summary_counts_aborted() {
        let summary = RunSummary::new(
            vec![
                report(),
                ScenarioReport::skipped(
                    OperationKey::new("widgets", "DeleteWidget"),
                    "operation is not enabled",
                ),
            ],
            vec![AbortedScenario {
                key: OperationKey::new("gadgets", "GetGadget"),
                error: "bad batch".to_string(),
            }],
        );
        let output = ResultFormatter::new(OutputFormat::Summary).format_summary(&summary);
        assert!(output.starts_with("2 scenario(s), 1 skipped, 0 cancelled, 1 aborted"));
        assert!(output.contains("1/2 requests passed"));

        let table = ResultFormatter::new(OutputFormat::Table)
            .no_color()
            .format_summary(&summary);
        assert!(table.contains("ABORTED"));
        assert!(table.contains("! gadgets.GetGadget: bad batch"));
    }

    #[test]
    fn test_brief_report_reason() {
        let report = ScenarioReport::new(
            OperationKey::new("widgets", "ListWidgets"),
            ScenarioStatus::Cancelled,
            vec![RequestResult::error(0, "c1", FailureKind::Cancelled, "context cancelled")],
        )
        .with_reason("context cancelled");
        let output = ResultFormatter::new(OutputFormat::Summary).format_report(&report);
        assert_eq!(output, "widgets.ListWidgets: CANCELLED (context cancelled)");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_csv_reports_io_errors() {
        let report = report();
        let err = write_csv(BrokenPipe, report_rows(&report), true).unwrap_err();
        assert!(err.to_string().contains("closed"));

        let mut buffer = Vec::new();
        write_csv(&mut buffer, report_rows(&report), false).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_write_csv_summary_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("summary.csv");
        let summary = RunSummary::new(vec![report()], Vec::new());

        write_summary_to_file(&path, &summary, OutputFormat::Csv).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.records().count(), 2);
    }

    #[test]
    fn test_write_summary_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("summary.json");
        let summary = RunSummary::new(vec![report()], Vec::new());

        write_summary_to_file(&path, &summary, OutputFormat::JsonPretty).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"passed\": 1"));
    }
}
