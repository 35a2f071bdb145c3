//! Report generation with multiple output formats
//!
//! Architecture: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - ConformanceReport (domain) is converted to various external representations
//! - Each formatter encapsulates the rules for its specific output format
//! - Output carries no timestamps, so identical inputs render identical bytes

use crate::domain::violations::{ConductError, ConductResult, ConformanceReport, ScanFailure, Severity, Violation};
use serde_json::Value as JsonValue;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Supported output formats for conformance reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text with optional colors
    Text,
    /// JSON format for programmatic consumption
    Json,
    /// GitHub Actions workflow commands
    GitHub,
    /// SARIF 2.1.0 for code scanning tools
    Sarif,
}

impl OutputFormat {
    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["text", "json", "github", "sarif"]
    }
}

impl FromStr for OutputFormat {
    type Err = ConductError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "human" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "github" => Ok(Self::GitHub),
            "sarif" => Ok(Self::Sarif),
            other => Err(ConductError::config(format!(
                "Unknown output format '{other}'. Available: {}",
                Self::all_formats().join(", ")
            ))),
        }
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (text format only)
    pub use_colors: bool,
    /// Maximum number of violations to include
    pub max_violations: Option<usize>,
    /// Minimum severity level to include
    pub min_severity: Option<Severity>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { use_colors: true, max_violations: None, min_severity: None }
    }
}

/// Main report formatter that dispatches to specific formatters
pub struct ReportFormatter {
    options: ReportOptions,
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(ReportOptions::default())
    }
}

impl ReportFormatter {
    /// Create a new report formatter with options
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Format a conformance report in the specified format
    pub fn format_report(&self, report: &ConformanceReport, format: OutputFormat) -> ConductResult<String> {
        let violations = self.filter_violations(&report.violations);

        match format {
            OutputFormat::Text => Ok(self.format_text(report, &violations)),
            OutputFormat::Json => self.format_json(report, &violations),
            OutputFormat::GitHub => Ok(self.format_github(report, &violations)),
            OutputFormat::Sarif => self.format_sarif(report, &violations),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &ConformanceReport,
        format: OutputFormat,
        mut writer: W,
    ) -> ConductResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Filter violations based on report options
    fn filter_violations<'a>(&self, violations: &'a [Violation]) -> Vec<&'a Violation> {
        let mut filtered: Vec<&Violation> = violations
            .iter()
            .filter(|v| self.options.min_severity.map_or(true, |min| v.severity.meets(min)))
            .collect();

        if let Some(max) = self.options.max_violations {
            filtered.truncate(max);
        }

        filtered
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.options.use_colors {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    /// Format report in human-readable format
    fn format_text(&self, report: &ConformanceReport, violations: &[&Violation]) -> String {
        let mut output = String::new();
        let has_errors = violations.iter().any(|v| v.severity == Severity::Error);

        if violations.is_empty() {
            output.push_str(&format!("✅ {}\n", self.paint("32", "No conduct violations found")));
        } else {
            let (icon, color) = if has_errors { ("❌", "31") } else { ("⚠️", "33") };
            output.push_str(&format!("{icon} {}\n\n", self.paint(color, "Conduct Violations Found")));

            // violations arrive ordered by file
            let mut by_file: Vec<(&Path, Vec<&Violation>)> = Vec::new();
            for violation in violations {
                match by_file.last_mut() {
                    Some((path, group)) if *path == violation.file_path.as_path() => group.push(violation),
                    _ => by_file.push((violation.file_path.as_path(), vec![violation])),
                }
            }

            for (file_path, file_violations) in by_file {
                output.push_str(&format!("📁 {}\n", file_path.display()));

                for violation in file_violations {
                    let severity_color = match violation.severity {
                        Severity::Error => "31",
                        Severity::Warning => "33",
                    };
                    output.push_str(&format!(
                        "  {} [{}] {}\n",
                        self.paint("2", &format!("{}:{}", violation.line, violation.rule_id)),
                        self.paint(severity_color, violation.severity.as_str()),
                        violation.message
                    ));
                }
                output.push('\n');
            }
        }

        if report.has_scan_failures() {
            output.push_str(&format!("{}\n", self.paint("31", "Files that could not be scanned:")));
            for failure in &report.scan_failures {
                output.push_str(&format!(
                    "  {} [{}] {}\n",
                    failure.file_path.display(),
                    failure.kind.as_str(),
                    failure.message
                ));
            }
            output.push('\n');
        }

        output.push_str(&self.format_summary(report, violations));
        output
    }

    /// Format the summary line
    fn format_summary(&self, report: &ConformanceReport, violations: &[&Violation]) -> String {
        let errors = violations.iter().filter(|v| v.severity == Severity::Error).count();
        let warnings = violations.len() - errors;
        let plural = |n: usize, word: &str| format!("{n} {word}{}", if n == 1 { "" } else { "s" });

        let mut parts = Vec::new();
        if errors > 0 {
            parts.push(self.paint("31", &plural(errors, "error")));
        }
        if warnings > 0 {
            parts.push(self.paint("33", &plural(warnings, "warning")));
        }
        if parts.is_empty() {
            parts.push(self.paint("32", "0 violations"));
        }

        let mut summary = format!(
            "📊 {} {} in {}",
            self.paint("1", "Summary:"),
            parts.join(", "),
            plural(report.summary.total_files, "file")
        );
        if report.has_scan_failures() {
            summary.push_str(&format!(", {} not scanned", report.scan_failures.len()));
        }
        summary.push('\n');
        summary
    }

    /// Format report in JSON format
    fn format_json(&self, report: &ConformanceReport, violations: &[&Violation]) -> ConductResult<String> {
        let json_violations: Vec<JsonValue> = violations
            .iter()
            .map(|v| {
                serde_json::json!({
                    "rule": v.rule_id,
                    "file": v.file_path.display().to_string(),
                    "line": v.line,
                    "message": v.message,
                    "severity": v.severity.as_str(),
                })
            })
            .collect();

        let mut json_report = serde_json::json!({ "violations": json_violations });
        if report.has_scan_failures() {
            json_report["errors"] = report.scan_failures.iter().map(failure_json).collect();
        }

        let mut rendered = serde_json::to_string_pretty(&json_report)
            .map_err(|e| ConductError::config(format!("JSON serialization failed: {e}")))?;
        rendered.push('\n');
        Ok(rendered)
    }

    /// Format report for GitHub Actions
    fn format_github(&self, report: &ConformanceReport, violations: &[&Violation]) -> String {
        let mut output = String::new();

        for violation in violations {
            output.push_str(&format!(
                "::{} file={},line={},title={}::{}\n",
                violation.severity.as_str(),
                violation.file_path.display(),
                violation.line,
                violation.rule_id,
                violation.message
            ));
        }

        for failure in &report.scan_failures {
            output.push_str(&format!(
                "::error file={},title={}::{}\n",
                failure.file_path.display(),
                failure.kind.as_str(),
                failure.message
            ));
        }

        output
    }

    /// Format report in SARIF format
    fn format_sarif(&self, report: &ConformanceReport, violations: &[&Violation]) -> ConductResult<String> {
        let mut rule_ids: Vec<&str> = violations.iter().map(|v| v.rule_id.as_str()).collect();
        rule_ids.sort_unstable();
        rule_ids.dedup();

        let sarif_results: Vec<JsonValue> = violations
            .iter()
            .map(|v| {
                serde_json::json!({
                    "ruleId": v.rule_id,
                    "level": v.severity.as_str(),
                    "message": { "text": v.message },
                    "locations": [{
                        "physicalLocation": {
                            "artifactLocation": { "uri": v.file_path.display().to_string() },
                            "region": { "startLine": v.line.max(1) }
                        },
                        "logicalLocations": [{
                            "name": v.declaration.name,
                            "kind": v.declaration.kind.as_str()
                        }]
                    }]
                })
            })
            .collect();

        let notifications: Vec<JsonValue> = report
            .scan_failures
            .iter()
            .map(|f| {
                serde_json::json!({
                    "level": "error",
                    "message": { "text": format!("{}: {}", f.kind.as_str(), f.message) },
                    "locations": [{
                        "physicalLocation": {
                            "artifactLocation": { "uri": f.file_path.display().to_string() }
                        }
                    }]
                })
            })
            .collect();

        let sarif_report = serde_json::json!({
            "version": "2.1.0",
            "$schema": "https://json.schemastore.org/sarif-2.1.0.json",
            "runs": [{
                "tool": {
                    "driver": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                        "rules": rule_ids.iter().map(|id| serde_json::json!({ "id": id })).collect::<Vec<_>>()
                    }
                },
                "invocations": [{
                    "executionSuccessful": !report.has_scan_failures(),
                    "toolExecutionNotifications": notifications
                }],
                "results": sarif_results
            }]
        });

        serde_json::to_string_pretty(&sarif_report)
            .map_err(|e| ConductError::config(format!("SARIF serialization failed: {e}")))
    }
}

fn failure_json(failure: &ScanFailure) -> JsonValue {
    serde_json::json!({
        "file": failure.file_path.display().to_string(),
        "kind": failure.kind.as_str(),
        "message": failure.message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::DeclarationKind;
    use crate::domain::violations::{DeclarationRef, ScanFailureKind};
    use std::path::PathBuf;

    fn violation(rule: &str, severity: Severity, file: &str, line: u32) -> Violation {
        Violation::new(
            rule,
            severity,
            PathBuf::from(file),
            line,
            DeclarationRef { index: 0, name: "run".to_string(), kind: DeclarationKind::Method },
            format!("{rule} message"),
        )
    }

    fn create_test_report() -> ConformanceReport {
        let mut report = ConformanceReport::new();
        report.add_violation(violation("public-method-doc", Severity::Error, "src/A.java", 42));
        report.add_violation(violation("no-broad-throw", Severity::Warning, "src/B.java", 7));
        report.set_files_analyzed(10);
        report
    }

    fn plain() -> ReportFormatter {
        ReportFormatter::new(ReportOptions { use_colors: false, ..Default::default() })
    }

    #[test]
    fn test_text_format() {
        let output = plain().format_report(&create_test_report(), OutputFormat::Text).unwrap();

        assert!(output.contains("Conduct Violations Found"));
        assert!(output.contains("📁 src/A.java"));
        assert!(output.contains("  42:public-method-doc [error] public-method-doc message"));
        assert!(output.contains("Summary: 1 error, 1 warning in 10 files"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_text_groups_keep_report_order() {
        let mut report = ConformanceReport::new();
        report.add_violation(violation("public-method-doc", Severity::Error, "a-b.java", 1));
        report.add_violation(violation("public-method-doc", Severity::Error, "a/Z.java", 2));
        report.add_violation(violation("no-broad-throw", Severity::Warning, "a/Z.java", 3));

        let output = plain().format_report(&report, OutputFormat::Text).unwrap();
        assert_eq!(output.matches("📁").count(), 2);
        assert!(output.find("📁 a-b.java").unwrap() < output.find("📁 a/Z.java").unwrap());
    }

    #[test]
    fn test_colored_text_format() {
        let output = ReportFormatter::default().format_report(&create_test_report(), OutputFormat::Text).unwrap();
        assert!(output.contains("\x1b[31merror\x1b[0m"));
    }

    #[test]
    fn test_json_shape() {
        let output = plain().format_report(&create_test_report(), OutputFormat::Json).unwrap();
        let json: JsonValue = serde_json::from_str(&output).unwrap();

        assert_eq!(json.as_object().unwrap().keys().collect::<Vec<_>>(), vec!["violations"]);
        let first = &json["violations"][0];
        assert_eq!(first["rule"], "public-method-doc");
        assert_eq!(first["file"], "src/A.java");
        assert_eq!(first["line"], 42);
        assert_eq!(first["severity"], "error");
        assert_eq!(first["message"], "public-method-doc message");
        assert_eq!(first.as_object().unwrap().len(), 5);
    }

    #[test]
    fn test_json_errors_only_with_failures() {
        let mut report = create_test_report();
        report.add_scan_failure(ScanFailure {
            file_path: PathBuf::from("src/Bad.java"),
            kind: ScanFailureKind::Malformed,
            message: "line 3: unterminated string literal".to_string(),
        });

        let output = plain().format_report(&report, OutputFormat::Json).unwrap();
        let json: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(json["errors"][0]["kind"], "malformed");
        assert_eq!(json["errors"][0]["file"], "src/Bad.java");

        let text = plain().format_report(&report, OutputFormat::Text).unwrap();
        assert!(text.contains("src/Bad.java [malformed] line 3: unterminated string literal"));
    }

    #[test]
    fn test_empty_report() {
        let report = ConformanceReport::new();
        let text = plain().format_report(&report, OutputFormat::Text).unwrap();
        assert!(text.contains("No conduct violations found"));

        let json = plain().format_report(&report, OutputFormat::Json).unwrap();
        assert_eq!(json, "{\n  \"violations\": []\n}\n");
    }

    #[test]
    fn test_severity_filtering_and_limit() {
        let formatter = ReportFormatter::new(ReportOptions {
            min_severity: Some(Severity::Error),
            ..Default::default()
        });
        let json: JsonValue =
            serde_json::from_str(&formatter.format_report(&create_test_report(), OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["violations"].as_array().unwrap().len(), 1);
        assert_eq!(json["violations"][0]["rule"], "public-method-doc");

        let limited = ReportFormatter::new(ReportOptions { max_violations: Some(1), ..Default::default() });
        let output = limited.format_report(&create_test_report(), OutputFormat::GitHub).unwrap();
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_github_format() {
        let output = plain().format_report(&create_test_report(), OutputFormat::GitHub).unwrap();
        assert!(output.contains("::error file=src/A.java,line=42,title=public-method-doc::public-method-doc message"));
        assert!(output.contains("::warning file=src/B.java,line=7"));
    }

    #[test]
    fn test_sarif_format() {
        let output = plain().format_report(&create_test_report(), OutputFormat::Sarif).unwrap();
        let json: JsonValue = serde_json::from_str(&output).unwrap();
        let run = &json["runs"][0];
        assert_eq!(json["version"], "2.1.0");
        assert_eq!(run["results"].as_array().unwrap().len(), 2);
        assert_eq!(run["results"][1]["level"], "warning");
        assert_eq!(run["tool"]["driver"]["rules"][0]["id"], "no-broad-throw");
        assert_eq!(run["invocations"][0]["executionSuccessful"], true);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("human".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("junit".parse::<OutputFormat>().is_err());
    }
}
