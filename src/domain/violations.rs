//! Core domain models for conformance violations and check results
//!
//! Architecture: Rich Domain Models - Violations are immutable records tied to a rule and a declaration
//! - Violations point back at the declaration that failed a rule
//! - ConformanceReport acts as an aggregate root over violations and scan failures
//! - Exit-code policy lives with the report, not with the CLI

use crate::domain::source::{compare_paths, DeclarationKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Severity levels for conformance violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Should be addressed but is not blocking on its own
    Warning,
    /// Blocks commits and fails CI builds
    Error,
}

impl Severity {
    /// Whether this severity level is blocking regardless of threshold
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Error)
    }

    /// Convert to string for display
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Whether this severity reaches the given threshold
    pub fn meets(self, threshold: Severity) -> bool {
        self >= threshold
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ConductError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(ConductError::config(format!(
                "Unknown severity '{other}'. Expected 'warning' or 'error'"
            ))),
        }
    }
}

/// Reference to the declaration a violation is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationRef {
    /// Position of the declaration within its source unit
    pub index: usize,
    /// Declared name
    pub name: String,
    /// Declaration kind
    pub kind: DeclarationKind,
}

/// A conformance violation produced by the evaluator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Identifier of the rule that produced this violation
    pub rule_id: String,
    /// Severity level of this violation
    pub severity: Severity,
    /// File the offending declaration lives in
    pub file_path: PathBuf,
    /// Line number (1-indexed)
    pub line: u32,
    /// The offending declaration
    pub declaration: DeclarationRef,
    /// Human-readable rationale
    pub message: String,
}

impl Violation {
    /// Create a new violation
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        file_path: PathBuf,
        line: u32,
        declaration: DeclarationRef,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            file_path,
            line,
            declaration,
            message: message.into(),
        }
    }

    /// Whether this violation is blocking (prevents commits/builds)
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }

    /// Format violation for display
    pub fn format_display(&self) -> String {
        format!(
            "{}:{} [{}] {}: {}",
            self.file_path.display(),
            self.line,
            self.severity.as_str(),
            self.rule_id,
            self.message
        )
    }
}

/// Why a source file could not be turned into a source unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanFailureKind {
    Unreadable,
    Malformed,
}

impl ScanFailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unreadable => "unreadable",
            Self::Malformed => "malformed",
        }
    }
}

/// A per-file scan error recorded in the report instead of aborting the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub file_path: PathBuf,
    pub kind: ScanFailureKind,
    pub message: String,
}

impl ScanFailure {
    /// Convert a scanner error into a recorded failure.
    ///
    /// Returns `None` for errors that are not per-file scan failures, which
    /// callers must propagate instead.
    pub fn from_error(error: &ConductError) -> Option<Self> {
        match error {
            ConductError::UnreadableSource { path, message } => Some(Self {
                file_path: path.clone(),
                kind: ScanFailureKind::Unreadable,
                message: message.clone(),
            }),
            ConductError::MalformedSource { path, line, message } => Some(Self {
                file_path: path.clone(),
                kind: ScanFailureKind::Malformed,
                message: match line {
                    Some(line) => format!("line {line}: {message}"),
                    None => message.clone(),
                },
            }),
            _ => None,
        }
    }
}

/// Summary statistics for a conformance report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of files selected for scanning
    pub total_files: usize,
    /// Number of files successfully scanned
    pub units_scanned: usize,
    /// Number of violations by severity level
    pub violations_by_severity: ViolationCounts,
}

/// Count of violations by severity level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViolationCounts {
    pub error: usize,
    pub warning: usize,
}

impl ViolationCounts {
    /// Total number of violations across all severities
    pub fn total(&self) -> usize {
        self.error + self.warning
    }

    /// Whether there are any blocking violations
    pub fn has_blocking(&self) -> bool {
        self.error > 0
    }

    /// Add a violation to the counts
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
        }
    }

    /// Number of violations at or above a threshold
    pub fn at_or_above(&self, threshold: Severity) -> usize {
        match threshold {
            Severity::Warning => self.total(),
            Severity::Error => self.error,
        }
    }
}

/// Complete conformance report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Violations in deterministic order
    pub violations: Vec<Violation>,
    /// Files that could not be scanned
    pub scan_failures: Vec<ScanFailure>,
    /// Summary statistics
    pub summary: ReportSummary,
}

/// Process exit codes of the `check` command
pub mod exit_code {
    pub const CLEAN: i32 = 0;
    pub const VIOLATIONS: i32 = 1;
    pub const SCAN_FAILURE: i32 = 2;
    pub const INTERRUPTED: i32 = 130;
}

impl ConformanceReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a violation to the report
    pub fn add_violation(&mut self, violation: Violation) {
        self.summary.violations_by_severity.add(violation.severity);
        self.violations.push(violation);
    }

    /// Record a file that could not be scanned
    pub fn add_scan_failure(&mut self, failure: ScanFailure) {
        self.scan_failures.push(failure);
    }

    /// Whether the report contains any violations
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Whether the report contains blocking violations (errors)
    pub fn has_errors(&self) -> bool {
        self.summary.violations_by_severity.has_blocking()
    }

    /// Whether any input could not be scanned
    pub fn has_scan_failures(&self) -> bool {
        !self.scan_failures.is_empty()
    }

    /// Get violations of a specific severity
    pub fn violations_by_severity(&self, severity: Severity) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.severity == severity)
    }

    /// Get violations reported against one file
    pub fn violations_for_file<'a>(
        &'a self,
        file: &'a std::path::Path,
    ) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.file_path == file)
    }

    /// Set the number of files selected for scanning
    pub fn set_files_analyzed(&mut self, count: usize) {
        self.summary.total_files = count;
    }

    /// Set the number of files turned into source units
    pub fn set_units_scanned(&mut self, count: usize) {
        self.summary.units_scanned = count;
    }

    /// Sort scan failures by path for consistent output.
    ///
    /// Violations arrive already ordered from the evaluator.
    pub fn sort_scan_failures(&mut self) {
        self.scan_failures
            .sort_by(|a, b| compare_paths(&a.file_path, &b.file_path).then_with(|| a.kind.cmp(&b.kind)));
    }

    /// Exit code for this report under the given severity threshold
    pub fn exit_code(&self, threshold: Severity) -> i32 {
        if self.has_scan_failures() {
            exit_code::SCAN_FAILURE
        } else if self.summary.violations_by_severity.at_or_above(threshold) > 0 {
            exit_code::VIOLATIONS
        } else {
            exit_code::CLEAN
        }
    }
}

/// Error types that can occur while checking conformance
#[derive(Debug, thiserror::Error)]
pub enum ConductError {
    /// Two rules were registered under the same identifier
    #[error("Duplicate rule identifier '{rule_id}'")]
    DuplicateRule { rule_id: String },

    /// A source path could not be read
    #[error("Unreadable source {}: {message}", path.display())]
    UnreadableSource { path: PathBuf, message: String },

    /// A source file could not be tokenized
    #[error("Malformed source {}: {message}", path.display())]
    MalformedSource {
        path: PathBuf,
        line: Option<u32>,
        message: String,
    },

    /// A rule predicate failed on a declaration
    #[error("Rule '{rule_id}' faulted: {message}")]
    RulePredicateFault { rule_id: String, message: String },

    /// Configuration file could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Pattern compilation failed
    #[error("Pattern error: {message}")]
    Pattern { message: String },

    /// Generic I/O failure outside of source scanning
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// The run was interrupted and partial results were discarded
    #[error("Run interrupted; partial results discarded")]
    Interrupted,
}

impl ConductError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create a pattern error
    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern { message: message.into() }
    }

    /// Create an unreadable-source error
    pub fn unreadable(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::UnreadableSource { path: path.into(), message: message.into() }
    }

    /// Create a malformed-source error
    pub fn malformed(path: impl Into<PathBuf>, line: Option<u32>, message: impl Into<String>) -> Self {
        Self::MalformedSource { path: path.into(), line, message: message.into() }
    }

    /// Create a rule predicate fault
    pub fn rule_fault(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RulePredicateFault { rule_id: rule_id.into(), message: message.into() }
    }
}

/// Result type for conduct-guard operations
pub type ConductResult<T> = Result<T, ConductError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn decl_ref(name: &str) -> DeclarationRef {
        DeclarationRef { index: 0, name: name.to_string(), kind: DeclarationKind::Method }
    }

    fn violation(rule: &str, severity: Severity, file: &str) -> Violation {
        Violation::new(rule, severity, PathBuf::from(file), 3, decl_ref("run"), "message")
    }

    #[test]
    fn test_violation_creation() {
        let v = violation("public-method-doc", Severity::Error, "src/A.java");

        assert_eq!(v.rule_id, "public-method-doc");
        assert_eq!(v.file_path, Path::new("src/A.java"));
        assert_eq!(v.line, 3);
        assert_eq!(v.declaration.name, "run");
        assert!(v.is_blocking());
        assert_eq!(v.format_display(), "src/A.java:3 [error] public-method-doc: message");
    }

    #[test]
    fn test_report_counts() {
        let mut report = ConformanceReport::new();
        report.add_violation(violation("a", Severity::Error, "A.java"));
        report.add_violation(violation("b", Severity::Warning, "B.java"));

        assert!(report.has_violations());
        assert!(report.has_errors());
        assert_eq!(report.summary.violations_by_severity.total(), 2);
        assert_eq!(report.summary.violations_by_severity.at_or_above(Severity::Error), 1);
        assert_eq!(report.violations_for_file(Path::new("B.java")).count(), 1);
    }

    #[test]
    fn test_exit_code_precedence() {
        let mut report = ConformanceReport::new();
        assert_eq!(report.exit_code(Severity::Warning), exit_code::CLEAN);

        report.add_violation(violation("a", Severity::Warning, "A.java"));
        assert_eq!(report.exit_code(Severity::Warning), exit_code::VIOLATIONS);
        assert_eq!(report.exit_code(Severity::Error), exit_code::CLEAN);

        report.add_scan_failure(ScanFailure {
            file_path: PathBuf::from("C.java"),
            kind: ScanFailureKind::Malformed,
            message: "unterminated string".to_string(),
        });
        assert_eq!(report.exit_code(Severity::Error), exit_code::SCAN_FAILURE);
    }

    #[test]
    fn test_severity_parsing_and_ordering() {
        assert_eq!("Error".parse::<Severity>().unwrap(), Severity::Error);
        assert_eq!("warning".parse::<Severity>().unwrap(), Severity::Warning);
        assert!("info".parse::<Severity>().is_err());
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Error.meets(Severity::Warning));
        assert!(!Severity::Warning.meets(Severity::Error));
    }

    #[test]
    fn test_scan_failure_from_error() {
        let err = ConductError::malformed("X.java", Some(4), "unterminated block comment");
        let failure = ScanFailure::from_error(&err).unwrap();
        assert_eq!(failure.kind, ScanFailureKind::Malformed);
        assert_eq!(failure.message, "line 4: unterminated block comment");

        assert!(ScanFailure::from_error(&ConductError::Interrupted).is_none());
    }
}
