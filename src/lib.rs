//! conduct-guard - Rule-conformance checking for codebases against a code of conduct
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Pure domain logic separated from infrastructure concerns
//! - Registry, scanner and evaluator meet only through domain types
//! - ConductChecker offers the check workflows the CLI is built on

pub mod analyzer;
pub mod config;
pub mod domain;
pub mod evaluator;
pub mod registry;
pub mod report;
pub mod scanner;

// Re-export main types for convenient access
pub use domain::source::{BodyFeature, Declaration, DeclarationKind, Signal, SourceUnit, TypeKind, Visibility};
pub use domain::violations::{
    exit_code, ConductError, ConductResult, ConformanceReport, ReportSummary, ScanFailure, ScanFailureKind,
    Severity, Violation,
};

pub use config::{ConductConfig, ConfigBuilder, RuleSettings};

pub use analyzer::{AnalysisOptions, Analyzer, Interrupt};

pub use evaluator::RuleEvaluator;

pub use registry::{Finding, Rule, RulePredicate, RuleRegistry};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

pub use scanner::{ErrorTaxonomy, JavaAdapter, LanguageAdapter, SourceScanner};

use std::path::Path;

/// Main checker providing high-level conformance operations
pub struct ConductChecker {
    analyzer: Analyzer,
    report_formatter: ReportFormatter,
}

impl ConductChecker {
    /// Create a checker with the given configuration
    pub fn new_with_config(config: ConductConfig) -> ConductResult<Self> {
        let analyzer = Analyzer::new(config)?;
        Ok(Self { analyzer, report_formatter: ReportFormatter::default() })
    }

    /// Create a checker with default configuration
    pub fn new() -> ConductResult<Self> {
        Self::new_with_config(ConductConfig::default())
    }

    /// Create a checker loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> ConductResult<Self> {
        Self::new_with_config(ConductConfig::load_from_file(path)?)
    }

    /// Create a checker around a custom rule registry
    pub fn with_registry(config: ConductConfig, registry: RuleRegistry) -> Self {
        Self { analyzer: Analyzer::with_registry(config, registry), report_formatter: ReportFormatter::default() }
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Rules this checker evaluates, in registration order
    pub fn registry(&self) -> &RuleRegistry {
        self.analyzer.registry()
    }

    /// Check files and directories, stopping early if interrupted
    pub fn check_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &AnalysisOptions,
        interrupt: &Interrupt,
    ) -> ConductResult<ConformanceReport> {
        self.analyzer.analyze_paths(paths, options, interrupt)
    }

    /// Check a single file
    pub fn check_file<P: AsRef<Path>>(&self, file_path: P) -> ConductResult<ConformanceReport> {
        self.check_paths(&[file_path.as_ref()], &AnalysisOptions::default(), &Interrupt::new())
    }

    /// Check an entire directory tree
    pub fn check_directory<P: AsRef<Path>>(
        &self,
        root: P,
        options: &AnalysisOptions,
    ) -> ConductResult<ConformanceReport> {
        self.analyzer.analyze_directory(root, options)
    }

    /// Format a conformance report for output
    pub fn format_report(&self, report: &ConformanceReport, format: OutputFormat) -> ConductResult<String> {
        self.report_formatter.format_report(report, format)
    }
}

/// Convenience function to check a directory with default settings
pub fn check_directory<P: AsRef<Path>>(directory: P) -> ConductResult<ConformanceReport> {
    ConductChecker::new()?.check_directory(directory, &AnalysisOptions::default())
}

/// Gate helpers for hooks and CI pipelines
pub mod gate {
    use super::*;

    /// Fail when any file cannot be scanned or any violation reaches the threshold
    pub fn pre_commit_check<P: AsRef<Path>>(modified_files: &[P], threshold: Severity) -> ConductResult<()> {
        let checker = ConductChecker::new()?;
        let report = checker.check_paths(modified_files, &AnalysisOptions::default(), &Interrupt::new())?;

        if let Some(failure) = report.scan_failures.first() {
            return Err(ConductError::config(format!(
                "Pre-commit check failed: {} could not be scanned ({})",
                failure.file_path.display(),
                failure.message
            )));
        }

        let blocking = report.summary.violations_by_severity.at_or_above(threshold);
        if blocking > 0 {
            return Err(ConductError::config(format!(
                "Pre-commit check failed: {} violation{} at or above {}",
                blocking,
                if blocking == 1 { "" } else { "s" },
                threshold
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const UNDOCUMENTED: &str = "/** Api. */\npublic class Api {\n    public void call() {}\n}\n";
    const CLEAN: &str = "/** Api. */\npublic class Api {\n    /** Calls. */\n    public void call() {}\n}\n";

    #[test]
    fn test_checker_creation() {
        let checker = ConductChecker::new().unwrap();
        assert_eq!(checker.registry().len(), registry::catalog::descriptors().len());
    }

    #[test]
    fn test_check_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("Api.java");
        fs::write(&file, UNDOCUMENTED).unwrap();

        let checker = ConductChecker::new().unwrap();
        let report = checker.check_file(&file).unwrap();
        assert!(report.has_errors());
        assert_eq!(report.summary.total_files, 1);

        let text = checker.format_report(&report, OutputFormat::Text).unwrap();
        assert!(text.contains("public-method-doc"));
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let temp_dir = TempDir::new().unwrap();
        for (name, body) in [("a/Api.java", UNDOCUMENTED), ("b/Api.java", UNDOCUMENTED), ("Clean.java", CLEAN)] {
            let path = temp_dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }

        let checker = ConductChecker::new()
            .unwrap()
            .with_report_formatter(ReportFormatter::new(ReportOptions { use_colors: false, ..Default::default() }));
        let render = || {
            let report = checker.check_directory(temp_dir.path(), &AnalysisOptions::default()).unwrap();
            checker.format_report(&report, OutputFormat::Json).unwrap()
        };

        let first = render();
        assert_eq!(first, render());
        assert!(first.find("a/Api.java").unwrap() < first.find("b/Api.java").unwrap());
    }

    #[test]
    fn test_pre_commit_gate() {
        let temp_dir = TempDir::new().unwrap();
        let clean = temp_dir.path().join("Clean.java");
        let dirty = temp_dir.path().join("Dirty.java");
        fs::write(&clean, CLEAN).unwrap();
        fs::write(&dirty, UNDOCUMENTED).unwrap();

        assert!(gate::pre_commit_check(&[&clean], Severity::Warning).is_ok());
        assert!(gate::pre_commit_check(&[&dirty], Severity::Error).is_err());
        assert!(gate::pre_commit_check(&[temp_dir.path().join("Gone.java")], Severity::Error).is_err());
    }

    #[test]
    fn test_convenience_directory_check() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Clean.java"), CLEAN).unwrap();

        let report = check_directory(temp_dir.path()).unwrap();
        assert_eq!(report.summary.total_files, 1);
        assert!(!report.has_violations());
    }
}
