//! Main analysis orchestrator for conduct-guard
//!
//! Architecture: Domain Services - Analyzer runs the Discover -> Scan -> Evaluate pipeline
//! - Coordinates path filtering, scanning and rule evaluation into one report
//! - A file that cannot be scanned is recorded and the run continues
//! - An interrupt discards partial results instead of reporting them

use crate::config::ConductConfig;
use crate::domain::source::compare_paths;
use crate::domain::violations::{ConductError, ConductResult, ConformanceReport, ScanFailure, Violation};
use crate::evaluator::RuleEvaluator;
use crate::registry::{catalog, RuleRegistry};
use crate::scanner::{PathFilter, SourceScanner};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Main analyzer that orchestrates the entire conformance run
pub struct Analyzer {
    config: ConductConfig,
    registry: RuleRegistry,
    scanner: SourceScanner,
}

/// Options for customizing analysis behavior
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Whether to scan and evaluate in parallel
    pub parallel: bool,
    /// Maximum number of files to analyze
    pub max_files: Option<usize>,
    /// Additional patterns to exclude for this run
    pub exclude_patterns: Vec<String>,
    /// Whether to ignore .conductignore files
    pub ignore_ignore_files: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            max_files: None,
            exclude_patterns: Vec::new(),
            ignore_ignore_files: false,
        }
    }
}

/// Cooperative cancellation flag shared with a signal handler
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> ConductResult<()> {
        if self.is_triggered() {
            Err(ConductError::Interrupted)
        } else {
            Ok(())
        }
    }
}

impl Analyzer {
    /// Create an analyzer with the built-in rule catalog
    pub fn new(config: ConductConfig) -> ConductResult<Self> {
        let registry = catalog::build_registry(&config)?;
        Ok(Self::with_registry(config, registry))
    }

    /// Create an analyzer with a caller-supplied registry
    pub fn with_registry(config: ConductConfig, registry: RuleRegistry) -> Self {
        let scanner = SourceScanner::java(&config);
        Self { config, registry, scanner }
    }

    /// Create an analyzer with default configuration
    pub fn with_defaults() -> ConductResult<Self> {
        Self::new(ConductConfig::default())
    }

    pub fn config(&self) -> &ConductConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn scanner(&self) -> &SourceScanner {
        &self.scanner
    }

    /// Scan and evaluate a single file
    pub fn analyze_file<P: AsRef<Path>>(&self, file_path: P) -> ConductResult<Vec<Violation>> {
        let unit = self.scanner.scan(file_path.as_ref())?;
        Ok(RuleEvaluator::new(false).evaluate(std::slice::from_ref(&unit), &self.registry))
    }

    /// Analyze files and directory trees into a complete conformance report
    pub fn analyze_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &AnalysisOptions,
        interrupt: &Interrupt,
    ) -> ConductResult<ConformanceReport> {
        let mut report = ConformanceReport::new();

        let files = self.discover(paths, options)?;
        report.set_files_analyzed(files.len());
        tracing::info!("Scanning {} files with {} rules", files.len(), self.registry.len());
        interrupt.check()?;

        let scan = |file: &PathBuf| {
            interrupt.check()?;
            self.scanner.scan(file)
        };
        let results: Vec<ConductResult<_>> = if options.parallel {
            files.par_iter().map(scan).collect()
        } else {
            files.iter().map(scan).collect()
        };
        interrupt.check()?;

        let mut units = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(unit) => units.push(unit),
                Err(error) => match ScanFailure::from_error(&error) {
                    Some(failure) => {
                        tracing::warn!("{}", error);
                        report.add_scan_failure(failure);
                    }
                    None => return Err(error),
                },
            }
        }
        report.set_units_scanned(units.len());

        let violations = RuleEvaluator::new(options.parallel).evaluate(&units, &self.registry);
        interrupt.check()?;

        for violation in violations {
            report.add_violation(violation);
        }
        report.sort_scan_failures();

        Ok(report)
    }

    /// Analyze a directory tree
    pub fn analyze_directory<P: AsRef<Path>>(
        &self,
        root: P,
        options: &AnalysisOptions,
    ) -> ConductResult<ConformanceReport> {
        self.analyze_paths(&[root.as_ref()], options, &Interrupt::new())
    }

    /// Files to scan: named files as given, directories walked and filtered
    fn discover<P: AsRef<Path>>(&self, paths: &[P], options: &AnalysisOptions) -> ConductResult<Vec<PathBuf>> {
        let filter = PathFilter::from_config(
            &self.config.paths,
            &options.exclude_patterns,
            !options.ignore_ignore_files,
        )?;

        let mut files = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                let found = filter.find_files(path)?;
                let before = files.len();
                files.extend(found.into_iter().filter(|f| self.scanner.handles(f)));
                tracing::debug!("Discovered {} files under {}", files.len() - before, path.display());
            } else {
                // missing paths surface as unreadable during the scan
                files.push(path.to_path_buf());
            }
        }

        files.sort_by(|a, b| compare_paths(a, b));
        files.dedup();
        if let Some(max_files) = options.max_files {
            files.truncate(max_files);
        }

        Ok(files)
    }
}
