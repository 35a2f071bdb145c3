//! conduct-guard CLI - Command-line interface for rule-conformance checking
//!
//! Architecture: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to domain operations
//! - Handles external concerns like signals, process exit codes and terminal output
//! - Library errors gain context here and nowhere else

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use conduct_guard::registry::catalog;
use conduct_guard::{
    exit_code, AnalysisOptions, ConductChecker, ConductConfig, ConductError, Interrupt, OutputFormat,
    ReportFormatter, ReportOptions, Severity,
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// conduct-guard - Structural code of conduct enforcement
#[derive(Parser)]
#[command(name = "conduct-guard")]
#[command(version)]
#[command(about = "Check source code against a code of conduct's structurally checkable rules")]
#[command(
    long_about = "conduct-guard scans source files, extracts declarations and evaluates every registered rule (documentation, error handling, resource scoping, test naming, encapsulation) against them. Designed for pre-commit hooks and CI pipelines."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check files for conduct violations
    Check(CheckArgs),

    /// List the rules in the registry
    Rules {
        /// Show only enabled rules
        #[arg(long)]
        enabled_only: bool,
    },

    /// Explain what a specific rule checks
    Explain {
        /// Rule ID to explain
        rule_id: String,
    },

    /// Validate a configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },
}

#[derive(Args)]
struct CheckArgs {
    /// Paths to analyze (files or directories)
    paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormatArg,

    /// Lowest severity that is reported and fails the run
    #[arg(short, long, value_enum, env = "CONDUCT_SEVERITY")]
    severity: Option<SeverityArg>,

    /// Maximum number of violations to report
    #[arg(long)]
    max_violations: Option<usize>,

    /// Additional exclude patterns
    #[arg(long, action = clap::ArgAction::Append)]
    exclude: Vec<String>,

    /// Ignore .conductignore files
    #[arg(long)]
    no_ignore: bool,

    /// Disable parallel processing
    #[arg(long)]
    no_parallel: bool,
}

#[derive(Copy, Clone, ValueEnum, PartialEq, Debug)]
enum OutputFormatArg {
    Text,
    Json,
    Github,
    Sarif,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Text => OutputFormat::Text,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Github => OutputFormat::GitHub,
            OutputFormatArg::Sarif => OutputFormat::Sarif,
        }
    }
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum SeverityArg {
    Warning,
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Error => Severity::Error,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run_command(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(exit_code::SCAN_FAILURE);
        }
    }
}

async fn run_command(cli: Cli) -> anyhow::Result<i32> {
    let use_colors = !cli.no_color && std::io::stdout().is_terminal();

    match cli.command {
        Commands::Check(args) => run_check(cli.config, args, use_colors).await,
        Commands::Rules { enabled_only } => run_list_rules(cli.config, enabled_only),
        Commands::Explain { rule_id } => run_explain(cli.config, &rule_id),
        Commands::ValidateConfig { config_file } => run_validate_config(config_file.or(cli.config)),
    }
}

fn load_config(config_path: Option<&Path>) -> anyhow::Result<ConductConfig> {
    let config = ConductConfig::resolve(config_path, Path::new(".")).context("Failed to load configuration")?;
    Ok(config)
}

async fn run_check(config_path: Option<PathBuf>, args: CheckArgs, use_colors: bool) -> anyhow::Result<i32> {
    let config = load_config(config_path.as_deref())?;
    let threshold = args.severity.map(Severity::from).unwrap_or(config.severity_threshold);
    tracing::debug!("Severity threshold: {}", threshold);

    let checker = ConductChecker::new_with_config(config).context("Failed to build rule registry")?;

    let paths = if args.paths.is_empty() { vec![PathBuf::from(".")] } else { args.paths };
    let options = AnalysisOptions {
        parallel: !args.no_parallel,
        exclude_patterns: args.exclude,
        ignore_ignore_files: args.no_ignore,
        ..Default::default()
    };

    let interrupt = Interrupt::new();
    let worker_interrupt = interrupt.clone();
    let mut task = tokio::task::spawn_blocking(move || checker.check_paths(&paths, &options, &worker_interrupt));

    let joined = tokio::select! {
        joined = &mut task => joined,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => {
                    tracing::warn!("Interrupt received, stopping");
                    interrupt.trigger();
                }
                Err(e) => tracing::warn!("Unable to listen for interrupts: {}", e),
            }
            task.await
        }
    };

    let report = match joined.context("Check worker failed")? {
        Ok(report) => report,
        Err(ConductError::Interrupted) => {
            eprintln!("Interrupted; partial results discarded");
            return Ok(exit_code::INTERRUPTED);
        }
        Err(e) => return Err(e).context("Check failed"),
    };

    let formatter = ReportFormatter::new(ReportOptions {
        use_colors,
        max_violations: args.max_violations,
        min_severity: Some(threshold),
    });
    formatter
        .write_report(&report, args.format.into(), std::io::stdout().lock())
        .context("Failed to write report")?;

    Ok(report.exit_code(threshold))
}

fn run_validate_config(config_path: Option<PathBuf>) -> anyhow::Result<i32> {
    let Some(config_path) = config_path.or_else(|| ConductConfig::discover(Path::new("."))) else {
        println!("No configuration file found; built-in defaults apply");
        return Ok(exit_code::CLEAN);
    };

    println!("Validating configuration: {}", config_path.display());

    match ConductConfig::load_from_file(&config_path) {
        Ok(config) => {
            println!("✅ Configuration is valid");

            let enabled = catalog::descriptors().iter().filter(|d| config.rule_enabled(d.id)).count();
            println!("📊 Configuration summary:");
            println!("  Rules: {} total, {} enabled", catalog::descriptors().len(), enabled);
            println!("  Severity threshold: {}", config.severity_threshold);
            println!("  Path patterns: {}", config.paths.patterns.len());
            println!("  Test method pattern: {}", config.naming.test_method_pattern);

            Ok(exit_code::CLEAN)
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {e}");
            Ok(exit_code::VIOLATIONS)
        }
    }
}

fn run_explain(config_path: Option<PathBuf>, rule_id: &str) -> anyhow::Result<i32> {
    let config = load_config(config_path.as_deref())?;

    let Some(descriptor) = catalog::descriptor(rule_id) else {
        eprintln!("❌ Rule '{rule_id}' not found");
        println!();
        println!("Available rules:");
        for descriptor in catalog::descriptors() {
            println!("  - {}", descriptor.id);
        }
        return Ok(exit_code::VIOLATIONS);
    };

    println!("📖 Rule: {}", descriptor.id);
    println!("⚠️ Severity: {}", config.effective_severity(descriptor.id, descriptor.severity));
    if config.effective_severity(descriptor.id, descriptor.severity) != descriptor.severity {
        println!("   (default: {})", descriptor.severity);
    }
    println!("✅ Enabled: {}", config.rule_enabled(descriptor.id));
    println!();
    println!("📝 Description:");
    println!("   {}", descriptor.description);
    if descriptor.id == catalog::TEST_METHOD_NAMING {
        println!();
        println!("🔎 Pattern:");
        println!("   {}", config.naming.test_method_pattern);
    }

    Ok(exit_code::CLEAN)
}

fn run_list_rules(config_path: Option<PathBuf>, enabled_only: bool) -> anyhow::Result<i32> {
    let config = load_config(config_path.as_deref())?;

    println!("📋 Available Rules\n");

    for descriptor in catalog::descriptors() {
        let enabled = config.rule_enabled(descriptor.id);
        if enabled_only && !enabled {
            continue;
        }

        let status = if enabled { "✅" } else { "❌" };
        println!(
            "  {}🔍 {} [{}] - {}",
            status,
            descriptor.id,
            config.effective_severity(descriptor.id, descriptor.severity),
            descriptor.description
        );
    }

    Ok(exit_code::CLEAN)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn check_args(paths: Vec<PathBuf>) -> CheckArgs {
        CheckArgs {
            paths,
            format: OutputFormatArg::Json,
            severity: None,
            max_violations: None,
            exclude: vec![],
            no_ignore: false,
            no_parallel: false,
        }
    }

    #[tokio::test]
    async fn test_check_command() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("Api.java");
        fs::write(&test_file, "public class Api {\n    public int count;\n}\n").unwrap();

        // public-type-doc and no-public-mutable-field are warnings
        let result = run_check(None, check_args(vec![test_file.clone()]), false).await;
        assert_eq!(result.unwrap(), exit_code::VIOLATIONS);

        let strict = CheckArgs { severity: Some(SeverityArg::Error), ..check_args(vec![test_file]) };
        assert_eq!(run_check(None, strict, false).await.unwrap(), exit_code::CLEAN);
    }

    #[tokio::test]
    async fn test_check_with_invalid_config_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("conduct_guard.yaml");
        fs::write(&config_file, "version: \"9.9\"\n").unwrap();

        let result = run_check(Some(config_file), check_args(vec![temp_dir.path().to_path_buf()]), false).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("test_config.yaml");
        fs::write(&config_file, ConductConfig::default().to_yaml().unwrap()).unwrap();
        assert_eq!(run_validate_config(Some(config_file)).unwrap(), exit_code::CLEAN);

        let broken = temp_dir.path().join("broken.yaml");
        fs::write(&broken, "rules:\n  not-a-rule: {}\n").unwrap();
        assert_eq!(run_validate_config(Some(broken)).unwrap(), exit_code::VIOLATIONS);
    }

    #[test]
    fn test_explain_rule() {
        assert_eq!(run_explain(None, catalog::NO_BROAD_CATCH).unwrap(), exit_code::CLEAN);
        assert_eq!(run_explain(None, "nonexistent-rule").unwrap(), exit_code::VIOLATIONS);
    }

    #[test]
    fn test_list_rules() {
        assert_eq!(run_list_rules(None, false).unwrap(), exit_code::CLEAN);
        assert_eq!(run_list_rules(None, true).unwrap(), exit_code::CLEAN);
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["conduct-guard", "check", "src", "--format", "sarif", "--no-color", "-v"]).unwrap();
        assert!(cli.no_color && cli.verbose);
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.format, OutputFormatArg::Sarif);
                assert_eq!(args.paths, vec![PathBuf::from("src")]);
            }
            _ => panic!("expected check"),
        }
    }
}
