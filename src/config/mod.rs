//! Configuration loading and management for conduct-guard
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML into domain settings
//! - Every section has embedded defaults, so an empty file is a valid configuration
//! - Validation happens once at load time, before any file is scanned
//! - Language conventions (error taxonomy, resource types, test markers) are data, not code

use crate::domain::violations::{ConductError, ConductResult, Severity};
use crate::registry::catalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File names probed, in order, when no configuration path is given
pub const DEFAULT_CONFIG_FILES: &[&str] =
    &["conduct_guard.yaml", "conduct_guard.yml", ".conduct_guard.yaml"];

const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConductConfig {
    /// Configuration format version
    pub version: String,
    /// Path filtering configuration
    pub paths: PathConfig,
    /// Error and resource taxonomy of the scanned language
    pub taxonomy: TaxonomyConfig,
    /// Test detection and naming conventions
    pub naming: NamingConfig,
    /// Per-rule overrides keyed by rule identifier
    pub rules: BTreeMap<String, RuleSettings>,
    /// Lowest severity that is reported and fails the run
    pub severity_threshold: Severity,
}

/// Path filtering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Include/exclude patterns (gitignore-style, `!` re-includes)
    pub patterns: Vec<String>,
    /// Optional ignore file name looked up in parent directories
    pub ignore_file: Option<String>,
    /// File extensions handed to the scanner during directory walks
    pub extensions: Vec<String>,
}

/// Error-handling and resource taxonomy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    /// Root of the language's error hierarchy
    pub root: String,
    /// Types treated as broad in addition to the root
    pub broad_types: Vec<String>,
    /// Package qualifying the broad types (e.g. `java.lang`)
    pub root_package: String,
    /// Type name suffixes identifying resources that must be released
    pub resource_suffixes: Vec<String>,
    /// Types matching a suffix that hold no releasable resource
    pub resource_exemptions: Vec<String>,
}

/// Test detection and naming conventions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Annotations marking a method as a test
    pub test_annotations: Vec<String>,
    /// Regular expression test method names must match
    pub test_method_pattern: String,
}

/// Override for one registry rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Severity override (uses the catalog default if not specified)
    #[serde(default)]
    pub severity: Option<Severity>,
}

impl Default for ConductConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            paths: PathConfig::default(),
            taxonomy: TaxonomyConfig::default(),
            naming: NamingConfig::default(),
            rules: BTreeMap::new(),
            severity_threshold: Severity::Warning,
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            patterns: vec![
                "target/".to_string(),
                "**/build/**".to_string(),
                "**/.git/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/*.generated.*".to_string(),
            ],
            ignore_file: Some(".conductignore".to_string()),
            extensions: vec!["java".to_string()],
        }
    }
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            root: "Throwable".to_string(),
            broad_types: vec!["Exception".to_string()],
            root_package: "java.lang".to_string(),
            resource_suffixes: [
                "Stream", "Reader", "Writer", "Connection", "Socket", "Channel", "Scanner",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            resource_exemptions: [
                "ByteArrayInputStream",
                "ByteArrayOutputStream",
                "StringReader",
                "StringWriter",
                "CharArrayReader",
                "CharArrayWriter",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            test_annotations: vec![
                "Test".to_string(),
                "ParameterizedTest".to_string(),
                "RepeatedTest".to_string(),
            ],
            test_method_pattern: "^should".to_string(),
        }
    }
}

impl ConductConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConductResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ConductError::config(format!("Failed to read config file '{}': {e}", path.display()))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            ConductError::config(format!("Failed to parse config file '{}': {e}", path.display()))
        })?;

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> ConductResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| ConductError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Find the first default configuration file in a directory
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES.iter().map(|name| dir.join(name)).find(|p| p.is_file())
    }

    /// Load an explicit file, else a discovered one, else defaults
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> ConductResult<Self> {
        match explicit.map(Path::to_path_buf).or_else(|| Self::discover(dir)) {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> ConductResult<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            return Err(ConductError::config(format!(
                "Unsupported configuration version: {}. Supported versions: {}",
                self.version,
                SUPPORTED_VERSIONS.join(", ")
            )));
        }

        for rule_id in self.rules.keys() {
            if catalog::descriptor(rule_id).is_none() {
                return Err(ConductError::config(format!("Unknown rule '{rule_id}' in rules section")));
            }
        }

        regex::Regex::new(&self.naming.test_method_pattern).map_err(|e| {
            ConductError::config(format!(
                "Invalid test_method_pattern '{}': {e}",
                self.naming.test_method_pattern
            ))
        })?;

        for pattern in &self.paths.patterns {
            let raw = pattern.strip_prefix('!').unwrap_or(pattern);
            glob::Pattern::new(raw.trim_end_matches('/')).map_err(|e| {
                ConductError::config(format!("Invalid path pattern '{pattern}': {e}"))
            })?;
        }

        if self.taxonomy.root.trim().is_empty() {
            return Err(ConductError::config("taxonomy.root must name the root error type"));
        }

        if self.paths.extensions.is_empty() {
            return Err(ConductError::config("paths.extensions must list at least one extension"));
        }

        Ok(())
    }

    /// Severity a rule runs with after configuration overrides
    pub fn effective_severity(&self, rule_id: &str, default: Severity) -> Severity {
        self.rules.get(rule_id).and_then(|s| s.severity).unwrap_or(default)
    }

    /// Whether a rule is enabled by configuration
    pub fn rule_enabled(&self, rule_id: &str) -> bool {
        self.rules.get(rule_id).map_or(true, |s| s.enabled)
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> ConductResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ConductError::config(format!("Failed to serialize config: {e}")))
    }
}

fn default_true() -> bool {
    true
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: ConductConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self { config: ConductConfig::default() }
    }

    /// Add a path pattern
    pub fn add_path_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.paths.patterns.push(pattern.into());
        self
    }

    /// Set the ignore file name
    pub fn ignore_file(mut self, filename: impl Into<String>) -> Self {
        self.config.paths.ignore_file = Some(filename.into());
        self
    }

    /// Treat an extra type as a broad error type
    pub fn broad_type(mut self, name: impl Into<String>) -> Self {
        self.config.taxonomy.broad_types.push(name.into());
        self
    }

    /// Set the test method naming pattern
    pub fn test_method_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.naming.test_method_pattern = pattern.into();
        self
    }

    /// Override a rule's settings
    pub fn rule(mut self, rule_id: impl Into<String>, settings: RuleSettings) -> Self {
        self.config.rules.insert(rule_id.into(), settings);
        self
    }

    pub fn severity_threshold(mut self, threshold: Severity) -> Self {
        self.config.severity_threshold = threshold;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ConductResult<ConductConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = ConductConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.severity_threshold, Severity::Warning);
        assert_eq!(config.taxonomy.root, "Throwable");
        assert!(config.rule_enabled(catalog::PUBLIC_METHOD_DOC));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = ConductConfig::load_from_str(
            r#"
version: "1.0"
severity_threshold: error
naming:
  test_method_pattern: "^(should|when)"
rules:
  no-broad-throw:
    severity: error
  public-type-doc:
    enabled: false
"#,
        )
        .unwrap();

        assert_eq!(config.severity_threshold, Severity::Error);
        assert_eq!(config.naming.test_method_pattern, "^(should|when)");
        assert_eq!(config.naming.test_annotations.len(), 3);
        assert_eq!(config.effective_severity("no-broad-throw", Severity::Warning), Severity::Error);
        assert!(!config.rule_enabled("public-type-doc"));
        assert_eq!(config.paths.extensions, vec!["java".to_string()]);
    }

    #[test]
    fn test_validation_failures() {
        assert!(ConductConfig::load_from_str("version: \"2.0\"").is_err());
        assert!(ConductConfig::load_from_str("rules:\n  no-such-rule:\n    enabled: false\n").is_err());
        assert!(ConductConfig::load_from_str("naming:\n  test_method_pattern: \"(oops\"\n").is_err());
        assert!(ConductConfig::load_from_str("paths:\n  patterns: [\"[bad\"]\n").is_err());
        assert!(ConductConfig::load_from_str("severity_threshold: info\n").is_err());
    }

    #[test]
    fn test_discover_and_resolve() {
        let temp_dir = TempDir::new().unwrap();
        assert!(ConductConfig::discover(temp_dir.path()).is_none());
        let fallback = ConductConfig::resolve(None, temp_dir.path()).unwrap();
        assert_eq!(fallback.severity_threshold, Severity::Warning);

        let path = temp_dir.path().join(".conduct_guard.yaml");
        fs::write(&path, "severity_threshold: error\n").unwrap();
        assert_eq!(ConductConfig::discover(temp_dir.path()), Some(path));

        let resolved = ConductConfig::resolve(None, temp_dir.path()).unwrap();
        assert_eq!(resolved.severity_threshold, Severity::Error);
    }

    #[test]
    fn test_yaml_round_trip_preserves_overrides() {
        let config = ConfigBuilder::new()
            .rule("scoped-resource", RuleSettings { enabled: false, severity: None })
            .broad_type("RuntimeException")
            .build()
            .unwrap();

        let reloaded = ConductConfig::load_from_str(&config.to_yaml().unwrap()).unwrap();
        assert!(!reloaded.rule_enabled("scoped-resource"));
        assert!(reloaded.taxonomy.broad_types.contains(&"RuntimeException".to_string()));
    }

    #[test]
    fn test_builder_validates() {
        assert!(ConfigBuilder::new().test_method_pattern("[").build().is_err());
        let config = ConfigBuilder::new()
            .add_path_pattern("generated/**")
            .ignore_file(".ignore")
            .severity_threshold(Severity::Error)
            .build()
            .unwrap();
        assert!(config.paths.patterns.contains(&"generated/**".to_string()));
        assert_eq!(config.paths.ignore_file.as_deref(), Some(".ignore"));
    }
}
