//! Path filtering using .gitignore-style patterns
//!
//! Architecture: Service Layer - PathFilter decides which discovered files reach the scanner
//! - Patterns apply in order and the last match wins, `!` re-includes
//! - A trailing `/` restricts a pattern to directories and everything below them
//! - .conductignore files between the walk root and a file apply, nearest last

use crate::config::PathConfig;
use crate::domain::violations::{ConductError, ConductResult};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Manages path filtering using .gitignore-style patterns
#[derive(Debug, Clone)]
pub struct PathFilter {
    patterns: Vec<FilterPattern>,
    /// Ignore file name looked up in parent directories, if enabled
    ignore_filename: Option<String>,
}

/// Parsed ignore files by directory, for the duration of one walk
type IgnoreCache = HashMap<PathBuf, Vec<FilterPattern>>;

#[derive(Debug, Clone)]
struct FilterPattern {
    pattern: glob::Pattern,
    /// Starts with `!`
    is_include: bool,
    /// Ends with `/`
    dir_only: bool,
    /// Starts with `/` or contains an inner `/`
    anchored: bool,
    original: String,
}

impl FilterPattern {
    fn parse(raw: &str) -> Result<Self, glob::PatternError> {
        let (is_include, body) = match raw.strip_prefix('!') {
            Some(stripped) => (true, stripped),
            None => (false, raw),
        };
        let dir_only = body.ends_with('/');
        let body = body.trim_end_matches('/');
        let anchored = body.contains('/');
        let body = body.strip_prefix('/').unwrap_or(body);

        Ok(Self {
            pattern: glob::Pattern::new(body)?,
            is_include,
            dir_only,
            anchored,
            original: raw.to_string(),
        })
    }

    /// Match a path relative to the pattern's base directory
    fn matches(&self, relative: &Path) -> bool {
        if self.dir_only {
            // any directory on the way to the file
            let mut prefix = PathBuf::new();
            let components: Vec<_> = relative.components().collect();
            for component in components.iter().take(components.len().saturating_sub(1)) {
                prefix.push(component);
                if self.matches_entry(&prefix) {
                    return true;
                }
            }
            return false;
        }

        self.matches_entry(relative)
    }

    fn matches_entry(&self, relative: &Path) -> bool {
        if self.anchored {
            return self.pattern.matches(&relative.to_string_lossy());
        }
        relative
            .file_name()
            .is_some_and(|name| self.pattern.matches(&name.to_string_lossy()))
    }
}

impl PathFilter {
    /// Create a new path filter with the given patterns
    pub fn new(patterns: Vec<String>, ignore_filename: Option<String>) -> ConductResult<Self> {
        let patterns = patterns
            .iter()
            .map(|raw| {
                FilterPattern::parse(raw)
                    .map_err(|e| ConductError::pattern(format!("Invalid pattern '{raw}': {e}")))
            })
            .collect::<ConductResult<Vec<_>>>()?;

        Ok(Self { patterns, ignore_filename })
    }

    /// Filter from configuration plus command-line excludes
    pub fn from_config(
        config: &PathConfig,
        extra_excludes: &[String],
        use_ignore_files: bool,
    ) -> ConductResult<Self> {
        let mut patterns = config.patterns.clone();
        patterns.extend(extra_excludes.iter().cloned());
        let ignore_filename = config.ignore_file.clone().filter(|_| use_ignore_files);
        Self::new(patterns, ignore_filename)
    }

    /// Check a path relative to the walk root against the configured patterns
    pub fn should_analyze(&self, relative: &Path) -> bool {
        let mut include = true;
        for pattern in &self.patterns {
            if pattern.matches(relative) {
                include = pattern.is_include;
            }
        }
        include
    }

    /// Apply ignore files from `root` down to the file's directory; nearer files win
    fn is_ignored_by_files(
        &self,
        root: &Path,
        relative: &Path,
        ignore_filename: &str,
        cache: &mut IgnoreCache,
    ) -> ConductResult<bool> {
        let components: Vec<_> = relative.components().collect();
        let mut dir = root.to_path_buf();
        let mut ignored = false;

        for (depth, component) in components.iter().enumerate() {
            let patterns = match cache.entry(dir.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let ignore_file = dir.join(ignore_filename);
                    let patterns =
                        if ignore_file.is_file() { Self::load_ignore_file(&ignore_file)? } else { Vec::new() };
                    entry.insert(patterns)
                }
            };

            let below: PathBuf = components[depth..].iter().collect();
            for pattern in patterns.iter() {
                if pattern.matches(&below) {
                    ignored = !pattern.is_include;
                }
            }
            dir.push(component);
        }

        Ok(ignored)
    }

    fn load_ignore_file(path: &Path) -> ConductResult<Vec<FilterPattern>> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConductError::config(format!("Failed to read ignore file '{}': {e}", path.display()))
        })?;

        let mut patterns = Vec::new();
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match FilterPattern::parse(line) {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => {
                    tracing::warn!("Invalid pattern '{}' in {}: {}", line, path.display(), e)
                }
            }
        }

        Ok(patterns)
    }

    /// All files below `root` that pass the filter, in walk order sorted by name
    pub fn find_files(&self, root: &Path) -> ConductResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut ignore_cache = IgnoreCache::new();

        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let ignored = match &self.ignore_filename {
                Some(name) => self.is_ignored_by_files(root, relative, name, &mut ignore_cache)?,
                None => false,
            };
            if self.should_analyze(relative) && !ignored {
                files.push(path.to_path_buf());
            } else {
                tracing::trace!("Filtered out {}: {:?}", path.display(), self.debug_patterns(relative));
            }
        }

        Ok(files)
    }

    /// Which configured patterns match a path
    pub fn debug_patterns(&self, relative: &Path) -> Vec<String> {
        self.patterns
            .iter()
            .enumerate()
            .map(|(i, pattern)| {
                let outcome = if pattern.matches(relative) { "MATCH" } else { "no match" };
                format!("Pattern {i}: {} -> {outcome}", pattern.original)
            })
            .collect()
    }
}
