//! Source scanning: from files on disk to structural facts
//!
//! Architecture: Ports and Adapters - The scanner owns I/O, adapters own language syntax
//! - LanguageAdapter is the port every supported language implements
//! - Read failures become UnreadableSource, tokenization failures MalformedSource
//! - Scanned units are immutable and independent, so files scan in parallel

pub mod java;
pub mod lexer;
pub mod path_filter;
pub mod taxonomy;

use crate::config::ConductConfig;
use crate::domain::source::{Declaration, SourceUnit};
use crate::domain::violations::{ConductError, ConductResult};
use lexer::LexError;
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub use java::{JavaAdapter, JavaConventions};
pub use path_filter::PathFilter;
pub use taxonomy::{ErrorTaxonomy, ResourceTaxonomy};

/// Extracts declarations from the source text of one language
pub trait LanguageAdapter: Send + Sync {
    /// Language name recorded on every scanned unit
    fn name(&self) -> &str;

    /// File extensions (without the dot) this adapter handles
    fn extensions(&self) -> &[String];

    /// Declarations in pre-order source order
    fn extract(&self, source: &str) -> Result<Vec<Declaration>, LexError>;
}

/// Reads files and hands their text to a language adapter
#[derive(Clone)]
pub struct SourceScanner {
    adapter: Arc<dyn LanguageAdapter>,
}

impl SourceScanner {
    pub fn new(adapter: impl LanguageAdapter + 'static) -> Self {
        Self { adapter: Arc::new(adapter) }
    }

    /// Java scanner with conventions taken from configuration
    pub fn java(config: &ConductConfig) -> Self {
        Self::new(JavaAdapter::from_config(config))
    }

    pub fn language(&self) -> &str {
        self.adapter.name()
    }

    /// Whether a path has one of the adapter's extensions
    pub fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.adapter.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Scan a file into a source unit
    pub fn scan(&self, path: &Path) -> ConductResult<SourceUnit> {
        let bytes = fs::read(path).map_err(|e| ConductError::unreadable(path, e.to_string()))?;
        let source = String::from_utf8(bytes)
            .map_err(|e| ConductError::malformed(path, None, format!("content is not valid UTF-8: {e}")))?;

        self.scan_source(path, &source)
    }

    /// Scan already-loaded source text
    pub fn scan_source(&self, path: &Path, source: &str) -> ConductResult<SourceUnit> {
        let declarations = self
            .adapter
            .extract(source)
            .map_err(|e| ConductError::malformed(path, Some(e.line), e.message))?;

        tracing::trace!("Extracted {} declarations from {}", declarations.len(), path.display());
        Ok(SourceUnit::new(path, self.adapter.name(), declarations))
    }
}

impl std::fmt::Debug for SourceScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceScanner").field("language", &self.adapter.name()).finish()
    }
}
