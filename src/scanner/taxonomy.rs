//! Language-specific classification of error and resource types

use crate::config::TaxonomyConfig;
use std::collections::BTreeSet;

/// Which error types count as "broad" for a language.
///
/// The root of the hierarchy is always broad. Qualified names match when
/// their package is the taxonomy's root package or when configured verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTaxonomy {
    root: String,
    broad: BTreeSet<String>,
    root_package: Option<String>,
}

impl ErrorTaxonomy {
    pub fn new<I, S>(root: impl Into<String>, broad: I, root_package: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let root = root.into();
        let mut broad: BTreeSet<String> = broad.into_iter().map(Into::into).collect();
        broad.insert(root.clone());
        Self { root, broad, root_package: root_package.filter(|p| !p.is_empty()) }
    }

    /// `Throwable` and `Exception` under `java.lang`
    pub fn java() -> Self {
        Self::new("Throwable", ["Exception"], Some("java.lang".to_string()))
    }

    pub fn from_config(config: &TaxonomyConfig) -> Self {
        Self::new(
            config.root.clone(),
            config.broad_types.iter().cloned(),
            Some(config.root_package.clone()),
        )
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn is_broad(&self, type_name: &str) -> bool {
        let name = type_name.trim();
        if self.broad.contains(name) {
            return true;
        }

        match (name.rsplit_once('.'), &self.root_package) {
            (Some((package, simple)), Some(root_package)) => {
                package == root_package && self.broad.contains(simple)
            }
            _ => false,
        }
    }
}

impl Default for ErrorTaxonomy {
    fn default() -> Self {
        Self::java()
    }
}

/// Which instantiated types are resources that must be released
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTaxonomy {
    suffixes: Vec<String>,
    exemptions: BTreeSet<String>,
}

impl ResourceTaxonomy {
    pub fn new(suffixes: Vec<String>, exemptions: impl IntoIterator<Item = String>) -> Self {
        Self { suffixes, exemptions: exemptions.into_iter().collect() }
    }

    pub fn from_config(config: &TaxonomyConfig) -> Self {
        Self::new(config.resource_suffixes.clone(), config.resource_exemptions.iter().cloned())
    }

    pub fn is_resource(&self, type_name: &str) -> bool {
        let base = type_name.split('<').next().unwrap_or(type_name).trim();
        let simple = base.rsplit('.').next().unwrap_or(base);
        !self.exemptions.contains(simple) && self.suffixes.iter().any(|s| simple.ends_with(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Throwable", true)]
    #[case("Exception", true)]
    #[case("java.lang.Exception", true)]
    #[case("java.lang.Throwable", true)]
    #[case("RuntimeException", false)]
    #[case("IOException", false)]
    #[case("com.acme.Exception", false)]
    fn test_java_taxonomy(#[case] name: &str, #[case] broad: bool) {
        assert_eq!(ErrorTaxonomy::java().is_broad(name), broad);
    }

    #[test]
    fn test_root_always_broad() {
        let taxonomy = ErrorTaxonomy::new("BaseError", Vec::<String>::new(), None);
        assert_eq!(taxonomy.root(), "BaseError");
        assert!(taxonomy.is_broad("BaseError"));
        assert!(!taxonomy.is_broad("pkg.BaseError"));
    }

    #[test]
    fn test_resources_from_config() {
        let resources = ResourceTaxonomy::from_config(&TaxonomyConfig::default());
        assert!(resources.is_resource("FileInputStream"));
        assert!(resources.is_resource("java.sql.Connection"));
        assert!(resources.is_resource("BufferedReader"));
        assert!(!resources.is_resource("ByteArrayOutputStream"));
        assert!(!resources.is_resource("StringBuilder"));
        assert!(!resources.is_resource("ArrayList<String>"));
    }
}
