//! Built-in catalog of structurally checkable conduct policies
//!
//! Each policy is a small predicate over a declaration's fact set. The
//! catalog is language-agnostic: it only reads facts produced by a scanner
//! adapter, never source text.

use crate::config::ConductConfig;
use crate::domain::source::{BodyFeature, Declaration, DeclarationKind, SourceUnit};
use crate::domain::violations::{ConductError, ConductResult, Severity};
use crate::registry::{Finding, Rule, RulePredicate, RuleRegistry};
use regex::Regex;

pub const PUBLIC_METHOD_DOC: &str = "public-method-doc";
pub const PUBLIC_TYPE_DOC: &str = "public-type-doc";
pub const NO_BROAD_CATCH: &str = "no-broad-catch";
pub const NO_BROAD_THROW: &str = "no-broad-throw";
pub const TEST_METHOD_NAMING: &str = "test-method-naming";
pub const SCOPED_RESOURCE: &str = "scoped-resource";
pub const NO_PUBLIC_MUTABLE_FIELD: &str = "no-public-mutable-field";

/// Static description of a catalog rule
#[derive(Debug, Clone, Copy)]
pub struct RuleDescriptor {
    pub id: &'static str,
    pub severity: Severity,
    pub description: &'static str,
}

const DESCRIPTORS: &[RuleDescriptor] = &[
    RuleDescriptor {
        id: PUBLIC_METHOD_DOC,
        severity: Severity::Error,
        description: "Public methods and constructors must carry a documentation comment",
    },
    RuleDescriptor {
        id: PUBLIC_TYPE_DOC,
        severity: Severity::Warning,
        description: "Public types must carry a documentation comment",
    },
    RuleDescriptor {
        id: NO_BROAD_CATCH,
        severity: Severity::Error,
        description: "Catch clauses must name specific error types, never the broad root types",
    },
    RuleDescriptor {
        id: NO_BROAD_THROW,
        severity: Severity::Warning,
        description: "Methods must not throw or declare the broad root error types",
    },
    RuleDescriptor {
        id: TEST_METHOD_NAMING,
        severity: Severity::Warning,
        description: "Test method names must match the configured naming pattern",
    },
    RuleDescriptor {
        id: SCOPED_RESOURCE,
        severity: Severity::Warning,
        description: "Resources must be acquired with scoped acquisition that guarantees release",
    },
    RuleDescriptor {
        id: NO_PUBLIC_MUTABLE_FIELD,
        severity: Severity::Warning,
        description: "Fields must not leak mutable state through public visibility",
    },
];

/// Descriptors of every built-in rule, in registration order
pub fn descriptors() -> &'static [RuleDescriptor] {
    DESCRIPTORS
}

/// Look up a built-in rule descriptor
pub fn descriptor(id: &str) -> Option<&'static RuleDescriptor> {
    DESCRIPTORS.iter().find(|d| d.id == id)
}

/// Instantiate every built-in rule with its default severity
pub fn standard_rules(config: &ConductConfig) -> ConductResult<Vec<Rule>> {
    let naming = Regex::new(&config.naming.test_method_pattern).map_err(|e| {
        ConductError::pattern(format!(
            "Invalid test method pattern '{}': {e}",
            config.naming.test_method_pattern
        ))
    })?;

    DESCRIPTORS
        .iter()
        .map(|d| {
            let rule = match d.id {
                PUBLIC_METHOD_DOC => Rule::new(d.id, d.description, d.severity, PublicMethodDoc),
                PUBLIC_TYPE_DOC => Rule::new(d.id, d.description, d.severity, PublicTypeDoc),
                NO_BROAD_CATCH => Rule::new(d.id, d.description, d.severity, NoBroadCatch),
                NO_BROAD_THROW => Rule::new(d.id, d.description, d.severity, NoBroadThrow),
                TEST_METHOD_NAMING => Rule::new(
                    d.id,
                    d.description,
                    d.severity,
                    TestMethodNaming { pattern: naming.clone() },
                ),
                SCOPED_RESOURCE => Rule::new(d.id, d.description, d.severity, ScopedResource),
                NO_PUBLIC_MUTABLE_FIELD => {
                    Rule::new(d.id, d.description, d.severity, NoPublicMutableField)
                }
                other => {
                    return Err(ConductError::config(format!("No predicate for rule '{other}'")))
                }
            };
            Ok(rule)
        })
        .collect()
}

/// Build the registry for a run from configuration.
///
/// Disabled rules are skipped and severity overrides applied. Registration
/// follows catalog order so reports stay stable across configurations.
pub fn build_registry(config: &ConductConfig) -> ConductResult<RuleRegistry> {
    let mut registry = RuleRegistry::new();

    for rule in standard_rules(config)? {
        let settings = config.rules.get(rule.id());
        if settings.is_some_and(|s| !s.enabled) {
            tracing::debug!("Rule '{}' disabled by configuration", rule.id());
            continue;
        }

        let rule = match settings.and_then(|s| s.severity) {
            Some(severity) => rule.with_severity(severity),
            None => rule,
        };
        registry.register(rule)?;
    }

    Ok(registry)
}

struct PublicMethodDoc;

impl RulePredicate for PublicMethodDoc {
    fn check(&self, _unit: &SourceUnit, decl: &Declaration) -> ConductResult<Vec<Finding>> {
        if decl.kind != DeclarationKind::Method || !decl.is_public() || decl.documented {
            return Ok(Vec::new());
        }
        // Overrides inherit documentation; tests are not API
        if decl.has_annotation("Override") || decl.has_feature(BodyFeature::TestMarker) {
            return Ok(Vec::new());
        }

        let what = if decl.is_constructor() { "constructor" } else { "method" };
        Ok(vec![Finding::new(
            decl.line,
            format!("Public {what} '{}' has no documentation comment", decl.name),
        )])
    }
}

struct PublicTypeDoc;

impl RulePredicate for PublicTypeDoc {
    fn check(&self, _unit: &SourceUnit, decl: &Declaration) -> ConductResult<Vec<Finding>> {
        if decl.kind != DeclarationKind::Class || !decl.is_public() || decl.documented {
            return Ok(Vec::new());
        }

        let what = decl.type_kind.map(|k| k.as_str()).unwrap_or("type");
        Ok(vec![Finding::new(
            decl.line,
            format!("Public {what} '{}' has no documentation comment", decl.name),
        )])
    }
}

struct NoBroadCatch;

impl RulePredicate for NoBroadCatch {
    fn check(&self, _unit: &SourceUnit, decl: &Declaration) -> ConductResult<Vec<Finding>> {
        Ok(decl
            .signals_of(BodyFeature::CatchesBroadThrowable)
            .map(|s| {
                Finding::new(
                    s.line,
                    format!(
                        "'{}' catches broad type '{}'; catch the specific failures instead",
                        decl.name, s.detail
                    ),
                )
            })
            .collect())
    }
}

struct NoBroadThrow;

impl RulePredicate for NoBroadThrow {
    fn check(&self, _unit: &SourceUnit, decl: &Declaration) -> ConductResult<Vec<Finding>> {
        let mut findings = Vec::new();

        for signal in &decl.signals {
            let message = match signal.feature {
                BodyFeature::DeclaresBroadThrows => format!(
                    "'{}' declares 'throws {}'; declare the specific failures instead",
                    decl.name, signal.detail
                ),
                BodyFeature::ThrowsBroadThrowable => format!(
                    "'{}' throws bare '{}'; throw a specific error type instead",
                    decl.name, signal.detail
                ),
                _ => continue,
            };
            findings.push(Finding::new(signal.line, message));
        }

        Ok(findings)
    }
}

struct TestMethodNaming {
    pattern: Regex,
}

impl RulePredicate for TestMethodNaming {
    fn check(&self, _unit: &SourceUnit, decl: &Declaration) -> ConductResult<Vec<Finding>> {
        if decl.kind != DeclarationKind::Method || !decl.has_feature(BodyFeature::TestMarker) {
            return Ok(Vec::new());
        }
        if self.pattern.is_match(&decl.name) {
            return Ok(Vec::new());
        }

        Ok(vec![Finding::new(
            decl.line,
            format!(
                "Test method '{}' does not match naming pattern '{}'",
                decl.name,
                self.pattern.as_str()
            ),
        )])
    }
}

struct ScopedResource;

impl RulePredicate for ScopedResource {
    fn check(&self, _unit: &SourceUnit, decl: &Declaration) -> ConductResult<Vec<Finding>> {
        if decl.kind != DeclarationKind::Method
            || decl.is_constructor()
            || decl.has_feature(BodyFeature::ReturnsResource)
        {
            return Ok(Vec::new());
        }

        Ok(decl
            .signals_of(BodyFeature::AcquiresUnscopedResource)
            .map(|s| {
                Finding::new(
                    s.line,
                    format!(
                        "'{}' acquires '{}' without scoped acquisition; use try-with-resources",
                        decl.name, s.detail
                    ),
                )
            })
            .collect())
    }
}

struct NoPublicMutableField;

impl RulePredicate for NoPublicMutableField {
    fn check(&self, _unit: &SourceUnit, decl: &Declaration) -> ConductResult<Vec<Finding>> {
        if decl.kind != DeclarationKind::Field || !decl.is_public() || decl.has_modifier("final") {
            return Ok(Vec::new());
        }

        Ok(vec![Finding::new(
            decl.line,
            format!("Public mutable field '{}' exposes internal state", decl.name),
        )])
    }
}
