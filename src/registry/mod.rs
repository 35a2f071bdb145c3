//! Rule registry holding the catalog of checkable policies
//!
//! Architecture: Repository - The registry is the single source of rules for a run
//! - Rules are immutable once registered and addressed by a unique identifier
//! - Registration order is preserved and drives report ordering
//! - Predicates implement RulePredicate for clean polymorphism

pub mod catalog;

use crate::domain::source::{Declaration, SourceUnit};
use crate::domain::violations::{ConductError, ConductResult, Severity};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use catalog::standard_rules;

/// A single finding produced by a predicate for one declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub line: u32,
    pub message: String,
}

impl Finding {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

/// Predicate evaluating one declaration's fact set
///
/// Returning an error marks the predicate as faulted for that declaration.
/// The evaluator isolates faults (errors and panics) per declaration.
pub trait RulePredicate: Send + Sync {
    fn check(&self, unit: &SourceUnit, declaration: &Declaration) -> ConductResult<Vec<Finding>>;
}

impl<F> RulePredicate for F
where
    F: Fn(&SourceUnit, &Declaration) -> ConductResult<Vec<Finding>> + Send + Sync,
{
    fn check(&self, unit: &SourceUnit, declaration: &Declaration) -> ConductResult<Vec<Finding>> {
        self(unit, declaration)
    }
}

/// A registered rule
#[derive(Clone)]
pub struct Rule {
    id: String,
    description: String,
    severity: Severity,
    predicate: Arc<dyn RulePredicate>,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        predicate: impl RulePredicate + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            severity,
            predicate: Arc::new(predicate),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Copy of this rule with a different severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn check(&self, unit: &SourceUnit, declaration: &Declaration) -> ConductResult<Vec<Finding>> {
        self.predicate.check(unit, declaration)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("severity", &self.severity)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of uniquely identified rules
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule, rejecting duplicate identifiers
    pub fn register(&mut self, rule: Rule) -> ConductResult<()> {
        if self.index.contains_key(rule.id()) {
            return Err(ConductError::DuplicateRule { rule_id: rule.id().to_string() });
        }

        tracing::debug!("Registering rule '{}' with severity {}", rule.id(), rule.severity());
        self.index.insert(rule.id().to_string(), self.rules.len());
        self.rules.push(rule);
        Ok(())
    }

    /// Rules in registration order.
    ///
    /// The iterator is lazy and cloneable; calling `all` again restarts it.
    pub fn all(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.index.get(id).map(|&i| &self.rules[i])
    }

    /// Registration position of a rule
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::DeclarationKind;

    fn noop_rule(id: &str, description: &str) -> Rule {
        Rule::new(id, description, Severity::Warning, |_: &SourceUnit, _: &Declaration| -> ConductResult<Vec<Finding>> {
            Ok(Vec::new())
        })
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = RuleRegistry::new();
        registry.register(noop_rule("b-rule", "second")).unwrap();
        registry.register(noop_rule("a-rule", "first")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.position("a-rule"), Some(1));
        assert_eq!(registry.get("b-rule").unwrap().description(), "second");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let mut registry = RuleRegistry::new();
        registry.register(noop_rule("dup", "original")).unwrap();

        let err = registry.register(noop_rule("dup", "replacement")).unwrap_err();
        assert!(matches!(err, ConductError::DuplicateRule { ref rule_id } if rule_id == "dup"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("dup").unwrap().description(), "original");
    }

    #[test]
    fn test_all_is_ordered_and_restartable() {
        let mut registry = RuleRegistry::new();
        for id in ["z", "m", "a"] {
            registry.register(noop_rule(id, id)).unwrap();
        }

        let iter = registry.all();
        let first: Vec<_> = iter.clone().map(Rule::id).collect();
        let second: Vec<_> = iter.map(Rule::id).collect();
        assert_eq!(first, vec!["z", "m", "a"]);
        assert_eq!(first, second);
        assert_eq!(registry.all().count(), 3);
    }

    #[test]
    fn test_closure_predicate() {
        let rule = Rule::new(
            "named",
            "flags everything",
            Severity::Error,
            |_: &SourceUnit, d: &Declaration| -> ConductResult<Vec<Finding>> {
                Ok(vec![Finding::new(d.line, format!("found {}", d.name))])
            },
        );
        let unit = SourceUnit::new("A.java", "java", Vec::new());
        let decl = Declaration::new(0, "A", DeclarationKind::Class, 1);

        let findings = rule.check(&unit, &decl).unwrap();
        assert_eq!(findings, vec![Finding::new(1, "found A")]);
        assert_eq!(rule.clone().with_severity(Severity::Warning).severity(), Severity::Warning);
    }
}
