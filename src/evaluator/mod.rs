//! Rule evaluation over scanned source units
//!
//! Architecture: Domain Service - The evaluator joins the registry with scanned facts
//! - Every registered rule sees every declaration of every unit
//! - A faulting predicate is contained to its (rule, declaration) pair
//! - Output order is a pure function of the inputs, whatever the parallelism

use crate::domain::source::{compare_paths, Declaration, SourceUnit};
use crate::domain::violations::{ConductError, Severity, Violation};
use crate::registry::{Rule, RuleRegistry};
use rayon::prelude::*;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

thread_local! {
    static IN_PREDICATE: Cell<bool> = const { Cell::new(false) };
}

static QUIET_PANIC_HOOK: Once = Once::new();

/// Silence the default panic report for predicate panics; they are logged as faults instead
fn install_quiet_panic_hook() {
    QUIET_PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !IN_PREDICATE.with(Cell::get) {
                previous(info);
            }
        }));
    });
}

/// Applies registry rules to declarations and collects violations
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    parallel: bool,
}

impl RuleEvaluator {
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    /// Evaluate every rule against every declaration.
    ///
    /// Violations are ordered by unit path string, declaration position, rule
    /// registration order and finally the order a predicate emitted them.
    pub fn evaluate(&self, units: &[SourceUnit], registry: &RuleRegistry) -> Vec<Violation> {
        let mut batches: Vec<(&SourceUnit, Vec<Violation>)> = if self.parallel && units.len() > 1 {
            units.par_iter().map(|unit| (unit, self.evaluate_unit(unit, registry))).collect()
        } else {
            units.iter().map(|unit| (unit, self.evaluate_unit(unit, registry))).collect()
        };

        // stable: units sharing a path keep their input order
        batches.sort_by(|a, b| compare_paths(a.0.path(), b.0.path()));

        let violations: Vec<Violation> = batches.into_iter().flat_map(|(_, v)| v).collect();
        tracing::debug!(
            "Evaluated {} rules over {} units: {} violations",
            registry.len(),
            units.len(),
            violations.len()
        );
        violations
    }

    /// Violations for one unit, in declaration then rule order
    pub fn evaluate_unit(&self, unit: &SourceUnit, registry: &RuleRegistry) -> Vec<Violation> {
        let mut violations = Vec::new();
        for declaration in &unit.declarations {
            for rule in registry.all() {
                self.apply(rule, unit, declaration, &mut violations);
            }
        }
        violations
    }

    fn apply(&self, rule: &Rule, unit: &SourceUnit, declaration: &Declaration, out: &mut Vec<Violation>) {
        install_quiet_panic_hook();
        IN_PREDICATE.with(|flag| flag.set(true));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| rule.check(unit, declaration)));
        IN_PREDICATE.with(|flag| flag.set(false));

        let fault = match outcome {
            Ok(Ok(findings)) => {
                out.extend(findings.into_iter().map(|finding| {
                    Violation::new(
                        rule.id(),
                        rule.severity(),
                        unit.path().to_path_buf(),
                        finding.line,
                        declaration.to_ref(),
                        finding.message,
                    )
                }));
                return;
            }
            Ok(Err(error)) => error.to_string(),
            Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
        };

        tracing::warn!(
            "Rule '{}' faulted on '{}' in {}: {}",
            rule.id(),
            declaration.name,
            unit.path().display(),
            fault
        );
        out.push(Violation::new(
            rule.id(),
            Severity::Error,
            unit.path().to_path_buf(),
            declaration.line,
            declaration.to_ref(),
            ConductError::rule_fault(rule.id(), fault).to_string(),
        ));
    }
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self::new(true)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::DeclarationKind;
    use crate::domain::violations::ConductResult;
    use crate::registry::Finding;
    use rstest::rstest;

    fn unit(path: &str, names: &[&str]) -> SourceUnit {
        let declarations = names
            .iter()
            .enumerate()
            .map(|(i, name)| Declaration::new(i, *name, DeclarationKind::Method, (i as u32 + 1) * 10))
            .collect();
        SourceUnit::new(path, "java", declarations)
    }

    /// Flags every declaration, twice, so emission order is observable
    fn twice(id: &str) -> Rule {
        Rule::new(id, id, Severity::Warning, |_: &SourceUnit, d: &Declaration| -> ConductResult<Vec<Finding>> {
            Ok(vec![Finding::new(d.line, "first"), Finding::new(d.line + 1, "second")])
        })
    }

    fn registry(rules: Vec<Rule>) -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        for rule in rules {
            registry.register(rule).unwrap();
        }
        registry
    }

    fn keys(violations: &[Violation]) -> Vec<(String, usize, String, String)> {
        violations
            .iter()
            .map(|v| {
                (
                    v.file_path.display().to_string(),
                    v.declaration.index,
                    v.rule_id.clone(),
                    v.message.clone(),
                )
            })
            .collect()
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn test_deterministic_order(#[case] parallel: bool) {
        let units = vec![unit("b/Z.java", &["z"]), unit("a/Y.java", &["y0", "y1"])];
        let registry = registry(vec![twice("r2"), twice("r1")]);

        let violations = RuleEvaluator::new(parallel).evaluate(&units, &registry);
        let expected: Vec<(String, usize, String, String)> = [
            ("a/Y.java", 0, "r2", "first"),
            ("a/Y.java", 0, "r2", "second"),
            ("a/Y.java", 0, "r1", "first"),
            ("a/Y.java", 0, "r1", "second"),
            ("a/Y.java", 1, "r2", "first"),
            ("a/Y.java", 1, "r2", "second"),
            ("a/Y.java", 1, "r1", "first"),
            ("a/Y.java", 1, "r1", "second"),
            ("b/Z.java", 0, "r2", "first"),
            ("b/Z.java", 0, "r2", "second"),
            ("b/Z.java", 0, "r1", "first"),
            ("b/Z.java", 0, "r1", "second"),
        ]
        .iter()
        .map(|(p, i, r, m)| (p.to_string(), *i, r.to_string(), m.to_string()))
        .collect();

        assert_eq!(keys(&violations), expected);
        assert_eq!(violations, RuleEvaluator::new(parallel).evaluate(&units, &registry));
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn test_units_ordered_by_path_string(#[case] parallel: bool) {
        let units = vec![unit("a/Z.java", &["z"]), unit("a-b.java", &["b"]), unit("a.java", &["a"])];
        let registry = registry(vec![twice("r")]);

        let violations = RuleEvaluator::new(parallel).evaluate(&units, &registry);
        let mut files: Vec<String> = violations.iter().map(|v| v.file_path.display().to_string()).collect();
        files.dedup();
        assert_eq!(files, vec!["a-b.java", "a.java", "a/Z.java"]);
    }

    #[test]
    fn test_empty_inputs() {
        let registry = registry(vec![twice("r")]);
        assert!(RuleEvaluator::default().evaluate(&[], &registry).is_empty());
        assert!(RuleEvaluator::default().evaluate(&[unit("A.java", &[])], &registry).is_empty());
        assert!(RuleEvaluator::default().evaluate(&[unit("A.java", &["a"])], &RuleRegistry::new()).is_empty());
    }

    #[test]
    fn test_failing_predicate_is_isolated() {
        let failing = Rule::new(
            "failing",
            "always errors",
            Severity::Warning,
            |_: &SourceUnit, _: &Declaration| -> ConductResult<Vec<Finding>> {
                Err(ConductError::config("lookup table missing"))
            },
        );
        let registry = registry(vec![failing, twice("healthy")]);

        let violations = RuleEvaluator::new(false).evaluate(&[unit("A.java", &["a"])], &registry);
        assert_eq!(violations.len(), 3);

        let fault = &violations[0];
        assert_eq!(fault.rule_id, "failing");
        assert_eq!(fault.severity, Severity::Error);
        assert_eq!(fault.line, 10);
        assert_eq!(fault.declaration.name, "a");
        assert!(fault.message.contains("lookup table missing"));
        assert!(violations[1..].iter().all(|v| v.rule_id == "healthy"));
    }

    #[test]
    fn test_panicking_predicate_is_isolated() {
        let panicking = Rule::new(
            "panicky",
            "panics on one declaration",
            Severity::Warning,
            |_: &SourceUnit, d: &Declaration| -> ConductResult<Vec<Finding>> {
                if d.name == "bad" {
                    panic!("cannot handle {}", d.name);
                }
                Ok(Vec::new())
            },
        );
        let registry = registry(vec![panicking]);

        let violations = RuleEvaluator::new(true)
            .evaluate(&[unit("A.java", &["good", "bad"]), unit("B.java", &["bad"])], &registry);
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.severity == Severity::Error && v.declaration.name == "bad"));
        assert!(violations[0].message.contains("cannot handle bad"));
        assert_eq!(violations[0].file_path.display().to_string(), "A.java");
    }

    #[test]
    fn test_panic_guard_resets_after_fault() {
        let panicking = Rule::new(
            "panicky",
            "always panics",
            Severity::Warning,
            |_: &SourceUnit, _: &Declaration| -> ConductResult<Vec<Finding>> { panic!("boom") },
        );
        let violations = RuleEvaluator::new(false).evaluate(&[unit("A.java", &["a"])], &registry(vec![panicking]));

        assert_eq!(violations.len(), 1);
        assert!(!IN_PREDICATE.with(Cell::get));
        // panics outside predicates still reach the previous hook and unwind normally
        assert!(panic::catch_unwind(|| panic!("outside")).is_err());
    }
}
