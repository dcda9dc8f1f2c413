//! Criteria to named guard constraints.

use tracing::debug;

use super::resolve::{Batch, Resolver};
use super::CompileError;
use crate::cml::{CmlConstraint, CmlType};
use crate::rules::{Criterion, Operator, Rule, RuleScope};

/// A translated criterion, not yet attached anywhere.
#[derive(Debug, Clone)]
pub struct CompiledCriterion {
    /// Constraint name, usable as a boolean guard.
    pub name: String,
    /// Type the criterion is evaluated on.
    pub target: String,
    /// The named constraint.
    pub constraint: CmlConstraint,
}

/// Name of the guard constraint for a criterion at `position`.
#[must_use]
pub fn constraint_name(rule: &Rule, criterion: &Criterion, position: usize) -> String {
    let index = criterion
        .criteria_index
        .map_or_else(|| position.to_string(), |i| i.to_string());
    format!("{}_criteria_{index}", rule.api_name)
}

/// Type a criterion is evaluated on.
#[must_use]
pub fn criterion_target<'a>(
    resolver: &Resolver<'a>,
    rule: &Rule,
    criterion: &Criterion,
    virtual_root: &'a CmlType,
) -> Option<&'a CmlType> {
    if rule.scope == RuleScope::Transaction {
        return Some(virtual_root);
    }
    criterion
        .root_object_id
        .as_deref()
        .or_else(|| criterion.source_values.first().map(String::as_str))
        .and_then(|id| resolver.type_for(id))
}

/// Translates one criterion.
///
/// # Errors
///
/// Returns an error if the target or source type cannot be resolved, or a
/// condition lacks an operand.
pub fn translate(
    resolver: &Resolver<'_>,
    batch: &mut Batch,
    rule: &Rule,
    position: usize,
    criterion: &Criterion,
    virtual_root: &CmlType,
) -> Result<CompiledCriterion, CompileError> {
    let name = constraint_name(rule, criterion, position);
    let target = criterion_target(resolver, rule, criterion, virtual_root).ok_or_else(|| {
        CompileError::MissingCriterionTarget {
            criterion: name.clone(),
        }
    })?;
    let source = criterion
        .source_values
        .first()
        .and_then(|id| resolver.type_for(id))
        .ok_or_else(|| CompileError::MissingCriterionSource {
            criterion: name.clone(),
        })?;

    let mut parts = Vec::new();
    if matches!(rule.scope, RuleScope::Bundle | RuleScope::Transaction) {
        if let Some(presence) = presence_expression(resolver, criterion, target, source) {
            parts.push(presence);
        }
    }
    for condition in &criterion.conditions {
        if let Some(expr) = resolver.condition(batch, condition, source, Some(target))? {
            parts.push(expr);
        }
    }

    let declaration = if parts.is_empty() {
        "true".to_string()
    } else {
        parts.join(" && ")
    };
    debug!("Criterion {} on {}: {}", name, target.name(), declaration);
    Ok(CompiledCriterion {
        constraint: CmlConstraint::named(name.clone(), declaration),
        name,
        target: target.name().to_string(),
    })
}

/// Counts of the source type along every path from the target, or `None`
/// when the operator tests no presence or no path exists.
fn presence_expression(
    resolver: &Resolver<'_>,
    criterion: &Criterion,
    target: &CmlType,
    source: &CmlType,
) -> Option<String> {
    let (comparison, joiner) = match criterion.source_operator? {
        Operator::Contains | Operator::Equals => ("> 0", " || "),
        Operator::DoesNotContain => ("== 0", " && "),
        _ => return None,
    };
    let paths = resolver.graph.find_all_paths(target.name(), source.name());
    if paths.is_empty() {
        debug!("No path from {} to {}", target.name(), source.name());
        return None;
    }
    let terms: Vec<String> = paths.iter().map(|p| format!("{p} {comparison}")).collect();
    Some(format!("({})", terms.join(joiner)))
}
