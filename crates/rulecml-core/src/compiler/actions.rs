//! Action translation, one function per action type.
//!
//! Constraints go to the parent type when the action has one and to the
//! target type otherwise. Attribute behaviors under a distinct parent read
//! the guard through `parent(..)` and live on the target itself.

use tracing::{debug, warn};

use super::criteria::CompiledCriterion;
use super::resolve::{Batch, Resolver};
use super::CompileError;
use crate::cml::emit::quote;
use crate::cml::{
    BehaviorRule, CmlAttribute, CmlConstraint, CmlDataType, CmlType, ConstraintBody, Requirement,
};
use crate::rules::{Action, ActionType, Condition, ConditionKind, Rule, RuleScope};

/// Tag marking `target_values` as related-component ids.
pub const RELATED_COMPONENT_TAG: &str = "ProductRelationComponent";

/// Everything an action handler needs.
pub struct ActionContext<'r, 'a> {
    /// Model lookups.
    pub resolver: &'r Resolver<'a>,
    /// The rule being translated.
    pub rule: &'r Rule,
    /// The action being translated.
    pub action: &'r Action,
    /// Catalog id of the action target.
    pub product_id: &'r str,
    /// Container type, if any.
    pub parent: Option<&'a CmlType>,
    /// Target type.
    pub target: &'a CmlType,
    /// Criteria names joined with `&&`, or `true`.
    pub declaration: String,
    /// Criteria names joined with `_`.
    pub guard: String,
}

impl ActionContext<'_, '_> {
    fn owner(&self) -> &str {
        self.parent.unwrap_or(self.target).name()
    }

    fn sequence_hint(&self) -> i64 {
        self.rule.sequence + self.action.sequence
    }

    fn severity(&self) -> String {
        self.action
            .message_type
            .clone()
            .unwrap_or_else(|| self.resolver.config.default_message_severity.clone())
    }

    fn message_text(&self) -> &str {
        self.action.message.as_deref().unwrap_or_default()
    }

    fn kind(&self) -> ActionType {
        self.action.action_type
    }

    /// Attribute-kind parameters that name an attribute.
    fn attribute_parameters(&self) -> impl Iterator<Item = (&Condition, &str)> {
        self.action
            .action_parameters
            .iter()
            .filter(|p| p.kind == ConditionKind::Attribute)
            .filter_map(|p| p.attribute_name.as_deref().map(|name| (p, name)))
    }

    /// Error message attached to the target when a parent is required.
    fn missing_parent(&self, batch: &mut Batch, text: String) {
        warn!(
            "Rule {}: {} has no parent type",
            self.rule.api_name,
            self.kind()
        );
        batch.push(
            self.target.name(),
            CmlConstraint::message(self.declaration.clone(), text, Some("error".to_string())),
        );
    }
}

/// Resolves the action's types, attaches the rule's criteria to the owning
/// type and emits the action's constraints into `batch`.
///
/// Actions without a product target are ignored.
///
/// # Errors
///
/// Returns an error if the target product has no type or a parameter cannot
/// be translated.
pub fn translate<'a>(
    resolver: &Resolver<'a>,
    batch: &mut Batch,
    rule: &Rule,
    action: &Action,
    criteria: &[CompiledCriterion],
    virtual_root: &'a CmlType,
) -> Result<(), CompileError> {
    let Some(product_id) = action.target_product_id() else {
        debug!(
            "Rule {}: {} action targets no product",
            rule.api_name, action.action_type
        );
        return Ok(());
    };
    let target = resolver
        .type_for(product_id)
        .ok_or_else(|| CompileError::MissingActionTarget {
            action: action.action_type,
            product_id: product_id.to_string(),
        })?;
    let parent = match rule.scope {
        RuleScope::Transaction => Some(virtual_root),
        RuleScope::Bundle => component_owner(resolver, action).or_else(|| {
            criteria
                .first()
                .and_then(|c| resolver.model.get_type(&c.target))
        }),
        RuleScope::Product => None,
    };

    let names: Vec<&str> = criteria.iter().map(|c| c.name.as_str()).collect();
    let ctx = ActionContext {
        resolver,
        rule,
        action,
        product_id,
        parent,
        target,
        declaration: if names.is_empty() {
            "true".to_string()
        } else {
            names.join(" && ")
        },
        guard: names.join("_"),
    };

    for criterion in criteria {
        if !batch.has_constraint_named(resolver.model, ctx.owner(), &criterion.name) {
            batch.push(ctx.owner(), criterion.constraint.clone());
        }
    }

    dispatch(&ctx, batch)?;

    if !folds_message(ctx.kind()) {
        if let Some(message) = action.message.as_deref() {
            batch.push(
                ctx.owner(),
                CmlConstraint::message(
                    ctx.declaration.clone(),
                    format!("{}: {message}", ctx.kind()),
                    Some(ctx.severity()),
                ),
            );
        }
    }
    Ok(())
}

/// Action types whose handler already reports the action message.
fn folds_message(kind: ActionType) -> bool {
    matches!(
        kind,
        ActionType::AutoAdd
            | ActionType::AutoRemove
            | ActionType::SetQuantity
            | ActionType::SetDefaultProduct
            | ActionType::SetDefaultAttributeValue
            | ActionType::Validate
    )
}

fn component_owner<'a>(resolver: &Resolver<'a>, action: &Action) -> Option<&'a CmlType> {
    if action.target_context_tag_name.as_deref() != Some(RELATED_COMPONENT_TAG) {
        return None;
    }
    action
        .target_values
        .first()
        .and_then(|prc_id| resolver.owner_of_component(prc_id))
}

fn dispatch(ctx: &ActionContext<'_, '_>, batch: &mut Batch) -> Result<(), CompileError> {
    match ctx.kind() {
        ActionType::AutoAdd => auto_add(ctx, batch),
        ActionType::AutoRemove => auto_remove(ctx, batch),
        ActionType::SetAttribute => set_attribute(ctx, batch)?,
        ActionType::SetQuantity => set_quantity(ctx, batch),
        ActionType::SetDefaultProduct | ActionType::SetDefaultAttributeValue => {
            unsupported_default(ctx, batch);
        }
        ActionType::HideAttribute => hide_attribute(ctx, batch),
        ActionType::HideAttributeValue | ActionType::DisableAttributeValue => {
            attribute_values(ctx, batch);
        }
        ActionType::HideProduct | ActionType::DisableProduct => product_visibility(ctx, batch),
        ActionType::Requires | ActionType::Excludes => requires_excludes(ctx, batch),
        ActionType::Validate => validate(ctx, batch)?,
    }
    Ok(())
}

// ────────────────────────────────────────────
// Structural actions
// ────────────────────────────────────────────

fn auto_add(ctx: &ActionContext<'_, '_>, batch: &mut Batch) {
    requirement(ctx, batch, true);
}

fn auto_remove(ctx: &ActionContext<'_, '_>, batch: &mut Batch) {
    requirement(ctx, batch, false);
}

fn requirement(ctx: &ActionContext<'_, '_>, batch: &mut Batch, require: bool) {
    let Some(parent) = ctx.parent else {
        let text = format!(
            "{kind} (scope: {}): Parent type can't be null for {kind} action.",
            ctx.rule.scope,
            kind = ctx.kind()
        );
        ctx.missing_parent(batch, text);
        return;
    };
    let Some(relation) = ctx.resolver.relation(parent, ctx.target) else {
        warn!(
            "Rule {}: no relation from {} to {}",
            ctx.rule.api_name,
            parent.name(),
            ctx.target.name()
        );
        return;
    };

    let requirement = Requirement {
        relation: relation.name.clone(),
        target_type: ctx.target.name().to_string(),
        quantity: 1,
    };
    let body = if require {
        ConstraintBody::Require {
            declaration: ctx.declaration.clone(),
            requirement,
            explanation: None,
        }
    } else {
        ConstraintBody::Exclude {
            declaration: ctx.declaration.clone(),
            requirement,
            explanation: None,
        }
    };
    batch.push(
        parent.name(),
        CmlConstraint::new(body).with_sequence_hint(ctx.sequence_hint()),
    );

    if require && ctx.action.behavior_type_lock {
        batch.push(
            parent.name(),
            CmlConstraint::rule(
                ctx.declaration.clone(),
                BehaviorRule {
                    action: "Disable".to_string(),
                    scope: "relation".to_string(),
                    target: relation.name.clone(),
                    qualifier: Some("type".to_string()),
                    values: vec![ctx.target.name().to_string()],
                },
            ),
        );
    }
    if let Some(message) = ctx.action.message.as_deref() {
        batch.push(
            parent.name(),
            CmlConstraint::message(
                ctx.declaration.clone(),
                format!("{}: {message}", ctx.kind()),
                Some(ctx.severity()),
            ),
        );
    }
}

fn product_visibility(ctx: &ActionContext<'_, '_>, batch: &mut Batch) {
    let Some(parent) = ctx.parent else {
        let text = format!(
            "{kind} (scope: {}): Parent type can't be null for {kind} action.",
            ctx.rule.scope,
            kind = ctx.kind()
        );
        ctx.missing_parent(batch, text);
        return;
    };
    let Some(relation) = ctx.resolver.relation(parent, ctx.target) else {
        warn!(
            "Rule {}: no relation from {} to {}",
            ctx.rule.api_name,
            parent.name(),
            ctx.target.name()
        );
        return;
    };
    let behavior = if ctx.kind() == ActionType::HideProduct {
        "Hide"
    } else {
        "Disable"
    };
    batch.push(
        parent.name(),
        CmlConstraint::rule(
            ctx.declaration.clone(),
            BehaviorRule {
                action: behavior.to_string(),
                scope: "relation".to_string(),
                target: relation.name.clone(),
                qualifier: Some("type".to_string()),
                values: vec![ctx.target.name().to_string()],
            },
        )
        .with_sequence_hint(ctx.sequence_hint()),
    );
}

fn requires_excludes(ctx: &ActionContext<'_, '_>, batch: &mut Batch) {
    let Some(parent) = ctx.parent else {
        let text = format!(
            "{kind}: Parent type can't be null for {kind} action.",
            kind = ctx.kind()
        );
        ctx.missing_parent(batch, text);
        return;
    };
    if ctx.resolver.relation(parent, ctx.target).is_none() {
        warn!(
            "Rule {}: no relation from {} to {}",
            ctx.rule.api_name,
            parent.name(),
            ctx.target.name()
        );
        return;
    }
    let verb = if ctx.kind() == ActionType::Requires {
        "should be added"
    } else {
        "is excluded"
    };
    batch.push(
        parent.name(),
        CmlConstraint::message(
            ctx.declaration.clone(),
            format!("Product with ID {} {verb}", ctx.product_id),
            Some("error".to_string()),
        )
        .with_sequence_hint(ctx.sequence_hint()),
    );
}

// ────────────────────────────────────────────
// Attribute actions
// ────────────────────────────────────────────

fn set_attribute(ctx: &ActionContext<'_, '_>, batch: &mut Batch) -> Result<(), CompileError> {
    for (parameter, name) in ctx.attribute_parameters() {
        let attribute = ctx.resolver.attribute(
            batch,
            ctx.target,
            parameter.attribute_id.as_deref(),
            name,
            parameter.data_type.as_deref(),
            false,
        );
        let value = parameter
            .values
            .first()
            .ok_or_else(|| CompileError::MissingOperand {
                left: name.to_string(),
                operator: parameter.operator,
            })?;
        let literal = if attribute.is_string() {
            quote(value)
        } else {
            value.clone()
        };
        batch.push(
            ctx.owner(),
            CmlConstraint::unnamed(format!("{} && ({name} == {literal})", ctx.declaration))
                .with_sequence_hint(ctx.sequence_hint()),
        );
        if ctx.action.behavior_type_lock {
            batch.push(
                ctx.owner(),
                CmlConstraint::rule(
                    ctx.declaration.clone(),
                    BehaviorRule {
                        action: "Disable".to_string(),
                        scope: "attribute".to_string(),
                        target: attribute.name.clone(),
                        qualifier: None,
                        values: vec![],
                    },
                ),
            );
        }
    }
    Ok(())
}

fn hide_attribute(ctx: &ActionContext<'_, '_>, batch: &mut Batch) {
    for (_, name) in ctx.attribute_parameters() {
        attribute_behavior(
            ctx,
            batch,
            BehaviorRule {
                action: "Hide".to_string(),
                scope: "attribute".to_string(),
                target: name.to_string(),
                qualifier: None,
                values: vec![],
            },
        );
    }
}

fn attribute_values(ctx: &ActionContext<'_, '_>, batch: &mut Batch) {
    let behavior = if ctx.kind() == ActionType::HideAttributeValue {
        "Hide"
    } else {
        "Disable"
    };
    for (parameter, name) in ctx.attribute_parameters() {
        attribute_behavior(
            ctx,
            batch,
            BehaviorRule {
                action: behavior.to_string(),
                scope: "attribute".to_string(),
                target: name.to_string(),
                qualifier: Some("value".to_string()),
                values: parameter.values.clone(),
            },
        );
    }
}

/// Emits an attribute behavior rule, propagating the guard from a distinct
/// parent type into the target.
fn attribute_behavior(ctx: &ActionContext<'_, '_>, batch: &mut Batch, behavior: BehaviorRule) {
    let parent = ctx
        .parent
        .filter(|p| p.name() != ctx.target.name() && ctx.declaration != "true");
    let Some(parent) = parent else {
        batch.push(
            ctx.owner(),
            CmlConstraint::rule(ctx.declaration.clone(), behavior)
                .with_sequence_hint(ctx.sequence_hint()),
        );
        return;
    };

    let flag = format!("{}_value", ctx.guard);
    let mirror = format!("parent_{flag}");
    if parent.attribute(&flag).is_none() {
        batch.add_attribute(
            parent.name(),
            CmlAttribute::new(flag.clone(), Some(CmlDataType::Boolean)),
        );
    }
    batch.push(
        parent.name(),
        CmlConstraint::unnamed(format!("({}) == {flag}", ctx.declaration)),
    );
    if ctx.target.attribute(&mirror).is_none() {
        batch.add_attribute(
            ctx.target.name(),
            CmlAttribute::new(mirror.clone(), Some(CmlDataType::Boolean))
                .with_expression(format!("parent({flag})")),
        );
    }
    batch.push(
        ctx.target.name(),
        CmlConstraint::rule(format!("{mirror} == true"), behavior)
            .with_sequence_hint(ctx.sequence_hint()),
    );
}

// ────────────────────────────────────────────
// Messages
// ────────────────────────────────────────────

fn set_quantity(ctx: &ActionContext<'_, '_>, batch: &mut Batch) {
    let quantity = ctx
        .action
        .action_parameters
        .first()
        .and_then(|p| p.values.first())
        .map_or("", String::as_str);
    let parent = ctx
        .parent
        .map(|p| format!(" of parent type {}", p.name()))
        .unwrap_or_default();
    let text = format!(
        "[Not-Supported] SetQuantity: {}. Please set quantity {quantity} for type {}{parent} manually.",
        ctx.message_text(),
        ctx.target.name()
    );
    batch.push(
        ctx.owner(),
        CmlConstraint::message(ctx.declaration.clone(), text, Some(ctx.severity()))
            .with_sequence_hint(ctx.sequence_hint()),
    );
}

fn unsupported_default(ctx: &ActionContext<'_, '_>, batch: &mut Batch) {
    let text = format!("[Not-Supported] {}: {}", ctx.kind(), ctx.message_text());
    batch.push(
        ctx.owner(),
        CmlConstraint::message(ctx.declaration.clone(), text, Some(ctx.severity()))
            .with_sequence_hint(ctx.sequence_hint()),
    );
}

/// Message guarded by `decl && !(p1 || !p2 || ...)`: raised when the first
/// parameter fails or any later one holds.
fn validate(ctx: &ActionContext<'_, '_>, batch: &mut Batch) -> Result<(), CompileError> {
    let mut parts = Vec::new();
    for parameter in &ctx.action.action_parameters {
        if let Some(part) = ctx
            .resolver
            .condition(batch, parameter, ctx.target, ctx.parent)?
        {
            parts.push(part);
        }
    }
    if parts.is_empty() {
        return Err(CompileError::EmptyValidation {
            rule: ctx.rule.api_name.clone(),
        });
    }
    let declaration = format!("{} && !({})", ctx.declaration, parts.join(" || !"));
    batch.push(
        ctx.owner(),
        CmlConstraint::message(
            declaration,
            format!("Validate: {}", ctx.message_text()),
            Some(ctx.severity()),
        )
        .with_sequence_hint(ctx.sequence_hint()),
    );
    Ok(())
}
