//! Rule compiler: business rules to CML constraints.
//!
//! ```text
//! Rule ─┬─ criteria ──► named guard constraints (criteria.rs)
//!       └─ actions ───► require / exclude / rule / message (actions.rs)
//!                         │
//!                         ▼
//!                  Batch ── apply ──► CmlModel
//! ```
//!
//! Each rule is translated against a read-only view of the model into a
//! pending [`Batch`]; only a fully translated rule is attached. A rule that
//! fails is logged and skipped without touching the model.

pub mod actions;
pub mod criteria;
pub mod expr;
pub mod resolve;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cml::{CmlModel, CmlRelation, CmlType, ModelError, VIRTUAL_PROPERTY};
use crate::config::GeneratorConfig;
use crate::graph::RelationGraph;
use crate::grouping::extract_product_ids;
use crate::rules::{ActionType, Operator, Rule};

pub use resolve::{Batch, Resolver};

/// Relation from the virtual root to every line item.
pub const LINE_ITEMS_RELATION: &str = "lineItems";

/// Context node the virtual root's line items are read from.
pub const LINE_ITEMS_SOURCE_CONTEXT: &str = "SalesTransaction.SalesTransactionItem";

/// Reasons a single rule cannot be translated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// No type is generated for the criterion's root or source product.
    #[error("can't find target CML type for criteria: {criterion}")]
    MissingCriterionTarget {
        /// Criterion constraint name.
        criterion: String,
    },

    /// No type is generated for the criterion's source product.
    #[error("can't find source CML type for criteria: {criterion}")]
    MissingCriterionSource {
        /// Criterion constraint name.
        criterion: String,
    },

    /// No type is generated for the action's target product.
    #[error("can't find CML type for {action} target {product_id}")]
    MissingActionTarget {
        /// Action type.
        action: ActionType,
        /// Target product id.
        product_id: String,
    },

    /// A comparison has no right-hand value.
    #[error("missing value for {operator:?} on `{left}`")]
    MissingOperand {
        /// Left-hand side.
        left: String,
        /// Operator lacking a value.
        operator: Operator,
    },

    /// A validation action has no translatable parameter.
    #[error("validation in rule {rule} has no conditions")]
    EmptyValidation {
        /// Rule API name.
        rule: String,
    },

    /// The virtual root type is missing from the model.
    #[error("virtual root type `{name}` is missing")]
    MissingVirtualRoot {
        /// Expected type name.
        name: String,
    },
}

/// A rule left out of the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRule {
    /// Rule API name.
    pub api_name: String,
    /// Why it was skipped.
    pub reason: String,
}

/// An action left out of an otherwise compiled rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAction {
    /// Rule API name.
    pub api_name: String,
    /// Action type.
    pub action: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Outcome of compiling one cluster's rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileReport {
    /// Rules attached to the model.
    pub rules_compiled: usize,
    /// Rules that failed to translate.
    pub rules_skipped: Vec<SkippedRule>,
    /// Actions whose target product has no type.
    pub actions_skipped: Vec<SkippedAction>,
}

/// Builds the synthetic transaction type.
///
/// # Errors
///
/// Returns an error if the configured name is empty.
pub fn virtual_root_type(config: &GeneratorConfig) -> Result<CmlType, ModelError> {
    let mut root = CmlType::new(config.virtual_root_name.clone())?;
    root.annotations.set(VIRTUAL_PROPERTY, true);
    let mut line_items = CmlRelation::new(LINE_ITEMS_RELATION, config.base_type_name.clone());
    line_items
        .annotations
        .set("sourceContextNode", LINE_ITEMS_SOURCE_CONTEXT);
    root.add_relation(line_items)?;
    Ok(root)
}

/// Appends constraints for a set of rules to a model.
pub struct RuleCompiler<'m> {
    model: &'m mut CmlModel,
    config: &'m GeneratorConfig,
    graph: RelationGraph,
}

impl<'m> RuleCompiler<'m> {
    /// Adds the virtual root to `model` and snapshots its relations.
    ///
    /// # Errors
    ///
    /// Returns an error if the virtual root name is empty or taken.
    pub fn new(model: &'m mut CmlModel, config: &'m GeneratorConfig) -> Result<Self, ModelError> {
        model.add_type(virtual_root_type(config)?)?;
        let graph = RelationGraph::build(model);
        Ok(Self {
            model,
            config,
            graph,
        })
    }

    /// Compiles `rules` in order. The virtual root is removed again if no
    /// rule attached anything to it.
    ///
    /// # Errors
    ///
    /// Returns a model error if attaching a translated rule violates a model
    /// invariant. Translation failures only skip the rule.
    pub fn compile(mut self, rules: &[Rule]) -> Result<CompileReport, ModelError> {
        let mut report = CompileReport::default();

        for rule in rules {
            if extract_product_ids(rule).is_empty() {
                debug!("Rule {} references no catalog product", rule.api_name);
                continue;
            }
            match self.translate(rule) {
                Ok((batch, skipped)) => {
                    let appended = batch.apply(self.model)?;
                    debug!("Rule {}: {} constraint(s)", rule.api_name, appended);
                    report.rules_compiled += 1;
                    report.actions_skipped.extend(skipped);
                }
                Err(e) => {
                    warn!("Failed to convert rule {}: {}. Skipping it.", rule.api_name, e);
                    report.rules_skipped.push(SkippedRule {
                        api_name: rule.api_name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let root = &self.config.virtual_root_name;
        if self
            .model
            .get_type(root)
            .is_some_and(|t| t.constraints().is_empty())
        {
            self.model.delete_type(root)?;
        }

        info!(
            "Compiled {} rule(s), skipped {} rule(s) and {} action(s)",
            report.rules_compiled,
            report.rules_skipped.len(),
            report.actions_skipped.len()
        );
        Ok(report)
    }

    fn translate(&self, rule: &Rule) -> Result<(Batch, Vec<SkippedAction>), CompileError> {
        let resolver = Resolver {
            model: self.model,
            config: self.config,
            graph: &self.graph,
        };
        let virtual_root = self
            .model
            .get_type(&self.config.virtual_root_name)
            .ok_or_else(|| CompileError::MissingVirtualRoot {
                name: self.config.virtual_root_name.clone(),
            })?;

        let mut batch = Batch::default();
        let mut compiled = Vec::with_capacity(rule.criteria.len());
        for (position, criterion) in rule.criteria.iter().enumerate() {
            compiled.push(criteria::translate(
                &resolver,
                &mut batch,
                rule,
                position,
                criterion,
                virtual_root,
            )?);
        }

        let mut ordered: Vec<_> = rule.actions.iter().collect();
        ordered.sort_by_key(|a| a.sequence);
        let mut skipped = Vec::new();
        for action in ordered {
            match actions::translate(&resolver, &mut batch, rule, action, &compiled, virtual_root) {
                Err(e @ CompileError::MissingActionTarget { .. }) => {
                    warn!("Rule {}: {}. Skipping the action.", rule.api_name, e);
                    skipped.push(SkippedAction {
                        api_name: rule.api_name.clone(),
                        action: action.action_type.to_string(),
                        reason: e.to_string(),
                    });
                }
                other => other?,
            }
        }
        Ok((batch, skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cml::{CmlAttribute, CmlDataType};
    use crate::rules::{
        Action, Condition, ConditionKind, Criterion, RuleScope, TargetInformation,
    };

    // ── Fixtures ──

    /// `Pro { laptop : Laptop; printer : Printer }`, all under `LineItem`.
    fn model() -> CmlModel {
        let mut model = CmlModel::with_base_type("LineItem").unwrap();
        for (name, id) in [("Pro", "01tPRO"), ("Laptop", "01tLAP"), ("Printer", "01tPRN")] {
            let mut t = CmlType::new(name).unwrap();
            t.product_id = Some(id.to_string());
            t.set_parent("LineItem");
            model.add_type(t).unwrap();
        }
        let pro = model.expect_type_mut("Pro").unwrap();
        let mut laptop = CmlRelation::new("laptop", "Laptop");
        laptop.prc_ids.push("0dSLAP".to_string());
        pro.add_relation(laptop).unwrap();
        pro.add_relation(CmlRelation::new("printer", "Printer")).unwrap();
        model
            .expect_type_mut("Laptop")
            .unwrap()
            .add_attribute(CmlAttribute::new("Memory", Some(CmlDataType::String)));
        model
    }

    fn products(ids: &[&str]) -> Vec<TargetInformation> {
        vec![TargetInformation {
            name: "Product".to_string(),
            values: ids.iter().map(ToString::to_string).collect(),
        }]
    }

    fn attribute_condition(name: &str, operator: Operator, values: &[&str]) -> Condition {
        Condition {
            kind: ConditionKind::Attribute,
            attribute_id: None,
            attribute_name: Some(name.to_string()),
            context_tag_name: None,
            data_type: Some("Text".to_string()),
            operator,
            values: values.iter().map(ToString::to_string).collect(),
        }
    }

    fn criterion(root: &str, source: &str, conditions: Vec<Condition>) -> Criterion {
        Criterion {
            root_object_id: Some(root.to_string()),
            source_values: vec![source.to_string()],
            source_operator: Some(Operator::Contains),
            source_information: vec![],
            criteria_index: Some(1),
            conditions,
        }
    }

    fn action(action_type: ActionType, target: &str) -> Action {
        Action {
            action_type,
            target_values: vec![],
            target_information: products(&[target]),
            target_context_tag_name: None,
            action_parameters: vec![],
            message: None,
            message_type: None,
            sequence: 2,
            behavior_type_lock: false,
        }
    }

    fn rule(scope: RuleScope, criteria: Vec<Criterion>, actions: Vec<Action>) -> Rule {
        Rule {
            api_name: "r".to_string(),
            name: "R".to_string(),
            sequence: 10,
            scope,
            criteria,
            actions,
        }
    }

    fn compile(model: &mut CmlModel, rules: &[Rule]) -> CompileReport {
        let config = GeneratorConfig::default();
        RuleCompiler::new(model, &config).unwrap().compile(rules).unwrap()
    }

    fn rendered(model: &CmlModel, type_name: &str) -> Vec<String> {
        model
            .get_type(type_name)
            .unwrap()
            .constraints()
            .iter()
            .map(|c| c.render())
            .collect()
    }

    // -- Happy path --

    #[test]
    fn bundle_auto_add_requires_relation_under_guard() {
        let mut m = model();
        let memory = attribute_condition("Memory", Operator::Equals, &["RAM 64GB"]);
        let mut add = action(ActionType::AutoAdd, "01tPRN");
        add.behavior_type_lock = true;
        add.message = Some("Printer added".to_string());
        let rules = [rule(
            RuleScope::Bundle,
            vec![criterion("01tPRO", "01tLAP", vec![memory])],
            vec![add],
        )];

        let report = compile(&mut m, &rules);
        assert_eq!(report.rules_compiled, 1);
        assert_eq!(
            rendered(&m, "Pro"),
            vec![
                r#"constraint r_criteria_1 = ((laptop[Laptop] > 0) && laptop[Laptop].Memory == "RAM 64GB");"#,
                "@(sequence = 12)\nrequire(r_criteria_1, printer[Printer]);",
                r#"rule(r_criteria_1, "Disable", "relation", "printer", "type", "Printer");"#,
                r#"message(r_criteria_1, "AutoAdd: Printer added", "Info");"#,
            ]
        );
        assert!(!m.has_type("VirtualQuote"));
    }

    #[test]
    fn component_tag_selects_parent_type() {
        let mut m = model();
        let mut remove = action(ActionType::AutoRemove, "01tLAP");
        remove.target_context_tag_name = Some(actions::RELATED_COMPONENT_TAG.to_string());
        remove.target_values = vec!["0dSLAP".to_string()];
        let rules = [rule(RuleScope::Bundle, vec![], vec![remove])];

        compile(&mut m, &rules);
        assert_eq!(
            rendered(&m, "Pro"),
            vec!["@(sequence = 12)\nexclude(true, laptop[Laptop]);"]
        );
    }

    #[test]
    fn transaction_scope_uses_virtual_root() {
        let mut m = model();
        let mut c = criterion("01tLAP", "01tLAP", vec![]);
        c.root_object_id = None;
        let rules = [rule(
            RuleScope::Transaction,
            vec![c],
            vec![action(ActionType::AutoAdd, "01tPRN")],
        )];

        compile(&mut m, &rules);
        let root = m.get_type("VirtualQuote").unwrap();
        assert!(root.is_virtual());
        let lines = rendered(&m, "VirtualQuote");
        assert_eq!(
            lines[0],
            "constraint r_criteria_1 = ((lineItems[Pro].laptop[Laptop] > 0 || lineItems[Laptop] > 0));"
        );
        assert_eq!(lines[1], "@(sequence = 12)\nrequire(r_criteria_1, lineItems[Printer]);");
    }

    #[test]
    fn attribute_values_propagate_guard_into_child() {
        let mut m = model();
        let memory = attribute_condition("Memory", Operator::Equals, &["RAM 64GB"]);
        let mut disable = action(ActionType::DisableAttributeValue, "01tLAP");
        disable.action_parameters = vec![attribute_condition(
            "Windows_Processor",
            Operator::Equals,
            &["i7-CPU 4.7GHz", "Intel Core i9 5.2 GHz"],
        )];
        let rules = [rule(
            RuleScope::Bundle,
            vec![criterion("01tPRO", "01tLAP", vec![memory])],
            vec![disable],
        )];

        compile(&mut m, &rules);
        let pro = m.get_type("Pro").unwrap();
        assert!(pro.attribute("r_criteria_1_value").is_some());
        assert_eq!(
            rendered(&m, "Pro")[1],
            "constraint((r_criteria_1) == r_criteria_1_value);"
        );

        let laptop = m.get_type("Laptop").unwrap();
        assert_eq!(
            laptop.attribute("parent_r_criteria_1_value").unwrap().render(),
            "boolean parent_r_criteria_1_value = parent(r_criteria_1_value)"
        );
        insta::assert_snapshot!(rendered(&m, "Laptop")[0], @r#"
        @(sequence = 12)
        rule(parent_r_criteria_1_value == true, "Disable", "attribute", "Windows_Processor", "value", ["i7-CPU 4.7GHz", "Intel Core i9 5.2 GHz"]);
        "#);
    }

    #[test]
    fn product_scope_attaches_to_target() {
        let mut m = model();
        let mut set = action(ActionType::SetAttribute, "01tLAP");
        set.action_parameters = vec![attribute_condition("Memory", Operator::Equals, &["RAM 32GB"])];
        set.message = Some("2k screen selected. and 27\"".to_string());
        let mut c = criterion("01tLAP", "01tLAP", vec![]);
        c.source_operator = None;
        let rules = [rule(RuleScope::Product, vec![c], vec![set])];

        compile(&mut m, &rules);
        assert_eq!(
            rendered(&m, "Laptop"),
            vec![
                "constraint r_criteria_1 = (true);",
                "@(sequence = 12)\nconstraint(r_criteria_1 && (Memory == \"RAM 32GB\"));",
                r#"message(r_criteria_1, "SetAttribute: 2k screen selected. and 27\"", "Info");"#,
            ]
        );
    }

    #[test]
    fn missing_parent_becomes_error_message() {
        let mut m = model();
        let rules = [rule(
            RuleScope::Product,
            vec![],
            vec![action(ActionType::HideProduct, "01tLAP")],
        )];

        compile(&mut m, &rules);
        assert_eq!(
            rendered(&m, "Laptop"),
            vec![
                r#"message(true, "HideProduct (scope: Product): Parent type can't be null for HideProduct action.", "error");"#
            ]
        );
    }

    #[test]
    fn validate_keeps_first_part_asymmetry() {
        let mut m = model();
        let mut check = action(ActionType::Validate, "01tLAP");
        check.action_parameters = vec![
            attribute_condition("Memory", Operator::Equals, &["RAM 64GB"]),
            attribute_condition("Memory", Operator::NotEquals, &["RAM 8GB"]),
        ];
        check.message = Some("bad memory".to_string());
        let rules = [rule(RuleScope::Product, vec![], vec![check])];

        compile(&mut m, &rules);
        assert_eq!(
            rendered(&m, "Laptop"),
            vec![
                "@(sequence = 12)\nmessage(true && !(Memory == \"RAM 64GB\" || !Memory != \"RAM 8GB\"), \"Validate: bad memory\", \"Info\");"
            ]
        );
    }

    #[test]
    fn unsupported_actions_leave_a_note() {
        let mut m = model();
        let mut quantity = action(ActionType::SetQuantity, "01tLAP");
        quantity.action_parameters = vec![attribute_condition("Quantity", Operator::Equals, &["3"])];
        quantity.message = Some("three".to_string());
        let rules = [rule(RuleScope::Bundle, vec![], vec![quantity])];

        compile(&mut m, &rules);
        assert_eq!(
            rendered(&m, "LineItem"),
            Vec::<String>::new(),
            "nothing lands on the base type"
        );
        let laptop = rendered(&m, "Laptop");
        assert_eq!(
            laptop,
            vec![
                "@(sequence = 12)\nmessage(true, \"[Not-Supported] SetQuantity: three. Please set quantity 3 for type Laptop manually.\", \"Info\");"
            ]
        );
    }

    #[test]
    fn identical_rules_are_attached_once() {
        let mut m = model();
        let hide = || {
            let mut a = action(ActionType::HideAttribute, "01tLAP");
            a.action_parameters = vec![attribute_condition("Memory", Operator::Equals, &["x"])];
            a
        };
        let rules = [
            rule(RuleScope::Product, vec![], vec![hide()]),
            rule(RuleScope::Product, vec![], vec![hide()]),
        ];

        let report = compile(&mut m, &rules);
        assert_eq!(report.rules_compiled, 2);
        assert_eq!(rendered(&m, "Laptop").len(), 1);
    }

    // -- Error cases --

    #[test]
    fn unknown_action_target_skips_only_that_action() {
        let mut m = model();
        let mut mixed = rule(
            RuleScope::Bundle,
            vec![criterion("01tPRO", "01tLAP", vec![])],
            vec![
                action(ActionType::AutoAdd, "01tNOPE"),
                action(ActionType::AutoAdd, "01tPRN"),
            ],
        );
        mixed.api_name = "mixed".to_string();

        let report = compile(&mut m, &[mixed]);
        assert_eq!(report.rules_compiled, 1);
        assert!(report.rules_skipped.is_empty());
        assert_eq!(report.actions_skipped.len(), 1);
        assert_eq!(report.actions_skipped[0].api_name, "mixed");
        assert_eq!(report.actions_skipped[0].action, "AutoAdd");
        assert!(report.actions_skipped[0].reason.contains("01tNOPE"));

        let pro = rendered(&m, "Pro");
        assert!(pro.iter().any(|l| l.starts_with("constraint mixed_criteria_")));
        assert!(pro.iter().any(|l| l.contains("printer[Printer]")));
        assert!(!pro.iter().any(|l| l.contains("01tNOPE")));
    }

    #[test]
    fn unknown_criterion_source_is_reported() {
        let mut m = model();
        let rules = [rule(
            RuleScope::Bundle,
            vec![criterion("01tPRO", "01tNOPE", vec![])],
            vec![action(ActionType::AutoAdd, "01tLAP")],
        )];

        let report = compile(&mut m, &rules);
        assert_eq!(report.rules_compiled, 0);
        assert!(report.rules_skipped[0].reason.contains("r_criteria_1"));
    }

    #[test]
    fn rules_without_products_are_ignored() {
        let mut m = model();
        let rules = [rule(RuleScope::Product, vec![], vec![])];
        let report = compile(&mut m, &rules);
        assert_eq!(report, CompileReport::default());
    }

    #[test]
    fn taken_virtual_root_name_is_fatal() {
        let mut m = model();
        m.add_type(CmlType::new("VirtualQuote").unwrap()).unwrap();
        let config = GeneratorConfig::default();
        assert!(matches!(
            RuleCompiler::new(&mut m, &config),
            Err(ModelError::DuplicateType { .. })
        ));
    }
}
