//! Type, relation and attribute lookup plus the per-rule pending batch.

use tracing::debug;

use super::expr::comparison;
use super::CompileError;
use crate::cml::{
    CmlAttribute, CmlConstraint, CmlDataType, CmlModel, CmlRelation, CmlType, ModelError,
};
use crate::config::GeneratorConfig;
use crate::graph::RelationGraph;
use crate::rules::{Condition, ConditionKind};

/// Annotation naming the context tag an attribute stands for.
pub const TAG_NAME_PROPERTY: &str = "tagName";

// ────────────────────────────────────────────
// Pending batch
// ────────────────────────────────────────────

/// Additions computed for one rule, attached only once the whole rule
/// translated successfully.
#[derive(Debug, Default)]
pub struct Batch {
    attributes: Vec<(String, CmlAttribute)>,
    constraints: Vec<(String, CmlConstraint)>,
}

impl Batch {
    /// Queues an attribute for `owner`.
    pub fn add_attribute(&mut self, owner: &str, attribute: CmlAttribute) {
        self.attributes.push((owner.to_string(), attribute));
    }

    /// Queues a constraint for `owner`.
    pub fn push(&mut self, owner: &str, constraint: CmlConstraint) {
        self.constraints.push((owner.to_string(), constraint));
    }

    /// Returns a queued attribute.
    #[must_use]
    pub fn attribute(&self, owner: &str, name: &str) -> Option<&CmlAttribute> {
        self.attributes
            .iter()
            .find(|(o, a)| o == owner && a.name == name)
            .map(|(_, a)| a)
    }

    /// Returns `true` if `owner` would hold a constraint named `name`.
    #[must_use]
    pub fn has_constraint_named(&self, model: &CmlModel, owner: &str, name: &str) -> bool {
        model
            .get_type(owner)
            .is_some_and(|t| t.has_constraint_named(name))
            || self
                .constraints
                .iter()
                .any(|(o, c)| o == owner && c.name() == Some(name))
    }

    /// Queued constraints in order.
    pub fn constraints(&self) -> impl Iterator<Item = (&str, &CmlConstraint)> {
        self.constraints.iter().map(|(o, c)| (o.as_str(), c))
    }

    /// Attaches everything in queue order. Returns the number of constraints
    /// actually appended (equivalent ones are dropped by the owning type).
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownType`] if an owner vanished.
    pub fn apply(self, model: &mut CmlModel) -> Result<usize, ModelError> {
        for (owner, attribute) in self.attributes {
            let target = model.expect_type_mut(&owner)?;
            if target.attribute(&attribute.name).is_none() {
                target.add_attribute(attribute);
            }
        }
        let mut appended = 0;
        for (owner, constraint) in self.constraints {
            if model.expect_type_mut(&owner)?.add_constraint(constraint) {
                appended += 1;
            }
        }
        Ok(appended)
    }
}

// ────────────────────────────────────────────
// Resolver
// ────────────────────────────────────────────

/// Read-only view of the model used while translating rules.
pub struct Resolver<'a> {
    /// The model being extended.
    pub model: &'a CmlModel,
    /// Generator settings.
    pub config: &'a GeneratorConfig,
    /// Relation snapshot of `model`.
    pub graph: &'a RelationGraph,
}

impl<'a> Resolver<'a> {
    /// Returns the type generated from a catalog id.
    #[must_use]
    pub fn type_for(&self, catalog_id: &str) -> Option<&'a CmlType> {
        self.model.type_by_catalog_id(catalog_id)
    }

    /// Returns the type owning a relation generated from `prc_id`.
    #[must_use]
    pub fn owner_of_component(&self, prc_id: &str) -> Option<&'a CmlType> {
        self.model
            .types()
            .find(|t| t.relations().any(|r| r.has_prc_id(prc_id)))
    }

    /// Finds the relation of `parent` that holds `target`: one typed as
    /// `target` itself, or as its non-virtual parent type.
    #[must_use]
    pub fn relation(&self, parent: &'a CmlType, target: &CmlType) -> Option<&'a CmlRelation> {
        let abstract_parent = target
            .parent()
            .filter(|p| !self.model.get_type(p).is_some_and(CmlType::is_virtual));
        parent.relations().find(|r| {
            r.target_type == target.name() || abstract_parent == Some(r.target_type.as_str())
        })
    }

    /// Prefix navigating from `from` to `to`, empty for the same type or
    /// when no path exists.
    #[must_use]
    pub fn navigation_prefix(&self, from: &CmlType, to: &CmlType) -> String {
        if from.name() == to.name() {
            return String::new();
        }
        self.graph
            .first_path(from.name(), to.name())
            .map(|p| p.prefix())
            .unwrap_or_default()
    }

    /// Returns the attribute of `owner` matching `id` or `name`, creating it
    /// in `batch` when neither the model nor the batch has it.
    pub fn attribute(
        &self,
        batch: &mut Batch,
        owner: &CmlType,
        id: Option<&str>,
        name: &str,
        data_type: Option<&str>,
        tag: bool,
    ) -> CmlAttribute {
        let existing = id
            .and_then(|id| owner.attribute_by_id(id))
            .or_else(|| owner.attribute(name))
            .or_else(|| batch.attribute(owner.name(), name));
        if let Some(attribute) = existing {
            return attribute.clone();
        }

        let data_type = if self.config.integer_tags.iter().any(|t| t == name) {
            Some(CmlDataType::Int)
        } else {
            CmlDataType::from_source(data_type.unwrap_or("Text"))
        };
        let mut attribute = CmlAttribute::new(name, data_type);
        if let Some(id) = id {
            attribute.attribute_id = Some(id.to_string());
        }
        if tag {
            attribute.annotations.set(TAG_NAME_PROPERTY, name);
        }
        debug!("Creating attribute {}.{}", owner.name(), name);
        batch.add_attribute(owner.name(), attribute.clone());
        attribute
    }

    /// Translates an attribute or tag condition evaluated on `owner`,
    /// navigated to from `from` when given. Enum conditions yield nothing.
    ///
    /// # Errors
    ///
    /// Propagates operand errors from the operator table.
    pub fn condition(
        &self,
        batch: &mut Batch,
        condition: &Condition,
        owner: &CmlType,
        from: Option<&CmlType>,
    ) -> Result<Option<String>, CompileError> {
        let prefix = from.map(|f| self.navigation_prefix(f, owner)).unwrap_or_default();
        let data_type = condition.data_type.as_deref();

        let (attribute, left) = match condition.kind {
            ConditionKind::Attribute => {
                let Some(name) = condition.attribute_name.as_deref() else {
                    return Ok(None);
                };
                let attribute = self.attribute(
                    batch,
                    owner,
                    condition.attribute_id.as_deref(),
                    name,
                    data_type,
                    false,
                );
                let left = format!("{prefix}{}", attribute.name);
                (attribute, left)
            }
            ConditionKind::Tag => {
                let Some(tag) = condition.context_tag_name.as_deref() else {
                    return Ok(None);
                };
                let attribute = self.attribute(batch, owner, None, tag, data_type, true);
                (attribute, format!("{prefix}{tag}"))
            }
            ConditionKind::Enum => return Ok(None),
        };

        comparison(&left, condition.operator, &condition.values, attribute.is_string()).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Operator;

    fn fixture() -> (CmlModel, GeneratorConfig) {
        let mut model = CmlModel::with_base_type("LineItem").unwrap();
        let mut pro = CmlType::new("Pro").unwrap();
        pro.add_relation(CmlRelation::new("laptop", "Laptop")).unwrap();
        model.add_type(pro).unwrap();
        let mut laptop = CmlType::new("Laptop").unwrap();
        laptop.set_parent("LineItem");
        laptop.add_attribute(
            CmlAttribute::new("Memory", Some(CmlDataType::String)).with_id("0tjMEM"),
        );
        model.add_type(laptop).unwrap();
        (model, GeneratorConfig::default())
    }

    fn condition(kind: ConditionKind, name: &str, operator: Operator, value: &str) -> Condition {
        Condition {
            kind,
            attribute_id: None,
            attribute_name: Some(name.to_string()),
            context_tag_name: Some(name.to_string()),
            data_type: None,
            operator,
            values: vec![value.to_string()],
        }
    }

    #[test]
    fn condition_is_prefixed_with_navigation_path() {
        let (model, config) = fixture();
        let graph = RelationGraph::build(&model);
        let resolver = Resolver { model: &model, config: &config, graph: &graph };
        let mut batch = Batch::default();

        let expr = resolver
            .condition(
                &mut batch,
                &condition(ConditionKind::Attribute, "Memory", Operator::Equals, "RAM 64GB"),
                model.get_type("Laptop").unwrap(),
                model.get_type("Pro"),
            )
            .unwrap();
        assert_eq!(expr.as_deref(), Some(r#"laptop[Laptop].Memory == "RAM 64GB""#));
        assert!(batch.attribute("Laptop", "Memory").is_none());
    }

    #[test]
    fn tag_condition_creates_annotated_attribute() {
        let (model, config) = fixture();
        let graph = RelationGraph::build(&model);
        let resolver = Resolver { model: &model, config: &config, graph: &graph };
        let mut batch = Batch::default();

        let expr = resolver
            .condition(
                &mut batch,
                &condition(ConditionKind::Tag, "SellingModelType", Operator::Equals, "OneTime"),
                model.get_type("Pro").unwrap(),
                None,
            )
            .unwrap();
        assert_eq!(expr.as_deref(), Some(r#"SellingModelType == "OneTime""#));
        let created = batch.attribute("Pro", "SellingModelType").unwrap();
        assert_eq!(
            created.render(),
            "@(tagName = \"SellingModelType\")\nstring SellingModelType"
        );
    }

    #[test]
    fn integer_tags_are_typed_int() {
        let (model, config) = fixture();
        let graph = RelationGraph::build(&model);
        let resolver = Resolver { model: &model, config: &config, graph: &graph };
        let mut batch = Batch::default();

        let expr = resolver
            .condition(
                &mut batch,
                &condition(ConditionKind::Tag, "LineItemQuantity", Operator::GreaterThan, "2"),
                model.get_type("Laptop").unwrap(),
                None,
            )
            .unwrap();
        assert_eq!(expr.as_deref(), Some("LineItemQuantity > 2"));
        let created = batch.attribute("Laptop", "LineItemQuantity").unwrap();
        assert_eq!(created.data_type, Some(CmlDataType::Int));
    }

    #[test]
    fn relation_matches_abstract_parent_type() {
        let (mut model, config) = fixture();
        let mut root = CmlType::new("VirtualQuote").unwrap();
        root.annotations.set("virtual", true);
        root.add_relation(CmlRelation::new("lineItems", "LineItem")).unwrap();
        model.add_type(root).unwrap();
        let graph = RelationGraph::build(&model);
        let resolver = Resolver { model: &model, config: &config, graph: &graph };

        let laptop = model.get_type("Laptop").unwrap();
        let found = resolver.relation(model.get_type("VirtualQuote").unwrap(), laptop);
        assert_eq!(found.map(|r| r.name.as_str()), Some("lineItems"));
        let direct = resolver.relation(model.get_type("Pro").unwrap(), laptop);
        assert_eq!(direct.map(|r| r.name.as_str()), Some("laptop"));
    }

    #[test]
    fn batch_applies_in_order_and_drops_equivalents() {
        let (mut model, _) = fixture();
        let mut batch = Batch::default();
        batch.push("Pro", CmlConstraint::named("r_criteria_0", "true"));
        batch.push("Pro", CmlConstraint::named("r_criteria_0", "true"));
        batch.push("Pro", CmlConstraint::unnamed("laptop[Laptop] > 0"));
        assert!(batch.has_constraint_named(&model, "Pro", "r_criteria_0"));

        assert_eq!(batch.apply(&mut model).unwrap(), 2);
        let constraints = model.get_type("Pro").unwrap().constraints();
        assert_eq!(constraints[0].name(), Some("r_criteria_0"));
        assert_eq!(constraints[1].sequence(), 1);
    }
}
