//! CML view models generated from catalog products.
//!
//! Walks each root product's bundle tree and derives the types, attributes,
//! relations and associations it needs. Generation reads the model but never
//! mutates it; [`ViewModel::apply`] attaches the result.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info};

use crate::catalog::{Product, ProductAttribute, RelatedComponent};
use crate::cml::naming::{sanitize_identifier, unique_name};
use crate::cml::{
    Association, CmlAttribute, CmlDataType, CmlModel, CmlRelation, CmlType, Domain, ModelError,
    PropertyValue, ReferenceType, TagKind,
};
use crate::config::GeneratorConfig;

/// Errors while deriving a view model.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// No type name can be derived for a product.
    #[error("product {product_id}: {source}")]
    Name {
        /// The product that could not be named.
        product_id: String,
        /// The underlying model error.
        source: ModelError,
    },
}

/// Everything generation adds to a model.
#[derive(Debug, Clone, Default)]
pub struct ViewModel {
    /// Newly created types, without attributes yet.
    pub types: Vec<CmlType>,
    /// New attributes per type name.
    pub attributes: IndexMap<String, Vec<CmlAttribute>>,
    /// New relations per owning type name.
    pub relations: IndexMap<String, Vec<CmlRelation>>,
    /// Associations not yet registered on the model.
    pub associations: Vec<Association>,
}

impl ViewModel {
    /// Returns `true` if nothing would be added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.attributes.values().all(Vec::is_empty)
            && self.relations.values().all(Vec::is_empty)
            && self.associations.is_empty()
    }

    fn has_pending_type(&self, name: &str) -> bool {
        self.types.iter().any(|t| t.name() == name)
    }

    fn has_pending_relation(&self, owner: &str, name: &str) -> bool {
        self.relations
            .get(owner)
            .is_some_and(|rels| rels.iter().any(|r| r.name == name))
    }

    /// Attaches attributes and relations to their types and registers the
    /// new types and associations on `model`.
    ///
    /// # Errors
    ///
    /// Returns a model error if a name collides or an owner type is missing.
    pub fn apply(mut self, model: &mut CmlModel) -> Result<(), ModelError> {
        for mut cml_type in self.types {
            if let Some(attributes) = self.attributes.shift_remove(cml_type.name()) {
                attributes
                    .into_iter()
                    .for_each(|a| cml_type.add_attribute(a));
            }
            model.add_type(cml_type)?;
        }
        for (owner, attributes) in self.attributes {
            let target = model.expect_type_mut(&owner)?;
            attributes.into_iter().for_each(|a| target.add_attribute(a));
        }
        for (owner, relations) in self.relations {
            let target = model.expect_type_mut(&owner)?;
            for relation in relations {
                target.add_relation(relation)?;
            }
        }
        for association in self.associations {
            model.add_association(association)?;
        }
        Ok(())
    }
}

/// Accumulator threaded through one generation pass.
#[derive(Default)]
struct GenerationState {
    /// Type name per catalog reference id.
    types_by_reference: IndexMap<String, String>,
    /// Related-component ids already turned into relations.
    visited_components: IndexSet<String>,
    out: ViewModel,
}

/// Derives view models for root products against an existing model.
pub struct ViewModelGenerator<'a> {
    model: &'a CmlModel,
    config: &'a GeneratorConfig,
}

impl<'a> ViewModelGenerator<'a> {
    /// Creates a generator reading `model`.
    #[must_use]
    pub fn new(model: &'a CmlModel, config: &'a GeneratorConfig) -> Self {
        Self { model, config }
    }

    /// Generates the additions for `products` and their bundle trees.
    ///
    /// # Errors
    ///
    /// Returns an error if a product's display name yields no identifier.
    pub fn generate<'p>(
        &self,
        products: impl IntoIterator<Item = &'p Product>,
    ) -> Result<ViewModel, GenerateError> {
        let mut state = GenerationState::default();
        for product in products {
            self.visit(product, &mut state)?;
        }
        info!(
            "Generated {} type(s), {} relation(s), {} association(s)",
            state.out.types.len(),
            state.out.relations.values().map(Vec::len).sum::<usize>(),
            state.out.associations.len()
        );
        Ok(state.out)
    }

    fn visit(&self, product: &Product, state: &mut GenerationState) -> Result<String, GenerateError> {
        let type_name = self.ensure_type(product, state)?;
        for child in product.components() {
            let child_type = self.visit(child, state)?;
            if let Some(component) = &child.product_related_component {
                self.ensure_relation(product, &type_name, child, &child_type, component, state);
            }
        }
        Ok(type_name)
    }

    fn ensure_type(
        &self,
        product: &Product,
        state: &mut GenerationState,
    ) -> Result<String, GenerateError> {
        let reference_id = product.reference_id();
        if let Some(name) = state.types_by_reference.get(reference_id) {
            return Ok(name.clone());
        }

        let existing = self.model.find_association(TagKind::Type, reference_id);
        if let Some(association) = existing {
            if self.model.has_type(&association.tag) {
                debug!(
                    "Reusing type {} for product {}",
                    association.tag, product.id
                );
                state
                    .types_by_reference
                    .insert(reference_id.to_string(), association.tag.clone());
                return Ok(association.tag.clone());
            }
        }

        let preferred = match existing {
            Some(association) => association.tag.clone(),
            None => sanitize_identifier(product.display_name(), self.config.max_name_length)
                .map_err(|e| GenerateError::Name {
                    product_id: product.id.clone(),
                    source: e,
                })?,
        };
        let name = unique_name(&preferred, self.config.max_name_length, |n| {
            self.model.has_type(n) || state.out.has_pending_type(n)
        });

        let mut cml_type = CmlType::new(name.clone()).map_err(|e| GenerateError::Name {
            product_id: product.id.clone(),
            source: e,
        })?;
        cml_type.product_id = Some(product.id.clone());
        if product.is_product_class() {
            cml_type.classification_id = Some(reference_id.to_string());
        }
        if self.model.has_type(&self.config.base_type_name) {
            cml_type.set_parent(self.config.base_type_name.clone());
        }

        if existing.is_none() {
            let reference_type = if product.is_product_class() {
                ReferenceType::ProductClassification
            } else {
                ReferenceType::Product2
            };
            state.out.associations.push(Association::new(
                name.clone(),
                TagKind::Type,
                reference_id,
                reference_type,
                product.display_name(),
            ));
        }

        if existing.is_none() {
            let attributes: Vec<CmlAttribute> = product
                .active_attributes()
                .into_iter()
                .map(translate_attribute)
                .collect();
            if !attributes.is_empty() {
                state.out.attributes.insert(name.clone(), attributes);
            }
        }

        debug!("New type {} for product {}", name, product.id);
        state.out.types.push(cml_type);
        state
            .types_by_reference
            .insert(reference_id.to_string(), name.clone());
        Ok(name)
    }

    fn ensure_relation(
        &self,
        parent: &Product,
        parent_type: &str,
        child: &Product,
        child_type: &str,
        component: &RelatedComponent,
        state: &mut GenerationState,
    ) {
        if !state.visited_components.insert(component.id.clone()) {
            return;
        }

        let owner = self.model.get_type(parent_type);
        let existing = self.model.find_association(TagKind::Port, &component.id);
        if let Some(association) = existing {
            if owner.is_some_and(|t| t.relation(&association.tag).is_some()) {
                debug!(
                    "Reusing relation {}.{} for component {}",
                    parent_type, association.tag, component.id
                );
                return;
            }
        }

        let preferred = existing.map_or_else(|| child_type.to_lowercase(), |a| a.tag.clone());
        let name = unique_name(&preferred, self.config.max_name_length, |n| {
            owner.is_some_and(|t| t.relation(n).is_some())
                || state.out.has_pending_relation(parent_type, n)
        });

        let mut relation = CmlRelation::new(name.clone(), child_type);
        if let Some(min) = component.min_quantity {
            relation.set_min(min);
        } else if component.is_component_required {
            relation.set_min(1);
        }
        if let Some(max) = component.max_quantity {
            relation.set_max(max);
        } else if component.is_component_required {
            relation.set_max(self.config.required_max_quantity);
        }
        relation.prc_ids.push(component.id.clone());

        if existing.is_none() {
            let parent_name = parent.display_name();
            let reference_value = if child.is_product_class() {
                format!("{parent_name}||||{}", child.display_name())
            } else {
                format!("{parent_name}||{}||", child.name)
            };
            state.out.associations.push(Association::new(
                name,
                TagKind::Port,
                component.id.clone(),
                ReferenceType::ProductRelatedComponent,
                reference_value,
            ));
        }

        state
            .out
            .relations
            .entry(parent_type.to_string())
            .or_default()
            .push(relation);
    }
}

/// Translates a catalog attribute definition.
#[must_use]
pub fn translate_attribute(source: &ProductAttribute) -> CmlAttribute {
    let name = if source.developer_name.is_empty() {
        source.name.as_str()
    } else {
        source.developer_name.as_str()
    };

    let mut attribute = match &source.picklist {
        Some(picklist) => {
            let data_type = picklist.data_type.as_deref();
            let values: Vec<String> = picklist.values.iter().map(|v| v.value.clone()).collect();
            CmlAttribute::new(name, data_type.and_then(CmlDataType::from_source))
                .with_domain(Domain::from_picklist(data_type, &values))
        }
        None => CmlAttribute::new(name, CmlDataType::from_source(&source.data_type)),
    }
    .with_id(source.id.clone());

    if source.is_read_only {
        attribute.annotations.set("configurable", false);
    }
    if let Some(default) = source.default_value.as_ref().and_then(property_value) {
        attribute.annotations.set("defaultValue", default);
    }
    attribute
}

/// Converts a JSON default value; empty, zero and false values carry nothing.
fn property_value(value: &serde_json::Value) -> Option<PropertyValue> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(PropertyValue::Text(s.clone())),
        serde_json::Value::Bool(true) => Some(PropertyValue::Bool(true)),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(0), _) => None,
            (Some(i), _) => Some(PropertyValue::Integer(i)),
            (None, Some(f)) if f != 0.0 => Some(PropertyValue::Number(f)),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{attribute, bundle, component_of, simple};
    use crate::catalog::{NodeType, Picklist, PicklistValue, ProductClassification};

    fn base_model() -> CmlModel {
        CmlModel::with_base_type("LineItem").unwrap()
    }

    fn generate(model: &CmlModel, products: &[&Product]) -> ViewModel {
        let config = GeneratorConfig::default();
        ViewModelGenerator::new(model, &config)
            .generate(products.iter().copied())
            .unwrap()
    }

    // -- Happy path --

    #[test]
    fn bundle_tree_becomes_types_and_relations() {
        let mut laptop = simple("01tL", "Laptop");
        laptop.product_related_component = Some(component_of("01tP", "01tL", true));
        let pro = bundle("01tP", "Laptop Pro Bundle", vec![laptop, simple("01tM", "Mouse")]);

        let mut model = base_model();
        let view = generate(&model, &[&pro]);
        let names: Vec<_> = view.types.iter().map(CmlType::name).collect();
        assert_eq!(names, vec!["LaptopProBundle", "Laptop", "Mouse"]);
        assert!(view.types.iter().all(|t| t.parent() == Some("LineItem")));
        assert_eq!(view.associations.len(), 5);

        view.apply(&mut model).unwrap();
        let bundle_type = model.get_type("LaptopProBundle").unwrap();
        let laptop_rel = bundle_type.relation("laptop").unwrap();
        assert_eq!(laptop_rel.cardinality(), Some((1, 9999)));
        assert_eq!(laptop_rel.prc_ids, vec!["0dS01tP01tL"]);
        assert_eq!(bundle_type.relation("mouse").unwrap().cardinality(), None);
    }

    #[test]
    fn identical_display_names_get_suffixed() {
        let a = simple("01tA", "Laptop");
        let b = simple("01tB", "Laptop");
        let view = generate(&base_model(), &[&a, &b]);
        let names: Vec<_> = view.types.iter().map(CmlType::name).collect();
        assert_eq!(names, vec!["Laptop", "Laptop1"]);
    }

    #[test]
    fn relation_names_are_scoped_to_their_parent() {
        let first = bundle("01tP", "Pro", vec![simple("01tL", "Laptop")]);
        let second = bundle("01tQ", "Basic", vec![simple("01tL", "Laptop")]);
        let view = generate(&base_model(), &[&first, &second]);
        assert_eq!(view.relations["Pro"][0].name, "laptop");
        assert_eq!(view.relations["Basic"][0].name, "laptop");
    }

    #[test]
    fn same_product_twice_in_one_bundle_gets_two_relations() {
        let mut first = simple("01tL", "Laptop");
        first.product_related_component = Some(component_of("01tP", "01tL-a", false));
        let mut second = simple("01tL", "Laptop");
        second.product_related_component = Some(component_of("01tP", "01tL-b", false));
        let pro = bundle("01tP", "Pro", vec![first, second]);

        let view = generate(&base_model(), &[&pro]);
        assert_eq!(view.types.len(), 2);
        let rels: Vec<_> = view.relations["Pro"].iter().map(|r| r.name.as_str()).collect();
        assert_eq!(rels, vec!["laptop", "laptop1"]);
    }

    #[test]
    fn regeneration_with_existing_associations_adds_nothing() {
        let pro = bundle("01tP", "Pro", vec![simple("01tL", "Laptop")]);
        let mut model = base_model();
        generate(&model, &[&pro]).apply(&mut model).unwrap();

        let again = generate(&model, &[&pro]);
        assert!(again.is_empty(), "{again:?}");
    }

    #[test]
    fn ledger_association_names_a_fresh_type() {
        let mut model = base_model();
        model
            .add_association(Association::new(
                "LegacyLaptop",
                TagKind::Type,
                "01tL",
                ReferenceType::Product2,
                "Laptop",
            ))
            .unwrap();
        let view = generate(&model, &[&simple("01tL", "Laptop")]);
        assert_eq!(view.types[0].name(), "LegacyLaptop");
        assert!(view.associations.is_empty());
    }

    #[test]
    fn ledger_type_keeps_its_attributes_out() {
        let mut model = base_model();
        model
            .add_association(Association::new(
                "LegacyLaptop",
                TagKind::Type,
                "01tL",
                ReferenceType::Product2,
                "Laptop",
            ))
            .unwrap();
        let mut laptop = simple("01tL", "Laptop");
        laptop.attributes = vec![attribute("0tjG", "Graphics", "TEXT")];

        let view = generate(&model, &[&laptop]);
        assert_eq!(view.types[0].name(), "LegacyLaptop");
        assert!(view.attributes.is_empty(), "{:?}", view.attributes);
    }

    #[test]
    fn port_reference_value_joins_product_names() {
        let mut laptop = simple("01tL", "Laptop");
        laptop.product_related_component = Some(component_of("01tP", "01tL", true));
        let pro = bundle("01tP", "Laptop Pro Bundle", vec![laptop]);

        let view = generate(&base_model(), &[&pro]);
        let port = view
            .associations
            .iter()
            .find(|a| a.kind == TagKind::Port)
            .unwrap();
        assert_eq!(port.reference_object_id, "0dS01tP01tL");
        assert_eq!(port.reference_value, "Laptop Pro Bundle||Laptop||");
    }

    #[test]
    fn product_class_association_uses_classification() {
        let mut monitor = simple("01tC", "Any Monitor");
        monitor.node_type = NodeType::ProductClass;
        monitor.product_classification = Some(ProductClassification {
            id: "11BMON".to_string(),
            name: "Monitors".to_string(),
        });
        let desk = bundle("01tD", "Desk", vec![monitor]);

        let view = generate(&base_model(), &[&desk]);
        assert_eq!(view.types[1].name(), "Monitors");
        let type_assoc = &view.associations[1];
        assert_eq!(type_assoc.reference_type, ReferenceType::ProductClassification);
        assert_eq!(type_assoc.reference_object_id, "11BMON");
        let port = view
            .associations
            .iter()
            .find(|a| a.kind == TagKind::Port)
            .unwrap();
        assert_eq!(port.reference_value, "Desk||||Monitors");
    }

    #[test]
    fn attributes_are_translated() {
        let mut product = simple("01tL", "Laptop");
        let mut memory = attribute("0tjM", "Memory", "PICKLIST");
        memory.picklist = Some(Picklist {
            id: "pl".to_string(),
            data_type: Some("TEXT".to_string()),
            values: vec![
                PicklistValue {
                    value: "RAM 32GB".to_string(),
                    display_value: None,
                },
                PicklistValue {
                    value: "RAM 64GB".to_string(),
                    display_value: None,
                },
            ],
        });
        memory.default_value = Some(serde_json::json!("RAM 32GB"));
        let mut price = attribute("0tjP", "Price", "CURRENCY");
        price.is_read_only = true;
        price.default_value = Some(serde_json::json!(0));
        product.attributes = vec![memory, price];

        let view = generate(&base_model(), &[&product]);
        let rendered: Vec<_> = view.attributes["Laptop"].iter().map(CmlAttribute::render).collect();
        assert_eq!(
            rendered,
            vec![
                "@(defaultValue = \"RAM 32GB\")\nstring Memory = [\"RAM 32GB\", \"RAM 64GB\"]",
                "@(configurable = false)\ndecimal(2) Price",
            ]
        );
    }

    // -- Error cases --

    #[test]
    fn unnameable_product_is_an_error() {
        let config = GeneratorConfig::default();
        let model = base_model();
        let product = simple("01tX", "123");
        let result = ViewModelGenerator::new(&model, &config).generate([&product]);
        assert!(matches!(result, Err(GenerateError::Name { .. })));
    }
}
