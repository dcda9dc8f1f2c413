//! CML types.

use indexmap::IndexMap;

use super::annotation::{Annotations, PropertyValue};
use super::attribute::CmlAttribute;
use super::constraint::CmlConstraint;
use super::relation::CmlRelation;
use super::ModelError;
use crate::grouping::ids_refer;

/// Property marking a type as a virtual container.
pub const VIRTUAL_PROPERTY: &str = "virtual";

/// A CML type with its attributes, relations and constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct CmlType {
    name: String,
    /// Catalog product id this type was generated from.
    pub product_id: Option<String>,
    /// Classification id for product-class types.
    pub classification_id: Option<String>,
    parent: Option<String>,
    attributes: IndexMap<String, CmlAttribute>,
    relations: IndexMap<String, CmlRelation>,
    constraints: Vec<CmlConstraint>,
    /// Properties.
    pub annotations: Annotations,
}

impl CmlType {
    /// Creates an empty type.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingTypeName`] if `name` is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModelError::MissingTypeName);
        }
        Ok(Self {
            name,
            product_id: None,
            classification_id: None,
            parent: None,
            attributes: IndexMap::new(),
            relations: IndexMap::new(),
            constraints: Vec::new(),
            annotations: Annotations::default(),
        })
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent type name.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Sets the parent type name.
    pub fn set_parent(&mut self, parent: impl Into<String>) {
        self.parent = Some(parent.into());
    }

    /// Returns `true` for virtual container types.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        matches!(
            self.annotations.get(VIRTUAL_PROPERTY),
            Some(PropertyValue::Bool(true))
        )
    }

    /// Returns `true` if this type was generated from `catalog_id`.
    #[must_use]
    pub fn refers_to(&self, catalog_id: &str) -> bool {
        self.product_id
            .iter()
            .chain(self.classification_id.iter())
            .any(|id| ids_refer(id, catalog_id))
    }

    // ── Attributes ──

    /// Adds an attribute, replacing one with the same name in place.
    pub fn add_attribute(&mut self, attribute: CmlAttribute) {
        self.attributes.insert(attribute.name.clone(), attribute);
    }

    /// Returns an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&CmlAttribute> {
        self.attributes.get(name)
    }

    /// Returns the attribute generated from a catalog attribute id.
    #[must_use]
    pub fn attribute_by_id(&self, attribute_id: &str) -> Option<&CmlAttribute> {
        self.attributes.values().find(|a| {
            a.attribute_id
                .as_deref()
                .is_some_and(|id| ids_refer(id, attribute_id))
        })
    }

    /// Returns all attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = &CmlAttribute> {
        self.attributes.values()
    }

    // ── Relations ──

    /// Adds a relation.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateRelation`] if the name is taken.
    pub fn add_relation(&mut self, relation: CmlRelation) -> Result<(), ModelError> {
        if self.relations.contains_key(&relation.name) {
            return Err(ModelError::DuplicateRelation {
                type_name: self.name.clone(),
                relation: relation.name,
            });
        }
        self.relations.insert(relation.name.clone(), relation);
        Ok(())
    }

    /// Returns a relation by name.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&CmlRelation> {
        self.relations.get(name)
    }

    /// Returns all relations in declaration order.
    pub fn relations(&self) -> impl Iterator<Item = &CmlRelation> {
        self.relations.values()
    }

    // ── Constraints ──

    /// Appends a constraint unless an equivalent one is present.
    ///
    /// The appended constraint's sequence becomes its insertion index.
    /// Returns `true` if it was appended.
    pub fn add_constraint(&mut self, mut constraint: CmlConstraint) -> bool {
        if self
            .constraints
            .iter()
            .any(|existing| existing.is_equivalent(&constraint))
        {
            return false;
        }
        constraint.set_sequence(self.constraints.len());
        self.constraints.push(constraint);
        true
    }

    /// Returns `true` if a constraint with this name is attached.
    #[must_use]
    pub fn has_constraint_named(&self, name: &str) -> bool {
        self.constraints.iter().any(|c| c.name() == Some(name))
    }

    /// Returns the constraints in insertion order.
    #[must_use]
    pub fn constraints(&self) -> &[CmlConstraint] {
        &self.constraints
    }

    /// Returns `true` if the type declares nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.relations.is_empty() && self.constraints.is_empty()
    }

    /// Renders the type block (before indentation).
    #[must_use]
    pub fn render(&self) -> String {
        let mut header = format!("type {}", self.name);
        if let Some(parent) = &self.parent {
            header.push_str(&format!(" : {parent}"));
        }
        let mut out = self.annotations.prefix(header);

        if self.is_empty() {
            out.push_str(";\n");
            return out;
        }

        let mut sorted: Vec<&CmlConstraint> = self.constraints.iter().collect();
        sorted.sort_by_key(|c| c.sequence());

        let items: Vec<String> = self
            .attributes
            .values()
            .map(|a| format!("{};\n", a.render()))
            .chain(self.relations.values().map(|r| format!("{}\n", r.render())))
            .chain(sorted.into_iter().map(|c| format!("{}\n", c.render())))
            .collect();

        out.push_str(" {\n");
        out.push_str(&items.join("\n"));
        out.push_str("\n}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cml::attribute::CmlDataType;

    fn laptop() -> CmlType {
        let mut t = CmlType::new("Laptop").unwrap();
        t.product_id = Some("01tLAPTOP000001".to_string());
        t.set_parent("LineItem");
        t
    }

    // -- Happy path --

    #[test]
    fn empty_type_renders_terminated_header() {
        let t = CmlType::new("LineItem").unwrap();
        assert_eq!(t.render(), "type LineItem;\n");
    }

    #[test]
    fn body_lists_attributes_relations_constraints() {
        let mut t = laptop();
        t.add_attribute(CmlAttribute::new("Memory", Some(CmlDataType::String)));
        t.add_relation(CmlRelation::new("mouse", "Mouse")).unwrap();
        t.add_constraint(CmlConstraint::unnamed("true"));
        assert_eq!(
            t.render(),
            "type Laptop : LineItem {\nstring Memory;\n\nrelation mouse : Mouse;\n\nconstraint(true);\n\n}\n"
        );
    }

    #[test]
    fn add_constraint_is_idempotent_and_sequences_by_insertion() {
        let mut t = laptop();
        assert!(t.add_constraint(CmlConstraint::named("a", "x").with_sequence_hint(50)));
        assert!(t.add_constraint(CmlConstraint::named("b", "y").with_sequence_hint(10)));
        assert!(!t.add_constraint(CmlConstraint::named("a", "x")));

        let sequences: Vec<_> = t.constraints().iter().map(CmlConstraint::sequence).collect();
        assert_eq!(sequences, vec![0, 1]);
        assert!(t.has_constraint_named("b"));
    }

    #[test]
    fn catalog_ids_match_by_prefix() {
        let t = laptop();
        assert!(t.refers_to("01tLAPTOP"));
        assert!(!t.refers_to("01tMOUSE"));
    }

    #[test]
    fn virtual_flag_reads_annotation() {
        let mut t = CmlType::new("VirtualQuote").unwrap();
        assert!(!t.is_virtual());
        t.annotations.set(VIRTUAL_PROPERTY, true);
        assert!(t.is_virtual());
    }

    // -- Error cases --

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(CmlType::new(""), Err(ModelError::MissingTypeName)));
    }

    #[test]
    fn duplicate_relation_is_rejected() {
        let mut t = laptop();
        t.add_relation(CmlRelation::new("mouse", "Mouse")).unwrap();
        let result = t.add_relation(CmlRelation::new("mouse", "Mouse"));
        assert!(matches!(result, Err(ModelError::DuplicateRelation { .. })));
    }
}
