//! CML relations between types.

use indexmap::IndexMap;

use super::annotation::Annotations;
use super::attribute::CmlAttribute;

/// A named relation from its owning type to a target type.
#[derive(Debug, Clone, PartialEq)]
pub struct CmlRelation {
    /// Relation name, unique within the owning type.
    pub name: String,
    /// Target type name.
    pub target_type: String,
    min: Option<u32>,
    max: Option<u32>,
    /// Related-component ids this relation was generated from.
    pub prc_ids: Vec<String>,
    /// Attributes declared on the relation.
    pub attributes: IndexMap<String, CmlAttribute>,
    /// Properties.
    pub annotations: Annotations,
}

impl CmlRelation {
    /// Creates a relation without cardinality.
    #[must_use]
    pub fn new(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
            min: None,
            max: None,
            prc_ids: Vec::new(),
            attributes: IndexMap::new(),
            annotations: Annotations::default(),
        }
    }

    /// Sets the minimum cardinality.
    pub fn set_min(&mut self, min: u32) {
        self.min = Some(min);
    }

    /// Sets the maximum cardinality; an unset minimum becomes 0.
    pub fn set_max(&mut self, max: u32) {
        self.max = Some(max);
        if self.min.is_none() {
            self.min = Some(0);
        }
    }

    /// Returns `(min, max)` when both are set.
    #[must_use]
    pub fn cardinality(&self) -> Option<(u32, u32)> {
        self.min.zip(self.max)
    }

    /// Returns `true` if this relation was generated from `prc_id`.
    #[must_use]
    pub fn has_prc_id(&self, prc_id: &str) -> bool {
        self.prc_ids.iter().any(|id| id == prc_id)
    }

    /// Renders the relation statement including its terminator.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("relation {} : {}", self.name, self.target_type);
        match self.cardinality() {
            Some((min, max)) if min == max => out.push_str(&format!("[{min}]")),
            Some((min, max)) => out.push_str(&format!("[{min}..{max}]")),
            None => {}
        }
        if self.attributes.is_empty() {
            out.push(';');
        } else {
            out.push_str(" {\n");
            for attribute in self.attributes.values() {
                out.push_str(&attribute.render());
                out.push_str(";\n");
            }
            out.push('}');
        }
        self.annotations.prefix(out)
    }
}
