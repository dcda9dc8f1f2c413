//! The CML model: a registry of types and associations.

use indexmap::IndexMap;
use tracing::debug;

use super::association::{render_csv, Association, TagKind};
use super::cml_type::CmlType;
use super::emit::format_indentation;
use super::ModelError;
use crate::grouping::ids_refer;

/// Types keyed by name in emission order, plus associations keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CmlModel {
    types: IndexMap<String, CmlType>,
    associations: IndexMap<String, Association>,
}

impl CmlModel {
    /// Creates an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a model holding only the empty base type.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_type` is empty.
    pub fn with_base_type(base_type: &str) -> Result<Self, ModelError> {
        let mut model = Self::new();
        model.add_type(CmlType::new(base_type)?)?;
        Ok(model)
    }

    // ── Types ──

    /// Registers a type.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingTypeName`] for an empty name and
    /// [`ModelError::DuplicateType`] if the name is taken.
    pub fn add_type(&mut self, cml_type: CmlType) -> Result<(), ModelError> {
        if cml_type.name().is_empty() {
            return Err(ModelError::MissingTypeName);
        }
        if self.types.contains_key(cml_type.name()) {
            return Err(ModelError::DuplicateType {
                name: cml_type.name().to_string(),
            });
        }
        self.types.insert(cml_type.name().to_string(), cml_type);
        Ok(())
    }

    /// Removes a type.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownType`] if no such type exists.
    pub fn delete_type(&mut self, name: &str) -> Result<CmlType, ModelError> {
        debug!("Deleting type {}", name);
        self.types
            .shift_remove(name)
            .ok_or_else(|| ModelError::UnknownType {
                name: name.to_string(),
            })
    }

    /// Returns a type by name.
    #[must_use]
    pub fn get_type(&self, name: &str) -> Option<&CmlType> {
        self.types.get(name)
    }

    /// Returns a mutable type by name.
    pub fn get_type_mut(&mut self, name: &str) -> Option<&mut CmlType> {
        self.types.get_mut(name)
    }

    /// Returns a mutable type by name or a model error.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownType`] if no such type exists.
    pub fn expect_type_mut(&mut self, name: &str) -> Result<&mut CmlType, ModelError> {
        self.types
            .get_mut(name)
            .ok_or_else(|| ModelError::UnknownType {
                name: name.to_string(),
            })
    }

    /// Returns the first type generated from `catalog_id` (product or
    /// classification id, prefix-matched).
    #[must_use]
    pub fn type_by_catalog_id(&self, catalog_id: &str) -> Option<&CmlType> {
        self.types.values().find(|t| t.refers_to(catalog_id))
    }

    /// Returns `true` if a type with this name exists.
    #[must_use]
    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Returns all types in emission order.
    pub fn types(&self) -> impl Iterator<Item = &CmlType> {
        self.types.values()
    }

    // ── Associations ──

    /// Registers an association.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateAssociation`] if the id is taken.
    pub fn add_association(&mut self, association: Association) -> Result<(), ModelError> {
        if self.associations.contains_key(&association.id) {
            return Err(ModelError::DuplicateAssociation {
                id: association.id,
            });
        }
        self.associations
            .insert(association.id.clone(), association);
        Ok(())
    }

    /// Returns the association of `kind` for a catalog record.
    #[must_use]
    pub fn find_association(&self, kind: TagKind, reference_id: &str) -> Option<&Association> {
        self.associations
            .values()
            .find(|a| a.kind == kind && ids_refer(&a.reference_object_id, reference_id))
    }

    /// Returns all associations in registration order.
    pub fn associations(&self) -> impl Iterator<Item = &Association> {
        self.associations.values()
    }

    // ── Emission ──

    /// Renders the model as tab-indented CML text.
    #[must_use]
    pub fn render(&self) -> String {
        let blocks: Vec<String> = self.types.values().map(CmlType::render).collect();
        format_indentation(&blocks.join("\n"))
    }

    /// Renders the associations table.
    #[must_use]
    pub fn associations_csv(&self, api_name: &str) -> String {
        render_csv(api_name, self.associations.values())
    }
}
