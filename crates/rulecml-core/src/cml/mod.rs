//! In-memory CML model and its text emitter.
//!
//! ```text
//! CmlModel
//!   ├─ CmlType (name, parent, annotations)
//!   │    ├─ CmlAttribute (type, scale, domain)
//!   │    ├─ CmlRelation (target, cardinality, prc ids)
//!   │    └─ CmlConstraint (constraint/require/exclude/message/rule)
//!   └─ Association (tag ↔ catalog record)
//! ```

pub mod annotation;
pub mod association;
pub mod attribute;
pub mod cml_type;
pub mod constraint;
pub mod emit;
pub mod model;
pub mod naming;
pub mod relation;

pub use annotation::{Annotations, PropertyValue};
pub use association::{parse_csv as parse_associations_csv, Association, ReferenceType, TagKind};
pub use attribute::{AttributeValue, CmlAttribute, CmlDataType, Domain, Interval};
pub use cml_type::{CmlType, VIRTUAL_PROPERTY};
pub use constraint::{BehaviorRule, CmlConstraint, ConstraintBody, Requirement};
pub use model::CmlModel;
pub use relation::CmlRelation;

/// Violations of model invariants.
///
/// These signal a generator defect rather than bad input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A type was created without a name.
    #[error("type name must not be empty")]
    MissingTypeName,

    /// A type name is already registered.
    #[error("type `{name}` already exists")]
    DuplicateType {
        /// The duplicate name.
        name: String,
    },

    /// A referenced type does not exist.
    #[error("type `{name}` does not exist")]
    UnknownType {
        /// The missing name.
        name: String,
    },

    /// A relation name is already used within its type.
    #[error("relation `{relation}` already exists on type `{type_name}`")]
    DuplicateRelation {
        /// Owning type.
        type_name: String,
        /// The duplicate relation name.
        relation: String,
    },

    /// An association id is already registered.
    #[error("association `{id}` already exists")]
    DuplicateAssociation {
        /// The duplicate id.
        id: String,
    },

    /// An association row names an unknown tag or reference type.
    #[error("invalid association type: {value}")]
    InvalidAssociationType {
        /// The offending value.
        value: String,
    },

    /// An associations table row cannot be read.
    #[error("malformed associations table at line {line}: {reason}")]
    MalformedLedger {
        /// 1-based line number.
        line: usize,
        /// What is wrong.
        reason: String,
    },

    /// A display name has no identifier characters left after sanitizing.
    #[error("cannot derive an identifier from `{name}`")]
    InvalidName {
        /// The display name.
        name: String,
    },
}
