//! Pure domain model for business rules.
//!
//! This module contains no serde and no I/O dependencies. Every enum-valued
//! field is a closed enumeration; unknown strings are rejected by the loader.

use std::fmt;

// ────────────────────────────────────────────
// Enumerations
// ────────────────────────────────────────────

/// Where a rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleScope {
    /// Evaluated against a single product.
    Product,
    /// Evaluated inside a bundle.
    Bundle,
    /// Evaluated against the whole transaction.
    Transaction,
}

impl RuleScope {
    /// Parses the wire representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Product" => Some(Self::Product),
            "Bundle" => Some(Self::Bundle),
            "Transaction" => Some(Self::Transaction),
            _ => None,
        }
    }

    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::Bundle => "Bundle",
            Self::Transaction => "Transaction",
        }
    }
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a condition tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    /// A product attribute.
    Attribute,
    /// A context tag on the line item or transaction.
    Tag,
    /// An enumerated value; carried but not translated.
    Enum,
}

impl ConditionKind {
    /// Parses the wire representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Attribute" => Some(Self::Attribute),
            "Tag" => Some(Self::Tag),
            "Enum" => Some(Self::Enum),
            _ => None,
        }
    }
}

/// Comparison operator used in conditions and source checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `==`
    Equals,
    /// `!=`
    NotEquals,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEquals,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEquals,
    /// Value is present.
    IsNotNull,
    /// Value is absent.
    IsNull,
    /// Substring match.
    Contains,
    /// Negated substring match.
    DoesNotContain,
    /// Membership in a literal list.
    In,
    /// Negated membership.
    NotIn,
}

impl Operator {
    /// Parses the wire representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let op = match value {
            "Equals" => Self::Equals,
            "NotEquals" => Self::NotEquals,
            "LessThan" => Self::LessThan,
            "LessThanOrEquals" => Self::LessThanOrEquals,
            "GreaterThan" => Self::GreaterThan,
            "GreaterThanOrEquals" => Self::GreaterThanOrEquals,
            "IsNotNull" => Self::IsNotNull,
            "IsNull" => Self::IsNull,
            "Contains" => Self::Contains,
            "DoesNotContain" => Self::DoesNotContain,
            "In" => Self::In,
            "NotIn" => Self::NotIn,
            _ => return None,
        };
        Some(op)
    }
}

/// The fourteen action variants a rule may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    /// Add the target product automatically.
    AutoAdd,
    /// Remove the target product automatically.
    AutoRemove,
    /// Assign an attribute value.
    SetAttribute,
    /// Assign a quantity.
    SetQuantity,
    /// Pick a default product.
    SetDefaultProduct,
    /// Pick a default attribute value.
    SetDefaultAttributeValue,
    /// Hide an attribute.
    HideAttribute,
    /// Hide some values of an attribute.
    HideAttributeValue,
    /// Disable some values of an attribute.
    DisableAttributeValue,
    /// Hide a product.
    HideProduct,
    /// Disable a product.
    DisableProduct,
    /// Another product is required.
    Requires,
    /// Another product is excluded.
    Excludes,
    /// Validation message.
    Validate,
}

impl ActionType {
    /// Parses the wire representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let kind = match value {
            "AutoAdd" => Self::AutoAdd,
            "AutoRemove" => Self::AutoRemove,
            "SetAttribute" => Self::SetAttribute,
            "SetQuantity" => Self::SetQuantity,
            "SetDefaultProduct" => Self::SetDefaultProduct,
            "SetDefaultAttributeValue" => Self::SetDefaultAttributeValue,
            "HideAttribute" => Self::HideAttribute,
            "HideAttributeValue" => Self::HideAttributeValue,
            "DisableAttributeValue" => Self::DisableAttributeValue,
            "HideProduct" => Self::HideProduct,
            "DisableProduct" => Self::DisableProduct,
            "Requires" => Self::Requires,
            "Excludes" => Self::Excludes,
            "Validate" => Self::Validate,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AutoAdd => "AutoAdd",
            Self::AutoRemove => "AutoRemove",
            Self::SetAttribute => "SetAttribute",
            Self::SetQuantity => "SetQuantity",
            Self::SetDefaultProduct => "SetDefaultProduct",
            Self::SetDefaultAttributeValue => "SetDefaultAttributeValue",
            Self::HideAttribute => "HideAttribute",
            Self::HideAttributeValue => "HideAttributeValue",
            Self::DisableAttributeValue => "DisableAttributeValue",
            Self::HideProduct => "HideProduct",
            Self::DisableProduct => "DisableProduct",
            Self::Requires => "Requires",
            Self::Excludes => "Excludes",
            Self::Validate => "Validate",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────
// Rule parts
// ────────────────────────────────────────────

/// Named id list attached to criteria sources and action targets.
///
/// Entries named `Product` carry catalog product ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInformation {
    /// Information name (e.g. `Product`).
    pub name: String,
    /// Referenced ids.
    pub values: Vec<String>,
}

impl TargetInformation {
    /// Returns `true` if this entry lists products.
    #[must_use]
    pub fn is_product(&self) -> bool {
        self.name == "Product"
    }
}

/// A single test inside a criterion, or a parameter of an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// What is tested.
    pub kind: ConditionKind,
    /// Catalog attribute id.
    pub attribute_id: Option<String>,
    /// Attribute name.
    pub attribute_name: Option<String>,
    /// Tag name for [`ConditionKind::Tag`].
    pub context_tag_name: Option<String>,
    /// Source data type (e.g. `Text`, `Number`).
    pub data_type: Option<String>,
    /// Comparison operator.
    pub operator: Operator,
    /// Literal operand values.
    pub values: Vec<String>,
}

/// The "when" part of a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    /// Product the criterion is evaluated on.
    pub root_object_id: Option<String>,
    /// Source products whose presence is tested.
    pub source_values: Vec<String>,
    /// Operator applied to the source products.
    pub source_operator: Option<Operator>,
    /// Named source id lists.
    pub source_information: Vec<TargetInformation>,
    /// Declared position, used to name the generated constraint.
    pub criteria_index: Option<u32>,
    /// Conditions joined with `&&`.
    pub conditions: Vec<Condition>,
}

/// The "then" part of a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Action variant.
    pub action_type: ActionType,
    /// Raw target ids (e.g. a related-component id).
    pub target_values: Vec<String>,
    /// Named target id lists.
    pub target_information: Vec<TargetInformation>,
    /// Tag describing what `target_values` refer to.
    pub target_context_tag_name: Option<String>,
    /// Parameters converted like conditions.
    pub action_parameters: Vec<Condition>,
    /// Free-text message.
    pub message: Option<String>,
    /// Message severity (e.g. `Info`, `Error`).
    pub message_type: Option<String>,
    /// Position within the rule.
    pub sequence: i64,
    /// Lock the target against user edits.
    pub behavior_type_lock: bool,
}

impl Action {
    /// Returns the first product id listed in the target information.
    #[must_use]
    pub fn target_product_id(&self) -> Option<&str> {
        self.target_information
            .iter()
            .find(|info| info.is_product())
            .and_then(|info| info.values.first())
            .map(String::as_str)
    }
}

/// A validated business rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Unique API name.
    pub api_name: String,
    /// Display name.
    pub name: String,
    /// Ordering key; rules are processed in ascending order.
    pub sequence: i64,
    /// Evaluation scope.
    pub scope: RuleScope,
    /// Criteria joined with `&&`.
    pub criteria: Vec<Criterion>,
    /// Actions applied when the criteria hold.
    pub actions: Vec<Action>,
}

/// Sorts rules by ascending sequence, keeping input order for ties.
pub fn sort_by_sequence(rules: &mut [Rule]) {
    rules.sort_by_key(|r| r.sequence);
}
