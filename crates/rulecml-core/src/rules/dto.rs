//! JSON deserialization types (DTO layer).
//!
//! These types exist solely for serde deserialization.
//! They are converted to domain model types via the loader.

use serde::Deserialize;

/// One exported rule record.
///
/// The rule definition itself is embedded as a JSON string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleRecordDto {
    /// Record API name.
    #[serde(default)]
    pub api_name: String,
    /// Record display name.
    #[serde(default)]
    pub name: String,
    /// Embedded JSON rule definition.
    #[serde(default)]
    pub configuration_rule_definition: String,
}

/// A rule definition as stored in the record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDto {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Unique API name.
    pub api_name: String,
    /// Ordering key (default: 0).
    #[serde(default)]
    pub sequence: Option<i64>,
    /// Scope string (`Product`, `Bundle` or `Transaction`).
    pub scope: String,
    /// Criteria list.
    #[serde(default)]
    pub criteria: Vec<CriterionDto>,
    /// Action list.
    #[serde(default)]
    pub actions: Vec<ActionDto>,
}

/// Wrapper around a nullable value list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceValuesDto {
    /// Values; nulls are dropped by the loader.
    #[serde(default)]
    pub values: Vec<Option<String>>,
}

/// A named id list.
#[derive(Debug, Clone, Deserialize)]
pub struct InformationDto {
    /// Information kind (unused).
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Information name (e.g. `Product`).
    #[serde(default)]
    pub name: String,
    /// Values.
    #[serde(default)]
    pub values: Option<ResourceValuesDto>,
}

/// A condition or action parameter.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionDto {
    /// Condition kind string.
    #[serde(rename = "type")]
    pub kind: String,
    /// Tag name for tag conditions.
    #[serde(default)]
    pub context_tag_name: Option<String>,
    /// Source data type.
    #[serde(default)]
    pub data_type: Option<String>,
    /// Operand values.
    #[serde(default)]
    pub values: Vec<String>,
    /// Attribute id.
    #[serde(default)]
    pub attribute_id: Option<String>,
    /// Attribute name.
    #[serde(default)]
    pub attribute_name: Option<String>,
    /// Declared index (unused).
    #[serde(default)]
    pub condition_index: Option<u32>,
    /// Operator string.
    pub operator: String,
}

/// A rule criterion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionDto {
    /// Product the criterion is evaluated on.
    #[serde(default)]
    pub root_object_id: Option<String>,
    /// Source operator string.
    #[serde(default)]
    pub source_operator: Option<String>,
    /// Source product ids.
    #[serde(default)]
    pub source_values: Vec<String>,
    /// Named source id lists.
    #[serde(default)]
    pub source_information: Vec<InformationDto>,
    /// Declared index.
    #[serde(default)]
    pub criteria_index: Option<u32>,
    /// Conditions.
    #[serde(default)]
    pub conditions: Vec<ConditionDto>,
}

/// A rule action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDto {
    /// Action name (unused).
    #[serde(default)]
    pub name: Option<String>,
    /// Free-text message.
    #[serde(default)]
    pub message: Option<String>,
    /// Action type string.
    pub action_type: String,
    /// Lock flag.
    #[serde(default)]
    pub behavior_type_lock: Option<bool>,
    /// Message severity.
    #[serde(default)]
    pub message_type: Option<String>,
    /// Position within the rule (default: 0).
    #[serde(default)]
    pub sequence: Option<i64>,
    /// Raw target ids.
    #[serde(default)]
    pub target_values: Vec<String>,
    /// Named target id lists.
    #[serde(default)]
    pub target_information: Vec<InformationDto>,
    /// Tag describing the target values.
    #[serde(default)]
    pub target_context_tag_name: Option<String>,
    /// Parameters.
    #[serde(default)]
    pub action_parameters: Vec<ConditionDto>,
}
