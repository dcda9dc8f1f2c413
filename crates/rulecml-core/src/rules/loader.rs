//! DTO → Domain model conversion with validation.

use tracing::{debug, warn};

use super::dto::{ActionDto, ConditionDto, CriterionDto, InformationDto, RuleDto, RuleRecordDto};
use super::model::{
    Action, ActionType, Condition, ConditionKind, Criterion, Operator, Rule, RuleScope,
    TargetInformation,
};

/// Errors during DTO → Domain conversion.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The input is not valid JSON for the expected shape.
    #[error("{context}: invalid JSON: {source}")]
    Json {
        /// What was being parsed.
        context: String,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// An enum-valued field holds an unknown string.
    #[error("{context}: unknown {field} `{value}`")]
    UnknownValue {
        /// Where the error occurred (e.g., "criteria[0].conditions[1]").
        context: String,
        /// Field kind (e.g., "operator").
        field: &'static str,
        /// The invalid value.
        value: String,
    },

    /// The rule has no API name.
    #[error("rule `{name}` has an empty apiName")]
    EmptyApiName {
        /// Display name of the rule.
        name: String,
    },
}

/// A rule record that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    /// Record API name (or display name when missing).
    pub api_name: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Result of loading a batch of rule records.
#[derive(Debug, Default)]
pub struct LoadedRules {
    /// Successfully loaded rules, in input order.
    pub rules: Vec<Rule>,
    /// Records that were skipped.
    pub failures: Vec<RecordFailure>,
}

/// Parses a JSON array of rule records.
///
/// A malformed record is skipped with a warning; only a malformed outer
/// array is an error.
///
/// # Errors
///
/// Returns [`LoadError::Json`] if the outer document is not a record array.
pub fn load_records(json: &str) -> Result<LoadedRules, LoadError> {
    let records: Vec<RuleRecordDto> =
        serde_json::from_str(json).map_err(|e| LoadError::Json {
            context: "rule records".to_string(),
            source: e,
        })?;

    let mut loaded = LoadedRules::default();
    for record in records {
        let label = if record.api_name.is_empty() {
            record.name.clone()
        } else {
            record.api_name.clone()
        };
        match load_definition(&record.configuration_rule_definition, &label) {
            Ok(rule) => loaded.rules.push(rule),
            Err(e) => {
                warn!("Failed to parse rule definition for {}: {}", label, e);
                loaded.failures.push(RecordFailure {
                    api_name: label,
                    reason: e.to_string(),
                });
            }
        }
    }

    debug!(
        "Loaded {} rule(s), skipped {}",
        loaded.rules.len(),
        loaded.failures.len()
    );
    Ok(loaded)
}

/// Parses and validates one embedded rule definition.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or any enum value is unknown.
pub fn load_definition(json: &str, label: &str) -> Result<Rule, LoadError> {
    let dto: RuleDto = serde_json::from_str(json).map_err(|e| LoadError::Json {
        context: label.to_string(),
        source: e,
    })?;
    load_rule(dto)
}

/// Converts a `RuleDto` to a validated `Rule`.
///
/// # Errors
///
/// Returns the first error encountered during conversion.
pub fn load_rule(dto: RuleDto) -> Result<Rule, LoadError> {
    if dto.api_name.is_empty() {
        return Err(LoadError::EmptyApiName { name: dto.name });
    }
    let ctx = dto.api_name.clone();

    let scope = RuleScope::parse(&dto.scope).ok_or_else(|| LoadError::UnknownValue {
        context: ctx.clone(),
        field: "scope",
        value: dto.scope.clone(),
    })?;

    let criteria = dto
        .criteria
        .iter()
        .enumerate()
        .map(|(i, c)| convert_criterion(c, &format!("{ctx}.criteria[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    let actions = dto
        .actions
        .iter()
        .enumerate()
        .map(|(i, a)| convert_action(a, &format!("{ctx}.actions[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Rule {
        api_name: dto.api_name,
        name: dto.name,
        sequence: dto.sequence.unwrap_or(0),
        scope,
        criteria,
        actions,
    })
}

fn convert_criterion(dto: &CriterionDto, ctx: &str) -> Result<Criterion, LoadError> {
    let source_operator = dto
        .source_operator
        .as_deref()
        .map(|op| parse_operator(op, &format!("{ctx}.sourceOperator")))
        .transpose()?;

    let conditions = dto
        .conditions
        .iter()
        .enumerate()
        .map(|(j, c)| convert_condition(c, &format!("{ctx}.conditions[{j}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Criterion {
        root_object_id: dto.root_object_id.clone().filter(|id| !id.is_empty()),
        source_values: dto.source_values.clone(),
        source_operator,
        source_information: dto.source_information.iter().map(convert_information).collect(),
        criteria_index: dto.criteria_index,
        conditions,
    })
}

fn convert_action(dto: &ActionDto, ctx: &str) -> Result<Action, LoadError> {
    let action_type =
        ActionType::parse(&dto.action_type).ok_or_else(|| LoadError::UnknownValue {
            context: ctx.to_string(),
            field: "action type",
            value: dto.action_type.clone(),
        })?;

    let action_parameters = dto
        .action_parameters
        .iter()
        .enumerate()
        .map(|(j, c)| convert_condition(c, &format!("{ctx}.actionParameters[{j}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Action {
        action_type,
        target_values: dto.target_values.clone(),
        target_information: dto.target_information.iter().map(convert_information).collect(),
        target_context_tag_name: dto.target_context_tag_name.clone(),
        action_parameters,
        message: dto.message.clone().filter(|m| !m.is_empty()),
        message_type: dto.message_type.clone().filter(|m| !m.is_empty()),
        sequence: dto.sequence.unwrap_or(0),
        behavior_type_lock: dto.behavior_type_lock.unwrap_or(false),
    })
}

fn convert_condition(dto: &ConditionDto, ctx: &str) -> Result<Condition, LoadError> {
    let kind = ConditionKind::parse(&dto.kind).ok_or_else(|| LoadError::UnknownValue {
        context: ctx.to_string(),
        field: "condition type",
        value: dto.kind.clone(),
    })?;
    let operator = parse_operator(&dto.operator, ctx)?;

    Ok(Condition {
        kind,
        attribute_id: dto.attribute_id.clone(),
        attribute_name: dto.attribute_name.clone(),
        context_tag_name: dto.context_tag_name.clone(),
        data_type: dto.data_type.clone(),
        operator,
        values: dto.values.clone(),
    })
}

fn convert_information(dto: &InformationDto) -> TargetInformation {
    TargetInformation {
        name: dto.name.clone(),
        values: dto
            .values
            .as_ref()
            .map(|v| v.values.iter().flatten().cloned().collect())
            .unwrap_or_default(),
    }
}

fn parse_operator(value: &str, ctx: &str) -> Result<Operator, LoadError> {
    Operator::parse(value).ok_or_else(|| LoadError::UnknownValue {
        context: ctx.to_string(),
        field: "operator",
        value: value.to_string(),
    })
}
