//! Business-rule definitions driven by exported JSON records.
//!
//! # Architecture
//!
//! ```text
//! JSON records
//!   ↓ serde (DTO layer)
//! dto types
//!   ↓ validate + convert
//! Rule (pure domain model)
//!   ↓ sort_by_sequence()
//! Vec<Rule> ready for grouping
//! ```

pub mod dto;
pub mod loader;
pub mod model;

pub use loader::{load_definition, load_records, load_rule, LoadError, LoadedRules, RecordFailure};
pub use model::{
    sort_by_sequence, Action, ActionType, Condition, ConditionKind, Criterion, Operator, Rule,
    RuleScope, TargetInformation,
};
