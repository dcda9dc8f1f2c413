//! Element properties rendered as `@(key = value, ...)`.

use indexmap::IndexMap;
use std::fmt;

use super::emit::quote;

/// A single property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Rendered double-quoted.
    Text(String),
    /// Rendered bare.
    Integer(i64),
    /// Rendered bare.
    Number(f64),
    /// Rendered as `true` / `false`.
    Bool(bool),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(&quote(s)),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Ordered property set of a CML element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations(IndexMap<String, PropertyValue>);

impl Annotations {
    /// Sets a property, replacing any previous value but keeping its position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns a property value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    /// Returns `true` if no property is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the annotation line, or `None` when empty.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        let entries: Vec<String> = self.0.iter().map(|(k, v)| format!("{k} = {v}")).collect();
        Some(format!("@({})", entries.join(", ")))
    }

    /// Prepends the annotation line (if any) to a rendered element.
    #[must_use]
    pub(crate) fn prefix(&self, element: String) -> String {
        match self.render() {
            Some(line) => format!("{line}\n{element}"),
            None => element,
        }
    }
}
