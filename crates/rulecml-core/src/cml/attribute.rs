//! CML attributes, primitive types and value domains.

use std::fmt;

use super::annotation::Annotations;
use super::emit::quote;

/// Scale used for decimal and double attributes.
pub const DECIMAL_SCALE: u8 = 2;

/// Primitive CML attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmlDataType {
    /// `boolean`
    Boolean,
    /// `date`
    Date,
    /// `decimal`
    Decimal,
    /// `double`
    Double,
    /// `int`
    Int,
    /// `string`
    String,
}

impl CmlDataType {
    /// Maps a catalog or rule data type name (case-insensitive).
    ///
    /// Returns `None` for types with no CML counterpart; such attributes are
    /// emitted untyped.
    #[must_use]
    pub fn from_source(data_type: &str) -> Option<Self> {
        let kind = match data_type.to_ascii_uppercase().as_str() {
            "CHECKBOX" | "BOOLEAN" => Self::Boolean,
            "DATE" => Self::Date,
            "NUMBER" | "CURRENCY" | "PERCENT" => Self::Decimal,
            "DOUBLE" => Self::Double,
            "INTEGER" => Self::Int,
            "TEXT" | "STRING" | "PICKLIST" | "MULTIPICKLIST" => Self::String,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns the CML keyword.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Decimal => "decimal",
            Self::Double => "double",
            Self::Int => "int",
            Self::String => "string",
        }
    }

    /// Returns `true` if attributes of this type carry a scale.
    #[must_use]
    pub fn is_scaled(self) -> bool {
        matches!(self, Self::Decimal | Self::Double)
    }
}

impl fmt::Display for CmlDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed numeric range `min..max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

/// Allowed values of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    /// Quoted text values.
    Strings(Vec<String>),
    /// Numeric values.
    Numbers(Vec<f64>),
    /// Boolean values.
    Booleans(Vec<bool>),
    /// Dates as `YYYY-MM-DD`.
    Dates(Vec<String>),
    /// Numeric ranges.
    Intervals(Vec<Interval>),
}

impl Domain {
    /// Builds a domain from picklist values using the picklist's declared type.
    ///
    /// Numeric picklists with a non-numeric entry fall back to strings, as do
    /// unrecognized types.
    #[must_use]
    pub fn from_picklist(data_type: Option<&str>, values: &[String]) -> Self {
        let kind = data_type.map(str::to_ascii_uppercase).unwrap_or_default();
        match kind.as_str() {
            "NUMBER" | "CURRENCY" | "PERCENT" => values
                .iter()
                .map(|v| v.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_or_else(|_| Self::Strings(values.to_vec()), Self::Numbers),
            "DATE" | "DATETIME" => Self::Dates(
                values
                    .iter()
                    .map(|v| v.split('T').next().unwrap_or(v).to_string())
                    .collect(),
            ),
            "BOOLEAN" | "CHECKBOX" => Self::Booleans(values.iter().map(|v| v == "true").collect()),
            _ => Self::Strings(values.to_vec()),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = match self {
            Self::Strings(values) | Self::Dates(values) => values.iter().map(|v| quote(v)).collect(),
            Self::Numbers(values) => values.iter().map(ToString::to_string).collect(),
            Self::Booleans(values) => values.iter().map(ToString::to_string).collect(),
            Self::Intervals(values) => values
                .iter()
                .map(|i| format!("{}..{}", i.min, i.max))
                .collect(),
        };
        write!(f, "[{}]", items.join(", "))
    }
}

/// Right-hand side of an attribute declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Enumerated or ranged domain.
    Domain(Domain),
    /// Computed expression, rendered verbatim (e.g. `parent(x)`).
    Expression(String),
}

/// A CML attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct CmlAttribute {
    /// Catalog attribute id.
    pub attribute_id: Option<String>,
    /// Attribute name.
    pub name: String,
    /// Primitive type; untyped when `None`.
    pub data_type: Option<CmlDataType>,
    /// Decimal scale.
    pub scale: Option<u8>,
    /// Domain or expression.
    pub value: Option<AttributeValue>,
    /// Properties.
    pub annotations: Annotations,
}

impl CmlAttribute {
    /// Creates an attribute; decimal and double types get the fixed scale.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: Option<CmlDataType>) -> Self {
        Self {
            attribute_id: None,
            name: name.into(),
            data_type,
            scale: data_type
                .filter(|t| t.is_scaled())
                .map(|_| DECIMAL_SCALE),
            value: None,
            annotations: Annotations::default(),
        }
    }

    /// Sets the catalog attribute id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.attribute_id = Some(id.into());
        self
    }

    /// Sets the domain.
    #[must_use]
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.value = Some(AttributeValue::Domain(domain));
        self
    }

    /// Sets a computed expression.
    #[must_use]
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.value = Some(AttributeValue::Expression(expression.into()));
        self
    }

    /// Returns `true` if values of this attribute are quoted in expressions.
    #[must_use]
    pub fn is_string(&self) -> bool {
        self.data_type == Some(CmlDataType::String)
    }

    /// Renders the declaration without the trailing `;`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(data_type) = self.data_type {
            out.push_str(data_type.as_str());
            if let Some(scale) = self.scale {
                out.push_str(&format!("({scale})"));
            }
            out.push(' ');
        }
        out.push_str(&self.name);
        match &self.value {
            Some(AttributeValue::Domain(domain)) => out.push_str(&format!(" = {domain}")),
            Some(AttributeValue::Expression(expr)) => out.push_str(&format!(" = {expr}")),
            None => {}
        }
        self.annotations.prefix(out)
    }
}
