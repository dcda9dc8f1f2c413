//! Associations between CML tags and catalog records.
//!
//! Associations serve two purposes: they let a later run reuse the types and
//! relations generated for a catalog record, and they are uploaded next to
//! the CML text.

use std::fmt;

use super::ModelError;

/// Header row of the associations table.
pub const CSV_HEADER: &str = "ExpressionSet.ApiName,ConstraintModelTag,ConstraintModelTagType,ReferenceObjectId,$Product2ReferenceId,$ProductClassificationName,$ProductRelatedComponentKey";

/// Kind of CML element an association tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// A type.
    Type,
    /// A relation.
    Port,
}

impl TagKind {
    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Type => "Type",
            Self::Port => "Port",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog object an association points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    /// A product.
    Product2,
    /// A product classification.
    ProductClassification,
    /// A bundle component relationship.
    ProductRelatedComponent,
}

impl ReferenceType {
    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product2 => "Product2",
            Self::ProductClassification => "ProductClassification",
            Self::ProductRelatedComponent => "ProductRelatedComponent",
        }
    }
}

/// A tag ↔ catalog record mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    /// Generated id.
    pub id: String,
    /// Type or relation name.
    pub tag: String,
    /// What the tag names.
    pub kind: TagKind,
    /// Catalog record id.
    pub reference_object_id: String,
    /// Catalog record kind.
    pub reference_type: ReferenceType,
    /// Human-readable reference key.
    pub reference_value: String,
}

impl Association {
    /// Creates an association with a fresh id.
    #[must_use]
    pub fn new(
        tag: impl Into<String>,
        kind: TagKind,
        reference_object_id: impl Into<String>,
        reference_type: ReferenceType,
        reference_value: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tag: tag.into(),
            kind,
            reference_object_id: reference_object_id.into(),
            reference_type,
            reference_value: reference_value.into(),
        }
    }

    /// Renders one table row for `api_name`.
    #[must_use]
    pub fn csv_row(&self, api_name: &str) -> String {
        let value = |column: ReferenceType| {
            if self.reference_type == column {
                self.reference_value.as_str()
            } else {
                ""
            }
        };
        [
            api_name,
            self.tag.as_str(),
            self.kind.as_str(),
            self.reference_object_id.as_str(),
            value(ReferenceType::Product2),
            value(ReferenceType::ProductClassification),
            value(ReferenceType::ProductRelatedComponent),
        ]
        .iter()
        .map(|field| csv_field(field))
        .collect::<Vec<_>>()
        .join(",")
    }
}

/// Renders a full associations table.
#[must_use]
pub fn render_csv<'a>(api_name: &str, associations: impl Iterator<Item = &'a Association>) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for association in associations {
        out.push_str(&association.csv_row(api_name));
        out.push('\n');
    }
    out
}

/// Reads an associations table back, e.g. the output of a previous run.
///
/// # Errors
///
/// Returns [`ModelError::InvalidAssociationType`] for an unknown tag type
/// or a row with no reference value, and [`ModelError::MalformedLedger`]
/// for a row with too few columns.
pub fn parse_csv(text: &str) -> Result<Vec<Association>, ModelError> {
    let mut out = Vec::new();

    for (index, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_csv_line(line);
        let [_, tag, kind, reference_id, product, classification, component] = fields.as_slice()
        else {
            return Err(ModelError::MalformedLedger {
                line: index + 1,
                reason: format!("expected 7 columns, found {}", fields.len()),
            });
        };

        let kind = match kind.as_str() {
            "Type" => TagKind::Type,
            "Port" => TagKind::Port,
            other => {
                return Err(ModelError::InvalidAssociationType {
                    value: other.to_string(),
                })
            }
        };
        let (reference_type, reference_value) = if !product.is_empty() {
            (ReferenceType::Product2, product)
        } else if !classification.is_empty() {
            (ReferenceType::ProductClassification, classification)
        } else if !component.is_empty() {
            (ReferenceType::ProductRelatedComponent, component)
        } else {
            return Err(ModelError::InvalidAssociationType {
                value: format!("no reference value on line {}", index + 1),
            });
        };

        out.push(Association::new(
            tag.clone(),
            kind,
            reference_id.clone(),
            reference_type,
            reference_value.clone(),
        ));
    }

    Ok(out)
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', _) => quoted = !quoted,
            (',', false) => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
