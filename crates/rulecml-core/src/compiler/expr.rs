//! Comparison operators rendered as CML expressions.

use super::CompileError;
use crate::cml::emit::quote;
use crate::rules::Operator;

/// Renders `left <operator> values`.
///
/// `quoted` selects string literals for `Equals` / `NotEquals`; substring and
/// membership operands are always quoted. `LessThan` renders `<=` like
/// `LessThanOrEquals`.
///
/// # Errors
///
/// Returns [`CompileError::MissingOperand`] if a binary operator has no value.
pub fn comparison(
    left: &str,
    operator: Operator,
    values: &[String],
    quoted: bool,
) -> Result<String, CompileError> {
    let operand = || {
        values
            .first()
            .map(String::as_str)
            .ok_or_else(|| CompileError::MissingOperand {
                left: left.to_string(),
                operator,
            })
    };
    let literal = |value: &str| {
        if quoted {
            quote(value)
        } else {
            value.to_string()
        }
    };
    let list = || {
        let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
        format!("[{}]", items.join(", "))
    };

    let expression = match operator {
        Operator::Equals => format!("{left} == {}", literal(operand()?)),
        Operator::NotEquals => format!("{left} != {}", literal(operand()?)),
        Operator::LessThan | Operator::LessThanOrEquals => format!("{left} <= {}", operand()?),
        Operator::GreaterThan => format!("{left} > {}", operand()?),
        Operator::GreaterThanOrEquals => format!("{left} >= {}", operand()?),
        Operator::IsNotNull => format!("{left} != null"),
        Operator::IsNull => format!("{left} == null"),
        Operator::Contains => format!("strcontain({left}, {})", quote(operand()?)),
        Operator::DoesNotContain => format!("!strcontain({left}, {})", quote(operand()?)),
        Operator::In => format!("{left} in {}", list()),
        Operator::NotIn => format!("!({left} in {})", list()),
    };
    Ok(expression)
}
