//! CML constraint statements.

use super::annotation::Annotations;
use super::emit::quote;

/// Target of a `require` / `exclude` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Relation navigated from the owning type.
    pub relation: String,
    /// Concrete type required on the relation.
    pub target_type: String,
    /// Required quantity; rendered when not 1.
    pub quantity: u32,
}

/// A behavior rule: `rule(decl, "Action", "scope", "target", ...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorRule {
    /// Behavior (e.g. `Hide`, `Disable`).
    pub action: String,
    /// Target kind (`attribute` or `relation`).
    pub scope: String,
    /// Target name.
    pub target: String,
    /// Qualifier before the values (`value` or `type`).
    pub qualifier: Option<String>,
    /// Values; one renders bare-quoted, several as a list.
    pub values: Vec<String>,
}

/// The statement kinds a type may hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintBody {
    /// `constraint [name =] (decl[, expl]);`
    Constraint {
        /// Optional name, reusable as a boolean guard.
        name: Option<String>,
        /// Boolean declaration.
        declaration: String,
        /// Optional explanation.
        explanation: Option<String>,
    },
    /// `preference [name =] (decl[, expl]);`
    Preference {
        /// Optional name.
        name: Option<String>,
        /// Boolean declaration.
        declaration: String,
        /// Optional explanation.
        explanation: Option<String>,
    },
    /// `require(decl, rel[Type][ == n][, expl]);`
    Require {
        /// Guard.
        declaration: String,
        /// What is required.
        requirement: Requirement,
        /// Optional explanation.
        explanation: Option<String>,
    },
    /// `exclude(decl, rel[Type][ == n][, expl]);`
    Exclude {
        /// Guard.
        declaration: String,
        /// What is excluded.
        requirement: Requirement,
        /// Optional explanation.
        explanation: Option<String>,
    },
    /// `message(decl, "text"[, "severity"]);`
    Message {
        /// Guard.
        declaration: String,
        /// Message text.
        explanation: String,
        /// Severity (e.g. `Info`, `error`).
        severity: Option<String>,
    },
    /// `rule(decl, "action", "scope", "target"[, "qualifier"][, values]);`
    Rule {
        /// Guard.
        declaration: String,
        /// Behavior.
        rule: BehaviorRule,
    },
}

/// A constraint statement with its properties and emission position.
#[derive(Debug, Clone, PartialEq)]
pub struct CmlConstraint {
    body: ConstraintBody,
    /// Properties.
    pub annotations: Annotations,
    sequence: usize,
}

impl CmlConstraint {
    /// Wraps a statement body.
    #[must_use]
    pub fn new(body: ConstraintBody) -> Self {
        Self {
            body,
            annotations: Annotations::default(),
            sequence: 0,
        }
    }

    /// Named boolean constraint.
    #[must_use]
    pub fn named(name: impl Into<String>, declaration: impl Into<String>) -> Self {
        Self::new(ConstraintBody::Constraint {
            name: Some(name.into()),
            declaration: declaration.into(),
            explanation: None,
        })
    }

    /// Unnamed boolean constraint.
    #[must_use]
    pub fn unnamed(declaration: impl Into<String>) -> Self {
        Self::new(ConstraintBody::Constraint {
            name: None,
            declaration: declaration.into(),
            explanation: None,
        })
    }

    /// Message statement.
    #[must_use]
    pub fn message(
        declaration: impl Into<String>,
        explanation: impl Into<String>,
        severity: Option<String>,
    ) -> Self {
        Self::new(ConstraintBody::Message {
            declaration: declaration.into(),
            explanation: explanation.into(),
            severity,
        })
    }

    /// Behavior rule statement.
    #[must_use]
    pub fn rule(declaration: impl Into<String>, rule: BehaviorRule) -> Self {
        Self::new(ConstraintBody::Rule {
            declaration: declaration.into(),
            rule,
        })
    }

    /// Sets the `sequence` property.
    #[must_use]
    pub fn with_sequence_hint(mut self, sequence: i64) -> Self {
        self.annotations.set("sequence", sequence);
        self
    }

    /// Returns the statement body.
    #[must_use]
    pub fn body(&self) -> &ConstraintBody {
        &self.body
    }

    /// Emission position within the owning type.
    #[must_use]
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    pub(crate) fn set_sequence(&mut self, sequence: usize) {
        self.sequence = sequence;
    }

    /// Returns the constraint name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.body {
            ConstraintBody::Constraint { name, .. } | ConstraintBody::Preference { name, .. } => {
                name.as_deref()
            }
            _ => None,
        }
    }

    /// Returns the guard declaration.
    #[must_use]
    pub fn declaration(&self) -> &str {
        match &self.body {
            ConstraintBody::Constraint { declaration, .. }
            | ConstraintBody::Preference { declaration, .. }
            | ConstraintBody::Require { declaration, .. }
            | ConstraintBody::Exclude { declaration, .. }
            | ConstraintBody::Message { declaration, .. }
            | ConstraintBody::Rule { declaration, .. } => declaration,
        }
    }

    fn kind(&self) -> &'static str {
        match &self.body {
            ConstraintBody::Constraint { .. } => "constraint",
            ConstraintBody::Preference { .. } => "preference",
            ConstraintBody::Require { .. } => "require",
            ConstraintBody::Exclude { .. } => "exclude",
            ConstraintBody::Message { .. } => "message",
            ConstraintBody::Rule { .. } => "rule",
        }
    }

    /// Explanation part of the equivalence key.
    fn explanation(&self) -> Option<String> {
        match &self.body {
            ConstraintBody::Constraint { explanation, .. }
            | ConstraintBody::Preference { explanation, .. } => explanation.clone(),
            ConstraintBody::Require {
                requirement,
                explanation,
                ..
            }
            | ConstraintBody::Exclude {
                requirement,
                explanation,
                ..
            } => Some(format!(
                "{}[{}] == {} {}",
                requirement.relation,
                requirement.target_type,
                requirement.quantity,
                explanation.as_deref().unwrap_or_default()
            )),
            ConstraintBody::Message { explanation, .. } => Some(explanation.clone()),
            ConstraintBody::Rule { rule, .. } => Some(format!(
                "{} {} {} {:?} {:?}",
                rule.action, rule.scope, rule.target, rule.qualifier, rule.values
            )),
        }
    }

    /// Returns `true` if both constraints have the same kind, name,
    /// declaration and explanation.
    ///
    /// The explanation of `require`, `exclude` and `rule` statements covers
    /// their target arguments, so two rules hiding different attributes are
    /// distinct.
    #[must_use]
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.kind() == other.kind()
            && self.name() == other.name()
            && self.declaration() == other.declaration()
            && self.explanation() == other.explanation()
    }

    /// Renders the statement with its annotation line.
    #[must_use]
    pub fn render(&self) -> String {
        self.annotations.prefix(self.render_statement())
    }

    fn render_statement(&self) -> String {
        match &self.body {
            ConstraintBody::Constraint {
                name,
                declaration,
                explanation,
            } => render_boolean("constraint", name.as_deref(), declaration, explanation.as_deref()),
            ConstraintBody::Preference {
                name,
                declaration,
                explanation,
            } => render_boolean("preference", name.as_deref(), declaration, explanation.as_deref()),
            ConstraintBody::Require {
                declaration,
                requirement,
                explanation,
            } => render_requirement("require", declaration, requirement, explanation.as_deref()),
            ConstraintBody::Exclude {
                declaration,
                requirement,
                explanation,
            } => render_requirement("exclude", declaration, requirement, explanation.as_deref()),
            ConstraintBody::Message {
                declaration,
                explanation,
                severity,
            } => {
                let mut out = format!("message({declaration}, {}", quote(explanation));
                if let Some(severity) = severity {
                    out.push_str(&format!(", {}", quote(severity)));
                }
                out.push_str(");");
                out
            }
            ConstraintBody::Rule { declaration, rule } => {
                let mut out = format!(
                    "rule({declaration}, {}, {}, {}",
                    quote(&rule.action),
                    quote(&rule.scope),
                    quote(&rule.target)
                );
                if let Some(qualifier) = &rule.qualifier {
                    out.push_str(&format!(", {}", quote(qualifier)));
                }
                match rule.values.as_slice() {
                    [] => {}
                    [single] => out.push_str(&format!(", {}", quote(single))),
                    many => {
                        let items: Vec<String> = many.iter().map(|v| quote(v)).collect();
                        out.push_str(&format!(", [{}]", items.join(", ")));
                    }
                }
                out.push_str(");");
                out
            }
        }
    }
}

fn render_boolean(
    keyword: &str,
    name: Option<&str>,
    declaration: &str,
    explanation: Option<&str>,
) -> String {
    let mut out = match name {
        Some(name) => format!("{keyword} {name} = ({declaration}"),
        None => format!("{keyword}({declaration}"),
    };
    if let Some(explanation) = explanation {
        out.push_str(&format!(", {}", quote(explanation)));
    }
    out.push_str(");");
    out
}

fn render_requirement(
    keyword: &str,
    declaration: &str,
    requirement: &Requirement,
    explanation: Option<&str>,
) -> String {
    let mut out = format!(
        "{keyword}({declaration}, {}[{}]",
        requirement.relation, requirement.target_type
    );
    if requirement.quantity != 1 {
        out.push_str(&format!(" == {}", requirement.quantity));
    }
    if let Some(explanation) = explanation {
        out.push_str(&format!(", {}", quote(explanation)));
    }
    out.push_str(");");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hide(target: &str) -> CmlConstraint {
        CmlConstraint::rule(
            "guard",
            BehaviorRule {
                action: "Hide".to_string(),
                scope: "attribute".to_string(),
                target: target.to_string(),
                qualifier: None,
                values: vec![],
            },
        )
    }

    // -- Rendering --

    #[test]
    fn named_constraint() {
        let c = CmlConstraint::named(
            "lpb_gk_criteria_1",
            "(laptop[Laptop] > 0) && laptop[Laptop].Memory == \"RAM 64GB\"",
        );
        insta::assert_snapshot!(c.render(), @r#"constraint lpb_gk_criteria_1 = ((laptop[Laptop] > 0) && laptop[Laptop].Memory == "RAM 64GB");"#);
    }

    #[test]
    fn unnamed_constraint() {
        let c = CmlConstraint::unnamed("(g) == g_value");
        assert_eq!(c.render(), "constraint((g) == g_value);");
    }

    #[test]
    fn message_escapes_quotes() {
        let c = CmlConstraint::message(
            "desktopp_criteria_1",
            "SetAttribute: 2k screen selected. and 27\"",
            Some("Info".to_string()),
        );
        assert_eq!(
            c.render(),
            r#"message(desktopp_criteria_1, "SetAttribute: 2k screen selected. and 27\"", "Info");"#
        );
    }

    #[test]
    fn require_with_quantity_and_sequence() {
        let c = CmlConstraint::new(ConstraintBody::Require {
            declaration: "r_criteria_0".to_string(),
            requirement: Requirement {
                relation: "mouse".to_string(),
                target_type: "Mouse".to_string(),
                quantity: 2,
            },
            explanation: None,
        })
        .with_sequence_hint(11);
        assert_eq!(
            c.render(),
            "@(sequence = 11)\nrequire(r_criteria_0, mouse[Mouse] == 2);"
        );
    }

    #[test]
    fn rule_with_single_and_multiple_values() {
        let single = CmlConstraint::rule(
            "g",
            BehaviorRule {
                action: "Hide".to_string(),
                scope: "attribute".to_string(),
                target: "Printer".to_string(),
                qualifier: Some("value".to_string()),
                values: vec!["Laser".to_string()],
            },
        );
        assert_eq!(
            single.render(),
            r#"rule(g, "Hide", "attribute", "Printer", "value", "Laser");"#
        );

        let many = CmlConstraint::rule(
            "g",
            BehaviorRule {
                action: "Disable".to_string(),
                scope: "attribute".to_string(),
                target: "Windows_Processor".to_string(),
                qualifier: Some("value".to_string()),
                values: vec![
                    "i7-CPU 4.7GHz".to_string(),
                    "Intel Core i9 5.2 GHz".to_string(),
                ],
            },
        );
        assert_eq!(
            many.render(),
            r#"rule(g, "Disable", "attribute", "Windows_Processor", "value", ["i7-CPU 4.7GHz", "Intel Core i9 5.2 GHz"]);"#
        );
    }

    // -- Equivalence --

    #[test]
    fn identical_statements_are_equivalent() {
        let a = CmlConstraint::named("n", "x > 0");
        let b = CmlConstraint::named("n", "x > 0").with_sequence_hint(5);
        assert!(a.is_equivalent(&b));
    }

    #[test]
    fn different_rule_targets_are_distinct() {
        assert!(!hide("Graphics").is_equivalent(&hide("Printer")));
        assert!(hide("Graphics").is_equivalent(&hide("Graphics")));
    }

    #[test]
    fn kind_distinguishes_statements() {
        let constraint = CmlConstraint::unnamed("x");
        let message = CmlConstraint::message("x", "text", None);
        assert!(!constraint.is_equivalent(&message));
    }
}
