//! Clause structure and assignment rules
//!
//! Every clause but the last must be an assignment and the last must not be. Assignment
//! targets must be well-formed identifiers that do not shadow an operator or a field.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::{FieldSet, OperatorCatalog};
use crate::diagnostics::{ErrorKind, ErrorReporting, SourceContext, ValidationError};
use crate::syntax::{Program, Span, SyntaxNode};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Checks clause ordering and assignment targets.
///
/// `fields` is the field set of the active combination key; without one, only operator
/// shadowing is checked.
pub fn validate_structure(
    program: &Program,
    operators: &OperatorCatalog,
    fields: Option<&FieldSet>,
    source: &SourceContext,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let last = program.clauses.len().saturating_sub(1);

    for (index, clause) in program.clauses.iter().enumerate() {
        match clause {
            SyntaxNode::Assignment { target, .. } => {
                if index == last {
                    errors.push(
                        source
                            .report(
                                ErrorKind::AssignmentStructure,
                                "the final clause must be an expression, not an assignment"
                                    .to_string(),
                                clause.span(),
                            )
                            .with_help(match target.as_identifier() {
                                Some(name) => format!("add a final line that uses `{}`", name),
                                None => "end the expression with the value to return".to_string(),
                            }),
                    );
                }
                errors.extend(check_target(target, operators, fields, source));
            }
            other if index != last => errors.push(
                source
                    .report(
                        ErrorKind::AssignmentStructure,
                        format!(
                            "clause {} is an expression; only the final clause may be one",
                            index + 1
                        ),
                        other.span(),
                    )
                    .with_help("assign it to a name, or remove it"),
            ),
            _ => {}
        }
    }

    errors
}

fn check_target(
    target: &SyntaxNode,
    operators: &OperatorCatalog,
    fields: Option<&FieldSet>,
    source: &SourceContext,
) -> Vec<ValidationError> {
    let span = target.span();
    let Some(name) = target.as_identifier() else {
        return vec![source.report(
            ErrorKind::AssignmentStructure,
            format!(
                "assignment target must be a plain identifier, found {} `{}`",
                target.type_name(),
                target.pretty()
            ),
            span,
        )];
    };

    // Format and shadowing are independent; a badly formed field name still shadows.
    let mut errors: Vec<ValidationError> =
        check_identifier_format(name, span, source).into_iter().collect();

    let shadowed = if operators.contains(name) {
        Some("operator")
    } else if fields.map_or(false, |fields| fields.contains(name)) {
        Some("data field")
    } else {
        None
    };
    if let Some(what) = shadowed {
        errors.push(
            source
                .report(
                    ErrorKind::Shadowing,
                    format!("`{}` shadows the {} of the same name", name, what),
                    span,
                )
                .with_help("choose a different variable name"),
        );
    }

    errors
}

fn check_identifier_format(
    name: &str,
    span: Span,
    source: &SourceContext,
) -> Option<ValidationError> {
    let problem = if name.starts_with(|c: char| c.is_ascii_digit()) {
        "must not start with a digit"
    } else if name.contains("__") {
        "must not contain consecutive underscores"
    } else if !IDENTIFIER.is_match(name) {
        "may only contain ASCII letters, digits and underscores"
    } else {
        return None;
    };

    Some(source.report(
        ErrorKind::IdentifierFormat,
        format!("variable name `{}` {}", name, problem),
        span,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MaxArgs, OperatorSpec};
    use crate::syntax::{normalize, parse};

    fn check(text: &str) -> Vec<ValidationError> {
        let source = SourceContext::expression(text);
        let (normalized, _) = normalize(text);
        let program = parse(&normalized, &source).unwrap();
        let operators =
            OperatorCatalog::from_specs([OperatorSpec::new("rank", 1, MaxArgs::Bounded(1))])
                .unwrap();
        let fields: FieldSet = ["close", "volume", "fnd6__cash"].into_iter().collect();
        validate_structure(&program, &operators, Some(&fields), &source)
    }

    fn kinds(errors: &[ValidationError]) -> Vec<ErrorKind> {
        errors.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn well_formed_program_passes() {
        assert!(check("alpha = rank(close)\nbeta = alpha * 2\nbeta").is_empty());
        assert!(check("rank(close)").is_empty());
    }

    #[test]
    fn intermediate_expression_clause() {
        let errors = check("rank(close)\nx = 1\nx");
        assert_eq!(kinds(&errors), [ErrorKind::AssignmentStructure]);
        assert_eq!(errors[0].line, Some(1));
    }

    #[test]
    fn final_assignment_and_call_target() {
        let errors = check("rank(close) = 5");
        assert_eq!(
            kinds(&errors),
            [ErrorKind::AssignmentStructure, ErrorKind::AssignmentStructure]
        );
        assert!(errors[1].message.contains("plain identifier"));
    }

    #[test]
    fn malformed_targets() {
        let errors = check("1price = close\nprice__data = close\n1price");
        assert_eq!(
            kinds(&errors),
            [ErrorKind::IdentifierFormat, ErrorKind::IdentifierFormat]
        );
        assert!(errors[0].message.contains("digit"));
        assert!(errors[1].message.contains("consecutive underscores"));
    }

    #[test]
    fn shadowing_operator_or_field() {
        let errors = check("rank = 1\nclose = 2\nvolume2 = 3\nrank");
        assert_eq!(kinds(&errors), [ErrorKind::Shadowing, ErrorKind::Shadowing]);
        assert!(errors[0].message.contains("operator"));
        assert!(errors[1].message.contains("data field"));
    }

    #[test]
    fn malformed_field_name_still_shadows() {
        let errors = check("fnd6__cash = rank(close)\nfnd6__cash");
        assert_eq!(
            kinds(&errors),
            [ErrorKind::IdentifierFormat, ErrorKind::Shadowing]
        );
        assert!(errors[1].message.contains("data field"));
    }
}
