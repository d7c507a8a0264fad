//! Field resolution
//!
//! Every free identifier must name either a local bound by an earlier assignment clause or
//! a field available under the active combination key. Bindings are not hoisted: a name
//! is visible only to clauses after the one that assigns it.

use crate::catalog::{closest_match, CombinationKey, FieldCatalog, FieldSet};
use crate::diagnostics::{ErrorKind, ErrorReporting, SourceContext, ValidationError};
use crate::syntax::{Program, SyntaxNode};

/// Resolves every identifier reference in `program`.
///
/// A missing or unknown combination key yields a single configuration error and no
/// per-identifier diagnostics.
pub fn resolve_fields(
    program: &Program,
    catalog: &FieldCatalog,
    key: Option<&CombinationKey>,
    source: &SourceContext,
) -> Vec<ValidationError> {
    let Some(key) = key else {
        return vec![ValidationError::unpositioned(
            ErrorKind::Configuration,
            "no market configuration given; region, delay and universe are required",
        )
        .with_help(available_help(catalog))];
    };

    let Some(fields) = catalog.get(key) else {
        return vec![ValidationError::unpositioned(
            ErrorKind::Configuration,
            format!("unknown market configuration `{}`", key),
        )
        .with_help(available_help(catalog))];
    };

    let mut resolver = FieldResolver {
        fields,
        key,
        declared: program.assigned_names(),
        source,
        clause: 0,
        errors: Vec::new(),
    };
    for (index, clause) in program.clauses.iter().enumerate() {
        resolver.clause = index;
        match clause {
            // The target is a binding, not a reference.
            SyntaxNode::Assignment { value, .. } => resolver.visit(value),
            other => resolver.visit(other),
        }
    }
    resolver.errors
}

fn available_help(catalog: &FieldCatalog) -> String {
    if catalog.is_empty() {
        "no field catalog is loaded".to_string()
    } else {
        format!("available combinations: {}", catalog.describe_available())
    }
}

struct FieldResolver<'a> {
    fields: &'a FieldSet,
    key: &'a CombinationKey,
    declared: Vec<(&'a str, usize)>,
    source: &'a SourceContext,
    clause: usize,
    errors: Vec<ValidationError>,
}

impl FieldResolver<'_> {
    fn visit(&mut self, node: &SyntaxNode) {
        match node {
            SyntaxNode::Identifier(name, span) => {
                if let Some((message, help)) = self.resolve(name) {
                    let error = self
                        .source
                        .report(ErrorKind::UnknownField, message, *span)
                        .with_optional_help(help);
                    self.errors.push(error);
                }
            }
            SyntaxNode::FunctionCall {
                args, named_args, ..
            } => {
                for arg in args {
                    self.visit(arg);
                }
                for named in named_args {
                    // Bare names are symbolic constants here.
                    if !matches!(named.value, SyntaxNode::Identifier(..)) {
                        self.visit(&named.value);
                    }
                }
            }
            SyntaxNode::Binary { lhs, rhs, .. } => {
                self.visit(lhs);
                self.visit(rhs);
            }
            SyntaxNode::Unary { operand, .. } => self.visit(operand),
            SyntaxNode::Assignment { value, .. } => self.visit(value),
            SyntaxNode::Number(..) | SyntaxNode::String(..) | SyntaxNode::Boolean(..) => {}
        }
    }

    /// `None` when `name` resolves, otherwise the message and an optional suggestion.
    fn resolve(&self, name: &str) -> Option<(String, Option<String>)> {
        let bound_at = self
            .declared
            .iter()
            .filter(|(declared, _)| *declared == name)
            .map(|(_, index)| *index);
        let mut later = None;
        for index in bound_at {
            if index < self.clause {
                return None;
            }
            later.get_or_insert(index);
        }
        if self.fields.contains(name) {
            return None;
        }

        if let Some(index) = later {
            if index == self.clause {
                return Some((
                    format!("`{}` is used in its own assignment", name),
                    Some(format!("assign `{}` from existing values first", name)),
                ));
            }
            return Some((
                format!(
                    "`{}` is used before it is assigned (assigned later, in clause {})",
                    name,
                    index + 1
                ),
                Some(format!("move the assignment of `{}` above this clause", name)),
            ));
        }

        let visible_locals = self
            .declared
            .iter()
            .filter(|(_, index)| *index < self.clause)
            .map(|(declared, _)| *declared);
        let suggestion = closest_match(name, self.fields.names().chain(visible_locals))
            .map(|similar| format!("did you mean `{}`?", similar));
        Some((
            format!("unknown field `{}` for {}", name, self.key),
            suggestion,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{normalize, parse};

    fn catalog() -> FieldCatalog {
        FieldCatalog::new().with_set(
            CombinationKey::new("USA", "1", "TOP3000"),
            ["close", "volume", "returns"].into_iter().collect(),
        )
    }

    fn resolve(text: &str, key: Option<&CombinationKey>) -> Vec<ValidationError> {
        let source = SourceContext::expression(text);
        let (normalized, _) = normalize(text);
        let program = parse(&normalized, &source).unwrap();
        resolve_fields(&program, &catalog(), key, &source)
    }

    fn usa() -> CombinationKey {
        CombinationKey::new("USA", "1", "TOP3000")
    }

    #[test]
    fn known_fields_and_earlier_locals_resolve() {
        assert!(resolve("ts_mean(close, 20)", Some(&usa())).is_empty());
        assert!(resolve("x = close\ny = x * volume\nrank(y)", Some(&usa())).is_empty());
    }

    #[test]
    fn misspelled_field_is_reported_at_its_position() {
        let errors = resolve("ts_mean(cloze, 20)", Some(&usa()));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::UnknownField);
        assert_eq!((errors[0].line, errors[0].column), (Some(1), Some(9)));
        assert_eq!(errors[0].help.as_deref(), Some("did you mean `close`?"));
    }

    #[test]
    fn use_before_assignment_is_reported() {
        let errors = resolve("y = x\nx = close\ny", Some(&usa()));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("assigned later"));
        assert_eq!(errors[0].line, Some(1));
    }

    #[test]
    fn self_reference_names_its_own_assignment() {
        let errors = resolve("x = x + 1\nx", Some(&usa()));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::UnknownField);
        assert_eq!(errors[0].message, "`x` is used in its own assignment");
        assert_eq!((errors[0].line, errors[0].column), (Some(1), Some(5)));
    }

    #[test]
    fn named_symbol_values_are_not_fields() {
        assert!(resolve("quantile(close, driver=gaussian)", Some(&usa())).is_empty());
    }

    #[test]
    fn unknown_key_is_one_configuration_error() {
        let key = CombinationKey::new("USA", "2", "TOP3000");
        let errors = resolve("rank(cloze) + foo", Some(&key));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Configuration);
        assert_eq!(errors[0].line, None);
        assert_eq!(errors[0].help.as_deref(), Some("available combinations: USA: 1/TOP3000"));

        let errors = resolve("rank(close)", None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Configuration);
    }
}
