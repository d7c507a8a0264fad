//! Operator signature checks
//!
//! Every function call in the program is checked against the operator catalog, including
//! calls nested in arguments and in assignment values. Checking never stops early: an
//! unknown operator still has its arguments visited.

use std::collections::HashSet;

use crate::catalog::{closest_match, AllowedValues, FieldSet, NamedArgSpec, OperatorCatalog};
use crate::diagnostics::{ErrorKind, ErrorReporting, SourceContext, ValidationError};
use crate::syntax::{NamedArg, Program, Span, SyntaxNode, UnaryOp};

use super::kinds::{is_compatible, KindEnv};

/// Checks every call in `program` against `catalog`.
///
/// `fields` is the field set of the active combination key, when there is one; it is only
/// used to infer argument kinds.
pub fn validate_operators(
    program: &Program,
    catalog: &OperatorCatalog,
    fields: Option<&FieldSet>,
    source: &SourceContext,
) -> Vec<ValidationError> {
    let mut validator = OperatorValidator {
        catalog,
        source,
        env: KindEnv::new(catalog, fields),
        errors: Vec::new(),
    };
    for clause in &program.clauses {
        validator.validate_clause(clause);
    }
    validator.errors
}

struct OperatorValidator<'a> {
    catalog: &'a OperatorCatalog,
    source: &'a SourceContext,
    env: KindEnv<'a>,
    errors: Vec<ValidationError>,
}

/// A literal named-argument value, for membership tests against an enumerated set.
enum LiteralValue<'n> {
    Number(f64),
    Text(&'n str),
    Bool(bool),
}

impl LiteralValue<'_> {
    fn of(node: &SyntaxNode) -> Option<LiteralValue<'_>> {
        match node {
            SyntaxNode::Number(n, _) => Some(LiteralValue::Number(*n)),
            SyntaxNode::String(s, _) | SyntaxNode::Identifier(s, _) => Some(LiteralValue::Text(s)),
            SyntaxNode::Boolean(b, _) => Some(LiteralValue::Bool(*b)),
            SyntaxNode::Unary {
                op: UnaryOp::Neg,
                operand,
                ..
            } => match operand.as_ref() {
                SyntaxNode::Number(n, _) => Some(LiteralValue::Number(-n)),
                _ => None,
            },
            _ => None,
        }
    }

    fn rendered(&self, node: &SyntaxNode) -> String {
        match (self, node) {
            (LiteralValue::Text(s), SyntaxNode::String(..)) => format!("\"{}\"", s),
            _ => node.pretty(),
        }
    }
}

impl OperatorValidator<'_> {
    fn validate_clause(&mut self, clause: &SyntaxNode) {
        self.validate_node(clause);
        if let SyntaxNode::Assignment { target, value, .. } = clause {
            if let Some(name) = target.as_identifier() {
                let kind = self.env.infer(value);
                self.env.bind(name, kind);
            }
        }
    }

    fn validate_node(&mut self, node: &SyntaxNode) {
        match node {
            SyntaxNode::FunctionCall {
                name,
                name_span,
                args,
                named_args,
                span,
            } => {
                self.validate_call(name, *name_span, args, named_args, *span);
                for arg in args {
                    self.validate_node(arg);
                }
                for named in named_args {
                    self.validate_node(&named.value);
                }
            }
            SyntaxNode::Binary { lhs, rhs, .. } => {
                self.validate_node(lhs);
                self.validate_node(rhs);
            }
            SyntaxNode::Unary { operand, .. } => self.validate_node(operand),
            SyntaxNode::Assignment { target, value, .. } => {
                self.validate_node(target);
                self.validate_node(value);
            }
            SyntaxNode::Identifier(..)
            | SyntaxNode::Number(..)
            | SyntaxNode::String(..)
            | SyntaxNode::Boolean(..) => {}
        }
    }

    fn validate_call(
        &mut self,
        name: &str,
        name_span: Span,
        args: &[SyntaxNode],
        named_args: &[NamedArg],
        span: Span,
    ) {
        let catalog = self.catalog;
        let Some(spec) = catalog.get(name) else {
            let error = self
                .source
                .report(
                    ErrorKind::UnknownOperator,
                    format!("unknown operator `{}`", name),
                    name_span,
                )
                .with_optional_help(
                    catalog
                        .suggest(name)
                        .map(|s| format!("did you mean `{}`?", s)),
                );
            self.errors.push(error);
            return;
        };

        if !spec.accepts_arity(args.len()) {
            let bounds = spec.arity_description();
            let error = self
                .source
                .report(
                    ErrorKind::Arity,
                    format!(
                        "`{}` called with {} positional argument{}",
                        name,
                        args.len(),
                        if args.len() == 1 { "" } else { "s" }
                    ),
                    span,
                )
                .with_help(format!(
                    "`{}` expects {} positional argument{}",
                    name,
                    bounds,
                    if bounds.ends_with(" 1") { "" } else { "s" }
                ));
            self.errors.push(error);
        }

        for (index, arg) in args.iter().enumerate() {
            let Some(expected) = spec.expected_kind(index) else {
                continue;
            };
            let actual = self.env.infer(arg);
            if !is_compatible(expected, actual) {
                let what = format!("argument {} of `{}`", index + 1, name);
                let error = self.source.type_mismatch(
                    &what,
                    expected.as_str(),
                    actual.as_str(),
                    arg.span(),
                );
                self.errors.push(error);
            }
        }

        let mut seen = HashSet::new();
        for named in named_args {
            if !seen.insert(named.name.as_str()) {
                let error = self.source.report(
                    ErrorKind::NamedArgument,
                    format!("named argument `{}` is given more than once", named.name),
                    named.name_span,
                );
                self.errors.push(error);
                continue;
            }

            match spec.named_arg(&named.name) {
                Some(arg_spec) => self.validate_named_value(name, arg_spec, named),
                None => {
                    let help = match closest_match(
                        &named.name,
                        spec.named_args.iter().map(|arg| arg.name.as_str()),
                    ) {
                        Some(similar) => format!("did you mean `{}`?", similar),
                        None if spec.named_args.is_empty() => {
                            format!("`{}` takes no named arguments", name)
                        }
                        None => {
                            let names: Vec<&str> =
                                spec.named_args.iter().map(|arg| arg.name.as_str()).collect();
                            format!("supported named arguments: {}", names.join(", "))
                        }
                    };
                    let error = self
                        .source
                        .report(
                            ErrorKind::NamedArgument,
                            format!("`{}` has no named argument `{}`", name, named.name),
                            named.name_span,
                        )
                        .with_help(help);
                    self.errors.push(error);
                }
            }
        }
    }

    fn validate_named_value(&mut self, operator: &str, spec: &NamedArgSpec, named: &NamedArg) {
        let value = &named.value;
        match &spec.allowed {
            AllowedValues::OneOf(values) => {
                let Some(literal) = LiteralValue::of(value) else {
                    let what = format!("value of `{}` in `{}`", named.name, operator);
                    let error = self
                        .source
                        .type_mismatch(&what, "a literal", value.type_name(), value.span())
                        .with_help(format!("use {}", spec.allowed.describe()));
                    self.errors.push(error);
                    return;
                };
                let accepted = values.iter().any(|allowed| match &literal {
                    LiteralValue::Number(n) => allowed.matches_number(*n),
                    LiteralValue::Text(text) => allowed.matches_text(text),
                    LiteralValue::Bool(b) => allowed.matches_text(&b.to_string()),
                });
                if !accepted {
                    let error = self
                        .source
                        .report(
                            ErrorKind::NamedArgument,
                            format!(
                                "invalid value {} for `{}` in `{}`",
                                literal.rendered(value),
                                named.name,
                                operator
                            ),
                            value.span(),
                        )
                        .with_help(format!("`{}` must be {}", named.name, spec.allowed.describe()));
                    self.errors.push(error);
                }
            }
            AllowedValues::Any => {
                let actual = self.env.infer_named_value(value);
                if !is_compatible(spec.kind, actual) {
                    let what = format!("value of `{}` in `{}`", named.name, operator);
                    let error =
                        self.source
                            .type_mismatch(&what, spec.kind.as_str(), actual.as_str(), value.span());
                    self.errors.push(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AllowedValue, ArgKind, MaxArgs, OperatorSpec};
    use crate::syntax::{normalize, parse};

    fn catalog() -> OperatorCatalog {
        OperatorCatalog::from_specs([
            OperatorSpec::new("ts_mean", 2, MaxArgs::Bounded(2))
                .with_arg_kinds([ArgKind::Field, ArgKind::Number]),
            OperatorSpec::new("rank", 1, MaxArgs::Bounded(1)),
            OperatorSpec::new("ts_delay", 2, MaxArgs::Bounded(2)),
            OperatorSpec::new("quantile", 1, MaxArgs::Bounded(1))
                .with_named_arg(NamedArgSpec::one_of(
                    "driver",
                    ["gaussian", "cauchy", "uniform"].map(|s| AllowedValue::Str(s.into())),
                ))
                .with_named_arg(NamedArgSpec::any("sigma").with_kind(ArgKind::Number)),
        ])
        .unwrap()
    }

    fn check(text: &str) -> Vec<ValidationError> {
        let source = SourceContext::expression(text);
        let (normalized, _) = normalize(text);
        let program = parse(&normalized, &source).unwrap();
        let fields: FieldSet = ["close", "volume"].into_iter().collect();
        validate_operators(&program, &catalog(), Some(&fields), &source)
    }

    #[test]
    fn valid_calls_pass() {
        assert!(check("ts_mean(close, 20)").is_empty());
        assert!(check("quantile(rank(close), driver=\"cauchy\", sigma=0.5)").is_empty());
        assert!(check("quantile(close, driver=gaussian)").is_empty());
    }

    #[test]
    fn unknown_operator_still_visits_arguments() {
        let errors = check("ts_mena(rank(close, 1), 20)");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, ErrorKind::UnknownOperator);
        assert_eq!(errors[0].help.as_deref(), Some("did you mean `ts_mean`?"));
        assert_eq!(errors[1].kind, ErrorKind::Arity);
        assert_eq!(errors[1].column, Some(9));
    }

    #[test]
    fn arity_error_carries_bounds() {
        let errors = check("ts_delay(close)");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Arity);
        assert_eq!(errors[0].help.as_deref(), Some("`ts_delay` expects exactly 2 positional arguments"));
    }

    #[test]
    fn field_kind_rejects_expressions() {
        let errors = check("ts_mean(rank(close), 20)");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::TypeMismatch);
        assert_eq!(errors[0].column, Some(9));
    }

    #[test]
    fn local_bindings_carry_their_kind() {
        assert!(check("x = close\nts_mean(x, 20)").is_empty());
        let errors = check("x = close * 2\nts_mean(x, 20)");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn enumerated_value_outside_set() {
        let errors = check("quantile(close, driver=\"bogus\")");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::NamedArgument);
        assert!(errors[0].message.contains("\"bogus\""));
        assert!(errors[0].help.as_ref().unwrap().contains("\"gaussian\""));
    }

    #[test]
    fn non_literal_enumerated_value_is_type_mismatch() {
        let errors = check("quantile(close, driver=rank(close))");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn unknown_and_duplicate_named_arguments() {
        let errors = check("quantile(close, sigm=1, sigma=1, sigma=2)");
        let kinds: Vec<_> = errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, [ErrorKind::NamedArgument, ErrorKind::NamedArgument]);
        assert_eq!(errors[0].help.as_deref(), Some("did you mean `sigma`?"));
        assert!(errors[1].message.contains("more than once"));
    }

    #[test]
    fn named_value_kind_is_checked() {
        let errors = check("quantile(close, sigma=\"wide\")");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::TypeMismatch);
        assert_eq!(errors[0].message, "value of `sigma` in `quantile` should be number, found string");
    }
}
