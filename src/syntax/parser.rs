//! Expression parser
//!
//! Converts normalized expression text into a [`Program`] with source location tracking.
//! This parser is purely syntactic: operator names and identifiers are not looked up here.
//! The first structural problem stops parsing and is returned as a single syntax error.

use pest::{
    error::{Error, ErrorVariant, InputLocation},
    iterators::{Pair, Pairs},
    Parser,
};
use pest_derive::Parser;

use crate::diagnostics::{ErrorReporting, SourceContext, ValidationError};
use crate::syntax::{
    BinaryOp, NamedArg, NormalizedExpression, Program, Span, SyntaxNode, UnaryOp,
};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct ExpressionParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse normalized expression text into a program of clauses.
pub fn parse(
    normalized: &NormalizedExpression,
    source: &SourceContext,
) -> Result<Program, ValidationError> {
    let text = normalized.text.as_str();
    if normalized.is_blank() {
        return Err(source
            .syntax("expression is empty", Span::point(0))
            .with_help("write at least one expression; comments alone are not an alpha"));
    }

    check_delimiters(text, source)?;

    let mut pairs = ExpressionParser::parse(Rule::program, text)
        .map_err(|e| convert_parse_error(e, text, source))?;
    let program = expect_child(&mut pairs, Span::new(0, text.len()), "program", source)?;

    let clauses = program
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(|p| build_clause(p, source))
        .collect::<Result<Vec<_>, _>>()?;

    let span = match (clauses.first(), clauses.last()) {
        (Some(first), Some(last)) => first.span().join(last.span()),
        _ => Span::point(0),
    };
    tracing::trace!(clauses = clauses.len(), "parsed expression");
    Ok(Program { clauses, span })
}

// ============================================================================
// AST BUILDERS
// ============================================================================

fn build_clause(pair: Pair<Rule>, source: &SourceContext) -> Result<SyntaxNode, ValidationError> {
    if pair.as_rule() != Rule::assignment {
        return build_expr(pair, source);
    }

    let span = get_span(&pair);
    let mut inner = pair.into_inner();
    let target = build_expr(expect_child(&mut inner, span, "assignment target", source)?, source)?;
    let value = build_expr(expect_child(&mut inner, span, "assigned value", source)?, source)?;
    Ok(SyntaxNode::Assignment {
        target: Box::new(target),
        value: Box::new(value),
        span,
    })
}

fn build_expr(pair: Pair<Rule>, source: &SourceContext) -> Result<SyntaxNode, ValidationError> {
    let span = get_span(&pair);

    match pair.as_rule() {
        Rule::or_expr | Rule::and_expr | Rule::cmp_expr | Rule::add_expr | Rule::mul_expr => {
            build_infix(pair, source)
        }

        Rule::unary => build_unary(pair, source),

        Rule::call => build_call(pair, source),

        Rule::number => {
            let text = pair.as_str();
            let value = text
                .parse::<f64>()
                .map_err(|_| source.syntax(format!("invalid number literal `{}`", text), span))?;
            Ok(SyntaxNode::Number(value, span))
        }

        Rule::boolean => Ok(SyntaxNode::Boolean(
            matches!(pair.as_str(), "true" | "True"),
            span,
        )),

        Rule::string => Ok(SyntaxNode::String(unescape_string(pair.as_str()), span)),

        Rule::identifier => Ok(SyntaxNode::Identifier(pair.as_str().to_string(), span)),

        rule => Err(source.syntax(format!("unsupported construct: {:?}", rule), span)),
    }
}

/// Folds `operand (op operand)*` into a left-associative chain of binary nodes.
fn build_infix(pair: Pair<Rule>, source: &SourceContext) -> Result<SyntaxNode, ValidationError> {
    let span = get_span(&pair);
    let mut inner = pair.into_inner();
    let mut lhs = build_expr(expect_child(&mut inner, span, "operand", source)?, source)?;

    while let Some(op_pair) = inner.next() {
        let op_span = get_span(&op_pair);
        let op = BinaryOp::from_symbol(op_pair.as_str()).ok_or_else(|| {
            source.syntax(format!("unknown operator `{}`", op_pair.as_str()), op_span)
        })?;
        let rhs = build_expr(expect_child(&mut inner, op_span, "right operand", source)?, source)?;
        let span = lhs.span().join(rhs.span());
        lhs = SyntaxNode::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            span,
        };
    }

    Ok(lhs)
}

fn build_unary(pair: Pair<Rule>, source: &SourceContext) -> Result<SyntaxNode, ValidationError> {
    let mut ops = Vec::new();
    let mut operand = None;

    for child in pair.into_inner() {
        if child.as_rule() == Rule::unary_op {
            let op = if child.as_str() == "!" {
                UnaryOp::Not
            } else {
                UnaryOp::Neg
            };
            ops.push((op, get_span(&child)));
        } else {
            operand = Some(build_expr(child, source)?);
        }
    }

    let operand = match operand {
        Some(node) => node,
        None => {
            let at = ops.last().map(|(_, span)| *span).unwrap_or_default();
            return Err(source.syntax("operator is missing its operand", at));
        }
    };

    // Innermost operator applies first.
    Ok(ops.into_iter().rev().fold(operand, |node, (op, op_span)| {
        let span = op_span.join(node.span());
        SyntaxNode::Unary {
            op,
            operand: Box::new(node),
            span,
        }
    }))
}

fn build_call(pair: Pair<Rule>, source: &SourceContext) -> Result<SyntaxNode, ValidationError> {
    let span = get_span(&pair);
    let mut inner = pair.into_inner();
    let name_pair = expect_child(&mut inner, span, "function name", source)?;
    let name_span = get_span(&name_pair);
    let name = name_pair.as_str().to_string();

    let mut args = Vec::new();
    let mut named_args = Vec::new();
    for child in inner {
        if child.as_rule() == Rule::named_arg {
            named_args.push(build_named_arg(child, source)?);
        } else {
            args.push(build_expr(child, source)?);
        }
    }

    Ok(SyntaxNode::FunctionCall {
        name,
        name_span,
        args,
        named_args,
        span,
    })
}

fn build_named_arg(pair: Pair<Rule>, source: &SourceContext) -> Result<NamedArg, ValidationError> {
    let span = get_span(&pair);
    let mut inner = pair.into_inner();
    let name_pair = expect_child(&mut inner, span, "argument name", source)?;
    let value = build_expr(expect_child(&mut inner, span, "argument value", source)?, source)?;
    Ok(NamedArg {
        name: name_pair.as_str().to_string(),
        name_span: get_span(&name_pair),
        value,
    })
}

// ============================================================================
// UTILITIES
// ============================================================================

fn get_span(pair: &Pair<Rule>) -> Span {
    Span {
        start: pair.as_span().start(),
        end: pair.as_span().end(),
    }
}

/// Next child of a pair whose presence the grammar guarantees.
fn expect_child<'i>(
    pairs: &mut Pairs<'i, Rule>,
    parent: Span,
    element: &str,
    source: &SourceContext,
) -> Result<Pair<'i, Rule>, ValidationError> {
    pairs
        .next()
        .ok_or_else(|| source.syntax(format!("missing {}", element), parent))
}

fn unescape_string(text: &str) -> String {
    // Remove surrounding quotes
    let inner = &text[1..text.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }

    result
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Deepest parenthesis nesting accepted. Parsing and validation recurse once per level.
pub const MAX_NESTING: usize = 32;

/// Reports unbalanced or overly deep parentheses before the grammar runs, since pest would
/// only report the point where it gave up.
fn check_delimiters(text: &str, source: &SourceContext) -> Result<(), ValidationError> {
    let mut open = Vec::new();
    let mut quote: Option<char> = None;
    let mut chars = text.char_indices();

    while let Some((pos, ch)) = chars.next() {
        match (quote, ch) {
            (Some(_), '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q || c == '\n' => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => {
                if open.len() == MAX_NESTING {
                    return Err(source
                        .syntax("expression nests too deeply", Span::new(pos, pos + 1))
                        .with_help(format!(
                            "at most {} levels of parentheses are allowed; \
                             move inner parts into intermediate assignments",
                            MAX_NESTING
                        )));
                }
                open.push(pos);
            }
            (None, ')') => {
                if open.pop().is_none() {
                    return Err(source
                        .syntax("unmatched closing parenthesis", Span::new(pos, pos + 1))
                        .with_help("remove it or add the matching `(`"));
                }
            }
            _ => {}
        }
    }

    match open.last() {
        Some(&pos) => Err(source
            .syntax("missing closing parenthesis", Span::new(pos, pos + 1))
            .with_help("add `)` to close the parenthesis opened here")),
        None => Ok(()),
    }
}

fn convert_parse_error(error: Error<Rule>, text: &str, source: &SourceContext) -> ValidationError {
    let pos = match error.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    };

    let expected = match &error.variant {
        ErrorVariant::ParsingError { positives, .. } => describe_expected(positives),
        ErrorVariant::CustomError { .. } => Vec::new(),
    };

    if let Some(run) = doubled_operator(text, pos) {
        return source
            .syntax(format!("unexpected operator `{}`", &text[run.start..run.end]), run)
            .with_help("operators cannot be doubled; `**` and `++` are not part of the language");
    }

    let token = token_at(text, pos);
    let (mut message, span) = match token {
        Some(token) => (
            format!("unexpected `{}`", token),
            Span::new(pos, pos + token.len()),
        ),
        None => ("unexpected end of expression".to_string(), Span::point(pos)),
    };
    if !expected.is_empty() {
        message.push_str(", expected ");
        message.push_str(&expected.join(" or "));
    }

    let help = match token {
        Some(";") => Some("remove the empty clause between separators"),
        Some(_) if expected == ["a named argument"] => {
            Some("positional arguments must come before named arguments")
        }
        _ => None,
    };

    let error = source.syntax(message, span);
    match help {
        Some(help) => error.with_help(help),
        None => error,
    }
}

fn is_operator_char(c: char) -> bool {
    "+-*/=<>!&|".contains(c)
}

/// The operator run around `pos` when it repeats `+`, `*` or `/`.
fn doubled_operator(text: &str, pos: usize) -> Option<Span> {
    let before = text.get(..pos)?;
    let after = text.get(pos..)?;
    let start = before.trim_end_matches(is_operator_char).len();
    let end = pos + after.find(|c: char| !is_operator_char(c)).unwrap_or(after.len());
    let run = &text[start..end];
    ["++", "**", "//"]
        .iter()
        .any(|doubled| run.contains(doubled))
        .then(|| Span::new(start, end))
}

/// Friendly names for the rules pest expected, deduplicated in a stable order.
fn describe_expected(rules: &[Rule]) -> Vec<&'static str> {
    let mut described: Vec<&'static str> = Vec::new();
    for rule in rules {
        let text = match rule {
            Rule::or_op | Rule::and_op | Rule::cmp_op | Rule::add_op | Rule::mul_op => {
                "an operator"
            }
            Rule::named_arg => "a named argument",
            Rule::EOI => "end of expression",
            Rule::assignment
            | Rule::or_expr
            | Rule::and_expr
            | Rule::cmp_expr
            | Rule::add_expr
            | Rule::mul_expr
            | Rule::unary
            | Rule::unary_op
            | Rule::call
            | Rule::number
            | Rule::boolean
            | Rule::string
            | Rule::identifier => "an operand",
            _ => continue,
        };
        if !described.contains(&text) {
            described.push(text);
        }
    }
    described
}

/// The token starting at `pos`, or `None` at end of input.
fn token_at(text: &str, pos: usize) -> Option<&str> {
    let rest = text.get(pos..)?;
    let first = rest.chars().next()?;
    if first == '\n' || first == '\r' {
        return Some("newline").filter(|_| !rest.trim().is_empty());
    }

    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.';
    let len = if is_word(first) {
        rest.find(|c: char| !is_word(c)).unwrap_or(rest.len())
    } else if is_operator_char(first) {
        rest.find(|c: char| !is_operator_char(c)).unwrap_or(rest.len())
    } else {
        first.len_utf8()
    };
    Some(&rest[..len])
}
