// tests/syntax_tests.rs
//
// Scanner and parser behaviour through the public `syntax` module.

use wqb_validator::syntax::{normalize, parse, BinaryOp, SyntaxNode};
use wqb_validator::{ErrorKind, SourceContext, Span};

fn parse_text(text: &str) -> Result<wqb_validator::Program, wqb_validator::ValidationError> {
    let (normalized, _) = normalize(text);
    parse(&normalized, &SourceContext::expression(text))
}

// ---
// Scanner
// ---

#[test]
fn block_comment_becomes_spaces_of_same_length() {
    let raw = "/* comment with # inside */ts_mean(close,20)";
    let (normalized, errors) = normalize(raw);
    assert!(errors.is_empty());
    assert_eq!(normalized.text.len(), raw.len());
    assert_eq!(normalized.text, format!("{}ts_mean(close,20)", " ".repeat(27)));
    assert_eq!(normalized.comments, [Span::new(0, 27)]);
}

#[test]
fn comment_markers_inside_strings_are_kept() {
    let raw = "quantile(close, driver=\"a#b/*c*/\") # trailing";
    let (normalized, errors) = normalize(raw);
    assert!(errors.is_empty());
    assert!(normalized.text.starts_with("quantile(close, driver=\"a#b/*c*/\")"));
    assert!(normalized.text.ends_with("           "));
    assert_eq!(normalized.comments.len(), 1);
}

#[test]
fn multi_line_block_comment_keeps_newlines() {
    let raw = "x = close /* first\nsecond */\nx";
    let (normalized, _) = normalize(raw);
    assert_eq!(normalized.text.matches('\n').count(), 2);
    assert_eq!(normalized.text.len(), raw.len());
}

#[test]
fn non_ascii_comment_content_is_not_a_charset_error() {
    let raw = "# prix de clôture\nrank(close)";
    let (normalized, errors) = normalize(raw);
    assert!(errors.is_empty());
    assert!(!normalized.has_disallowed());
    assert_eq!(normalized.text.len(), raw.len());
}

#[test]
fn every_disallowed_character_is_reported() {
    let (normalized, errors) = normalize("rank(clöse) + ñ");
    assert_eq!(normalized.disallowed.len(), 2);
    assert!(errors.iter().all(|e| e.kind == ErrorKind::Charset));
    let columns: Vec<_> = errors.iter().map(|e| e.column).collect();
    assert_eq!(columns, [Some(8), Some(15)]);
}

#[test]
fn unterminated_block_comment_is_syntax_error() {
    let (_, errors) = normalize("rank(close)\n/* never closed");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::Syntax);
    assert_eq!((errors[0].line, errors[0].column), (Some(2), Some(1)));
}

// ---
// Parser
// ---

#[test]
fn binary_operators_nest_by_precedence() {
    let program = parse_text("close - open / 2 >= 0 || volume < 10").unwrap();
    let SyntaxNode::Binary { op, lhs, .. } = &program.clauses[0] else {
        panic!("expected binary node");
    };
    assert_eq!(*op, BinaryOp::Or);
    assert_eq!(lhs.pretty(), "((close - (open / 2)) >= 0)");
}

#[test]
fn named_arguments_keep_their_positions() {
    let program = parse_text("quantile(close, driver=gaussian)").unwrap();
    let SyntaxNode::FunctionCall { named_args, .. } = &program.clauses[0] else {
        panic!("expected call");
    };
    assert_eq!(named_args[0].name_span, Span::new(16, 22));
    assert_eq!(named_args[0].value.span(), Span::new(23, 31));
}

#[test]
fn clauses_may_use_semicolons_and_blank_lines() {
    let program = parse_text("a = close;\n\nb = a + 1\n\nrank(b)\n").unwrap();
    assert_eq!(program.clauses.len(), 3);
    assert_eq!(program.result().map(SyntaxNode::pretty).as_deref(), Some("rank(b)"));
}

#[test]
fn positional_after_named_is_syntax_error() {
    let err = parse_text("quantile(driver=gaussian, close)").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
}

#[test]
fn missing_parenthesis_points_at_the_opening_one() {
    let err = parse_text("x = rank(close\nx").unwrap_err();
    assert_eq!(err.message, "missing closing parenthesis");
    assert_eq!((err.line, err.column), (Some(1), Some(9)));
    assert!(err.help.is_some());
}

#[test]
fn parenthesis_inside_string_is_not_counted() {
    assert!(parse_text("quantile(close, driver=\")\")").is_ok());
}

#[test]
fn doubled_operator_is_named_in_the_message() {
    let err = parse_text("close ** 2").unwrap_err();
    assert_eq!(err.message, "unexpected operator `**`");
}

#[test]
fn dangling_operator_is_syntax_error() {
    let err = parse_text("rank(close) +").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
}
