//! Comment stripping and character-set checking
//!
//! A single left-to-right pass over the raw text with four states. Comment bytes are
//! replaced by spaces (newlines are kept) so the normalized text has exactly the same byte
//! length and line structure as the raw text. Comment markers inside string literals are
//! ordinary characters.

use crate::diagnostics::{ErrorReporting, SourceContext, ValidationError};
use crate::syntax::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Default,
    InLineComment,
    InBlockComment { start: usize },
    InStringLiteral { quote: char, start: usize },
}

/// Scanner output: the text with comments blanked out, plus what was found on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedExpression {
    pub text: String,
    /// Positions of characters outside the printable-ASCII allow-list.
    pub disallowed: Vec<Span>,
    /// Byte ranges that were comments in the raw text.
    pub comments: Vec<Span>,
}

impl NormalizedExpression {
    pub fn has_disallowed(&self) -> bool {
        !self.disallowed.is_empty()
    }

    /// True when nothing but whitespace is left after comment removal.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Normalizes a raw expression. Errors are positioned against `raw` itself.
pub fn normalize(raw: &str) -> (NormalizedExpression, Vec<ValidationError>) {
    normalize_source(&SourceContext::expression(raw))
}

/// Normalizes the content of a source context, reporting errors through it.
///
/// Charset violations never stop the scan. An unterminated block comment or string
/// literal is reported as a syntax error, which the aggregator treats as fatal.
pub fn normalize_source(source: &SourceContext) -> (NormalizedExpression, Vec<ValidationError>) {
    let raw = source.content.as_str();
    let mut text = String::with_capacity(raw.len());
    let mut disallowed = Vec::new();
    let mut comments = Vec::new();
    let mut errors = Vec::new();
    let mut state = ScanState::Default;
    let mut comment_start = 0;
    let mut chars = raw.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match state {
            ScanState::Default => match ch {
                '#' => {
                    state = ScanState::InLineComment;
                    comment_start = pos;
                    text.push(' ');
                }
                '/' if matches!(chars.peek(), Some((_, '*'))) => {
                    chars.next();
                    state = ScanState::InBlockComment { start: pos };
                    comment_start = pos;
                    text.push_str("  ");
                }
                '"' | '\'' => {
                    state = ScanState::InStringLiteral { quote: ch, start: pos };
                    text.push(ch);
                }
                _ => {
                    check_char(ch, pos, source, &mut disallowed, &mut errors);
                    text.push(ch);
                }
            },

            ScanState::InLineComment => {
                if ch == '\n' || ch == '\r' {
                    comments.push(Span::new(comment_start, pos));
                    state = ScanState::Default;
                    text.push(ch);
                } else {
                    blank(&mut text, ch);
                }
            }

            ScanState::InBlockComment { .. } => match ch {
                '*' if matches!(chars.peek(), Some((_, '/'))) => {
                    chars.next();
                    comments.push(Span::new(comment_start, pos + 2));
                    state = ScanState::Default;
                    text.push_str("  ");
                }
                '\n' | '\r' => text.push(ch),
                _ => blank(&mut text, ch),
            },

            ScanState::InStringLiteral { quote, .. } => match ch {
                '\\' => {
                    check_char(ch, pos, source, &mut disallowed, &mut errors);
                    text.push(ch);
                    if let Some((next_pos, next)) = chars.next_if(|&(_, c)| c != '\n') {
                        check_char(next, next_pos, source, &mut disallowed, &mut errors);
                        text.push(next);
                    }
                }
                // Strings are single-line.
                '\n' | '\r' => {
                    if let ScanState::InStringLiteral { start, .. } = state {
                        errors.push(unterminated_string(source, start, pos));
                    }
                    state = ScanState::Default;
                    text.push(ch);
                }
                c if c == quote => {
                    state = ScanState::Default;
                    text.push(ch);
                }
                _ => {
                    check_char(ch, pos, source, &mut disallowed, &mut errors);
                    text.push(ch);
                }
            },
        }
    }

    match state {
        ScanState::InLineComment => comments.push(Span::new(comment_start, raw.len())),
        ScanState::InBlockComment { start } => {
            comments.push(Span::new(start, raw.len()));
            errors.push(
                source
                    .syntax("unterminated block comment", Span::new(start, start + 2))
                    .with_help("close the comment with `*/`"),
            );
        }
        ScanState::InStringLiteral { start, .. } => {
            errors.push(unterminated_string(source, start, raw.len()));
        }
        ScanState::Default => {}
    }

    debug_assert_eq!(text.len(), raw.len());
    let normalized = NormalizedExpression {
        text,
        disallowed,
        comments,
    };
    (normalized, errors)
}

// ============================================================================
// HELPERS
// ============================================================================

/// Printable ASCII plus the whitespace the grammar understands.
pub fn is_allowed_char(ch: char) -> bool {
    ch.is_ascii_graphic() || matches!(ch, ' ' | '\t' | '\n' | '\r')
}

fn check_char(
    ch: char,
    pos: usize,
    source: &SourceContext,
    disallowed: &mut Vec<Span>,
    errors: &mut Vec<ValidationError>,
) {
    if is_allowed_char(ch) {
        return;
    }
    let span = Span::new(pos, pos + ch.len_utf8());
    disallowed.push(span);
    errors.push(source.charset(ch, span));
}

/// Replace a comment character by as many spaces as it has bytes.
fn blank(text: &mut String, ch: char) {
    for _ in 0..ch.len_utf8() {
        text.push(' ');
    }
}

fn unterminated_string(source: &SourceContext, start: usize, end: usize) -> ValidationError {
    source
        .syntax("unterminated string literal", Span::new(start, end))
        .with_help("check that every quote is closed on the same line")
}
