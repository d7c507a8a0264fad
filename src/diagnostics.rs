//! Validation diagnostics
//!
//! All problems found in an expression are reported as [`ValidationError`] values. They are
//! plain data: every stage returns them in a `Vec` and the aggregator concatenates them into
//! a [`ValidationResult`]. Only fallible I/O (catalog loading, configuration) uses Rust
//! error types.
//!
//! Errors are created through the [`ErrorReporting`] trait, implemented by
//! [`SourceContext`], which turns byte spans into 1-based line/column positions. For rich
//! terminal output a [`ValidationDiagnostic`] wraps an error together with its source and
//! implements `miette::Diagnostic`.

use std::{fmt, sync::Arc};

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::syntax::Span;

/// Type alias for a shared, named source used by miette reports.
pub type SourceArc = Arc<NamedSource<String>>;

// ============================================================================
// ERROR KINDS
// ============================================================================

/// The diagnostic taxonomy. Serialized with the `...Error` names used by front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "CharsetError")]
    Charset,
    #[serde(rename = "SyntaxError")]
    Syntax,
    #[serde(rename = "UnknownOperatorError")]
    UnknownOperator,
    #[serde(rename = "ArityError")]
    Arity,
    #[serde(rename = "NamedArgumentError")]
    NamedArgument,
    #[serde(rename = "TypeMismatchError")]
    TypeMismatch,
    #[serde(rename = "UnknownFieldError")]
    UnknownField,
    #[serde(rename = "ConfigurationError")]
    Configuration,
    #[serde(rename = "IdentifierFormatError")]
    IdentifierFormat,
    #[serde(rename = "AssignmentStructureError")]
    AssignmentStructure,
    #[serde(rename = "ShadowingError")]
    Shadowing,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Charset => "CharsetError",
            Self::Syntax => "SyntaxError",
            Self::UnknownOperator => "UnknownOperatorError",
            Self::Arity => "ArityError",
            Self::NamedArgument => "NamedArgumentError",
            Self::TypeMismatch => "TypeMismatchError",
            Self::UnknownField => "UnknownFieldError",
            Self::Configuration => "ConfigurationError",
            Self::IdentifierFormat => "IdentifierFormatError",
            Self::AssignmentStructure => "AssignmentStructureError",
            Self::Shadowing => "ShadowingError",
        }
    }

    /// Get error code suffix for diagnostic codes
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::Charset => "charset",
            Self::Syntax => "syntax",
            Self::UnknownOperator => "unknown_operator",
            Self::Arity => "arity",
            Self::NamedArgument => "named_argument",
            Self::TypeMismatch => "type_mismatch",
            Self::UnknownField => "unknown_field",
            Self::Configuration => "configuration",
            Self::IdentifierFormat => "identifier_format",
            Self::AssignmentStructure => "assignment_structure",
            Self::Shadowing => "shadowing",
        }
    }

    /// The pipeline stage that reports this kind.
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Charset => "scan",
            Self::Syntax => "parse",
            Self::UnknownOperator | Self::Arity | Self::NamedArgument | Self::TypeMismatch => {
                "operators"
            }
            Self::UnknownField | Self::Configuration => "fields",
            Self::IdentifierFormat | Self::AssignmentStructure | Self::Shadowing => "structure",
        }
    }

    /// Only syntax errors stop analysis of an expression.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Syntax)
    }

    fn primary_label(&self) -> &'static str {
        match self {
            Self::Charset => "unsupported character",
            Self::Syntax => "syntax error here",
            Self::UnknownOperator => "unknown operator",
            Self::Arity => "wrong number of arguments",
            Self::NamedArgument => "invalid named argument",
            Self::TypeMismatch => "type mismatch",
            Self::UnknownField => "unknown field",
            Self::Configuration => "configuration",
            Self::IdentifierFormat => "malformed identifier",
            Self::AssignmentStructure => "misplaced clause",
            Self::Shadowing => "shadows an existing name",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// VALIDATION ERROR AND RESULT
// ============================================================================

/// A single diagnostic. Serializes to `{kind, message, line, column}` plus `help` when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Byte span in the raw expression, when the error has a position.
    #[serde(skip)]
    pub span: Option<Span>,
}

impl ValidationError {
    /// An error that is not tied to a source position.
    pub fn unpositioned(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
            column: None,
            help: None,
            span: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_optional_help(mut self, help: Option<String>) -> Self {
        self.help = help;
        self
    }

    /// Sort key: unpositioned errors first, then by byte offset.
    pub fn position_key(&self) -> (usize, usize) {
        match self.span {
            Some(span) => (1, span.start),
            None => (0, 0),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, "line {}, column {}: ", line, column)?;
        }
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(help) = &self.help {
            write!(f, " ({})", help)?;
        }
        Ok(())
    }
}

/// Outcome of validating one expression. `ok` is true iff `errors` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
        }
    }

    pub fn valid() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_valid(&self) -> bool {
        self.ok
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Errors of one kind, in report order.
    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.errors_of(kind).next().is_some()
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

/// Stable-sorts one stage's errors by position, keeping report order for ties.
pub fn sort_by_position(errors: &mut [ValidationError]) {
    errors.sort_by_key(ValidationError::position_key);
}

// ============================================================================
// SOURCE CONTEXT - line/column mapping for error reporting
// ============================================================================

/// The raw expression text plus a line index, used to position diagnostics.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
    line_starts: Vec<usize>,
}

impl SourceContext {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            name: name.into(),
            content,
            line_starts,
        }
    }

    /// Source context for an anonymous expression.
    pub fn expression(content: impl Into<String>) -> Self {
        Self::new("expression", content)
    }

    /// 1-based (line, column) of a byte offset. Columns count characters, not bytes.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.content.len());
        let line_index = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line_index];
        let column = self
            .content
            .get(line_start..offset)
            .map(|text| text.chars().count())
            .unwrap_or(offset - line_start);
        (line_index + 1, column + 1)
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> SourceArc {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

/// Context-aware error creation.
pub trait ErrorReporting {
    /// Create an error positioned at `span`.
    fn report(&self, kind: ErrorKind, message: String, span: Span) -> ValidationError;

    fn charset(&self, ch: char, span: Span) -> ValidationError {
        self.report(
            ErrorKind::Charset,
            format!("unsupported character '{}' (U+{:04X})", ch, ch as u32),
            span,
        )
        .with_help("only printable ASCII characters are allowed outside comments")
    }

    fn syntax(&self, message: impl Into<String>, span: Span) -> ValidationError {
        self.report(ErrorKind::Syntax, message.into(), span)
    }

    fn type_mismatch(&self, what: &str, expected: &str, actual: &str, span: Span) -> ValidationError {
        self.report(
            ErrorKind::TypeMismatch,
            format!("{} should be {}, found {}", what, expected, actual),
            span,
        )
    }
}

impl ErrorReporting for SourceContext {
    fn report(&self, kind: ErrorKind, message: String, span: Span) -> ValidationError {
        let (line, column) = self.line_col(span.start);
        ValidationError {
            kind,
            message,
            line: Some(line),
            column: Some(column),
            help: None,
            span: Some(span),
        }
    }
}

// ============================================================================
// MIETTE PRESENTATION
// ============================================================================

/// A validation error paired with its expression source, for miette rendering.
#[derive(Debug, Error)]
#[error("{}: {}", .error.kind, .error.message)]
pub struct ValidationDiagnostic {
    pub error: ValidationError,
    pub src: SourceArc,
}

impl ValidationDiagnostic {
    pub fn new(error: ValidationError, src: SourceArc) -> Self {
        Self { error, src }
    }
}

impl Diagnostic for ValidationDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!(
            "wqb::{}::{}",
            self.error.kind.stage(),
            self.error.kind.code_suffix()
        )))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.error
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.error
            .span
            .map(|_| self.src.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.error.span?;
        let len = span.len().max(1);
        let label = LabeledSpan::new(Some(self.error.kind.primary_label().to_string()), span.start, len);
        Some(Box::new(std::iter::once(label)))
    }
}
