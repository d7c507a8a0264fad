//! Syntax module for alpha expressions
//!
//! This module provides the syntax tree produced by the parser. Every node carries a byte
//! span into the raw expression text. The scanner blanks comments out with spaces of the
//! same byte length, so spans taken from the normalized text stay valid against the raw
//! text for every later diagnostic.

pub mod parser;
pub mod scanner;

use std::fmt;

use serde::Serialize;

pub use parser::{parse, MAX_NESTING};
pub use scanner::{normalize, NormalizedExpression};

/// Represents a span in the source code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A zero-width span at `pos`.
    pub fn point(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn join(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Infix operators. They are part of the language itself, not catalog operators.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        use BinaryOp::*;
        let op = match symbol {
            "||" => Or,
            "&&" => And,
            "==" => Eq,
            "!=" => Ne,
            "<" => Lt,
            "<=" => Le,
            ">" => Gt,
            ">=" => Ge,
            "+" => Add,
            "-" => Sub,
            "*" => Mul,
            "/" => Div,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(&self) -> &'static str {
        use BinaryOp::*;
        match self {
            Or => "||",
            And => "&&",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
        }
    }

    /// Comparison and logical operators produce a boolean.
    pub fn is_boolean(&self) -> bool {
        !matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// A `name=value` argument. Kept in source order so duplicates can be reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedArg {
    pub name: String,
    pub name_span: Span,
    pub value: SyntaxNode,
}

/// The core syntax tree node for alpha expressions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SyntaxNode {
    FunctionCall {
        name: String,
        name_span: Span,
        args: Vec<SyntaxNode>,
        named_args: Vec<NamedArg>,
        span: Span,
    },
    Identifier(String, Span),
    Number(f64, Span),
    String(String, Span),
    Boolean(bool, Span),
    Binary {
        op: BinaryOp,
        lhs: Box<SyntaxNode>,
        rhs: Box<SyntaxNode>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<SyntaxNode>,
        span: Span,
    },
    /// `target = value`. The grammar accepts any expression as target; the structure
    /// validator rejects targets that are not plain identifiers.
    Assignment {
        target: Box<SyntaxNode>,
        value: Box<SyntaxNode>,
        span: Span,
    },
}

impl SyntaxNode {
    /// Returns the span of this node.
    pub fn span(&self) -> Span {
        use SyntaxNode::*;
        match self {
            Identifier(_, span) | Number(_, span) | String(_, span) | Boolean(_, span) => *span,
            FunctionCall { span, .. }
            | Binary { span, .. }
            | Unary { span, .. }
            | Assignment { span, .. } => *span,
        }
    }

    /// Returns the type name of this node as a string (for diagnostics).
    pub fn type_name(&self) -> &'static str {
        match self {
            SyntaxNode::FunctionCall { .. } => "function call",
            SyntaxNode::Identifier(..) => "identifier",
            SyntaxNode::Number(..) => "number",
            SyntaxNode::String(..) => "string",
            SyntaxNode::Boolean(..) => "boolean",
            SyntaxNode::Binary { .. } => "infix expression",
            SyntaxNode::Unary { .. } => "unary expression",
            SyntaxNode::Assignment { .. } => "assignment",
        }
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            SyntaxNode::Identifier(name, _) => Some(name),
            _ => None,
        }
    }

    pub fn is_assignment(&self) -> bool {
        matches!(self, SyntaxNode::Assignment { .. })
    }

    /// Pretty-prints the node as canonical expression text.
    pub fn pretty(&self) -> String {
        use SyntaxNode::*;
        match self {
            FunctionCall {
                name,
                args,
                named_args,
                ..
            } => {
                let rendered: Vec<std::string::String> = args
                    .iter()
                    .map(SyntaxNode::pretty)
                    .chain(
                        named_args
                            .iter()
                            .map(|arg| format!("{}={}", arg.name, arg.value.pretty())),
                    )
                    .collect();
                format!("{}({})", name, rendered.join(", "))
            }
            Identifier(name, _) => name.clone(),
            Number(n, _) => n.to_string(),
            String(s, _) => format!("\"{}\"", s),
            Boolean(b, _) => b.to_string(),
            Binary { op, lhs, rhs, .. } => {
                format!("({} {} {})", lhs.pretty(), op.symbol(), rhs.pretty())
            }
            Unary { op, operand, .. } => format!("{}{}", op.symbol(), operand.pretty()),
            Assignment { target, value, .. } => {
                format!("{} = {}", target.pretty(), value.pretty())
            }
        }
    }
}

impl fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pretty())
    }
}

/// A parsed expression: one syntax tree per clause, in source order.
///
/// Every clause but the last is expected to be an assignment; the last clause is the
/// expression whose value the alpha returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub clauses: Vec<SyntaxNode>,
    pub span: Span,
}

impl Program {
    /// The returned expression (the last clause).
    pub fn result(&self) -> Option<&SyntaxNode> {
        self.clauses.last()
    }

    /// Names bound by assignment clauses, with the index of the defining clause.
    pub fn assigned_names(&self) -> Vec<(&str, usize)> {
        self.clauses
            .iter()
            .enumerate()
            .filter_map(|(index, clause)| match clause {
                SyntaxNode::Assignment { target, .. } => {
                    target.as_identifier().map(|name| (name, index))
                }
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.clauses.iter().map(SyntaxNode::pretty).collect();
        write!(f, "{}", lines.join(";\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_covers_both_spans() {
        let span = Span::new(4, 9).join(Span::new(1, 5));
        assert_eq!(span, Span::new(1, 9));
    }

    #[test]
    fn pretty_renders_named_args_after_positional() {
        let node = SyntaxNode::FunctionCall {
            name: "ts_regression".into(),
            name_span: Span::default(),
            args: vec![
                SyntaxNode::Identifier("volume".into(), Span::default()),
                SyntaxNode::Number(10.0, Span::default()),
            ],
            named_args: vec![NamedArg {
                name: "lag".into(),
                name_span: Span::default(),
                value: SyntaxNode::Number(0.0, Span::default()),
            }],
            span: Span::default(),
        };
        assert_eq!(node.pretty(), "ts_regression(volume, 10, lag=0)");
    }

    #[test]
    fn binary_op_symbols_round_trip() {
        for symbol in ["||", "&&", "==", "!=", "<", "<=", ">", ">=", "+", "-", "*", "/"] {
            let op = BinaryOp::from_symbol(symbol).unwrap();
            assert_eq!(op.symbol(), symbol);
        }
        assert!(BinaryOp::from_symbol("**").is_none());
    }
}
