//! Argument kind inference
//!
//! Every expression is given an [`InferredKind`], which is then checked against the
//! [`ArgKind`] an operator signature expects at that position. `Unknown` is produced for
//! anything another stage already reports (unknown fields, unknown operators) and is
//! compatible with every expectation, so one mistake never yields two diagnostics.

use std::{collections::HashMap, fmt};

use crate::catalog::{ArgKind, FieldSet, OperatorCatalog};
use crate::syntax::{SyntaxNode, UnaryOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferredKind {
    Field,
    Expr,
    Number,
    String,
    Boolean,
    /// A bare identifier used as a named-argument constant.
    Symbol,
    Unknown,
}

impl InferredKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Expr => "expr",
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Symbol => "symbol",
            Self::Unknown => "unknown",
        }
    }

    /// The kind a call produces, given its declared return kind.
    pub fn from_return(kind: ArgKind) -> Self {
        match kind {
            ArgKind::Field => Self::Field,
            ArgKind::Expr => Self::Expr,
            ArgKind::Number => Self::Number,
            ArgKind::String => Self::String,
            ArgKind::Boolean => Self::Boolean,
            ArgKind::Any => Self::Unknown,
        }
    }
}

impl fmt::Display for InferredKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a value of kind `actual` may be passed where `expected` is declared.
pub fn is_compatible(expected: ArgKind, actual: InferredKind) -> bool {
    use InferredKind as K;
    if actual == K::Unknown {
        return true;
    }
    match expected {
        ArgKind::Any => true,
        ArgKind::Expr => matches!(actual, K::Field | K::Expr | K::Number | K::Boolean),
        ArgKind::Field => actual == K::Field,
        ArgKind::Number => actual == K::Number,
        ArgKind::String => matches!(actual, K::String | K::Symbol),
        ArgKind::Boolean => matches!(actual, K::Boolean | K::Expr | K::Field | K::Number),
    }
}

/// Kinds of names visible at a point in the program.
pub struct KindEnv<'a> {
    operators: &'a OperatorCatalog,
    fields: Option<&'a FieldSet>,
    locals: HashMap<String, InferredKind>,
}

impl<'a> KindEnv<'a> {
    pub fn new(operators: &'a OperatorCatalog, fields: Option<&'a FieldSet>) -> Self {
        Self {
            operators,
            fields,
            locals: HashMap::new(),
        }
    }

    /// Records the kind of a name bound by an assignment clause.
    pub fn bind(&mut self, name: &str, kind: InferredKind) {
        self.locals.insert(name.to_string(), kind);
    }

    pub fn infer(&self, node: &SyntaxNode) -> InferredKind {
        match node {
            SyntaxNode::Number(..) => InferredKind::Number,
            SyntaxNode::String(..) => InferredKind::String,
            SyntaxNode::Boolean(..) => InferredKind::Boolean,
            SyntaxNode::Identifier(name, _) => self.infer_name(name).unwrap_or(InferredKind::Unknown),
            SyntaxNode::FunctionCall { name, .. } => self
                .operators
                .get(name)
                .map(|spec| InferredKind::from_return(spec.return_kind))
                .unwrap_or(InferredKind::Unknown),
            SyntaxNode::Binary { op, lhs, rhs, .. } => {
                if op.is_boolean() {
                    InferredKind::Boolean
                } else if self.infer(lhs) == InferredKind::Number
                    && self.infer(rhs) == InferredKind::Number
                {
                    InferredKind::Number
                } else {
                    InferredKind::Expr
                }
            }
            SyntaxNode::Unary { op: UnaryOp::Not, .. } => InferredKind::Boolean,
            SyntaxNode::Unary {
                op: UnaryOp::Neg,
                operand,
                ..
            } => match self.infer(operand) {
                InferredKind::Number => InferredKind::Number,
                _ => InferredKind::Expr,
            },
            SyntaxNode::Assignment { value, .. } => self.infer(value),
        }
    }

    /// Kind of a named-argument value. Bare names that are neither locals nor fields are
    /// symbolic constants.
    pub fn infer_named_value(&self, node: &SyntaxNode) -> InferredKind {
        match node {
            SyntaxNode::Identifier(name, _) => {
                self.infer_name(name).unwrap_or(InferredKind::Symbol)
            }
            other => self.infer(other),
        }
    }

    fn infer_name(&self, name: &str) -> Option<InferredKind> {
        if let Some(kind) = self.locals.get(name) {
            return Some(*kind);
        }
        self.fields
            .filter(|fields| fields.contains(name))
            .map(|_| InferredKind::Field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MaxArgs, OperatorSpec};
    use crate::syntax::{normalize, parse};
    use crate::diagnostics::SourceContext;

    fn first_clause(text: &str) -> SyntaxNode {
        let (normalized, _) = normalize(text);
        let program = parse(&normalized, &SourceContext::expression(text)).unwrap();
        program.clauses.into_iter().next().unwrap()
    }

    #[test]
    fn compatibility_table() {
        use InferredKind as K;
        assert!(is_compatible(ArgKind::Expr, K::Field));
        assert!(is_compatible(ArgKind::Boolean, K::Number));
        assert!(is_compatible(ArgKind::String, K::Symbol));
        assert!(is_compatible(ArgKind::Field, K::Unknown));
        assert!(!is_compatible(ArgKind::Field, K::Expr));
        assert!(!is_compatible(ArgKind::Number, K::Field));
        assert!(!is_compatible(ArgKind::Expr, K::String));
    }

    #[test]
    fn infers_literals_operators_and_names() {
        let operators = OperatorCatalog::from_specs([
            OperatorSpec::new("rank", 1, MaxArgs::Bounded(1)),
            OperatorSpec::new("days", 0, MaxArgs::Bounded(0)).returning(ArgKind::Number),
        ])
        .unwrap();
        let fields: FieldSet = ["close"].into_iter().collect();
        let mut env = KindEnv::new(&operators, Some(&fields));
        env.bind("x", InferredKind::Number);

        assert_eq!(env.infer(&first_clause("close")), InferredKind::Field);
        assert_eq!(env.infer(&first_clause("x")), InferredKind::Number);
        assert_eq!(env.infer(&first_clause("cloze")), InferredKind::Unknown);
        assert_eq!(env.infer(&first_clause("rank(close)")), InferredKind::Expr);
        assert_eq!(env.infer(&first_clause("days()")), InferredKind::Number);
        assert_eq!(env.infer(&first_clause("2 * -x")), InferredKind::Number);
        assert_eq!(env.infer(&first_clause("close * 2")), InferredKind::Expr);
        assert_eq!(env.infer(&first_clause("close > 2")), InferredKind::Boolean);
        assert_eq!(env.infer_named_value(&first_clause("gaussian")), InferredKind::Symbol);
        assert_eq!(env.infer_named_value(&first_clause("close")), InferredKind::Field);
    }
}
