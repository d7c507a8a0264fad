//! Position-aware validation of quantitative alpha expressions.
//!
//! An expression is normalized by the [`syntax::scanner`], parsed into a [`syntax::Program`]
//! and then checked against an [`OperatorCatalog`] and a [`FieldCatalog`]. Every problem is
//! reported as a [`ValidationError`] carrying its kind, message and 1-based position.
//!
//! ```
//! use wqb_validator::{FieldCatalog, OperatorCatalog, ValidationContext};
//!
//! let operators = OperatorCatalog::from_json_str(
//!     r#"[{"name": "rank", "min_args": 1, "max_args": 1}]"#,
//! ).unwrap();
//! let fields = FieldCatalog::from_json_str(r#"{"USA_1_TOP3000": ["close"]}"#).unwrap();
//! let context = ValidationContext::new("USA", 1, "TOP3000");
//!
//! let result = wqb_validator::validate("rank(close)", Some(&context), &operators, &fields);
//! assert!(result.ok);
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod syntax;
pub mod validation;

pub use catalog::{
    ArgKind, CatalogError, CombinationKey, FieldCatalog, FieldSet, MaxArgs, NamedArgSpec,
    OperatorCatalog, OperatorSpec,
};
pub use config::{ConfigError, Settings};
pub use diagnostics::{ErrorKind, SourceContext, ValidationError, ValidationResult};
pub use syntax::{parse, Program, Span, SyntaxNode};
pub use validation::{validate, ExpressionValidator, ValidationContext};
