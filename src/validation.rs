//! Validation pipeline
//!
//! `validate` runs the stages in order: scan, parse, then the operator, field and structure
//! checks over the same syntax tree. A syntax error stops the pipeline; every other stage
//! accumulates. The result lists errors in stage order, each stage sorted by position.

pub mod fields;
pub mod kinds;
pub mod operators;
pub mod structure;

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{CombinationKey, FieldCatalog, OperatorCatalog};
use crate::diagnostics::{sort_by_position, SourceContext, ValidationError, ValidationResult};
use crate::syntax::{parse, scanner::normalize_source};

pub use fields::resolve_fields;
pub use operators::validate_operators;
pub use structure::validate_structure;

/// The market configuration an expression is validated under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationContext {
    pub region: String,
    pub delay: String,
    pub universe: String,
}

impl ValidationContext {
    pub fn new(region: impl Into<String>, delay: impl ToString, universe: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            delay: delay.to_string(),
            universe: universe.into(),
        }
    }

    /// The combination key selecting this context's field set.
    pub fn key(&self) -> CombinationKey {
        CombinationKey::new(&*self.region, &*self.delay, &*self.universe)
    }
}

impl From<CombinationKey> for ValidationContext {
    fn from(key: CombinationKey) -> Self {
        Self {
            region: key.region,
            delay: key.delay,
            universe: key.universe,
        }
    }
}

/// Validates expressions against shared, read-only catalogs.
///
/// Cloning is cheap; clones share the catalogs.
#[derive(Debug, Clone)]
pub struct ExpressionValidator {
    operators: Arc<OperatorCatalog>,
    fields: Arc<FieldCatalog>,
}

impl ExpressionValidator {
    pub fn new(operators: Arc<OperatorCatalog>, fields: Arc<FieldCatalog>) -> Self {
        Self { operators, fields }
    }

    pub fn operators(&self) -> &OperatorCatalog {
        &self.operators
    }

    pub fn fields(&self) -> &FieldCatalog {
        &self.fields
    }

    /// Validates one expression.
    pub fn validate(&self, expression: &str, context: Option<&ValidationContext>) -> ValidationResult {
        self.validate_source(&SourceContext::expression(expression), context)
    }

    /// Validates the content of a named source (a file, a batch entry).
    pub fn validate_source(
        &self,
        source: &SourceContext,
        context: Option<&ValidationContext>,
    ) -> ValidationResult {
        validate_with(source, context, &self.operators, &self.fields)
    }

    /// Validates many expressions in parallel. Results are ordered by input index.
    pub fn validate_batch<S>(
        &self,
        expressions: &[S],
        context: Option<&ValidationContext>,
    ) -> Vec<(usize, ValidationResult)>
    where
        S: AsRef<str> + Sync,
    {
        let sources: Vec<SourceContext> = expressions
            .iter()
            .map(|expression| SourceContext::expression(expression.as_ref()))
            .collect();
        self.validate_sources(&sources, context)
    }

    /// Parallel form of [`ExpressionValidator::validate_source`].
    pub fn validate_sources(
        &self,
        sources: &[SourceContext],
        context: Option<&ValidationContext>,
    ) -> Vec<(usize, ValidationResult)> {
        let results: Vec<(usize, ValidationResult)> = sources
            .par_iter()
            .enumerate()
            .map(|(index, source)| (index, self.validate_source(source, context)))
            .collect();
        let invalid = results.iter().filter(|(_, result)| !result.ok).count();
        debug!(total = results.len(), invalid, "validated batch");
        results
    }
}

/// Validates one expression against explicit catalogs.
pub fn validate(
    expression: &str,
    context: Option<&ValidationContext>,
    operators: &OperatorCatalog,
    fields: &FieldCatalog,
) -> ValidationResult {
    validate_with(&SourceContext::expression(expression), context, operators, fields)
}

fn validate_with(
    source: &SourceContext,
    context: Option<&ValidationContext>,
    operators: &OperatorCatalog,
    fields: &FieldCatalog,
) -> ValidationResult {
    let (normalized, mut errors) = normalize_source(source);
    sort_by_position(&mut errors);
    debug!(stage = "scan", errors = errors.len(), comments = normalized.comments.len());
    if errors.iter().any(|e| e.kind.is_fatal()) {
        return ValidationResult::new(errors);
    }

    let program = match parse(&normalized, source) {
        Ok(program) => program,
        Err(error) => {
            debug!(stage = "parse", message = %error.message, "syntax error");
            errors.push(error);
            return ValidationResult::new(errors);
        }
    };

    let key = context.map(ValidationContext::key);
    let field_set = key.as_ref().and_then(|key| fields.get(key));

    let stages: [(&str, Vec<ValidationError>); 3] = [
        (
            "operators",
            validate_operators(&program, operators, field_set, source),
        ),
        ("fields", resolve_fields(&program, fields, key.as_ref(), source)),
        (
            "structure",
            validate_structure(&program, operators, field_set, source),
        ),
    ];
    for (stage, mut stage_errors) in stages {
        sort_by_position(&mut stage_errors);
        debug!(stage, errors = stage_errors.len());
        errors.extend(stage_errors);
    }

    ValidationResult::new(errors)
}
