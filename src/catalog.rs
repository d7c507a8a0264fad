//! Operator and field catalogs
//!
//! Catalogs are loaded once and then shared read-only between validations. Both accept the
//! JSON shapes produced by the catalog fetcher and offer in-memory builders for embedding.

pub mod fields;
pub mod operators;

use miette::Diagnostic;
use thiserror::Error;

pub use fields::{CombinationKey, FieldCatalog, FieldEntry, FieldSet};
pub use operators::{
    AllowedValue, AllowedValues, ArgKind, MaxArgs, NamedArgSpec, OperatorCatalog, OperatorSpec,
};

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
pub const SUGGESTION_THRESHOLD: f64 = 0.85;

/// Errors raised while loading a catalog.
#[derive(Error, Diagnostic, Debug)]
pub enum CatalogError {
    #[error("failed to read {path}")]
    #[diagnostic(
        code(wqb::catalog::io),
        help("check that the catalog file exists and is readable")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {what} catalog: {message}")]
    #[diagnostic(code(wqb::catalog::format))]
    Format { what: &'static str, message: String },

    #[error("operator `{0}` is defined more than once")]
    #[diagnostic(
        code(wqb::catalog::duplicate),
        help("each operator name may appear only once in the catalog")
    )]
    DuplicateOperator(String),

    #[error("operator `{name}`: {message}")]
    #[diagnostic(code(wqb::catalog::invalid_operator))]
    InvalidOperator { name: String, message: String },
}

/// The candidate most similar to `target`, if any reaches [`SUGGESTION_THRESHOLD`].
pub fn closest_match<'a>(
    target: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<&'a str> {
    candidates
        .into_iter()
        .filter(|candidate| *candidate != target)
        .map(|candidate| (candidate, strsim::jaro_winkler(target, candidate)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate)
}

pub(crate) fn read_catalog_file(path: &std::path::Path) -> Result<String, CatalogError> {
    std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_spelling() {
        let names = ["close", "open", "volume"];
        assert_eq!(closest_match("cloze", names), Some("close"));
        assert_eq!(closest_match("returns", names), None);
    }
}
