//! Shared fixtures for the integration tests.
//!
//! One small operator catalog and one field catalog, written in the JSON shapes the loaders
//! accept, so the fixtures also exercise catalog loading.

#![allow(dead_code)]

use std::{fs, path::Path, sync::Arc};

use wqb_validator::{
    ErrorKind, ExpressionValidator, FieldCatalog, OperatorCatalog, ValidationContext,
    ValidationResult,
};

pub const OPERATORS_JSON: &str = r#"[
    {"name": "ts_mean", "min_args": 2, "max_args": 2, "arg_types": ["field", "number"]},
    {"name": "ts_delay", "min_args": 2, "max_args": 2, "arg_types": ["expr", "number"]},
    {"name": "rank", "min_args": 1, "max_args": 1},
    {"name": "add", "min_args": 2, "max_args": "unbounded", "var_args_type": "expr"},
    {"name": "f", "min_args": 1, "max_args": 3},
    {
        "name": "quantile",
        "min_args": 1,
        "max_args": 1,
        "named_args": [
            {"name": "driver", "allowed_values": ["gaussian", "cauchy", "uniform"]},
            {"name": "sigma", "allowed_values": "any", "kind": "number"}
        ]
    }
]"#;

pub const FIELDS_JSON: &str = r#"{
    "USA_1_TOP3000": ["close", "open", "volume", "fnd6__cash", {"id": "returns", "type": "MATRIX"}],
    "CHN_0_TOP2000U": ["close"]
}"#;

pub fn operators() -> OperatorCatalog {
    OperatorCatalog::from_json_str(OPERATORS_JSON).unwrap()
}

pub fn fields() -> FieldCatalog {
    FieldCatalog::from_json_str(FIELDS_JSON).unwrap()
}

pub fn validator() -> ExpressionValidator {
    ExpressionValidator::new(Arc::new(operators()), Arc::new(fields()))
}

pub fn usa() -> ValidationContext {
    ValidationContext::new("USA", 1, "TOP3000")
}

/// Validates under the USA_1_TOP3000 context.
pub fn check(expression: &str) -> ValidationResult {
    validator().validate(expression, Some(&usa()))
}

pub fn kinds(result: &ValidationResult) -> Vec<ErrorKind> {
    result.errors.iter().map(|error| error.kind).collect()
}

/// Writes both catalogs under their default file names.
pub fn write_catalogs(dir: &Path) {
    fs::write(dir.join("operators.json"), OPERATORS_JSON).unwrap();
    fs::write(dir.join("data_fields.json"), FIELDS_JSON).unwrap();
}
