// tests/diagnostic_tests.rs
//
// Serialized and rendered forms of validation errors.

mod common;

use common::check;
use miette::{Diagnostic, Report};
use serde_json::json;
use wqb_validator::diagnostics::ValidationDiagnostic;
use wqb_validator::{ErrorKind, SourceContext, ValidationResult};

#[test]
fn result_serializes_with_kind_names_and_positions() {
    let result = check("ts_mean(cloze, 20)");
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(
        value,
        json!({
            "ok": false,
            "errors": [{
                "kind": "UnknownFieldError",
                "message": "unknown field `cloze` for USA_1_TOP3000",
                "line": 1,
                "column": 9,
                "help": "did you mean `close`?"
            }]
        })
    );
}

#[test]
fn unpositioned_error_serializes_null_position() {
    let result = common::validator().validate("rank(close)", None);
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["errors"][0]["kind"], "ConfigurationError");
    assert!(value["errors"][0]["line"].is_null());
    assert!(value["errors"][0]["column"].is_null());
}

#[test]
fn result_deserializes_from_front_end_json() {
    let result: ValidationResult = serde_json::from_str(
        r#"{"ok": false, "errors": [{"kind": "ArityError", "message": "m", "line": 2, "column": 3}]}"#,
    )
    .unwrap();
    assert_eq!(result.errors[0].kind, ErrorKind::Arity);
    assert_eq!(result.errors[0].span, None);
}

#[test]
fn report_renders_code_label_and_help() {
    let text = "x = close\nrank(x, 2)";
    let source = SourceContext::new("momentum.alpha", text);
    let result = common::validator().validate_source(&source, Some(&common::usa()));
    assert_eq!(result.errors.len(), 1);

    let diagnostic = ValidationDiagnostic::new(result.errors[0].clone(), source.to_named_source());
    assert_eq!(
        diagnostic.code().map(|code| code.to_string()).as_deref(),
        Some("wqb::operators::arity")
    );
    assert_eq!(diagnostic.labels().map(|labels| labels.count()), Some(1));

    let rendered = format!("{:?}", Report::new(diagnostic));
    assert!(rendered.contains("momentum.alpha"));
    assert!(rendered.contains("`rank` called with 2 positional arguments"));
    assert!(rendered.contains("`rank` expects exactly 1 positional argument"));
}

#[test]
fn unpositioned_report_has_no_snippet() {
    let result = common::validator().validate("rank(close)", None);
    let source = SourceContext::expression("rank(close)");
    let diagnostic = ValidationDiagnostic::new(result.errors[0].clone(), source.to_named_source());
    assert!(diagnostic.labels().is_none());
    assert!(diagnostic.source_code().is_none());
}
