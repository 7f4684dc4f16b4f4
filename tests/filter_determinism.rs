//! Filter Compilation Invariant Tests
//!
//! - Filters are opt-in: an empty model constrains nothing
//! - Caller values are always bound, never interpolated
//! - Compilation is deterministic: same model, same SQL, same names

use std::collections::HashMap;

use limsdb::filter::{compile, field, FieldDef, FilterError, FilterExpression, FilterModel};
use serde_json::json;

const SAMPLE_FIELDS: &[FieldDef] = &[
    field("id", "s.id"),
    field("external_id", "external_id"),
    field("type", "s.type"),
    field("meta", "s.meta"),
];

// =============================================================================
// Opt-in Filtering
// =============================================================================

/// A model with no populated fields compiles to an unconstrained clause.
#[test]
fn test_empty_model_compiles_to_true() {
    let model = FilterModel::new(SAMPLE_FIELDS);
    let compiled = compile(&model, None).unwrap();
    assert_eq!(compiled.sql, "true");
    assert!(compiled.params.is_empty());
}

/// Binding an expression with no populated operator is the same as not
/// binding it at all.
#[test]
fn test_absent_expressions_do_not_constrain() {
    let model = FilterModel::new(SAMPLE_FIELDS)
        .bind("id", FilterExpression::<i64>::new())
        .unwrap();
    let compiled = compile(&model, None).unwrap();
    assert_eq!(compiled.sql, "true");
}

// =============================================================================
// Membership Edge Cases
// =============================================================================

/// A single-element membership list is equivalent to equality.
#[test]
fn test_single_element_in_is_equality() {
    let in_model = FilterModel::new(SAMPLE_FIELDS)
        .bind("external_id", FilterExpression::new().in_list(vec!["S1".to_string()]))
        .unwrap();
    let compiled = compile(&in_model, None).unwrap();

    assert_eq!(compiled.sql, "external_id = :external_id_in");
    assert_eq!(compiled.params["external_id_in"], json!("S1"));
}

/// An empty membership list matches no rows, explicitly.
#[test]
fn test_empty_in_matches_no_rows() {
    let model = FilterModel::new(SAMPLE_FIELDS)
        .bind("id", FilterExpression::<i64>::new().in_list(Vec::new()))
        .unwrap();
    let compiled = compile(&model, None).unwrap();
    assert_eq!(compiled.sql, "1 = 0");
}

/// An empty exclusion list excludes nothing.
#[test]
fn test_empty_nin_matches_all_rows() {
    let model = FilterModel::new(SAMPLE_FIELDS)
        .bind("id", FilterExpression::<i64>::new().not_in(Vec::new()))
        .unwrap();
    let compiled = compile(&model, None).unwrap();
    assert_eq!(compiled.sql, "1 = 1");
}

// =============================================================================
// Parameter Binding
// =============================================================================

/// Scenario: an external-id equality filter with a join override compiles
/// to the aliased column and a parameter named after it.
#[test]
fn test_override_scenario() {
    let model = FilterModel::new(SAMPLE_FIELDS)
        .bind("external_id", FilterExpression::new().eq("S1".to_string()))
        .unwrap();
    let overrides = HashMap::from([("external_id".to_string(), "s.external_id".to_string())]);

    let compiled = compile(&model, Some(&overrides)).unwrap();
    assert_eq!(compiled.sql, "s.external_id = :s_external_id_eq");
    assert_eq!(compiled.params.len(), 1);
    assert_eq!(compiled.params["s_external_id_eq"], json!("S1"));
}

/// Caller values never appear in the SQL text, only in the parameter map.
#[test]
fn test_values_never_interpolated() {
    let hostile = "x' OR '1'='1".to_string();
    let model = FilterModel::new(SAMPLE_FIELDS)
        .bind("external_id", FilterExpression::new().eq(hostile.clone()))
        .unwrap();
    let compiled = compile(&model, None).unwrap();

    assert!(!compiled.sql.contains("OR '1'"));
    assert_eq!(compiled.params["external_id_eq"], json!(hostile));
}

/// Parameter names are stable for identical models across compiles.
#[test]
fn test_compilation_is_deterministic() {
    let build = || {
        FilterModel::new(SAMPLE_FIELDS)
            .bind("type", FilterExpression::new().eq("blood".to_string()))
            .unwrap()
            .bind("id", FilterExpression::new().in_list(vec![3, 1, 2]))
            .unwrap()
            .bind_meta("meta", "site", FilterExpression::new().eq("PCH".to_string()))
            .unwrap()
    };
    let a = compile(&build(), None).unwrap();
    let b = compile(&build(), None).unwrap();
    assert_eq!(a.sql, b.sql);
    assert_eq!(a.params, b.params);
}

// =============================================================================
// Validation
// =============================================================================

/// An override for an undeclared field fails at compile time, not as a
/// silent no-op.
#[test]
fn test_unknown_override_is_an_error() {
    let model = FilterModel::new(SAMPLE_FIELDS);
    let overrides = HashMap::from([("participant_id".to_string(), "p.id".to_string())]);
    assert!(matches!(
        compile(&model, Some(&overrides)),
        Err(FilterError::UnknownOverride { .. })
    ));
}

/// A meta subkey carrying a quote is rejected before any SQL is built.
#[test]
fn test_meta_path_injection_rejected() {
    let result = FilterModel::new(SAMPLE_FIELDS).bind_meta(
        "meta",
        "site') = 'x' OR ('1",
        FilterExpression::new().eq("y".to_string()),
    );
    assert!(matches!(result, Err(FilterError::IllegalMetaKey { .. })));
}

/// A one-element sequence bound where a scalar was intended fails loudly.
#[test]
fn test_ambiguous_single_element_sequence_rejected() {
    let result = FilterModel::new(SAMPLE_FIELDS).bind("id", FilterExpression::new().eq(vec![5]));
    assert!(matches!(result, Err(FilterError::AmbiguousOperand { .. })));
}
