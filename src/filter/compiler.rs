//! Filter compilation
//!
//! Turns a [`FilterModel`] into a `WHERE` clause plus named bound
//! parameters. Clauses AND together in binding order; operator order within
//! a field is fixed, so the same model always compiles to the same SQL and
//! the same parameter names.

use std::collections::HashMap;

use serde_json::Value;

use crate::storage::BoundParams;

use super::errors::{FilterError, FilterResult};
use super::model::{Binding, FilterModel};

/// A compiled filter: `WHERE`-clause text plus its bound parameters.
///
/// The SQL contains `:name` placeholders only; every caller-supplied value
/// lives in `params`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    pub sql: String,
    pub params: BoundParams,
}

/// Operators in emission order.
const OPERATORS: &[Op] = &[
    Op::Eq,
    Op::Neq,
    Op::In,
    Op::Nin,
    Op::Gt,
    Op::Gte,
    Op::Lt,
    Op::Lte,
    Op::Contains,
    Op::Startswith,
    Op::IsNull,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Neq,
    In,
    Nin,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    Startswith,
    IsNull,
}

impl Op {
    /// Parameter-name suffix for this operator.
    fn suffix(self) -> &'static str {
        match self {
            Op::Eq => "eq",
            Op::Neq => "neq",
            Op::In => "in",
            Op::Nin => "nin",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::Lt => "lt",
            Op::Lte => "lte",
            Op::Contains => "contains",
            Op::Startswith => "startswith",
            Op::IsNull => "isnull",
        }
    }
}

/// Compiles a model into `(sql, params)`.
///
/// `overrides` remaps a logical field name to an arbitrary qualified column
/// string, for callers that join the entity table under an alias. An
/// override key that is not a declared field is an error, not a silent
/// no-op.
///
/// A model with no populated bindings compiles to `("true", {})`: filters
/// are opt-in, never implicitly empty-string-constrained.
pub fn compile(
    model: &FilterModel,
    overrides: Option<&HashMap<String, String>>,
) -> FilterResult<CompiledFilter> {
    if let Some(map) = overrides {
        for key in map.keys() {
            if !model.schema().iter().any(|f| f.name == key) {
                return Err(FilterError::UnknownOverride { field: key.clone() });
            }
        }
    }

    let mut clauses: Vec<String> = Vec::new();
    let mut params = BoundParams::new();

    for binding in model.bindings() {
        let column = resolve_column(binding, overrides);
        let param_base = param_base(binding, overrides);
        compile_binding(binding, &column, &param_base, &mut clauses, &mut params);
    }

    if clauses.is_empty() {
        return Ok(CompiledFilter {
            sql: "true".to_string(),
            params: BoundParams::new(),
        });
    }

    Ok(CompiledFilter {
        sql: clauses.join(" AND "),
        params,
    })
}

/// Column reference emitted into SQL. For meta bindings this is a JSON path
/// extraction; the subkey was already rejected if it carried a quote.
fn resolve_column(binding: &Binding, overrides: Option<&HashMap<String, String>>) -> String {
    let base = overrides
        .and_then(|map| map.get(binding.name))
        .map(String::as_str)
        .unwrap_or(binding.column);

    match &binding.meta_key {
        Some(key) => format!("JSON_EXTRACT({base}, '$.{key}')"),
        None => base.to_string(),
    }
}

/// Base of the generated parameter names for one binding.
///
/// Derived from the resolved column (meta bindings use `field_subkey`, the
/// logical address of what is being constrained), then sanitized to a safe
/// identifier charset.
fn param_base(binding: &Binding, overrides: Option<&HashMap<String, String>>) -> String {
    let raw = match &binding.meta_key {
        Some(key) => format!("{}_{}", binding.name, key),
        None => overrides
            .and_then(|map| map.get(binding.name))
            .map(String::as_str)
            .unwrap_or(binding.column)
            .to_string(),
    };
    sanitize_identifier(&raw)
}

/// Maps non-alphanumeric characters to `_` and prefixes a leading digit so
/// the result is always a legal bind-parameter identifier.
fn sanitize_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 1);
    for (i, c) in raw.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            out.push('p');
        }
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out
}

/// Reserves a parameter name, appending a numeric suffix on collision so
/// names are unique within one compile call.
fn reserve_param(params: &mut BoundParams, base: &str, op: Op, value: Value) -> String {
    let mut name = format!("{base}_{}", op.suffix());
    let mut n = 1;
    while params.contains_key(&name) {
        n += 1;
        name = format!("{base}_{}_{n}", op.suffix());
    }
    params.insert(name.clone(), value);
    name
}

fn compile_binding(
    binding: &Binding,
    column: &str,
    param_base: &str,
    clauses: &mut Vec<String>,
    params: &mut BoundParams,
) {
    let filter = &binding.filter;
    for &op in OPERATORS {
        match op {
            Op::Eq => {
                if let Some(value) = &filter.eq {
                    let p = reserve_param(params, param_base, op, value.clone());
                    clauses.push(format!("{column} = :{p}"));
                }
            }
            Op::Neq => {
                if let Some(value) = &filter.neq {
                    let p = reserve_param(params, param_base, op, value.clone());
                    clauses.push(format!("{column} != :{p}"));
                }
            }
            Op::In => {
                if let Some(Value::Array(items)) = &filter.in_list {
                    match items.as_slice() {
                        // Explicitly matches no rows; an empty membership
                        // list must never compile to an unconstrained clause.
                        [] => clauses.push("1 = 0".to_string()),
                        // Single-element membership reduces to equality.
                        [single] => {
                            let p = reserve_param(params, param_base, op, single.clone());
                            clauses.push(format!("{column} = :{p}"));
                        }
                        _ => {
                            let p =
                                reserve_param(params, param_base, op, Value::Array(items.clone()));
                            clauses.push(format!("{column} IN :{p}"));
                        }
                    }
                }
            }
            Op::Nin => {
                if let Some(Value::Array(items)) = &filter.not_in {
                    if items.is_empty() {
                        // Excluding nothing excludes no rows.
                        clauses.push("1 = 1".to_string());
                    } else {
                        let p = reserve_param(params, param_base, op, Value::Array(items.clone()));
                        clauses.push(format!("{column} NOT IN :{p}"));
                    }
                }
            }
            Op::Gt => {
                if let Some(value) = &filter.gt {
                    let p = reserve_param(params, param_base, op, value.clone());
                    clauses.push(format!("{column} > :{p}"));
                }
            }
            Op::Gte => {
                if let Some(value) = &filter.gte {
                    let p = reserve_param(params, param_base, op, value.clone());
                    clauses.push(format!("{column} >= :{p}"));
                }
            }
            Op::Lt => {
                if let Some(value) = &filter.lt {
                    let p = reserve_param(params, param_base, op, value.clone());
                    clauses.push(format!("{column} < :{p}"));
                }
            }
            Op::Lte => {
                if let Some(value) = &filter.lte {
                    let p = reserve_param(params, param_base, op, value.clone());
                    clauses.push(format!("{column} <= :{p}"));
                }
            }
            Op::Contains => {
                if let Some(value) = &filter.contains {
                    let p = reserve_param(params, param_base, op, value.clone());
                    clauses.push(format!("{column} LIKE CONCAT('%', :{p}, '%')"));
                }
            }
            Op::Startswith => {
                if let Some(value) = &filter.startswith {
                    let p = reserve_param(params, param_base, op, value.clone());
                    clauses.push(format!("{column} LIKE CONCAT(:{p}, '%')"));
                }
            }
            Op::IsNull => {
                if let Some(null) = filter.is_null {
                    if null {
                        clauses.push(format!("{column} IS NULL"));
                    } else {
                        clauses.push(format!("{column} IS NOT NULL"));
                    }
                }
            }
        }
    }
}
