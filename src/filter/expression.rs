//! Filter expressions
//!
//! A [`FilterExpression`] is a set of mutually ANDed optional operator
//! constraints over one field. Typed expressions are erased to
//! [`ErasedFilter`] (operands as `serde_json::Value`) when bound into a
//! model; raw erased filters can also be deserialized straight from request
//! JSON and pass through the same shape validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{FilterError, FilterResult};

/// Operator constraints over one field.
///
/// All constraints AND together. An expression with no populated operator
/// is considered absent and is not emitted when bound into a model.
#[derive(Debug, Clone)]
pub struct FilterExpression<T> {
    eq: Option<T>,
    neq: Option<T>,
    in_list: Option<Vec<T>>,
    not_in: Option<Vec<T>>,
    gt: Option<T>,
    gte: Option<T>,
    lt: Option<T>,
    lte: Option<T>,
    contains: Option<T>,
    startswith: Option<T>,
    is_null: Option<bool>,
}

impl<T> Default for FilterExpression<T> {
    fn default() -> Self {
        Self {
            eq: None,
            neq: None,
            in_list: None,
            not_in: None,
            gt: None,
            gte: None,
            lt: None,
            lte: None,
            contains: None,
            startswith: None,
            is_null: None,
        }
    }
}

impl<T> FilterExpression<T> {
    /// Creates an empty expression; populate it with the operator builders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Equality constraint.
    pub fn eq(mut self, value: T) -> Self {
        self.eq = Some(value);
        self
    }

    /// Inequality constraint.
    pub fn neq(mut self, value: T) -> Self {
        self.neq = Some(value);
        self
    }

    /// Membership constraint. The operand is a list by construction here;
    /// raw filters are validated for list shape when bound.
    pub fn in_list(mut self, values: Vec<T>) -> Self {
        self.in_list = Some(values);
        self
    }

    /// Non-membership constraint.
    pub fn not_in(mut self, values: Vec<T>) -> Self {
        self.not_in = Some(values);
        self
    }

    /// Strictly-greater constraint.
    pub fn gt(mut self, value: T) -> Self {
        self.gt = Some(value);
        self
    }

    /// Greater-or-equal constraint.
    pub fn gte(mut self, value: T) -> Self {
        self.gte = Some(value);
        self
    }

    /// Strictly-less constraint.
    pub fn lt(mut self, value: T) -> Self {
        self.lt = Some(value);
        self
    }

    /// Less-or-equal constraint.
    pub fn lte(mut self, value: T) -> Self {
        self.lte = Some(value);
        self
    }

    /// Substring constraint (string fields only).
    pub fn contains(mut self, value: T) -> Self {
        self.contains = Some(value);
        self
    }

    /// Prefix constraint (string fields only).
    pub fn startswith(mut self, value: T) -> Self {
        self.startswith = Some(value);
        self
    }

    /// Null / not-null constraint.
    pub fn is_null(mut self, null: bool) -> Self {
        self.is_null = Some(null);
        self
    }
}

impl<T: Serialize> FilterExpression<T> {
    /// Erases operands to bindable JSON values, validating shape.
    ///
    /// `field` is only used for error messages.
    pub(crate) fn erase(self, field: &str) -> FilterResult<ErasedFilter> {
        let scalar = |value: Option<T>| -> FilterResult<Option<Value>> {
            value
                .map(|v| {
                    serde_json::to_value(v).map_err(|source| FilterError::UnbindableOperand {
                        field: field.to_string(),
                        source,
                    })
                })
                .transpose()
        };
        let list = |values: Option<Vec<T>>| -> FilterResult<Option<Value>> {
            values
                .map(|v| {
                    serde_json::to_value(v).map_err(|source| FilterError::UnbindableOperand {
                        field: field.to_string(),
                        source,
                    })
                })
                .transpose()
        };

        let erased = ErasedFilter {
            eq: scalar(self.eq)?,
            neq: scalar(self.neq)?,
            in_list: list(self.in_list)?,
            not_in: list(self.not_in)?,
            gt: scalar(self.gt)?,
            gte: scalar(self.gte)?,
            lt: scalar(self.lt)?,
            lte: scalar(self.lte)?,
            contains: scalar(self.contains)?,
            startswith: scalar(self.startswith)?,
            is_null: self.is_null,
        };
        erased.validate(field)?;
        Ok(erased)
    }
}

/// A filter expression with operands erased to JSON values.
///
/// This is the shape request deserialization produces; [`validate`]
/// enforces operand shape regardless of how the filter was built.
///
/// [`validate`]: ErasedFilter::validate
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErasedFilter {
    pub eq: Option<Value>,
    pub neq: Option<Value>,
    #[serde(rename = "in")]
    pub in_list: Option<Value>,
    #[serde(rename = "nin")]
    pub not_in: Option<Value>,
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
    pub contains: Option<Value>,
    pub startswith: Option<Value>,
    #[serde(rename = "isnull")]
    pub is_null: Option<bool>,
}

impl ErasedFilter {
    /// True if no operator is populated; absent expressions are not emitted.
    pub fn is_empty(&self) -> bool {
        self.eq.is_none()
            && self.neq.is_none()
            && self.in_list.is_none()
            && self.not_in.is_none()
            && self.gt.is_none()
            && self.gte.is_none()
            && self.lt.is_none()
            && self.lte.is_none()
            && self.contains.is_none()
            && self.startswith.is_none()
            && self.is_null.is_none()
    }

    /// Validates operand shapes.
    ///
    /// - `in`/`nin` must be lists
    /// - scalar operators reject lists; a one-element list is called out as
    ///   the trailing-comma footgun
    /// - `contains`/`startswith` must be strings
    pub fn validate(&self, field: &str) -> FilterResult<()> {
        for (operator, operand) in [("in", &self.in_list), ("nin", &self.not_in)] {
            if let Some(value) = operand {
                if !value.is_array() {
                    return Err(FilterError::NonListOperand {
                        field: field.to_string(),
                        operator,
                    });
                }
            }
        }

        let scalars = [
            ("eq", &self.eq),
            ("neq", &self.neq),
            ("gt", &self.gt),
            ("gte", &self.gte),
            ("lt", &self.lt),
            ("lte", &self.lte),
        ];
        for (operator, operand) in scalars {
            if let Some(Value::Array(items)) = operand {
                if items.len() == 1 {
                    return Err(FilterError::AmbiguousOperand {
                        field: field.to_string(),
                        operator,
                    });
                }
                return Err(FilterError::NonScalarOperand {
                    field: field.to_string(),
                    operator,
                });
            }
        }

        for (operator, operand) in [("contains", &self.contains), ("startswith", &self.startswith)]
        {
            if let Some(value) = operand {
                if !value.is_string() {
                    return Err(FilterError::NonStringPattern {
                        field: field.to_string(),
                        operator,
                    });
                }
            }
        }

        Ok(())
    }
}
