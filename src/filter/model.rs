//! Filter models
//!
//! A [`FilterModel`] binds filter expressions to the named fields of one
//! entity. The set of legal fields and their default columns is a
//! `&'static` schema slice declared next to the entity layer, so the
//! compiler works from declared structure, never from runtime object shape.

use serde::Serialize;

use super::errors::{FilterError, FilterResult};
use super::expression::{ErasedFilter, FilterExpression};

/// One declared filter field: logical name and default column reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub column: &'static str,
}

/// Declares a filter field. `const`-friendly so entity layers can write
/// their schema as a `const` slice.
pub const fn field(name: &'static str, column: &'static str) -> FieldDef {
    FieldDef { name, column }
}

/// One bound field: either a plain column constraint or a meta subkey
/// constraint addressed by JSON path.
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub(crate) name: &'static str,
    pub(crate) column: &'static str,
    pub(crate) meta_key: Option<String>,
    pub(crate) filter: ErasedFilter,
}

/// An ordered set of named field bindings, compiled once then discarded.
#[derive(Debug, Clone)]
pub struct FilterModel {
    schema: &'static [FieldDef],
    bindings: Vec<Binding>,
}

impl FilterModel {
    /// Creates an empty model over the given field schema.
    pub fn new(schema: &'static [FieldDef]) -> Self {
        Self {
            schema,
            bindings: Vec::new(),
        }
    }

    /// The declared field schema.
    pub fn schema(&self) -> &'static [FieldDef] {
        self.schema
    }

    /// True if nothing is bound; compiles to an unconstrained clause.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub(crate) fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    fn lookup(&self, name: &str) -> FilterResult<&'static FieldDef> {
        self.schema
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| FilterError::UnknownField {
                field: name.to_string(),
            })
    }

    /// Binds a typed expression to a declared field. An expression with no
    /// populated operator is absent and leaves the model unchanged.
    pub fn bind<T: Serialize>(self, name: &str, expr: FilterExpression<T>) -> FilterResult<Self> {
        let erased = expr.erase(name)?;
        self.bind_erased(name, None, erased)
    }

    /// Binds an already-erased filter (e.g. deserialized from a request).
    /// Runs the same shape validation as typed binding.
    pub fn bind_raw(self, name: &str, filter: ErasedFilter) -> FilterResult<Self> {
        filter.validate(name)?;
        self.bind_erased(name, None, filter)
    }

    /// Binds a typed expression to `field[subkey]`, addressing one key of a
    /// semi-structured meta column. The subkey must not contain a quote
    /// character; the JSON path is otherwise built only from the statically
    /// declared column.
    pub fn bind_meta<T: Serialize>(
        self,
        name: &str,
        subkey: &str,
        expr: FilterExpression<T>,
    ) -> FilterResult<Self> {
        let erased = expr.erase(name)?;
        self.bind_erased(name, Some(subkey), erased)
    }

    /// Raw-filter variant of [`bind_meta`].
    ///
    /// [`bind_meta`]: FilterModel::bind_meta
    pub fn bind_meta_raw(self, name: &str, subkey: &str, filter: ErasedFilter) -> FilterResult<Self> {
        filter.validate(name)?;
        self.bind_erased(name, Some(subkey), filter)
    }

    fn bind_erased(
        mut self,
        name: &str,
        subkey: Option<&str>,
        filter: ErasedFilter,
    ) -> FilterResult<Self> {
        let def = self.lookup(name)?;

        if let Some(key) = subkey {
            if key.contains('\'') || key.contains('"') {
                return Err(FilterError::IllegalMetaKey {
                    key: key.to_string(),
                });
            }
        }

        if filter.is_empty() {
            return Ok(self);
        }

        self.bindings.push(Binding {
            name: def.name,
            column: def.column,
            meta_key: subkey.map(str::to_string),
            filter,
        });
        Ok(self)
    }
}
