//! Reference datasets and schema inference

use super::{Record, Value};
use crate::error::{CeterisError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static MISSING: Value = Value::Missing;

/// Declared kind of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Continuous,
    Categorical,
}

/// A named field of the schema
///
/// `kind` is `None` when it could not be inferred (all-missing or mixed column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: Option<VariableKind>,
}

/// Ordered field list resolved once per dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Resolved kind of a variable
    pub fn kind(&self, name: &str) -> Result<VariableKind> {
        let field = self
            .field(name)
            .ok_or_else(|| CeterisError::unsupported(name, "not present in reference data"))?;
        field.kind.ok_or_else(|| {
            CeterisError::unsupported(name, "kind cannot be inferred (all missing or mixed values)")
        })
    }
}

/// Reference dataset: rows of records plus their inferred schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Record>,
}

impl Dataset {
    /// Build a dataset, inferring each field's kind from its non-missing values
    pub fn new(rows: Vec<Record>) -> Self {
        let mut names: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for row in &rows {
            for name in row.names() {
                if seen.insert(name.to_string()) {
                    names.push(name.to_string());
                }
            }
        }

        let fields = names
            .into_iter()
            .map(|name| {
                let kind = infer_kind(rows.iter().map(|r| r.get(&name).unwrap_or(&MISSING)));
                Field { name, kind }
            })
            .collect();

        Self {
            schema: Schema { fields },
            rows,
        }
    }

    /// Declare a field's kind explicitly
    ///
    /// Continuous fields must hold only numbers (or missing values). Any
    /// non-missing values may be declared categorical, e.g. integer codes.
    pub fn with_kind(mut self, name: &str, kind: VariableKind) -> Result<Self> {
        if kind == VariableKind::Continuous {
            let non_numeric = self
                .column(name)
                .any(|v| !matches!(v, Value::Number(_) | Value::Missing));
            if non_numeric {
                return Err(CeterisError::ConfigurationError(format!(
                    "variable '{}' holds non-numeric values and cannot be declared continuous",
                    name
                )));
            }
        }

        let field = self
            .schema
            .fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| {
                CeterisError::ConfigurationError(format!("unknown variable '{}'", name))
            })?;
        field.kind = Some(kind);
        Ok(self)
    }

    /// Convert a polars DataFrame
    ///
    /// Numeric columns become continuous, string/categorical/boolean columns
    /// become categorical and nulls become [`Value::Missing`].
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let mut rows = vec![Record::new(); df.height()];
        let mut kinds = Vec::with_capacity(df.width());

        for col in df.get_columns() {
            let name = col.name().to_string();
            let series = col.as_materialized_series();

            match series.dtype() {
                DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Float32
                | DataType::Float64 => {
                    let casted = series.cast(&DataType::Float64)?;
                    for (row, v) in rows.iter_mut().zip(casted.f64()?.into_iter()) {
                        row.insert(name.clone(), v.map_or(Value::Missing, Value::Number));
                    }
                    kinds.push((name, VariableKind::Continuous));
                }
                DataType::String | DataType::Categorical(_, _) | DataType::Boolean => {
                    let casted = series.cast(&DataType::String)?;
                    for (row, v) in rows.iter_mut().zip(casted.str()?.into_iter()) {
                        row.insert(name.clone(), v.map_or(Value::Missing, Value::from));
                    }
                    kinds.push((name, VariableKind::Categorical));
                }
                other => {
                    return Err(CeterisError::DataError(format!(
                        "column '{}' has unsupported dtype {:?}",
                        name, other
                    )));
                }
            }
        }

        let mut dataset = Self::new(rows);
        for (name, kind) in kinds {
            // all-null columns stay uninferred
            if dataset.column(&name).any(|v| !v.is_missing()) {
                dataset = dataset.with_kind(&name, kind)?;
            }
        }
        Ok(dataset)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Record> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of a column in row order (absent fields read as missing)
    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows
            .iter()
            .map(move |r| r.get(name).unwrap_or(&MISSING))
    }

    /// Non-missing finite numeric values of a column
    pub fn numeric_column(&self, name: &str) -> Vec<f64> {
        self.column(name)
            .filter_map(Value::as_number)
            .filter(|x| x.is_finite())
            .collect()
    }

    /// Drop a column, returning its values (used to split off a response column)
    pub fn take_column(&mut self, name: &str) -> Result<Vec<Value>> {
        if self.schema.field(name).is_none() {
            return Err(CeterisError::DataError(format!("column '{}' not found", name)));
        }
        let values = self
            .rows
            .iter_mut()
            .map(|r| r.remove(name).unwrap_or(Value::Missing))
            .collect();
        self.schema.fields.retain(|f| f.name != name);
        Ok(values)
    }
}

fn infer_kind<'a>(values: impl Iterator<Item = &'a Value>) -> Option<VariableKind> {
    let mut kind = None;
    for value in values {
        let this = match value {
            Value::Number(_) => VariableKind::Continuous,
            Value::Category(_) => VariableKind::Categorical,
            Value::Missing => continue,
        };
        match kind {
            None => kind = Some(this),
            Some(k) if k != this => return None,
            _ => {}
        }
    }
    kind
}
