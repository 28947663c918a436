//! Column registry and row encoder.
//!
//! Categorical values are replaced by small integer codes, minted the first
//! time a value is seen. This keeps the row store compact and gives the split
//! evaluator dense keys to group on.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::ColumnDef;
use crate::errors::{Result, RtError};

/// An ingested row: feature values in schema order, target value last.
pub type EncodedRow = Vec<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Categorical,
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Feature,
    Target,
    Excluded,
}

/// One column of the schema along with its code tables.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub role: Role,
    code_map: HashMap<String, usize>,
    inverse_code_map: Vec<String>,
}

impl ColumnSpec {
    fn from_def(def: &ColumnDef) -> Self {
        let role = if def.target {
            Role::Target
        } else if def.exclude {
            Role::Excluded
        } else {
            Role::Feature
        };
        ColumnSpec {
            name: def.name.clone(),
            kind: if def.categorical {
                ColumnKind::Categorical
            } else {
                ColumnKind::Continuous
            },
            role,
            code_map: HashMap::new(),
            inverse_code_map: Vec::new(),
        }
    }

    /// Included categorical columns are the only ones that get codes.
    pub fn is_coded(&self) -> bool {
        self.kind == ColumnKind::Categorical && self.role == Role::Feature
    }

    /// The code the next unseen value will receive.
    pub fn next_code(&self) -> usize {
        self.inverse_code_map.len()
    }

    pub fn code_of(&self, value: &str) -> Option<usize> {
        self.code_map.get(value).copied()
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.inverse_code_map.get(code).map(|s| s.as_str())
    }

    fn code_or_mint(&mut self, value: String) -> usize {
        if let Some(code) = self.code_map.get(&value) {
            return *code;
        }
        let code = self.next_code();
        self.inverse_code_map.push(value.clone());
        self.code_map.insert(value, code);
        code
    }
}

/// Text form of a categorical value. Strings are taken as they are, anything
/// else by its JSON text, so `4` and `"4"` land on the same category. Whole
/// floats are written as integers, so `4.0` lands there too.
pub fn category_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INT => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

// 2^53
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn numeric(column: &ColumnSpec, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| RtError::InvalidValue {
        column: column.name.clone(),
        found: value.to_string(),
    })
}

/// The ordered schema of the input columns.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
    /// Encoded position -> schema position, for every included non-target column.
    features: Vec<usize>,
    target: usize,
}

impl Schema {
    /// Validates `defs` and builds the schema.
    pub fn new(defs: &[ColumnDef]) -> Result<Self> {
        if defs.is_empty() {
            return Err(RtError::InvalidConfig("no columns defined".to_string()));
        }
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (i, def) in defs.iter().enumerate() {
            if let Some(first) = seen.insert(def.name.as_str(), i) {
                return Err(RtError::InvalidConfig(format!(
                    "column `{}` is defined twice (positions {} and {})",
                    def.name, first, i
                )));
            }
        }

        let targets: Vec<usize> = defs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.target)
            .map(|(i, _)| i)
            .collect();
        if targets.len() != 1 {
            return Err(RtError::InvalidConfig(format!(
                "exactly one target column is required, found {}",
                targets.len()
            )));
        }
        let target = targets[0];
        if defs[target].categorical {
            return Err(RtError::InvalidConfig(format!(
                "target column `{}` must be continuous",
                defs[target].name
            )));
        }
        if defs[target].exclude {
            return Err(RtError::InvalidConfig(format!(
                "target column `{}` cannot be excluded",
                defs[target].name
            )));
        }

        let columns: Vec<ColumnSpec> = defs.iter().map(ColumnSpec::from_def).collect();
        let features = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.role == Role::Feature)
            .map(|(i, _)| i)
            .collect();
        Ok(Schema {
            columns,
            features,
            target,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn target(&self) -> &ColumnSpec {
        &self.columns[self.target]
    }

    /// Number of feature values in an encoded row.
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Column behind the encoded position `index`.
    pub fn feature(&self, index: usize) -> &ColumnSpec {
        &self.columns[self.features[index]]
    }

    /// Encoded positions that may be split on, in ascending order.
    pub fn split_candidates(&self) -> Vec<usize> {
        (0..self.features.len())
            .filter(|&i| self.feature(i).kind == ColumnKind::Categorical)
            .collect()
    }

    fn check_arity(&self, row: &[Value]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(RtError::ArityMismatch {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        Ok(())
    }

    /// Encodes `row`, minting codes for categorical values seen for the first
    /// time. Nothing is minted unless the whole row is valid.
    pub fn encode(&mut self, row: &[Value]) -> Result<EncodedRow> {
        self.check_arity(row)?;
        let target_value = numeric(&self.columns[self.target], &row[self.target])?;
        for &i in self.features.iter() {
            let column = &self.columns[i];
            match column.kind {
                ColumnKind::Continuous => {
                    numeric(column, &row[i])?;
                }
                // null means "missing" when predicting, it cannot be a category
                ColumnKind::Categorical if row[i].is_null() => {
                    return Err(RtError::InvalidValue {
                        column: column.name.clone(),
                        found: "null".to_string(),
                    });
                }
                ColumnKind::Categorical => {}
            }
        }

        let mut encoded = Vec::with_capacity(self.features.len() + 1);
        for &i in self.features.iter() {
            let column = &mut self.columns[i];
            let v = match column.kind {
                ColumnKind::Categorical => column.code_or_mint(category_key(&row[i])) as f64,
                ColumnKind::Continuous => numeric(column, &row[i])?,
            };
            encoded.push(v);
        }
        encoded.push(target_value);
        Ok(encoded)
    }

    /// Pairs every value of `row` with its column name.
    pub fn record_from_row(&self, row: &[Value]) -> Result<Value> {
        self.check_arity(row)?;
        let record = self
            .columns
            .iter()
            .zip(row.iter())
            .map(|(c, v)| (c.name.clone(), v.clone()))
            .collect();
        Ok(Value::Object(record))
    }
}
