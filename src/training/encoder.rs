//! Preprocessing stage: median imputation for numeric features, constant fill
//! plus indicator expansion for categorical ones.
//!
//! All statistics are frozen at fit time. Every encoded column remembers the
//! schema feature it came from, so importances can be folded back without
//! parsing column labels.

use serde::{Deserialize, Serialize};

use crate::data::domain::{FeatureKind, FeatureSchema, FeatureSpec, FieldValue, VesselRecord, UNKNOWN};
use crate::data::service::{canonical_category, parse_numeric};

/// Frozen per-feature transform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Transform {
    Numeric { median: f64, observed: usize },
    Categorical { categories: Vec<String>, observed: usize },
}

impl Transform {
    /// Number of training rows that carried a real value for this feature.
    pub fn observed(&self) -> usize {
        match self {
            Transform::Numeric { observed, .. } | Transform::Categorical { observed, .. } => {
                *observed
            }
        }
    }

    fn width(&self) -> usize {
        match self {
            Transform::Numeric { .. } => 1,
            Transform::Categorical { categories, .. } => categories.len(),
        }
    }
}

/// One column of the encoded matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncodedColumn {
    /// Index into the schema of the feature this column belongs to.
    pub base: usize,
    /// Human readable label, e.g. `GT` or `Flag=Gabon`.
    pub label: String,
}

/// Fitted preprocessing for a fixed feature schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    schema: FeatureSchema,
    transforms: Vec<Transform>,
    columns: Vec<EncodedColumn>,
}

fn numeric_value(value: FieldValue<'_>) -> Option<f64> {
    match value {
        FieldValue::Number(v) => v,
        FieldValue::Text(s) => s.and_then(parse_numeric),
    }
}

/// Category text after constant fill; `None` means the value was missing.
fn category_value(value: FieldValue<'_>) -> Option<String> {
    let text = match value {
        FieldValue::Text(s) => canonical_category(s?),
        FieldValue::Number(v) => format!("{}", v?),
    };
    (text != UNKNOWN).then_some(text)
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

impl FeatureEncoder {
    /// Learn medians and category vocabularies from the training rows.
    pub fn fit(schema: &FeatureSchema, records: &[VesselRecord]) -> Self {
        let mut transforms = Vec::with_capacity(schema.len());
        let mut columns = Vec::new();

        for (base, spec) in schema.specs().iter().enumerate() {
            let transform = fit_one(spec, records);
            match &transform {
                Transform::Numeric { .. } => columns.push(EncodedColumn {
                    base,
                    label: spec.name.clone(),
                }),
                Transform::Categorical { categories, .. } => {
                    columns.extend(categories.iter().map(|c| EncodedColumn {
                        base,
                        label: format!("{}={}", spec.name, c),
                    }))
                }
            }
            transforms.push(transform);
        }

        Self {
            schema: schema.clone(),
            transforms,
            columns,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn columns(&self) -> &[EncodedColumn] {
        &self.columns
    }

    /// Width of the encoded feature space.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of schema features that saw at least one real value during fit.
    pub fn usable_features(&self) -> usize {
        self.transforms.iter().filter(|t| t.observed() > 0).count()
    }

    /// Encode one record. Unseen categories encode as all zeros.
    pub fn encode_row(&self, record: &VesselRecord) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.width());
        for (spec, transform) in self.schema.specs().iter().zip(&self.transforms) {
            let value = record.value(spec.column);
            match transform {
                Transform::Numeric { median, .. } => {
                    row.push(numeric_value(value).unwrap_or(*median));
                }
                Transform::Categorical { categories, .. } => {
                    let category = category_value(value).unwrap_or_else(|| UNKNOWN.to_string());
                    let hit = categories.binary_search(&category).ok();
                    row.extend((0..categories.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
                }
            }
        }
        row
    }

    /// Encode a batch into column-major storage, the layout the forest trains on.
    pub fn encode_columns(&self, records: &[VesselRecord]) -> Vec<Vec<f64>> {
        let mut columns = vec![Vec::with_capacity(records.len()); self.width()];
        for record in records {
            for (column, value) in columns.iter_mut().zip(self.encode_row(record)) {
                column.push(value);
            }
        }
        columns
    }
}

fn fit_one(spec: &FeatureSpec, records: &[VesselRecord]) -> Transform {
    match spec.kind {
        FeatureKind::Numeric => {
            let values: Vec<f64> = records
                .iter()
                .filter_map(|r| numeric_value(r.value(spec.column)))
                .collect();
            let observed = values.len();
            Transform::Numeric {
                median: median(values).unwrap_or(0.0),
                observed,
            }
        }
        FeatureKind::Categorical => {
            let mut observed = 0;
            let mut categories: Vec<String> = records
                .iter()
                .map(|r| match category_value(r.value(spec.column)) {
                    Some(c) => {
                        observed += 1;
                        c
                    }
                    None => UNKNOWN.to_string(),
                })
                .collect();
            categories.sort();
            categories.dedup();
            Transform::Categorical {
                categories,
                observed,
            }
        }
    }
}
