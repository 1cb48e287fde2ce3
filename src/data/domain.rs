//! Core vessel definitions, the declared feature schema and repository contracts.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::error::{FleetError, FleetResult};

/// Sentinel used for every missing or placeholder categorical value.
pub const UNKNOWN: &str = "Unknown";

/// Which input file a record came from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Background population, used as noisy negatives.
    Unlabeled,
    /// Confirmed shadow-fleet vessel.
    Shadow,
}

impl Label {
    /// Numeric label stored in `is_shadow`.
    pub fn as_flag(self) -> u8 {
        match self {
            Label::Unlabeled => 0,
            Label::Shadow => 1,
        }
    }
}

/// One row of the working dataset after normalisation.
#[derive(Clone, Debug, PartialEq)]
pub struct VesselRecord {
    pub imo: String,
    pub name: Option<String>,
    pub vessel_type: Option<String>,
    pub flag: Option<String>,
    pub built: Option<f64>,
    pub age: Option<f64>,
    pub gt: Option<f64>,
    pub dwt: Option<f64>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub is_shadow: u8,
    pub shadow_probability: Option<f64>,
}

impl VesselRecord {
    /// Empty record carrying only its identifier and label.
    pub fn new(imo: impl Into<String>, label: Label) -> Self {
        Self {
            imo: imo.into(),
            name: None,
            vessel_type: None,
            flag: None,
            built: None,
            age: None,
            gt: None,
            dwt: None,
            length: None,
            width: None,
            is_shadow: label.as_flag(),
            shadow_probability: None,
        }
    }

    /// Typed view of one normalised column.
    pub fn value(&self, column: Column) -> FieldValue<'_> {
        match column {
            Column::Name => FieldValue::Text(self.name.as_deref()),
            Column::Type => FieldValue::Text(self.vessel_type.as_deref()),
            Column::Flag => FieldValue::Text(self.flag.as_deref()),
            Column::Built => FieldValue::Number(self.built),
            Column::Age => FieldValue::Number(self.age),
            Column::Gt => FieldValue::Number(self.gt),
            Column::Dwt => FieldValue::Number(self.dwt),
            Column::Length => FieldValue::Number(self.length),
            Column::Width => FieldValue::Number(self.width),
        }
    }
}

/// Borrowed value of a single column.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FieldValue<'a> {
    Number(Option<f64>),
    Text(Option<&'a str>),
}

/// Catalogue of columns the normalizer produces.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Column {
    Name,
    Type,
    Flag,
    Built,
    Age,
    Gt,
    Dwt,
    Length,
    Width,
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::Name,
        Column::Type,
        Column::Flag,
        Column::Built,
        Column::Age,
        Column::Gt,
        Column::Dwt,
        Column::Length,
        Column::Width,
    ];

    /// Canonical display name, also used as the output CSV header.
    pub fn as_str(self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::Type => "Type",
            Column::Flag => "Flag",
            Column::Built => "Built",
            Column::Age => "Age",
            Column::Gt => "GT",
            Column::Dwt => "DWT",
            Column::Length => "Length",
            Column::Width => "Width",
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn from_name(name: &str) -> Option<Column> {
        let name = name.trim();
        Column::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
    }

    /// Raw input header this column is derived from.
    pub fn raw_source(self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::Type => "Type",
            Column::Flag => "Flag",
            Column::Built | Column::Age => "Built",
            Column::Gt => "GT",
            Column::Dwt => "DWT",
            Column::Length | Column::Width => "Size",
        }
    }

    /// Whether values are free text rather than numbers.
    pub fn is_text(self) -> bool {
        matches!(self, Column::Name | Column::Type | Column::Flag)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a feature is presented to the classifier.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Median-imputed pass-through.
    Numeric,
    /// Constant-filled, then expanded into indicator columns.
    Categorical,
}

impl FeatureKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "numeric" | "num" => Some(FeatureKind::Numeric),
            "categorical" | "cat" => Some(FeatureKind::Categorical),
            _ => None,
        }
    }
}

/// One declared feature.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub column: Column,
    pub kind: FeatureKind,
}

impl FeatureSpec {
    pub fn new(column: Column, kind: FeatureKind) -> FleetResult<Self> {
        if column.is_text() && kind == FeatureKind::Numeric {
            return Err(FleetError::schema(format!(
                "text column {column} cannot be declared numeric"
            )));
        }
        Ok(Self {
            name: column.as_str().to_string(),
            column,
            kind,
        })
    }
}

/// Ordered, explicitly typed list of features the model consumes.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    specs: Vec<FeatureSpec>,
}

impl FeatureSchema {
    pub fn new(specs: Vec<FeatureSpec>) -> FleetResult<Self> {
        let mut seen = BTreeSet::new();
        for spec in &specs {
            if !seen.insert(spec.column) {
                return Err(FleetError::schema(format!(
                    "feature {} is declared twice",
                    spec.name
                )));
            }
        }
        Ok(Self { specs })
    }

    /// Parse `Name:kind` pairs separated by commas, e.g. `Flag:categorical,GT:numeric`.
    pub fn parse(raw: &str) -> FleetResult<Self> {
        let mut specs = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, kind) = entry
                .split_once(':')
                .ok_or_else(|| FleetError::schema(format!("{entry:?} is not name:kind")))?;
            let column = Column::from_name(name)
                .ok_or_else(|| FleetError::schema(format!("unknown feature {:?}", name.trim())))?;
            let kind = FeatureKind::parse(kind).ok_or_else(|| {
                FleetError::schema(format!("unknown feature kind {:?}", kind.trim()))
            })?;
            specs.push(FeatureSpec::new(column, kind)?);
        }
        Self::new(specs)
    }

    /// Declared features in model order.
    pub fn specs(&self) -> &[FeatureSpec] {
        &self.specs
    }

    /// Feature names in model order.
    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of declared features.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// A batch of normalised records plus the columns its source actually carried.
#[derive(Clone, Debug, Default)]
pub struct VesselFrame {
    pub records: Vec<VesselRecord>,
    pub columns: BTreeSet<Column>,
}

impl VesselFrame {
    pub fn new(records: Vec<VesselRecord>, columns: BTreeSet<Column>) -> Self {
        Self { records, columns }
    }

    /// Frame that claims every catalogued column.
    pub fn complete(records: Vec<VesselRecord>) -> Self {
        Self::new(records, Column::ALL.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fail when any schema feature was never produced for this frame.
    pub fn require(&self, schema: &FeatureSchema) -> FleetResult<()> {
        let missing: Vec<&str> = schema
            .specs()
            .iter()
            .filter(|s| !self.columns.contains(&s.column))
            .map(|s| s.name.as_str())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FleetError::schema(format!(
                "feature column(s) absent from input: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn count_label(&self, label: Label) -> usize {
        self.records
            .iter()
            .filter(|r| r.is_shadow == label.as_flag())
            .count()
    }
}

/// Raw tabular input exactly as read from disk.
#[derive(Clone, Debug, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Cells (headers included) whose invalid UTF-8 was replaced on read.
    pub lossy_cells: usize,
}

impl RawTable {
    /// Case-insensitive header position.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }
}

/// Repository contract for vessel file persistence.
pub trait VesselRepo {
    fn load_raw(&self, path: &Path) -> FleetResult<RawTable>;
    fn write_scored(&self, path: &Path, records: &[VesselRecord]) -> FleetResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_parses_declared_kinds() {
        let schema = FeatureSchema::parse("flag:categorical, gt:numeric, Built:cat").unwrap();
        assert_eq!(schema.names(), vec!["Flag", "GT", "Built"]);
        assert_eq!(schema.specs()[2].kind, FeatureKind::Categorical);
    }

    #[test]
    fn schema_rejects_bad_entries() {
        assert!(matches!(
            FeatureSchema::parse("Owner:categorical"),
            Err(FleetError::Schema(_))
        ));
        assert!(matches!(
            FeatureSchema::parse("Flag:numeric"),
            Err(FleetError::Schema(_))
        ));
        assert!(matches!(
            FeatureSchema::parse("Flag:categorical,flag:categorical"),
            Err(FleetError::Schema(_))
        ));
        assert!(matches!(FeatureSchema::parse("Flag"), Err(FleetError::Schema(_))));
    }

    #[test]
    fn frame_reports_absent_columns() {
        let mut columns: BTreeSet<Column> = Column::ALL.into_iter().collect();
        columns.remove(&Column::Length);
        columns.remove(&Column::Width);
        let frame = VesselFrame::new(Vec::new(), columns);
        let schema = FeatureSchema::parse("Flag:categorical,Length:numeric").unwrap();
        let err = frame.require(&schema).unwrap_err();
        assert!(err.to_string().contains("Length"));
    }
}
