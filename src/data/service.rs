//! Service layer responsible for normalising raw vessel tables.
//!
//! Malformed values are expected in scraped input: every coercion here turns
//! garbage into `None` and bumps a counter instead of failing.

use std::collections::{BTreeSet, HashSet};

use tracing::{info, warn};

use super::domain::{Column, Label, RawTable, VesselFrame, VesselRecord, UNKNOWN};

/// Counters describing what normalisation had to absorb.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NormalizeReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub dropped_missing_imo: usize,
    pub duplicate_imo: usize,
    pub coerced_nulls: usize,
    pub lossy_cells: usize,
}

/// Coerce a raw token to a finite number; anything unparseable becomes `None`.
///
/// Accepts surrounding whitespace and `,` thousands separators.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Split a combined `length / width` field on its first `/`.
///
/// Each half may carry a trailing unit (`"32 m"`). Absent, malformed or
/// separator-less input yields `(None, None)`.
pub fn split_size(raw: &str) -> (Option<f64>, Option<f64>) {
    match raw.split_once('/') {
        Some((length, width)) => (parse_dimension(length), parse_dimension(width)),
        None => (None, None),
    }
}

fn parse_dimension(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_end_matches(|c: char| c.is_ascii_alphabetic());
    parse_numeric(trimmed)
}

/// Canonical categorical value: blank and the `-` placeholder collapse to `Unknown`.
pub fn canonical_category(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Normalise an IMO token.
///
/// Integer renderings (`"9282041.0"`) are reduced to their digits; any other
/// text is kept as-is after trimming. Empty input yields `None`.
pub fn normalize_imo(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
            Some(format!("{}", v as i64))
        }
        _ => Some(trimmed.to_string()),
    }
}

/// Turn one raw table into labelled records.
///
/// Every row receives `label`; the content is never inspected to infer it.
/// Within the table the first occurrence of an IMO wins.
pub fn normalize(table: &RawTable, label: Label, reference_year: i32) -> (VesselFrame, NormalizeReport) {
    let idx = |name: &str| table.column_index(name);
    let imo_idx = idx("IMO");
    let name_idx = idx("Name");
    let type_idx = idx("Type");
    let flag_idx = idx("Flag");
    let built_idx = idx("Built");
    let gt_idx = idx("GT");
    let dwt_idx = idx("DWT");
    let size_idx = idx("Size");

    let columns: BTreeSet<Column> = Column::ALL
        .into_iter()
        .filter(|c| idx(c.raw_source()).is_some())
        .collect();

    let mut report = NormalizeReport {
        rows_in: table.rows.len(),
        lossy_cells: table.lossy_cells,
        ..NormalizeReport::default()
    };
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(table.rows.len());

    for row in &table.rows {
        let cell = |i: Option<usize>| i.and_then(|i| row.get(i)).map(String::as_str);

        let Some(imo) = cell(imo_idx).and_then(normalize_imo) else {
            report.dropped_missing_imo += 1;
            continue;
        };
        if !seen.insert(imo.clone()) {
            report.duplicate_imo += 1;
            continue;
        }

        let mut number = |i: Option<usize>| -> Option<f64> {
            let raw = cell(i)?;
            let value = parse_numeric(raw);
            if value.is_none() {
                report.coerced_nulls += 1;
            }
            value
        };

        let mut record = VesselRecord::new(imo, label);
        record.built = number(built_idx);
        record.gt = number(gt_idx);
        record.dwt = number(dwt_idx);
        record.age = record.built.map(|b| f64::from(reference_year) - b);

        if let Some(raw) = cell(size_idx) {
            let (length, width) = split_size(raw);
            report.coerced_nulls += usize::from(length.is_none()) + usize::from(width.is_none());
            record.length = length;
            record.width = width;
        }

        if name_idx.is_some() {
            record.name = Some(canonical_category(cell(name_idx).unwrap_or_default()));
        }
        if type_idx.is_some() {
            record.vessel_type = Some(canonical_category(cell(type_idx).unwrap_or_default()));
        }
        if flag_idx.is_some() {
            record.flag = Some(canonical_category(cell(flag_idx).unwrap_or_default()));
        }

        records.push(record);
    }

    report.rows_out = records.len();
    if report.dropped_missing_imo > 0 || report.duplicate_imo > 0 {
        warn!(
            label = ?label,
            dropped_missing_imo = report.dropped_missing_imo,
            duplicate_imo = report.duplicate_imo,
            "rows removed during normalisation"
        );
    }
    info!(
        label = ?label,
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        coerced_nulls = report.coerced_nulls,
        lossy_cells = report.lossy_cells,
        "normalised batch"
    );

    (VesselFrame::new(records, columns), report)
}

/// Training and scoring frames built from the two labelled batches.
#[derive(Clone, Debug)]
pub struct PreparedData {
    /// Confirmed positives followed by the unlabeled pool, unique by IMO.
    pub training: VesselFrame,
    /// Confirmed positives only.
    pub positives: VesselFrame,
    /// Unlabeled pool with confirmed vessels removed.
    pub unlabeled: VesselFrame,
}

/// Drop unlabeled rows whose IMO is a confirmed positive and concatenate.
///
/// The confirmed label always wins a cross-batch collision. The training
/// frame only claims columns both batches carried.
pub fn prepare(positives: VesselFrame, unlabeled: VesselFrame) -> PreparedData {
    let before = unlabeled.len();
    let kept: Vec<VesselRecord> = {
        let confirmed: HashSet<&str> = positives.records.iter().map(|r| r.imo.as_str()).collect();
        unlabeled
            .records
            .into_iter()
            .filter(|r| !confirmed.contains(r.imo.as_str()))
            .collect()
    };
    if kept.len() != before {
        info!(
            removed = before - kept.len(),
            "removed confirmed vessels from unlabeled pool"
        );
    }

    let unlabeled = VesselFrame::new(kept, unlabeled.columns);
    let columns: BTreeSet<Column> = positives
        .columns
        .intersection(&unlabeled.columns)
        .copied()
        .collect();
    let mut records = positives.records.clone();
    records.extend(unlabeled.records.iter().cloned());

    PreparedData {
        training: VesselFrame::new(records, columns),
        positives,
        unlabeled,
    }
}
