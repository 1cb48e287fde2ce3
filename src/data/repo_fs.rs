//! CSV-backed repository for raw vessel input and scored output.

use std::borrow::Cow;
use std::fs::{self, File};
use std::path::Path;

use serde::Serialize;

use crate::common::error::FleetResult;

use super::domain::{RawTable, VesselRecord, VesselRepo};

/// Reads scraper exports and writes the scored snapshot the dashboard consumes.
#[derive(Default)]
pub struct FsVesselRepo;

impl FsVesselRepo {
    pub fn new() -> Self {
        Self
    }
}

/// Output column names, in order. Part of the dashboard contract.
pub const SCORED_HEADER: [&str; 11] = [
    "IMO",
    "Name",
    "Type",
    "Flag",
    "Built",
    "Age",
    "GT",
    "DWT",
    "Length",
    "Width",
    "Shadow_Probability",
];

/// Output row layout; field order matches `SCORED_HEADER`.
#[derive(Serialize)]
struct ScoredRow<'a> {
    #[serde(rename = "IMO")]
    imo: &'a str,
    #[serde(rename = "Name")]
    name: Option<&'a str>,
    #[serde(rename = "Type")]
    vessel_type: Option<&'a str>,
    #[serde(rename = "Flag")]
    flag: Option<&'a str>,
    #[serde(rename = "Built")]
    built: Option<f64>,
    #[serde(rename = "Age")]
    age: Option<f64>,
    #[serde(rename = "GT")]
    gt: Option<f64>,
    #[serde(rename = "DWT")]
    dwt: Option<f64>,
    #[serde(rename = "Length")]
    length: Option<f64>,
    #[serde(rename = "Width")]
    width: Option<f64>,
    #[serde(rename = "Shadow_Probability")]
    shadow_probability: Option<f64>,
}

impl<'a> From<&'a VesselRecord> for ScoredRow<'a> {
    fn from(r: &'a VesselRecord) -> Self {
        Self {
            imo: &r.imo,
            name: r.name.as_deref(),
            vessel_type: r.vessel_type.as_deref(),
            flag: r.flag.as_deref(),
            built: r.built,
            age: r.age,
            gt: r.gt,
            dwt: r.dwt,
            length: r.length,
            width: r.width,
            shadow_probability: r.shadow_probability,
        }
    }
}

impl VesselRepo for FsVesselRepo {
    fn load_raw(&self, path: &Path) -> FleetResult<RawTable> {
        let file = File::open(path)?;
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
        let mut lossy_cells = 0;

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| {
                let (text, lossy) = lossy_field(h);
                lossy_cells += usize::from(lossy);
                text.trim().trim_start_matches('\u{feff}').to_string()
            })
            .collect();

        let mut rows = Vec::new();
        for record in reader.byte_records() {
            let record = record?;
            let row: Vec<String> = record
                .iter()
                .map(|field| {
                    let (text, lossy) = lossy_field(field);
                    lossy_cells += usize::from(lossy);
                    text
                })
                .collect();
            rows.push(row);
        }

        Ok(RawTable {
            headers,
            rows,
            lossy_cells,
        })
    }

    fn write_scored(&self, path: &Path, records: &[VesselRecord]) -> FleetResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        writer.write_record(SCORED_HEADER)?;
        for record in records {
            writer.serialize(ScoredRow::from(record))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Decode a field, replacing invalid UTF-8. Reports whether anything was replaced.
fn lossy_field(raw: &[u8]) -> (String, bool) {
    match String::from_utf8_lossy(raw) {
        Cow::Borrowed(text) => (text.to_string(), false),
        Cow::Owned(text) => (text, true),
    }
}
