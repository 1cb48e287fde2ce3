//! Data domain: reading scraper exports and normalising them into typed vessel records.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{Column, FeatureKind, FeatureSchema, FeatureSpec, Label, VesselFrame, VesselRecord};
pub use service::{NormalizeReport, PreparedData};
