//! Shadow-fleet risk scoring.
//!
//! Confirmed shadow-fleet vessels and a large unlabeled population are
//! normalised into typed records, a class-balanced random forest is trained
//! on them, and every unlabeled vessel receives a probability of belonging to
//! the shadow fleet together with aggregate model-quality figures.
pub mod api;
pub mod common;
pub mod data;
pub mod evaluation;
pub mod inference;
pub mod training;

pub use common::{FleetCode, FleetError, FleetResult};
