//! Inference domain: probability scoring and candidate selection.

pub mod service;

pub use service::{score, select_candidates};
