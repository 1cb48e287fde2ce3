//! Public entry points used by the command line binary.

pub mod pipeline;

pub use pipeline::{run, score_file, PipelineReport, ScoreReport};
