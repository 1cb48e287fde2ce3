use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};

use shadowfleet::common::config::{parse_threshold, AppCfg};
use shadowfleet::common::log;
use shadowfleet::{api, FleetCode, FleetError};

#[derive(Debug, Parser)]
#[command(name = "shadowfleet", about = "Score vessels for shadow-fleet risk")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Train on confirmed + unlabeled vessels, then score and export metrics.
    Run {
        #[arg(long)]
        shadow: Option<PathBuf>,
        #[arg(long)]
        unknown: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        metrics: Option<PathBuf>,
        /// Keep only vessels at or above this probability.
        #[arg(long, value_parser = threshold_arg)]
        threshold: Option<f64>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        trees: Option<usize>,
    },
    /// Score a vessel file with a previously stored model.
    Score {
        #[arg(long)]
        model: PathBuf,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_parser = threshold_arg)]
        threshold: Option<f64>,
    },
}

fn threshold_arg(raw: &str) -> Result<f64, String> {
    parse_threshold(raw).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let mut cfg = match AppCfg::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("shadowfleet: {err}");
            return ExitCode::from(err.code() as u8);
        }
    };
    log::init(&cfg);

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(usage_exit_code(&err));
        }
    };

    match execute(cli, &mut cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err
                .downcast_ref::<FleetError>()
                .map(|e| e.code() as u8)
                .unwrap_or(1);
            tracing::error!(code, "{err:#}");
            ExitCode::from(code)
        }
    }
}

/// Help and version requests succeed; any other usage error is a config error.
fn usage_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => FleetCode::InvalidConfig as u8,
    }
}

fn execute(cli: Cli, cfg: &mut AppCfg) -> anyhow::Result<()> {
    use anyhow::Context;

    match cli.command {
        Command::Run {
            shadow,
            unknown,
            output,
            metrics,
            threshold,
            seed,
            trees,
        } => {
            if let Some(v) = shadow {
                cfg.shadow_file = v;
            }
            if let Some(v) = unknown {
                cfg.unknown_file = v;
            }
            if let Some(v) = output {
                cfg.output_file = v;
            }
            if let Some(v) = metrics {
                cfg.metrics_file = v;
            }
            if threshold.is_some() {
                cfg.threshold = threshold;
            }
            if let Some(v) = seed {
                cfg.seed = v;
            }
            if let Some(v) = trees {
                cfg.n_trees = v;
            }

            let report = api::run(cfg).context("pipeline run failed")?;
            println!(
                "model {}: {} of {} vessels written, sensitivity {:.3}, oob {:.3}",
                report.model_id,
                report.candidates,
                report.scored,
                report.evaluation.metrics.sensitivity,
                report.evaluation.metrics.oob_score
            );
        }
        Command::Score {
            model,
            input,
            output,
            threshold,
        } => {
            let report = api::score_file(&model, &input, &output, threshold, cfg.reference_year)
                .with_context(|| format!("scoring {} failed", input.display()))?;
            println!(
                "model {}: {} of {} vessels written, {} values coerced to null, {} cells with invalid text",
                report.model_id,
                report.candidates,
                report.input.rows_out,
                report.input.coerced_nulls,
                report.input.lossy_cells
            );
        }
    }
    Ok(())
}
