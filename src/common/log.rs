//! Logging bootstrap on top of `tracing-subscriber`.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to the
//! whole process. JSON lines are opt-in via `SHADOWFLEET_LOG_JSON`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::common::config::AppCfg;

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(cfg: &AppCfg) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if cfg.log_json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
