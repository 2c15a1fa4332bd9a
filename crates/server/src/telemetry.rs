//! Tracing subscriber setup.
//!
//! Logs are JSON on stderr. `RUST_LOG` wins when set; otherwise the `debug`
//! toggle picks between debug and info.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

fn default_level(debug: bool) -> LevelFilter {
    if debug { LevelFilter::DEBUG } else { LevelFilter::INFO }
}

/// Install the global subscriber.
pub fn init(debug: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level(debug).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
