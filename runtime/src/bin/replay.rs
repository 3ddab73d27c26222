//! Match replay tool
//!
//! Projects an exported match document and prints the live projection.
//!
//! # Usage
//!
//! ```bash
//! crease-replay match.json > projection.json
//! RUST_LOG=debug crease-replay match.json
//! ```

use anyhow::Context;
use crease_runtime::config::ScoringConfig;
use crease_runtime::replay::replay_document;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crease_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: crease-replay <match.json>")?;

    let config = ScoringConfig::from_env();
    tracing::info!(path = %path, ?config, "Replaying match");

    let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let projection = replay_document(&json, &config.policy())?;

    tracing::info!(
        match_id = %projection.match_id,
        status = %projection.status,
        runs = projection.current_innings.runs,
        wickets = projection.current_innings.wickets,
        overs = %projection.current_innings.overs_display(),
        "Replay complete"
    );
    println!("{}", serde_json::to_string_pretty(&projection)?);
    Ok(())
}
