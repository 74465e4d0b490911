use anyhow::Result;
use quiver_uci::{EngineConfig, UciEngine};
use tracing::info;

fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    info!(version = env!("CARGO_PKG_VERSION"), "quiver starting");

    UciEngine::stdout(EngineConfig::default())?.run()?;
    Ok(())
}
