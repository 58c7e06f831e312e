use std::path::PathBuf;

use anyhow::{Context, Result};
use argp::FromArgs;
use pipeline_monitor_core::config::Config;
use pipeline_monitor_relay::events::CloudEvent;

use crate::connect;

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Run a single event envelope through the relay.
#[argp(subcommand, name = "process")]
pub struct Args {
    #[argp(option, short = 'e')]
    /// event JSON file, as delivered by EventBridge
    event: PathBuf,
}

pub async fn run(args: Args) -> Result<()> {
    let data = std::fs::read(&args.event)
        .with_context(|| format!("Failed to read {}", args.event.display()))?;
    let event: CloudEvent = serde_json::from_slice(&data)
        .with_context(|| format!("Failed to parse {}", args.event.display()))?;
    let config = Config::load()?;
    let relay = connect(&config).await?;
    let outcome = relay.handle_event(&event).await.context("Failed to process event")?;
    println!("{}", outcome);
    Ok(())
}
