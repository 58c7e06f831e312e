mod cmd;

use std::{process::ExitCode, sync::Arc};

use anyhow::Result;
use argp::FromArgs;
use pipeline_monitor_aws::{Aws, secrets::resolve_github_token};
use pipeline_monitor_core::config::Config;
use pipeline_monitor_github::GitHub;
use pipeline_monitor_relay::Relay;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[derive(FromArgs, PartialEq, Debug)]
/// Diagnostics for the pipeline monitor relay.
struct TopLevel {
    #[argp(subcommand)]
    command: SubCommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argp(subcommand)]
enum SubCommand {
    Process(cmd::process::Args),
    LogComment(cmd::log_comment::Args),
    Render(cmd::render::Args),
}

/// Overrides the configured credential for local runs.
const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::builder()
        // Default to info level
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();

    let args: TopLevel = argp::parse_args_or_exit(argp::DEFAULT);
    let result = match args.command {
        SubCommand::Process(args) => cmd::process::run(args).await,
        SubCommand::LogComment(args) => cmd::log_comment::run(args).await,
        SubCommand::Render(args) => cmd::render::run(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Failed: {e:?}");
            ExitCode::FAILURE
        }
    }
}

/// Build a relay against the live services described by `config.yml`.
async fn connect(config: &Config) -> Result<Relay> {
    let token = match std::env::var(GITHUB_TOKEN_ENV) {
        Ok(token) if !token.is_empty() => token,
        _ => resolve_github_token(config).await?,
    };
    let github: Arc<GitHub> = GitHub::new(&token).await?;
    let aws = Aws::new(&config.aws).await;
    Ok(Relay::new(github, aws, config.relay.clone()))
}
