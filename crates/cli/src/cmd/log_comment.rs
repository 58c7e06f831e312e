use anyhow::{Context, Result};
use argp::FromArgs;
use pipeline_monitor_core::{config::Config, models::BuildRef};

use crate::connect;

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Re-post the build log comment on the pull request a build ran for.
#[argp(subcommand, name = "log-comment")]
pub struct Args {
    #[argp(option, short = 'b')]
    /// CodeBuild build id or ARN
    build_id: String,
    #[argp(option, short = 'p')]
    /// project name used for the comment tag
    project: Option<String>,
    #[argp(option, short = 'l')]
    /// number of log lines to include
    lines: Option<u32>,
}

pub async fn run(args: Args) -> Result<()> {
    let config = Config::load()?;
    let relay = connect(&config).await?;
    let build = BuildRef { build_id: args.build_id, project_name: args.project };
    let outcome = relay
        .publish_build_log(&build, args.lines)
        .await
        .with_context(|| format!("Failed to post log comment for {}", build.build_id))?;
    println!("{}", outcome);
    Ok(())
}
