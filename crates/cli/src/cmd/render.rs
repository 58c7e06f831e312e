use std::path::PathBuf;

use anyhow::{Context, Result};
use argp::FromArgs;
use pipeline_monitor_github::comment::LogComment;

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Print the log comment that would be posted for a local log file.
#[argp(subcommand, name = "render")]
pub struct Args {
    #[argp(option, short = 'i')]
    /// build log file
    input: PathBuf,
    #[argp(option, short = 'p', default = "String::from(\"local\")")]
    /// project name used for the comment tag
    project: String,
    #[argp(option, short = 'l', default = "10000")]
    /// number of log lines to include
    lines: u32,
    #[argp(option, short = 'd', default = "String::new()")]
    /// link to the original log
    deep_link: String,
    #[argp(option, short = 'o')]
    /// write the comment to output file
    output: Option<PathBuf>,
}

pub fn run(args: Args) -> Result<()> {
    let log = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let lines: Vec<String> = log.lines().take(args.lines as usize).map(str::to_string).collect();
    let comment = LogComment::render(&args.project, &lines, &args.deep_link, args.lines)
        .context("Failed to render log comment")?;
    if let Some(out_path) = &args.output {
        std::fs::write(out_path, comment.body())
            .with_context(|| format!("Failed to write output file '{}'", out_path.display()))?;
    } else {
        println!("{}", comment.body());
    }
    Ok(())
}
