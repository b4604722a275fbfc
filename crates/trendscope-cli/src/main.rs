//! Trendscope CLI - Trend discovery over monthly co-occurrence networks.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use commands::stages::Selection;

#[derive(Parser)]
#[command(name = "trendscope")]
#[command(author, version, about = "Trendscope - Persistent trends in hashtag co-occurrence networks", long_about = None)]
struct Cli {
    /// Build window graphs from the edge lists
    #[arg(long)]
    prepare: bool,

    /// Weight window graphs, detect communities and match them over time
    #[arg(long)]
    communities: bool,

    /// Rank trend threads and export their networks
    #[arg(long)]
    trends: bool,

    /// Show the per-window score history of a trend
    #[arg(long, value_name = "TREND_ID")]
    scores: Option<usize>,

    /// Show the keywords of a trend's aggregate network
    #[arg(long, value_name = "TREND_ID")]
    describe: Option<usize>,

    /// Print the default configuration as TOML
    #[arg(long)]
    print_config: bool,

    /// Config file (default: trendscope.toml in this or a parent directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn selection(&self) -> Selection {
        Selection {
            prepare: self.prepare,
            communities: self.communities,
            trends: self.trends,
        }
    }

    fn has_task(&self) -> bool {
        self.selection().any() || self.scores.is_some() || self.describe.is_some()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", config::default_toml()?);
        return Ok(());
    }

    if !cli.has_task() {
        println!("Please select task!");
        return Ok(());
    }

    let config = config::load(cli.config.as_deref())?;
    config::init_logging(cli.verbose, config.log_file.as_deref())?;
    tracing::debug!(?config, "Configuration loaded");

    let selection = cli.selection();
    if selection.any() {
        commands::stages::run(&config, selection)?;
    }
    if let Some(trend_id) = cli.scores {
        commands::inspect::scores(&config, trend_id)?;
    }
    if let Some(trend_id) = cli.describe {
        commands::inspect::describe(&config, trend_id)?;
    }

    Ok(())
}
