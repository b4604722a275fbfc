//! Pipeline stage commands.

use anyhow::{Context, Result};
use colored::Colorize;
use trendscope_core::store::TrendStore;
use trendscope_core::window::format_date;
use trendscope_runtime::{
    CsvEdgeSource, CsvOccurrenceIndex, JsonGraphStore, JsonTrendStore, Pipeline, PipelineConfig,
};

use super::progress::ProgressObserver;

/// Stages selected on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selection {
    pub prepare: bool,
    pub communities: bool,
    pub trends: bool,
}

impl Selection {
    pub fn any(&self) -> bool {
        self.prepare || self.communities || self.trends
    }
}

/// Open the configured trend store: SQLite when `paths.trends_db` is set,
/// JSON files under `paths.trends_dir` otherwise.
pub fn open_trend_store(config: &PipelineConfig) -> Result<Box<dyn TrendStore>> {
    match &config.paths.trends_db {
        #[cfg(feature = "sqlite")]
        Some(path) => {
            let store = trendscope_runtime::SqliteTrendStore::open(path)
                .with_context(|| format!("Failed to open trend database: {}", path.display()))?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        Some(path) => anyhow::bail!(
            "paths.trends_db is set ({}) but trendscope was built without the {} feature",
            path.display(),
            "sqlite".cyan()
        ),
        None => Ok(Box::new(JsonTrendStore::new(&config.paths.trends_dir))),
    }
}

/// Run the selected stages in pipeline order.
pub fn run(config: &PipelineConfig, selection: Selection) -> Result<()> {
    let settings = config.settings().context("Invalid configuration")?;
    let graphs = JsonGraphStore::new(&config.paths.graph_dir);
    let trend_store = open_trend_store(config)?;
    let observer = ProgressObserver::new();
    let pipeline = Pipeline::new(settings, &graphs, trend_store.as_ref()).with_observer(&observer);

    if selection.prepare {
        println!(
            "{} Building {} window graphs from {}",
            "→".blue(),
            pipeline.settings().windows.len().to_string().cyan(),
            config.paths.edge_dir.display()
        );
        let edges = CsvEdgeSource::new(&config.paths.edge_dir);
        let summaries = pipeline.prepare(&edges).context("Prepare stage failed")?;
        for s in &summaries {
            println!(
                "  {} - {}  {} nodes, {} edges",
                format_date(s.window.start),
                format_date(s.window.stop),
                s.nodes.to_string().cyan(),
                s.edges.to_string().cyan()
            );
        }
        println!("{} Window graphs saved to {}", "✓".green().bold(), config.paths.graph_dir.display());
    }

    if selection.communities {
        println!("{} Detecting communities", "→".blue());
        let occurrences = CsvOccurrenceIndex::open(&config.paths.node_dir, &config.paths.interactions)
            .context("Failed to open occurrence data")?;
        let report = pipeline.communities(&occurrences).context("Communities stage failed")?;
        for (w, (count, q)) in report.communities.iter().zip(&report.modularity).enumerate() {
            println!(
                "  window {:>3}: {} communities, modularity {:.4}",
                w,
                count.to_string().cyan(),
                q
            );
        }
        println!(
            "{} Matched {} trend threads",
            "✓".green().bold(),
            report.threads.len().to_string().cyan()
        );
    }

    if selection.trends {
        println!("{} Exporting top trends", "→".blue());
        let ranked = pipeline.trends().context("Trends stage failed")?;
        println!();
        println!("  {:<6} {:<10} {:<8} {}", "Trend", "Score", "Windows", "Thread");
        for (id, trend) in ranked.iter().enumerate() {
            println!(
                "  {:<6} {:<10.1} {:<8} #{}",
                id.to_string().cyan(),
                trend.score,
                trend.thread.entries.len(),
                trend.discovery
            );
        }
        println!();
        println!("{} Trend networks saved", "✓".green().bold());
    }

    Ok(())
}
