//! Read-only inspection of exported trends.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use trendscope_core::trend::{trend_description, trend_scores};
use trendscope_core::window::format_date;
use trendscope_runtime::PipelineConfig;

use super::stages::open_trend_store;

const BAR_WIDTH: usize = 40;

/// Print the per-window score history of a trend.
pub fn scores(config: &PipelineConfig, trend_id: usize) -> Result<()> {
    let settings = config.settings().context("Invalid configuration")?;
    let store = open_trend_store(config)?;
    let scores = trend_scores(store.as_ref(), trend_id, settings.windows.len())
        .with_context(|| format!("Failed to read scores for trend {}", trend_id))?;

    if scores.iter().all(|s| *s == 0.0) {
        bail!(
            "No exported networks for trend {}. Run {} first.",
            trend_id,
            "trendscope --trends".cyan()
        );
    }

    let max = scores.iter().copied().fold(0.0_f64, f64::max);
    println!("{} Trend {} evolution:", "→".blue(), trend_id.to_string().cyan());
    println!();
    for (window, score) in settings.windows.iter().zip(&scores) {
        let len = if max > 0.0 {
            ((score / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        println!(
            "  {} - {}  {:>10.1}  {}",
            format_date(window.start),
            format_date(window.stop),
            score,
            "█".repeat(len).green()
        );
    }

    Ok(())
}

/// Print the keywords of a trend's aggregate network.
pub fn describe(config: &PipelineConfig, trend_id: usize) -> Result<()> {
    let store = open_trend_store(config)?;
    let Some(description) = trend_description(store.as_ref(), trend_id)
        .with_context(|| format!("Failed to read trend {}", trend_id))?
    else {
        bail!(
            "No aggregate network for trend {}. Run {} first.",
            trend_id,
            "trendscope --trends".cyan()
        );
    };

    println!("{} Trend {} keywords:", "→".blue(), trend_id.to_string().cyan());
    println!();
    for (i, (keyword, weight)) in description.keywords.iter().zip(&description.weights).enumerate() {
        println!("  {:>2}. {} {:.4}", i + 1, format!("{:<30}", keyword).cyan(), weight);
    }

    Ok(())
}
