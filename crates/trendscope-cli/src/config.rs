//! Configuration and logging setup for the Trendscope CLI.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use trendscope_runtime::PipelineConfig;

const CONFIG_FILE: &str = "trendscope.toml";

/// Load config from `path`, or from trendscope.toml in the current or
/// parent directories, falling back to defaults.
pub fn load(path: Option<&Path>) -> Result<PipelineConfig> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(),
    };
    match path {
        Some(path) => parse_file(&path),
        None => Ok(PipelineConfig::default()),
    }
}

fn parse_file(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Generate default config as TOML string.
pub fn default_toml() -> Result<String> {
    toml::to_string_pretty(&PipelineConfig::default()).context("Failed to serialize config")
}

/// Find trendscope.toml in current or parent directories.
fn find_config_file() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the default level; with a log file the output is
/// written there without ANSI colors.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("trendscope_core={default_level},trendscope_runtime={default_level},trendscope={default_level}").into()
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))
        }
        None => builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_partial_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
workers = 4

[windows]
start = "2019-11-01"
count = 6

[detection]
method = "louvain"
seed = 42

[matching]
tie_break = "earliest-discovered"
"#,
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.windows.count, 6);
        assert_eq!(config.detection.seed, Some(42));
        assert_eq!(config.matching.memory, 4);
        let settings = config.settings().unwrap();
        assert_eq!(settings.windows.len(), 6);
    }

    #[test]
    fn default_toml_round_trips() {
        let text = default_toml().unwrap();
        let config: PipelineConfig = toml::from_str(&text).unwrap();
        assert_eq!(config.trends.count, 10);
        assert_eq!(config.detection.method, "leiden");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
