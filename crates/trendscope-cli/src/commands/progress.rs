//! Progress bars for pipeline stages.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use trendscope_runtime::{Stage, StageObserver};

/// Shows one progress bar per running stage.
pub struct ProgressObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                f(bar);
            }
        }
    }
}

impl StageObserver for ProgressObserver {
    fn stage_started(&self, stage: Stage, items: usize) {
        let pb = ProgressBar::new(items as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb.set_message(stage.to_string());
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(pb);
        }
    }

    fn item_finished(&self, _stage: Stage) {
        self.with_bar(|bar| bar.inc(1));
    }

    fn stage_finished(&self, _stage: Stage) {
        self.with_bar(|bar| bar.finish_with_message("done"));
    }
}
