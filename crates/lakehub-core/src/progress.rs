//! Single-line transfer progress.
//!
//! One `ProgressMeter` aggregates byte counts across one or many sequential
//! sub-transfers that share a visual indicator. Rendering overwrites a single
//! stderr line and is throttled to bound output volume; when the total is
//! unknown the meter degrades to a spinner plus a byte count.
//!
//! The meter is single-caller by contract (`&mut self`): callers that
//! parallelize transfers must serialize updates into it.

use std::time::{Duration, Instant};

const RENDER_INTERVAL: Duration = Duration::from_millis(100);
const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

#[derive(Debug, Default)]
pub struct ProgressMeter {
    total: Option<u64>,
    done: u64,
    spin_idx: usize,
    last_tick: Option<Instant>,
}

impl ProgressMeter {
    /// Meter with an unknown total (spinner mode until `set_total`).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_total(total: u64) -> Self {
        ProgressMeter {
            total: Some(total),
            ..Self::default()
        }
    }

    /// Late total discovery, e.g. from a response content length.
    pub fn set_total(&mut self, total: u64) {
        self.total = Some(total);
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn done_bytes(&self) -> u64 {
        self.done
    }

    /// Add transferred bytes; overshoot against a known total clamps.
    pub fn add(&mut self, delta: u64) {
        self.done = match self.total {
            Some(total) => (self.done + delta).min(total),
            None => self.done + delta,
        };
    }

    /// Draw the status line. Without `force`, consecutive renders within
    /// 100 ms are suppressed.
    pub fn render(&mut self, force: bool) {
        if !force {
            if let Some(tick) = self.last_tick {
                if tick.elapsed() < RENDER_INTERVAL {
                    return;
                }
            }
        }
        self.last_tick = Some(Instant::now());
        let line = self.status_line();
        eprint!("\r{line}   ");
    }

    /// Force a final render and terminate the line.
    pub fn finish(&mut self) {
        self.render(true);
        eprintln!();
    }

    fn status_line(&mut self) -> String {
        match self.total {
            Some(total) if total > 0 => {
                let pct = self.done as f64 / total as f64 * 100.0;
                format!(
                    "Progress: {:6.2}% ({} / {})",
                    pct,
                    human_bytes(self.done),
                    human_bytes(total)
                )
            }
            _ => {
                let ch = SPINNER[self.spin_idx % SPINNER.len()];
                self.spin_idx += 1;
                format!("Progress: [{ch}] {} transferred", human_bytes(self.done))
            }
        }
    }
}

/// Human-readable byte count (B / KB / MB / GB, two decimals).
pub fn human_bytes(n: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    match n {
        _ if n >= GB => format!("{:.2} GB", n as f64 / GB as f64),
        _ if n >= MB => format!("{:.2} MB", n as f64 / MB as f64),
        _ if n >= KB => format!("{:.2} KB", n as f64 / KB as f64),
        _ => format!("{n} B"),
    }
}
