//! Training progress logging.
//!
//! [`TrainingLogger`] gates `tracing` events by a [`Verbosity`] level so a
//! silent run emits nothing even when a subscriber is installed.

use tracing::{debug, info, warn};

/// How much training progress to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// No output.
    #[default]
    Silent,
    /// Warnings only.
    Warning,
    /// Per-round evaluation lines and the early-stop notice.
    Info,
    /// Everything, including round timings.
    Debug,
}

/// Emits training progress as `tracing` events.
#[derive(Debug, Clone)]
pub struct TrainingLogger {
    verbosity: Verbosity,
    started: Option<std::time::Instant>,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            started: None,
        }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn start_training<'n>(
        &mut self,
        first_round: u32,
        n_rounds: u32,
        watches: impl Iterator<Item = &'n str>,
    ) {
        self.started = Some(std::time::Instant::now());
        if self.verbosity >= Verbosity::Info {
            let names: Vec<&str> = watches.collect();
            info!(first_round, n_rounds, watches = ?names, "starting training");
        }
    }

    /// One evaluation line per round.
    pub fn log_round(&self, line: &str) {
        if self.verbosity >= Verbosity::Info {
            info!("{line}");
        }
    }

    pub fn log_round_timing(&self, round: u32, elapsed: std::time::Duration) {
        if self.verbosity >= Verbosity::Debug {
            debug!(round, elapsed_ms = elapsed.as_secs_f64() * 1e3, "round finished");
        }
    }

    pub fn log_early_stopping(&self, round: u32, best_round: u32, best_score: f64, metric: &str) {
        if self.verbosity >= Verbosity::Info {
            info!(
                round,
                best_round,
                best_score,
                metric,
                "stopping early: no improvement since round {best_round}"
            );
        }
    }

    pub fn warn(&self, message: &str) {
        if self.verbosity >= Verbosity::Warning {
            warn!("{message}");
        }
    }

    pub fn finish_training(&self, rounds_run: u32) {
        if self.verbosity >= Verbosity::Info {
            let elapsed = self.started.map(|s| s.elapsed().as_secs_f64()).unwrap_or(0.0);
            info!(rounds_run, elapsed_s = elapsed, "training finished");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_ordering() {
        assert!(Verbosity::Debug > Verbosity::Info);
        assert!(Verbosity::Info > Verbosity::Warning);
        assert_eq!(Verbosity::default(), Verbosity::Silent);
    }

    #[test]
    fn silent_logger_is_noop() {
        let mut logger = TrainingLogger::new(Verbosity::Silent);
        logger.start_training(0, 10, ["train"].into_iter());
        logger.log_round("[0]\ttrain-rmse:1.000000");
        logger.finish_training(10);
        assert_eq!(logger.verbosity(), Verbosity::Silent);
    }
}
