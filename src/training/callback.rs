//! Early stopping.
//!
//! [`should_early_stop`] is the pure decision rule: it only measures rounds
//! since the last improvement. [`EarlyStopping`] tracks the best round under
//! a direction (minimize or maximize) and applies the rule each round.

/// Whether training should stop: `current_round - best_round >= patience`.
///
/// Direction-agnostic; `best_round` is maintained by the caller.
///
/// ```
/// use treeboost::training::should_early_stop;
///
/// assert!(!should_early_stop(5, 8, 4));
/// assert!(should_early_stop(5, 9, 4));
/// assert!(should_early_stop(0, 3, 3));
/// ```
#[inline]
pub fn should_early_stop(patience: u32, current_round: u32, best_round: u32) -> bool {
    current_round.saturating_sub(best_round) >= patience
}

/// Outcome of [`EarlyStopping::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyStopAction {
    /// This round's value became the new best.
    Improved,
    /// No improvement, patience not exhausted.
    Continue,
    /// Patience exhausted; stop training.
    Stop,
}

/// Early stopping state.
///
/// Only strict improvements move the best round, so ties keep the earliest.
/// `NaN` never counts as an improvement; until a finite value is seen,
/// patience counts from the first observed round.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    /// Rounds without improvement before stopping.
    patience: u32,
    /// Whether higher metric values are better.
    maximize: bool,
    best_value: Option<f64>,
    best_round: u32,
    started: bool,
}

impl EarlyStopping {
    pub fn new(patience: u32, maximize: bool) -> Self {
        Self {
            patience,
            maximize,
            best_value: None,
            best_round: 0,
            started: false,
        }
    }

    /// Record the value observed at `round` and decide.
    pub fn update(&mut self, round: u32, value: f64) -> EarlyStopAction {
        if !self.started {
            self.started = true;
            self.best_round = round;
        }

        let improved = match self.best_value {
            _ if value.is_nan() => false,
            None => true,
            Some(best) if self.maximize => value > best,
            Some(best) => value < best,
        };

        if improved {
            self.best_value = Some(value);
            self.best_round = round;
        }

        if should_early_stop(self.patience, round, self.best_round) {
            EarlyStopAction::Stop
        } else if improved {
            EarlyStopAction::Improved
        } else {
            EarlyStopAction::Continue
        }
    }

    #[inline]
    pub fn best_round(&self) -> u32 {
        self.best_round
    }

    #[inline]
    pub fn best_value(&self) -> Option<f64> {
        self.best_value
    }

    #[inline]
    pub fn patience(&self) -> u32 {
        self.patience
    }

    #[inline]
    pub fn maximize(&self) -> bool {
        self.maximize
    }
}
