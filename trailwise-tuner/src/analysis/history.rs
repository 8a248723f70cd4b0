//! Iteration bookkeeping on top of the adjustment file: classification,
//! the bounded history window, and oscillation suppression.
use chrono::{DateTime, Local};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use trailwise_game::tuning::baseline_constants;
use trailwise_game::{
    Classification, HISTORY_WINDOW, Metrics, TuningFile, TuningIteration, TuningMetadata,
};

pub const DEFAULT_OSCILLATION_WINDOW: usize = 3;

const TUNING_NOTE: &str =
    "Auto-generated by trailwise-tuner. Tracks tuning history to detect oscillating adjustments.";

/// Adjustments of an iteration that made the win rate worse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedAdjustment {
    pub iteration: u64,
    pub adjustments: BTreeMap<String, f64>,
}

/// Snapshot of how recent iterations have gone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryStatus {
    pub total_iterations: u64,
    pub recent_outcomes: Vec<Classification>,
    pub oscillating: bool,
    pub failed_adjustments: Vec<FailedAdjustment>,
}

/// Owns a [`TuningFile`] and records new iterations into it.
#[derive(Debug, Clone)]
pub struct TuningHistory {
    file: TuningFile,
    oscillation_window: usize,
}

impl TuningHistory {
    #[must_use]
    pub fn new(file: TuningFile, oscillation_window: usize) -> Self {
        Self {
            file,
            oscillation_window,
        }
    }

    #[must_use]
    pub const fn file(&self) -> &TuningFile {
        &self.file
    }

    /// Highest iteration number ever recorded, including evicted ones.
    #[must_use]
    pub fn iteration_count(&self) -> u64 {
        let latest = self.file.latest().map_or(0, |it| it.iteration);
        self.file.metadata.tuning_iteration.max(latest)
    }

    /// Compare a win rate with the previous iteration's.
    #[must_use]
    pub fn classify(&self, metrics: &Metrics) -> Classification {
        let Some(previous) = self.file.latest() else {
            return Classification::Initial;
        };
        match metrics.win_rate.partial_cmp(&previous.metrics.win_rate) {
            Some(Ordering::Greater) => Classification::Improving,
            Some(Ordering::Less) => Classification::Regressing,
            Some(Ordering::Equal) | None => Classification::Neutral,
        }
    }

    /// Record a tuner run and rewrite the file contents in place.
    ///
    /// Keys flagged by oscillation detection keep their prior value (or stay
    /// absent) and are listed in the iteration's `suppressed` field.
    pub fn record_iteration(
        &mut self,
        adjustments: &BTreeMap<String, f64>,
        metrics: Metrics,
        insights: &[String],
        now: DateTime<Local>,
    ) -> TuningIteration {
        let outcome = self.classify(&metrics);
        let previous = self.file.latest().map(|it| it.metrics.clone());
        let suppressed = self.oscillating_keys(adjustments);

        let mut applied = adjustments.clone();
        for key in &suppressed {
            match self.file.current_adjustments.get(key) {
                Some(prior) => {
                    applied.insert(key.clone(), *prior);
                }
                None => {
                    applied.remove(key);
                }
            }
            log::warn!("holding {key} at its prior value: adjustments are oscillating");
        }

        let iteration = self.iteration_count() + 1;
        let date = now.to_rfc3339();
        let entry = TuningIteration {
            iteration,
            date: date.clone(),
            sessions_analyzed: metrics.total_sessions,
            adjustments: applied.clone(),
            metrics: metrics.clone(),
            previous_metrics: previous.clone(),
            insights_count: insights.len(),
            outcome,
            suppressed,
        };

        let history = &mut self.file.tuning_history;
        history.push(entry.clone());
        if history.len() > HISTORY_WINDOW {
            let excess = history.len() - HISTORY_WINDOW;
            history.drain(..excess);
        }
        if self.file.baseline.is_empty() {
            self.file.baseline = baseline_constants();
        }
        self.file.metadata = TuningMetadata {
            generated: date,
            tuning_iteration: iteration,
            sessions_analyzed: metrics.total_sessions,
            status: outcome.as_str().to_string(),
        };
        self.file.current_adjustments = applied;
        self.file.metrics_before = previous;
        self.file.metrics_after = metrics;
        self.file.insights = insights.to_vec();
        self.file.note = TUNING_NOTE.to_string();
        log::info!("recorded tuning iteration {iteration} ({outcome})");
        entry
    }

    /// Whether the last `oscillation_window` iterations alternate between
    /// improving and regressing.
    #[must_use]
    pub fn is_oscillating(&self) -> bool {
        self.recent_window().is_some_and(|recent| {
            recent.iter().all(|it| {
                matches!(
                    it.outcome,
                    Classification::Improving | Classification::Regressing
                )
            }) && recent.windows(2).all(|pair| pair[0].outcome != pair[1].outcome)
        })
    }

    /// Proposed keys whose recent values flip-flopped during an oscillation.
    #[must_use]
    pub fn oscillating_keys(&self, proposed: &BTreeMap<String, f64>) -> Vec<String> {
        if !self.is_oscillating() {
            return Vec::new();
        }
        let Some(recent) = self.recent_window() else {
            return Vec::new();
        };
        proposed
            .keys()
            .filter(|key| {
                let values: Option<Vec<f64>> = recent
                    .iter()
                    .map(|it| it.adjustments.get(*key).copied())
                    .collect();
                values.is_some_and(|values| key_flip_flops(&values))
            })
            .cloned()
            .collect()
    }

    /// Summarize recent outcomes and the adjustments that preceded regressions.
    #[must_use]
    pub fn analyze_history(&self) -> HistoryStatus {
        let history = &self.file.tuning_history;
        HistoryStatus {
            total_iterations: self.iteration_count(),
            recent_outcomes: history.iter().map(|it| it.outcome).collect(),
            oscillating: self.is_oscillating(),
            failed_adjustments: history
                .iter()
                .filter(|it| it.outcome == Classification::Regressing)
                .map(|it| FailedAdjustment {
                    iteration: it.iteration,
                    adjustments: it.adjustments.clone(),
                })
                .collect(),
        }
    }

    fn recent_window(&self) -> Option<&[TuningIteration]> {
        let history = &self.file.tuning_history;
        let window = self.oscillation_window;
        if window < 2 || history.len() < window {
            return None;
        }
        Some(&history[history.len() - window..])
    }
}

/// Values alternate around 1.0, or the direction of change reverses on every
/// step. A steady climb or fall is a trend, not a flip-flop; two values carry
/// no direction to reverse, so only the 1.0 crossing counts for them.
fn key_flip_flops(values: &[f64]) -> bool {
    let alternating = values.windows(2).all(|pair| {
        let a = pair[0] - 1.0;
        let b = pair[1] - 1.0;
        a != 0.0 && b != 0.0 && a.signum() != b.signum()
    });
    let deltas: Vec<f64> = values.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let reversing = deltas.len() >= 2
        && deltas.iter().all(|delta| delta.abs() > f64::EPSILON)
        && deltas
            .windows(2)
            .all(|pair| pair[0].signum() != pair[1].signum());
    alternating || reversing
}
