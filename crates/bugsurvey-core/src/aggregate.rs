//! Aggregation of classification events into a `Summary`.
//!
//! A summary is a pure fold over a slice of events. Participant summaries and
//! the aggregate report both call [`summarize_with`].

use bugsurvey_state::{ClassificationEvent, Label};
use serde::{Deserialize, Serialize};

use crate::obs;
use crate::stats::{
    binomial_p_value, ratio, wilson_interval, z_score, ResponseTimeStats, StatsConfig,
    WilsonInterval,
};

/// Counts for one true-label partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelStats {
    pub total: u64,
    pub correct: u64,
    pub incorrect: u64,
    pub accuracy: f64,
}

impl LabelStats {
    fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
    }

    fn finish(mut self) -> Self {
        self.accuracy = ratio(self.correct, self.total);
        self
    }
}

/// 2×2 confusion matrix with `synthetic` as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// synthetic answered as synthetic
    pub true_positive: u64,
    /// real answered as synthetic
    pub false_positive: u64,
    /// real answered as real
    pub true_negative: u64,
    /// synthetic answered as real
    pub false_negative: u64,
}

impl ConfusionMatrix {
    fn record(&mut self, true_label: Label, given_label: Label) {
        match (true_label, given_label) {
            (Label::Synthetic, Label::Synthetic) => self.true_positive += 1,
            (Label::Real, Label::Synthetic) => self.false_positive += 1,
            (Label::Real, Label::Real) => self.true_negative += 1,
            (Label::Synthetic, Label::Real) => self.false_negative += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }
}

/// Outcome of the two-sided test against chance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Significance {
    pub z_score: f64,
    pub p_value: f64,
    pub significant: bool,
}

impl Default for Significance {
    fn default() -> Self {
        Self {
            z_score: 0.0,
            p_value: 1.0,
            significant: false,
        }
    }
}

/// Everything derived from a set of classification events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: u64,
    pub correct: u64,
    pub accuracy: f64,
    pub synthetic: LabelStats,
    pub real: LabelStats,
    pub confusion: ConfusionMatrix,
    pub significance: Significance,
    pub confidence: WilsonInterval,
    pub response_times: ResponseTimeStats,
}

impl Default for Summary {
    fn default() -> Self {
        summarize(&[])
    }
}

impl Summary {
    pub fn incorrect(&self) -> u64 {
        self.total - self.correct
    }

    pub fn label(&self, label: Label) -> &LabelStats {
        match label {
            Label::Synthetic => &self.synthetic,
            Label::Real => &self.real,
        }
    }
}

/// Summarize with the default statistics settings.
pub fn summarize(events: &[ClassificationEvent]) -> Summary {
    summarize_with(events, &StatsConfig::default())
}

/// Fold `events` into a [`Summary`].
///
/// `correct` is recomputed from the two labels, so an event whose stored
/// flag disagrees with its labels is counted by its labels.
pub fn summarize_with(events: &[ClassificationEvent], config: &StatsConfig) -> Summary {
    let mut correct = 0u64;
    let mut synthetic = LabelStats::default();
    let mut real = LabelStats::default();
    let mut confusion = ConfusionMatrix::default();

    for event in events {
        let hit = event.true_label == event.given_label;
        if hit {
            correct += 1;
        }
        match event.true_label {
            Label::Synthetic => synthetic.record(hit),
            Label::Real => real.record(hit),
        }
        confusion.record(event.true_label, event.given_label);
    }

    let total = events.len() as u64;
    let p_value = binomial_p_value(correct, total, config);

    Summary {
        total,
        correct,
        accuracy: ratio(correct, total),
        synthetic: synthetic.finish(),
        real: real.finish(),
        confusion,
        significance: Significance {
            z_score: z_score(correct, total),
            p_value,
            significant: p_value < config.alpha,
        },
        confidence: wilson_interval(correct, total, config.confidence_z),
        response_times: ResponseTimeStats::from_latencies(events.iter().map(|e| e.latency_ms)),
    }
}

/// [`summarize_with`] plus a `summary.computed` event tagged with `scope`.
pub fn summarize_traced(
    scope: &str,
    events: &[ClassificationEvent],
    config: &StatsConfig,
) -> Summary {
    let summary = summarize_with(events, config);
    obs::emit_summary_computed(
        scope,
        summary.total,
        summary.accuracy,
        summary.significance.p_value,
    );
    summary
}
