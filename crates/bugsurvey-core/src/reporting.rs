//! Participant and aggregate reports over the event log.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use bugsurvey_state::{ClassificationEvent, EventLog, ParticipantId};
use serde::{Deserialize, Serialize};

use crate::aggregate::{summarize_traced, summarize_with, Summary};
use crate::domain::Result;
use crate::stats::{StatsConfig, CHANCE};

/// One participant's summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantReport {
    pub participant_id: ParticipantId,
    pub summary: Summary,
}

/// Answers split by true label and outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDistribution {
    pub synthetic_correct: u64,
    pub synthetic_incorrect: u64,
    pub real_correct: u64,
    pub real_incorrect: u64,
}

impl From<&Summary> for ResponseDistribution {
    fn from(summary: &Summary) -> Self {
        Self {
            synthetic_correct: summary.synthetic.correct,
            synthetic_incorrect: summary.synthetic.incorrect,
            real_correct: summary.real.correct,
            real_incorrect: summary.real.incorrect,
        }
    }
}

/// Report over every participant in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub participants: u64,
    pub total_events: u64,
    pub summary: Summary,
    /// Participants whose own p-value is below `alpha`
    pub significant_participants: u64,
    /// Participants with accuracy strictly above chance
    pub participants_above_chance: u64,
    pub avg_responses_per_participant: f64,
    pub response_distribution: ResponseDistribution,
    /// Sorted by participant id
    pub per_participant: Vec<ParticipantReport>,
}

/// Fold a flat list of events into an [`AggregateReport`].
pub fn aggregate(events: &[ClassificationEvent], config: &StatsConfig) -> AggregateReport {
    let mut grouped: BTreeMap<&ParticipantId, Vec<ClassificationEvent>> = BTreeMap::new();
    for event in events {
        grouped
            .entry(&event.participant_id)
            .or_default()
            .push(event.clone());
    }

    let per_participant: Vec<ParticipantReport> = grouped
        .into_iter()
        .map(|(id, events)| ParticipantReport {
            participant_id: id.clone(),
            summary: summarize_with(&events, config),
        })
        .collect();

    let summary = summarize_with(events, config);
    let participants = per_participant.len() as u64;

    AggregateReport {
        participants,
        total_events: summary.total,
        significant_participants: per_participant
            .iter()
            .filter(|p| p.summary.significance.significant)
            .count() as u64,
        participants_above_chance: per_participant
            .iter()
            .filter(|p| p.summary.accuracy > CHANCE)
            .count() as u64,
        avg_responses_per_participant: if participants == 0 {
            0.0
        } else {
            summary.total as f64 / participants as f64
        },
        response_distribution: ResponseDistribution::from(&summary),
        summary,
        per_participant,
    }
}

/// Reads the event log and builds reports.
pub struct Reporter {
    log: Arc<dyn EventLog>,
    config: StatsConfig,
}

impl Reporter {
    pub fn new(log: Arc<dyn EventLog>, config: StatsConfig) -> Self {
        Self { log, config }
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub async fn summarize_participant(&self, id: &ParticipantId) -> Result<ParticipantReport> {
        let events = self.log.read_participant(id).await?;
        Ok(ParticipantReport {
            participant_id: id.clone(),
            summary: summarize_traced(id.as_str(), &events, &self.config),
        })
    }

    pub async fn summarize_all(&self) -> Result<AggregateReport> {
        let events = self.log.read_all().await?;
        let report = aggregate(&events, &self.config);
        crate::obs::emit_summary_computed(
            "all",
            report.total_events,
            report.summary.accuracy,
            report.summary.significance.p_value,
        );
        Ok(report)
    }
}

/// Write the report as pretty JSON.
pub fn write_report_json(path: &Path, report: &AggregateReport) -> AnyResult<()> {
    let content = serde_json::to_string_pretty(report).context("serialize aggregate report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render a markdown overview of the report.
pub fn render_report_md(report: &AggregateReport) -> String {
    let s = &report.summary;
    let mut out = String::new();
    out.push_str("# Survey Report\n\n");
    out.push_str(&format!("- Participants: {}\n", report.participants));
    out.push_str(&format!("- Responses: {}\n", report.total_events));
    out.push_str(&format!(
        "- Responses per participant: {:.1}\n",
        report.avg_responses_per_participant
    ));
    out.push_str(&format!(
        "- Accuracy: {:.1}% (95% CI {:.1}% to {:.1}%)\n",
        s.accuracy * 100.0,
        s.confidence.lower * 100.0,
        s.confidence.upper * 100.0
    ));
    out.push_str(&format!(
        "- z = {:.3}, p = {:.4}{}\n",
        s.significance.z_score,
        s.significance.p_value,
        if s.significance.significant {
            " (significant)"
        } else {
            ""
        }
    ));
    out.push_str(&format!(
        "- Significant participants: {}; above chance: {}\n\n",
        report.significant_participants, report.participants_above_chance
    ));

    out.push_str("## Confusion matrix\n\n");
    out.push_str("| true \\ answer | synthetic | real |\n");
    out.push_str("|---|---|---|\n");
    out.push_str(&format!(
        "| synthetic | {} | {} |\n",
        s.confusion.true_positive, s.confusion.false_negative
    ));
    out.push_str(&format!(
        "| real | {} | {} |\n",
        s.confusion.false_positive, s.confusion.true_negative
    ));

    if s.response_times.count > 0 {
        out.push_str("\n## Response times\n\n");
        out.push_str(&format!(
            "- mean {:.0} ms, median {:.0} ms, range {} to {} ms\n",
            s.response_times.mean_ms,
            s.response_times.median_ms,
            s.response_times.min_ms,
            s.response_times.max_ms
        ));
    }
    out
}

/// Write [`render_report_md`] output to `path`.
pub fn write_report_md(path: &Path, report: &AggregateReport) -> AnyResult<()> {
    std::fs::write(path, render_report_md(report)).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
