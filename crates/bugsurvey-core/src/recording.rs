//! Response recording: validated submissions land in the event log.

use std::sync::Arc;

use bugsurvey_state::EventLog;

use crate::domain::{validate_submission, LabelLookup, ResponseSubmission, Result};
use crate::metrics::METRICS;
use crate::obs;
use crate::reporting::{ParticipantReport, Reporter};
use crate::sampling::SamplingCache;
use crate::stats::StatsConfig;

/// Records classifications and answers with the participant's fresh report.
///
/// Usage:
/// 1. Build one recorder per process around the shared log and cache.
/// 2. Call [`ResponseRecorder::record`] for each submission.
pub struct ResponseRecorder {
    log: Arc<dyn EventLog>,
    cache: Arc<SamplingCache>,
    reporter: Reporter,
}

impl ResponseRecorder {
    pub fn new(log: Arc<dyn EventLog>, cache: Arc<SamplingCache>, config: StatsConfig) -> Self {
        let reporter = Reporter::new(Arc::clone(&log), config);
        Self {
            log,
            cache,
            reporter,
        }
    }

    pub fn cache(&self) -> &SamplingCache {
        &self.cache
    }

    /// Validate, append, mark seen, then summarize the participant.
    ///
    /// Nothing is appended when validation fails. A storage failure leaves the
    /// seen-set untouched.
    pub async fn record(&self, submission: &ResponseSubmission) -> Result<ParticipantReport> {
        let corpus: &dyn LabelLookup = &*self.cache;
        let event = validate_submission(submission, Some(corpus)).map_err(|e| {
            METRICS.inc_responses_rejected();
            obs::emit_response_rejected(submission.participant_id.trim(), &e);
            e
        })?;

        let _span = obs::ParticipantSpan::enter(event.participant_id.as_str());
        self.log.append(event.clone()).await?;
        self.cache
            .mark_seen(&event.participant_id, &event.item_id)
            .await;

        METRICS.inc_responses_recorded();
        obs::emit_response_recorded(
            event.participant_id.as_str(),
            event.item_id.as_str(),
            event.correct,
            event.latency_ms,
        );

        self.reporter.summarize_participant(&event.participant_id).await
    }
}
