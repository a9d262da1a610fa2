//! Structured observability hooks for survey events.
//!
//! This module provides:
//! - Participant-scoped tracing spans via the `ParticipantSpan` RAII guard
//! - Emission functions for batches, seen-set resets, recorded and rejected
//!   responses, and computed summaries
//!
//! Events are emitted at `info!` level unless noted (filter with `RUST_LOG`).

use tracing::info;

/// RAII guard that enters a participant-scoped span.
///
/// # Example
///
/// ```ignore
/// let _span = ParticipantSpan::enter("3f2a9c");
/// // every event inside carries participant = "3f2a9c"
/// ```
pub struct ParticipantSpan {
    _span: tracing::span::EnteredSpan,
}

impl ParticipantSpan {
    pub fn enter(participant: &str) -> Self {
        let span = tracing::info_span!("bugsurvey.participant", participant = %participant);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a batch was handed to a participant.
pub fn emit_batch_served(participant: &str, requested: usize, returned: usize, seen: usize) {
    info!(
        event = "batch.served",
        participant = %participant,
        requested = requested,
        returned = returned,
        seen = seen,
    );
}

/// Emit event: a participant's seen-set was cleared after exhausting the pool.
pub fn emit_seen_reset(participant: &str, seen: usize, pool_size: usize) {
    info!(
        event = "seen.reset",
        participant = %participant,
        seen = seen,
        pool_size = pool_size,
        "participant has seen most items, resetting seen-set"
    );
}

/// Emit event: a classification was stored.
pub fn emit_response_recorded(participant: &str, item: &str, correct: bool, latency_ms: u64) {
    info!(
        event = "response.recorded",
        participant = %participant,
        item = %item,
        correct = correct,
        latency_ms = latency_ms,
    );
}

/// Emit event: a submission failed boundary validation (warning level).
pub fn emit_response_rejected(participant: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "response.rejected", participant = %participant, error = %error);
}

/// Emit event: a summary was computed over `events` events.
pub fn emit_summary_computed(scope: &str, events: u64, accuracy: f64, p_value: f64) {
    info!(
        event = "summary.computed",
        scope = %scope,
        events = events,
        accuracy = accuracy,
        p_value = p_value,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_span_enters() {
        let _span = ParticipantSpan::enter("p-1");
    }
}
