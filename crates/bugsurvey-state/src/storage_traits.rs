//! Storage trait definitions for bugsurvey
//!
//! These traits define the collaborators the survey core consumes:
//! - `EventLog`: append-only classification event persistence
//! - `CorpusSource`: one-shot loader for the two labeled item pools
//!
//! In-memory fakes are provided for testing via the `fakes` module.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::schema::{ClassificationEvent, ParticipantId, Pools};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// EventLog: classification event persistence
// ---------------------------------------------------------------------------

/// Append-only classification event log.
///
/// Guarantees:
/// - Events for a participant are returned in append order.
/// - After `append(e)` returns, `read_participant(&e.participant_id)` ends
///   with a record equal to `e`.
/// - Readers never observe a partially written record.
/// - An unknown participant reads as an empty sequence, not an error.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append one event to its participant's log. Failures are returned, not retried.
    async fn append(&self, event: ClassificationEvent) -> StorageResult<()>;

    /// All events of one participant, in append order.
    async fn read_participant(
        &self,
        participant: &ParticipantId,
    ) -> StorageResult<Vec<ClassificationEvent>>;

    /// All events of every participant.
    async fn read_all(&self) -> StorageResult<Vec<ClassificationEvent>>;

    /// Participants with at least one stored event, sorted.
    async fn participants(&self) -> StorageResult<Vec<ParticipantId>>;
}

// ---------------------------------------------------------------------------
// CorpusSource: labeled item pools
// ---------------------------------------------------------------------------

/// Loader for the synthetic and real item pools.
///
/// Called once at startup. Infallible by contract: an implementation that
/// cannot read a pool logs the failure and returns that pool empty.
pub trait CorpusSource: Send + Sync {
    fn load_pools(&self) -> Pools;
}
