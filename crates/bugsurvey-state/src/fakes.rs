//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryEventLog`, `StaticCorpus` and `FailingEventLog` that satisfy
//! the trait contracts without touching the filesystem.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::schema::{ClassificationEvent, ParticipantId, Pools};
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryEventLog
// ---------------------------------------------------------------------------

/// In-memory event log backed by a `BTreeMap<participant, events>`.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<BTreeMap<ParticipantId, Vec<ClassificationEvent>>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log pre-populated with `events`, appended in order.
    pub fn with_events(events: impl IntoIterator<Item = ClassificationEvent>) -> Self {
        let log = Self::new();
        {
            let mut map = log.events.lock().unwrap();
            for event in events {
                map.entry(event.participant_id.clone())
                    .or_default()
                    .push(event);
            }
        }
        log
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn append(&self, event: ClassificationEvent) -> StorageResult<()> {
        let mut map = self.events.lock().unwrap();
        map.entry(event.participant_id.clone())
            .or_default()
            .push(event);
        Ok(())
    }

    async fn read_participant(
        &self,
        participant: &ParticipantId,
    ) -> StorageResult<Vec<ClassificationEvent>> {
        let map = self.events.lock().unwrap();
        Ok(map.get(participant).cloned().unwrap_or_default())
    }

    async fn read_all(&self) -> StorageResult<Vec<ClassificationEvent>> {
        let map = self.events.lock().unwrap();
        Ok(map.values().flatten().cloned().collect())
    }

    async fn participants(&self) -> StorageResult<Vec<ParticipantId>> {
        let map = self.events.lock().unwrap();
        Ok(map.keys().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// FailingEventLog
// ---------------------------------------------------------------------------

/// Event log whose every operation fails with an I/O error.
#[derive(Debug, Default)]
pub struct FailingEventLog;

impl FailingEventLog {
    fn error() -> StorageError {
        StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "event log unavailable",
        ))
    }
}

#[async_trait]
impl EventLog for FailingEventLog {
    async fn append(&self, _event: ClassificationEvent) -> StorageResult<()> {
        Err(Self::error())
    }

    async fn read_participant(
        &self,
        _participant: &ParticipantId,
    ) -> StorageResult<Vec<ClassificationEvent>> {
        Err(Self::error())
    }

    async fn read_all(&self) -> StorageResult<Vec<ClassificationEvent>> {
        Err(Self::error())
    }

    async fn participants(&self) -> StorageResult<Vec<ParticipantId>> {
        Err(Self::error())
    }
}

// ---------------------------------------------------------------------------
// StaticCorpus
// ---------------------------------------------------------------------------

/// Corpus source that hands out a fixed set of pools.
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus {
    pools: Pools,
}

impl StaticCorpus {
    pub fn new(pools: Pools) -> Self {
        Self { pools }
    }
}

impl CorpusSource for StaticCorpus {
    fn load_pools(&self) -> Pools {
        self.pools.clone()
    }
}
