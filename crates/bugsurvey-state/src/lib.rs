//! bugsurvey-state: persistence layer for the bug classification survey
//!
//! This crate owns every record that crosses a storage boundary: the labeled
//! corpus items and the append-only log of classification events.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: a fixed, typed record schema and backend-agnostic store traits.
//!
//! ## Key Components
//!
//! - `EventLog`: append/read interface over classification events
//! - `CorpusSource`: one-shot loader for the two labeled pools
//! - `FsEventLog`: JSON-lines event log under a data directory
//! - `JsonlCorpus`: JSON-lines corpus loader that degrades to empty pools

pub mod corpus;
mod error;
pub mod fakes;
pub mod fs_log;
mod schema;
pub mod storage_traits;

pub use corpus::JsonlCorpus;
pub use error::{CorpusError, StorageError};
pub use fs_log::FsEventLog;
pub use schema::{ClassificationEvent, Item, ItemId, Label, ParticipantId, Pools};
pub use storage_traits::{CorpusSource, EventLog, StorageResult};
