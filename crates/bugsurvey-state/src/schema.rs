//! Record schema for the survey stores
//!
//! Records:
//! - items: labeled code samples in two immutable pools
//! - events: one classification made by one participant

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ground-truth (or guessed) origin of a code sample.
///
/// `Synthetic` is the "positive" class of the confusion matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Synthetic,
    Real,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Synthetic, Label::Real];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Synthetic => "synthetic",
            Label::Real => "real",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthetic" => Ok(Label::Synthetic),
            "real" => Ok(Label::Real),
            other => Err(other.to_string()),
        }
    }
}

/// Identifier of a corpus item (the dataset's `instance_id`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a survey participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Mint a fresh random participant id
    pub fn generate() -> Self {
        ParticipantId(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        ParticipantId(s.to_string())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A labeled code sample. Immutable once loaded; identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub label: Label,
    /// Everything else the dataset carries for this sample (patch, problem
    /// statement, ...). Never inspected by the core.
    pub payload: serde_json::Value,
}

impl Item {
    pub fn new(id: impl Into<String>, label: Label, payload: serde_json::Value) -> Self {
        Self {
            id: ItemId(id.into()),
            label,
            payload,
        }
    }
}

/// The two immutable item pools
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pools {
    pub synthetic: Vec<Item>,
    pub real: Vec<Item>,
}

impl Pools {
    pub fn new(synthetic: Vec<Item>, real: Vec<Item>) -> Self {
        Self { synthetic, real }
    }

    /// Size of the combined pool
    pub fn total(&self) -> usize {
        self.synthetic.len() + self.real.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Union of both pools, synthetic first
    pub fn combined(&self) -> impl Iterator<Item = &Item> {
        self.synthetic.iter().chain(self.real.iter())
    }

    /// Look up an item by id in either pool
    pub fn find(&self, id: &ItemId) -> Option<&Item> {
        self.combined().find(|item| &item.id == id)
    }
}

/// One classification made by a participant.
///
/// Append-only. Nothing enforces one event per (participant, item); duplicates
/// are counted like any other event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEvent {
    pub participant_id: ParticipantId,
    pub item_id: ItemId,
    pub true_label: Label,
    pub given_label: Label,
    /// Always `given_label == true_label` for events built with [`Self::new`]
    pub correct: bool,
    /// Time taken to answer; 0 means "not measured"
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ClassificationEvent {
    /// Build an event, deriving `correct` from the two labels.
    pub fn new(
        participant_id: ParticipantId,
        item_id: ItemId,
        true_label: Label,
        given_label: Label,
        latency_ms: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            participant_id,
            item_id,
            true_label,
            given_label,
            correct: true_label == given_label,
            latency_ms,
            timestamp,
        }
    }

    /// Whether `correct` agrees with the two labels
    pub fn is_consistent(&self) -> bool {
        self.correct == (self.true_label == self.given_label)
    }
}
