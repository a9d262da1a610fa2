//! Boundary validation of inbound response submissions.
//!
//! A `ResponseSubmission` is whatever the front-end posted: string ids, label
//! spellings, an optional latency. `validate_submission` turns it into a typed
//! `ClassificationEvent` or rejects it before it reaches the event log.
//!
//! The survey front-end's camelCase field names are accepted as aliases.

use bugsurvey_state::{ClassificationEvent, ItemId, Label, ParticipantId, Pools};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Raw classification as submitted by a participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSubmission {
    #[serde(alias = "userId")]
    pub participant_id: String,
    #[serde(alias = "bugId")]
    pub item_id: String,
    #[serde(alias = "actualType")]
    pub true_label: String,
    #[serde(alias = "userResponse")]
    pub given_label: String,
    #[serde(alias = "responseTime", default)]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Characters allowed in a participant id.
pub fn is_valid_participant_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn parse_label(field: &'static str, value: &str) -> Result<Label, ValidationError> {
    value.parse().map_err(|_| ValidationError::UnknownLabel {
        field,
        value: value.to_string(),
    })
}

/// Anything that knows the true label of corpus items.
pub trait LabelLookup {
    fn label_of(&self, id: &ItemId) -> Option<Label>;
}

impl LabelLookup for Pools {
    fn label_of(&self, id: &ItemId) -> Option<Label> {
        self.find(id).map(|item| item.label)
    }
}

/// `known` is `None` when the corpus does not carry the item; that passes.
fn check_known_label(
    item: &ItemId,
    known: Option<Label>,
    submitted: Label,
) -> Result<(), ValidationError> {
    match known {
        Some(expected) if expected != submitted => Err(ValidationError::LabelMismatch {
            item: item.to_string(),
            expected,
            submitted,
        }),
        _ => Ok(()),
    }
}

/// Validate a submission.
///
/// Checks (in order):
/// 1. participant id is non-empty and uses only `[A-Za-z0-9._-]`;
/// 2. item id is non-empty;
/// 3. both labels are `synthetic` or `real` (any case);
/// 4. latency, when present, is a finite non-negative number (absent → 0);
/// 5. when `corpus` knows the item, the submitted true label matches it.
///
/// `correct` is always derived from the labels, never taken from the caller.
pub fn validate_submission(
    submission: &ResponseSubmission,
    corpus: Option<&dyn LabelLookup>,
) -> Result<ClassificationEvent, ValidationError> {
    let participant = submission.participant_id.trim();
    if participant.is_empty() {
        return Err(ValidationError::EmptyParticipantId);
    }
    if !is_valid_participant_id(participant) {
        return Err(ValidationError::IllegalParticipantId {
            id: participant.to_string(),
        });
    }

    let item = submission.item_id.trim();
    if item.is_empty() {
        return Err(ValidationError::EmptyItemId);
    }

    let true_label = parse_label("true_label", &submission.true_label)?;
    let given_label = parse_label("given_label", &submission.given_label)?;

    let latency_ms = match submission.latency_ms {
        None => 0,
        Some(ms) if ms.is_finite() && ms >= 0.0 => ms.round() as u64,
        Some(ms) => return Err(ValidationError::InvalidLatency { latency_ms: ms }),
    };

    let item_id = ItemId(item.to_string());
    let known = corpus.and_then(|lookup| lookup.label_of(&item_id));
    check_known_label(&item_id, known, true_label)?;

    Ok(ClassificationEvent::new(
        ParticipantId(participant.to_string()),
        item_id,
        true_label,
        given_label,
        latency_ms,
        submission.timestamp.unwrap_or_else(Utc::now),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugsurvey_state::Item;

    fn submission() -> ResponseSubmission {
        ResponseSubmission {
            participant_id: "p-1".to_string(),
            item_id: "astropy-1234".to_string(),
            true_label: "synthetic".to_string(),
            given_label: "Real".to_string(),
            latency_ms: Some(1530.4),
            timestamp: None,
        }
    }

    #[test]
    fn valid_submission_becomes_event() {
        let event = validate_submission(&submission(), None).unwrap();
        assert_eq!(event.participant_id.as_str(), "p-1");
        assert_eq!(event.true_label, Label::Synthetic);
        assert_eq!(event.given_label, Label::Real);
        assert!(!event.correct);
        assert_eq!(event.latency_ms, 1530);
    }

    #[test]
    fn missing_latency_defaults_to_zero() {
        let mut s = submission();
        s.latency_ms = None;
        assert_eq!(validate_submission(&s, None).unwrap().latency_ms, 0);
    }

    #[test]
    fn empty_ids_rejected() {
        let mut s = submission();
        s.participant_id = "  ".to_string();
        assert_eq!(
            validate_submission(&s, None).unwrap_err(),
            ValidationError::EmptyParticipantId
        );

        let mut s = submission();
        s.item_id.clear();
        assert_eq!(
            validate_submission(&s, None).unwrap_err(),
            ValidationError::EmptyItemId
        );
    }

    #[test]
    fn path_like_participant_rejected() {
        let mut s = submission();
        s.participant_id = "../etc".to_string();
        assert!(matches!(
            validate_submission(&s, None),
            Err(ValidationError::IllegalParticipantId { .. })
        ));
    }

    #[test]
    fn unknown_label_rejected() {
        let mut s = submission();
        s.given_label = "maybe".to_string();
        match validate_submission(&s, None).unwrap_err() {
            ValidationError::UnknownLabel { field, value } => {
                assert_eq!(field, "given_label");
                assert_eq!(value, "maybe");
            }
            other => panic!("Expected UnknownLabel, got {:?}", other),
        }
    }

    #[test]
    fn negative_or_nan_latency_rejected() {
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let mut s = submission();
            s.latency_ms = Some(bad);
            assert!(matches!(
                validate_submission(&s, None),
                Err(ValidationError::InvalidLatency { .. })
            ));
        }
    }

    #[test]
    fn corpus_label_must_agree() {
        let pools = Pools::new(
            vec![],
            vec![Item::new("astropy-1234", Label::Real, serde_json::json!({}))],
        );
        match validate_submission(&submission(), Some(&pools as &dyn LabelLookup)).unwrap_err() {
            ValidationError::LabelMismatch { expected, submitted, .. } => {
                assert_eq!(expected, Label::Real);
                assert_eq!(submitted, Label::Synthetic);
            }
            other => panic!("Expected LabelMismatch, got {:?}", other),
        }
    }

    #[test]
    fn unknown_item_passes_corpus_check() {
        let pools = Pools::default();
        assert!(validate_submission(&submission(), Some(&pools as &dyn LabelLookup)).is_ok());
    }

    #[test]
    fn front_end_field_names_deserialize() {
        let raw = serde_json::json!({
            "userId": "u1",
            "bugId": "b1",
            "actualType": "real",
            "userResponse": "real",
            "responseTime": 900
        });
        let s: ResponseSubmission = serde_json::from_value(raw).unwrap();
        let event = validate_submission(&s, None).unwrap();
        assert!(event.correct);
        assert_eq!(event.latency_ms, 900);
    }
}
