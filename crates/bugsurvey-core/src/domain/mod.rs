//! Domain errors and boundary validation.
//!
//! - `error`: `SurveyError`, `ValidationError`, `ConfigError`
//! - `validation`: `ResponseSubmission` → `ClassificationEvent`

pub mod error;
pub mod validation;

pub use error::{ConfigError, Result, SurveyError, ValidationError};
pub use validation::{
    is_valid_participant_id, validate_submission, LabelLookup, ResponseSubmission,
};
