//! bugsurvey core library
//!
//! Sampling, statistics and reporting for the synthetic-vs-real bug
//! classification study. Storage lives in `bugsurvey-state`.

pub mod aggregate;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod recording;
pub mod reporting;
pub mod sampling;
pub mod stats;
pub mod telemetry;

pub use aggregate::{
    summarize, summarize_traced, summarize_with, ConfusionMatrix, LabelStats, Significance,
    Summary,
};
pub use config::{CorpusConfig, LoggingConfig, SurveyConfig};
pub use domain::{
    validate_submission, ConfigError, LabelLookup, ResponseSubmission, Result, SurveyError,
    ValidationError,
};
pub use recording::ResponseRecorder;
pub use reporting::{
    aggregate, render_report_md, write_report_json, write_report_md, AggregateReport,
    ParticipantReport, Reporter, ResponseDistribution,
};
pub use sampling::{Batch, BatchCounts, PoolCounts, SamplingCache, SamplingPolicy};
pub use stats::{
    binomial_p_value, erf, normal_cdf, wilson_interval, z_score, ResponseTimeStats, StatsConfig,
    WilsonInterval,
};

pub use bugsurvey_state::{
    ClassificationEvent, CorpusError, FsEventLog, Item, ItemId, JsonlCorpus, Label,
    ParticipantId, Pools, StorageError,
};

pub use metrics::METRICS;
pub use obs::{
    emit_batch_served, emit_response_recorded, emit_response_rejected, emit_seen_reset,
    emit_summary_computed, ParticipantSpan,
};
pub use telemetry::init_tracing;

/// bugsurvey version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
