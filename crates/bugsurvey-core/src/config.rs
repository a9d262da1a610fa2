//! Survey configuration, read from a TOML file.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;
use crate::sampling::SamplingPolicy;
use crate::stats::StatsConfig;

/// Location of the two corpus files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub synthetic_path: PathBuf,
    pub real_path: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            synthetic_path: PathBuf::from("data/corpus/synthetic.jsonl"),
            real_path: PathBuf::from("data/corpus/real.jsonl"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Newline-delimited JSON instead of human-readable lines
    pub json: bool,
    /// Default level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: "info".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// Root of the event log (`<data_dir>/responses/`)
    pub data_dir: PathBuf,
    pub corpus: CorpusConfig,
    pub sampling: SamplingPolicy,
    pub stats: StatsConfig,
    pub logging: LoggingConfig,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            corpus: CorpusConfig::default(),
            sampling: SamplingPolicy::default(),
            stats: StatsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SurveyConfig {
    /// Load from `path`, or defaults when `path` is `None`. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            None => Self::default(),
            Some(path) => Self::from_file(path)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.sampling.reset_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(invalid("sampling.reset_threshold", format!("{t} not in (0, 1]")));
        }
        let alpha = self.stats.alpha;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(invalid("stats.alpha", format!("{alpha} not in (0, 1)")));
        }
        let z = self.stats.confidence_z;
        if !(z > 0.0 && z.is_finite()) {
            return Err(invalid("stats.confidence_z", format!("{z} must be positive")));
        }
        let cap = self.stats.cdf_cap;
        if !(cap > 0.5 && cap <= 1.0) {
            return Err(invalid("stats.cdf_cap", format!("{cap} not in (0.5, 1]")));
        }
        Ok(())
    }

    /// Override the data directory, e.g. from the command line.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = SurveyConfig::load(None).unwrap();
        assert_eq!(config.sampling.default_batch_size, 10);
        assert_eq!(config.sampling.reset_threshold, 0.8);
        assert_eq!(config.stats.significance_floor, 10);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let toml_str = r#"
            data_dir = "/srv/survey"

            [sampling]
            seed = 42
            reset_threshold = 0.5

            [stats]
            alpha = 0.01
        "#;
        let config: SurveyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/survey"));
        assert_eq!(config.sampling.seed, Some(42));
        assert_eq!(config.sampling.reset_threshold, 0.5);
        assert!(config.sampling.reseed_with_batch);
        assert_eq!(config.stats.alpha, 0.01);
        assert_eq!(config.stats.confidence_z, 1.96);
        assert_eq!(config.corpus, CorpusConfig::default());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\njson = true\nlevel = \"debug\"").unwrap();
        let config = SurveyConfig::load(Some(file.path())).unwrap();
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SurveyConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sampling\nseed = ").unwrap();
        let err = SurveyConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn out_of_range_values_rejected() {
        let mut config = SurveyConfig::default();
        config.sampling.reset_threshold = 0.0;
        match config.validate().unwrap_err() {
            ConfigError::Invalid { field, .. } => assert_eq!(field, "sampling.reset_threshold"),
            other => panic!("Expected Invalid, got {:?}", other),
        }

        let mut config = SurveyConfig::default();
        config.stats.cdf_cap = 0.4;
        assert!(config.validate().is_err());

        let mut config = SurveyConfig::default();
        config.stats.alpha = 1.0;
        assert!(config.validate().is_err());

        let mut config = SurveyConfig::default();
        config.stats.confidence_z = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip() {
        let config = SurveyConfig::default().with_data_dir("/tmp/x");
        let text = toml::to_string(&config).unwrap();
        let back: SurveyConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
