//! bugsurvey - synthetic vs real bug classification survey CLI
//!
//! Serves batches of bug reports to participants, records their answers in a
//! JSON-lines event log and reports how well they tell synthetic bugs from
//! real ones.
//!
//! ## Commands
//!
//! - `register`: Issue a fresh participant id
//! - `corpus`: Show pool sizes
//! - `batch`: Serve unseen items to a participant
//! - `record`: Store one classification
//! - `summary`: Show one participant's results
//! - `report`: Show results across all participants
//!
//! JSON goes to stdout, logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bugsurvey_core::telemetry::parse_level;
use bugsurvey_core::{
    render_report_md, write_report_json, AggregateReport, Batch, ParticipantReport, PoolCounts,
    Reporter, ResponseRecorder, ResponseSubmission, SamplingCache, SurveyConfig, METRICS,
};
use bugsurvey_state::{EventLog, FsEventLog, ItemId, JsonlCorpus, ParticipantId};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info, Level};

#[derive(Parser)]
#[command(name = "bugsurvey")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Synthetic vs real bug classification survey", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Path to a TOML config file
    #[arg(long, global = true, env = "BUGSURVEY_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory holding the event log (overrides the config file)
    #[arg(long, global = true, env = "BUGSURVEY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a fresh participant id
    Register,

    /// Show the sizes of the synthetic and real pools
    Corpus,

    /// Serve a batch of items the participant has not seen yet
    Batch {
        /// Participant id
        #[arg(short, long)]
        participant: String,

        /// Number of items (default: sampling.default_batch_size)
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Record one classification; the true label is looked up in the corpus
    Record {
        /// Participant id
        #[arg(short, long)]
        participant: String,

        /// Item id being classified
        #[arg(short, long)]
        item: String,

        /// The participant's answer: synthetic or real
        #[arg(short, long)]
        answer: String,

        /// Time taken to answer, in milliseconds
        #[arg(long)]
        latency_ms: Option<f64>,
    },

    /// Show one participant's accuracy and significance
    Summary {
        /// Participant id
        #[arg(short, long)]
        participant: String,
    },

    /// Show results across all participants
    Report {
        /// Print markdown instead of JSON
        #[arg(long)]
        markdown: bool,

        /// Also write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Shared handles for one CLI invocation.
struct Survey {
    config: SurveyConfig,
    log: Arc<dyn EventLog>,
    cache: Arc<SamplingCache>,
}

impl Survey {
    async fn open(config: SurveyConfig) -> Result<Self> {
        let log: Arc<dyn EventLog> = Arc::new(
            FsEventLog::open(&config.data_dir)
                .await
                .with_context(|| format!("Failed to open event log under {:?}", config.data_dir))?,
        );
        let corpus = JsonlCorpus::new(&config.corpus.synthetic_path, &config.corpus.real_path);
        let cache = Arc::new(
            SamplingCache::from_source(&corpus, config.sampling.clone())
                .with_history(Arc::clone(&log)),
        );
        Ok(Self { config, log, cache })
    }

    fn recorder(&self) -> ResponseRecorder {
        ResponseRecorder::new(
            Arc::clone(&self.log),
            Arc::clone(&self.cache),
            self.config.stats.clone(),
        )
    }

    fn reporter(&self) -> Reporter {
        Reporter::new(Arc::clone(&self.log), self.config.stats.clone())
    }
}

#[derive(Debug, Serialize)]
struct Registration {
    participant_id: ParticipantId,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        SurveyConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        parse_level(&config.logging.level)
    };
    bugsurvey_core::init_tracing(cli.json || config.logging.json, level);
    debug!(data_dir = ?config.data_dir, "configuration loaded");

    let result = run(cli.command, config).await;
    METRICS.flush();
    result
}

async fn run(command: Commands, config: SurveyConfig) -> Result<()> {
    match command {
        Commands::Register => print_json(&cmd_register()),
        Commands::Corpus => print_json(&cmd_corpus(&Survey::open(config).await?)),
        Commands::Batch { participant, count } => {
            let survey = Survey::open(config).await?;
            print_json(&cmd_batch(&survey, &participant, count).await?)
        }
        Commands::Record {
            participant,
            item,
            answer,
            latency_ms,
        } => {
            let survey = Survey::open(config).await?;
            print_json(&cmd_record(&survey, &participant, &item, &answer, latency_ms).await?)
        }
        Commands::Summary { participant } => {
            let survey = Survey::open(config).await?;
            print_json(&cmd_summary(&survey, &participant).await?)
        }
        Commands::Report { markdown, output } => {
            let survey = Survey::open(config).await?;
            let report = cmd_report(&survey, output.as_deref()).await?;
            if markdown {
                print!("{}", render_report_md(&report));
                Ok(())
            } else {
                print_json(&report)
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

fn cmd_register() -> Registration {
    let participant_id = ParticipantId::generate();
    info!(participant = %participant_id, "registered participant");
    Registration { participant_id }
}

fn cmd_corpus(survey: &Survey) -> PoolCounts {
    survey.cache.pool_counts()
}

async fn cmd_batch(survey: &Survey, participant: &str, count: Option<usize>) -> Result<Batch> {
    let participant = parse_participant(participant)?;
    let n = count.unwrap_or(survey.config.sampling.default_batch_size);
    Ok(survey.cache.request_batch_with_counts(&participant, n).await)
}

async fn cmd_record(
    survey: &Survey,
    participant: &str,
    item: &str,
    answer: &str,
    latency_ms: Option<f64>,
) -> Result<ParticipantReport> {
    let Some(true_label) = survey.cache.label_of(&ItemId::from(item)) else {
        bail!("Item {:?} is not in the corpus", item);
    };
    let submission = ResponseSubmission {
        participant_id: participant.to_string(),
        item_id: item.to_string(),
        true_label: true_label.to_string(),
        given_label: answer.to_string(),
        latency_ms,
        timestamp: None,
    };
    survey
        .recorder()
        .record(&submission)
        .await
        .context("Failed to record response")
}

async fn cmd_summary(survey: &Survey, participant: &str) -> Result<ParticipantReport> {
    let participant = parse_participant(participant)?;
    survey
        .reporter()
        .summarize_participant(&participant)
        .await
        .context("Failed to read responses")
}

async fn cmd_report(survey: &Survey, output: Option<&Path>) -> Result<AggregateReport> {
    let report = survey
        .reporter()
        .summarize_all()
        .await
        .context("Failed to read responses")?;
    if let Some(path) = output {
        write_report_json(path, &report)?;
        info!(path = ?path, "report written");
    }
    Ok(report)
}

fn parse_participant(raw: &str) -> Result<ParticipantId> {
    let id = raw.trim();
    if !bugsurvey_core::domain::is_valid_participant_id(id) {
        bail!("Invalid participant id {:?}", raw);
    }
    Ok(ParticipantId::from(id))
}
