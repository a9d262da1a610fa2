use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::schema::{ClassificationEvent, ParticipantId};
use crate::storage_traits::{EventLog, StorageResult};

const LOG_EXTENSION: &str = "jsonl";

/// Filesystem-backed event log, one JSON-lines file per participant.
///
/// Layout: `<root>/responses/<participant id>.jsonl`
///
/// Appends and reads exclude each other through a single `RwLock`, so a reader
/// always sees whole records.
pub struct FsEventLog {
    responses_dir: PathBuf,
    lock: RwLock<()>,
}

impl FsEventLog {
    /// Create a log rooted at `root`. Creates `root/responses/` if needed.
    pub async fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let responses_dir = root.as_ref().join("responses");
        fs::create_dir_all(&responses_dir).await?;
        Ok(Self {
            responses_dir,
            lock: RwLock::new(()),
        })
    }

    pub fn responses_dir(&self) -> &Path {
        &self.responses_dir
    }

    fn log_path(&self, participant: &ParticipantId) -> StorageResult<PathBuf> {
        if !is_valid_key(participant.as_str()) {
            return Err(StorageError::InvalidKey {
                key: participant.0.clone(),
            });
        }
        Ok(self
            .responses_dir
            .join(format!("{}.{}", participant.as_str(), LOG_EXTENSION)))
    }

    async fn read_file(path: &Path) -> StorageResult<Vec<ClassificationEvent>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut events = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ClassificationEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => warn!(
                    path = %path.display(),
                    line = lineno + 1,
                    error = %e,
                    "skipping unparseable event record"
                ),
            }
        }
        Ok(events)
    }

    async fn log_files(&self) -> StorageResult<Vec<(ParticipantId, PathBuf)>> {
        let mut entries = fs::read_dir(&self.responses_dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(LOG_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                files.push((ParticipantId(stem.to_string()), path));
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}

/// Participant ids double as file names; keep them inside `responses/`.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[async_trait]
impl EventLog for FsEventLog {
    async fn append(&self, event: ClassificationEvent) -> StorageResult<()> {
        let path = self.log_path(&event.participant_id)?;
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');

        let _guard = self.lock.write().await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        debug!(participant = %event.participant_id, item = %event.item_id, "event appended");
        Ok(())
    }

    async fn read_participant(
        &self,
        participant: &ParticipantId,
    ) -> StorageResult<Vec<ClassificationEvent>> {
        let path = self.log_path(participant)?;
        let _guard = self.lock.read().await;
        Self::read_file(&path).await
    }

    async fn read_all(&self) -> StorageResult<Vec<ClassificationEvent>> {
        let _guard = self.lock.read().await;
        let mut events = Vec::new();
        for (_, path) in self.log_files().await? {
            events.extend(Self::read_file(&path).await?);
        }
        Ok(events)
    }

    async fn participants(&self) -> StorageResult<Vec<ParticipantId>> {
        let _guard = self.lock.read().await;
        Ok(self
            .log_files()
            .await?
            .into_iter()
            .map(|(participant, _)| participant)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Label;
    use chrono::Utc;

    fn event(participant: &str, item: &str) -> ClassificationEvent {
        ClassificationEvent::new(
            participant.into(),
            item.into(),
            Label::Synthetic,
            Label::Real,
            850,
            Utc::now(),
        )
    }

    #[test]
    fn key_validation() {
        assert!(is_valid_key("abc-123_x.y"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key(".."));
        assert!(!is_valid_key("a/b"));
        assert!(!is_valid_key("a b"));
    }

    #[tokio::test]
    async fn writes_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let log = FsEventLog::open(dir.path()).await.unwrap();
        log.append(event("p1", "i1")).await.unwrap();
        log.append(event("p1", "i2")).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("responses").join("p1.jsonl")).unwrap();
        assert_eq!(raw.lines().count(), 2);
    }

    #[tokio::test]
    async fn skips_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = FsEventLog::open(dir.path()).await.unwrap();
        log.append(event("p1", "i1")).await.unwrap();

        let path = dir.path().join("responses").join("p1.jsonl");
        let mut raw = std::fs::read_to_string(&path).unwrap();
        raw.push_str("{not json\n\n");
        std::fs::write(&path, raw).unwrap();
        log.append(event("p1", "i2")).await.unwrap();

        let events = log.read_participant(&"p1".into()).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].item_id.as_str(), "i2");
    }

    #[tokio::test]
    async fn ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let log = FsEventLog::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("responses").join("notes.txt"), "hi").unwrap();
        log.append(event("p2", "i1")).await.unwrap();

        let participants = log.participants().await.unwrap();
        assert_eq!(participants, vec![ParticipantId::from("p2")]);
    }

    #[tokio::test]
    async fn rejects_path_like_participant_ids() {
        let dir = tempfile::tempdir().unwrap();
        let log = FsEventLog::open(dir.path()).await.unwrap();
        let err = log.append(event("../escape", "i1")).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey { .. }));
    }
}
