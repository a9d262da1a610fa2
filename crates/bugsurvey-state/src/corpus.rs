//! JSON-lines corpus loader.
//!
//! Each pool is one file with one JSON object per line. Every object must carry
//! a string `instance_id`; the remaining fields are kept verbatim as the item's
//! opaque payload. The label comes from the file, not the record.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::error::CorpusError;
use crate::schema::{Item, ItemId, Label, Pools};
use crate::storage_traits::CorpusSource;

const ID_FIELD: &str = "instance_id";

/// Corpus backed by two JSON-lines files
#[derive(Debug, Clone)]
pub struct JsonlCorpus {
    synthetic_path: PathBuf,
    real_path: PathBuf,
}

impl JsonlCorpus {
    pub fn new(synthetic_path: impl Into<PathBuf>, real_path: impl Into<PathBuf>) -> Self {
        Self {
            synthetic_path: synthetic_path.into(),
            real_path: real_path.into(),
        }
    }

    /// Load both pools, failing on the first unreadable file.
    pub fn load(&self) -> Result<Pools, CorpusError> {
        Ok(Pools::new(
            load_pool(&self.synthetic_path, Label::Synthetic)?,
            load_pool(&self.real_path, Label::Real)?,
        ))
    }
}

impl CorpusSource for JsonlCorpus {
    fn load_pools(&self) -> Pools {
        let load_or_empty = |path: &Path, label: Label| {
            load_pool(path, label).unwrap_or_else(|e| {
                warn!(label = %label, error = %e, "corpus pool unavailable, using empty pool");
                Vec::new()
            })
        };
        let pools = Pools::new(
            load_or_empty(&self.synthetic_path, Label::Synthetic),
            load_or_empty(&self.real_path, Label::Real),
        );
        info!(
            synthetic = pools.synthetic.len(),
            real = pools.real.len(),
            "corpus loaded"
        );
        pools
    }
}

/// Read one pool file. Blank and malformed lines are skipped.
pub fn load_pool(path: &Path, label: Label) -> Result<Vec<Item>, CorpusError> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            CorpusError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            CorpusError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let mut items = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_item(line, label) {
            Some(item) => items.push(item),
            None => warn!(
                path = %path.display(),
                line = lineno + 1,
                "skipping corpus record without a usable instance_id"
            ),
        }
    }
    Ok(items)
}

fn parse_item(line: &str, label: Label) -> Option<Item> {
    let Value::Object(mut fields) = serde_json::from_str::<Value>(line).ok()? else {
        return None;
    };
    let id = match fields.remove(ID_FIELD)? {
        Value::String(id) if !id.is_empty() => id,
        _ => return None,
    };
    Some(Item {
        id: ItemId(id),
        label,
        payload: Value::Object(fields),
    })
}
