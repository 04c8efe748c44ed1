use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::identity::domain::identity_store::{IdentityStore, StoreError};
use crate::identity::domain::reference_identity::{CaptureRecord, ReferenceIdentity};

const IDENTITIES_FILE: &str = "identities.json";
const CAPTURES_FILE: &str = "captures.json";

#[derive(Serialize, Deserialize)]
struct Table<T> {
    next_id: u64,
    rows: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: Vec::new(),
        }
    }
}

/// Identity store kept as two JSON files in one directory.
///
/// Every call reads from disk, so several processes (a monitor and an
/// admin command) see each other's writes. Writes go to a `.part` file
/// first and are renamed into place.
pub struct JsonIdentityStore {
    dir: PathBuf,
}

impl JsonIdentityStore {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(io_error(dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Platform data location: `<data dir>/Hawkeye/store`.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("Hawkeye").join("store"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_table<T: DeserializeOwned>(&self, name: &str) -> Result<Table<T>, StoreError> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(Table::default());
        }
        let json = fs::read_to_string(&path).map_err(io_error(&path))?;
        serde_json::from_str(&json).map_err(|e| StoreError::Corrupt { path, source: e })
    }

    fn write_table<T: Serialize>(&self, name: &str, table: &Table<T>) -> Result<(), StoreError> {
        let dest = self.dir.join(name);
        let json = serde_json::to_vec_pretty(table).map_err(|e| StoreError::Corrupt {
            path: dest.clone(),
            source: e,
        })?;

        let temp_path = dest.with_extension("part");
        let mut file = fs::File::create(&temp_path).map_err(io_error(&temp_path))?;
        file.write_all(&json).map_err(io_error(&temp_path))?;
        file.flush().map_err(io_error(&temp_path))?;
        drop(file);
        fs::rename(&temp_path, &dest).map_err(io_error(&dest))
    }
}

impl IdentityStore for JsonIdentityStore {
    fn references(&self) -> Result<Vec<ReferenceIdentity>, StoreError> {
        Ok(self.read_table::<ReferenceIdentity>(IDENTITIES_FILE)?.rows)
    }

    fn add_reference(
        &mut self,
        name: &str,
        embedding: Vec<f32>,
        image_path: Option<PathBuf>,
    ) -> Result<u64, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        validate_embedding(&embedding)?;

        let mut table = self.read_table::<ReferenceIdentity>(IDENTITIES_FILE)?;
        let id = table.next_id;
        table.next_id += 1;
        table.rows.push(ReferenceIdentity {
            id,
            name: name.to_string(),
            embedding,
            image_path,
        });
        self.write_table(IDENTITIES_FILE, &table)?;
        log::info!("Registered trusted identity '{name}' (id {id})");
        Ok(id)
    }

    fn remove_reference(&mut self, id: u64) -> Result<bool, StoreError> {
        let mut table = self.read_table::<ReferenceIdentity>(IDENTITIES_FILE)?;
        let before = table.rows.len();
        table.rows.retain(|r| r.id != id);
        if table.rows.len() == before {
            return Ok(false);
        }
        self.write_table(IDENTITIES_FILE, &table)?;
        Ok(true)
    }

    fn log_capture(&mut self, image_path: &Path) -> Result<u64, StoreError> {
        let mut table = self.read_table::<CaptureRecord>(CAPTURES_FILE)?;
        let id = table.next_id;
        table.next_id += 1;
        table.rows.push(CaptureRecord {
            id,
            image_path: image_path.to_path_buf(),
            timestamp: unix_now(),
        });
        self.write_table(CAPTURES_FILE, &table)?;
        Ok(id)
    }

    fn captures(&self) -> Result<Vec<CaptureRecord>, StoreError> {
        let mut rows = self.read_table::<CaptureRecord>(CAPTURES_FILE)?.rows;
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}

fn validate_embedding(embedding: &[f32]) -> Result<(), StoreError> {
    if embedding.is_empty() {
        return Err(StoreError::InvalidEmbedding("embedding is empty".to_string()));
    }
    if let Some(pos) = embedding.iter().position(|v| !v.is_finite()) {
        return Err(StoreError::InvalidEmbedding(format!(
            "non-finite value at index {pos}"
        )));
    }
    Ok(())
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io { path, source }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
