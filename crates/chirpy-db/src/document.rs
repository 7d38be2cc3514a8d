use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chirpy_types::StorageError;
use chirpy_types::models::{Chirp, ChirpId, User, UserId};

/// The single persisted aggregate. Maps are keyed by id (written as decimal
/// strings in JSON) so iteration order is ascending id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub chirps: BTreeMap<ChirpId, Chirp>,
    #[serde(default)]
    pub users: BTreeMap<UserId, User>,
    #[serde(default)]
    pub revoked_refresh_tokens: BTreeMap<String, DateTime<Utc>>,
}

impl StoreDocument {
    pub fn next_chirp_id(&self) -> ChirpId {
        next_id(&self.chirps)
    }

    pub fn next_user_id(&self) -> UserId {
        next_id(&self.users)
    }
}

/// Highest live id plus one. A live id is never handed out twice; the id of
/// a deleted entity is reused only when it was the highest.
fn next_id<V>(map: &BTreeMap<u64, V>) -> u64 {
    map.last_key_value().map_or(1, |(id, _)| id + 1)
}

/// Read the document at `path`. A missing file is an empty document.
pub(crate) fn read(path: &Path) -> Result<StoreDocument, StorageError> {
    match fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoreDocument::default()),
        Err(e) => Err(e.into()),
    }
}

/// Replace the document at `path` with write-then-rename so a reader never
/// sees a half-written file.
pub(crate) fn write(path: &Path, doc: &StoreDocument) -> Result<(), StorageError> {
    let json = serde_json::to_vec(doc)?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &json)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
