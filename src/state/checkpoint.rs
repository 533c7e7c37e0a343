use crate::translation::{RunState, TranslationAccumulator};
use crate::utils::{unix_timestamp, LocaleFillError, Result};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const CHECKPOINTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("checkpoints");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub session_id: String,
    pub source_files: Vec<PathBuf>,
    pub target_language: String,
    pub translations: TranslationAccumulator,
    pub rounds_completed: usize,
    pub status: RunState,
    pub last_error: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Checkpoint {
    pub fn new(session_id: &str, source_files: Vec<PathBuf>, target_language: &str) -> Self {
        let now = unix_timestamp();
        Self {
            session_id: session_id.to_string(),
            source_files,
            target_language: target_language.to_string(),
            translations: TranslationAccumulator::new(),
            rounds_completed: 0,
            status: RunState::Idle,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone)]
pub struct CheckpointManager {
    db: Arc<Database>,
}

impl CheckpointManager {
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(db_path)
            .map_err(|e| LocaleFillError::DatabaseError(e.to_string()))?;

        let write_txn = db
            .begin_write()
            .map_err(|e| LocaleFillError::DatabaseError(e.to_string()))?;
        {
            let _ = write_txn
                .open_table(CHECKPOINTS_TABLE)
                .map_err(|e| LocaleFillError::DatabaseError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| LocaleFillError::DatabaseError(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let data = serde_json::to_vec(checkpoint)
            .map_err(|e| LocaleFillError::SerializationError(e.to_string()))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| LocaleFillError::DatabaseError(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(CHECKPOINTS_TABLE)
                .map_err(|e| LocaleFillError::DatabaseError(e.to_string()))?;
            table
                .insert(checkpoint.session_id.as_str(), data.as_slice())
                .map_err(|e| LocaleFillError::DatabaseError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| LocaleFillError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    pub fn load_checkpoint(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| LocaleFillError::DatabaseError(e.to_string()))?;

        let table = read_txn
            .open_table(CHECKPOINTS_TABLE)
            .map_err(|e| LocaleFillError::DatabaseError(e.to_string()))?;

        match table.get(session_id) {
            Ok(Some(data)) => {
                let checkpoint: Checkpoint = serde_json::from_slice(data.value())
                    .map_err(|e| LocaleFillError::SerializationError(e.to_string()))?;
                Ok(Some(checkpoint))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(LocaleFillError::DatabaseError(e.to_string())),
        }
    }

    /// Replaces the stored translations and progress for an existing session.
    pub fn record_progress(
        &self,
        session_id: &str,
        translations: &TranslationAccumulator,
        rounds_completed: usize,
        status: RunState,
        last_error: Option<String>,
    ) -> Result<()> {
        let mut checkpoint = self
            .load_checkpoint(session_id)?
            .ok_or_else(|| LocaleFillError::SessionNotFound(session_id.to_string()))?;

        checkpoint.translations = translations.clone();
        checkpoint.rounds_completed = rounds_completed;
        checkpoint.status = status;
        checkpoint.last_error = last_error;
        checkpoint.updated_at = unix_timestamp();

        self.save_checkpoint(&checkpoint)
    }

    pub fn list_sessions(&self) -> Result<Vec<String>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| LocaleFillError::DatabaseError(e.to_string()))?;

        let table = read_txn
            .open_table(CHECKPOINTS_TABLE)
            .map_err(|e| LocaleFillError::DatabaseError(e.to_string()))?;

        let mut sessions = Vec::new();
        let iter = table
            .iter()
            .map_err(|e| LocaleFillError::DatabaseError(e.to_string()))?;

        for result in iter {
            let (key, _) = result.map_err(|e| LocaleFillError::DatabaseError(e.to_string()))?;
            sessions.push(key.value().to_string());
        }

        Ok(sessions)
    }
}
