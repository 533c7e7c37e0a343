pub mod checkpoint;

pub use checkpoint::{Checkpoint, CheckpointManager};

use crate::corpus::{KeySelector, SourceCorpus};
use crate::translation::{
    RoundObserver, RunProgress, RunState, TranslationAccumulator, TranslationSession,
};
use crate::utils::{unix_timestamp, AppConfig, TranslationSessionConfig};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
pub struct AppState {
    pub config: AppConfig,
    pub sessions: Arc<RwLock<HashMap<String, SessionState>>>,
    pub checkpoints: Option<CheckpointManager>,
}

impl AppState {
    pub fn new(config: AppConfig, checkpoints: Option<CheckpointManager>) -> Self {
        Self {
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            checkpoints,
        }
    }
}

/// An automatic run in flight for a session.
pub struct ActiveRun {
    pub cancel: CancellationToken,
    pub progress: watch::Receiver<RunProgress>,
}

pub struct SessionState {
    pub session_id: String,
    pub source_files: Vec<PathBuf>,
    pub config: TranslationSessionConfig,
    pub corpus: Arc<SourceCorpus>,
    pub translations: TranslationAccumulator,
    pub status: RunState,
    pub rounds_completed: usize,
    pub last_error: Option<String>,
    pub active_run: Option<ActiveRun>,
    pub created_at: u64,
}

impl SessionState {
    pub fn new(
        session_id: String,
        source_files: Vec<PathBuf>,
        config: TranslationSessionConfig,
        corpus: SourceCorpus,
        seed: TranslationAccumulator,
    ) -> Self {
        Self {
            session_id,
            source_files,
            config,
            corpus: Arc::new(corpus),
            translations: seed,
            status: RunState::Idle,
            rounds_completed: 0,
            last_error: None,
            active_run: None,
            created_at: unix_timestamp(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active_run.is_some()
    }

    pub fn selector(&self) -> KeySelector {
        KeySelector::new(self.config.batch_size())
    }

    /// Progress view; while a run is active the counts come from its live
    /// snapshot rather than the stored accumulator.
    pub fn summary(&self) -> TranslationSession {
        let common_keys = self.corpus.common_keys().len();
        let (status, translated_keys, remaining_keys, rounds_completed) = match &self.active_run {
            Some(run) => {
                let progress = run.progress.borrow();
                (
                    progress.state,
                    progress.translated_keys,
                    progress.remaining_keys,
                    progress.rounds_completed,
                )
            }
            None => (
                self.status,
                self.translations.len(),
                self.selector().remaining(&self.corpus, &self.translations),
                self.rounds_completed,
            ),
        };

        let done = common_keys.saturating_sub(remaining_keys);
        TranslationSession {
            session_id: self.session_id.clone(),
            target_language: self.config.target_language.clone(),
            status: status.to_string(),
            progress: if common_keys > 0 {
                done as f32 / common_keys as f32
            } else {
                1.0
            },
            translated_keys,
            common_keys,
            rounds_completed,
            last_error: self.last_error.clone(),
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        let mut checkpoint = Checkpoint::new(
            &self.session_id,
            self.source_files.clone(),
            &self.config.target_language,
        );
        checkpoint.translations = self.translations.clone();
        checkpoint.rounds_completed = self.rounds_completed;
        checkpoint.status = self.status;
        checkpoint.last_error = self.last_error.clone();
        checkpoint.created_at = self.created_at;
        checkpoint
    }
}

/// Persists each merged round of an automatic run.
pub struct CheckpointObserver {
    checkpoints: CheckpointManager,
    session_id: String,
    rounds_before: usize,
}

impl CheckpointObserver {
    pub fn new(checkpoints: CheckpointManager, session_id: String, rounds_before: usize) -> Self {
        Self {
            checkpoints,
            session_id,
            rounds_before,
        }
    }
}

impl RoundObserver for CheckpointObserver {
    fn round_completed(&self, progress: &RunProgress, translations: &TranslationAccumulator) {
        if let Err(e) = self.checkpoints.record_progress(
            &self.session_id,
            translations,
            self.rounds_before + progress.rounds_completed,
            progress.state,
            None,
        ) {
            tracing::warn!(session_id = %self.session_id, error = %e, "Failed to save checkpoint");
        }
    }
}
