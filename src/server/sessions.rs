use crate::corpus::{describe_corpus, CorpusMetadata, SourceCorpus, TranslationExporter};
use crate::state::{ActiveRun, AppState, CheckpointObserver, SessionState};
use crate::translation::{
    AnthropicClient, CompletionService, PromptBuilder, ResponseExtractor, RunState,
    TranslationAccumulator, TranslationOrchestrator, TranslationSession,
};
use crate::utils::{LocaleFillError, Result, TranslationSessionConfig};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type ServiceFactory =
    Arc<dyn Fn(&TranslationSessionConfig) -> Result<Arc<dyn CompletionService>> + Send + Sync>;

pub fn anthropic_factory() -> ServiceFactory {
    Arc::new(
        |config: &TranslationSessionConfig| -> Result<Arc<dyn CompletionService>> {
            let client = AnthropicClient::new(config.clone())?;
            Ok(Arc::new(client))
        },
    )
}

#[derive(Debug, Clone, Default)]
pub struct SessionRequest {
    pub files: Vec<PathBuf>,
    pub target_language: Option<String>,
    pub seed_file: Option<PathBuf>,
    pub resume_session_id: Option<String>,
    pub batch_size: Option<usize>,
    pub pacing_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionCreated {
    pub session_id: String,
    pub target_language: String,
    pub metadata: CorpusMetadata,
    pub seeded_keys: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NextPrompt {
    pub session_id: String,
    pub keys: Vec<String>,
    pub remaining_keys: usize,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MergeResult {
    pub session_id: String,
    pub merged_keys: usize,
    pub added_keys: usize,
    pub translated_keys: usize,
    pub remaining_keys: usize,
}

/// A session stored in the checkpoint database, resumable via
/// `resume_session_id`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoredSession {
    pub session_id: String,
    pub target_language: String,
    pub status: String,
    pub translated_keys: usize,
    pub rounds_completed: usize,
    pub updated_at: u64,
}

/// Session operations shared by the MCP tools.
#[derive(Clone)]
pub struct SessionService {
    state: AppState,
    service_factory: ServiceFactory,
}

impl SessionService {
    pub fn new(state: AppState, service_factory: ServiceFactory) -> Self {
        Self {
            state,
            service_factory,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn init_session(&self, request: SessionRequest) -> Result<SessionCreated> {
        let mut seed = TranslationAccumulator::new();
        let mut session_id = None;
        let mut rounds_completed = 0;
        let mut created_at = None;
        let mut target_language = request.target_language.clone();
        let mut files = request.files.clone();

        if let Some(resume_id) = &request.resume_session_id {
            let checkpoints = self.state.checkpoints.as_ref().ok_or_else(|| {
                LocaleFillError::CheckpointError("checkpoints are disabled".to_string())
            })?;
            let checkpoint = checkpoints
                .load_checkpoint(resume_id)?
                .ok_or_else(|| LocaleFillError::SessionNotFound(resume_id.clone()))?;

            seed = checkpoint.translations;
            rounds_completed = checkpoint.rounds_completed;
            created_at = Some(checkpoint.created_at);
            target_language = target_language.or(Some(checkpoint.target_language));
            if files.is_empty() {
                files = checkpoint.source_files;
            }
            session_id = Some(checkpoint.session_id);
        }

        if let Some(seed_file) = &request.seed_file {
            let text = tokio::fs::read_to_string(seed_file).await?;
            seed.merge(TranslationAccumulator::from_paste(&text)?.into_inner());
        }

        let target_language = target_language
            .or_else(|| self.state.config.translation.target_language.clone())
            .filter(|lang| !lang.trim().is_empty())
            .ok_or_else(|| {
                LocaleFillError::ConfigError("a target language is required".to_string())
            })?;

        let corpus = SourceCorpus::load_files(&files).await?;

        let mut config = self.state.config.session_config(&target_language);
        if let Some(batch_size) = request.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(pacing) = request.pacing_interval_ms {
            config.pacing_interval_ms = pacing;
        }

        let metadata = describe_corpus(&corpus, config.batch_size());
        let max_prompt_tokens = self.state.config.translation.max_prompt_tokens;
        if metadata.estimated_prompt_tokens > max_prompt_tokens {
            tracing::warn!(
                estimated_prompt_tokens = metadata.estimated_prompt_tokens,
                max_prompt_tokens = max_prompt_tokens,
                "Prompt estimate exceeds the configured budget, consider a smaller batch_size"
            );
        }
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let seeded_keys = seed.len();

        let mut session =
            SessionState::new(session_id.clone(), files, config, corpus, seed);
        session.rounds_completed = rounds_completed;
        if let Some(created_at) = created_at {
            session.created_at = created_at;
        }
        self.save_checkpoint(&session);

        self.state
            .sessions
            .write()
            .await
            .insert(session_id.clone(), session);

        tracing::info!(
            session_id = %session_id,
            target_language = %target_language,
            common_keys = metadata.common_keys,
            seeded_keys = seeded_keys,
            "Session initialized"
        );

        Ok(SessionCreated {
            session_id,
            target_language,
            metadata,
            seeded_keys,
        })
    }

    /// Manual mode: the batch and prompt the next round would send.
    pub async fn next_prompt(&self, session_id: &str) -> Result<NextPrompt> {
        let sessions = self.state.sessions.read().await;
        let session = sessions
            .get(session_id)
            .ok_or_else(|| LocaleFillError::SessionNotFound(session_id.to_string()))?;

        let selector = session.selector();
        let batch = selector.next_batch(&session.corpus, &session.translations);
        let remaining_keys = selector.remaining(&session.corpus, &session.translations);

        let prompt = if batch.is_empty() {
            None
        } else {
            Some(PromptBuilder::new(session.config.target_language.clone()).build(&session.corpus, &batch))
        };

        Ok(NextPrompt {
            session_id: session_id.to_string(),
            keys: batch.into_keys(),
            remaining_keys,
            prompt,
        })
    }

    /// Manual mode: merges a reply (or any pasted JSON) into the session.
    pub async fn submit_reply(&self, session_id: &str, reply: &str) -> Result<MergeResult> {
        let mut sessions = self.state.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| LocaleFillError::SessionNotFound(session_id.to_string()))?;

        if session.is_running() {
            return Err(LocaleFillError::ConfigError(format!(
                "session {} has an automatic run in progress",
                session_id
            )));
        }

        let parsed = ResponseExtractor::new().extract(reply)?;
        let merged_keys = parsed.len();
        let added_keys = session.translations.merge(parsed);
        session.rounds_completed += 1;
        session.last_error = None;

        let remaining_keys = session
            .selector()
            .remaining(&session.corpus, &session.translations);
        session.status = if remaining_keys == 0 {
            RunState::StoppedByExhaustion
        } else {
            RunState::Idle
        };
        self.save_checkpoint(session);

        Ok(MergeResult {
            session_id: session_id.to_string(),
            merged_keys,
            added_keys,
            translated_keys: session.translations.len(),
            remaining_keys,
        })
    }

    /// Starts an automatic run in the background. The returned handle
    /// resolves once the session has absorbed the run's result.
    pub async fn start_run(&self, session_id: &str) -> Result<JoinHandle<()>> {
        let mut sessions = self.state.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| LocaleFillError::SessionNotFound(session_id.to_string()))?;

        if session.is_running() {
            return Err(LocaleFillError::ConfigError(format!(
                "session {} is already running",
                session_id
            )));
        }

        let service = (self.service_factory)(&session.config)?;
        let mut orchestrator =
            TranslationOrchestrator::new(session.corpus.clone(), service, &session.config);
        if let Some(checkpoints) = &self.state.checkpoints {
            orchestrator = orchestrator.with_observer(Arc::new(CheckpointObserver::new(
                checkpoints.clone(),
                session_id.to_string(),
                session.rounds_completed,
            )));
        }

        let cancel = CancellationToken::new();
        session.active_run = Some(ActiveRun {
            cancel: cancel.clone(),
            progress: orchestrator.subscribe(),
        });
        session.status = RunState::Running;
        session.last_error = None;
        let seed = session.translations.clone();

        let this = self.clone();
        let session_id = session_id.to_string();
        tracing::info!(session_id = %session_id, "Starting automatic translation run");

        Ok(tokio::spawn(async move {
            let report = orchestrator.run(seed, &cancel).await;

            let mut sessions = this.state.sessions.write().await;
            if let Some(session) = sessions.get_mut(&session_id) {
                session.translations = report.translations;
                session.status = report.state;
                session.rounds_completed += report.rounds_completed;
                session.last_error = report.failure;
                session.active_run = None;
                this.save_checkpoint(session);
            }
        }))
    }

    pub async fn cancel_run(&self, session_id: &str) -> Result<bool> {
        let sessions = self.state.sessions.read().await;
        let session = sessions
            .get(session_id)
            .ok_or_else(|| LocaleFillError::SessionNotFound(session_id.to_string()))?;

        Ok(match &session.active_run {
            Some(run) => {
                run.cancel.cancel();
                true
            }
            None => false,
        })
    }

    pub async fn progress(&self, session_id: &str) -> Result<TranslationSession> {
        let sessions = self.state.sessions.read().await;
        sessions
            .get(session_id)
            .map(SessionState::summary)
            .ok_or_else(|| LocaleFillError::SessionNotFound(session_id.to_string()))
    }

    pub async fn translations(&self, session_id: &str) -> Result<TranslationAccumulator> {
        let sessions = self.state.sessions.read().await;
        sessions
            .get(session_id)
            .map(|session| session.translations.clone())
            .ok_or_else(|| LocaleFillError::SessionNotFound(session_id.to_string()))
    }

    pub fn stored_sessions(&self) -> Result<Vec<StoredSession>> {
        let checkpoints = self.state.checkpoints.as_ref().ok_or_else(|| {
            LocaleFillError::CheckpointError("checkpoints are disabled".to_string())
        })?;

        let mut stored = Vec::new();
        for session_id in checkpoints.list_sessions()? {
            if let Some(checkpoint) = checkpoints.load_checkpoint(&session_id)? {
                stored.push(StoredSession {
                    session_id: checkpoint.session_id,
                    target_language: checkpoint.target_language,
                    status: checkpoint.status.to_string(),
                    translated_keys: checkpoint.translations.len(),
                    rounds_completed: checkpoint.rounds_completed,
                    updated_at: checkpoint.updated_at,
                });
            }
        }
        Ok(stored)
    }

    pub async fn export(&self, session_id: &str, output_dir: PathBuf) -> Result<PathBuf> {
        let (target_language, translations) = {
            let sessions = self.state.sessions.read().await;
            let session = sessions
                .get(session_id)
                .ok_or_else(|| LocaleFillError::SessionNotFound(session_id.to_string()))?;
            (
                session.config.target_language.clone(),
                session.translations.clone(),
            )
        };

        TranslationExporter::new(output_dir)
            .export(&target_language, &translations)
            .await
    }

    fn save_checkpoint(&self, session: &SessionState) {
        if let Some(checkpoints) = &self.state.checkpoints {
            if let Err(e) = checkpoints.save_checkpoint(&session.checkpoint()) {
                tracing::warn!(session_id = %session.session_id, error = %e, "Failed to save checkpoint");
            }
        }
    }
}
