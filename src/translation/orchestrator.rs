use crate::corpus::{KeyBatch, KeySelector, SourceCorpus};
use crate::translation::accumulator::TranslationAccumulator;
use crate::translation::client::CompletionService;
use crate::translation::extractor::ResponseExtractor;
use crate::translation::prompt::PromptBuilder;
use crate::utils::{LocaleFillError, Result, TranslationSessionConfig};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No automatic run has started since the session was loaded.
    Idle,
    Running,
    StoppedByExhaustion,
    StoppedByFailure,
    StoppedByCancellation,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Running => write!(f, "running"),
            RunState::StoppedByExhaustion => write!(f, "exhausted"),
            RunState::StoppedByFailure => write!(f, "failed"),
            RunState::StoppedByCancellation => write!(f, "cancelled"),
        }
    }
}

/// Read-only snapshot published after every round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunProgress {
    pub state: RunState,
    pub rounds_completed: usize,
    pub translated_keys: usize,
    pub remaining_keys: usize,
}

/// Everything a run produced. `translations` is the accumulator as it stood
/// when the run stopped, whatever the reason.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub translations: TranslationAccumulator,
    pub state: RunState,
    pub rounds_completed: usize,
    pub failure: Option<String>,
}

/// Hook for persisting progress between rounds.
pub trait RoundObserver: Send + Sync {
    fn round_completed(&self, progress: &RunProgress, translations: &TranslationAccumulator);
}

enum RoundOutcome {
    Exhausted,
    Merged { requested: usize, added: usize },
}

pub struct TranslationOrchestrator {
    corpus: Arc<SourceCorpus>,
    selector: KeySelector,
    prompts: PromptBuilder,
    extractor: ResponseExtractor,
    service: Arc<dyn CompletionService>,
    pacing: Duration,
    timeout: Duration,
    progress: watch::Sender<RunProgress>,
    observer: Option<Arc<dyn RoundObserver>>,
}

impl TranslationOrchestrator {
    pub fn new(
        corpus: Arc<SourceCorpus>,
        service: Arc<dyn CompletionService>,
        config: &TranslationSessionConfig,
    ) -> Self {
        let (progress, _) = watch::channel(RunProgress {
            state: RunState::Running,
            rounds_completed: 0,
            translated_keys: 0,
            remaining_keys: corpus.common_keys().len(),
        });

        Self {
            corpus,
            selector: KeySelector::new(config.batch_size()),
            prompts: PromptBuilder::new(config.target_language.clone()),
            extractor: ResponseExtractor::new(),
            service,
            pacing: config.pacing_interval(),
            timeout: config.timeout(),
            progress,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RoundObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<RunProgress> {
        self.progress.subscribe()
    }

    /// Runs rounds until the common keys are exhausted, a round fails, or
    /// `cancel` fires. Failures never surface as errors here; they end the run
    /// and are recorded in the report.
    pub async fn run(&self, seed: TranslationAccumulator, cancel: &CancellationToken) -> RunReport {
        let mut translations = seed;
        let mut rounds_completed = 0;
        let mut failure = None;

        self.publish(RunState::Running, rounds_completed, &translations);

        let state = loop {
            if cancel.is_cancelled() {
                break RunState::StoppedByCancellation;
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break RunState::StoppedByCancellation,
                outcome = self.run_round(&mut translations) => outcome,
            };

            match outcome {
                Ok(RoundOutcome::Exhausted) => break RunState::StoppedByExhaustion,
                Ok(RoundOutcome::Merged { requested, added }) => {
                    rounds_completed += 1;
                    let progress = self.publish(RunState::Running, rounds_completed, &translations);
                    info!(
                        round = rounds_completed,
                        requested = requested,
                        added = added,
                        translated_keys = progress.translated_keys,
                        remaining_keys = progress.remaining_keys,
                        "Round merged"
                    );
                    if let Some(observer) = &self.observer {
                        observer.round_completed(&progress, &translations);
                    }

                    if progress.remaining_keys == 0 {
                        continue;
                    }

                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(self.pacing) => {}
                    }
                }
                Err(e) => {
                    if e.is_round_failure() {
                        warn!(round = rounds_completed + 1, error = %e, "Round failed, stopping run");
                    } else {
                        error!(round = rounds_completed + 1, error = %e, "Unexpected error, stopping run");
                    }
                    failure = Some(e.to_string());
                    break RunState::StoppedByFailure;
                }
            }
        };

        let progress = self.publish(state, rounds_completed, &translations);
        if let Some(observer) = &self.observer {
            observer.round_completed(&progress, &translations);
        }
        info!(
            state = %state,
            rounds = rounds_completed,
            translated_keys = translations.len(),
            "Translation run stopped"
        );

        RunReport {
            translations,
            state,
            rounds_completed,
            failure,
        }
    }

    async fn run_round(&self, translations: &mut TranslationAccumulator) -> Result<RoundOutcome> {
        let batch = self.selector.next_batch(&self.corpus, translations);
        if batch.is_empty() {
            return Ok(RoundOutcome::Exhausted);
        }

        let prompt = self.prompts.build(&self.corpus, &batch);
        debug!(batch_len = batch.len(), prompt_len = prompt.len(), "Requesting batch");

        let reply = tokio::time::timeout(self.timeout, self.service.complete(&prompt))
            .await
            .map_err(|_| LocaleFillError::ServiceTimeout {
                seconds: self.timeout.as_secs(),
            })??;

        let parsed = self.extractor.extract(&reply)?;
        let covered = batch_covered(&batch, &parsed);

        let added = translations.merge(parsed);
        if !covered {
            return Err(LocaleFillError::MalformedResponse(
                "reply did not contain any of the requested keys".to_string(),
            ));
        }
        Ok(RoundOutcome::Merged {
            requested: batch.len(),
            added,
        })
    }

    fn publish(
        &self,
        state: RunState,
        rounds_completed: usize,
        translations: &TranslationAccumulator,
    ) -> RunProgress {
        let progress = RunProgress {
            state,
            rounds_completed,
            translated_keys: translations.len(),
            remaining_keys: self.selector.remaining(&self.corpus, translations),
        };
        self.progress.send_replace(progress.clone());
        progress
    }
}

/// A reply that answers none of the requested keys would make the next round
/// request the same batch forever.
fn batch_covered(batch: &KeyBatch, parsed: &serde_json::Map<String, serde_json::Value>) -> bool {
    batch.keys().iter().any(|key| parsed.contains_key(key))
}
