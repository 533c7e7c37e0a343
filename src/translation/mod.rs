pub mod accumulator;
pub mod client;
pub mod extractor;
pub mod orchestrator;
pub mod prompt;

pub use accumulator::TranslationAccumulator;
pub use client::{AnthropicClient, CompletionService};
pub use extractor::ResponseExtractor;
pub use orchestrator::{
    RoundObserver, RunProgress, RunReport, RunState, TranslationOrchestrator,
};
pub use prompt::{build_instruction, PromptBuilder};

use crate::corpus::SourceCorpus;
use crate::utils::TranslationSessionConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranslationSession {
    pub session_id: String,
    pub target_language: String,
    pub status: String,
    pub progress: f32,
    pub translated_keys: usize,
    pub common_keys: usize,
    pub rounds_completed: usize,
    pub last_error: Option<String>,
}

/// One-shot run over an already parsed corpus, without session bookkeeping.
pub async fn translate_corpus(
    corpus: SourceCorpus,
    seed: TranslationAccumulator,
    service: Arc<dyn CompletionService>,
    config: &TranslationSessionConfig,
    cancel: &CancellationToken,
) -> RunReport {
    let orchestrator = TranslationOrchestrator::new(Arc::new(corpus), service, config);
    orchestrator.run(seed, cancel).await
}
