pub mod corpus;
pub mod server;
pub mod state;
pub mod translation;
pub mod utils;

pub use corpus::{KeyBatch, KeySelector, SourceCorpus, SourceDocument, TranslationExporter};
pub use server::{LocaleFillServer, SessionService};
pub use state::{AppState, Checkpoint, CheckpointManager, SessionState};
pub use translation::{
    CompletionService, PromptBuilder, ResponseExtractor, RunReport, RunState,
    TranslationAccumulator, TranslationOrchestrator,
};
pub use utils::{AppConfig, LocaleFillError, Result, TranslationSessionConfig};
