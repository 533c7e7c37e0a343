pub mod analyzer;
pub mod document;
pub mod selector;
pub mod writer;

pub use analyzer::{analyze_corpus, describe_corpus, estimate_tokens, CorpusMetadata, DocumentSummary};
pub use document::{file_exists, SourceCorpus, SourceDocument};
pub use selector::{KeyBatch, KeySelector};
pub use writer::TranslationExporter;
