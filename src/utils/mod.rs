pub mod config;
pub mod errors;

pub use config::{AppConfig, TranslationSessionConfig, DEFAULT_BATCH_SIZE};
pub use errors::{LocaleFillError, Result};

pub fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
