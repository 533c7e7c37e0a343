use crate::translation::accumulator::TranslationAccumulator;
use crate::utils::{LocaleFillError, Result};
use std::path::{Path, PathBuf};

/// Writes a finished accumulator as `<output_dir>/<target_language>.json`.
pub struct TranslationExporter {
    output_dir: PathBuf,
}

impl TranslationExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_path(&self, target_language: &str) -> Result<PathBuf> {
        let file_stem = target_language.trim();
        if file_stem.is_empty()
            || file_stem
                .chars()
                .any(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
            || file_stem.starts_with('.')
        {
            return Err(LocaleFillError::ConfigError(format!(
                "invalid target language identifier: {:?}",
                target_language
            )));
        }
        Ok(self.output_dir.join(format!("{}.json", file_stem)))
    }

    /// Pretty-prints the accumulator and replaces the target file atomically.
    pub async fn export(
        &self,
        target_language: &str,
        translations: &TranslationAccumulator,
    ) -> Result<PathBuf> {
        let path = self.output_path(target_language)?;
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let mut body = translations.to_json_pretty()?;
        body.push('\n');

        let tmp_path = tmp_path_for(&path);
        tokio::fs::write(&tmp_path, body).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        tracing::info!(
            path = %path.display(),
            keys = translations.len(),
            "Exported translations"
        );
        Ok(path)
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
