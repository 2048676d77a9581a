use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Stores uploaded contracts under one directory and hands back their paths.
pub struct ContractStorage {
    dir: PathBuf,
}

impl ContractStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save `bytes` as `file_name`, replacing any earlier upload of the same name.
    /// Directory components are stripped from the name.
    pub fn store(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = sanitize_file_name(file_name);
        if name.is_empty() {
            bail!("Invalid upload file name: {:?}", file_name);
        }

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create contracts dir: {}", self.dir.display()))?;
        let path = self.dir.join(&name);
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to store contract: {}", path.display()))?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "Stored contract upload");
        Ok(path)
    }

    pub fn store_file(&self, source: &Path) -> Result<PathBuf> {
        let bytes = std::fs::read(source)
            .with_context(|| format!("Failed to read contract: {}", source.display()))?;
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        self.store(name, &bytes)
    }
}

fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.chars().all(|c| c == '.') {
        String::new()
    } else {
        cleaned.to_string()
    }
}
