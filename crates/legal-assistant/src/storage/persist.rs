use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::IndexLoadError;
use crate::search::DenseIndex;
use crate::types::LawChunk;

pub const DENSE_FILE: &str = "laws.index";
pub const META_FILE: &str = "laws_meta.jsonl";

/// Write the dense vectors and the chunk store (one JSON object per line, in
/// position order). Each file goes to a temp name first and is renamed into
/// place, so a crash never leaves a half-written file under the real name.
pub fn save_index_files(dir: &Path, chunks: &[LawChunk], dense: &DenseIndex) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create index dir: {}", dir.display()))?;

    let mut meta = Vec::new();
    for chunk in chunks {
        serde_json::to_writer(&mut meta, chunk)?;
        meta.write_all(b"\n")?;
    }

    write_atomic(&dir.join(DENSE_FILE), &dense.to_bytes())?;
    write_atomic(&dir.join(META_FILE), &meta)?;

    tracing::info!(
        dir = %dir.display(),
        chunks = chunks.len(),
        dimension = dense.dimension(),
        "Persisted law index"
    );
    Ok(())
}

/// Load and cross-check both files. Alignment and dimension are verified here;
/// a mismatch rejects the whole index.
pub fn load_index_files(
    dir: &Path,
    expected_dimension: usize,
) -> Result<(Vec<LawChunk>, DenseIndex), IndexLoadError> {
    let dense_path = dir.join(DENSE_FILE);
    let meta_path = dir.join(META_FILE);

    let dense_bytes = read_required(&dense_path)?;
    let meta_bytes = read_required(&meta_path)?;

    let dense = DenseIndex::from_bytes(&dense_bytes)?;
    if dense.dimension() != expected_dimension {
        return Err(IndexLoadError::DimensionMismatch {
            expected: expected_dimension,
            found: dense.dimension(),
        });
    }

    let meta_text = String::from_utf8(meta_bytes).map_err(|e| IndexLoadError::CorruptRecord {
        line: 0,
        reason: e.to_string(),
    })?;
    let mut chunks = Vec::new();
    for (i, line) in meta_text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let chunk: LawChunk =
            serde_json::from_str(line).map_err(|e| IndexLoadError::CorruptRecord {
                line: i + 1,
                reason: e.to_string(),
            })?;
        chunks.push(chunk);
    }

    if chunks.len() != dense.len() {
        return Err(IndexLoadError::CountMismatch {
            dense: dense.len(),
            meta: chunks.len(),
        });
    }

    Ok((chunks, dense))
}

/// Delete both index files so a later reload finds nothing. Missing files
/// are fine.
pub fn remove_index_files(dir: &Path) -> Result<()> {
    let mut removed = 0usize;
    for name in [DENSE_FILE, META_FILE] {
        let path = dir.join(name);
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to remove {}", path.display()))
            }
        }
    }
    if removed > 0 {
        tracing::info!(dir = %dir.display(), files = removed, "Removed stale law index");
    }
    Ok(())
}

fn read_required(path: &Path) -> Result<Vec<u8>, IndexLoadError> {
    if !path.exists() {
        return Err(IndexLoadError::Missing(path.to_path_buf()));
    }
    std::fs::read(path).map_err(|source| IndexLoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = PathBuf::from(path);
    tmp.as_mut_os_string().push(".tmp");
    std::fs::write(&tmp, data).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}
