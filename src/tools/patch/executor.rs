//! Filesystem side of patching: read, apply, atomic rewrite

use super::apply::apply;
use super::parser::{parse, LineKind};
use super::PatchError;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// What a successful patch changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSummary {
    pub hunks: usize,
    pub added: usize,
    pub removed: usize,
    /// File patches present in the diff but not applied
    pub skipped_files: usize,
}

/// Apply the first file patch in `diff` to the file at `path`.
///
/// The file is replaced as a whole through a temp file in the same
/// directory; on any failure the original is left untouched.
pub fn patch_file(path: &Path, diff: &str) -> Result<PatchSummary, PatchError> {
    let source = fs::read(path)
        .map_err(|e| PatchError::io(format!("failed to read {}", path.display()), e))?;

    let files = parse(diff)?;
    let Some(first) = files.first() else {
        return Err(PatchError::Empty);
    };
    if files.len() > 1 {
        tracing::warn!(
            path = %path.display(),
            ignored = files.len() - 1,
            "Diff touches several files; applying only the first"
        );
    }

    let patched = apply(&source, first)?;
    write_atomic(path, &patched)
        .map_err(|e| PatchError::io(format!("failed to write {}", path.display()), e))?;

    let mut summary = PatchSummary {
        hunks: first.hunks.len(),
        added: 0,
        removed: 0,
        skipped_files: files.len() - 1,
    };
    for line in first.hunks.iter().flat_map(|h| &h.lines) {
        match line.kind {
            LineKind::Add => summary.added += 1,
            LineKind::Remove => summary.removed += 1,
            LineKind::Context => {}
        }
    }
    Ok(summary)
}

/// Replace `path` with `content` atomically, keeping existing permissions
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
