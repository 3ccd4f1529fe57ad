//! Patch file tool - unified diff editing
//!
//! The work is split the way the data flows:
//!
//! 1. `parser` (pure) - unified diff text into file patches and hunks
//! 2. `apply` (pure) - hunks against byte content, exact position match
//! 3. `executor` - reads the target, applies, rewrites it atomically
//!
//! Only the first file patch of a diff is applied; the tool edits the one
//! file named by its `path` argument.

pub mod apply;
pub mod executor;
pub mod parser;

#[cfg(test)]
mod proptests;

use super::{Tool, ToolContext, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("failed to parse patch at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("patch contains no file changes")]
    Empty,
    #[error("failed to apply patch: {0}")]
    Apply(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl PatchError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub struct PatchFileTool;

#[derive(Debug, Deserialize)]
pub struct PatchFileInput {
    path: String,
    patch: String,
}

#[derive(Debug, Serialize)]
pub struct PatchFileOutput {
    success: bool,
    message: String,
}

#[async_trait]
impl Tool for PatchFileTool {
    const NAME: &'static str = "patch_file";

    type Input = PatchFileInput;
    type Output = PatchFileOutput;

    fn description(&self) -> String {
        r"Edit an existing file by applying a unified diff.

Usage notes:
- The diff needs `---`/`+++` headers and `@@ -a,b +c,d @@` hunks
- Context and removed lines must match the current file exactly at the stated line numbers
- Only the first file in the diff is applied, to the file named by `path`
- Re-read the file before patching if it may have changed; a diff that was already applied will not apply again"
            .to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["path", "patch"],
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File to edit"
                },
                "patch": {
                    "type": "string",
                    "description": "Unified diff to apply"
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: PatchFileInput) -> Result<PatchFileOutput, ToolError> {
        let path = ctx.resolve_path(&input.path);
        let diff = input.patch;
        let target = path.clone();

        let summary = tokio::task::spawn_blocking(move || executor::patch_file(&target, &diff))
            .await
            .map_err(|e| ToolError::execution("patch task failed", io::Error::other(e.to_string())))??;

        let mut message = format!(
            "Patched {}: {} hunk(s), +{} -{}",
            input.path, summary.hunks, summary.added, summary.removed
        );
        if summary.skipped_files > 0 {
            message.push_str(&format!(
                "; ignored {} other file(s) in the diff",
                summary.skipped_files
            ));
        }

        Ok(PatchFileOutput {
            success: true,
            message,
        })
    }
}
