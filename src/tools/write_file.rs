//! Write file tool

use super::patch::executor::write_atomic;
use super::{Tool, ToolContext, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io;

pub struct WriteFileTool;

#[derive(Debug, Deserialize)]
pub struct WriteFileInput {
    path: String,
    content: String,
}

#[derive(Debug, Serialize)]
pub struct WriteFileOutput {
    success: bool,
    message: String,
}

#[async_trait]
impl Tool for WriteFileTool {
    const NAME: &'static str = "write_file";

    type Input = WriteFileInput;
    type Output = WriteFileOutput;

    fn description(&self) -> String {
        "Create a file (or replace an existing one) with the given content. \
         Missing parent directories are created."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["path", "content"],
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Full file content"
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: WriteFileInput) -> Result<WriteFileOutput, ToolError> {
        let path = ctx.resolve_path(&input.path);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ToolError::execution(format!("failed to create directory {}", parent.display()), e)
            })?;
        }

        let bytes = input.content.len();
        let content = input.content;
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&target, content.as_bytes()))
            .await
            .map_err(|e| ToolError::execution("write task failed", io::Error::other(e.to_string())))?
            .map_err(|e| ToolError::execution(format!("failed to write file {:?}", input.path), e))?;

        Ok(WriteFileOutput {
            success: true,
            message: format!("Wrote {bytes} bytes to {}", input.path),
        })
    }
}
