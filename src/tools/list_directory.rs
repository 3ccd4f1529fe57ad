//! List directory tool

use super::{Tool, ToolContext, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub struct ListDirectoryTool;

#[derive(Debug, Deserialize)]
pub struct ListDirectoryInput {
    path: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DirectoryEntry {
    name: String,
    is_dir: bool,
}

#[derive(Debug, Serialize)]
pub struct ListDirectoryOutput {
    entries: Vec<DirectoryEntry>,
}

#[async_trait]
impl Tool for ListDirectoryTool {
    const NAME: &'static str = "list_directory";

    type Input = ListDirectoryInput;
    type Output = ListDirectoryOutput;

    fn description(&self) -> String {
        "List the files and directories directly inside a directory, sorted by name.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["path"],
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list"
                }
            }
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        input: ListDirectoryInput,
    ) -> Result<ListDirectoryOutput, ToolError> {
        let path = ctx.resolve_path(&input.path);
        let context = || format!("failed to read directory {:?}", input.path);

        let mut dir = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| ToolError::execution(context(), e))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| ToolError::execution(context(), e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| ToolError::execution(context(), e))?;
            entries.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: file_type.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(ListDirectoryOutput { entries })
    }
}
