//! Read file tool

use super::{Tool, ToolContext, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub struct ReadFileTool;

#[derive(Debug, Deserialize)]
pub struct ReadFileInput {
    path: String,
}

#[derive(Debug, Serialize)]
pub struct ReadFileOutput {
    content: String,
}

#[async_trait]
impl Tool for ReadFileTool {
    const NAME: &'static str = "read_file";

    type Input = ReadFileInput;
    type Output = ReadFileOutput;

    fn description(&self) -> String {
        "Read the entire contents of a file. Relative paths resolve against the working directory."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["path"],
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the file to read"
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: ReadFileInput) -> Result<ReadFileOutput, ToolError> {
        let path = ctx.resolve_path(&input.path);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ToolError::execution(format!("failed to read file {:?}", input.path), e))?;

        Ok(ReadFileOutput {
            content: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}
