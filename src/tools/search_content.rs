//! Search content tool - recursive keyword search
//!
//! Walks the tree with the `ignore` crate so `.gitignore` rules apply.
//! Binary files are skipped, and the match list is capped.

use super::{Tool, ToolContext, ToolError};
use async_trait::async_trait;
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io;
use std::path::Path;
use tokio_util::sync::CancellationToken;

const MAX_MATCHES: usize = 500;

/// Bytes inspected when sniffing for binary content
const BINARY_SNIFF_LEN: usize = 8 * 1024;

pub struct SearchContentTool;

#[derive(Debug, Deserialize)]
pub struct SearchContentInput {
    path: String,
    keyword: String,
    #[serde(default)]
    case_sensitive: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SearchMatch {
    file_path: String,
    line_number: usize,
    line: String,
}

#[derive(Debug, Serialize)]
pub struct SearchContentOutput {
    matches: Vec<SearchMatch>,
    truncated: bool,
}

#[async_trait]
impl Tool for SearchContentTool {
    const NAME: &'static str = "search_content";

    type Input = SearchContentInput;
    type Output = SearchContentOutput;

    fn description(&self) -> String {
        format!(
            "Recursively search files under a directory for lines containing a keyword. \
             Honours .gitignore and skips binary files. Returns at most {MAX_MATCHES} matches."
        )
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["path", "keyword"],
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory (or file) to search"
                },
                "keyword": {
                    "type": "string",
                    "description": "Literal text to look for"
                },
                "case_sensitive": {
                    "type": "boolean",
                    "description": "Match case exactly (default false)"
                }
            }
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        input: SearchContentInput,
    ) -> Result<SearchContentOutput, ToolError> {
        let root = ctx.resolve_path(&input.path);
        tokio::fs::metadata(&root)
            .await
            .map_err(|e| ToolError::execution(format!("failed to search {:?}", input.path), e))?;

        let cancel = ctx.cancel.clone();
        let keyword = input.keyword;
        let case_sensitive = input.case_sensitive;
        let result =
            tokio::task::spawn_blocking(move || search(&root, &keyword, case_sensitive, &cancel))
                .await
                .map_err(|e| {
                    ToolError::execution("search task failed", io::Error::other(e.to_string()))
                })?;

        result.map_err(|e| ToolError::execution(format!("failed to search {:?}", input.path), e))
    }
}

fn search(
    root: &Path,
    keyword: &str,
    case_sensitive: bool,
    cancel: &CancellationToken,
) -> io::Result<SearchContentOutput> {
    let needle = if case_sensitive {
        keyword.to_string()
    } else {
        keyword.to_lowercase()
    };

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .require_git(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    let mut matches = Vec::new();
    for entry in walker {
        if cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "search cancelled"));
        }
        // Unreadable entries are skipped, not fatal
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Ok(bytes) = std::fs::read(entry.path()) else {
            continue;
        };
        if is_binary(&bytes) {
            continue;
        }

        let text = String::from_utf8_lossy(&bytes);
        for (idx, line) in text.lines().enumerate() {
            let hit = if case_sensitive {
                line.contains(&needle)
            } else {
                line.to_lowercase().contains(&needle)
            };
            if !hit {
                continue;
            }
            if matches.len() == MAX_MATCHES {
                return Ok(SearchContentOutput {
                    matches,
                    truncated: true,
                });
            }
            matches.push(SearchMatch {
                file_path: entry.path().to_string_lossy().into_owned(),
                line_number: idx + 1,
                line: line.to_string(),
            });
        }
    }

    Ok(SearchContentOutput {
        matches,
        truncated: false,
    })
}

fn is_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_SNIFF_LEN).any(|&b| b == 0)
}
