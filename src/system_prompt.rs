//! System prompt construction with AGENTS.md discovery
//!
//! Discovers and loads guidance files (AGENTS.md, AGENT.md) from the working
//! directory up to the filesystem root and appends them to the base
//! instructions sent with every model request.

use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Names of guidance files to look for, in order of preference
const GUIDANCE_FILE_NAMES: &[&str] = &["AGENTS.md", "AGENT.md"];

/// Base instructions establishing the agent's role
const BASE_PROMPT: &str = r"You are a coding assistant working in a local project directory. You can read files, list directories, search file contents, write files and apply unified diff patches. Use tools when appropriate to accomplish tasks.

Prefer patch_file for small edits to existing files and write_file for new files or full rewrites. Relative paths resolve against the working directory.

Be concise in your responses. When using tools, explain what you're doing briefly.";

/// A discovered guidance file with its path and content
#[derive(Debug, Clone)]
pub struct GuidanceFile {
    pub path: PathBuf,
    pub content: String,
}

/// Guidance files of `working_dir` and its ancestors, outermost first
pub fn discover_guidance_files(working_dir: &Path) -> Vec<GuidanceFile> {
    let mut files: Vec<GuidanceFile> = working_dir.ancestors().filter_map(guidance_in).collect();
    files.reverse();
    files
}

/// The first readable guidance file directly inside `dir`
fn guidance_in(dir: &Path) -> Option<GuidanceFile> {
    GUIDANCE_FILE_NAMES.iter().find_map(|name| {
        let path = dir.join(name);
        if !path.is_file() {
            return None;
        }
        let content = std::fs::read_to_string(&path).ok()?;
        Some(GuidanceFile { path, content })
    })
}

/// `<project_guidance>` block, one section per file, each tagged with its source
fn guidance_block(files: &[GuidanceFile]) -> String {
    let sections: Vec<String> = files
        .iter()
        .map(|file| {
            let mut section = format!("<!-- From: {} -->\n{}", file.path.display(), file.content);
            if !section.ends_with('\n') {
                section.push('\n');
            }
            section
        })
        .collect();
    format!("<project_guidance>\n{}</project_guidance>", sections.join("\n---\n\n"))
}

/// Build the instructions for every request of this process
pub fn build_system_prompt(working_dir: &Path) -> String {
    let mut prompt = String::from(BASE_PROMPT);
    let _ = write!(prompt, "\n\nWorking directory: {}", working_dir.display());

    let guidance_files = discover_guidance_files(working_dir);
    if !guidance_files.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&guidance_block(&guidance_files));
    }

    tracing::debug!(
        guidance_files = guidance_files.len(),
        bytes = prompt.len(),
        "Built system prompt"
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_no_files() {
        let temp = TempDir::new().unwrap();
        let files = discover_guidance_files(temp.path());
        assert!(files.iter().all(|f| !f.path.starts_with(temp.path())));
    }

    #[test]
    fn test_agents_md_preferred_over_agent_md() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("AGENTS.md"), "agents content").unwrap();
        fs::write(temp.path().join("AGENT.md"), "agent content").unwrap();

        let files = discover_guidance_files(temp.path());
        let last = files.last().unwrap();
        assert_eq!(last.content, "agents content");
        assert_eq!(last.path, temp.path().join("AGENTS.md"));
    }

    #[test]
    fn test_unusable_agents_md_falls_back_to_agent_md() {
        let temp = TempDir::new().unwrap();
        let dir_named_like_file = temp.path().join("dir");
        fs::create_dir_all(dir_named_like_file.join("AGENTS.md")).unwrap();
        fs::write(dir_named_like_file.join("AGENT.md"), "from AGENT.md").unwrap();
        let not_utf8 = temp.path().join("binary");
        fs::create_dir(&not_utf8).unwrap();
        fs::write(not_utf8.join("AGENTS.md"), [0xff, 0xfe, 0x00]).unwrap();
        fs::write(not_utf8.join("AGENT.md"), "readable").unwrap();

        let last = discover_guidance_files(&dir_named_like_file).pop().unwrap();
        assert_eq!(last.path, dir_named_like_file.join("AGENT.md"));
        let last = discover_guidance_files(&not_utf8).pop().unwrap();
        assert_eq!(last.content, "readable");
    }

    #[test]
    fn test_sections_are_separated_and_tagged() {
        let files = vec![
            GuidanceFile { path: PathBuf::from("/repo/AGENTS.md"), content: "outer".into() },
            GuidanceFile { path: PathBuf::from("/repo/app/AGENT.md"), content: "inner\n".into() },
        ];

        assert_eq!(
            guidance_block(&files),
            "<project_guidance>\n<!-- From: /repo/AGENTS.md -->\nouter\n\n---\n\n\
             <!-- From: /repo/app/AGENT.md -->\ninner\n</project_guidance>"
        );
    }

    #[test]
    fn test_nearest_file_comes_last() {
        let temp = TempDir::new().unwrap();
        let subdir = temp.path().join("project");
        fs::create_dir(&subdir).unwrap();

        fs::write(temp.path().join("AGENTS.md"), "root guidance").unwrap();
        fs::write(subdir.join("AGENT.md"), "project guidance").unwrap();

        let files = discover_guidance_files(&subdir);
        let n = files.len();
        assert!(n >= 2);
        assert_eq!(files[n - 2].content, "root guidance");
        assert_eq!(files[n - 1].content, "project guidance");
    }

    #[test]
    fn test_prompt_without_guidance_names_workdir() {
        let temp = TempDir::new().unwrap();
        let prompt = build_system_prompt(temp.path());

        assert!(prompt.starts_with("You are a coding assistant"));
        assert!(prompt.contains(&temp.path().display().to_string()));
    }

    #[test]
    fn test_prompt_with_guidance() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("AGENTS.md"), "# Project Rules\nBe nice.").unwrap();

        let prompt = build_system_prompt(temp.path());

        assert!(prompt.contains("<project_guidance>"));
        assert!(prompt.contains("# Project Rules\nBe nice.\n</project_guidance>"));
    }
}
