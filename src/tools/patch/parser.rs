//! Unified diff parser
//!
//! Text before the first `---`/`+++` header pair (commit messages, `diff --git`
//! and `index` lines) is skipped. Hunk bodies are read by count, so a removed
//! line that happens to start with `--` is never mistaken for a header.

use super::PatchError;

/// Marker emitted after a line that has no trailing newline
const NO_NEWLINE_MARKER: char = '\\';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    pub old_path: String,
    pub new_path: String,
    pub hunks: Vec<Hunk>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based first line of the old range; for a pure insertion, the line it follows
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<HunkLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Remove,
    Add,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkLine {
    pub kind: LineKind,
    pub text: String,
    /// False when followed by a "\ No newline at end of file" marker
    pub newline: bool,
}

/// Parse every file patch in `text`. Zero file patches is not an error here.
pub fn parse(text: &str) -> Result<Vec<FilePatch>, PatchError> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    if text.ends_with('\n') {
        lines.pop();
    }

    let mut files = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let (Some(old), Some(new)) = (
            lines[i].strip_prefix("--- "),
            lines.get(i + 1).and_then(|l| l.strip_prefix("+++ ")),
        ) else {
            i += 1;
            continue;
        };
        let header_line = i + 1;
        i += 2;

        let mut hunks = Vec::new();
        while i < lines.len() && lines[i].starts_with("@@") {
            let (hunk, next) = parse_hunk(&lines, i)?;
            hunks.push(hunk);
            i = next;
        }
        if hunks.is_empty() {
            return Err(PatchError::Parse {
                line: header_line,
                message: format!("file patch for {} has no hunks", header_path(new)),
            });
        }

        files.push(FilePatch {
            old_path: header_path(old).to_string(),
            new_path: header_path(new).to_string(),
            hunks,
        });
    }

    Ok(files)
}

/// Path from a `---`/`+++` header, without any trailing timestamp
fn header_path(raw: &str) -> &str {
    raw.split('\t').next().unwrap_or(raw).trim_end()
}

fn parse_hunk(lines: &[&str], start: usize) -> Result<(Hunk, usize), PatchError> {
    let (old_start, old_count, new_start, new_count) =
        parse_hunk_header(lines[start]).ok_or_else(|| PatchError::Parse {
            line: start + 1,
            message: format!("malformed hunk header {:?}", lines[start]),
        })?;

    let mut body = Vec::new();
    let mut old_seen = 0;
    let mut new_seen = 0;
    let mut i = start + 1;

    while old_seen < old_count || new_seen < new_count {
        let Some(&line) = lines.get(i) else {
            return Err(PatchError::Parse {
                line: i,
                message: format!(
                    "hunk ends early: expected -{old_count} +{new_count}, got -{old_seen} +{new_seen}"
                ),
            });
        };

        let mut chars = line.chars();
        let (kind, text) = match chars.next() {
            Some(' ') => (LineKind::Context, chars.as_str()),
            Some('-') => (LineKind::Remove, chars.as_str()),
            Some('+') => (LineKind::Add, chars.as_str()),
            // Some tools strip the space from empty context lines
            None => (LineKind::Context, ""),
            Some(NO_NEWLINE_MARKER) => {
                mark_no_newline(&mut body);
                i += 1;
                continue;
            }
            Some(_) => {
                return Err(PatchError::Parse {
                    line: i + 1,
                    message: format!("unexpected line in hunk: {line:?}"),
                });
            }
        };

        match kind {
            LineKind::Context => {
                old_seen += 1;
                new_seen += 1;
            }
            LineKind::Remove => old_seen += 1,
            LineKind::Add => new_seen += 1,
        }
        if old_seen > old_count || new_seen > new_count {
            return Err(PatchError::Parse {
                line: i + 1,
                message: "hunk body longer than its header declares".to_string(),
            });
        }

        body.push(HunkLine {
            kind,
            text: text.to_string(),
            newline: true,
        });
        i += 1;
    }

    // The marker may trail the final line of the hunk
    if lines.get(i).is_some_and(|l| l.starts_with(NO_NEWLINE_MARKER)) {
        mark_no_newline(&mut body);
        i += 1;
    }

    Ok((
        Hunk {
            old_start,
            old_count,
            new_start,
            new_count,
            lines: body,
        },
        i,
    ))
}

fn mark_no_newline(body: &mut [HunkLine]) {
    if let Some(last) = body.last_mut() {
        last.newline = false;
    }
}

/// `@@ -a[,b] +c[,d] @@[ section]`
fn parse_hunk_header(line: &str) -> Option<(usize, usize, usize, usize)> {
    let rest = line.strip_prefix("@@ -")?;
    let (ranges, _section) = rest.split_once(" @@")?;
    let (old, new) = ranges.split_once(" +")?;
    let (old_start, old_count) = parse_range(old)?;
    let (new_start, new_count) = parse_range(new)?;
    Some((old_start, old_count, new_start, new_count))
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}
