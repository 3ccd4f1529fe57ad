//! Pure hunk application against byte content
//!
//! Hunks must match exactly at the position their header states; there is
//! no fuzzy search for a nearby offset. Context lines keep the source's own
//! bytes, so CRLF endings and non-UTF-8 content survive untouched.

use super::parser::{FilePatch, HunkLine, LineKind};
use super::PatchError;

/// Apply one file patch to `source`, returning the post-image
pub fn apply(source: &[u8], patch: &FilePatch) -> Result<Vec<u8>, PatchError> {
    let src_lines: Vec<&[u8]> = source.split_inclusive(|&b| b == b'\n').collect();
    let mut out = Vec::with_capacity(source.len());
    let mut cursor = 0;

    for (n, hunk) in patch.hunks.iter().enumerate() {
        let hunk_no = n + 1;
        let start = if hunk.old_count == 0 {
            hunk.old_start
        } else {
            hunk.old_start.checked_sub(1).ok_or_else(|| {
                PatchError::Apply(format!("hunk {hunk_no}: old range cannot start at line 0"))
            })?
        };

        if start < cursor {
            return Err(PatchError::Apply(format!(
                "hunk {hunk_no} overlaps the previous hunk"
            )));
        }
        let end = start
            .checked_add(hunk.old_count)
            .filter(|&end| end <= src_lines.len())
            .ok_or_else(|| {
                PatchError::Apply(format!(
                    "hunk {hunk_no} expects {} line(s) from line {} but the file has {} lines",
                    hunk.old_count,
                    hunk.old_start,
                    src_lines.len()
                ))
            })?;

        for line in &src_lines[cursor..start] {
            out.extend_from_slice(line);
        }

        let mut pos = start;
        for line in &hunk.lines {
            match line.kind {
                LineKind::Context => {
                    check_line(src_lines[pos], line, hunk_no, pos)?;
                    out.extend_from_slice(src_lines[pos]);
                    pos += 1;
                }
                LineKind::Remove => {
                    check_line(src_lines[pos], line, hunk_no, pos)?;
                    pos += 1;
                }
                LineKind::Add => {
                    out.extend_from_slice(line.text.as_bytes());
                    if line.newline {
                        out.push(b'\n');
                    }
                }
            }
        }
        debug_assert_eq!(pos, end);
        cursor = end;
    }

    for line in &src_lines[cursor..] {
        out.extend_from_slice(line);
    }
    Ok(out)
}

fn check_line(actual: &[u8], expected: &HunkLine, hunk_no: usize, pos: usize) -> Result<(), PatchError> {
    let content = actual.strip_suffix(b"\n").unwrap_or(actual);
    if content == expected.text.as_bytes() {
        return Ok(());
    }
    Err(PatchError::Apply(format!(
        "hunk {hunk_no}: line {} does not match: expected {:?}, found {:?}",
        pos + 1,
        expected.text,
        String::from_utf8_lossy(content)
    )))
}
