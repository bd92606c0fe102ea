//! Loading `.dotignore` files, including directory-to-root inheritance.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{DotError, Result};

use super::PatternEntry;

pub(crate) const IGNORE_FILE: &str = ".dotignore";

/// Parse the textual content of a single `.dotignore` file.
///
/// Blank lines and `#`-comments are dropped; a leading `!` negates the
/// pattern; a leading `!!` is rejected as double negation, reporting the
/// 1-indexed line number.
pub fn parse_dotignore_content(content: &str) -> Result<Vec<PatternEntry>> {
    let mut entries = Vec::new();
    for (idx, raw_line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let without_comment = match raw_line.find('#') {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        };
        let trimmed = without_comment.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('!') {
            if rest.starts_with('!') {
                return Err(DotError::IgnorePatternInvalid(line_no));
            }
            entries.push(PatternEntry { pattern: rest.to_string(), negate: true });
        } else {
            entries.push(PatternEntry { pattern: trimmed.to_string(), negate: false });
        }
    }
    Ok(entries)
}

/// Load a single `.dotignore` file at `path`. A missing file yields an
/// empty pattern list.
pub fn load_dotignore(path: &Path) -> Result<Vec<PatternEntry>> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_dotignore_content(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(DotError::Io(e)),
    }
}

/// Walk from `start` upward to `root` inclusive, concatenating
/// `.dotignore` pattern lists root-most first so that a deeper file's
/// patterns are evaluated last (and can override shallower ones). Stops
/// at the filesystem root or if a cycle is detected via a visited set.
pub fn load_dotignore_with_inheritance(start: &Path, root: &Path) -> Result<Vec<PatternEntry>> {
    let mut chain: Vec<PathBuf> = Vec::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut current = start.to_path_buf();

    loop {
        if !visited.insert(current.clone()) {
            break;
        }
        chain.push(current.clone());
        if current == root {
            break;
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    // root-most first.
    chain.reverse();

    let mut entries = Vec::new();
    for dir in chain {
        let candidate = dir.join(IGNORE_FILE);
        entries.extend(load_dotignore(&candidate)?);
    }
    Ok(entries)
}
