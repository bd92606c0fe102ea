//! Ignore engine: shell-glob pattern sets compiled to anchored regular
//! expressions, with `.gitignore`-style negation and last-match-wins
//! semantics.

pub mod dotignore;

use std::path::Path;

use regex::Regex;

use crate::error::{DotError, Result};

/// One parsed line from a `.dotignore` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternEntry {
    pub pattern: String,
    pub negate: bool,
}

struct CompiledPattern {
    regex: Regex,
    negate: bool,
    /// Whether the pattern contains a `/` and therefore anchors against
    /// the full relative path instead of just the basename.
    anchored: bool,
}

/// An ordered sequence of compiled patterns. Later entries may re-include
/// paths excluded by earlier ones.
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

impl PatternSet {
    pub fn empty() -> Self {
        Self { patterns: Vec::new() }
    }

    pub fn from_entries(entries: &[PatternEntry]) -> Result<Self> {
        let patterns = entries
            .iter()
            .map(|e| {
                let anchored = e.pattern.contains('/');
                let regex = glob_to_regex(&e.pattern)?;
                Ok(CompiledPattern { regex, negate: e.negate, anchored })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Decide whether `relative` (a path relative to the scan root, using
    /// `/` separators) should be ignored. The verdict is that of the last
    /// matching pattern; no match at all means "not ignored".
    pub fn should_ignore(&self, relative: &Path) -> bool {
        let full = relative.to_string_lossy().replace('\\', "/");
        let basename = relative
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut ignored = false;
        for p in &self.patterns {
            let subject = if p.anchored { full.as_str() } else { basename.as_str() };
            if p.regex.is_match(subject) {
                ignored = !p.negate;
            }
        }
        ignored
    }
}

/// Compile one shell-glob pattern (`*`, `?`, `[set]`) into an anchored
/// regular expression. `**` behaves as `*` (no recursive-wildcard
/// special-casing — the scanner already recurses directory by directory).
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                out.push('[');
                if let Some(&next) = chars.peek() {
                    if next == '!' {
                        out.push('^');
                        chars.next();
                    }
                }
                for c2 in chars.by_ref() {
                    out.push(c2);
                    if c2 == ']' {
                        break;
                    }
                }
            }
            _ if is_meta_character(c) => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('$');
    Regex::new(&out).map_err(|e| {
        tracing::warn!(pattern, error = %e, "invalid ignore pattern");
        DotError::IgnorePatternInvalid(0)
    })
}

fn is_meta_character(c: char) -> bool {
    matches!(c, '.' | '^' | '$' | '+' | '(' | ')' | '|' | '{' | '}' | '\\')
}
