//! What to do when the scanner meets a file larger than its threshold.

/// Decision returned by a [`LargeFilePrompter`] for one oversized file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LargeFileDecision {
    Include,
    Skip,
}

pub trait LargeFilePrompter: Send + Sync {
    fn decide(&self, relative: &std::path::Path, size: u64) -> LargeFileDecision;
}

/// Prompts on stdin/stderr for each oversized file encountered, with an
/// `i`nclude / `s`kip / skip `a`ll choice. Once "skip all" is chosen it
/// sticks for the rest of the scan, so a package with many large files
/// doesn't re-prompt for every one of them.
#[derive(Default)]
pub struct Interactive {
    skip_all: std::sync::Mutex<bool>,
}

impl Interactive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LargeFilePrompter for Interactive {
    fn decide(&self, relative: &std::path::Path, size: u64) -> LargeFileDecision {
        use std::io::{BufRead, Write};

        if *self.skip_all.lock().unwrap() {
            return LargeFileDecision::Skip;
        }

        eprint!(
            "{} is {} bytes, larger than the scan threshold. [i]nclude, [s]kip, skip [a]ll? ",
            relative.display(),
            size
        );
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return LargeFileDecision::Skip;
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "i" | "include" => LargeFileDecision::Include,
            "a" | "all" => {
                *self.skip_all.lock().unwrap() = true;
                LargeFileDecision::Skip
            }
            _ => LargeFileDecision::Skip,
        }
    }
}

/// Applies one fixed decision to every oversized file; used for
/// non-interactive runs (`--yes`, `--no`, scripted scenarios, tests).
pub struct Batch(pub LargeFileDecision);

impl LargeFilePrompter for Batch {
    fn decide(&self, _relative: &std::path::Path, _size: u64) -> LargeFileDecision {
        self.0
    }
}
