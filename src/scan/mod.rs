//! The scanner: walks a package's source tree into a [`Node`] tree,
//! applying `.dotignore` inheritance and dot-file translation along the
//! way.

pub mod prompt;

use std::path::PathBuf;

use crate::cancel::Context;
use crate::error::Result;
use crate::ignore::dotignore::{self, IGNORE_FILE};
use crate::ignore::{PatternEntry, PatternSet};
use crate::path::PackagePath;
use crate::translate::translate;

use prompt::{LargeFileDecision, LargeFilePrompter};

/// Files larger than this prompt for inclusion unless a [`Batch`]
/// prompter is in effect.
///
/// [`Batch`]: prompt::Batch
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 50 * 1024 * 1024;

/// One entry of a scanned package tree. Every node carries both its
/// `source_relative` path (the name on disk inside the package) and its
/// `target_relative` path (the same path after dot-file translation),
/// since the planner needs both: one to read from, one to link at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File { source_relative: PathBuf, target_relative: PathBuf, size: u64 },
    Dir { source_relative: PathBuf, target_relative: PathBuf, children: Vec<Node> },
    Symlink { source_relative: PathBuf, target_relative: PathBuf, link_target: PathBuf },
}

impl Node {
    pub fn target_relative(&self) -> &std::path::Path {
        match self {
            Node::File { target_relative, .. }
            | Node::Dir { target_relative, .. }
            | Node::Symlink { target_relative, .. } => target_relative,
        }
    }

    pub fn source_relative(&self) -> &std::path::Path {
        match self {
            Node::File { source_relative, .. }
            | Node::Dir { source_relative, .. }
            | Node::Symlink { source_relative, .. } => source_relative,
        }
    }
}

pub struct Scanner {
    large_file_threshold: u64,
    prompter: Box<dyn LargeFilePrompter>,
}

impl Scanner {
    pub fn new(large_file_threshold: u64, prompter: Box<dyn LargeFilePrompter>) -> Self {
        Self { large_file_threshold, prompter }
    }

    /// Scan an entire package, returning the root [`Node::Dir`].
    pub fn scan(&self, package: &PackagePath, ctx: &Context) -> Result<Node> {
        self.scan_dir(package.as_path(), &PathBuf::new(), &PathBuf::new(), &[], ctx)
    }

    fn scan_dir(
        &self,
        package_root: &std::path::Path,
        source_relative: &std::path::Path,
        target_relative: &std::path::Path,
        inherited: &[PatternEntry],
        ctx: &Context,
    ) -> Result<Node> {
        let abs = package_root.join(source_relative);

        let mut entries = inherited.to_vec();
        entries.extend(dotignore::load_dotignore(&abs.join(IGNORE_FILE))?);
        let pattern_set = PatternSet::from_entries(&entries)?;

        let mut names: Vec<_> = std::fs::read_dir(&abs)?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name())
            .collect();
        names.sort();

        let mut children = Vec::new();
        for name in names {
            ctx.check()?;

            if name == IGNORE_FILE {
                continue;
            }
            let name_str = name.to_string_lossy().to_string();
            let child_source = source_relative.join(&name);
            let child_target = target_relative.join(translate(&name_str));
            let full_path = abs.join(&name);

            if pattern_set.should_ignore(&child_source) {
                continue;
            }

            let meta = std::fs::symlink_metadata(&full_path)?;
            let file_type = meta.file_type();

            if file_type.is_symlink() {
                let link_target = std::fs::read_link(&full_path)?;
                children.push(Node::Symlink {
                    source_relative: child_source,
                    target_relative: child_target,
                    link_target,
                });
            } else if file_type.is_dir() {
                children.push(self.scan_dir(package_root, &child_source, &child_target, &entries, ctx)?);
            } else {
                let size = meta.len();
                if size > self.large_file_threshold
                    && self.prompter.decide(&child_source, size) == LargeFileDecision::Skip
                {
                    continue;
                }
                children.push(Node::File { source_relative: child_source, target_relative: child_target, size });
            }
        }

        Ok(Node::Dir {
            source_relative: source_relative.to_path_buf(),
            target_relative: target_relative.to_path_buf(),
            children,
        })
    }
}
