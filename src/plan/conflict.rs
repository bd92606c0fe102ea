//! Conflicts between the desired state and what already exists at a
//! target path, and the policies used to resolve them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::path::TargetPath;

/// The shape of the disagreement between the plan and the existing
/// filesystem entry at a target path, named after the two things butting
/// heads: the entry the plan wants there, and the entry already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// A link belongs here, but a plain file already occupies the path.
    LinkVsFile,
    /// A link belongs here, and a symlink already occupies the path, but
    /// it points somewhere other than where the plan wants.
    LinkVsLink,
    /// A link belongs here, but a real directory already occupies the
    /// path. Never auto-resolved: recursively replacing a directory with
    /// a symlink is out of scope regardless of policy.
    LinkVsDir,
    /// A directory belongs here (to hold further links), but a plain
    /// file or symlink already occupies the path.
    DirVsFile,
}

impl ConflictKind {
    /// A short, human-aimed suggestion for resolving this kind of
    /// conflict, surfaced alongside the conflict in CLI output.
    pub fn suggestion(&self) -> &'static str {
        match self {
            ConflictKind::LinkVsFile => "back up or remove the existing file, or choose a conflict policy that does it for you",
            ConflictKind::LinkVsLink => "the existing link points elsewhere; re-run with --on-conflict overwrite to re-aim it",
            ConflictKind::LinkVsDir => "a real directory is in the way; move or remove it by hand before managing this package",
            ConflictKind::DirVsFile => "back up or remove the existing file, or choose a conflict policy that does it for you",
        }
    }
}

/// How a [`ConflictKind`] should be resolved when it is encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Abort planning; the conflict is reported to the caller.
    Fail,
    /// Move the existing entry aside (see [`crate::manifest`] for where
    /// backups are recorded) and proceed.
    Backup,
    /// Remove the existing entry and proceed.
    Overwrite,
    /// Leave the existing entry alone and drop the operation that would
    /// have touched it.
    Skip,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        ConflictPolicy::Fail
    }
}

/// A single detected conflict, prior to resolution.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub target: TargetPath,
    /// What's currently at `target`: a symlink's existing destination,
    /// or `target` itself when the occupant isn't a symlink.
    pub current: PathBuf,
    /// What the plan wants at `target`: a link's desired destination, or
    /// the package-side directory a `DirVsFile` conflict would mirror.
    pub desired: PathBuf,
    /// Name of the package whose node produced this conflict.
    pub package: String,
}

impl Conflict {
    pub fn target_path_buf(&self) -> PathBuf {
        self.target.clone().into_path_buf()
    }

    pub fn suggestion(&self) -> &'static str {
        self.kind.suggestion()
    }
}
