//! Per-operation undo records, generalising the teacher's linear rollback
//! journal into a map keyed by [`OperationId`] so operations applied
//! concurrently within a batch can each record (and later undo) their own
//! checkpoint without contending on a single log.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::adapters::fs::Filesystem;
use crate::adapters::logger::Logger;
use crate::plan::OperationId;

#[derive(Debug, Clone)]
pub enum Checkpoint {
    DirCreated { path: PathBuf },
    LinkCreated { path: PathBuf },
    LinkRemoved { path: PathBuf, previous_target: PathBuf },
    FileMoved { from: PathBuf, to: PathBuf },
    FileBackedUp { original: PathBuf, backup: PathBuf },
    FileRemoved { path: PathBuf, content: Vec<u8> },
}

/// Checkpoints recorded so far in a run, keyed by the operation that
/// produced them. Undoing walks them in descending [`OperationId`] order,
/// which is always safe because operations only ever depend on
/// lower-numbered ids (see [`crate::sort`]).
#[derive(Default)]
pub struct CheckpointStore {
    entries: Mutex<HashMap<OperationId, Checkpoint>>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: OperationId, checkpoint: Checkpoint) {
        self.entries.lock().unwrap().insert(id, checkpoint);
    }

    /// Undo every recorded checkpoint, most-recent first. Keeps going past
    /// an individual undo failure (a best-effort rollback beats stopping
    /// partway through), but returns every failure encountered so the
    /// caller can surface them distinctly from the error that triggered
    /// the rollback.
    pub fn rollback_all(&self, fs: &dyn Filesystem, logger: &dyn Logger) -> Vec<crate::error::DotError> {
        let mut entries: Vec<_> = self.entries.lock().unwrap().drain().collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));

        let mut failures = Vec::new();
        for (id, checkpoint) in entries {
            if let Err(e) = undo_one(&checkpoint, fs) {
                logger.warn(&format!("rollback of operation {id} failed: {e}"));
                failures.push(e);
            }
        }
        failures
    }
}

fn undo_one(checkpoint: &Checkpoint, fs: &dyn Filesystem) -> crate::error::Result<()> {
    match checkpoint {
        Checkpoint::DirCreated { path } => fs.remove_dir(path),
        Checkpoint::LinkCreated { path } => fs.remove_file(path),
        Checkpoint::LinkRemoved { path, previous_target } => fs.symlink(path, previous_target),
        Checkpoint::FileMoved { from, to } => fs.rename(to, from),
        Checkpoint::FileBackedUp { original, backup } => {
            fs.rename(backup, original)?;
            Ok(())
        }
        Checkpoint::FileRemoved { path, content } => fs.write(path, content, 0o644),
    }
}
