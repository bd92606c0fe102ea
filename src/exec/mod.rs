//! The two-phase executor: every operation is validated against the
//! current filesystem state before anything is mutated, then applied
//! batch by batch (batches run their operations in parallel), with a
//! checkpoint recorded per operation so a mid-run failure can be rolled
//! back.

pub mod checkpoint;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::adapters::fs::{EntryKind, Filesystem};
use crate::adapters::logger::Logger;
use crate::cancel::Context;
use crate::error::{DotError, Result};
use crate::plan::{Operation, OperationId, PlannedOperation};

use checkpoint::{Checkpoint, CheckpointStore};

pub struct Executor<'a> {
    fs: &'a (dyn Filesystem + 'a),
    logger: &'a (dyn Logger + 'a),
}

impl<'a> Executor<'a> {
    pub fn new(fs: &'a dyn Filesystem, logger: &'a dyn Logger) -> Self {
        Self { fs, logger }
    }

    /// Phase one: confirm every operation's precondition still holds.
    /// Catches the case where the filesystem changed between planning and
    /// execution (a stale plan, a concurrent process) before anything is
    /// mutated.
    ///
    /// Operations are checked in plan order (parent directories and
    /// conflict-clearing prep ops are always emitted before the operation
    /// that depends on them), tracking which paths this plan itself will
    /// have created or cleared by the time a later operation runs — so a
    /// `LinkCreate` whose target is still occupied by the file an earlier
    /// `FileBackup`/`FileDelete` in this same plan hasn't cleared yet
    /// (that only happens in phase two) is not mistaken for a stale plan.
    pub fn validate(&self, operations: &[PlannedOperation]) -> Result<()> {
        let mut created: HashSet<PathBuf> = HashSet::new();
        let mut cleared: HashSet<PathBuf> = HashSet::new();

        let fail = |id: OperationId, path: &Path, expectation: &str| {
            Err(DotError::ValidationFailed { op: id, reason: format!("expected {} to be {expectation}", path.display()) })
        };

        for planned in operations {
            match &planned.operation {
                Operation::DirCreate { path } => {
                    if let Some(parent) = path.as_path().parent() {
                        if !exists_at(self.fs, &created, &cleared, parent)? {
                            return fail(planned.id, parent, "an existing or earlier-created directory");
                        }
                    }
                    created.insert(path.clone().into_path_buf());
                }
                Operation::LinkCreate { link, target } => {
                    if !exists_at(self.fs, &created, &cleared, target)? {
                        return fail(planned.id, target, "present (link source)");
                    }
                    if let Some(parent) = link.as_path().parent() {
                        if !exists_at(self.fs, &created, &cleared, parent)? {
                            return fail(planned.id, parent, "an existing or earlier-created directory");
                        }
                    }
                    created.insert(link.clone().into_path_buf());
                    cleared.remove(link.as_path());
                }
                Operation::LinkDelete { link } => {
                    if !exists_at(self.fs, &created, &cleared, link.as_path())? {
                        return fail(planned.id, link.as_path(), "present");
                    }
                    cleared.insert(link.clone().into_path_buf());
                    created.remove(link.as_path());
                }
                Operation::FileMove { from, to } => {
                    if !exists_at(self.fs, &created, &cleared, from.as_path())? {
                        return fail(planned.id, from.as_path(), "present");
                    }
                    cleared.insert(from.clone().into_path_buf());
                    created.insert(to.clone().into_path_buf());
                }
                Operation::FileBackup { path, backup } => {
                    if !exists_at(self.fs, &created, &cleared, path.as_path())? {
                        return fail(planned.id, path.as_path(), "present");
                    }
                    cleared.insert(path.clone().into_path_buf());
                    created.insert(backup.clone().into_path_buf());
                }
                Operation::FileDelete { path } => {
                    if !exists_at(self.fs, &created, &cleared, path.as_path())? {
                        return fail(planned.id, path.as_path(), "present");
                    }
                    cleared.insert(path.clone().into_path_buf());
                }
            }
        }
        Ok(())
    }

    /// Phase two: apply `batches` in order, running each batch's
    /// operations in parallel. On the first failure, everything recorded
    /// so far is rolled back and the original error is returned wrapped
    /// in [`DotError::ExecutionFailed`].
    pub fn apply(
        &self,
        batches: &[Vec<OperationId>],
        by_id: &HashMap<OperationId, &PlannedOperation>,
        ctx: &Context,
    ) -> Result<()> {
        let store = CheckpointStore::new();

        for batch in batches {
            ctx.check()?;

            let failure = batch
                .par_iter()
                .map(|id| {
                    let planned = by_id.get(id).expect("batch id must exist in plan");
                    apply_one(self.fs, planned, &store)
                })
                .find_any(|r| r.is_err());

            if let Some(Err(e)) = failure {
                self.logger.error(&format!("execution failed, rolling back: {e}"));
                let op = match &e {
                    DotError::ExecutionFailed { op, .. } => *op,
                    _ => unreachable!("apply_one only ever returns ExecutionFailed"),
                };
                let rollback_causes = store.rollback_all(self.fs, self.logger);
                if rollback_causes.is_empty() {
                    return Err(e);
                }
                return Err(DotError::RollbackFailed { op, execution_cause: Box::new(e), rollback_causes });
            }
        }

        Ok(())
    }
}

/// Whether `path` is present at the point this operation runs: either
/// already on disk, or accounted for by an earlier operation in this same
/// plan (created and not yet cleared again, or explicitly cleared).
fn exists_at(fs: &dyn Filesystem, created: &HashSet<PathBuf>, cleared: &HashSet<PathBuf>, path: &Path) -> Result<bool> {
    if created.contains(path) {
        return Ok(true);
    }
    if cleared.contains(path) {
        return Ok(false);
    }
    Ok(fs.kind_of(path)? != EntryKind::Missing)
}

fn apply_one(fs: &dyn Filesystem, planned: &PlannedOperation, store: &CheckpointStore) -> Result<()> {
    let wrap = |e: DotError| DotError::ExecutionFailed { op: planned.id, cause: Box::new(e) };

    match &planned.operation {
        Operation::DirCreate { path } => {
            fs.create_dir_all(path.as_path()).map_err(wrap)?;
            store.record(planned.id, Checkpoint::DirCreated { path: path.clone().into_path_buf() });
        }
        Operation::LinkCreate { link, target } => {
            fs.symlink(link.as_path(), target).map_err(wrap)?;
            store.record(planned.id, Checkpoint::LinkCreated { path: link.clone().into_path_buf() });
        }
        Operation::LinkDelete { link } => {
            let previous_target = fs.read_link(link.as_path()).map_err(wrap)?;
            fs.remove_file(link.as_path()).map_err(wrap)?;
            store.record(planned.id, Checkpoint::LinkRemoved { path: link.clone().into_path_buf(), previous_target });
        }
        Operation::FileMove { from, to } => {
            fs.rename(from.as_path(), to.as_path()).map_err(wrap)?;
            store.record(planned.id, Checkpoint::FileMoved { from: from.clone().into_path_buf(), to: to.clone().into_path_buf() });
        }
        Operation::FileBackup { path, backup } => {
            if let Some(parent) = backup.as_path().parent() {
                fs.create_dir_all(parent).map_err(wrap)?;
            }
            fs.rename(path.as_path(), backup.as_path()).map_err(wrap)?;
            store.record(planned.id, Checkpoint::FileBackedUp { original: path.clone().into_path_buf(), backup: backup.clone().into_path_buf() });
        }
        Operation::FileDelete { path } => {
            let content = fs.read(path.as_path()).unwrap_or_default();
            fs.remove_file(path.as_path()).map_err(wrap)?;
            store.record(planned.id, Checkpoint::FileRemoved { path: path.clone().into_path_buf(), content });
        }
    }
    Ok(())
}
