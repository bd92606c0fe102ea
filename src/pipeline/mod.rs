//! Stage composition: Scanner -> Planner -> Sorter -> Executor -> Manifest,
//! wired together behind one call so `manage` (and the services built on
//! top of it) don't have to re-thread the same five stages by hand.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::adapters::fs::Filesystem;
use crate::adapters::logger::Logger;
use crate::cancel::Context;
use crate::error::Result;
use crate::exec::Executor;
use crate::manifest::hash::hash_package;
use crate::manifest::{LinkRecord, Manifest, ManifestStore};
use crate::path::{PackagePath, TargetPath};
use crate::plan::{ConflictPolicy, Operation, PlannedOperation};
use crate::scan::prompt::LargeFilePrompter;
use crate::scan::Scanner;

pub struct Pipeline<'a> {
    fs: &'a (dyn Filesystem + 'a),
    logger: &'a (dyn Logger + 'a),
    scanner: Scanner,
}

/// What a successful `manage` run produced, for the manifest and for
/// reporting back to the caller.
pub struct ManageOutcome {
    pub applied: Vec<PlannedOperation>,
    pub skipped: Vec<crate::plan::Conflict>,
    pub warnings: Vec<String>,
    pub package_hash: String,
    pub links: Vec<LinkRecord>,
    pub backups: HashMap<PathBuf, PathBuf>,
}

impl<'a> Pipeline<'a> {
    pub fn new(fs: &'a dyn Filesystem, logger: &'a dyn Logger, large_file_threshold: u64, prompter: Box<dyn LargeFilePrompter>) -> Self {
        Self { fs, logger, scanner: Scanner::new(large_file_threshold, prompter) }
    }

    /// Run the full pipeline for one package: scan, plan, sort, validate,
    /// apply. Returns before any mutation if planning raised an error
    /// (e.g. `ConflictPolicy::Fail` hit a conflict).
    pub fn manage(&self, package: &PackagePath, target_root: &TargetPath, policy: ConflictPolicy, ctx: &Context) -> Result<ManageOutcome> {
        ctx.check()?;
        let tree = self.scanner.scan(package, ctx)?;
        let package_hash = hash_package(package.as_path(), &tree)?;

        let planner = crate::plan::Planner::new(self.fs);
        let plan = planner.plan(package, &tree, target_root, policy)?;

        ctx.check()?;
        let batches = crate::sort::sort(&plan.operations)?;
        let by_id: HashMap<_, _> = plan.operations.iter().map(|op| (op.id, op)).collect();

        let executor = Executor::new(self.fs, self.logger);
        executor.validate(&plan.operations)?;
        executor.apply(&batches, &by_id, ctx)?;

        let links = plan
            .operations
            .iter()
            .filter_map(|op| match &op.operation {
                Operation::LinkCreate { link, target } => Some(LinkRecord { target: link.clone().into_path_buf(), source: target.clone() }),
                _ => None,
            })
            .collect();
        let backups = plan
            .operations
            .iter()
            .filter_map(|op| match &op.operation {
                Operation::FileBackup { path, backup } => Some((path.clone().into_path_buf(), backup.clone().into_path_buf())),
                _ => None,
            })
            .collect();

        self.logger.info(&format!("managed {} ({} operations applied)", package.as_path().display(), plan.operations.len()));

        Ok(ManageOutcome { applied: plan.operations, skipped: plan.skipped, warnings: plan.warnings, package_hash, links, backups })
    }

    /// Persist a successful [`ManageOutcome`] to the manifest.
    pub fn record(&self, store: &ManifestStore, package: &PackagePath, outcome: &ManageOutcome) -> Result<()> {
        store.record_package(
            &package_name(package),
            package.as_path().to_path_buf(),
            crate::manifest::ManagedSource::Managed,
            outcome.links.clone(),
            outcome.package_hash.clone(),
            outcome.backups.clone(),
        )
    }

    /// Re-run `manage` only if the package's content hash has changed
    /// since it was last recorded; otherwise a no-op. Used by
    /// [`crate::services::remanage`].
    pub fn remanage_if_changed(&self, package: &PackagePath, package_name: &str, target_root: &TargetPath, policy: ConflictPolicy, manifest: &Manifest, ctx: &Context) -> Result<Option<ManageOutcome>> {
        let tree = self.scanner.scan(package, ctx)?;
        let new_hash = hash_package(package.as_path(), &tree)?;
        if let Some(entry) = manifest.packages.get(package_name) {
            if entry.package_hash == new_hash {
                return Ok(None);
            }
        }
        self.manage(package, target_root, policy, ctx).map(Some)
    }
}

pub fn package_name(package: &PackagePath) -> String {
    package.as_path().file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| package.to_string())
}
