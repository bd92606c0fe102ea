//! Remanage: re-run `manage` for already-managed packages, skipping any
//! whose content hash hasn't changed since it was last recorded.

use crate::cancel::Context;
use crate::error::Result;
use crate::manifest::{Manifest, ManifestStore};
use crate::path::{PackagePath, TargetPath};
use crate::pipeline::Pipeline;
use crate::plan::ConflictPolicy;

pub struct RemanageReport {
    pub reconciled: Vec<String>,
    pub unchanged: Vec<String>,
}

pub fn remanage_all(
    pipeline: &Pipeline,
    store: &ManifestStore,
    packages: &[(String, PackagePath)],
    target_root: &TargetPath,
    policy: ConflictPolicy,
    ctx: &Context,
) -> Result<RemanageReport> {
    let manifest: Manifest = store.load()?;
    let mut reconciled = Vec::new();
    let mut unchanged = Vec::new();

    for (name, package) in packages {
        ctx.check()?;
        match pipeline.remanage_if_changed(package, name, target_root, policy, &manifest, ctx)? {
            Some(outcome) => {
                pipeline.record(store, package, &outcome)?;
                reconciled.push(name.clone());
            }
            None => unchanged.push(name.clone()),
        }
    }

    Ok(RemanageReport { reconciled, unchanged })
}
