//! Health checks over an already-managed target tree: symlinks the
//! manifest thinks exist but don't, symlinks that drifted to point
//! somewhere other than what the manifest recorded, and symlinks that
//! point into a managed package's source but were never recorded at all.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::adapters::fs::{EntryKind, Filesystem};
use crate::error::Result;
use crate::manifest::Manifest;
use crate::path::TargetPath;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// The manifest records this link but it's gone from disk.
    Missing,
    /// The link exists but no longer points where the manifest says.
    WrongTarget { expected: PathBuf, actual: PathBuf },
    /// The link's target no longer exists.
    BrokenTarget,
    /// A symlink under the target root points into a managed package's
    /// source tree but isn't recorded in the manifest.
    Orphaned,
}

#[derive(Debug, Clone)]
pub struct Issue {
    pub target: PathBuf,
    pub kind: IssueKind,
}

pub struct Doctor<'a> {
    fs: &'a (dyn Filesystem + 'a),
}

impl<'a> Doctor<'a> {
    pub fn new(fs: &'a dyn Filesystem) -> Self {
        Self { fs }
    }

    /// Check every link the manifest knows about, stopping once
    /// `max_issues` have been found (0 means unbounded).
    pub fn check_manifest(&self, manifest: &Manifest, max_issues: usize) -> Vec<Issue> {
        let counter = AtomicUsize::new(0);
        let links: Vec<_> = manifest.all_links().collect();

        links
            .par_iter()
            .filter_map(|link| {
                let issue = self.check_one(&link.target, &link.source)?;
                if max_issues > 0 {
                    // fetch_add hands out a unique sequence number per
                    // issue found, so the cap holds exactly even when
                    // multiple threads finish concurrently.
                    let seq = counter.fetch_add(1, Ordering::Relaxed);
                    if seq >= max_issues {
                        return None;
                    }
                }
                Some(issue)
            })
            .collect()
    }

    fn check_one(&self, target: &Path, expected_source: &Path) -> Option<Issue> {
        match self.fs.kind_of(target) {
            Ok(EntryKind::Missing) => Some(Issue { target: target.to_path_buf(), kind: IssueKind::Missing }),
            Ok(EntryKind::Symlink) => {
                let actual = self.fs.read_link(target).ok()?;
                if actual != expected_source {
                    Some(Issue {
                        target: target.to_path_buf(),
                        kind: IssueKind::WrongTarget { expected: expected_source.to_path_buf(), actual: actual.clone() },
                    })
                } else if self.fs.kind_of(&actual).ok()? == EntryKind::Missing {
                    Some(Issue { target: target.to_path_buf(), kind: IssueKind::BrokenTarget })
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Walk `target_root` for symlinks that point into any of
    /// `package_roots` but aren't recorded in `manifest`. Unlike
    /// `check_manifest`, this walks the real directory tree (symlink
    /// discovery has to enumerate the filesystem) and is therefore not
    /// backed by the [`Filesystem`] port.
    pub fn find_orphans(&self, target_root: &TargetPath, package_roots: &[PathBuf], manifest: &Manifest, max_issues: usize) -> Result<Vec<Issue>> {
        let known: std::collections::HashSet<PathBuf> = manifest.all_links().map(|l| l.target.clone()).collect();

        let mut issues = Vec::new();
        for entry in WalkDir::new(target_root.as_path()).into_iter().filter_map(|e| e.ok()) {
            if max_issues > 0 && issues.len() >= max_issues {
                break;
            }
            if !entry.file_type().is_symlink() {
                continue;
            }
            let path = entry.path();
            if known.contains(path) {
                continue;
            }
            let Ok(link_target) = std::fs::read_link(path) else { continue };
            if package_roots.iter().any(|root| link_target.starts_with(root)) {
                issues.push(Issue { target: path.to_path_buf(), kind: IssueKind::Orphaned });
            }
        }
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fs::MemoryFilesystem;
    use crate::manifest::LinkRecord;

    fn manifest_with(links: Vec<LinkRecord>) -> Manifest {
        use crate::manifest::{ManagedSource, ManifestEntry};
        use chrono::Utc;
        let mut m = Manifest::default();
        m.packages.insert(
            "pkg".to_string(),
            ManifestEntry {
                package: "pkg".to_string(),
                package_dir: "/pkgs/pkg".into(),
                source: ManagedSource::Managed,
                link_count: links.len(),
                links,
                package_hash: "h".to_string(),
                managed_at: Utc::now(),
                backups: Default::default(),
            },
        );
        m
    }

    #[test]
    fn missing_link_is_reported() {
        let fs = MemoryFilesystem::new();
        let manifest = manifest_with(vec![LinkRecord { target: "/home/u/.vimrc".into(), source: "/pkgs/vim/dot-vimrc".into() }]);
        let doctor = Doctor::new(&fs);
        let issues = doctor.check_manifest(&manifest, 0);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::Missing);
    }

    #[test]
    fn wrong_target_is_reported() {
        let fs = MemoryFilesystem::new().with_symlink("/home/u/.vimrc", "/pkgs/other/vimrc");
        let manifest = manifest_with(vec![LinkRecord { target: "/home/u/.vimrc".into(), source: "/pkgs/vim/dot-vimrc".into() }]);
        let doctor = Doctor::new(&fs);
        let issues = doctor.check_manifest(&manifest, 0);
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0].kind, IssueKind::WrongTarget { .. }));
    }

    #[test]
    fn max_issues_bounds_the_result() {
        let fs = MemoryFilesystem::new();
        let manifest = manifest_with(vec![
            LinkRecord { target: "/home/u/.a".into(), source: "/pkgs/x/a".into() },
            LinkRecord { target: "/home/u/.b".into(), source: "/pkgs/x/b".into() },
        ]);
        let doctor = Doctor::new(&fs);
        let issues = doctor.check_manifest(&manifest, 1);
        assert_eq!(issues.len(), 1);
    }
}
