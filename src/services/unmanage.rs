//! Unmanage: remove every link a package owns and drop its manifest
//! entry. Links that drifted (no longer a symlink, or pointing somewhere
//! the manifest didn't record) are left alone and reported rather than
//! forced away.

use crate::adapters::fs::{EntryKind, Filesystem};
use crate::adapters::logger::Logger;
use crate::error::{DotError, Result};
use crate::manifest::ManifestStore;

pub struct UnmanageReport {
    pub removed: usize,
    pub skipped_drifted: Vec<std::path::PathBuf>,
}

/// Remove every link `package_name` owns and drop its manifest entry. When
/// `restore_backups` is set, each file a conflict-`backup` policy moved
/// aside while managing this package is renamed back to its original path
/// after the corresponding link is removed.
pub fn unmanage(fs: &dyn Filesystem, logger: &dyn Logger, store: &ManifestStore, package_name: &str, restore_backups: bool) -> Result<UnmanageReport> {
    let entry = store.remove_package(package_name)?.ok_or_else(|| DotError::PackageNotFound(package_name.to_string()))?;

    let mut removed = 0;
    let mut skipped_drifted = Vec::new();

    for link in &entry.links {
        match fs.kind_of(&link.target) {
            Ok(EntryKind::Symlink) => match fs.read_link(&link.target) {
                Ok(actual) if actual == link.source => {
                    fs.remove_file(&link.target)?;
                    removed += 1;
                }
                _ => {
                    logger.warn(&format!("{} no longer points at the recorded source; leaving it alone", link.target.display()));
                    skipped_drifted.push(link.target.clone());
                }
            },
            _ => {
                logger.warn(&format!("{} is no longer a symlink; leaving it alone", link.target.display()));
                skipped_drifted.push(link.target.clone());
            }
        }
    }

    if restore_backups {
        for (original, backup) in &entry.backups {
            if fs.kind_of(original).unwrap_or(EntryKind::Missing) != EntryKind::Missing {
                logger.warn(&format!("{} already exists; leaving backup {} in place", original.display(), backup.display()));
                continue;
            }
            if let Err(e) = fs.rename(backup, original) {
                logger.warn(&format!("failed to restore backup {} to {}: {e}", backup.display(), original.display()));
            }
        }
    }

    Ok(UnmanageReport { removed, skipped_drifted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fs::MemoryFilesystem;
    use crate::adapters::logger::NoopLogger;
    use crate::manifest::LinkRecord;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    #[test]
    fn removes_correctly_linked_entries() {
        let fs = MemoryFilesystem::new().with_symlink("/home/u/.vimrc", "/pkgs/vim/dot-vimrc");
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        store
            .record_package(
                "vim",
                "/pkgs/vim".into(),
                crate::manifest::ManagedSource::Managed,
                vec![LinkRecord { target: "/home/u/.vimrc".into(), source: "/pkgs/vim/dot-vimrc".into() }],
                "h".to_string(),
                HashMap::new(),
            )
            .unwrap();

        let report = unmanage(&fs, &NoopLogger, &store, "vim", false).unwrap();
        assert_eq!(report.removed, 1);
        assert!(report.skipped_drifted.is_empty());
        assert!(!store.load().unwrap().is_managed("vim"));
    }

    #[test]
    fn leaves_drifted_links_in_place() {
        let fs = MemoryFilesystem::new().with_symlink("/home/u/.vimrc", "/somewhere/else");
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        store
            .record_package(
                "vim",
                "/pkgs/vim".into(),
                crate::manifest::ManagedSource::Managed,
                vec![LinkRecord { target: "/home/u/.vimrc".into(), source: "/pkgs/vim/dot-vimrc".into() }],
                "h".to_string(),
                HashMap::new(),
            )
            .unwrap();

        let report = unmanage(&fs, &NoopLogger, &store, "vim", false).unwrap();
        assert_eq!(report.removed, 0);
        assert_eq!(report.skipped_drifted.len(), 1);
    }

    #[test]
    fn unknown_package_is_reported() {
        let fs = MemoryFilesystem::new();
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        let err = unmanage(&fs, &NoopLogger, &store, "ghost", false).unwrap_err();
        assert!(matches!(err, DotError::PackageNotFound(_)));
    }

    #[test]
    fn restores_backup_when_requested() {
        let fs = MemoryFilesystem::new()
            .with_symlink("/home/u/.bashrc", "/pkgs/shell/dot-bashrc")
            .with_file("/home/u/.dot-backup/.bashrc.20260101T000000Z", b"old config".to_vec());
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        let mut backups = HashMap::new();
        backups.insert(PathBuf::from("/home/u/.bashrc"), PathBuf::from("/home/u/.dot-backup/.bashrc.20260101T000000Z"));
        store
            .record_package(
                "shell",
                "/pkgs/shell".into(),
                crate::manifest::ManagedSource::Managed,
                vec![LinkRecord { target: "/home/u/.bashrc".into(), source: "/pkgs/shell/dot-bashrc".into() }],
                "h".to_string(),
                backups,
            )
            .unwrap();

        let report = unmanage(&fs, &NoopLogger, &store, "shell", true).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(fs.kind_of(Path::new("/home/u/.bashrc")).unwrap(), EntryKind::File);
        assert_eq!(fs.read(Path::new("/home/u/.bashrc")).unwrap(), b"old config");
    }
}
