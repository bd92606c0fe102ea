//! Adopt: take a file that already exists in the target tree, move it
//! into a package's source tree, and link it back in its place. The
//! inverse of a normal `manage` run for that one file.

use crate::adapters::fs::{EntryKind, Filesystem};
use crate::error::{DotError, Result};
use crate::manifest::LinkRecord;
use crate::path::{PackagePath, TargetPath};
use crate::translate::untranslate_path;

pub fn adopt(fs: &dyn Filesystem, package: &PackagePath, target_root: &TargetPath, existing: &TargetPath) -> Result<LinkRecord> {
    match fs.kind_of(existing.as_path())? {
        EntryKind::File => {}
        EntryKind::Symlink => return Err(DotError::PackageAlreadyManaged(existing.as_path().display().to_string())),
        _ => return Err(DotError::PathInvalid(format!("{} is not a plain file", existing.as_path().display()))),
    }

    let relative = existing
        .as_path()
        .strip_prefix(target_root.as_path())
        .map_err(|_| DotError::PathInvalid(format!("{} is not under {}", existing.as_path().display(), target_root.as_path().display())))?;
    let source_relative = untranslate_path(relative);
    let dest_in_package = package.as_path().join(&source_relative);

    if let Some(parent) = dest_in_package.parent() {
        fs.create_dir_all(parent)?;
    }
    fs.rename(existing.as_path(), &dest_in_package)?;
    fs.symlink(existing.as_path(), &dest_in_package)?;

    Ok(LinkRecord { target: existing.clone().into_path_buf(), source: dest_in_package })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fs::MemoryFilesystem;

    #[test]
    fn moves_file_into_package_and_links_it_back() {
        let fs = MemoryFilesystem::new().with_file("/home/u/.vimrc", b"set nu".to_vec());
        let package = PackagePath::new_unchecked("/pkgs/vim");
        let target_root = TargetPath::new_unchecked("/home/u");
        let existing = TargetPath::new_unchecked("/home/u/.vimrc");

        let record = adopt(&fs, &package, &target_root, &existing).unwrap();
        assert_eq!(record.source, std::path::PathBuf::from("/pkgs/vim/dot-vimrc"));

        use crate::adapters::fs::EntryKind;
        assert_eq!(fs.kind_of(std::path::Path::new("/pkgs/vim/dot-vimrc")).unwrap(), EntryKind::File);
        assert_eq!(fs.kind_of(existing.as_path()).unwrap(), EntryKind::Symlink);
        assert_eq!(fs.read_link(existing.as_path()).unwrap(), std::path::PathBuf::from("/pkgs/vim/dot-vimrc"));
    }

    #[test]
    fn refuses_to_adopt_a_directory() {
        let fs = MemoryFilesystem::new().with_dir("/home/u/.vim");
        let package = PackagePath::new_unchecked("/pkgs/vim");
        let target_root = TargetPath::new_unchecked("/home/u");
        let existing = TargetPath::new_unchecked("/home/u/.vim");
        assert!(adopt(&fs, &package, &target_root, &existing).is_err());
    }

    #[test]
    fn refuses_to_adopt_an_already_managed_symlink() {
        let fs = MemoryFilesystem::new().with_symlink("/home/u/.vimrc", "/pkgs/vim/dot-vimrc");
        let package = PackagePath::new_unchecked("/pkgs/vim");
        let target_root = TargetPath::new_unchecked("/home/u");
        let existing = TargetPath::new_unchecked("/home/u/.vimrc");
        let err = adopt(&fs, &package, &target_root, &existing).unwrap_err();
        assert!(matches!(err, DotError::PackageAlreadyManaged(_)));
    }
}
