//! The filesystem port: every mutating operation the executor and doctor
//! perform against the target tree goes through this trait, so tests can
//! run the same logic against an in-memory tree instead of the real disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{DotError, Result};

/// What sits at a path, as far as the executor cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Missing,
}

pub trait Filesystem: Send + Sync {
    fn kind_of(&self, path: &Path) -> Result<EntryKind>;
    fn read_link(&self, path: &Path) -> Result<PathBuf>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_dir(&self, path: &Path) -> Result<()>;
    fn symlink(&self, link: &Path, target: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn write(&self, path: &Path, content: &[u8], perm: u32) -> Result<()>;
}

/// The default backend: delegates straight to `std::fs`.
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn kind_of(&self, path: &Path) -> Result<EntryKind> {
        match std::fs::symlink_metadata(path) {
            Ok(meta) => {
                let ft = meta.file_type();
                Ok(if ft.is_symlink() {
                    EntryKind::Symlink
                } else if ft.is_dir() {
                    EntryKind::Dir
                } else {
                    EntryKind::File
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EntryKind::Missing),
            Err(e) => Err(DotError::Io(e)),
        }
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf> {
        Ok(std::fs::read_link(path)?)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        Ok(std::fs::create_dir_all(path)?)
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        Ok(std::fs::remove_dir(path)?)
    }

    fn symlink(&self, link: &Path, target: &Path) -> Result<()> {
        Ok(std::os::unix::fs::symlink(target, link)?)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        Ok(std::fs::remove_file(path)?)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        Ok(std::fs::rename(from, to)?)
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::copy(from, to)?;
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(std::fs::read(path)?)
    }

    fn write(&self, path: &Path, content: &[u8], perm: u32) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        std::fs::write(path, content)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(perm))?;
        Ok(())
    }
}

#[derive(Clone)]
enum MemEntry {
    File(Vec<u8>),
    Dir,
    Symlink(PathBuf),
}

/// An in-memory tree used by executor and doctor tests. Not a full
/// filesystem simulation: no permission bits, no hard links, parent
/// directories are not implicitly created by `symlink`/`rename` the way a
/// real filesystem's immediate parent must already exist.
#[derive(Default)]
pub struct MemoryFilesystem {
    entries: Mutex<HashMap<PathBuf, MemEntry>>,
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.entries.lock().unwrap().insert(path.into(), MemEntry::File(content.into()));
        self
    }

    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        self.entries.lock().unwrap().insert(path.into(), MemEntry::Dir);
        self
    }

    pub fn with_symlink(self, path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        self.entries.lock().unwrap().insert(path.into(), MemEntry::Symlink(target.into()));
        self
    }

    fn not_found(path: &Path) -> DotError {
        DotError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no such entry: {}", path.display()),
        ))
    }
}

impl Filesystem for MemoryFilesystem {
    fn kind_of(&self, path: &Path) -> Result<EntryKind> {
        let entries = self.entries.lock().unwrap();
        Ok(match entries.get(path) {
            Some(MemEntry::File(_)) => EntryKind::File,
            Some(MemEntry::Dir) => EntryKind::Dir,
            Some(MemEntry::Symlink(_)) => EntryKind::Symlink,
            None => EntryKind::Missing,
        })
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf> {
        match self.entries.lock().unwrap().get(path) {
            Some(MemEntry::Symlink(target)) => Ok(target.clone()),
            _ => Err(Self::not_found(path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            entries.entry(current.clone()).or_insert(MemEntry::Dir);
        }
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        match entries.remove(path) {
            Some(MemEntry::Dir) => Ok(()),
            Some(other) => {
                entries.insert(path.to_path_buf(), other);
                Err(DotError::PathInvalid(format!("{} is not a directory", path.display())))
            }
            None => Err(Self::not_found(path)),
        }
    }

    fn symlink(&self, link: &Path, target: &Path) -> Result<()> {
        self.entries.lock().unwrap().insert(link.to_path_buf(), MemEntry::Symlink(target.to_path_buf()));
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        match entries.remove(path) {
            Some(_) => Ok(()),
            None => Err(Self::not_found(path)),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.remove(from).ok_or_else(|| Self::not_found(from))?;
        entries.insert(to.to_path_buf(), entry);
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let content = match entries.get(from) {
            Some(MemEntry::File(bytes)) => bytes.clone(),
            Some(_) => return Err(DotError::PathInvalid(format!("{} is not a file", from.display()))),
            None => return Err(Self::not_found(from)),
        };
        entries.insert(to.to_path_buf(), MemEntry::File(content));
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match self.entries.lock().unwrap().get(path) {
            Some(MemEntry::File(bytes)) => Ok(bytes.clone()),
            Some(_) => Err(DotError::PathInvalid(format!("{} is not a file", path.display()))),
            None => Err(Self::not_found(path)),
        }
    }

    fn write(&self, path: &Path, content: &[u8], _perm: u32) -> Result<()> {
        self.entries.lock().unwrap().insert(path.to_path_buf(), MemEntry::File(content.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fs_tracks_create_and_remove() {
        let fs = MemoryFilesystem::new();
        fs.create_dir_all(Path::new("/home/u")).unwrap();
        fs.symlink(Path::new("/home/u/.vimrc"), Path::new("/pkgs/vim/vimrc")).unwrap();
        assert_eq!(fs.kind_of(Path::new("/home/u/.vimrc")).unwrap(), EntryKind::Symlink);
        assert_eq!(fs.read_link(Path::new("/home/u/.vimrc")).unwrap(), PathBuf::from("/pkgs/vim/vimrc"));
        fs.remove_file(Path::new("/home/u/.vimrc")).unwrap();
        assert_eq!(fs.kind_of(Path::new("/home/u/.vimrc")).unwrap(), EntryKind::Missing);
    }

    #[test]
    fn memory_fs_rename_moves_entry() {
        let fs = MemoryFilesystem::new().with_file("/home/u/.bashrc", b"export X=1".to_vec());
        fs.rename(Path::new("/home/u/.bashrc"), Path::new("/home/u/.bashrc.bak")).unwrap();
        assert_eq!(fs.kind_of(Path::new("/home/u/.bashrc")).unwrap(), EntryKind::Missing);
        assert_eq!(fs.read(Path::new("/home/u/.bashrc.bak")).unwrap(), b"export X=1");
    }
}
