//! Content hashing: a per-file digest and a whole-package digest built
//! from the sorted `(relative path, mode, file digest)` triples of every
//! file in the tree. Used to detect whether a package's source changed
//! since it was last reconciled (`remanage`) without re-walking and
//! re-linking everything on every invocation.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{DotError, Result};
use crate::scan::Node;

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(DotError::Io)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let count = file.read(&mut buffer).map_err(DotError::Io)?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn file_mode(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    let meta = std::fs::symlink_metadata(path).map_err(DotError::Io)?;
    Ok(meta.permissions().mode())
}

/// Hash an entire scanned package tree: every `File` leaf contributes
/// `source_relative\0mode\0digest`, sorted by `source_relative` so the
/// result doesn't depend on directory-read order, then combined under one
/// outer digest.
pub fn hash_package(package_root: &Path, root: &Node) -> Result<String> {
    let mut entries = Vec::new();
    collect_file_entries(package_root, root, &mut entries)?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (relative, mode, digest) in entries {
        hasher.update(relative.as_bytes());
        hasher.update([0]);
        hasher.update(mode.to_le_bytes());
        hasher.update([0]);
        hasher.update(digest.as_bytes());
        hasher.update(b"\n");
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn collect_file_entries(package_root: &Path, node: &Node, out: &mut Vec<(String, u32, String)>) -> Result<()> {
    match node {
        Node::File { source_relative, .. } => {
            let abs = package_root.join(source_relative);
            let digest = sha256_file(&abs)?;
            let mode = file_mode(&abs)?;
            out.push((source_relative.to_string_lossy().to_string(), mode, digest));
        }
        Node::Symlink { source_relative, link_target, .. } => {
            let digest = format!("{:x}", Sha256::digest(link_target.to_string_lossy().as_bytes()));
            out.push((source_relative.to_string_lossy().to_string(), 0, digest));
        }
        Node::Dir { children, .. } => {
            for child in children {
                collect_file_entries(package_root, child, out)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn hash_is_stable_regardless_of_tree_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"one").unwrap();
        std::fs::write(dir.path().join("b"), b"two").unwrap();

        let tree_ab = Node::Dir {
            source_relative: PathBuf::new(),
            target_relative: PathBuf::new(),
            children: vec![
                Node::File { source_relative: "a".into(), target_relative: "a".into(), size: 3 },
                Node::File { source_relative: "b".into(), target_relative: "b".into(), size: 3 },
            ],
        };
        let tree_ba = Node::Dir {
            source_relative: PathBuf::new(),
            target_relative: PathBuf::new(),
            children: vec![
                Node::File { source_relative: "b".into(), target_relative: "b".into(), size: 3 },
                Node::File { source_relative: "a".into(), target_relative: "a".into(), size: 3 },
            ],
        };

        assert_eq!(hash_package(dir.path(), &tree_ab).unwrap(), hash_package(dir.path(), &tree_ba).unwrap());
    }

    #[test]
    fn hash_changes_when_content_changes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"one").unwrap();
        let tree = Node::Dir {
            source_relative: PathBuf::new(),
            target_relative: PathBuf::new(),
            children: vec![Node::File { source_relative: "a".into(), target_relative: "a".into(), size: 3 }],
        };
        let h1 = hash_package(dir.path(), &tree).unwrap();
        std::fs::write(dir.path().join("a"), b"two").unwrap();
        let h2 = hash_package(dir.path(), &tree).unwrap();
        assert_ne!(h1, h2);
    }
}
