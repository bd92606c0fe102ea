//! The planner: diffs a scanned package tree against what currently sits
//! in the target tree, producing a dependency-ordered operation list plus
//! whatever conflicts the configured policy didn't resolve away.

pub mod conflict;
pub mod operation;

use std::path::{Path, PathBuf};

use crate::adapters::fs::{EntryKind, Filesystem};
use crate::error::{DotError, Result};
use crate::path::{PackagePath, TargetPath};
use crate::scan::Node;

pub use conflict::{Conflict, ConflictKind, ConflictPolicy};
pub use operation::{Operation, OperationId, OperationIdGen, PlannedOperation};

/// What the planner produced for one package: the operations needed to
/// reconcile the target tree, any conflicts the policy left unresolved
/// (only non-empty when `policy` is [`ConflictPolicy::Skip`], which
/// records what it dropped rather than raising an error), and a list of
/// human-readable warnings worth surfacing even though nothing failed.
pub struct Plan {
    pub operations: Vec<PlannedOperation>,
    pub skipped: Vec<Conflict>,
    pub warnings: Vec<String>,
}

pub struct Planner<'a> {
    fs: &'a dyn Filesystem,
}

impl<'a> Planner<'a> {
    pub fn new(fs: &'a dyn Filesystem) -> Self {
        Self { fs }
    }

    /// Build a plan that reconciles `target_root` with the scanned
    /// `node` tree of `package`.
    pub fn plan(
        &self,
        package: &PackagePath,
        node: &Node,
        target_root: &TargetPath,
        policy: ConflictPolicy,
    ) -> Result<Plan> {
        let mut ids = OperationIdGen::new();
        let mut ops = Vec::new();
        let mut skipped = Vec::new();
        let mut warnings = Vec::new();
        let package_name = package_name(package);

        let Node::Dir { children, .. } = node else {
            return Err(DotError::PathInvalid("scan root must be a directory".to_string()));
        };
        for child in children {
            self.plan_node(child, package.as_path(), &package_name, target_root.as_path(), policy, None, &mut ids, &mut ops, &mut skipped, &mut warnings)?;
        }

        Ok(Plan { operations: ops, skipped, warnings })
    }

    #[allow(clippy::too_many_arguments)]
    fn plan_node(
        &self,
        node: &Node,
        package_root: &Path,
        package_name: &str,
        target_root: &Path,
        policy: ConflictPolicy,
        parent_id: Option<OperationId>,
        ids: &mut OperationIdGen,
        ops: &mut Vec<PlannedOperation>,
        skipped: &mut Vec<Conflict>,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        match node {
            Node::Dir { children, .. } => {
                let target = TargetPath::from_validated(target_root.join(node.target_relative()));
                match self.fs.kind_of(target.as_path())? {
                    EntryKind::Missing => {
                        let id = ids.next();
                        ops.push(PlannedOperation {
                            id,
                            operation: Operation::DirCreate { path: target },
                            depends_on: parent_id.into_iter().collect(),
                        });
                        for child in children {
                            self.plan_node(child, package_root, package_name, target_root, policy, Some(id), ids, ops, skipped, warnings)?;
                        }
                    }
                    EntryKind::Dir => {
                        for child in children {
                            self.plan_node(child, package_root, package_name, target_root, policy, None, ids, ops, skipped, warnings)?;
                        }
                    }
                    EntryKind::File | EntryKind::Symlink => {
                        let current = self.current_at(&target)?;
                        let desired = package_root.join(node.source_relative());
                        let conflict = Conflict { kind: ConflictKind::DirVsFile, target: target.clone(), current, desired, package: package_name.to_string() };
                        if let Some(prep_id) = self.apply_policy(conflict, policy, target_root, parent_id, ids, ops, skipped, warnings)? {
                            let id = ids.next();
                            ops.push(PlannedOperation {
                                id,
                                operation: Operation::DirCreate { path: target },
                                depends_on: vec![prep_id],
                            });
                            for child in children {
                                self.plan_node(child, package_root, package_name, target_root, policy, Some(id), ids, ops, skipped, warnings)?;
                            }
                        }
                    }
                }
            }
            Node::File { .. } | Node::Symlink { .. } => {
                let target = TargetPath::from_validated(target_root.join(node.target_relative()));
                let desired = desired_link_target(node, package_root);

                match self.fs.kind_of(target.as_path())? {
                    EntryKind::Missing => {
                        let id = ids.next();
                        ops.push(PlannedOperation {
                            id,
                            operation: Operation::LinkCreate { link: target, target: desired },
                            depends_on: parent_id.into_iter().collect(),
                        });
                    }
                    EntryKind::Symlink => {
                        let existing = self.fs.read_link(target.as_path())?;
                        if existing == desired {
                            // Already linked correctly; nothing to do.
                        } else {
                            let conflict = Conflict {
                                kind: ConflictKind::LinkVsLink,
                                target: target.clone(),
                                current: existing,
                                desired: desired.clone(),
                                package: package_name.to_string(),
                            };
                            if let Some(prep_id) = self.apply_policy(conflict, policy, target_root, parent_id, ids, ops, skipped, warnings)? {
                                let id = ids.next();
                                ops.push(PlannedOperation {
                                    id,
                                    operation: Operation::LinkCreate { link: target, target: desired },
                                    depends_on: vec![prep_id],
                                });
                            }
                        }
                    }
                    EntryKind::File => {
                        let conflict = Conflict {
                            kind: ConflictKind::LinkVsFile,
                            target: target.clone(),
                            current: target.clone().into_path_buf(),
                            desired: desired.clone(),
                            package: package_name.to_string(),
                        };
                        if let Some(prep_id) = self.apply_policy(conflict, policy, target_root, parent_id, ids, ops, skipped, warnings)? {
                            let id = ids.next();
                            ops.push(PlannedOperation {
                                id,
                                operation: Operation::LinkCreate { link: target, target: desired },
                                depends_on: vec![prep_id],
                            });
                        }
                    }
                    EntryKind::Dir => {
                        // Recursive removal of a real directory is out of
                        // scope for automatic resolution regardless of
                        // policy; always surface it.
                        let conflict = Conflict {
                            kind: ConflictKind::LinkVsDir,
                            target: target.clone(),
                            current: target.into_path_buf(),
                            desired,
                            package: package_name.to_string(),
                        };
                        return Err(DotError::Conflict(Box::new(conflict)));
                    }
                }
            }
        }
        Ok(())
    }

    /// What currently occupies `target`: a symlink's existing destination,
    /// or `target` itself for anything else.
    fn current_at(&self, target: &TargetPath) -> Result<PathBuf> {
        match self.fs.kind_of(target.as_path())? {
            EntryKind::Symlink => self.fs.read_link(target.as_path()),
            _ => Ok(target.clone().into_path_buf()),
        }
    }

    /// Resolve one conflict per `policy`. Returns the id of a prep
    /// operation (backup/delete) the caller's create operation should
    /// depend on, wrapped so that `None` means "don't proceed" (skip or
    /// already resolved with no further action needed). A parent_id, if
    /// present, is still honored as an additional dependency by folding it
    /// into the emitted prep operation.
    #[allow(clippy::too_many_arguments)]
    fn apply_policy(
        &self,
        conflict: Conflict,
        policy: ConflictPolicy,
        target_root: &Path,
        parent_id: Option<OperationId>,
        ids: &mut OperationIdGen,
        ops: &mut Vec<PlannedOperation>,
        skipped: &mut Vec<Conflict>,
        warnings: &mut Vec<String>,
    ) -> Result<Option<OperationId>> {
        match policy {
            ConflictPolicy::Fail => Err(DotError::Conflict(Box::new(conflict))),
            ConflictPolicy::Skip => {
                warnings.push(format!("skipped {}: {}", conflict.target, conflict.suggestion()));
                skipped.push(conflict);
                Ok(None)
            }
            ConflictPolicy::Backup => {
                let target = conflict.target.clone();
                let backup = backup_path(&target, target_root);
                let id = ids.next();
                ops.push(PlannedOperation {
                    id,
                    operation: Operation::FileBackup { path: target, backup },
                    depends_on: parent_id.into_iter().collect(),
                });
                Ok(Some(id))
            }
            ConflictPolicy::Overwrite => {
                let target = conflict.target.clone();
                let id = ids.next();
                let operation = match conflict.kind {
                    ConflictKind::LinkVsLink => Operation::LinkDelete { link: target },
                    _ => Operation::FileDelete { path: target },
                };
                ops.push(PlannedOperation { id, operation, depends_on: parent_id.into_iter().collect() });
                Ok(Some(id))
            }
        }
    }
}

/// Package name used to label conflicts: the package directory's own
/// name, matching [`crate::pipeline::package_name`].
fn package_name(package: &PackagePath) -> String {
    package.as_path().file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| package.to_string())
}

fn desired_link_target(node: &Node, package_root: &Path) -> PathBuf {
    match node {
        Node::File { source_relative, .. } => package_root.join(source_relative),
        Node::Symlink { link_target, .. } => link_target.clone(),
        Node::Dir { .. } => unreachable!("desired_link_target called on a directory node"),
    }
}

/// `<target_root>/.dot-backup/<relative-path>.<UTC-timestamp>`, mirroring
/// the existing path's layout under the backup directory so a deeply
/// nested conflict doesn't collide with one at another path sharing a
/// basename.
fn backup_path(target: &TargetPath, target_root: &Path) -> TargetPath {
    let relative = target.as_path().strip_prefix(target_root).unwrap_or(target.as_path());
    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.fZ");
    let mut name = relative.as_os_str().to_os_string();
    name.push(format!(".{timestamp}"));
    let backup = target_root.join(".dot-backup").join(name);
    TargetPath::from_validated(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fs::MemoryFilesystem;

    fn file_node(name: &str) -> Node {
        Node::File {
            source_relative: PathBuf::from(format!("dot-{name}")),
            target_relative: PathBuf::from(format!(".{name}")),
            size: 4,
        }
    }

    #[test]
    fn creates_link_when_target_missing() {
        let fs = MemoryFilesystem::new();
        let package = PackagePath::new_unchecked("/pkgs/vim");
        let target_root = TargetPath::new_unchecked("/home/u");
        let root = Node::Dir {
            source_relative: PathBuf::new(),
            target_relative: PathBuf::new(),
            children: vec![file_node("vimrc")],
        };

        let planner = Planner::new(&fs);
        let plan = planner.plan(&package, &root, &target_root, ConflictPolicy::Fail).unwrap();
        assert_eq!(plan.operations.len(), 1);
        match &plan.operations[0].operation {
            Operation::LinkCreate { link, target } => {
                assert_eq!(link.as_path(), Path::new("/home/u/.vimrc"));
                assert_eq!(target, Path::new("/pkgs/vim/dot-vimrc"));
            }
            other => panic!("unexpected operation: {other:?}"),
        }
    }

    #[test]
    fn fail_policy_errors_on_existing_file() {
        let fs = MemoryFilesystem::new().with_file("/home/u/.vimrc", b"existing".to_vec());
        let package = PackagePath::new_unchecked("/pkgs/vim");
        let target_root = TargetPath::new_unchecked("/home/u");
        let root = Node::Dir { source_relative: PathBuf::new(), target_relative: PathBuf::new(), children: vec![file_node("vimrc")] };

        let planner = Planner::new(&fs);
        let err = planner.plan(&package, &root, &target_root, ConflictPolicy::Fail).unwrap_err();
        assert!(matches!(err, DotError::Conflict(ref c) if c.kind == ConflictKind::LinkVsFile));
    }

    #[test]
    fn backup_policy_inserts_backup_before_link() {
        let fs = MemoryFilesystem::new().with_file("/home/u/.vimrc", b"existing".to_vec());
        let package = PackagePath::new_unchecked("/pkgs/vim");
        let target_root = TargetPath::new_unchecked("/home/u");
        let root = Node::Dir { source_relative: PathBuf::new(), target_relative: PathBuf::new(), children: vec![file_node("vimrc")] };

        let planner = Planner::new(&fs);
        let plan = planner.plan(&package, &root, &target_root, ConflictPolicy::Backup).unwrap();
        assert_eq!(plan.operations.len(), 2);
        assert!(matches!(plan.operations[0].operation, Operation::FileBackup { .. }));
        assert_eq!(plan.operations[1].depends_on, vec![plan.operations[0].id]);
    }

    #[test]
    fn already_correctly_linked_produces_no_operation() {
        let fs = MemoryFilesystem::new().with_symlink("/home/u/.vimrc", "/pkgs/vim/dot-vimrc");
        let package = PackagePath::new_unchecked("/pkgs/vim");
        let target_root = TargetPath::new_unchecked("/home/u");
        let root = Node::Dir { source_relative: PathBuf::new(), target_relative: PathBuf::new(), children: vec![file_node("vimrc")] };

        let planner = Planner::new(&fs);
        let plan = planner.plan(&package, &root, &target_root, ConflictPolicy::Fail).unwrap();
        assert!(plan.operations.is_empty());
    }

    #[test]
    fn wrong_symlink_target_is_reported_as_link_vs_link() {
        let fs = MemoryFilesystem::new().with_symlink("/home/u/.vimrc", "/pkgs/vim/other-target");
        let package = PackagePath::new_unchecked("/pkgs/vim");
        let target_root = TargetPath::new_unchecked("/home/u");
        let root = Node::Dir { source_relative: PathBuf::new(), target_relative: PathBuf::new(), children: vec![file_node("vimrc")] };

        let planner = Planner::new(&fs);
        let err = planner.plan(&package, &root, &target_root, ConflictPolicy::Fail).unwrap_err();
        let DotError::Conflict(conflict) = err else { panic!("expected conflict") };
        assert_eq!(conflict.kind, ConflictKind::LinkVsLink);
        assert_eq!(conflict.current, PathBuf::from("/pkgs/vim/other-target"));
        assert_eq!(conflict.desired, PathBuf::from("/pkgs/vim/dot-vimrc"));
        assert_eq!(conflict.package, "vim");
    }

    #[test]
    fn skip_policy_records_conflict_without_failing() {
        let fs = MemoryFilesystem::new().with_file("/home/u/.vimrc", b"existing".to_vec());
        let package = PackagePath::new_unchecked("/pkgs/vim");
        let target_root = TargetPath::new_unchecked("/home/u");
        let root = Node::Dir { source_relative: PathBuf::new(), target_relative: PathBuf::new(), children: vec![file_node("vimrc")] };

        let planner = Planner::new(&fs);
        let plan = planner.plan(&package, &root, &target_root, ConflictPolicy::Skip).unwrap();
        assert!(plan.operations.is_empty());
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.warnings.len(), 1);
    }
}
