use std::path::PathBuf;

use dotwright::adapters::fs::{EntryKind, Filesystem, OsFilesystem};
use dotwright::adapters::logger::NoopLogger;
use dotwright::cancel::Context;
use dotwright::doctor::Doctor;
use dotwright::manifest::{LinkRecord, ManifestStore};
use dotwright::path::{PackagePath, TargetPath};
use dotwright::pipeline::Pipeline;
use dotwright::plan::ConflictPolicy;
use dotwright::scan::prompt::{Batch, LargeFileDecision};

fn pipeline<'a>(fs: &'a OsFilesystem, logger: &'a NoopLogger) -> Pipeline<'a> {
    Pipeline::new(fs, logger, dotwright::scan::DEFAULT_LARGE_FILE_THRESHOLD, Box::new(Batch(LargeFileDecision::Include)))
}

#[test]
fn minimal_manage_creates_links_for_a_fresh_package() {
    let root = tempfile::tempdir().unwrap();
    let package_dir = root.path().join("pkgs").join("vim");
    let target_dir = root.path().join("home");
    std::fs::create_dir_all(&package_dir).unwrap();
    std::fs::create_dir_all(&target_dir).unwrap();
    std::fs::write(package_dir.join("dot-vimrc"), b"set nu").unwrap();

    let fs = OsFilesystem;
    let logger = NoopLogger;
    let p = pipeline(&fs, &logger);

    let package = PackagePath::new(package_dir.clone()).unwrap();
    let target_root = TargetPath::new(target_dir.clone()).unwrap();
    let outcome = p.manage(&package, &target_root, ConflictPolicy::Fail, &Context::new()).unwrap();

    assert_eq!(outcome.applied.len(), 1);
    let link = target_dir.join(".vimrc");
    assert_eq!(fs.kind_of(&link).unwrap(), EntryKind::Symlink);
    assert_eq!(fs.read_link(&link).unwrap(), package_dir.join("dot-vimrc"));
}

#[test]
fn conflict_backup_policy_moves_existing_file_aside() {
    let root = tempfile::tempdir().unwrap();
    let package_dir = root.path().join("pkgs").join("shell");
    let target_dir = root.path().join("home");
    std::fs::create_dir_all(&package_dir).unwrap();
    std::fs::create_dir_all(&target_dir).unwrap();
    std::fs::write(package_dir.join("dot-bashrc"), b"export X=1").unwrap();
    std::fs::write(target_dir.join(".bashrc"), b"# old config").unwrap();

    let fs = OsFilesystem;
    let logger = NoopLogger;
    let p = pipeline(&fs, &logger);

    let package = PackagePath::new(package_dir.clone()).unwrap();
    let target_root = TargetPath::new(target_dir.clone()).unwrap();
    p.manage(&package, &target_root, ConflictPolicy::Backup, &Context::new()).unwrap();

    let link = target_dir.join(".bashrc");
    assert_eq!(fs.kind_of(&link).unwrap(), EntryKind::Symlink);
    let backup_dir = target_dir.join(".dot-backup");
    let backup = std::fs::read_dir(&backup_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.file_name().unwrap().to_string_lossy().starts_with(".bashrc."))
        .expect("backup file present under .dot-backup");
    assert_eq!(std::fs::read(&backup).unwrap(), b"# old config");
}

#[test]
fn validate_phase_catches_a_stale_plan_before_mutating_anything() {
    let root = tempfile::tempdir().unwrap();
    let package_dir = root.path().join("pkgs").join("tools");
    let target_dir = root.path().join("home");
    std::fs::create_dir_all(&package_dir).unwrap();
    std::fs::create_dir_all(&target_dir).unwrap();
    std::fs::write(package_dir.join("dot-a"), b"a").unwrap();
    std::fs::write(package_dir.join("dot-b"), b"b").unwrap();

    let fs = OsFilesystem;
    let package = PackagePath::new(package_dir.clone()).unwrap();
    let target_root = TargetPath::new(target_dir.clone()).unwrap();

    let tree = dotwright::scan::Scanner::new(dotwright::scan::DEFAULT_LARGE_FILE_THRESHOLD, Box::new(Batch(LargeFileDecision::Include)))
        .scan(&package, &Context::new())
        .unwrap();
    let plan = dotwright::plan::Planner::new(&fs).plan(&package, &tree, &target_root, ConflictPolicy::Fail).unwrap();
    let batches = dotwright::sort::sort(&plan.operations).unwrap();
    let by_id: std::collections::HashMap<_, _> = plan.operations.iter().map(|op| (op.id, op)).collect();

    // Sabotage one operation's precondition after planning but before
    // executing, simulating a concurrent change: remove one of the two
    // package source files so its link's source no longer exists and
    // validation (and thus the whole run) fails.
    std::fs::remove_file(package_dir.join("dot-b")).unwrap();

    let executor = dotwright::exec::Executor::new(&fs, &NoopLogger);
    let err = executor.validate(&plan.operations).unwrap_err();
    assert!(matches!(err, dotwright::DotError::ValidationFailed { .. }));
    let _ = batches;
    let _ = by_id;
}

#[test]
fn ignore_inheritance_excludes_matching_files_from_the_plan() {
    let root = tempfile::tempdir().unwrap();
    let package_dir = root.path().join("pkgs").join("build");
    let target_dir = root.path().join("home");
    std::fs::create_dir_all(package_dir.join("sub")).unwrap();
    std::fs::create_dir_all(&target_dir).unwrap();
    std::fs::write(package_dir.join(".dotignore"), "*.log\n").unwrap();
    std::fs::write(package_dir.join("sub").join(".dotignore"), "!keep.log\n").unwrap();
    std::fs::write(package_dir.join("sub").join("keep.log"), b"keep").unwrap();
    std::fs::write(package_dir.join("sub").join("drop.log"), b"drop").unwrap();

    let fs = OsFilesystem;
    let logger = NoopLogger;
    let p = pipeline(&fs, &logger);
    let package = PackagePath::new(package_dir.clone()).unwrap();
    let target_root = TargetPath::new(target_dir.clone()).unwrap();
    let outcome = p.manage(&package, &target_root, ConflictPolicy::Fail, &Context::new()).unwrap();

    assert_eq!(outcome.applied.len(), 2); // sub dir + keep.log link
    assert_eq!(fs.kind_of(&target_dir.join("sub").join("keep.log")).unwrap(), EntryKind::Symlink);
    assert_eq!(fs.kind_of(&target_dir.join("sub").join("drop.log")).unwrap(), EntryKind::Missing);
}

#[test]
fn doctor_reports_missing_and_wrong_target_links() {
    let root = tempfile::tempdir().unwrap();
    let target_dir = root.path().join("home");
    std::fs::create_dir_all(&target_dir).unwrap();
    std::os::unix::fs::symlink(root.path().join("pkgs/vim/dot-vimrc"), target_dir.join(".other")).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = ManifestStore::new(dir.path());
    store
        .record_package(
            "vim",
            PathBuf::from("/pkgs/vim"),
            dotwright::manifest::ManagedSource::Managed,
            vec![
                LinkRecord { target: target_dir.join(".vimrc"), source: PathBuf::from("/pkgs/vim/dot-vimrc") },
                LinkRecord { target: target_dir.join(".other"), source: PathBuf::from("/pkgs/vim/dot-other") },
            ],
            "hash".to_string(),
            std::collections::HashMap::new(),
        )
        .unwrap();

    let fs = OsFilesystem;
    let manifest = store.load().unwrap();
    let doctor = Doctor::new(&fs);
    let issues = doctor.check_manifest(&manifest, 0);

    assert_eq!(issues.len(), 2);
    assert!(issues.iter().any(|i| matches!(i.kind, dotwright::doctor::IssueKind::Missing)));
    assert!(issues.iter().any(|i| matches!(i.kind, dotwright::doctor::IssueKind::WrongTarget { .. })));
}
