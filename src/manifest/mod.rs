//! The manifest store: a JSON record of which packages are managed, what
//! links each one owns, and what it hashed to last time — so `doctor` can
//! spot orphans and `remanage` can skip packages that haven't changed.

pub mod hash;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DotError, Result};

const MANIFEST_FILE: &str = ".dot-manifest.json";
const MANIFEST_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecord {
    pub target: PathBuf,
    pub source: PathBuf,
}

/// How a package came to be managed: a normal `manage` run, or a single
/// file moved in via `adopt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManagedSource {
    Managed,
    Adopted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub package: String,
    pub package_dir: PathBuf,
    pub source: ManagedSource,
    pub link_count: usize,
    pub links: Vec<LinkRecord>,
    pub package_hash: String,
    pub managed_at: DateTime<Utc>,
    /// Original path to backup path, for every file a conflict-`backup`
    /// policy moved aside while managing this package.
    #[serde(default)]
    pub backups: HashMap<PathBuf, PathBuf>,
}

/// Doctor-related manifest state that persists across runs: links an
/// operator has told `doctor` to stop flagging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorSection {
    #[serde(default)]
    pub ignored_links: Vec<PathBuf>,
    #[serde(default)]
    pub ignored_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub updated_at: DateTime<Utc>,
    pub packages: HashMap<String, ManifestEntry>,
    /// Index of each managed package's last hash, mirroring
    /// `packages[name].package_hash`, kept alongside it so a freshness
    /// check doesn't need to pull the full entry.
    #[serde(default)]
    pub hashes: HashMap<String, String>,
    #[serde(default)]
    pub doctor: DoctorSection,
}

impl Default for Manifest {
    fn default() -> Self {
        Self { version: MANIFEST_VERSION.to_string(), updated_at: Utc::now(), packages: HashMap::new(), hashes: HashMap::new(), doctor: DoctorSection::default() }
    }
}

impl Manifest {
    pub fn is_managed(&self, package: &str) -> bool {
        self.packages.contains_key(package)
    }

    pub fn all_links(&self) -> impl Iterator<Item = &LinkRecord> {
        self.packages.values().flat_map(|entry| entry.links.iter())
    }
}

pub struct ManifestStore {
    dir: PathBuf,
}

impl ManifestStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Load the manifest. A missing file is an empty manifest, not an
    /// error — the first `manage` run on a fresh target has nothing to
    /// load yet.
    pub fn load(&self) -> Result<Manifest> {
        match std::fs::read_to_string(self.path()) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| DotError::ManifestCorrupt(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Manifest::default()),
            Err(e) => Err(DotError::Io(e)),
        }
    }

    /// Write `manifest` atomically: serialize to a temp file in the same
    /// directory, then rename into place, so a crash mid-write never
    /// leaves a truncated manifest on disk.
    pub fn save(&self, manifest: &Manifest) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(manifest)?;
        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        std::fs::write(tmp.path(), json.as_bytes())?;
        tmp.persist(self.path()).map_err(|e| DotError::Io(e.error))?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_package(
        &self,
        package: &str,
        package_dir: PathBuf,
        source: ManagedSource,
        links: Vec<LinkRecord>,
        package_hash: String,
        backups: HashMap<PathBuf, PathBuf>,
    ) -> Result<()> {
        let mut manifest = self.load()?;
        let link_count = links.len();
        manifest.hashes.insert(package.to_string(), package_hash.clone());
        manifest.packages.insert(
            package.to_string(),
            ManifestEntry { package: package.to_string(), package_dir, source, link_count, links, package_hash, managed_at: Utc::now(), backups },
        );
        manifest.version = MANIFEST_VERSION.to_string();
        manifest.updated_at = Utc::now();
        self.save(&manifest)
    }

    pub fn remove_package(&self, package: &str) -> Result<Option<ManifestEntry>> {
        let mut manifest = self.load()?;
        let removed = manifest.packages.remove(package);
        manifest.hashes.remove(package);
        manifest.updated_at = Utc::now();
        self.save(&manifest)?;
        Ok(removed)
    }
}

/// Helper for [`crate::doctor`]: every target path currently recorded as
/// owned by some managed package.
pub fn managed_targets(manifest: &Manifest) -> std::collections::HashSet<&Path> {
    manifest.all_links().map(|l| l.target.as_path()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_manifest_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        let manifest = store.load().unwrap();
        assert!(manifest.packages.is_empty());
        assert_eq!(manifest.version, MANIFEST_VERSION);
    }

    #[test]
    fn record_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        store
            .record_package(
                "vim",
                "/pkgs/vim".into(),
                ManagedSource::Managed,
                vec![LinkRecord { target: "/home/u/.vimrc".into(), source: "/pkgs/vim/dot-vimrc".into() }],
                "deadbeef".to_string(),
                HashMap::new(),
            )
            .unwrap();

        let manifest = store.load().unwrap();
        assert!(manifest.is_managed("vim"));
        assert_eq!(manifest.packages["vim"].package_hash, "deadbeef");
        assert_eq!(manifest.packages["vim"].link_count, 1);
        assert_eq!(manifest.packages["vim"].source, ManagedSource::Managed);
        assert_eq!(manifest.hashes["vim"], "deadbeef");
    }

    #[test]
    fn corrupt_manifest_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), b"{not json").unwrap();
        let store = ManifestStore::new(dir.path());
        let err = store.load().unwrap_err();
        assert!(matches!(err, DotError::ManifestCorrupt(_)));
    }

    #[test]
    fn remove_package_drops_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        store.record_package("vim", "/pkgs/vim".into(), ManagedSource::Managed, vec![], "h1".to_string(), HashMap::new()).unwrap();
        let removed = store.remove_package("vim").unwrap();
        assert!(removed.is_some());
        assert!(!store.load().unwrap().is_managed("vim"));
        assert!(!store.load().unwrap().hashes.contains_key("vim"));
    }
}
