//! The crate's own configuration: where packages and the manifest live,
//! what conflict policy to default to, and worker counts. Loaded by
//! layered TOML merge the same way the wider corpus's config layer works.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::plan::ConflictPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct DotConfig {
    #[serde(default = "default_general")]
    pub general: GeneralConfig,
    #[serde(default)]
    pub conflict: ConflictConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,
    #[serde(default = "default_package_dir")]
    pub package_dir: PathBuf,
    #[serde(default = "default_manifest_dir")]
    pub manifest_dir: PathBuf,
    /// 0 = let rayon pick (number of logical CPUs).
    #[serde(default)]
    pub worker_threads: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConflictConfig {
    #[serde(default)]
    pub default_policy: ConflictPolicy,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self { default_policy: ConflictPolicy::Fail }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    #[serde(default = "default_large_file_threshold")]
    pub large_file_threshold: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { large_file_threshold: default_large_file_threshold() }
    }
}

fn default_large_file_threshold() -> u64 {
    crate::scan::DEFAULT_LARGE_FILE_THRESHOLD
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").map(PathBuf::from).ok()
}

fn is_root() -> bool {
    unsafe { libc::getuid() == 0 }
}

fn get_xdg_data() -> Option<PathBuf> {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .ok()
        .or_else(|| home_dir().map(|h| h.join(".local/share")))
        .map(|p| p.join("dotwright"))
}

fn get_xdg_state() -> Option<PathBuf> {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .ok()
        .or_else(|| home_dir().map(|h| h.join(".local/state")))
        .map(|p| p.join("dotwright"))
}

fn get_xdg_config() -> Option<PathBuf> {
    if is_root() {
        return None;
    }
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .ok()
        .or_else(|| home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("dotwright/dotwright.toml"))
}

fn default_target_dir() -> PathBuf {
    home_dir().unwrap_or_else(|| PathBuf::from("/root"))
}

fn default_package_dir() -> PathBuf {
    if is_root() {
        PathBuf::from("/var/lib/dotwright/packages")
    } else {
        get_xdg_data().map(|p| p.join("packages")).unwrap_or_else(|| PathBuf::from("/var/lib/dotwright/packages"))
    }
}

fn default_manifest_dir() -> PathBuf {
    if is_root() {
        PathBuf::from("/var/lib/dotwright/manifest")
    } else {
        get_xdg_state().unwrap_or_else(|| PathBuf::from("/var/lib/dotwright/manifest"))
    }
}

fn default_general() -> GeneralConfig {
    GeneralConfig {
        target_dir: default_target_dir(),
        package_dir: default_package_dir(),
        manifest_dir: default_manifest_dir(),
        worker_threads: 0,
    }
}

impl Default for DotConfig {
    fn default() -> Self {
        Self { general: default_general(), conflict: ConflictConfig::default(), scan: ScanConfig::default() }
    }
}

/// Recursively merge two TOML values: for tables, overlay keys win and
/// missing keys are inherited from base; scalars and arrays are replaced
/// wholesale by the overlay value.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    use toml::Value;
    match (base, overlay) {
        (Value::Table(mut base_map), Value::Table(overlay_map)) => {
            for (k, v) in overlay_map {
                let merged = if let Some(base_v) = base_map.remove(&k) { merge_toml(base_v, v) } else { v };
                base_map.insert(k, merged);
            }
            Value::Table(base_map)
        }
        (_, overlay) => overlay,
    }
}

fn load_toml_file(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

impl DotConfig {
    /// Load configuration with layered merging.
    ///
    /// An explicit `path` (`--config`) loads that single file with no
    /// layering. Otherwise layers merge in ascending priority so a
    /// higher-priority file only needs to specify the keys it overrides:
    ///
    ///   1. `/etc/dotwright/dotwright.toml`            (system-wide)
    ///   2. `$XDG_CONFIG_HOME/dotwright/dotwright.toml` (per-user, non-root only)
    ///   3. `./dotwright.toml`                          (project-local)
    ///
    /// A layer that doesn't exist is silently skipped; if none exist,
    /// built-in defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            if !p.exists() {
                return Ok(Self::default());
            }
            return Ok(toml::from_str(&std::fs::read_to_string(p)?)?);
        }

        let mut layers: Vec<PathBuf> = vec![PathBuf::from("/etc/dotwright/dotwright.toml")];
        if let Some(xdg) = get_xdg_config() {
            layers.push(xdg);
        }
        layers.push(PathBuf::from("./dotwright.toml"));

        let mut merged: Option<toml::Value> = None;
        for layer_path in &layers {
            if layer_path.exists() {
                let val = load_toml_file(layer_path)?;
                merged = Some(match merged {
                    Some(base) => merge_toml(base, val),
                    None => val,
                });
            }
        }

        match merged {
            None => Ok(Self::default()),
            // Round-trip the merged value back through TOML text rather
            // than deserializing the `toml::Value` directly, so a bad
            // merge still reports as a plain `toml::de::Error`.
            Some(val) => Ok(toml::from_str(&toml::to_string(&val)?)?),
        }
    }
}
