//! Bootstrap configuration: a YAML manifest of packages and the profiles
//! that select among them, for setting up a fresh machine in one command.
//! Deliberately a separate format (and crate, `serde_yaml`) from the TOML
//! config in [`crate::config`] — the bootstrap file is meant to be checked
//! into a dotfiles repo and read by humans first, machine-loaded second.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{DotError, Result};
use crate::plan::ConflictPolicy;

const VALID_PLATFORMS: &[&str] = &["linux", "darwin", "windows", "freebsd"];
const VALID_POLICIES: &[&str] = &["fail", "backup", "overwrite", "skip"];

#[derive(Debug, Clone, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    /// Whether bootstrapping should abort if this package is missing from
    /// the package directory. Non-required packages are silently skipped.
    #[serde(default)]
    pub required: bool,
    /// Platform identifiers this package applies to. Empty means every
    /// platform.
    #[serde(default)]
    pub platform: Vec<String>,
    /// Overrides `defaults.on_conflict` for this package alone.
    #[serde(default)]
    pub on_conflict: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub description: Option<String>,
    /// Names of packages from the top-level `packages` list this profile
    /// selects.
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub on_conflict: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    pub version: String,
    #[serde(default)]
    pub repo: Option<String>,
    pub packages: Vec<PackageSpec>,
    pub profiles: HashMap<String, Profile>,
    #[serde(default)]
    pub defaults: Defaults,
}

/// A package resolved from a profile for the current platform, with its
/// conflict policy already settled (package override, else `defaults`,
/// else whatever the caller falls back to).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedPackage {
    pub name: String,
    pub required: bool,
    pub on_conflict: ConflictPolicy,
}

pub fn current_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "darwin"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "freebsd") {
        "freebsd"
    } else {
        "other"
    }
}

fn parse_policy(s: &str) -> Option<ConflictPolicy> {
    match s {
        "fail" => Some(ConflictPolicy::Fail),
        "backup" => Some(ConflictPolicy::Backup),
        "overwrite" => Some(ConflictPolicy::Overwrite),
        "skip" => Some(ConflictPolicy::Skip),
        _ => None,
    }
}

pub fn load(path: &Path) -> Result<BootstrapConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: BootstrapConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Validate a bootstrap file against every rule the schema imposes: a
/// file that parses as YAML but is otherwise nonsensical is still
/// rejected before it reaches the pipeline.
pub fn validate(config: &BootstrapConfig) -> Result<()> {
    if config.version.trim().is_empty() {
        return Err(DotError::BootstrapInvalid("version is required".to_string()));
    }

    let mut seen_names = std::collections::HashSet::new();
    for package in &config.packages {
        if package.name.trim().is_empty() {
            return Err(DotError::BootstrapInvalid("package has an empty name".to_string()));
        }
        if !seen_names.insert(package.name.as_str()) {
            return Err(DotError::BootstrapInvalid(format!("package name '{}' is duplicated", package.name)));
        }
        for platform in &package.platform {
            if !VALID_PLATFORMS.contains(&platform.as_str()) {
                return Err(DotError::BootstrapInvalid(format!(
                    "package '{}' has unknown platform '{platform}' (expected one of {VALID_PLATFORMS:?})",
                    package.name
                )));
            }
        }
        if let Some(policy) = &package.on_conflict {
            if !VALID_POLICIES.contains(&policy.as_str()) {
                return Err(DotError::BootstrapInvalid(format!(
                    "package '{}' has unknown on_conflict '{policy}' (expected one of {VALID_POLICIES:?})",
                    package.name
                )));
            }
        }
    }

    for (profile_name, profile) in &config.profiles {
        for package_name in &profile.packages {
            if !seen_names.contains(package_name.as_str()) {
                return Err(DotError::BootstrapInvalid(format!(
                    "profile '{profile_name}' references unknown package '{package_name}'"
                )));
            }
        }
    }

    if let Some(policy) = &config.defaults.on_conflict {
        if !VALID_POLICIES.contains(&policy.as_str()) {
            return Err(DotError::BootstrapInvalid(format!(
                "defaults.on_conflict has unknown value '{policy}' (expected one of {VALID_POLICIES:?})"
            )));
        }
    }
    if let Some(profile_name) = &config.defaults.profile {
        if !config.profiles.contains_key(profile_name) {
            return Err(DotError::BootstrapInvalid(format!("defaults.profile '{profile_name}' is not a defined profile")));
        }
    }

    Ok(())
}

/// The packages a profile resolves to on the current platform, each with
/// its conflict policy settled: the package's own `on_conflict` if set,
/// else `defaults.on_conflict`, else `fallback_policy`.
pub fn select_packages(config: &BootstrapConfig, profile_name: &str, fallback_policy: ConflictPolicy) -> Result<Vec<SelectedPackage>> {
    let profile = config.profiles.get(profile_name).ok_or_else(|| DotError::ProfileNotFound(profile_name.to_string()))?;
    let platform = current_platform();
    let by_name: HashMap<&str, &PackageSpec> = config.packages.iter().map(|p| (p.name.as_str(), p)).collect();
    let default_policy = config.defaults.on_conflict.as_deref().and_then(parse_policy).unwrap_or(fallback_policy);

    Ok(profile
        .packages
        .iter()
        .filter_map(|name| by_name.get(name.as_str()).copied())
        .filter(|p| p.platform.is_empty() || p.platform.iter().any(|pl| pl == platform))
        .map(|p| SelectedPackage {
            name: p.name.clone(),
            required: p.required,
            on_conflict: p.on_conflict.as_deref().and_then(parse_policy).unwrap_or(default_policy),
        })
        .collect())
}

/// Clone `url` into `dest` via the system `git` binary. Distinguishes an
/// authentication failure (bad key, no access) from any other clone
/// failure by sniffing git's stderr, since both are plausible first-run
/// failure modes worth reporting differently.
pub fn clone_repo(url: &str, dest: &Path) -> Result<()> {
    let output = std::process::Command::new("git")
        .arg("clone")
        .arg(url)
        .arg(dest)
        .output()
        .map_err(|e| DotError::CloneFailed(e.to_string()))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("Permission denied") || stderr.contains("Authentication failed") || stderr.contains("could not read Username") {
        return Err(DotError::AuthFailed(stderr.trim().to_string()));
    }
    Err(DotError::CloneFailed(stderr.trim().to_string()))
}
