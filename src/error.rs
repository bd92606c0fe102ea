use std::path::PathBuf;

use crate::plan::Conflict;
use crate::plan::OperationId;

#[derive(Debug, thiserror::Error)]
pub enum DotError {
    #[error("path invalid: {0}")]
    PathInvalid(String),

    #[error("path traversal: {0}")]
    PathTraversal(String),

    #[error("package not found: {0}")]
    PackageNotFound(String),

    #[error("package already managed: {0}")]
    PackageAlreadyManaged(String),

    #[error("manifest not found at {0}")]
    ManifestNotFound(PathBuf),

    #[error("manifest corrupt: {0}")]
    ManifestCorrupt(String),

    #[error("conflict at {}: {:?} ({})", .0.target, .0.kind, .0.suggestion())]
    Conflict(Box<Conflict>),

    #[error("cyclic dependency among operations: {0:?}")]
    CyclicDependency(Vec<OperationId>),

    #[error("validation failed for operation {op}: {reason}")]
    ValidationFailed { op: OperationId, reason: String },

    #[error("execution failed for operation {op}: {cause}")]
    ExecutionFailed { op: OperationId, cause: Box<DotError> },

    #[error("rollback failed for operation {op} after execution failure ({execution_cause}): {} rollback error(s) suppressed", rollback_causes.len())]
    RollbackFailed { op: OperationId, execution_cause: Box<DotError>, rollback_causes: Vec<DotError> },

    #[error("invalid ignore pattern at line {0}")]
    IgnorePatternInvalid(usize),

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("bootstrap config invalid: {0}")]
    BootstrapInvalid(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("clone failed: {0}")]
    CloneFailed(String),

    #[error("cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, DotError>;
