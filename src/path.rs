//! Typed, validated path wrappers.
//!
//! Every path that flows through the pipeline is tagged by role so a
//! package-relative path can never be accidentally used where a
//! target-rooted path is expected. Construction always goes through
//! [`clean_absolute`], which rejects anything relative or that would
//! escape its own root via `..`.

use std::ops::Deref;
use std::path::{Component, Path, PathBuf};

use crate::error::{DotError, Result};

/// Normalise `path`: resolve `.` and `..` components lexically (no
/// filesystem access, no symlink resolution) and reject the result if it
/// is not absolute or if a `..` component would climb above the root.
fn clean_absolute(path: &Path) -> Result<PathBuf> {
    if !path.is_absolute() {
        return Err(DotError::PathInvalid(format!(
            "{} is not absolute",
            path.display()
        )));
    }

    let mut out = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if out.len() <= 1 {
                    // out[0] is always the RootDir/Prefix anchor; popping
                    // past it means the path escapes the filesystem root.
                    return Err(DotError::PathTraversal(format!(
                        "{} escapes its root",
                        path.display()
                    )));
                }
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }

    let mut cleaned = PathBuf::new();
    for component in out {
        cleaned.push(component.as_os_str());
    }
    Ok(cleaned)
}

macro_rules! typed_path {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(PathBuf);

        impl $name {
            /// Validate and wrap `path`: must be absolute and traversal-free.
            pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
                Ok(Self(clean_absolute(&path.into())?))
            }

            /// Build directly from an already-validated `PathBuf`, skipping
            /// re-validation. Used for paths derived by joining onto a path
            /// that was itself validated (e.g. a scanner relative-path join).
            pub fn from_validated(path: PathBuf) -> Self {
                Self(path)
            }

            pub fn as_path(&self) -> &Path {
                &self.0
            }

            pub fn into_path_buf(self) -> PathBuf {
                self.0
            }

            /// Infallible constructor for tests, where the literal is known
            /// by inspection to be absolute and traversal-free. Kept
            /// separate from `new` so production call sites always go
            /// through validation.
            #[cfg(test)]
            pub fn new_unchecked(path: impl Into<PathBuf>) -> Self {
                Self::new(path).expect("test path must be absolute and traversal-free")
            }
        }

        impl Deref for $name {
            type Target = Path;
            fn deref(&self) -> &Path {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.display())
            }
        }

        impl AsRef<Path> for $name {
            fn as_ref(&self) -> &Path {
                &self.0
            }
        }
    };
}

typed_path!(FilePath, "A path to a file inside a package directory.");
typed_path!(PackagePath, "The root of a single package's source tree.");
typed_path!(TargetPath, "A path inside the destination (target) tree.");
