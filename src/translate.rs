//! Dotfile translation: the pure, component-wise `dot-X <-> .X` rewrite.

use std::path::{Path, PathBuf};

const PREFIX: &str = "dot-";

/// `translate("dot-vim") == ".vim"`; any other component passes through.
/// Only a *prefix* match counts — `adot-x` is untouched.
pub fn translate(component: &str) -> String {
    match component.strip_prefix(PREFIX) {
        Some(rest) => format!(".{rest}"),
        None => component.to_string(),
    }
}

/// `untranslate(".vim") == "dot-vim"`; any other component passes through.
pub fn untranslate(component: &str) -> String {
    match component.strip_prefix('.') {
        Some(rest) if !rest.is_empty() => format!("{PREFIX}{rest}"),
        _ => component.to_string(),
    }
}

/// Apply [`translate`] to every component of a relative path.
pub fn translate_path(relative: &Path) -> PathBuf {
    relative.iter().map(|c| translate(&c.to_string_lossy())).collect()
}

/// Apply [`untranslate`] to every component of a relative path.
pub fn untranslate_path(relative: &Path) -> PathBuf {
    relative.iter().map(|c| untranslate(&c.to_string_lossy())).collect()
}
