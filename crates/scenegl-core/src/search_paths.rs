//! Ordered directory search for texture and image files.

use std::path::{Component, Path, PathBuf};

/// Directories searched in order when resolving a file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPaths {
    prefixes: Vec<PathBuf>,
}

impl SearchPaths {
    pub fn new(prefixes: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            prefixes: prefixes.into_iter().collect(),
        }
    }

    pub fn prefixes(&self) -> &[PathBuf] {
        &self.prefixes
    }

    pub fn set(&mut self, prefixes: impl IntoIterator<Item = PathBuf>) {
        self.prefixes = prefixes.into_iter().collect();
    }

    pub fn push(&mut self, prefix: impl Into<PathBuf>) {
        self.prefixes.push(prefix.into());
    }

    /// The first `prefix/name` that exists, or `name` unchanged.
    pub fn resolve(&self, name: impl AsRef<Path>) -> PathBuf {
        let name = name.as_ref();
        self.prefixes
            .iter()
            .map(|prefix| prefix.join(name))
            .find(|candidate| candidate.exists())
            .unwrap_or_else(|| name.to_path_buf())
    }

    /// Resolve, then normalize so equivalent spellings share a cache key.
    pub fn resolve_normalized(&self, name: impl AsRef<Path>) -> PathBuf {
        normalize(&self.resolve(name))
    }
}

/// Lexical normalization: drops `.` segments and folds `dir/..` pairs.
/// Does not touch the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if last_is_normal {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn first_existing_prefix_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join("brick.png"), b"x").unwrap();
        fs::write(first.path().join("sky.png"), b"x").unwrap();
        fs::write(second.path().join("sky.png"), b"x").unwrap();

        let paths = SearchPaths::new([first.path().to_path_buf(), second.path().to_path_buf()]);

        assert_eq!(paths.resolve("brick.png"), second.path().join("brick.png"));
        assert_eq!(paths.resolve("sky.png"), first.path().join("sky.png"));
    }

    #[test]
    fn missing_names_come_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SearchPaths::new([dir.path().to_path_buf()]);
        assert_eq!(paths.resolve("nope/missing.png"), PathBuf::from("nope/missing.png"));
    }

    #[test]
    fn normalization_folds_dots() {
        assert_eq!(
            normalize(Path::new("textures/./walls/../brick.png")),
            PathBuf::from("textures/brick.png")
        );
        assert_eq!(normalize(Path::new("../up.png")), PathBuf::from("../up.png"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }
}
