// src/discovery.rs
//! Source file discovery for codebase indexing.

use crate::config::PRUNE_DIRS;
use crate::lang::Lang;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// All analyzable source files under `root`, in a stable order.
#[must_use]
pub fn discover(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_pruned(entry))
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(Lang::from_ext)
                .is_some()
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn is_pruned(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| PRUNE_DIRS.contains(&name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_python_files_and_prunes_caches() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("a.py"), "x = 1\n").expect("write");
        fs::write(dir.path().join("b.txt"), "not python").expect("write");
        fs::create_dir(dir.path().join("__pycache__")).expect("mkdir");
        fs::write(dir.path().join("__pycache__/c.py"), "x = 1\n").expect("write");

        let files = discover(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.py"));
    }
}
