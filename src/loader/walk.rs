//! Recursive directory walking for definition and enrichment files

use crate::ignore::IgnoreFilter;
use crate::Result;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Collect every file under `dir` accepted by `select`, in sorted order.
///
/// A missing directory yields no files. Entries matched by `filter` are
/// pruned, directories included.
pub fn walk_files<F>(dir: &Path, filter: &IgnoreFilter, select: F) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    if !dir.is_dir() {
        debug!("Skipping missing directory {}", dir.display());
        return Ok(Vec::new());
    }

    let prune = filter.clone();
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entry.depth() == 0 || !prune.is_ignored(entry.path(), is_dir)
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file && select(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_walk_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("controls/b")).unwrap();
        fs::create_dir_all(root.join("controls/a")).unwrap();
        fs::create_dir_all(root.join("controls/.git")).unwrap();
        fs::write(root.join("controls/b/two.yaml"), "id: two").unwrap();
        fs::write(root.join("controls/a/one.yaml"), "id: one").unwrap();
        fs::write(root.join("controls/a/notes.md"), "notes").unwrap();
        fs::write(root.join("controls/.git/config.yaml"), "id: nope").unwrap();

        let filter = IgnoreFilter::new(root, None);
        let files = walk_files(&root.join("controls"), &filter, |p| {
            p.extension().map(|e| e == "yaml").unwrap_or(false)
        })
        .unwrap();

        assert_eq!(
            files,
            vec![root.join("controls/a/one.yaml"), root.join("controls/b/two.yaml")]
        );
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let filter = IgnoreFilter::new(dir.path(), None);
        let files = walk_files(&dir.path().join("absent"), &filter, |_| true).unwrap();
        assert!(files.is_empty());
    }
}
