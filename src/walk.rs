//! Recursive discovery of markup files.
//!
//! Order follows `walkdir`'s natural traversal order; nothing is sorted, so
//! the "last file" seen by the runner is whatever the filesystem yields last.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
#[error("failed to walk {}: {source}", path.display())]
pub struct WalkError {
    pub path: PathBuf,
    #[source]
    pub source: walkdir::Error,
}

/// Every regular file beneath `root`, recursively.
///
/// Symlinks to files are yielded; symlinked directories are not descended
/// into. A root that does not exist yields nothing.
pub fn walk_files(root: &Path) -> impl Iterator<Item = Result<PathBuf, WalkError>> {
    let exists = root.exists();
    let root_path = root.to_path_buf();
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter(move |_| exists)
        .filter_map(move |entry| match entry {
            Ok(entry) if is_file(&entry) => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(source) => Some(Err(WalkError {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root_path.clone()),
                source,
            })),
        })
}

fn is_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}

/// Case-sensitive extension check; `extension` may carry a leading dot.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    path.extension().and_then(|ext| ext.to_str()) == Some(wanted)
}

/// [`walk_files`] restricted to files with the given extension.
pub fn markup_files<'a>(
    root: &Path,
    extension: &'a str,
) -> impl Iterator<Item = Result<PathBuf, WalkError>> + 'a {
    walk_files(root).filter(move |entry| match entry {
        Ok(path) => has_extension(path, extension),
        Err(_) => true,
    })
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match home::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
