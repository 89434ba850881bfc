use super::filter::EligibilityFilter;
use super::EnumerationPolicy;
use crate::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// An eligible file found under a source root.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// Path relative to the source root it was found under.
    pub relative: PathBuf,
    pub size: u64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WalkStats {
    pub files_found: usize,
    pub files_skipped: usize,
    pub dirs_skipped: usize,
}

/// Pre-order walk of one source root, entries sorted by file name.
///
/// Each eligible regular file is handed to `on_file`. Symlinks are not
/// followed. `prune` (typically the destination root) is never descended
/// into. Unreadable subtrees are skipped or abort the walk according to
/// `policy`; an unreadable root always aborts.
pub fn walk_source_root<F>(
    root: &Path,
    filter: &EligibilityFilter,
    policy: EnumerationPolicy,
    prune: Option<&Path>,
    mut on_file: F,
) -> Result<WalkStats, Error>
where
    F: FnMut(DiscoveredFile) -> Result<(), Error>,
{
    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => {}
        _ => return Err(Error::InvalidSourceRoot(root.to_path_buf())),
    }

    let mut stats = WalkStats::default();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let path = entry.path();
            if prune.is_some_and(|p| p == path) {
                debug!("Not descending into destination root {}", path.display());
                return false;
            }
            if filter.is_ignored(path) {
                debug!("Ignoring directory {}", path.display());
                return false;
            }
            true
        });

    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                if err.depth() == 0 || policy == EnumerationPolicy::Abort {
                    return Err(err.into());
                }
                warn!(
                    "Skipping unreadable path {}: {}",
                    err.path().map(|p| p.display().to_string()).unwrap_or_default(),
                    err
                );
                stats.dirs_skipped += 1;
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        let path = entry.path();
        if file_type.is_symlink() {
            debug!("Skipping symlink: {}", path.display());
            stats.files_skipped += 1;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }
        if !filter.is_eligible(path) {
            debug!("Skipping not-media file: {}", path.display());
            stats.files_skipped += 1;
            continue;
        }

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                if policy == EnumerationPolicy::Abort {
                    return Err(err.into());
                }
                warn!("Skipping {}: {}", path.display(), err);
                stats.files_skipped += 1;
                continue;
            }
        };

        let relative = path
            .strip_prefix(root)
            .map_err(|e| Error::Other(format!("{} is not under {}: {}", path.display(), root.display(), e)))?
            .to_path_buf();

        stats.files_found += 1;
        on_file(DiscoveredFile {
            path: path.to_path_buf(),
            relative,
            size,
        })?;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn collect(root: &Path, filter: &EligibilityFilter) -> (Vec<PathBuf>, WalkStats) {
        let mut found = Vec::new();
        let stats = walk_source_root(root, filter, EnumerationPolicy::Skip, None, |file| {
            found.push(file.relative);
            Ok(())
        })
        .unwrap();
        (found, stats)
    }

    #[test]
    fn test_walk_is_preorder_and_sorted() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("b_album")).unwrap();
        fs::create_dir_all(root.join("a_album/inner")).unwrap();
        fs::write(root.join("z.jpg"), "z").unwrap();
        fs::write(root.join("b_album/2.jpg"), "2").unwrap();
        fs::write(root.join("a_album/1.jpg"), "1").unwrap();
        fs::write(root.join("a_album/inner/0.jpg"), "0").unwrap();
        fs::write(root.join("a_album/meta.json"), "{}").unwrap();

        let filter = EligibilityFilter::new(&["json"], &[]);
        let (found, stats) = collect(root, &filter);
        assert_eq!(
            found,
            vec![
                PathBuf::from("a_album/1.jpg"),
                PathBuf::from("a_album/inner/0.jpg"),
                PathBuf::from("b_album/2.jpg"),
                PathBuf::from("z.jpg"),
            ]
        );
        assert_eq!(stats.files_found, 4);
        assert_eq!(stats.files_skipped, 1);
    }

    #[test]
    fn test_prune_and_ignored_directories_are_not_walked() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("out")).unwrap();
        fs::create_dir_all(root.join("Trash")).unwrap();
        fs::write(root.join("out/copied.jpg"), "c").unwrap();
        fs::write(root.join("Trash/old.jpg"), "o").unwrap();
        fs::write(root.join("keep.jpg"), "k").unwrap();

        let filter = EligibilityFilter::new(&[], &["*/Trash"]);
        let out = root.join("out");
        let mut found = Vec::new();
        walk_source_root(root, &filter, EnumerationPolicy::Skip, Some(&out), |file| {
            found.push(file.relative);
            Ok(())
        })
        .unwrap();
        assert_eq!(found, vec![PathBuf::from("keep.jpg")]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let tmp = tempdir().unwrap();
        let filter = EligibilityFilter::default();
        let missing = tmp.path().join("nope");
        let result = walk_source_root(&missing, &filter, EnumerationPolicy::Skip, None, |_| Ok(()));
        assert!(matches!(result, Err(Error::InvalidSourceRoot(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_follows_policy() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let root = tmp.path();
        let locked = root.join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("hidden.jpg"), "h").unwrap();
        fs::write(root.join("open.jpg"), "o").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read the directory regardless of its mode
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let filter = EligibilityFilter::default();
        let (found, stats) = collect(root, &filter);
        assert_eq!(found, vec![PathBuf::from("open.jpg")]);
        assert_eq!(stats.dirs_skipped, 1);

        let aborted = walk_source_root(root, &filter, EnumerationPolicy::Abort, None, |_| Ok(()));
        assert!(matches!(aborted, Err(Error::Walk(_))));

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }
}
