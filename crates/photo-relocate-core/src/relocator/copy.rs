use filetime::FileTime;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::debug;

/// Stream `source` into `destination` through a fixed-size buffer, creating
/// the destination's parent directories first. Peak memory stays at
/// `buffer_size` no matter how large the file is.
///
/// A leftover destination from an interrupted attempt is replaced even when
/// an earlier metadata copy made it read-only.
pub fn buffered_copy(source: &Path, destination: &Path, buffer_size: usize) -> io::Result<u64> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    remove_stale_destination(destination)?;

    let mut reader = File::open(source)?;
    let mut writer = File::create(destination)?;
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut copied = 0u64;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        writer.write_all(&buffer[..read])?;
        copied += read as u64;
    }

    writer.sync_all()?;
    Ok(copied)
}

fn remove_stale_destination(destination: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(destination) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    if metadata.is_dir() {
        // Left for File::create to reject
        return Ok(());
    }
    let mut permissions = metadata.permissions();
    if metadata.is_file() && permissions.readonly() {
        permissions.set_readonly(false);
        fs::set_permissions(destination, permissions)?;
    }
    debug!("Replacing partial destination {}", destination.display());
    fs::remove_file(destination)
}

/// Copy access/modification times and permissions from `source` onto
/// `destination`. Times go first since a read-only destination may refuse them.
pub fn copy_metadata(source: &Path, destination: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    let atime = FileTime::from_last_access_time(&metadata);
    let mtime = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_times(destination, atime, mtime)?;
    fs::set_permissions(destination, metadata.permissions())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_copy_spans_many_buffers() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("in.bin");
        let destination = dir.path().join("a/b/out.bin");
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&source, &data).unwrap();

        let copied = buffered_copy(&source, &destination, 64).unwrap();
        assert_eq!(copied, 10_000);
        assert_eq!(fs::read(&destination).unwrap(), data);
    }

    #[test]
    fn test_copy_empty_file_and_overwrite() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("empty");
        let destination = dir.path().join("out");
        fs::write(&source, b"").unwrap();
        fs::write(&destination, b"stale bytes").unwrap();

        assert_eq!(buffered_copy(&source, &destination, 0).unwrap(), 0);
        assert!(fs::read(&destination).unwrap().is_empty());
    }

    #[test]
    fn test_read_only_leftover_destination_is_replaced() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("in.jpg");
        let destination = dir.path().join("out.jpg");
        fs::write(&source, b"complete photo").unwrap();
        fs::write(&destination, b"part").unwrap();
        let mut permissions = fs::metadata(&destination).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&destination, permissions).unwrap();

        assert_eq!(buffered_copy(&source, &destination, 4).unwrap(), 14);
        assert_eq!(fs::read(&destination).unwrap(), b"complete photo");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_after_read_only_metadata_copy_can_be_repeated() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let source = dir.path().join("in.jpg");
        let destination = dir.path().join("out.jpg");
        fs::write(&source, b"jpeg").unwrap();
        fs::set_permissions(&source, fs::Permissions::from_mode(0o444)).unwrap();

        buffered_copy(&source, &destination, 16).unwrap();
        copy_metadata(&source, &destination).unwrap();
        assert_eq!(
            fs::metadata(&destination).unwrap().permissions().mode() & 0o777,
            0o444
        );

        buffered_copy(&source, &destination, 16).unwrap();
        copy_metadata(&source, &destination).unwrap();
        assert_eq!(fs::read(&destination).unwrap(), b"jpeg");
    }

    #[test]
    fn test_missing_source_is_not_found() {
        let dir = tempdir().unwrap();
        let err = buffered_copy(&dir.path().join("nope"), &dir.path().join("out"), 16).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_copy_metadata_preserves_mtime() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("in.jpg");
        let destination = dir.path().join("out.jpg");
        fs::write(&source, b"jpeg").unwrap();
        let past = FileTime::from_unix_time(1_500_000_000, 0);
        filetime::set_file_mtime(&source, past).unwrap();

        buffered_copy(&source, &destination, 16).unwrap();
        copy_metadata(&source, &destination).unwrap();

        let copied = fs::metadata(&destination).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&copied), past);
        assert_eq!(
            copied.permissions().readonly(),
            fs::metadata(&source).unwrap().permissions().readonly()
        );
    }
}
