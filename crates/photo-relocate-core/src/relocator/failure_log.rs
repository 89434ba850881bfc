use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Plain-text record of sources that exhausted their retries, one path per
/// line. Only ever appended to.
#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, source: &Path) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", source.display())
    }

    /// Entries recorded so far, oldest first.
    pub fn entries(&self) -> io::Result<Vec<PathBuf>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content
                .lines()
                .filter(|line| !line.is_empty())
                .map(PathBuf::from)
                .collect()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_appends() {
        let dir = tempfile::tempdir().unwrap();
        let log = FailureLog::new(dir.path().join("logs/failed.log"));
        assert!(log.entries().unwrap().is_empty());

        log.record(Path::new("/src/a.jpg")).unwrap();
        log.record(Path::new("/src/b, c.jpg")).unwrap();

        assert_eq!(
            log.entries().unwrap(),
            vec![PathBuf::from("/src/a.jpg"), PathBuf::from("/src/b, c.jpg")]
        );
    }
}
