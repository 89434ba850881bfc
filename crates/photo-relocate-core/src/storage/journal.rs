use super::models::RowId;
use crate::error::Error;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Append-only log of completed row ids, one decimal id per line.
///
/// Completions land here first so that marking a row costs one short append
/// instead of a rewrite of the whole ledger. The ledger folds the journal in
/// when it is opened and removes it after compaction.
pub struct CompletionJournal {
    path: PathBuf,
    file: Option<File>,
}

impl CompletionJournal {
    pub fn for_ledger(ledger_path: &Path) -> Self {
        let mut name = ledger_path.as_os_str().to_owned();
        name.push(".done");
        Self {
            path: PathBuf::from(name),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every fully written entry. A trailing line without a newline is a
    /// torn write from an interrupted run and is dropped.
    pub fn load(&self) -> Result<Vec<RowId>, Error> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut complete = content.as_str();
        if let Some(torn_start) = content.rfind('\n').map(|i| i + 1) {
            if torn_start < content.len() {
                warn!(
                    "Ignoring partially written entry {:?} in {}",
                    &content[torn_start..],
                    self.path.display()
                );
            }
            complete = &content[..torn_start];
        } else if !content.is_empty() {
            warn!("Ignoring partially written entry in {}", self.path.display());
            complete = "";
        }

        complete
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                line.trim()
                    .parse::<usize>()
                    .map(RowId)
                    .map_err(|_| Error::Journal {
                        path: self.path.clone(),
                        line: i + 1,
                        content: line.to_string(),
                    })
            })
            .collect()
    }

    /// Durably record a completion before returning.
    pub fn record(&mut self, id: RowId) -> io::Result<()> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            self.file = Some(file);
        }
        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{}", id)?;
            file.sync_data()?;
        }
        Ok(())
    }

    pub fn remove(&mut self) -> io::Result<()> {
        self.file = None;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed completion journal {}", self.path.display());
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = CompletionJournal::for_ledger(&dir.path().join("ledger.csv"));
        assert_eq!(journal.path(), dir.path().join("ledger.csv.done"));
        assert!(journal.load().unwrap().is_empty());

        journal.record(RowId(3)).unwrap();
        journal.record(RowId(0)).unwrap();
        assert_eq!(journal.load().unwrap(), vec![RowId(3), RowId(0)]);

        journal.remove().unwrap();
        assert!(!journal.path().exists());
        journal.remove().unwrap();
    }

    #[test]
    fn test_torn_trailing_entry_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let journal = CompletionJournal::for_ledger(&dir.path().join("ledger.csv"));
        fs::write(journal.path(), "1\n2\n1").unwrap();
        assert_eq!(journal.load().unwrap(), vec![RowId(1), RowId(2)]);

        fs::write(journal.path(), "4").unwrap();
        assert!(journal.load().unwrap().is_empty());
    }

    #[test]
    fn test_garbage_line_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let journal = CompletionJournal::for_ledger(&dir.path().join("ledger.csv"));
        fs::write(journal.path(), "1\nabc\n").unwrap();
        match journal.load() {
            Err(Error::Journal { line, content, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(content, "abc");
            }
            other => panic!("expected journal error, got {:?}", other.map(|v| v.len())),
        }
    }
}
