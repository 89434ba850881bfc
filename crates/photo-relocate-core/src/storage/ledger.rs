use super::journal::CompletionJournal;
use super::models::*;
use crate::error::Error;
use csv::{ReaderBuilder, Terminator, WriterBuilder};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// The relocation ledger: a CSV table plus its completion journal.
///
/// Rows are loaded once and addressed by [`RowId`]. [`Ledger::mark_complete`]
/// only appends to the journal; [`Ledger::compact`] writes the merged state
/// back into the CSV through a temp file that replaces the ledger.
pub struct Ledger {
    path: PathBuf,
    journal: CompletionJournal,
    rows: Vec<LedgerRow>,
    /// Completions not yet folded into the CSV.
    dirty: bool,
}

/// Streaming writer used during an indexing pass.
pub struct LedgerWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows_written: usize,
}

impl Ledger {
    /// Start a fresh ledger at `path`, discarding any previous ledger and journal.
    pub fn create(path: &Path) -> Result<LedgerWriter, Error> {
        let mut journal = CompletionJournal::for_ledger(path);
        journal.remove()?;
        match fs::remove_file(path) {
            Ok(()) => info!("Removed previous ledger {}", path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        if let Some(parent) = parent_dir(path) {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let mut writer = csv_writer(file);
        writer.write_record(LEDGER_HEADERS)?;
        writer.flush()?;
        debug!("Created ledger {}", path.display());

        Ok(LedgerWriter {
            path: path.to_path_buf(),
            writer,
            rows_written: 0,
        })
    }

    /// Load the ledger and merge any journaled completions into it.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
        let mut rows = Vec::new();
        for record in reader.deserialize::<LedgerRow>() {
            rows.push(record?);
        }

        let journal = CompletionJournal::for_ledger(path);
        let completed = journal.load()?;
        for (line, id) in completed.iter().enumerate() {
            let row = rows.get_mut(id.0).ok_or_else(|| Error::Journal {
                path: journal.path().to_path_buf(),
                line: line + 1,
                content: id.to_string(),
            })?;
            row.relocated = Relocated::Yes;
        }
        if !completed.is_empty() {
            debug!(
                "Merged {} journaled completions into {}",
                completed.len(),
                path.display()
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            journal,
            rows,
            dirty: !completed.is_empty(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: RowId) -> Option<&LedgerRow> {
        self.rows.get(id.0)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = (RowId, &LedgerRow)> {
        self.rows.iter().enumerate().map(|(i, row)| (RowId(i), row))
    }

    /// Ids of rows still waiting for relocation, in ledger order.
    pub fn pending_ids(&self) -> Vec<RowId> {
        self.iter_rows()
            .filter(|(_, row)| !row.is_relocated())
            .map(|(id, _)| id)
            .collect()
    }

    /// Flag a row as relocated. Returns `false` if it already was.
    pub fn mark_complete(&mut self, id: RowId) -> Result<bool, Error> {
        let row = self
            .rows
            .get_mut(id.0)
            .ok_or_else(|| Error::Other(format!("ledger has no row {}", id)))?;
        if row.is_relocated() {
            return Ok(false);
        }
        self.journal.record(id)?;
        row.relocated = Relocated::Yes;
        self.dirty = true;
        Ok(true)
    }

    /// Rewrite the CSV with the merged state and drop the journal.
    pub fn compact(&mut self) -> Result<(), Error> {
        if !self.dirty {
            return Ok(());
        }
        let dir = parent_dir(&self.path).unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        let mut writer = csv_writer(&mut temp);
        writer.write_record(LEDGER_HEADERS)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        drop(writer);
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|err| err.error)?;

        self.journal.remove()?;
        self.dirty = false;
        debug!("Compacted ledger {} ({} rows)", self.path.display(), self.rows.len());
        Ok(())
    }

    pub fn summary(&self) -> LedgerSummary {
        let mut summary = LedgerSummary {
            total_rows: self.rows.len(),
            ..Default::default()
        };
        for row in &self.rows {
            if row.is_relocated() {
                summary.relocated_rows += 1;
            } else {
                summary.pending_rows += 1;
                summary.pending_mb += row.size_mb;
            }
        }
        summary
    }
}

impl LedgerWriter {
    pub fn append_row(&mut self, row: &LedgerRow) -> Result<RowId, Error> {
        self.writer.serialize(row)?;
        let id = RowId(self.rows_written);
        self.rows_written += 1;
        Ok(id)
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush buffered rows to disk.
    pub fn finish(mut self) -> Result<usize, Error> {
        self.writer.flush()?;
        let file = self
            .writer
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))?;
        file.sync_all()?;
        debug!(
            "Wrote {} rows to ledger {}",
            self.rows_written,
            self.path.display()
        );
        Ok(self.rows_written)
    }
}

fn csv_writer<W: Write>(inner: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(inner)
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}
