//! Table engine: one flat file per table, one packed record per line.
//!
//! A row id is the 0-based line number of its record. The engine keeps the
//! row count in memory (it is also the next id to hand out) and guards it
//! with a reader/writer lock that is held for the whole of every operation:
//!
//! **select**: shared lock, stream the file up to the requested line
//! **insert**: exclusive lock, append one line
//! **update**: exclusive lock, then one of two strategies:
//!   - fewer rows than `max_rows_in_memory`: read all lines, replace one,
//!     rewrite the file
//!   - otherwise: stream into `<table>_$tmp` substituting one line, then
//!     atomically rename it over the table file
//!
//! Any disagreement between the tracked row count and the lines physically
//! present is reported as `TableError::Corrupted`; no repair is attempted.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::codec::{self, LINE_SEPARATOR};
use crate::config::Config;
use crate::error::{TableError, TableResult};
use crate::platform_durability::{durable_sync, sync_dir};

/// Zero-based line offset of a record within its table file
pub type RowId = u64;

/// Suffix of the temporary file written by a streaming rebuild
pub const TMP_SUFFIX: &str = "_$tmp";

/// A single table file and its row counter.
///
/// All public methods take `&self`; share it across threads behind an `Arc`.
pub struct TableFile {
    name: String,
    path: PathBuf,
    tmp_path: PathBuf,
    max_rows_in_memory: u64,
    sync_writes: bool,
    /// Number of lines in the file. Only read or changed under this lock.
    rows: RwLock<RowId>,
}

impl TableFile {
    /// Open the table `name` inside `config.location`, creating an empty file
    /// (and missing directories) when absent.
    ///
    /// An existing file is not validated; its lines are only counted. A last
    /// line without a terminator counts as a row and gets one appended, so
    /// the next insert starts on a line of its own.
    pub fn open(name: &str, config: &Config) -> TableResult<Self> {
        let path = config.table_path(name);
        let tmp_path = tmp_path_for(&path);

        fs::create_dir_all(&config.location).map_err(|e| {
            TableError::io(&config.location, "Failed to create storage directory", e)
        })?;

        match fs::remove_file(&tmp_path) {
            Ok(()) => warn!(table = name, path = %tmp_path.display(), "removed stale rebuild file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(TableError::io(&tmp_path, "Failed to remove stale rebuild file", e)),
        }

        let rows = match fs::metadata(&path) {
            Ok(_) => {
                let (rows, terminated) = count_lines(&path)?;
                if !terminated {
                    terminate_last_line(&path)?;
                    warn!(table = name, path = %path.display(), "terminated unfinished last line");
                }
                info!(table = name, path = %path.display(), rows, "opened existing table file");
                rows
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|e| TableError::io(&path, "Failed to create table file", e))?;
                info!(table = name, path = %path.display(), "created table file");
                0
            }
            Err(e) => return Err(TableError::io(&path, "Failed to stat table file", e)),
        };

        Ok(Self {
            name: name.to_string(),
            path,
            tmp_path,
            max_rows_in_memory: config.max_rows_in_memory,
            sync_writes: config.sync_writes,
            rows: RwLock::new(rows),
        })
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current number of rows (also the id the next insert will receive).
    pub fn row_count(&self) -> RowId {
        *self.rows.read()
    }

    /// Append a record and return its row id.
    pub fn insert<S: AsRef<str>>(&self, fields: &[S]) -> TableResult<RowId> {
        let mut rows = self.rows.write();
        let mut line = codec::encode(fields);
        line.push_str(LINE_SEPARATOR);

        self.append(&line).inspect_err(|e| self.report("insert", e))?;

        let row_id = *rows;
        *rows += 1;
        debug!(table = %self.name, row_id, "inserted row");
        Ok(row_id)
    }

    /// Read and decode the record at `row_id`.
    pub fn select(&self, row_id: RowId) -> TableResult<Vec<String>> {
        let rows = self.rows.read();
        self.check_row(row_id, *rows)?;
        self.read_row(row_id).inspect_err(|e| self.report("select", e))
    }

    /// Replace the whole record at `row_id`.
    pub fn update<S: AsRef<str>>(&self, row_id: RowId, fields: &[S]) -> TableResult<()> {
        let rows = self.rows.write();
        self.check_row(row_id, *rows)?;
        let line = codec::encode(fields);

        let result = if *rows < self.max_rows_in_memory {
            debug!(table = %self.name, row_id, rows = *rows, "updating row in memory");
            self.rewrite_in_memory(row_id, *rows, &line)
        } else {
            debug!(table = %self.name, row_id, rows = *rows, "updating row through rebuild file");
            self.rebuild_streaming(row_id, *rows, &line)
        };
        result.inspect_err(|e| self.report("update", e))
    }

    fn check_row(&self, row_id: RowId, rows: RowId) -> TableResult<()> {
        if row_id >= rows {
            return Err(TableError::RowNotFound { table: self.name.clone(), row_id });
        }
        Ok(())
    }

    fn append(&self, line: &str) -> TableResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| TableError::io(&self.path, "Failed to open table file for append", e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| TableError::io(&self.path, "Table append failed", e))?;
        if self.sync_writes {
            durable_sync(&file).map_err(|e| TableError::io(&self.path, "Table durable_sync failed", e))?;
        }
        Ok(())
    }

    fn read_row(&self, row_id: RowId) -> TableResult<Vec<String>> {
        let read_err = |e| TableError::io(&self.path, "Table read failed", e);
        let mut reader = LineReader::open(&self.path).map_err(read_err)?;

        for _ in 0..row_id {
            if reader.next_line().map_err(read_err)?.is_none() {
                return Err(self.corrupted(format!("file ends before row {}", row_id)));
            }
        }
        let line = reader
            .next_line()
            .map_err(read_err)?
            .ok_or_else(|| self.corrupted(format!("file ends before row {}", row_id)))?;
        let text = std::str::from_utf8(line)
            .map_err(|_| self.corrupted(format!("row {} is not valid UTF-8", row_id)))?;
        Ok(codec::decode(text))
    }

    fn rewrite_in_memory(&self, row_id: RowId, rows: RowId, line: &str) -> TableResult<()> {
        let content = fs::read(&self.path)
            .map_err(|e| TableError::io(&self.path, "Failed to read table file", e))?;
        let mut lines = split_lines(&content);
        if lines.len() as u64 != rows {
            return Err(self.corrupted(format!("expected {} lines, found {}", rows, lines.len())));
        }
        lines[row_id as usize] = line.as_bytes();

        let mut out = Vec::with_capacity(content.len() + line.len());
        for l in &lines {
            out.extend_from_slice(l);
            out.extend_from_slice(LINE_SEPARATOR.as_bytes());
        }

        let write_err = |e| TableError::io(&self.path, "Failed to rewrite table file", e);
        let mut file = File::create(&self.path).map_err(write_err)?;
        file.write_all(&out).map_err(write_err)?;
        if self.sync_writes {
            durable_sync(&file).map_err(write_err)?;
        }
        Ok(())
    }

    /// Streaming rebuild with the atomic rename pattern:
    /// 1. Copy lines into the rebuild file, substituting `row_id`
    /// 2. durable_sync the rebuild file
    /// 3. Rename it over the table file
    /// 4. Sync the directory so the rename is persisted
    ///
    /// The rebuild file is removed if any step before the rename fails. Once
    /// the rename succeeds the update has taken effect, so a failed directory
    /// sync is logged instead of returned.
    fn rebuild_streaming(&self, row_id: RowId, rows: RowId, line: &str) -> TableResult<()> {
        let built = self.write_rebuild_file(row_id, rows, line).and_then(|()| {
            fs::rename(&self.tmp_path, &self.path)
                .map_err(|e| TableError::io(&self.path, "Failed to replace table file", e))
        });
        if let Err(e) = built {
            if let Err(rm) = fs::remove_file(&self.tmp_path) {
                if rm.kind() != io::ErrorKind::NotFound {
                    warn!(table = %self.name, path = %self.tmp_path.display(), error = %rm,
                          "failed to remove rebuild file");
                }
            }
            return Err(e);
        }

        self.sync_table_dir();
        Ok(())
    }

    fn sync_table_dir(&self) {
        let Some(dir) = self.path.parent() else {
            return;
        };
        if let Err(e) = sync_dir(dir) {
            warn!(table = %self.name, path = %dir.display(), error = %e,
                  "failed to sync table directory after rebuild");
        }
    }

    fn write_rebuild_file(&self, row_id: RowId, rows: RowId, line: &str) -> TableResult<()> {
        let read_err = |e| TableError::io(&self.path, "Table read failed", e);
        let write_err = |e| TableError::io(&self.tmp_path, "Rebuild file write failed", e);

        let mut reader = LineReader::open(&self.path).map_err(read_err)?;
        let mut writer = BufWriter::new(File::create(&self.tmp_path).map_err(write_err)?);

        self.copy_lines(&mut reader, &mut writer, row_id)?;

        if reader.next_line().map_err(read_err)?.is_none() {
            return Err(self.corrupted(format!("file ends before row {}", row_id)));
        }
        writer.write_all(line.as_bytes()).map_err(write_err)?;
        writer.write_all(LINE_SEPARATOR.as_bytes()).map_err(write_err)?;

        self.copy_lines(&mut reader, &mut writer, rows - row_id - 1)?;

        if reader.next_line().map_err(read_err)?.is_some() {
            return Err(self.corrupted(format!("file holds more than {} lines", rows)));
        }

        let file = writer.into_inner().map_err(|e| write_err(e.into_error()))?;
        durable_sync(&file).map_err(write_err)
    }

    fn copy_lines(&self, reader: &mut LineReader, writer: &mut impl Write, count: u64) -> TableResult<()> {
        for _ in 0..count {
            let line = reader
                .next_line()
                .map_err(|e| TableError::io(&self.path, "Table read failed", e))?
                .ok_or_else(|| self.corrupted("file ends before the tracked row count".to_string()))?;
            writer
                .write_all(line)
                .and_then(|()| writer.write_all(LINE_SEPARATOR.as_bytes()))
                .map_err(|e| TableError::io(&self.tmp_path, "Rebuild file write failed", e))?;
        }
        Ok(())
    }

    fn corrupted(&self, reason: String) -> TableError {
        TableError::Corrupted {
            table: self.name.clone(),
            path: self.path.clone(),
            reason,
        }
    }

    fn report(&self, op: &str, err: &TableError) {
        match err {
            TableError::Io { .. } | TableError::Corrupted { .. } => {
                error!(table = %self.name, op, error = %err, "table operation failed");
            }
            _ => debug!(table = %self.name, op, error = %err, "table operation rejected"),
        }
    }
}

impl std::fmt::Debug for TableFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableFile")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("rows", &self.row_count())
            .finish()
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

/// Count lines the way `LineReader` yields them: an unterminated trailing
/// fragment counts as a line. Also reports whether the file is empty or ends
/// with a line terminator.
fn count_lines(path: &Path) -> TableResult<(RowId, bool)> {
    let read_err = |e| TableError::io(path, "Failed to count table lines", e);
    let mut reader = LineReader::open(path).map_err(read_err)?;
    let mut rows = 0;
    while reader.next_line().map_err(read_err)?.is_some() {
        rows += 1;
    }
    Ok((rows, reader.terminated))
}

fn terminate_last_line(path: &Path) -> TableResult<()> {
    let write_err = |e| TableError::io(path, "Failed to terminate last line", e);
    let mut file = OpenOptions::new().append(true).open(path).map_err(write_err)?;
    file.write_all(LINE_SEPARATOR.as_bytes()).map_err(write_err)
}

/// Split file contents into lines with the same rules as `LineReader`.
fn split_lines(content: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut rest = content;
    while !rest.is_empty() {
        match rest.iter().position(|&b| b == b'\n') {
            Some(end) => {
                lines.push(strip_cr(&rest[..end]));
                rest = &rest[end + 1..];
            }
            None => {
                lines.push(rest);
                rest = &[];
            }
        }
    }
    lines
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Buffered line reader over a table file that reuses one line buffer.
struct LineReader {
    inner: BufReader<File>,
    buf: Vec<u8>,
    /// False once a line without a terminator has been read
    terminated: bool,
}

impl LineReader {
    fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            inner: BufReader::new(File::open(path)?),
            buf: Vec::new(),
            terminated: true,
        })
    }

    /// Next line without its terminator, `None` at end of file.
    fn next_line(&mut self) -> io::Result<Option<&[u8]>> {
        self.buf.clear();
        if self.inner.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.terminated = self.buf.last() == Some(&b'\n');
        if self.terminated {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(self.buf.as_slice()))
    }
}
