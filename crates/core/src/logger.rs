//! Line-oriented output sinks.

use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// Somewhere a line of text can be written.
pub trait LineDst: Send + Sync {
    fn write_line(&self, line: &str);

    fn flush(&self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Backend display that forwards every line to `tracing` under target `backend`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDisplay;

impl LineDst for TracingDisplay {
    fn write_line(&self, line: &str) {
        tracing::info!(target: "backend", "{}", line);
    }
}

/// Append-only log file, one timestamped line per call.
///
/// The file is opened on first write so topics that never log leave nothing
/// on disk.
#[derive(Debug)]
pub struct FileLineSink {
    path: PathBuf,
    writer: Mutex<Option<LineWriter<File>>>,
}

impl FileLineSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> std::io::Result<LineWriter<File>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(LineWriter::new(file))
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut guard = self.writer.lock();
        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        if let Some(writer) = guard.as_mut() {
            let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            writeln!(writer, "[{}] {}", stamp, line)?;
        }
        Ok(())
    }
}

impl LineDst for FileLineSink {
    fn write_line(&self, line: &str) {
        if let Err(e) = self.append(line) {
            tracing::warn!("Failed to write log line to {}: {}", self.path.display(), e);
        }
    }

    fn flush(&self) -> std::io::Result<()> {
        match self.writer.lock().as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}
