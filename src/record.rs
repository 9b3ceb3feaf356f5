use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::system::process::ProcessSample;

#[derive(Serialize)]
struct Record<'a> {
    /// Seconds since the Unix epoch when the tick was written.
    timestamp: u64,
    #[serde(flatten)]
    process: &'a ProcessSample,
}

/// Per-tick audit log: one JSON line per visible process, appended after
/// every successful tick while enabled.
pub struct RecordLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl RecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RecordLog {
            path: path.into(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    /// Opens the file for appending, creating parent directories.
    pub fn enable(&mut self) -> io::Result<()> {
        if self.writer.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    pub fn disable(&mut self) -> io::Result<()> {
        match self.writer.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }

    /// Writes one line per row. Returns how many lines were written, 0 when
    /// recording is off.
    pub fn append(&mut self, rows: &[&ProcessSample]) -> io::Result<usize> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(0);
        };
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        for process in rows {
            serde_json::to_writer(&mut *writer, &Record { timestamp, process })?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(rows.len())
    }
}
