//! Size-based rotation shared by the rotating and compressing file sinks

use crate::core::{diagnostics, LoggerError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// History path for `index`: `app.log` becomes `app.1.log`, `app` becomes `app.1`
pub fn rotated_path(base: &Path, index: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string());
    let name = match base.extension() {
        Some(ext) => format!("{}.{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}.{}", stem, index),
    };
    base.with_file_name(name)
}

/// `path` with `suffix` appended to the file name (`app.1.log` + `.gz`)
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Rename `from` over `to`, removing `to` first on platforms where rename
/// refuses to replace
fn replace(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    remove_if_exists(to)?;
    fs::rename(from, to)
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata()?.len();
    Ok((file, size))
}

/// Active file plus `.1` to `.max_files` history
pub(crate) struct RotatingWriter {
    base: PathBuf,
    max_size: u64,
    max_files: usize,
    /// Extra variants carried through the shift (".gz", ".zst")
    suffixes: Vec<String>,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    rotations: u64,
}

impl RotatingWriter {
    pub(crate) fn open(
        base: PathBuf,
        max_size: u64,
        max_files: usize,
        suffixes: Vec<String>,
    ) -> Result<Self> {
        if max_size == 0 {
            return Err(LoggerError::config("rotation", "max_size must be greater than zero"));
        }

        let (file, current_size) = open_append(&base).map_err(|e| {
            LoggerError::io_operation(
                "opening log file",
                format!("cannot open '{}'", base.display()),
                e,
            )
        })?;

        Ok(Self {
            base,
            max_size,
            max_files,
            suffixes,
            writer: Some(BufWriter::new(file)),
            current_size,
            rotations: 0,
        })
    }

    pub(crate) fn base(&self) -> &Path {
        &self.base
    }

    pub(crate) fn max_size(&self) -> u64 {
        self.max_size
    }

    pub(crate) fn max_files(&self) -> usize {
        self.max_files
    }

    pub(crate) fn current_size(&self) -> u64 {
        self.current_size
    }

    pub(crate) fn rotations(&self) -> u64 {
        self.rotations
    }

    /// Write one line; returns `true` when the write triggered a rotation
    pub(crate) fn write_line(&mut self, line: &str) -> Result<bool> {
        if self.writer.is_none() {
            self.reopen()?;
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::sink_unavailable(self.base.display().to_string()))?;

        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        self.current_size += line.len() as u64 + 1;

        if self.current_size >= self.max_size {
            if let Err(e) = self.rotate() {
                // Keep logging into the current file rather than losing records
                diagnostics::warning(format_args!("Log rotation failed: {}. Continuing with current file.", e));
                if self.writer.is_none() {
                    self.reopen()?;
                }
                self.current_size = 0;
                return Err(e);
            }
            return Ok(true);
        }
        Ok(false)
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Shift history, move the active file to `.1` and start a fresh one
    pub(crate) fn rotate(&mut self) -> Result<()> {
        let base_display = self.base.display().to_string();

        // Explicitly drop writer to release file handle immediately
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(&base_display, format!("Failed to flush before rotation: {}", e))
            })?;
        }

        if self.max_files > 0 {
            self.shift_history()
                .map_err(|e| LoggerError::file_rotation(&base_display, format!("Failed to shift history: {}", e)))?;
            replace(&self.base, &rotated_path(&self.base, 1)).map_err(|e| {
                LoggerError::file_rotation(&base_display, format!("Failed to rotate current log file: {}", e))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.base)
            .map_err(|e| {
                LoggerError::file_rotation(&base_display, format!("Failed to create new log file: {}", e))
            })?;

        self.writer = Some(BufWriter::new(file));
        self.current_size = 0;
        self.rotations += 1;
        Ok(())
    }

    fn variants(&self, path: &Path) -> Vec<PathBuf> {
        std::iter::once(path.to_path_buf())
            .chain(self.suffixes.iter().map(|s| with_suffix(path, s)))
            .collect()
    }

    fn shift_history(&self) -> io::Result<()> {
        for oldest in self.variants(&rotated_path(&self.base, self.max_files)) {
            remove_if_exists(&oldest)?;
        }

        for i in (1..self.max_files).rev() {
            let from = self.variants(&rotated_path(&self.base, i));
            let to = self.variants(&rotated_path(&self.base, i + 1));
            for (from, to) in from.iter().zip(to.iter()) {
                if from.exists() {
                    replace(from, to)?;
                }
            }
        }
        Ok(())
    }

    fn reopen(&mut self) -> Result<()> {
        let (file, size) = open_append(&self.base).map_err(|e| {
            LoggerError::io_operation(
                "reopening log file",
                format!("cannot reopen '{}'", self.base.display()),
                e,
            )
        })?;
        self.writer = Some(BufWriter::new(file));
        self.current_size = size;
        Ok(())
    }
}

impl Drop for RotatingWriter {
    fn drop(&mut self) {
        // Best effort flush during drop
        let _ = self.flush();
    }
}
