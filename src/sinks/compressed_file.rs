//! Rotating file sink that compresses history on rotation
//!
//! After the usual rotation, `app.1.log` is compressed to `app.1.log.gz`
//! (or `.zst`). The uncompressed file is removed only once a non-empty
//! compressed file is in place; a failed compression leaves it untouched.

use super::rotation::{rotated_path, with_suffix, RotatingWriter};
use crate::core::{diagnostics, Formatter, LogLevel, LoggerError, Result, Sink, SinkLevel};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default size threshold (10 MiB)
pub const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

pub const DEFAULT_MAX_FILES: usize = 5;

const IO_BUFFER: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    #[default]
    Gzip,
    Zstd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionOptions {
    pub kind: CompressionType,
    /// Codec level: 0-9 for gzip, 1-22 for zstd
    pub level: i32,
    pub compress_on_rotate: bool,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            kind: CompressionType::Gzip,
            level: 6,
            compress_on_rotate: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CompressionStats {
    pub files_compressed: u64,
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    /// original / compressed, 0 before the first compression
    pub compression_ratio: f64,
    /// Rotations whose history file could not be compressed
    pub failures: u64,
}

/// A codec that turns `src` into a compressed `dst`
pub trait Compressor: Send + Sync {
    /// File suffix including the dot (".gz")
    fn suffix(&self) -> &str;

    /// Compress `src` into `dst`, returning the compressed size
    fn compress(&self, src: &Path, dst: &Path) -> Result<u64>;
}

#[derive(Debug, Clone, Copy)]
pub struct GzipCompressor {
    level: u32,
}

impl GzipCompressor {
    pub fn new(level: u32) -> Self {
        Self { level: level.min(9) }
    }
}

impl Compressor for GzipCompressor {
    fn suffix(&self) -> &str {
        ".gz"
    }

    fn compress(&self, src: &Path, dst: &Path) -> Result<u64> {
        compress_file_gzip(src, dst, self.level)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ZstdCompressor {
    level: i32,
}

impl ZstdCompressor {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Compressor for ZstdCompressor {
    fn suffix(&self) -> &str {
        ".zst"
    }

    fn compress(&self, src: &Path, dst: &Path) -> Result<u64> {
        compress_file_zstd(src, dst, self.level)
    }
}

/// Size of `path` in bytes, 0 if it cannot be read
pub fn file_size(path: impl AsRef<Path>) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Stream `src` through an encoder into `dst.tmp`, then rename to `dst`
///
/// Uses streaming I/O so large history files are never loaded into memory.
fn compress_through_temp<F>(src: &Path, dst: &Path, encode: F) -> Result<u64>
where
    F: FnOnce(&mut BufReader<File>, BufWriter<File>) -> io::Result<()>,
{
    let temp = with_suffix(dst, ".tmp");
    let context = |what: &str, e: io::Error| {
        let _ = fs::remove_file(&temp);
        LoggerError::io_operation("compressing log file", format!("{} '{}'", what, src.display()), e)
    };

    let input = File::open(src).map_err(|e| context("cannot open", e))?;
    let mut reader = BufReader::with_capacity(IO_BUFFER, input);
    let output = File::create(&temp).map_err(|e| context("cannot create temp file for", e))?;

    encode(&mut reader, BufWriter::with_capacity(IO_BUFFER, output))
        .map_err(|e| context("encoding failed for", e))?;

    fs::rename(&temp, dst).map_err(|e| context("cannot move compressed output of", e))?;
    Ok(file_size(dst))
}

pub fn compress_file_gzip(src: impl AsRef<Path>, dst: impl AsRef<Path>, level: u32) -> Result<u64> {
    compress_through_temp(src.as_ref(), dst.as_ref(), |reader, out| {
        let mut encoder = flate2::write::GzEncoder::new(out, flate2::Compression::new(level.min(9)));
        io::copy(reader, &mut encoder)?;
        encoder.finish()?.flush()
    })
}

pub fn compress_file_zstd(src: impl AsRef<Path>, dst: impl AsRef<Path>, level: i32) -> Result<u64> {
    compress_through_temp(src.as_ref(), dst.as_ref(), |reader, out| {
        let mut encoder = zstd::stream::write::Encoder::new(out, level)?;
        io::copy(reader, &mut encoder)?;
        encoder.finish()?.flush()
    })
}

pub struct CompressedFileSink {
    inner: Mutex<RotatingWriter>,
    path: PathBuf,
    options: CompressionOptions,
    compressor: Option<Box<dyn Compressor>>,
    stats: Mutex<CompressionStats>,
    formatter: Formatter,
    level: SinkLevel,
}

impl CompressedFileSink {
    pub fn new(
        path: impl Into<PathBuf>,
        max_size: u64,
        max_files: usize,
        options: CompressionOptions,
    ) -> Result<Self> {
        let compressor: Option<Box<dyn Compressor>> = match options.kind {
            CompressionType::None => None,
            CompressionType::Gzip => Some(Box::new(GzipCompressor::new(options.level.max(0) as u32))),
            CompressionType::Zstd => Some(Box::new(ZstdCompressor::new(options.level))),
        };
        Self::build(path.into(), max_size, max_files, options, compressor)
    }

    /// Use a custom codec; `options.kind` is ignored
    pub fn with_compressor(
        path: impl Into<PathBuf>,
        max_size: u64,
        max_files: usize,
        compressor: Box<dyn Compressor>,
    ) -> Result<Self> {
        Self::build(
            path.into(),
            max_size,
            max_files,
            CompressionOptions::default(),
            Some(compressor),
        )
    }

    fn build(
        path: PathBuf,
        max_size: u64,
        max_files: usize,
        options: CompressionOptions,
        compressor: Option<Box<dyn Compressor>>,
    ) -> Result<Self> {
        let suffixes = compressor
            .iter()
            .map(|c| c.suffix().to_string())
            .collect();
        let inner = RotatingWriter::open(path.clone(), max_size, max_files, suffixes)?;
        Ok(Self {
            inner: Mutex::new(inner),
            path,
            options,
            compressor,
            stats: Mutex::new(CompressionStats::default()),
            formatter: Formatter::default(),
            level: SinkLevel::default(),
        })
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &CompressionOptions {
        &self.options
    }

    pub fn current_size(&self) -> u64 {
        self.inner.lock().current_size()
    }

    pub fn compression_stats(&self) -> CompressionStats {
        *self.stats.lock()
    }

    /// Compress `.1` right after a rotation; caller holds the writer lock
    fn compress_newest(&self, base: &Path) -> Result<()> {
        let compressor = match &self.compressor {
            Some(c) if self.options.compress_on_rotate => c,
            _ => return Ok(()),
        };

        let source = rotated_path(base, 1);
        if !source.exists() {
            return Ok(());
        }
        let dest = with_suffix(&source, compressor.suffix());
        let original_size = file_size(&source);

        let outcome = compressor.compress(&source, &dest);
        let compressed_size = match outcome {
            Ok(size) if size > 0 => size,
            Ok(_) => {
                let _ = fs::remove_file(&dest);
                self.stats.lock().failures += 1;
                return Err(LoggerError::compression(
                    source.display().to_string(),
                    "compressed output is empty",
                ));
            }
            Err(e) => {
                self.stats.lock().failures += 1;
                return Err(LoggerError::compression(source.display().to_string(), e.to_string()));
            }
        };

        // Only remove the original after compression fully succeeded
        if let Err(e) = fs::remove_file(&source) {
            diagnostics::warning(format_args!(
                "Compression succeeded but failed to remove original file {}: {}. \
                 Both compressed and uncompressed versions exist.",
                source.display(),
                e
            ));
        }

        let mut stats = self.stats.lock();
        stats.files_compressed += 1;
        stats.original_bytes += original_size;
        stats.compressed_bytes += compressed_size;
        stats.compression_ratio = if stats.compressed_bytes > 0 {
            stats.original_bytes as f64 / stats.compressed_bytes as f64
        } else {
            0.0
        };
        Ok(())
    }
}

impl Sink for CompressedFileSink {
    fn log(&self, logger_name: &str, level: LogLevel, message: &str) -> Result<()> {
        if !self.should_log(level) {
            return Ok(());
        }
        let line = self.formatter.format(logger_name, level, message);

        let mut inner = self.inner.lock();
        if inner.write_line(&line)? {
            let base = inner.base().to_path_buf();
            self.compress_newest(&base)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    fn level(&self) -> LogLevel {
        self.level.get()
    }

    fn set_level(&self, level: LogLevel) {
        self.level.set(level);
    }

    fn name(&self) -> &str {
        "compressed_file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    struct BrokenCompressor;

    impl Compressor for BrokenCompressor {
        fn suffix(&self) -> &str {
            ".gz"
        }

        fn compress(&self, _src: &Path, dst: &Path) -> Result<u64> {
            // Leaves an empty file behind like a codec that died mid-stream
            fs::write(dst, b"")?;
            Ok(0)
        }
    }

    fn message_format() -> Formatter {
        Formatter::with_pattern("%v").unwrap()
    }

    #[test]
    fn test_gzip_on_rotate() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("app.log");
        let sink = CompressedFileSink::new(&base, 64, 3, CompressionOptions::default())
            .unwrap()
            .with_formatter(message_format());

        for _ in 0..8 {
            sink.log("t", LogLevel::Info, "the same line over and over").unwrap();
        }

        let gz = with_suffix(&rotated_path(&base, 1), ".gz");
        assert!(gz.exists());
        assert!(!rotated_path(&base, 1).exists());

        let mut decoded = String::new();
        flate2::read::GzDecoder::new(File::open(&gz).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert!(decoded.starts_with("the same line over and over\n"));

        let stats = sink.compression_stats();
        assert!(stats.files_compressed >= 1);
        assert!(stats.original_bytes > 0);
        assert!(stats.compression_ratio > 0.0);
        assert_eq!(stats.failures, 0);
    }

    #[test]
    fn test_zstd_on_rotate() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("app.log");
        let options = CompressionOptions {
            kind: CompressionType::Zstd,
            level: 3,
            compress_on_rotate: true,
        };
        let sink = CompressedFileSink::new(&base, 16, 2, options)
            .unwrap()
            .with_formatter(message_format());

        sink.log("t", LogLevel::Info, "zstd compressed history line").unwrap();

        let zst = with_suffix(&rotated_path(&base, 1), ".zst");
        let decoded = zstd::decode_all(File::open(&zst).unwrap()).unwrap();
        assert_eq!(decoded, b"zstd compressed history line\n");
    }

    #[test]
    fn test_failed_compression_keeps_original() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("app.log");
        let sink = CompressedFileSink::with_compressor(&base, 16, 3, Box::new(BrokenCompressor))
            .unwrap()
            .with_formatter(message_format());

        let err = sink.log("t", LogLevel::Info, "precious data line").unwrap_err();
        assert!(matches!(err, LoggerError::Compression { .. }));

        let history = rotated_path(&base, 1);
        assert_eq!(fs::read(&history).unwrap(), b"precious data line\n");
        assert!(!with_suffix(&history, ".gz").exists());

        let stats = sink.compression_stats();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.files_compressed, 0);
    }

    #[test]
    fn test_compressed_history_shifts() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("app.log");
        let sink = CompressedFileSink::new(&base, 8, 2, CompressionOptions::default())
            .unwrap()
            .with_formatter(message_format());

        for i in 0..3 {
            sink.log("t", LogLevel::Info, &format!("record-{}", i)).unwrap();
        }

        assert!(with_suffix(&rotated_path(&base, 1), ".gz").exists());
        assert!(with_suffix(&rotated_path(&base, 2), ".gz").exists());
        assert!(!with_suffix(&rotated_path(&base, 3), ".gz").exists());
        assert_eq!(sink.compression_stats().files_compressed, 3);
    }

    #[test]
    fn test_no_compression_type() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("app.log");
        let options = CompressionOptions {
            kind: CompressionType::None,
            ..CompressionOptions::default()
        };
        let sink = CompressedFileSink::new(&base, 8, 2, options)
            .unwrap()
            .with_formatter(message_format());

        sink.log("t", LogLevel::Info, "plain-record").unwrap();
        assert!(rotated_path(&base, 1).exists());
        assert_eq!(sink.compression_stats(), CompressionStats::default());
    }

    #[test]
    fn test_standalone_helpers() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("input.log");
        fs::write(&src, "line\n".repeat(200)).unwrap();

        let gz = dir.path().join("input.log.gz");
        let size = compress_file_gzip(&src, &gz, 9).unwrap();
        assert_eq!(size, file_size(&gz));
        assert!(size < file_size(&src));
        assert!(src.exists());

        assert!(compress_file_zstd(dir.path().join("missing"), dir.path().join("x.zst"), 3).is_err());
        assert!(!dir.path().join("x.zst.tmp").exists());
        assert_eq!(file_size(dir.path().join("missing")), 0);
    }
}
