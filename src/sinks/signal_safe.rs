//! Crash-time sink usable from inside a signal handler
//!
//! Records go into a fixed ring allocated once at construction. The producer
//! side takes no locks, performs no allocation and never blocks; bytes reach
//! the file descriptor through raw `write(2)` calls.
//!
//! ```text
//!   read_pos            write_pos
//!      |                    |
//!  ----[ unread bytes ......]----------   index = pos % capacity
//! ```
//!
//! Both cursors grow monotonically. `write_pos - read_pos` is the number of
//! buffered bytes and never exceeds `capacity`.

use crate::core::{diagnostics, LogLevel, LoggerError, Result, Sink, SinkLevel};
use std::cell::UnsafeCell;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicUsize, Ordering};

/// Hard upper bound on the ring size (1 MiB)
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;

pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

pub struct SignalSafeSink {
    path: PathBuf,
    file: Option<File>,
    buffer: Box<[UnsafeCell<u8>]>,
    capacity: usize,
    write_pos: AtomicUsize,
    read_pos: AtomicUsize,
    /// Held by the single producer currently reserving space
    producing: AtomicBool,
    /// Held by the thread currently draining the ring
    flushing: AtomicBool,
    dropped: AtomicU64,
    write_errors: AtomicU64,
    /// errno of the most recent failed `write(2)`, 0 for a zero-length write
    last_errno: AtomicI32,
    level: SinkLevel,
}

// SAFETY: the ring bytes are only written by the holder of `producing`, in
// the free span [write_pos, read_pos + capacity), and only read by the holder
// of `flushing`, in the published span [read_pos, write_pos). The release
// store of each cursor publishes those bytes to the other side.
unsafe impl Sync for SignalSafeSink {}
unsafe impl Send for SignalSafeSink {}

impl SignalSafeSink {
    /// Open `path` for appending with a ring of `buffer_size` bytes
    ///
    /// The size is clamped to `1..=MAX_BUFFER_SIZE`. When the file cannot be
    /// opened the failure is reported on stderr and the sink stays inert
    /// (`is_ready()` is false).
    pub fn new(path: impl Into<PathBuf>, buffer_size: usize) -> Self {
        let path = path.into();
        let file = match OpenOptions::new()
            .create(true)
            .append(true)
            .mode(0o644)
            .open(&path)
        {
            Ok(file) => Some(file),
            Err(e) => {
                diagnostics::error(format_args!(
                    "Cannot open signal-safe log file '{}': {}",
                    path.display(),
                    e
                ));
                None
            }
        };

        let capacity = buffer_size.clamp(1, MAX_BUFFER_SIZE);
        let buffer = (0..capacity).map(|_| UnsafeCell::new(0u8)).collect();

        Self {
            path,
            file,
            buffer,
            capacity,
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
            producing: AtomicBool::new(false),
            flushing: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            last_errno: AtomicI32::new(0),
            level: SinkLevel::default(),
        }
    }

    pub fn with_default_buffer(path: impl Into<PathBuf>) -> Self {
        Self::new(path, DEFAULT_BUFFER_SIZE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_ready(&self) -> bool {
        self.file.is_some()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes waiting in the ring
    pub fn buffered(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    /// Records (or raw writes) that were discarded for lack of space or
    /// because another producer held the ring
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Failed `write(2)` calls; the bytes of each failed span are lost
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    /// Buffer raw bytes with no formatting; async-signal-safe
    ///
    /// Returns `false` when the bytes were dropped.
    pub fn write_bytes(&self, data: &[u8]) -> bool {
        self.produce(&[data])
    }

    fn fd(&self) -> Option<RawFd> {
        self.file.as_ref().map(|f| f.as_raw_fd())
    }

    /// Reserve space for all `parts` at once and copy them in, or drop them
    fn produce(&self, parts: &[&[u8]]) -> bool {
        if self.file.is_none() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // A second producer would interleave bytes; never wait for the first
        if self
            .producing
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let accepted = self.reserve_and_copy(parts);
        self.producing.store(false, Ordering::Release);

        if !accepted {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        if self.buffered() > self.capacity / 2 {
            self.flush_buffer();
        }
        true
    }

    fn reserve_and_copy(&self, parts: &[&[u8]]) -> bool {
        let total: usize = parts.iter().map(|p| p.len()).sum();
        if total > self.capacity {
            return false;
        }

        let write = self.write_pos.load(Ordering::Relaxed);
        let mut read = self.read_pos.load(Ordering::Acquire);

        if self.capacity - write.wrapping_sub(read) < total {
            self.flush_buffer();
            read = self.read_pos.load(Ordering::Acquire);
            if self.capacity - write.wrapping_sub(read) < total {
                return false;
            }
        }

        let base = self.buffer.as_ptr();
        let mut pos = write;
        for part in parts {
            for &byte in part.iter() {
                let idx = pos % self.capacity;
                // SAFETY: idx < capacity and the slot lies in the free span
                // owned by this producer
                unsafe { *UnsafeCell::raw_get(base.add(idx)) = byte };
                pos = pos.wrapping_add(1);
            }
        }

        self.write_pos.store(pos, Ordering::Release);
        true
    }

    /// Write everything published so far to the descriptor
    ///
    /// At most two contiguous chunks are written. Returns `false` if another
    /// thread is already flushing or a write failed; the span is consumed
    /// either way.
    pub fn flush_buffer(&self) -> bool {
        self.drain() == Some(true)
    }

    /// `None` when there is nothing to drain into or another thread holds
    /// the ring, otherwise whether every write succeeded
    fn drain(&self) -> Option<bool> {
        let fd = self.fd()?;

        if self
            .flushing
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }

        let write = self.write_pos.load(Ordering::Acquire);
        let mut read = self.read_pos.load(Ordering::Relaxed);
        let mut ok = true;

        let base = self.buffer.as_ptr() as *const u8;
        while read != write {
            let idx = read % self.capacity;
            let chunk = write.wrapping_sub(read).min(self.capacity - idx);
            // SAFETY: [idx, idx + chunk) is inside the ring and published by
            // the release store of write_pos
            let data = unsafe { base.add(idx) };
            if let Err(errno) = write_fully(fd, data, chunk) {
                self.last_errno.store(errno, Ordering::Relaxed);
                self.write_errors.fetch_add(1, Ordering::Relaxed);
                ok = false;
            }
            read = read.wrapping_add(chunk);
        }

        self.read_pos.store(read, Ordering::Release);
        self.flushing.store(false, Ordering::Release);
        Some(ok)
    }

    fn last_write_error(&self) -> io::Error {
        match self.last_errno.load(Ordering::Relaxed) {
            0 => io::Error::new(io::ErrorKind::WriteZero, "write returned zero bytes"),
            errno => io::Error::from_raw_os_error(errno),
        }
    }
}

/// `write(2)` until `len` bytes are out, retrying partial writes and EINTR
///
/// Fails with the errno, or 0 when the kernel accepted nothing.
fn write_fully(fd: RawFd, data: *const u8, len: usize) -> std::result::Result<(), i32> {
    let mut written = 0usize;
    while written < len {
        // SAFETY: data..data+len is a live, initialised region of the ring
        let ret = unsafe {
            libc::write(
                fd,
                data.add(written) as *const libc::c_void,
                len - written,
            )
        };
        if ret < 0 {
            let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
            if errno == libc::EINTR {
                continue;
            }
            return Err(errno);
        }
        if ret == 0 {
            return Err(0);
        }
        written += ret as usize;
    }
    Ok(())
}

impl Sink for SignalSafeSink {
    /// Buffers `"[LEVEL] message\n"` as one reservation; the logger name is
    /// not written
    fn log(&self, _logger_name: &str, level: LogLevel, message: &str) -> Result<()> {
        if !self.should_log(level) {
            return Ok(());
        }
        self.produce(&[
            b"[",
            level.to_str().as_bytes(),
            b"] ",
            message.as_bytes(),
            b"\n",
        ]);
        Ok(())
    }

    /// Drain and `fsync`; runs on an ordinary thread, so failures are
    /// returned for the owning logger to count
    fn flush(&self) -> Result<()> {
        let Some(fd) = self.fd() else {
            return Ok(());
        };

        if self.drain() == Some(false) {
            return Err(LoggerError::io_operation(
                "writing signal-safe log",
                self.path.display().to_string(),
                self.last_write_error(),
            ));
        }

        // SAFETY: fd belongs to the file owned by this sink
        if unsafe { libc::fsync(fd) } == -1 {
            let err = io::Error::last_os_error();
            // Character devices and pipes have nothing to sync
            if err.raw_os_error() != Some(libc::EINVAL) {
                return Err(LoggerError::io_operation(
                    "syncing signal-safe log",
                    self.path.display().to_string(),
                    err,
                ));
            }
        }
        Ok(())
    }

    fn level(&self) -> LogLevel {
        self.level.get()
    }

    fn set_level(&self, level: LogLevel) {
        self.level.set(level);
    }

    fn name(&self) -> &str {
        "signal_safe"
    }
}

impl Drop for SignalSafeSink {
    fn drop(&mut self) {
        let _ = Sink::flush(self);
    }
}
