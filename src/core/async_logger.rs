//! Asynchronous delivery engine
//!
//! Producers enqueue onto a bounded channel and return; one named worker
//! thread drains the channel in FIFO order into the wrapped [`Logger`].

use super::{
    config::{Config, DEFAULT_QUEUE_CAPACITY},
    context::{ContextFields, LogContext},
    diagnostics,
    error::{LoggerError, Result},
    log_level::LogLevel,
    logger::Logger,
    metrics::LoggerMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy},
};
use crossbeam_channel::{
    bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default shutdown timeout for draining the queue (5 seconds)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// How long `flush()` waits for the worker to reach the flush marker
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Worker wake-up interval used to notice a stop request whose marker was evicted
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Evict-then-retry attempts for `DropOldest` before giving up on the new record
const DROP_OLDEST_RETRIES: usize = 3;

enum Command {
    Record {
        level: LogLevel,
        message: String,
        ambient: ContextFields,
    },
    Flush(Sender<Result<()>>),
    Shutdown,
}

/// Non-blocking front end for a [`Logger`]
///
/// Each call captures the producer's ambient context, so filters running on
/// the worker thread see the fields that were in scope at the call site.
/// Records from one producer are delivered in the order they were logged.
///
/// # Example
///
/// ```
/// use rust_log_pipeline::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Arc::new(Logger::builder("svc").sink(Arc::new(NullSink::new())).build());
/// let async_logger = AsyncLogger::builder(Arc::clone(&logger))
///     .capacity(1024)
///     .overflow_policy(OverflowPolicy::DropOldest)
///     .build()
///     .unwrap();
///
/// async_logger.info("queued");
/// async_logger.flush().unwrap();
/// assert_eq!(logger.metrics().total_logged(), 1);
/// ```
pub struct AsyncLogger {
    logger: Arc<Logger>,
    metrics: Arc<LoggerMetrics>,
    sender: Sender<Command>,
    /// Producer-side handle used to evict under `DropOldest`
    receiver: Receiver<Command>,
    capacity: usize,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncLogger {
    /// Wrap a logger with the default capacity and overflow policy
    pub fn new(logger: Arc<Logger>) -> Result<Self> {
        AsyncLoggerBuilder::new(logger).build()
    }

    /// Stdout logger driven by the configured queue
    pub fn from_config(name: impl Into<String>, config: &Config) -> Result<Self> {
        let logger = Arc::new(Logger::from_config(name, config)?);
        AsyncLoggerBuilder::new(logger)
            .capacity(config.queue_capacity)
            .overflow_policy(config.overflow_policy.clone())
            .build()
    }

    #[must_use]
    pub fn builder(logger: Arc<Logger>) -> AsyncLoggerBuilder {
        AsyncLoggerBuilder::new(logger)
    }

    fn start(
        logger: Arc<Logger>,
        capacity: usize,
        overflow_policy: OverflowPolicy,
        on_overflow: Option<OverflowCallback>,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(LoggerError::config(
                "AsyncLogger",
                "queue capacity must be greater than zero",
            ));
        }

        let (sender, receiver) = bounded(capacity);
        let metrics = logger.metrics_handle();
        metrics.set_queue_capacity(capacity);
        let running = Arc::new(AtomicBool::new(true));

        let worker_logger = Arc::clone(&logger);
        let worker_receiver = receiver.clone();
        let worker_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name(format!("{}-async", logger.name()))
            .spawn(move || worker_loop(&worker_logger, &worker_receiver, &worker_running))
            .map_err(|e| {
                LoggerError::io_operation("spawning async worker", "thread creation failed", e)
            })?;

        Ok(Self {
            logger,
            metrics,
            sender,
            receiver,
            capacity,
            overflow_policy,
            on_overflow,
            running,
            worker: Mutex::new(Some(handle)),
        })
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records currently waiting for the worker
    pub fn queue_len(&self) -> usize {
        self.sender.len()
    }

    pub fn overflow_policy(&self) -> &OverflowPolicy {
        &self.overflow_policy
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Enqueue a record and return without waiting for any sink
    ///
    /// Records below the wrapped logger's level never take a queue slot.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if !self.logger.is_enabled(level) {
            return;
        }
        if !self.is_running() {
            self.metrics.record_dropped();
            return;
        }

        self.enqueue(Command::Record {
            level,
            message: message.into(),
            ambient: LogContext::get_all(),
        });
    }

    fn enqueue(&self, command: Command) {
        match self.sender.try_send(command) {
            Ok(()) => self.metrics.record_queue_depth(self.sender.len()),
            Err(TrySendError::Full(command)) => self.handle_overflow(command),
            Err(TrySendError::Disconnected(_)) => {
                self.metrics.record_dropped();
            }
        }
    }

    /// Handle a full queue according to the configured policy
    fn handle_overflow(&self, command: Command) {
        match &self.overflow_policy {
            OverflowPolicy::DropNewest => self.discard(command, false),

            OverflowPolicy::DropOldest => {
                let mut command = command;
                for _ in 0..DROP_OLDEST_RETRIES {
                    if let Ok(evicted) = self.receiver.try_recv() {
                        self.discard(evicted, false);
                    }
                    match self.sender.try_send(command) {
                        Ok(()) => {
                            self.metrics.record_queue_depth(self.sender.len());
                            return;
                        }
                        Err(TrySendError::Full(rejected)) => command = rejected,
                        Err(TrySendError::Disconnected(rejected)) => {
                            self.discard(rejected, false);
                            return;
                        }
                    }
                }
                // Other producers keep refilling the slot we free
                self.discard(command, false);
            }

            OverflowPolicy::Block => match self.sender.send(command) {
                Ok(()) => self.metrics.record_queue_depth(self.sender.len()),
                Err(e) => self.discard(e.0, false),
            },

            OverflowPolicy::BlockWithTimeout(timeout) => {
                match self.sender.send_timeout(command, *timeout) {
                    Ok(()) => self.metrics.record_queue_depth(self.sender.len()),
                    Err(SendTimeoutError::Timeout(command)) => self.discard(command, true),
                    Err(SendTimeoutError::Disconnected(command)) => self.discard(command, false),
                }
            }

            OverflowPolicy::AlertAndDrop => self.discard(command, true),
        }
    }

    /// Count a lost record; an evicted flush marker simply releases its waiter
    fn discard(&self, command: Command, alert: bool) {
        if !matches!(command, Command::Record { .. }) {
            return;
        }

        let dropped_count = self.metrics.record_dropped() + 1;
        if !alert {
            return;
        }

        // Alert on first drop and periodically thereafter
        if dropped_count == 1 || dropped_count % 1000 == 0 {
            diagnostics::warning(format_args!(
                "Queue full for logger '{}', {} logs dropped. \
                 Consider increasing queue capacity or using a different overflow policy.",
                self.logger.name(),
                dropped_count
            ));

            if let Some(ref callback) = self.on_overflow {
                callback(dropped_count);
            }
        }
    }

    fn on_worker_thread(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| handle.thread().id() == thread::current().id())
    }

    /// Wait until every record queued before this call has been delivered,
    /// then flush the logger's sinks
    pub fn flush(&self) -> Result<()> {
        self.flush_timeout(DEFAULT_FLUSH_TIMEOUT)
    }

    pub fn flush_timeout(&self, timeout: Duration) -> Result<()> {
        if !self.is_running() || self.on_worker_thread() {
            return self.logger.flush();
        }

        let (ack_tx, ack_rx) = bounded(1);
        let deadline = Instant::now() + timeout;
        if let Err(e) = self.sender.send_timeout(Command::Flush(ack_tx), timeout) {
            return match e {
                SendTimeoutError::Timeout(_) => Err(LoggerError::queue_full(self.queue_len(), self.capacity)),
                SendTimeoutError::Disconnected(_) => Err(LoggerError::LoggerStopped),
            };
        }

        match ack_rx.recv_deadline(deadline) {
            Ok(result) => result,
            // Flush marker was evicted by DropOldest; flush what we can
            Err(RecvTimeoutError::Disconnected) => self.logger.flush(),
            Err(RecvTimeoutError::Timeout) => Err(LoggerError::other(format!(
                "flush of logger '{}' timed out after {:?}",
                self.logger.name(),
                timeout
            ))),
        }
    }

    /// Stop accepting records, drain the queue and join the worker
    ///
    /// Returns `true` once the worker has exited (or was already stopped).
    /// Refused with `false` when called from the worker thread itself, since
    /// that thread cannot join itself.
    pub fn shutdown(&self) -> bool {
        self.shutdown_timeout(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    pub fn shutdown_timeout(&self, timeout: Duration) -> bool {
        let handle = {
            let mut worker = self.worker.lock();
            if let Some(handle) = worker.as_ref() {
                if handle.thread().id() == thread::current().id() {
                    diagnostics::warning(format_args!(
                        "shutdown() of logger '{}' called from its own worker thread; ignored",
                        self.logger.name()
                    ));
                    return false;
                }
            }
            match worker.take() {
                Some(handle) => handle,
                None => return true,
            }
        };

        self.running.store(false, Ordering::Release);
        if self.sender.send_timeout(Command::Shutdown, timeout).is_err() {
            diagnostics::warning(format_args!(
                "Could not enqueue shutdown for logger '{}'; worker will stop when idle",
                self.logger.name()
            ));
        }

        let start = Instant::now();
        let completed = loop {
            if handle.is_finished() {
                // Thread finished, join it to check for panics
                match handle.join() {
                    Ok(()) => break true,
                    Err(payload) => {
                        diagnostics::error(format_args!(
                            "Async worker of logger '{}' panicked: {}",
                            self.logger.name(),
                            diagnostics::panic_message(payload.as_ref())
                        ));
                        break false;
                    }
                }
            }

            if start.elapsed() >= timeout {
                diagnostics::warning(format_args!(
                    "Async worker of logger '{}' did not finish within {:?}. Some logs may be lost.",
                    self.logger.name(),
                    timeout
                ));
                break false;
            }

            // Small sleep to avoid busy-waiting
            thread::sleep(Duration::from_millis(5));
        };

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            diagnostics::warning(format_args!(
                "Logger '{}' shutting down with {} dropped logs (drop rate: {:.2}%)",
                self.logger.name(),
                dropped,
                self.metrics.drop_rate() * 100.0
            ));
        }

        completed
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }
}

fn worker_loop(logger: &Logger, receiver: &Receiver<Command>, running: &AtomicBool) {
    let metrics = logger.metrics();
    loop {
        match receiver.recv_timeout(IDLE_POLL) {
            Ok(Command::Record {
                level,
                message,
                ambient,
            }) => {
                metrics.record_queue_depth(receiver.len());
                logger.log_with_ambient(level, message, &ambient);
            }
            Ok(Command::Flush(ack)) => {
                let _ = ack.send(logger.flush());
            }
            Ok(Command::Shutdown) => break,
            Err(RecvTimeoutError::Timeout) => {
                if !running.load(Ordering::Acquire) && receiver.is_empty() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Records that raced in behind the shutdown marker
    while let Ok(command) = receiver.try_recv() {
        match command {
            Command::Record {
                level,
                message,
                ambient,
            } => logger.log_with_ambient(level, message, &ambient),
            Command::Flush(ack) => {
                let _ = ack.send(Ok(()));
            }
            Command::Shutdown => {}
        }
    }
    metrics.record_queue_depth(0);

    if let Err(e) = logger.flush() {
        diagnostics::error(format_args!(
            "Failed to flush logger '{}' during shutdown: {}",
            logger.name(),
            e
        ));
    }
}

impl Drop for AsyncLogger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for AsyncLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncLogger")
            .field("logger", &self.logger.name())
            .field("capacity", &self.capacity)
            .field("queue_len", &self.queue_len())
            .field("overflow_policy", &self.overflow_policy)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Builder for [`AsyncLogger`]
pub struct AsyncLoggerBuilder {
    logger: Arc<Logger>,
    capacity: usize,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
}

impl AsyncLoggerBuilder {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self {
            logger,
            capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            on_overflow: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the overflow policy. Default is `AlertAndDrop`.
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Set a callback for overflow notifications
    ///
    /// The callback is invoked alongside the stderr alert with the total
    /// count of dropped records.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_log_pipeline::prelude::*;
    /// use std::sync::Arc;
    ///
    /// let logger = Arc::new(Logger::new("svc"));
    /// let async_logger = AsyncLogger::builder(logger)
    ///     .capacity(100)
    ///     .on_overflow(Arc::new(|count| {
    ///         eprintln!("Warning: {} logs dropped", count);
    ///     }))
    ///     .build()
    ///     .unwrap();
    /// ```
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Start the worker thread
    pub fn build(self) -> Result<AsyncLogger> {
        AsyncLogger::start(
            self.logger,
            self.capacity,
            self.overflow_policy,
            self.on_overflow,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::FieldFilter;
    use crate::core::test_support::CaptureSink;
    use std::sync::atomic::AtomicU64;

    fn capture_logger(name: &str) -> (Arc<Logger>, Arc<CaptureSink>) {
        let sink = Arc::new(CaptureSink::default());
        let logger = Arc::new(Logger::builder(name).sink(sink.clone()).build());
        (logger, sink)
    }

    #[test]
    fn test_single_producer_order() {
        let (logger, sink) = capture_logger("order");
        let async_logger = AsyncLogger::new(logger).unwrap();

        async_logger.info("a");
        async_logger.info("b");
        async_logger.info("c");
        async_logger.flush().unwrap();

        assert_eq!(sink.messages(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_worker_thread_is_named() {
        let (logger, sink) = capture_logger("named");
        logger.set_filter_func(|_| thread::current().name() == Some("named-async"));
        let async_logger = AsyncLogger::new(logger).unwrap();

        async_logger.info("from worker");
        async_logger.flush().unwrap();

        assert_eq!(sink.messages(), vec!["from worker"]);
    }

    #[test]
    fn test_ambient_context_reaches_worker() {
        let (logger, sink) = capture_logger("ambient");
        logger.add_filter(Arc::new(FieldFilter::new("request_id", "r-1")));
        let async_logger = AsyncLogger::new(logger).unwrap();

        async_logger.info("no context");
        {
            let _guard = LogContext::scoped("request_id", "r-1");
            async_logger.info("in request");
        }
        async_logger.flush().unwrap();

        assert_eq!(sink.messages(), vec!["in request"]);
        assert_eq!(async_logger.metrics().filtered_count(), 1);
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let (logger, sink) = capture_logger("drain");
        let async_logger = AsyncLogger::new(logger).unwrap();

        for i in 0..100 {
            async_logger.debug(format!("m{}", i));
        }
        assert!(async_logger.shutdown());

        assert_eq!(sink.messages().len(), 100);
        assert!(!async_logger.is_running());
    }

    #[test]
    fn test_log_after_shutdown_is_counted() {
        let (logger, sink) = capture_logger("stopped");
        let async_logger = AsyncLogger::new(logger).unwrap();
        assert!(async_logger.shutdown());
        assert!(async_logger.shutdown());

        async_logger.info("late");

        assert!(sink.messages().is_empty());
        assert_eq!(async_logger.metrics().dropped_count(), 1);
    }

    #[test]
    fn test_drop_newest_counts_drops() {
        let (logger, sink) = capture_logger("newest");
        let async_logger = AsyncLogger::builder(logger)
            .capacity(2)
            .overflow_policy(OverflowPolicy::DropNewest)
            .build()
            .unwrap();

        {
            let _hold = sink.hold();
            for i in 0..10 {
                async_logger.info(format!("m{}", i));
            }
        }
        async_logger.flush().unwrap();

        let delivered = sink.messages().len() as u64;
        let dropped = async_logger.metrics().dropped_count();
        assert_eq!(delivered + dropped, 10);
        assert!(dropped >= 7, "dropped {}", dropped);
    }

    #[test]
    fn test_drop_oldest_keeps_latest() {
        let (logger, sink) = capture_logger("oldest");
        let async_logger = AsyncLogger::builder(logger)
            .capacity(2)
            .overflow_policy(OverflowPolicy::DropOldest)
            .build()
            .unwrap();

        {
            let _hold = sink.hold();
            for i in 0..10 {
                async_logger.info(format!("m{}", i));
            }
        }
        async_logger.flush().unwrap();

        let messages = sink.messages();
        let dropped = async_logger.metrics().dropped_count();
        assert_eq!(messages.len() as u64 + dropped, 10);
        assert_eq!(&messages[messages.len() - 2..], ["m8", "m9"]);
    }

    #[test]
    fn test_level_gate_applies_before_enqueue() {
        let sink = Arc::new(CaptureSink::default());
        let logger = Arc::new(
            Logger::builder("gated")
                .min_level(LogLevel::Warn)
                .sink(sink.clone())
                .build(),
        );
        let async_logger = AsyncLogger::builder(Arc::clone(&logger))
            .capacity(2)
            .overflow_policy(OverflowPolicy::DropNewest)
            .build()
            .unwrap();

        {
            let _hold = sink.hold();
            async_logger.error("first");
            for i in 0..10 {
                async_logger.debug(format!("noise {}", i));
            }
            async_logger.log(LogLevel::Off, "never");
            async_logger.error("important");
        }
        async_logger.flush().unwrap();

        assert_eq!(sink.messages(), vec!["first", "important"]);
        assert_eq!(logger.metrics().dropped_count(), 0);
        assert_eq!(logger.metrics().total_logged(), 2);
    }

    #[test]
    fn test_alert_callback_fires_on_first_drop() {
        let (logger, sink) = capture_logger("alert");
        let alerts = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&alerts);

        let async_logger = AsyncLogger::builder(logger)
            .capacity(1)
            .on_overflow(Arc::new(move |count| {
                seen.store(count, Ordering::SeqCst);
            }))
            .build()
            .unwrap();

        {
            let _hold = sink.hold();
            for i in 0..5 {
                async_logger.info(format!("m{}", i));
            }
        }
        async_logger.flush().unwrap();

        assert_eq!(alerts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_block_policy_loses_nothing() {
        let (logger, sink) = capture_logger("block");
        let async_logger = AsyncLogger::builder(logger)
            .capacity(4)
            .overflow_policy(OverflowPolicy::Block)
            .build()
            .unwrap();

        for i in 0..200 {
            async_logger.info(format!("m{}", i));
        }
        async_logger.flush().unwrap();

        assert_eq!(sink.messages().len(), 200);
        assert_eq!(async_logger.metrics().dropped_count(), 0);
    }

    #[test]
    fn test_queue_metrics_published() {
        let (logger, sink) = capture_logger("depth");
        let async_logger = AsyncLogger::builder(Arc::clone(&logger))
            .capacity(16)
            .build()
            .unwrap();
        assert_eq!(logger.metrics().queue_capacity(), 16);

        {
            let _hold = sink.hold();
            for i in 0..8 {
                async_logger.info(format!("m{}", i));
            }
            assert!(logger.metrics().max_queue_depth() >= 7);
        }
        async_logger.flush().unwrap();
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let (logger, _sink) = capture_logger("zero");
        let err = AsyncLogger::builder(logger).capacity(0).build().unwrap_err();
        assert!(err.is_configuration());
    }
}
