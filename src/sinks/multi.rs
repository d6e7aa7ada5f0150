//! Fan-out composite sink

use crate::core::{diagnostics, LogLevel, LoggerError, Result, Sink, SinkLevel};
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Forwards every record to each child in insertion order
///
/// A failing or panicking child does not stop delivery to the others; the
/// call then returns `SinkFailures` with the number of children that failed.
#[derive(Default)]
pub struct MultiSink {
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
    level: SinkLevel,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.sinks.write().push(sink);
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_sink(self, sink: Arc<dyn Sink>) -> Self {
        self.add_sink(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.read().is_empty()
    }

    fn for_each<F>(&self, op: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&dyn Sink) -> Result<()>,
    {
        let sinks = self.sinks.read();
        let mut failed = 0;
        for sink in sinks.iter() {
            match catch_unwind(AssertUnwindSafe(|| f(sink.as_ref()))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_sink_unavailable() => failed += 1,
                Ok(Err(e)) => {
                    failed += 1;
                    diagnostics::error(format_args!("Sink '{}' {} failed: {}", sink.name(), op, e));
                }
                Err(payload) => {
                    failed += 1;
                    diagnostics::critical(format_args!(
                        "Sink '{}' panicked during {}: {}",
                        sink.name(),
                        op,
                        diagnostics::panic_message(payload.as_ref())
                    ));
                }
            }
        }

        if failed > 0 {
            return Err(LoggerError::SinkFailures {
                failed,
                total: sinks.len(),
            });
        }
        Ok(())
    }
}

impl Sink for MultiSink {
    fn log(&self, logger_name: &str, level: LogLevel, message: &str) -> Result<()> {
        if !self.should_log(level) {
            return Ok(());
        }
        self.for_each("log", |sink| sink.log(logger_name, level, message))
    }

    fn flush(&self) -> Result<()> {
        self.for_each("flush", |sink| sink.flush())
    }

    fn level(&self) -> LogLevel {
        self.level.get()
    }

    fn set_level(&self, level: LogLevel) {
        self.level.set(level);
    }

    fn name(&self) -> &str {
        "multi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{CaptureSink, FailingSink, PanickingSink};

    #[test]
    fn test_fans_out_in_order() {
        let a = Arc::new(CaptureSink::default());
        let b = Arc::new(CaptureSink::default());
        let multi = MultiSink::new()
            .with_sink(a.clone())
            .with_sink(b.clone());

        multi.log("svc", LogLevel::Info, "one").unwrap();
        multi.log("svc", LogLevel::Warn, "two").unwrap();

        assert_eq!(multi.len(), 2);
        assert_eq!(a.messages(), vec!["one", "two"]);
        assert_eq!(b.messages(), vec!["one", "two"]);
    }

    #[test]
    fn test_failures_do_not_stop_delivery() {
        let good = Arc::new(CaptureSink::default());
        let multi = MultiSink::new()
            .with_sink(Arc::new(FailingSink))
            .with_sink(Arc::new(PanickingSink))
            .with_sink(good.clone());

        let err = multi.log("svc", LogLevel::Error, "still here").unwrap_err();
        assert!(matches!(err, LoggerError::SinkFailures { failed: 2, total: 3 }));
        assert_eq!(good.messages(), vec!["still here"]);
    }

    #[test]
    fn test_own_level_gates_children() {
        let child = Arc::new(CaptureSink::default());
        let multi = MultiSink::new().with_sink(child.clone());
        multi.set_level(LogLevel::Error);

        multi.log("svc", LogLevel::Info, "hidden").unwrap();
        assert!(child.messages().is_empty());
    }

    #[test]
    fn test_empty_is_noop() {
        let multi = MultiSink::new();
        assert!(multi.is_empty());
        assert!(multi.log("svc", LogLevel::Info, "x").is_ok());
        assert!(multi.flush().is_ok());
    }
}
