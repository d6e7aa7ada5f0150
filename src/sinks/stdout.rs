//! Standard output sink

use crate::core::{Formatter, LogLevel, Result, Sink, SinkLevel};
#[cfg(feature = "console")]
use colored::Colorize;
use std::io::Write;

pub struct StdoutSink {
    formatter: Formatter,
    use_colors: bool,
    level: SinkLevel,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::with_formatter(Formatter::default())
    }

    pub fn with_formatter(formatter: Formatter) -> Self {
        Self {
            formatter,
            use_colors: false,
            level: SinkLevel::default(),
        }
    }

    /// Color each line by level (requires the `console` feature)
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[must_use]
    pub fn with_level(self, level: LogLevel) -> Self {
        self.level.set(level);
        self
    }

    fn render(&self, logger_name: &str, level: LogLevel, message: &str) -> String {
        let line = self.formatter.format(logger_name, level, message);
        #[cfg(feature = "console")]
        if self.use_colors {
            return line.color(level.color_code()).to_string();
        }
        line
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for StdoutSink {
    fn log(&self, logger_name: &str, level: LogLevel, message: &str) -> Result<()> {
        if !self.should_log(level) {
            return Ok(());
        }
        let line = self.render(logger_name, level, message);
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", line)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        std::io::stdout().flush()?;
        Ok(())
    }

    fn level(&self) -> LogLevel {
        self.level.get()
    }

    fn set_level(&self, level: LogLevel) {
        self.level.set(level);
    }

    fn name(&self) -> &str {
        "stdout"
    }
}
