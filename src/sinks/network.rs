//! TCP sink for remote collection
//!
//! Each record is sent as one line: `[logger_name] <level ordinal>: message\n`.

use crate::core::{sanitize_message, LogLevel, LoggerError, Result, Sink, SinkLevel};
use parking_lot::Mutex;
use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends records to a TCP collector
///
/// # Example
///
/// ```no_run
/// use rust_log_pipeline::sinks::NetworkSink;
///
/// let sink = NetworkSink::new("127.0.0.1:5170").expect("collector not reachable");
/// ```
pub struct NetworkSink {
    address: String,
    resolved: SocketAddr,
    stream: Mutex<Option<TcpStream>>,
    reconnect_on_error: bool,
    level: SinkLevel,
}

fn connect(addr: &SocketAddr) -> std::io::Result<TcpStream> {
    let stream = TcpStream::connect_timeout(addr, SOCKET_TIMEOUT)?;

    // Set timeouts to prevent hanging
    stream.set_write_timeout(Some(SOCKET_TIMEOUT))?;
    stream.set_read_timeout(Some(SOCKET_TIMEOUT))?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Split and resolve `"host:port"`
fn resolve(address: &str) -> Result<SocketAddr> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| LoggerError::config("network", format!("host:port expected, got '{}'", address)))?;
    if host.is_empty() {
        return Err(LoggerError::config("network", format!("missing host in '{}'", address)));
    }
    port.parse::<u16>()
        .map_err(|_| LoggerError::config("network", format!("invalid port in '{}'", address)))?;

    address
        .to_socket_addrs()
        .map_err(|e| LoggerError::network(address, format!("cannot resolve: {}", e)))?
        .next()
        .ok_or_else(|| LoggerError::network(address, "address resolved to nothing"))
}

/// Wire form of one record
pub fn encode_line(logger_name: &str, level: LogLevel, message: &str) -> String {
    format!(
        "[{}] {}: {}\n",
        logger_name,
        level.ordinal(),
        sanitize_message(message)
    )
}

impl NetworkSink {
    /// Resolve and connect to `address` (`"host:port"`)
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for a malformed address, `Network` when the
    /// collector cannot be reached.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        let resolved = resolve(&address)?;
        let stream = connect(&resolved)
            .map_err(|e| LoggerError::network(&address, format!("connection failed: {}", e)))?;

        Ok(Self {
            address,
            resolved,
            stream: Mutex::new(Some(stream)),
            reconnect_on_error: true,
            level: SinkLevel::default(),
        })
    }

    /// Enable or disable the single reconnect attempt after a failed send
    ///
    /// Default: enabled
    #[must_use]
    pub fn with_reconnect(mut self, enable: bool) -> Self {
        self.reconnect_on_error = enable;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.lock().is_some()
    }

    fn send(&self, payload: &[u8]) -> Result<()> {
        let mut guard = self.stream.lock();

        let first = match guard.as_mut() {
            Some(stream) => stream.write_all(payload),
            None if self.reconnect_on_error => Err(std::io::ErrorKind::NotConnected.into()),
            None => return Err(LoggerError::sink_unavailable(self.address.clone())),
        };

        let err = match first {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        *guard = None;

        if !self.reconnect_on_error {
            return Err(LoggerError::network(&self.address, err.to_string()));
        }

        match connect(&self.resolved) {
            Ok(mut stream) => {
                stream
                    .write_all(payload)
                    .map_err(|e| LoggerError::network(&self.address, format!("resend failed: {}", e)))?;
                *guard = Some(stream);
                Ok(())
            }
            Err(reconnect_err) => Err(LoggerError::network(
                &self.address,
                format!("send failed: {} (reconnect: {})", err, reconnect_err),
            )),
        }
    }
}

impl Sink for NetworkSink {
    fn log(&self, logger_name: &str, level: LogLevel, message: &str) -> Result<()> {
        if !self.should_log(level) {
            return Ok(());
        }
        self.send(encode_line(logger_name, level, message).as_bytes())
    }

    fn flush(&self) -> Result<()> {
        if let Some(stream) = self.stream.lock().as_mut() {
            stream.flush()?;
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
        "network"
    }
}
