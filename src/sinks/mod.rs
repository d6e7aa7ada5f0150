//! Output sinks

pub mod compressed_file;
pub mod file;
pub mod json;
pub mod loki;
pub mod multi;
pub mod network;
pub mod null;
pub mod rotating_file;
mod rotation;
#[cfg(unix)]
pub mod signal_safe;
pub mod stdout;

pub use compressed_file::{
    compress_file_gzip, compress_file_zstd, file_size, CompressedFileSink, CompressionOptions,
    CompressionStats, CompressionType, Compressor, GzipCompressor, ZstdCompressor,
};
pub use file::FileSink;
pub use json::JsonSink;
#[cfg(feature = "loki")]
pub use loki::HttpTransport;
pub use loki::{LokiSink, LokiTransport};
pub use multi::MultiSink;
pub use network::NetworkSink;
pub use null::NullSink;
pub use rotating_file::RotatingFileSink;
pub use rotation::rotated_path;
#[cfg(unix)]
pub use signal_safe::SignalSafeSink;
pub use stdout::StdoutSink;
