//! Criterion benchmarks for rust_log_pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_log_pipeline::prelude::*;
use rust_log_pipeline::sinks::{CompressedFileSink, CompressionOptions, CompressionType};
use std::sync::Arc;
use tempfile::TempDir;

fn null_logger(name: &str) -> Logger {
    Logger::builder(name).sink(Arc::new(NullSink::new())).build()
}

// ============================================================================
// Synchronous pipeline
// ============================================================================

fn bench_sync_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_logging");
    group.throughput(Throughput::Elements(1));

    let logger = null_logger("bench");
    group.bench_function("info_null_sink", |b| {
        b.iter(|| logger.info(black_box("Request served")));
    });

    let gated = Logger::builder("bench")
        .min_level(LogLevel::Warn)
        .sink(Arc::new(NullSink::new()))
        .build();
    group.bench_function("below_level", |b| {
        b.iter(|| gated.debug(black_box("Discarded at the gate")));
    });

    group.finish();
}

fn bench_filter_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_chain");
    group.throughput(Throughput::Elements(1));

    for depth in [1usize, 4, 16] {
        let composite = (0..depth).fold(CompositeFilter::new(CompositeMode::And), |f, _| {
            f.with(Arc::new(RegexFilter::new("^GET ", false).expect("valid regex")))
        });
        let logger = Logger::builder("bench")
            .filter(Arc::new(composite))
            .sink(Arc::new(NullSink::new()))
            .build();

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| logger.info(black_box("GET /health 200")));
        });
    }

    group.finish();
}

// ============================================================================
// Async pipeline
// ============================================================================

fn bench_async_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_logging");
    group.throughput(Throughput::Elements(1));

    for policy in [OverflowPolicy::DropNewest, OverflowPolicy::Block] {
        let logger = Arc::new(null_logger("bench"));
        let async_logger = AsyncLogger::builder(logger)
            .capacity(8192)
            .overflow_policy(policy.clone())
            .build()
            .expect("Failed to start worker");

        group.bench_function(format!("{:?}", policy), |b| {
            b.iter(|| async_logger.info(black_box("Queued message")));
        });
        async_logger.shutdown();
    }

    group.finish();
}

// ============================================================================
// Formatting and sinks
// ============================================================================

fn bench_formatter(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatter");
    group.throughput(Throughput::Elements(1));

    let default = Formatter::default();
    group.bench_function("default_pattern", |b| {
        b.iter(|| default.format(black_box("svc"), LogLevel::Info, black_box("payload")));
    });

    let plain = Formatter::with_pattern("[%l] %n: %v").expect("valid pattern");
    group.bench_function("no_timestamp", |b| {
        b.iter(|| plain.format(black_box("svc"), LogLevel::Info, black_box("payload")));
    });

    group.finish();
}

fn bench_file_sinks(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_sinks");
    group.throughput(Throughput::Elements(1));
    let dir = TempDir::new().expect("Failed to create temp dir");

    let rotating = RotatingFileSink::new(dir.path().join("rotating.log"), 1024 * 1024, 3)
        .expect("Failed to create sink");
    group.bench_function("rotating", |b| {
        b.iter(|| rotating.log("bench", LogLevel::Info, black_box("rotating file line")));
    });

    for kind in [CompressionType::Gzip, CompressionType::Zstd] {
        let options = CompressionOptions {
            kind,
            ..CompressionOptions::default()
        };
        let path = dir.path().join(format!("compressed-{:?}.log", kind));
        let sink = CompressedFileSink::new(path, 256 * 1024, 3, options).expect("Failed to create sink");
        group.bench_function(format!("compressed_{:?}", kind), |b| {
            b.iter(|| sink.log("bench", LogLevel::Info, black_box("compressed file line")));
        });
    }

    #[cfg(unix)]
    {
        let crash = rust_log_pipeline::sinks::SignalSafeSink::new(dir.path().join("crash.log"), 64 * 1024);
        group.bench_function("signal_safe", |b| {
            b.iter(|| crash.log("bench", LogLevel::Error, black_box("crash line")));
        });
    }

    group.finish();
}

// ============================================================================
// Health
// ============================================================================

fn bench_health(c: &mut Criterion) {
    let registry = HealthRegistry::new();
    let loggers: Vec<Arc<Logger>> = (0..32)
        .map(|i| Arc::new(null_logger(&format!("svc-{}", i))))
        .collect();
    for logger in &loggers {
        registry.register_logger(logger.name(), logger);
        logger.info("warm up");
    }

    c.bench_function("health_check_all_32", |b| {
        b.iter(|| black_box(registry.check_all()));
    });
    c.bench_function("health_export_json_32", |b| {
        b.iter(|| black_box(registry.export_json()));
    });
}

criterion_group!(
    benches,
    bench_sync_logging,
    bench_filter_chain,
    bench_async_logging,
    bench_formatter,
    bench_file_sinks,
    bench_health,
);
criterion_main!(benches);
