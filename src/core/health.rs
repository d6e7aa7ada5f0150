//! Health checks over logger metrics
//!
//! [`HealthChecker`] grades a [`MetricsSnapshot`] against two-tier
//! thresholds. [`HealthRegistry`] tracks loggers by name through weak
//! references, so a dropped logger simply disappears from the report.

use super::logger::Logger;
use super::metrics::MetricsSnapshot;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-tier thresholds
///
/// A value above `*_healthy` degrades the logger; a value at or above
/// `*_degraded` makes it unhealthy. Rates are fractions in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    pub max_drop_rate_healthy: f64,
    pub max_drop_rate_degraded: f64,
    pub max_error_rate_healthy: f64,
    pub max_error_rate_degraded: f64,
    pub max_latency_us_healthy: u64,
    pub max_latency_us_degraded: u64,
    pub max_queue_usage_healthy: f64,
    pub max_queue_usage_degraded: f64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            max_drop_rate_healthy: 0.01,
            max_drop_rate_degraded: 0.05,
            max_error_rate_healthy: 0.001,
            max_error_rate_degraded: 0.01,
            max_latency_us_healthy: 10_000,
            max_latency_us_degraded: 50_000,
            max_queue_usage_healthy: 0.7,
            max_queue_usage_degraded: 0.9,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub metrics: MetricsSnapshot,
    pub drop_rate: f64,
    pub error_rate: f64,
    pub queue_usage: f64,
    pub queue_full_warning: bool,
    pub high_latency_warning: bool,
}

impl HealthCheckResult {
    /// Unhealthy result carrying only a message (unknown or expired logger)
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message: message.into(),
            timestamp: Utc::now(),
            metrics: MetricsSnapshot::default(),
            drop_rate: 0.0,
            error_rate: 0.0,
            queue_usage: 0.0,
            queue_full_warning: false,
            high_latency_warning: false,
        }
    }

    /// JSON document; rates are reported as percentages
    pub fn to_value(&self) -> Value {
        json!({
            "status": self.status.as_str(),
            "message": self.message,
            "timestamp": self.timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            "metrics": {
                "messages_logged": self.metrics.messages_logged,
                "messages_dropped": self.metrics.messages_dropped,
                "messages_filtered": self.metrics.messages_filtered,
                "errors": self.metrics.errors,
                "messages_per_second": self.metrics.messages_per_second,
                "avg_latency_us": self.metrics.avg_latency_us,
                "max_latency_us": self.metrics.max_latency_us,
                "queue_depth": self.metrics.queue_depth,
                "max_queue_depth": self.metrics.max_queue_depth,
            },
            "indicators": {
                "drop_rate": self.drop_rate * 100.0,
                "error_rate": self.error_rate * 100.0,
                "queue_full_warning": self.queue_full_warning,
                "high_latency_warning": self.high_latency_warning,
            },
        })
    }

    pub fn to_json(&self) -> String {
        pretty(&self.to_value())
    }
}

impl fmt::Display for HealthCheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;
        writeln!(f, "Health Status: {}", self.status.as_str().to_uppercase())?;
        writeln!(f, "Message: {}", self.message)?;
        writeln!(f, "Messages Logged: {}", m.messages_logged)?;
        writeln!(
            f,
            "Messages Dropped: {} ({:.2}%)",
            m.messages_dropped,
            self.drop_rate * 100.0
        )?;
        writeln!(f, "Messages Filtered: {}", m.messages_filtered)?;
        writeln!(f, "Errors: {} ({:.2}%)", m.errors, self.error_rate * 100.0)?;
        writeln!(f, "Throughput: {:.2} msg/sec", m.messages_per_second)?;
        writeln!(f, "Avg Latency: {:.2} us", m.avg_latency_us)?;
        writeln!(f, "Max Latency: {} us", m.max_latency_us)?;
        writeln!(f, "Queue Depth: {}/{}", m.queue_depth, m.max_queue_depth)?;
        if self.queue_full_warning {
            writeln!(f, "Warning: Queue near capacity")?;
        }
        if self.high_latency_warning {
            writeln!(f, "Warning: High latency detected")?;
        }
        Ok(())
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct HealthChecker {
    config: HealthCheckConfig,
}

impl HealthChecker {
    pub fn new(config: HealthCheckConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HealthCheckConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: HealthCheckConfig) {
        self.config = config;
    }

    /// Grade a logger using its own metrics and published queue capacity
    pub fn check_logger(&self, logger: &Logger) -> HealthCheckResult {
        let metrics = logger.metrics();
        self.check_metrics(&metrics.snapshot(), metrics.queue_capacity())
    }

    /// Grade a snapshot; `queue_capacity == 0` means no queue (usage 0)
    pub fn check_metrics(&self, snapshot: &MetricsSnapshot, queue_capacity: usize) -> HealthCheckResult {
        let attempts = snapshot.messages_logged + snapshot.messages_dropped;
        let drop_rate = ratio(snapshot.messages_dropped, attempts);
        let error_rate = ratio(snapshot.errors, snapshot.messages_logged);
        let queue_usage = if queue_capacity > 0 {
            snapshot.queue_depth as f64 / queue_capacity as f64
        } else {
            0.0
        };
        let latency = snapshot.max_latency_us;

        let status = self.determine_status(drop_rate, error_rate, latency, queue_usage);
        let message = self.describe(status, drop_rate, error_rate, latency, queue_usage);

        HealthCheckResult {
            status,
            message,
            timestamp: Utc::now(),
            metrics: snapshot.clone(),
            drop_rate,
            error_rate,
            queue_usage,
            queue_full_warning: queue_usage >= self.config.max_queue_usage_degraded,
            high_latency_warning: latency >= self.config.max_latency_us_degraded,
        }
    }

    /// Worst tier across drop rate, error rate, latency and queue usage
    pub fn determine_status(
        &self,
        drop_rate: f64,
        error_rate: f64,
        max_latency_us: u64,
        queue_usage: f64,
    ) -> HealthStatus {
        let c = &self.config;
        [
            tier(drop_rate, c.max_drop_rate_healthy, c.max_drop_rate_degraded),
            tier(error_rate, c.max_error_rate_healthy, c.max_error_rate_degraded),
            tier(
                max_latency_us as f64,
                c.max_latency_us_healthy as f64,
                c.max_latency_us_degraded as f64,
            ),
            tier(queue_usage, c.max_queue_usage_healthy, c.max_queue_usage_degraded),
        ]
        .into_iter()
        .max()
        .unwrap_or(HealthStatus::Healthy)
    }

    fn describe(
        &self,
        status: HealthStatus,
        drop_rate: f64,
        error_rate: f64,
        latency: u64,
        queue_usage: f64,
    ) -> String {
        let c = &self.config;
        let (prefix, over_drop, over_error, over_latency, over_queue) = match status {
            HealthStatus::Healthy => return "All systems operational".to_string(),
            HealthStatus::Degraded => (
                "Performance degraded",
                drop_rate > c.max_drop_rate_healthy,
                error_rate > c.max_error_rate_healthy,
                latency > c.max_latency_us_healthy,
                queue_usage > c.max_queue_usage_healthy,
            ),
            HealthStatus::Unhealthy => (
                "Critical issues detected",
                drop_rate >= c.max_drop_rate_degraded,
                error_rate >= c.max_error_rate_degraded,
                latency >= c.max_latency_us_degraded,
                queue_usage >= c.max_queue_usage_degraded,
            ),
        };

        let mut issues = Vec::new();
        if over_drop {
            issues.push(format!("drop rate {:.2}%", drop_rate * 100.0));
        }
        if over_error {
            issues.push(format!("error rate {:.2}%", error_rate * 100.0));
        }
        if over_latency {
            issues.push(format!("latency {}us", latency));
        }
        if over_queue {
            issues.push(format!("queue usage {:.2}%", queue_usage * 100.0));
        }
        format!("{}: {}", prefix, issues.join(", "))
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn tier(value: f64, healthy: f64, degraded: f64) -> HealthStatus {
    if value >= degraded {
        HealthStatus::Unhealthy
    } else if value > healthy {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// Named loggers under health supervision
///
/// Holds only weak references: registering a logger never extends its
/// lifetime, and expired entries are skipped by [`check_all`](Self::check_all).
///
/// # Example
///
/// ```
/// use rust_log_pipeline::prelude::*;
/// use std::sync::Arc;
///
/// let registry = HealthRegistry::new();
/// let logger = Arc::new(Logger::new("api"));
/// registry.register_logger("api", &logger);
///
/// assert_eq!(registry.get_overall_status(), HealthStatus::Healthy);
/// drop(logger);
/// assert!(registry.check_all().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct HealthRegistry {
    loggers: Mutex<HashMap<String, Weak<Logger>>>,
    checker: RwLock<HealthChecker>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checker(checker: HealthChecker) -> Self {
        Self {
            loggers: Mutex::new(HashMap::new()),
            checker: RwLock::new(checker),
        }
    }

    /// Register (or replace) a logger under `name`
    pub fn register_logger(&self, name: impl Into<String>, logger: &Arc<Logger>) {
        self.loggers.lock().insert(name.into(), Arc::downgrade(logger));
    }

    pub fn unregister_logger(&self, name: &str) {
        self.loggers.lock().remove(name);
    }

    pub fn set_health_checker(&self, checker: HealthChecker) {
        *self.checker.write() = checker;
    }

    pub fn len(&self) -> usize {
        self.loggers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.lock().is_empty()
    }

    /// Remove entries whose logger has been dropped, returning how many
    pub fn prune_expired(&self) -> usize {
        let mut loggers = self.loggers.lock();
        let before = loggers.len();
        loggers.retain(|_, weak| weak.strong_count() > 0);
        before - loggers.len()
    }

    pub fn check_logger(&self, name: &str) -> HealthCheckResult {
        let entry = self.loggers.lock().get(name).cloned();
        match entry {
            None => HealthCheckResult::unavailable(format!("Logger not found: {}", name)),
            Some(weak) => match weak.upgrade() {
                Some(logger) => self.checker.read().check_logger(&logger),
                None => HealthCheckResult::unavailable(format!("Logger expired: {}", name)),
            },
        }
    }

    /// Results for every live logger, ordered by name
    pub fn check_all(&self) -> BTreeMap<String, HealthCheckResult> {
        // Upgrade under the lock, grade after releasing it
        let live: Vec<(String, Arc<Logger>)> = {
            let loggers = self.loggers.lock();
            loggers
                .iter()
                .filter_map(|(name, weak)| weak.upgrade().map(|logger| (name.clone(), logger)))
                .collect()
        };

        let checker = self.checker.read();
        live.into_iter()
            .map(|(name, logger)| {
                let result = checker.check_logger(&logger);
                (name, result)
            })
            .collect()
    }

    /// Worst status across live loggers; healthy when there are none
    pub fn get_overall_status(&self) -> HealthStatus {
        overall(&self.check_all())
    }

    pub fn export_value(&self) -> Value {
        let results = self.check_all();
        let loggers: Vec<Value> = results
            .iter()
            .map(|(name, result)| {
                let mut entry = result.to_value();
                if let Value::Object(ref mut map) = entry {
                    map.insert("name".to_string(), Value::String(name.clone()));
                }
                entry
            })
            .collect();

        json!({
            "overall_status": overall(&results).as_str(),
            "loggers": loggers,
        })
    }

    pub fn export_json(&self) -> String {
        pretty(&self.export_value())
    }
}

fn overall(results: &BTreeMap<String, HealthCheckResult>) -> HealthStatus {
    results
        .values()
        .map(|r| r.status)
        .max()
        .unwrap_or(HealthStatus::Healthy)
}

/// JSON body for a health endpoint: one logger by name, or the whole registry
pub fn handle_health_check_request(registry: &HealthRegistry, logger_name: Option<&str>) -> String {
    match logger_name {
        Some(name) => registry.check_logger(name).to_json(),
        None => registry.export_json(),
    }
}
