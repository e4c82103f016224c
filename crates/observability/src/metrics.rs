//! Pipeline metric recording and aggregation
//!
//! Counter/gauge helpers for the coordinator plus an in-memory aggregator
//! that turns the collector's final snapshot into a run summary.

use contracts::{LatencySample, ThroughputWindow};
use metrics::gauge;

/// Record a subscription's delivery counters.
pub fn record_delivery_counters(topic: &str, delivered: u64, dropped: u64, filtered: u64) {
    gauge!("crowdmeter_bus_delivered", "topic" => topic.to_string()).set(delivered as f64);
    gauge!("crowdmeter_bus_dropped", "topic" => topic.to_string()).set(dropped as f64);
    gauge!("crowdmeter_bus_filtered", "topic" => topic.to_string()).set(filtered as f64);
}

/// Latency/throughput aggregator
///
/// Aggregates samples in memory for the end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct LatencyThroughputAggregator {
    /// Latency statistics (milliseconds)
    pub latency_ms: RunningStats,

    /// Throughput window rate statistics (messages/second)
    pub rate: RunningStats,

    /// Samples flagged as clock skew
    pub skewed_samples: u64,

    /// Completed throughput windows observed
    pub windows: u64,
}

impl LatencyThroughputAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one latency sample
    pub fn update_sample(&mut self, sample: &LatencySample) {
        self.latency_ms.push(sample.value_ms);
        if sample.clock_skewed {
            self.skewed_samples += 1;
        }
    }

    /// Fold in one completed throughput window
    pub fn update_window(&mut self, window: &ThroughputWindow) {
        self.windows += 1;
        self.rate.push(window.rate());
    }

    /// Generate the summary report
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            samples: self.latency_ms.count(),
            skewed_samples: self.skewed_samples,
            windows: self.windows,
            latency_ms: StatsSummary::from(&self.latency_ms),
            rate: StatsSummary::from(&self.rate),
        }
    }
}

/// Run summary
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub samples: u64,
    pub skewed_samples: u64,
    pub windows: u64,
    pub latency_ms: StatsSummary,
    pub rate: StatsSummary,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Metrics Summary ===")?;
        writeln!(f, "Latency samples: {}", self.samples)?;
        writeln!(f, "Clock-skewed samples: {}", self.skewed_samples)?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;
        writeln!(f, "Throughput windows: {}", self.windows)?;
        writeln!(f, "Rate (msg/s): {}", self.rate)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics calculator (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a new value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Sample count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean value
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Minimum value
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Maximum value
    pub fn max(&self) -> f64 {
        self.max
    }
}
