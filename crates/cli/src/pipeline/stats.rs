//! Pipeline statistics and metrics.

use std::time::Duration;

use bus::DeliverySnapshot;
use collector::MetricsSnapshot;
use observability::LatencyThroughputAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Frames published by the source
    pub frames_published: u64,

    /// Count messages published by the detection node
    pub counts_published: u64,

    /// Messages folded into the metrics store
    pub samples_collected: u64,

    /// Delivery counters of the frames subscription
    pub frames_delivery: DeliverySnapshot,

    /// Delivery counters of the counts subscription
    pub counts_delivery: DeliverySnapshot,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Final metrics snapshot from the collector
    pub snapshot: MetricsSnapshot,
}

impl PipelineStats {
    /// Calculate frames per second over the whole run
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Total messages lost to best-effort queues
    pub fn total_dropped(&self) -> u64 {
        self.frames_delivery.dropped + self.counts_delivery.dropped
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let mut aggregator = LatencyThroughputAggregator::new();
        for sample in &self.snapshot.latencies {
            aggregator.update_sample(sample);
        }
        for window in &self.snapshot.windows {
            aggregator.update_window(window);
        }
        let summary = aggregator.summary();

        println!("\n=== Pipeline Statistics ===\n");
        println!("Overview");
        println!("   - Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   - Frames published: {}", self.frames_published);
        println!("   - Counts published: {}", self.counts_published);
        println!("   - Samples collected: {}", self.samples_collected);
        println!("   - FPS: {:.2}", self.fps());

        println!("\nBus Delivery");
        println!(
            "   - frames: delivered={} dropped={} filtered={}",
            self.frames_delivery.delivered,
            self.frames_delivery.dropped,
            self.frames_delivery.filtered
        );
        println!(
            "   - counts: delivered={} dropped={} filtered={}",
            self.counts_delivery.delivered,
            self.counts_delivery.dropped,
            self.counts_delivery.filtered
        );

        println!("\n{summary}");

        if let Some(rate) = self.snapshot.last_rate() {
            println!("Last window rate: {rate:.2} msg/s");
        }
        println!();
    }
}
