//! # Collector
//!
//! The monitoring node: consumes count messages, computes per-message
//! latency samples and windowed throughput, and persists device counts.
//!
//! The metrics live in a single `MetricsStore` behind an explicit
//! `snapshot()` contract; the append-only CSV log is always written under
//! a mutual-exclusion lock because interleaved file writes are corruption,
//! not display noise.

mod collector;
mod log;
mod store;

pub use collector::{CollectorConfig, MetricsCollector};
pub use log::CsvCountLog;
pub use store::{MetricsHandle, MetricsSnapshot, MetricsStore};
