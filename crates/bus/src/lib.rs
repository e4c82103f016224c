//! # Bus
//!
//! In-process topic registry and delivery engine with per-topic QoS.
//!
//! Responsibilities:
//! - Idempotent topic creation keyed by name + payload type
//! - Typed publishers and subscriptions over shared topics
//! - QoS enforcement: bounded best-effort queues, retained messages for
//!   persistent durability, time-based delivery separation
//!
//! Delivery is non-blocking on both ends: `publish` never waits for
//! subscribers, and subscription reads return immediately (possibly
//! empty). Per-publisher ordering is preserved; ordering across distinct
//! publishers is not guaranteed.

mod metrics;
mod registry;
mod subscription;
mod topic;

pub use metrics::{DeliveryMetrics, DeliverySnapshot};
pub use registry::MessageBus;
pub use subscription::Subscription;
pub use topic::{BusMessage, Publisher, Topic};
