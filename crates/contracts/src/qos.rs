//! Per-topic quality-of-service policy

use std::fmt;

use serde::{Deserialize, Serialize};

/// Delivery reliability
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    /// Messages may be dropped when a subscriber queue is full; no retransmission
    #[default]
    BestEffort,
    /// The subscriber queue grows past its depth instead of dropping
    Reliable,
}

impl fmt::Display for Reliability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BestEffort => write!(f, "best_effort"),
            Self::Reliable => write!(f, "reliable"),
        }
    }
}

/// Message durability for late-joining subscribers
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// No history: subscribers only see messages published after they join
    #[default]
    Volatile,
    /// The topic retains its most recent message and delivers it to new
    /// subscribers (transient-local semantics)
    Persistent,
}

impl fmt::Display for Durability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volatile => write!(f, "volatile"),
            Self::Persistent => write!(f, "persistent"),
        }
    }
}

/// Which end of a full best-effort queue loses
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// Reject the incoming message
    #[default]
    DropNewest,
    /// Evict the oldest queued message to admit the incoming one
    DropOldest,
}

/// Per-topic QoS policy
///
/// The pipeline's own topics run `best_effort` + `volatile` +
/// `min_separation_seconds = 0`: a slow or absent subscriber misses
/// messages, late joiners get no history, and pacing is the publisher's
/// responsibility, not the bus's.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicQos {
    /// Delivery reliability
    #[serde(default)]
    pub reliability: Reliability,

    /// History for late joiners
    #[serde(default)]
    pub durability: Durability,

    /// Minimum spacing between deliveries to one subscriber (seconds);
    /// 0 = no throttling beyond the drop policy
    #[serde(default)]
    pub min_separation_seconds: f64,

    /// Bounded queue depth per subscriber
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Full-queue behavior under best-effort reliability
    #[serde(default)]
    pub drop_policy: DropPolicy,
}

fn default_queue_depth() -> usize {
    100
}

impl Default for TopicQos {
    fn default() -> Self {
        Self {
            reliability: Reliability::default(),
            durability: Durability::default(),
            min_separation_seconds: 0.0,
            queue_depth: default_queue_depth(),
            drop_policy: DropPolicy::default(),
        }
    }
}

impl fmt::Display for TopicQos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QoS({}, {}, depth={}",
            self.reliability, self.durability, self.queue_depth
        )?;
        if self.min_separation_seconds > 0.0 {
            write!(f, ", min_sep={}s", self.min_separation_seconds)?;
        }
        write!(f, ")")
    }
}
