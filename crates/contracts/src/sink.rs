//! CountSink trait - persistence output interface
//!
//! Defines the abstract interface for count persistence.

use crate::ContractError;

/// Count persistence trait
///
/// All persistence implementations must implement this trait. Writes carry
/// only device identity and count; timestamps stay in the metrics store.
#[trait_variant::make(CountSink: Send)]
pub trait LocalCountSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Append one `(device_id, count)` row
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn append(&mut self, device_id: &str, count: u32) -> Result<(), ContractError>;

    /// Flush buffered rows (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
