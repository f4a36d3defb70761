use async_trait::async_trait;
use lineage_core::TransactionStep;

use crate::error::ServiceError;
use crate::wire::{InitResponse, ProcessResponse, ResetResponse};

/// The remote service that owns step data, transformations and transaction ids.
///
/// The simulator only consumes these results; it never computes them.
/// Every call is idempotent from the client's point of view except
/// [`process_step`](SimulationService::process_step), which callers must
/// not issue concurrently for the same transaction.
///
/// Implementations must be `Send + Sync + 'static` so they can be shared
/// with spawned tasks and axum handlers.
#[async_trait]
pub trait SimulationService: Send + Sync + 'static {
    /// The ordered pipeline. Its length fixes N for a session.
    async fn fetch_steps(&self) -> Result<Vec<TransactionStep>, ServiceError>;

    /// Start a new transaction and return its id and step-0 snapshot.
    async fn initialize(&self) -> Result<InitResponse, ServiceError>;

    /// Leave step `step_index`; the result is the state at `step_index + 1`.
    async fn process_step(
        &self,
        transaction_id: &str,
        step_index: usize,
    ) -> Result<ProcessResponse, ServiceError>;

    /// Return the transaction to its step-0 snapshot.
    async fn reset(&self, transaction_id: &str) -> Result<ResetResponse, ServiceError>;
}
