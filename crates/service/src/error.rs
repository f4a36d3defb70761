/// All errors that can be returned by a SimulationService implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The request never produced a response (connection refused, timeout, DNS).
    #[error("transport error calling {url}: {message}")]
    Transport { url: String, message: String },

    /// The service answered with a non-success status code.
    #[error("service returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The response body did not match the expected shape.
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// No transaction with this id is known to the service.
    #[error("unknown transaction: {transaction_id}")]
    UnknownTransaction { transaction_id: String },

    /// `process` was asked to leave a step that has no successor.
    #[error("step index {step_index} out of range for a pipeline of {step_count} steps")]
    StepOutOfRange {
        step_index: usize,
        step_count: usize,
    },

    /// A blocking worker task panicked or was cancelled.
    #[error("service task failed: {0}")]
    Join(String),

    /// Any other backend-specific failure.
    #[error("service backend error: {0}")]
    Backend(String),
}
