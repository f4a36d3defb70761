//! HTTP client for a remote simulation service.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` so a slow
//! service never blocks the event loop that handles pointer input.

use std::time::Duration;

use async_trait::async_trait;
use lineage_core::TransactionStep;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ServiceError;
use crate::traits::SimulationService;
use crate::wire::{InitResponse, ProcessResponse, ResetResponse};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to a service exposing:
///
/// - `GET {base}/transaction/steps`
/// - `GET {base}/transaction/init`
/// - `GET {base}/transaction/{id}/process?step_index={i}`
/// - `GET {base}/transaction/{id}/reset`
#[derive(Debug, Clone)]
pub struct HttpSimulationService {
    base_url: String,
    timeout: Duration,
}

impl HttpSimulationService {
    pub fn new(base_url: &str) -> Self {
        HttpSimulationService {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full URL for a path below the base.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T>(&self, path: String) -> Result<T, ServiceError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = self.url(&path);
        let timeout = self.timeout;
        debug!(%url, "service request");

        tokio::task::spawn_blocking(move || {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                .build()
                .into();

            let response = agent.get(&url).call().map_err(|e| match e {
                ureq::Error::StatusCode(status) => ServiceError::Status {
                    url: url.clone(),
                    status,
                },
                other => ServiceError::Transport {
                    url: url.clone(),
                    message: other.to_string(),
                },
            })?;

            response
                .into_body()
                .read_json::<T>()
                .map_err(|e| ServiceError::Decode {
                    url,
                    message: e.to_string(),
                })
        })
        .await
        .map_err(|e| ServiceError::Join(e.to_string()))?
    }
}

#[async_trait]
impl SimulationService for HttpSimulationService {
    async fn fetch_steps(&self) -> Result<Vec<TransactionStep>, ServiceError> {
        self.get_json("transaction/steps".to_string()).await
    }

    async fn initialize(&self) -> Result<InitResponse, ServiceError> {
        self.get_json("transaction/init".to_string()).await
    }

    async fn process_step(
        &self,
        transaction_id: &str,
        step_index: usize,
    ) -> Result<ProcessResponse, ServiceError> {
        self.get_json(format!(
            "transaction/{}/process?step_index={}",
            transaction_id, step_index
        ))
        .await
    }

    async fn reset(&self, transaction_id: &str) -> Result<ResetResponse, ServiceError> {
        self.get_json(format!("transaction/{}/reset", transaction_id))
            .await
    }
}
