//! Response bodies of the simulation service, as they appear on the wire.

use lineage_core::{Snapshot, Transformation};
use serde::{Deserialize, Serialize};

/// `GET /transaction/init`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitResponse {
    pub transaction_id: String,
    pub initial_data: Snapshot,
}

/// `GET /transaction/{id}/process?step_index={i}`
///
/// The snapshot and transformations for step `i + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub current_data: Snapshot,
    #[serde(default)]
    pub transformations: Vec<Transformation>,
}

/// `GET /transaction/{id}/reset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetResponse {
    pub data: Snapshot,
}
