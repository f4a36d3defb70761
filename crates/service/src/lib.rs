//! lineage-service: the external simulation service.
//!
//! The simulator depends only on the [`SimulationService`] trait. Three
//! implementations ship here: [`HttpSimulationService`] for a remote
//! backend, [`TradePipeline`] as the in-memory reference pipeline (also
//! what `lineage serve` exposes), and [`ScriptedService`] for tests.

pub mod error;
pub mod http;
pub mod pipeline;
pub mod scripted;
pub mod traits;
pub mod wire;

pub use error::ServiceError;
pub use http::HttpSimulationService;
pub use pipeline::{trade_steps, TradePipeline};
pub use scripted::{Call, CallKind, ScriptedService};
pub use traits::SimulationService;
pub use wire::{InitResponse, ProcessResponse, ResetResponse};
