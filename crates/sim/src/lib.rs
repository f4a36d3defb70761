//! lineage-sim: the transaction simulation state machine and its driver.
//!
//! [`Session`] is a pure reducer over the simulation lifecycle,
//! [`Runtime`] executes the commands it emits against a
//! [`SimulationService`](lineage_service::SimulationService), and [`App`]
//! ties the session to the viewport, the floating panel and pointer routing.

pub mod app;
pub mod runtime;
pub mod session;

pub use app::{App, Intent};
pub use runtime::Runtime;
pub use session::{
    Command, Completion, ErrorKind, ResetTicket, Session, SessionError, Status, StepTicket,
    DEFAULT_SETTLE,
};
