//! lineage-core: data model and interaction state for the transaction
//! lineage simulator.
//!
//! Everything in this crate is synchronous and free of I/O:
//!
//! - [`types`] -- steps, snapshots, transformations, geometry
//! - [`diff`] -- per-field highlight status for the data table
//! - [`viewport`] -- pan/zoom state of the main visualization
//! - [`panel`] -- the draggable, minimizable data panel
//! - [`region`] -- hit-testing and pointer routing between the two
//! - [`view`] -- presentation model and text rendering

pub mod diff;
pub mod panel;
pub mod region;
pub mod types;
pub mod view;
pub mod viewport;

pub use diff::{diff_snapshot, FieldDiff};
pub use panel::FloatingPanel;
pub use region::{ControlId, Hit, Layout, PointerEvent, PointerRouter, RegionMap, Routed};
pub use types::{Point, Rect, Snapshot, TransactionStep, TransformAction, Transformation};
pub use view::{build_view, render_text, Activity, ErrorBanner, View, ViewInput};
pub use viewport::Viewport;
