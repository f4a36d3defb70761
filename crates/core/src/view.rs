//! Presentation model: flow diagram, lineage graph and data table.
//!
//! [`build_view`] turns the current simulation, viewport and panel state
//! into a plain data structure. It owns no state of its own; hosts
//! re-run it after every transition. [`render_text`] draws that structure
//! for terminal front ends.

use std::fmt::Write as _;

use serde::Serialize;

use crate::diff::{diff_snapshot, FieldDiff};
use crate::panel::FloatingPanel;
use crate::types::{Snapshot, TransactionStep, TransformAction, Transformation};
use crate::viewport::Viewport;

// ── Flow diagram ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Completed,
    Active,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowNode {
    pub id: String,
    pub name: String,
    pub department: String,
    /// Tooltip text.
    pub description: String,
    pub state: NodeState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorState {
    Completed,
    Processing,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowDiagram {
    pub nodes: Vec<FlowNode>,
    /// `connectors[i]` joins `nodes[i]` and `nodes[i + 1]`.
    pub connectors: Vec<ConnectorState>,
}

/// Where the processing animation sits, if anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    /// A step call for the current step is in flight.
    InFlight,
    /// The step just completed and the processing flag is still held.
    Settling,
}

pub fn flow_diagram(steps: &[TransactionStep], current: usize, activity: Activity) -> FlowDiagram {
    let nodes = steps
        .iter()
        .enumerate()
        .map(|(i, step)| FlowNode {
            id: step.id.clone(),
            name: step.name.clone(),
            department: step.department.clone(),
            description: step.description.clone(),
            state: if i < current {
                NodeState::Completed
            } else if i == current {
                NodeState::Active
            } else {
                NodeState::Pending
            },
        })
        .collect();

    let processing = match activity {
        Activity::Idle => None,
        Activity::InFlight => Some(current),
        Activity::Settling => current.checked_sub(1),
    };
    let connectors = (0..steps.len().saturating_sub(1))
        .map(|i| {
            if processing == Some(i) {
                ConnectorState::Processing
            } else if i < current {
                ConnectorState::Completed
            } else {
                ConnectorState::Pending
            }
        })
        .collect();

    FlowDiagram { nodes, connectors }
}

// ── Lineage graph ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Source,
    Process,
    DataField,
    Target,
}

/// One node of the data lineage graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineageStage {
    pub title: &'static str,
    pub kind: StageKind,
    /// Step index from which the stage is lit.
    pub active_from: usize,
    /// Feeds into the preceding process rather than the main chain.
    pub side_input: bool,
    pub fields: Vec<(&'static str, TransformAction)>,
}

fn stage(
    title: &'static str,
    kind: StageKind,
    active_from: usize,
    fields: &[(&'static str, TransformAction)],
) -> LineageStage {
    LineageStage {
        title,
        kind,
        active_from,
        side_input: false,
        fields: fields.to_vec(),
    }
}

/// The fixed lineage of the trade processing pipeline.
pub fn lineage_stages() -> Vec<LineageStage> {
    use StageKind::*;
    use TransformAction::{Added, Renamed};

    let mut market_data = stage("Market Data", Source, 2, &[]);
    market_data.side_input = true;

    vec![
        stage("Trading System", Source, 0, &[]),
        stage("Trade Capture", Process, 0, &[]),
        stage(
            "Basic Trade Data",
            DataField,
            0,
            &[
                ("tradeId", Added),
                ("clientId", Added),
                ("securityId", Added),
                ("quantity", Added),
                ("price", Added),
            ],
        ),
        stage("Trade Validation", Process, 1, &[]),
        stage(
            "Validated Trade",
            DataField,
            1,
            &[("validationStatus", Added), ("validationTimestamp", Added)],
        ),
        stage("Trade Enrichment", Process, 2, &[]),
        market_data,
        stage(
            "Enriched Trade",
            DataField,
            2,
            &[
                ("securityName", Added),
                ("marketValue", Added),
                ("currency", Added),
                ("settlementDate", Added),
            ],
        ),
        stage("Risk Calculation", Process, 3, &[]),
        stage(
            "Risk Metrics",
            DataField,
            3,
            &[("varValue", Added), ("deltaValue", Added), ("gammaValue", Added)],
        ),
        stage("Settlement", Process, 4, &[]),
        stage(
            "Settlement Instructions",
            DataField,
            4,
            &[
                ("valueCurrency", Renamed),
                ("settlementCurrency", Added),
                ("settlementInstructions", Added),
                ("accountDetails", Added),
            ],
        ),
        stage("Regulatory Reporting", Process, 5, &[]),
        stage(
            "Regulatory Report",
            Target,
            5,
            &[
                ("securityType", Added),
                ("tradingDesk", Added),
                ("reportingStatus", Added),
                ("regulatoryId", Added),
            ],
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineageNode {
    #[serde(flatten)]
    pub stage: LineageStage,
    pub active: bool,
}

pub fn lineage_graph(current: usize) -> Vec<LineageNode> {
    lineage_stages()
        .into_iter()
        .map(|stage| LineageNode {
            active: current >= stage.active_from,
            stage,
        })
        .collect()
}

// ── Transformations ─────────────────────────────────────────────────

pub fn transformation_label(action: &TransformAction) -> &'static str {
    match action {
        TransformAction::Added => "Add Field",
        TransformAction::Renamed => "Rename Field",
        TransformAction::Modified => "Modify Field",
        TransformAction::Other(_) => "Transform",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformationItem {
    pub label: &'static str,
    pub field: String,
    pub description: String,
}

// ── Whole view ──────────────────────────────────────────────────────

/// An error shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBanner {
    pub message: String,
    /// Blocking errors replace the whole view; others sit above it.
    pub blocking: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ActionArea {
    Advance { processing: bool },
    Complete,
}

/// Everything [`build_view`] needs, borrowed from the owning state records.
pub struct ViewInput<'a> {
    pub loading: bool,
    pub error: Option<ErrorBanner>,
    pub transaction_id: Option<&'a str>,
    pub steps: &'a [TransactionStep],
    pub current_step: usize,
    pub snapshot: &'a Snapshot,
    pub transformations: &'a [Transformation],
    pub activity: Activity,
    pub viewport: &'a Viewport,
    pub panel: &'a FloatingPanel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewportStatus {
    pub zoom_percent: i64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub show_reset_position: bool,
    pub css_transform: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub offset_y: f64,
    pub minimized: bool,
    /// Empty while minimized.
    pub rows: Vec<FieldDiff>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "screen")]
pub enum View {
    Loading,
    Failed {
        message: String,
    },
    Simulation {
        transaction_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        notice: Option<String>,
        flow: FlowDiagram,
        current: Option<FlowNode>,
        panel: PanelView,
        transformations: Vec<TransformationItem>,
        action: ActionArea,
        lineage: Vec<LineageNode>,
        viewport: ViewportStatus,
    },
}

pub fn build_view(input: &ViewInput<'_>) -> View {
    if let Some(banner) = input.error.as_ref().filter(|b| b.blocking) {
        return View::Failed {
            message: banner.message.clone(),
        };
    }
    if input.loading {
        return View::Loading;
    }

    let flow = flow_diagram(input.steps, input.current_step, input.activity);
    let current = flow.nodes.get(input.current_step).cloned();

    let rows = if input.panel.body_visible() {
        diff_snapshot(input.snapshot, input.transformations)
    } else {
        Vec::new()
    };

    let last = input.steps.len().saturating_sub(1);
    let action = if input.current_step < last {
        ActionArea::Advance {
            processing: input.activity != Activity::Idle,
        }
    } else {
        ActionArea::Complete
    };

    let transform = input.viewport.transform();
    View::Simulation {
        transaction_id: input.transaction_id.unwrap_or_default().to_string(),
        notice: input.error.as_ref().map(|b| b.message.clone()),
        flow,
        current,
        panel: PanelView {
            offset_y: input.panel.offset().y,
            minimized: input.panel.is_minimized(),
            rows,
        },
        transformations: input
            .transformations
            .iter()
            .map(|t| TransformationItem {
                label: transformation_label(&t.action),
                field: t.field.clone(),
                description: t.description.clone(),
            })
            .collect(),
        action,
        lineage: lineage_graph(input.current_step),
        viewport: ViewportStatus {
            zoom_percent: (transform.scale * 100.0).round() as i64,
            offset_x: transform.translate.x,
            offset_y: transform.translate.y,
            show_reset_position: input.viewport.can_reset_position(),
            css_transform: transform.to_css(),
        },
    }
}

// ── Text rendering ──────────────────────────────────────────────────

pub fn render_text(view: &View) -> String {
    let mut out = String::new();
    match view {
        View::Loading => out.push_str("Loading transaction data...\n"),
        View::Failed { message } => {
            let _ = writeln!(out, "error: {}", message);
        }
        View::Simulation {
            transaction_id,
            notice,
            flow,
            current,
            panel,
            transformations,
            action,
            lineage,
            viewport,
        } => {
            out.push_str("Transaction Lineage Simulation\n");
            let _ = writeln!(out, "Transaction ID: {}", transaction_id);
            if let Some(notice) = notice {
                let _ = writeln!(out, "! {}", notice);
            }
            out.push('\n');
            render_flow(&mut out, flow);

            if let Some(node) = current {
                let _ = writeln!(out, "\n{} [{}]", node.name, node.department);
                if !node.description.is_empty() {
                    let _ = writeln!(out, "  {}", node.description);
                }
            }

            let _ = writeln!(
                out,
                "\nTransaction Data{}",
                if panel.minimized { " (minimized)" } else { "" }
            );
            if !panel.minimized {
                render_table(&mut out, &panel.rows);
            }

            if !transformations.is_empty() {
                out.push_str("\nTransformations in this Step\n");
                for t in transformations {
                    let _ = writeln!(out, "  {:<13} {:<24} {}", t.label, t.field, t.description);
                }
            }

            out.push('\n');
            match action {
                ActionArea::Advance { processing: true } => out.push_str("[ Processing... ]\n"),
                ActionArea::Advance { processing: false } => {
                    out.push_str("[ Process to Next Step -> ]\n")
                }
                ActionArea::Complete => out.push_str(
                    "Transaction processing complete!  [ Start New Transaction ]\n",
                ),
            }

            out.push_str("\nData Lineage Graph\n");
            for node in lineage.iter().filter(|n| n.active) {
                let marker = if node.stage.side_input { "  +" } else { "  |" };
                let _ = write!(out, "{} {}", marker, node.stage.title);
                if !node.stage.fields.is_empty() {
                    let fields: Vec<String> = node
                        .stage
                        .fields
                        .iter()
                        .map(|(name, action)| match action {
                            TransformAction::Added => name.to_string(),
                            other => format!("{} ({})", name, other),
                        })
                        .collect();
                    let _ = write!(out, ": {}", fields.join(", "));
                }
                out.push('\n');
            }

            let _ = writeln!(
                out,
                "\nzoom {}%  offset ({}, {}){}",
                viewport.zoom_percent,
                viewport.offset_x,
                viewport.offset_y,
                if viewport.show_reset_position {
                    "  [reset position]"
                } else {
                    ""
                }
            );
        }
    }
    out
}

fn render_flow(out: &mut String, flow: &FlowDiagram) {
    for (i, node) in flow.nodes.iter().enumerate() {
        let badge = match node.state {
            NodeState::Completed => "[x]".to_string(),
            NodeState::Active => format!("[{}]", i + 1),
            NodeState::Pending => format!(" {} ", i + 1),
        };
        let marker = if node.state == NodeState::Active { ">" } else { " " };
        let _ = writeln!(out, "{} {} {} ({})", marker, badge, node.name, node.department);
        if let Some(connector) = flow.connectors.get(i) {
            out.push_str(match connector {
                ConnectorState::Completed => "    |\n",
                ConnectorState::Processing => "    * processing\n",
                ConnectorState::Pending => "    :\n",
            });
        }
    }
}

fn render_table(out: &mut String, rows: &[FieldDiff]) {
    let width = rows
        .iter()
        .map(|r| r.field.len())
        .max()
        .unwrap_or(5)
        .max(5);
    let _ = writeln!(out, "  {:<width$}  {:<32}  Status", "Field", "Value");
    for row in rows {
        let marker = if row.highlighted { "*" } else { " " };
        let _ = writeln!(
            out,
            "{} {:<width$}  {:<32}  {}",
            marker,
            row.field,
            row.display_value,
            row.label.as_deref().unwrap_or("")
        );
    }
}
