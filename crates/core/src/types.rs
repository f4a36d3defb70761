//! Typed structs for the transaction simulation data model.
//!
//! Snapshot values are kept as `serde_json::Value`: the core never
//! interprets them, it only serializes them for display.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// The transaction's field/value state at the active step.
///
/// Backed by an insertion-ordered map so table rows follow the order the
/// service produced the fields in.
pub type Snapshot = serde_json::Map<String, serde_json::Value>;

// ── Steps ───────────────────────────────────────────────────────────

/// One named stage in the processing pipeline.
///
/// The step's order is its position in the sequence returned by the
/// service; it is never re-sorted on the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionStep {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub department: String,
    #[serde(default)]
    pub description: String,
}

impl TransactionStep {
    pub fn new(id: impl Into<String>, name: &str, department: &str, description: &str) -> Self {
        TransactionStep {
            id: id.into(),
            name: name.to_string(),
            department: department.to_string(),
            description: description.to_string(),
        }
    }
}

/// Step ids arrive as integers from some backends and strings from others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "step id must be a string or number, got {}",
            other
        ))),
    }
}

// ── Transformations ─────────────────────────────────────────────────

/// The kind of change a transformation applied to a field.
///
/// Unknown action strings are kept verbatim in `Other` rather than
/// rejected, so a newer backend cannot break the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransformAction {
    Added,
    Renamed,
    Modified,
    Other(String),
}

impl TransformAction {
    pub fn as_str(&self) -> &str {
        match self {
            TransformAction::Added => "added",
            TransformAction::Renamed => "renamed",
            TransformAction::Modified => "modified",
            TransformAction::Other(s) => s,
        }
    }
}

impl From<String> for TransformAction {
    fn from(s: String) -> Self {
        match s.as_str() {
            "added" => TransformAction::Added,
            "renamed" => TransformAction::Renamed,
            "modified" => TransformAction::Modified,
            _ => TransformAction::Other(s),
        }
    }
}

impl From<TransformAction> for String {
    fn from(action: TransformAction) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for TransformAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field-level change attributed to the most recent step transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transformation {
    pub field: String,
    pub action: TransformAction,
    #[serde(default)]
    pub description: String,
}

impl Transformation {
    pub fn new(field: &str, action: TransformAction, description: &str) -> Self {
        Transformation {
            field: field.to_string(),
            action,
            description: description.to_string(),
        }
    }
}

// ── Geometry ────────────────────────────────────────────────────────

/// A pixel position or displacement in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn is_origin(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned rectangle in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_id_accepts_number_or_string() {
        let numeric: TransactionStep = serde_json::from_value(serde_json::json!({
            "id": 3, "name": "Risk", "department": "Risk Management", "description": "d"
        }))
        .unwrap();
        assert_eq!(numeric.id, "3");

        let text: TransactionStep = serde_json::from_value(serde_json::json!({
            "id": "capture", "name": "Capture", "department": "Front Office"
        }))
        .unwrap();
        assert_eq!(text.id, "capture");
        assert_eq!(text.description, "");
    }

    #[test]
    fn unknown_action_is_preserved() {
        let t: Transformation = serde_json::from_value(serde_json::json!({
            "field": "x", "action": "merged", "description": ""
        }))
        .unwrap();
        assert_eq!(t.action, TransformAction::Other("merged".to_string()));
        assert_eq!(
            serde_json::to_value(&t).unwrap()["action"],
            serde_json::json!("merged")
        );
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(10.0, 10.0, 20.0, 5.0);
        assert!(r.contains(Point::new(10.0, 10.0)));
        assert!(r.contains(Point::new(29.9, 14.9)));
        assert!(!r.contains(Point::new(30.0, 12.0)));
        assert!(!r.contains(Point::new(15.0, 15.0)));
    }
}
