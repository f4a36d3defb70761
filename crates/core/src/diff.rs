//! Per-field highlight status for the data table.
//!
//! A field is highlighted when some transformation targets it with an
//! `added` or `renamed` action. `modified` never highlights, and the label
//! lookup ignores it as well, so a field touched only by a `modified`
//! transformation renders as a plain row.
//!
//! Everything here is pure: the same snapshot and transformation list
//! always produce the same rows, whatever order the transformations are in.

use serde::Serialize;

use crate::types::{Snapshot, TransformAction, Transformation};

/// Label shown for a highlighted field when no labelled transformation exists.
pub const FALLBACK_LABEL: &str = "New";

/// Highlight status of a single snapshot field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub field: String,
    /// The value as shown in the table (strings verbatim, other values as JSON).
    pub display_value: String,
    pub highlighted: bool,
    /// Status badge text; `None` for plain rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

fn highlights(action: &TransformAction) -> bool {
    matches!(action, TransformAction::Added | TransformAction::Renamed)
}

/// Whether `field` is highlighted under `transformations`.
pub fn is_highlighted(field: &str, transformations: &[Transformation]) -> bool {
    transformations
        .iter()
        .any(|t| t.field == field && highlights(&t.action))
}

/// Resolve the badge label for `field`.
///
/// Added takes precedence over renamed when both target the same field, so
/// the result does not depend on list order. Falls back to
/// [`FALLBACK_LABEL`] when no added/renamed transformation matches.
pub fn label_for(field: &str, transformations: &[Transformation]) -> String {
    let mut renamed = false;
    for t in transformations.iter().filter(|t| t.field == field) {
        match t.action {
            TransformAction::Added => return TransformAction::Added.to_string(),
            TransformAction::Renamed => renamed = true,
            _ => {}
        }
    }
    if renamed {
        TransformAction::Renamed.to_string()
    } else {
        FALLBACK_LABEL.to_string()
    }
}

/// Render a snapshot value the way the data table shows it.
pub fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compute the highlight status of every field in `snapshot`, in snapshot order.
pub fn diff_snapshot(snapshot: &Snapshot, transformations: &[Transformation]) -> Vec<FieldDiff> {
    snapshot
        .iter()
        .map(|(field, value)| {
            let highlighted = is_highlighted(field, transformations);
            FieldDiff {
                field: field.clone(),
                display_value: display_value(value),
                highlighted,
                label: highlighted.then(|| label_for(field, transformations)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> Snapshot {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn added_field_is_highlighted_with_its_action() {
        let snap = snapshot(json!({"a": 1, "b": 2}));
        let ts = vec![Transformation::new("a", TransformAction::Added, "x")];

        let rows = diff_snapshot(&snap, &ts);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].field, "a");
        assert!(rows[0].highlighted);
        assert_eq!(rows[0].label.as_deref(), Some("added"));
        assert_eq!(rows[1].field, "b");
        assert!(!rows[1].highlighted);
        assert_eq!(rows[1].label, None);
    }

    #[test]
    fn renamed_field_is_highlighted() {
        let ts = vec![Transformation::new(
            "valueCurrency",
            TransformAction::Renamed,
            "currency -> valueCurrency",
        )];
        assert!(is_highlighted("valueCurrency", &ts));
        assert_eq!(label_for("valueCurrency", &ts), "renamed");
    }

    #[test]
    fn modified_highlights_nothing_and_has_no_label() {
        let snap = snapshot(json!({"marketValue": 10.5}));
        let ts = vec![Transformation::new(
            "marketValue",
            TransformAction::Modified,
            "re-marked",
        )];
        let rows = diff_snapshot(&snap, &ts);
        assert!(!rows[0].highlighted);
        assert_eq!(rows[0].label, None);
        assert_eq!(label_for("marketValue", &ts), FALLBACK_LABEL);
    }

    #[test]
    fn transformation_order_does_not_change_rows() {
        let snap = snapshot(json!({"a": "x", "b": true, "c": {"n": 1}}));
        let mut ts = vec![
            Transformation::new("a", TransformAction::Renamed, ""),
            Transformation::new("a", TransformAction::Added, ""),
            Transformation::new("c", TransformAction::Modified, ""),
            Transformation::new("b", TransformAction::Other("merged".into()), ""),
        ];
        let forward = diff_snapshot(&snap, &ts);
        ts.reverse();
        let backward = diff_snapshot(&snap, &ts);
        assert_eq!(forward, backward);
        assert_eq!(forward[0].label.as_deref(), Some("added"));
        assert!(!forward[1].highlighted);
    }

    #[test]
    fn values_render_as_text() {
        let snap = snapshot(json!({
            "s": "plain",
            "n": 42,
            "f": 1.5,
            "b": false,
            "o": {"bank": "ACME"},
            "z": null
        }));
        let values: Vec<String> = diff_snapshot(&snap, &[])
            .into_iter()
            .map(|r| r.display_value)
            .collect();
        assert_eq!(
            values,
            vec!["plain", "42", "1.5", "false", r#"{"bank":"ACME"}"#, "null"]
        );
    }

    #[test]
    fn diff_is_idempotent() {
        let snap = snapshot(json!({"a": 1}));
        let ts = vec![Transformation::new("a", TransformAction::Added, "")];
        assert_eq!(diff_snapshot(&snap, &ts), diff_snapshot(&snap, &ts));
    }
}
