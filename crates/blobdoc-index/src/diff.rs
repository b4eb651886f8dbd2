//! Marker changes implied by one document transition.

use serde_json::Value;

use crate::catalog::FieldSet;
use crate::value::FieldValue;

/// The marker work needed for one indexed field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
    /// Value segment of the marker to delete.
    pub removed: Option<String>,
    /// Value segment of the marker to write.
    pub added: Option<String>,
}

/// Compute the marker changes for every indexed field between `previous` and
/// `current`.
///
/// Fields are compared by marker token, so a transition that would delete
/// and rewrite the same key (e.g. `"1"` to `1`) produces nothing, as does a
/// transition between two unindexable values.
pub fn plan_changes(
    fields: &FieldSet,
    previous: Option<&Value>,
    current: Option<&Value>,
) -> Vec<FieldChange> {
    fields
        .iter()
        .filter_map(|field| {
            let removed = FieldValue::extract(previous, field).marker_token();
            let added = FieldValue::extract(current, field).marker_token();
            if removed == added {
                return None;
            }
            Some(FieldChange {
                field: field.to_string(),
                removed,
                added,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(names: &[&str]) -> FieldSet {
        names.iter().fold(FieldSet::empty(), |set, f| set.with_field(f))
    }

    #[test]
    fn unchanged_values_need_no_work() {
        let doc = json!({"name": "ada", "age": 36});
        assert!(plan_changes(&fields(&["name", "age"]), Some(&doc), Some(&doc)).is_empty());
    }

    #[test]
    fn first_write_adds_markers() {
        let doc = json!({"name": "ada"});
        let changes = plan_changes(&fields(&["name", "age"]), None, Some(&doc));
        assert_eq!(
            changes,
            vec![FieldChange {
                field: "name".into(),
                removed: None,
                added: Some("ada".into()),
            }]
        );
    }

    #[test]
    fn value_change_swaps_markers() {
        let changes = plan_changes(
            &fields(&["name"]),
            Some(&json!({"name": "ada"})),
            Some(&json!({"name": "grace"})),
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].removed.as_deref(), Some("ada"));
        assert_eq!(changes[0].added.as_deref(), Some("grace"));
    }

    #[test]
    fn removal_deletes_marker() {
        let changes = plan_changes(&fields(&["name"]), Some(&json!({"name": "ada"})), None);
        assert_eq!(changes[0].removed.as_deref(), Some("ada"));
        assert_eq!(changes[0].added, None);
    }

    #[test]
    fn scalar_to_composite_only_deletes() {
        let changes = plan_changes(
            &fields(&["name"]),
            Some(&json!({"name": "ada"})),
            Some(&json!({"name": {"first": "ada"}})),
        );
        assert_eq!(changes[0].removed.as_deref(), Some("ada"));
        assert_eq!(changes[0].added, None);
    }

    #[test]
    fn composite_to_composite_is_ignored() {
        let changes = plan_changes(
            &fields(&["tags"]),
            Some(&json!({"tags": ["a"]})),
            Some(&json!({"tags": ["b"]})),
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn same_token_different_type_is_ignored() {
        let changes = plan_changes(
            &fields(&["n"]),
            Some(&json!({"n": "1"})),
            Some(&json!({"n": 1})),
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn unindexed_fields_are_ignored() {
        let changes = plan_changes(
            &fields(&["name"]),
            Some(&json!({"age": 1})),
            Some(&json!({"age": 2})),
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn empty_field_set_short_circuits() {
        let changes = plan_changes(&FieldSet::empty(), None, Some(&json!({"name": "ada"})));
        assert!(changes.is_empty());
    }
}
