//! Validation for names that become key segments.
//!
//! Collections and fields are single key segments, so they may not contain
//! `/`. Document ids are the final segment of both document and marker keys
//! and follow the same rule. Marker *values* are taken verbatim from
//! documents and are deliberately not validated.

use crate::error::{IndexError, IndexResult};

fn check_segment(kind: &'static str, name: &str) -> IndexResult<()> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name.contains('/') {
        "must not contain '/'"
    } else {
        return Ok(());
    };
    Err(IndexError::InvalidName {
        kind,
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

/// Validate a collection name against the reserved `namespace`.
pub fn validate_collection_name(name: &str, namespace: &str) -> IndexResult<()> {
    check_segment("collection", name)?;
    if name == namespace {
        return Err(IndexError::InvalidName {
            kind: "collection",
            name: name.to_string(),
            reason: "collides with the reserved index namespace".to_string(),
        });
    }
    Ok(())
}

/// Validate an indexed field name.
pub fn validate_field_name(name: &str) -> IndexResult<()> {
    check_segment("field", name)
}

/// Validate a document id.
pub fn validate_document_id(id: &str) -> IndexResult<()> {
    check_segment("document id", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_collection_name("users", "::db::").is_ok());
        assert!(validate_field_name("name").is_ok());
        assert!(validate_document_id("u-1.json").is_ok());
    }

    #[test]
    fn empty_names_rejected() {
        assert!(validate_collection_name("", "::db::").is_err());
        assert!(validate_field_name("").is_err());
        assert!(validate_document_id("").is_err());
    }

    #[test]
    fn slashes_rejected() {
        let err = validate_field_name("a/b").unwrap_err();
        assert!(matches!(err, IndexError::InvalidName { kind: "field", .. }));
        assert!(validate_document_id("x/y").is_err());
    }

    #[test]
    fn reserved_namespace_rejected_as_collection() {
        let err = validate_collection_name("::db::", "::db::").unwrap_err();
        assert!(err.to_string().contains("reserved"));
        assert!(validate_collection_name("::db::", "::sys::").is_ok());
    }
}
