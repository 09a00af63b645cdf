//! Export and import of the whole notes state as one JSON document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ImportError;
use crate::note::{Note, QuickLink};

/// The export file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportData {
    pub dbnotes: Vec<Note>,
    #[serde(rename = "binNotes")]
    pub bin_notes: Vec<Note>,
    pub quicklinks: BTreeMap<String, QuickLink>,
    pub quicklinksorder: Vec<String>,
    #[serde(rename = "pinnedNoteIds", default)]
    pub pinned_note_ids: Vec<String>,
}

impl ExportData {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Parse and validate an import.
///
/// The shape check runs before deserialization so every bad top-level
/// field is reported together.
pub fn parse_import(text: &str) -> Result<ExportData, ImportError> {
    let mut value: Value =
        serde_json::from_str(text).map_err(|source| ImportError::Syntax { source })?;
    let invalid = invalid_fields(&value);
    if !invalid.is_empty() {
        tracing::warn!(fields = ?invalid, "import rejected");
        return Err(ImportError::InvalidFields { fields: invalid });
    }
    if let Some(obj) = value.as_object_mut() {
        if obj.get("pinnedNoteIds").is_some_and(Value::is_null) {
            obj.remove("pinnedNoteIds");
        }
    }
    serde_json::from_value(value).map_err(|source| ImportError::Deserialize { source })
}

fn invalid_fields(value: &Value) -> Vec<&'static str> {
    let field = |name: &str| value.get(name);
    let is_array = |name: &str| field(name).is_some_and(Value::is_array);
    let mut invalid = Vec::new();
    if !is_array("dbnotes") {
        invalid.push("notes");
    }
    if !is_array("binNotes") {
        invalid.push("binNotes");
    }
    if !field("quicklinks").is_some_and(Value::is_object) {
        invalid.push("quicklinks");
    }
    if !is_array("quicklinksorder") {
        invalid.push("quicklinksorder");
    }
    if !matches!(field("pinnedNoteIds"), None | Some(Value::Null) | Some(Value::Array(_))) {
        invalid.push("pinnedNoteIds");
    }
    invalid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_pins_default_to_empty() {
        let data = parse_import(
            r#"{"dbnotes": [], "binNotes": [], "quicklinks": {}, "quicklinksorder": []}"#,
        )
        .unwrap();
        assert!(data.pinned_note_ids.is_empty());
    }

    #[test]
    fn test_every_bad_field_is_named() {
        let err = parse_import(
            r#"{"dbnotes": "not-an-array", "binNotes": [], "quicklinks": [], "quicklinksorder": [], "pinnedNoteIds": 3}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "notes, quicklinks, pinnedNoteIds, not valid.");
    }

    #[test]
    fn test_non_object_and_bad_json() {
        let err = parse_import("[]").unwrap_err();
        assert!(matches!(err, ImportError::InvalidFields { ref fields } if fields.len() == 4));
        assert!(matches!(
            parse_import("{").unwrap_err(),
            ImportError::Syntax { .. }
        ));
    }

    #[test]
    fn test_malformed_entries_fail_after_shape_check() {
        let err = parse_import(
            r#"{"dbnotes": [1], "binNotes": [], "quicklinks": {}, "quicklinksorder": []}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::Deserialize { .. }));
    }
}
