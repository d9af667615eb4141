//! # Metadata Normalizer
//!
//! The metadata store returns a lone record as an object and several
//! records as an array. Everything here turns that into a uniform ordered
//! sequence at the boundary, so nothing deeper has to ask "is it a list".

use serde_json::Value;

use crate::category::Category;
use crate::document::{AccessDocument, DocumentKind};
use crate::error::{EngineError, EngineResult};
use crate::records::{
    ApexClassAccess, ApexPageAccess, ApplicationVisibility, CustomMetadataTypeAccess,
    CustomPermission, CustomSettingAccess, FieldPermission, FlowAccess, LayoutAssignment,
    MetadataRecord, ObjectPermission, RecordTypeVisibility, TabSetting, UserPermission,
};

/// Normalize a single-or-list value into an ordered sequence.
///
/// Arrays yield their elements, objects a one-element sequence and `null`
/// an empty one. Scalars yield `None`.
///
/// # Example
///
/// ```
/// use permission_engine::normalize::records_of;
/// use serde_json::json;
///
/// assert_eq!(records_of(&json!({"name": "X"})).unwrap().len(), 1);
/// assert_eq!(records_of(&json!([{"name": "X"}, {"name": "Y"}])).unwrap().len(), 2);
/// assert!(records_of(&json!(null)).unwrap().is_empty());
/// assert!(records_of(&json!("oops")).is_none());
/// ```
pub fn records_of(value: &Value) -> Option<Vec<&Value>> {
    match value {
        Value::Array(items) => Some(items.iter().collect()),
        Value::Object(_) => Some(vec![value]),
        Value::Null => Some(Vec::new()),
        _ => None,
    }
}

/// Raw records of one category on a metadata document of `kind`.
///
/// Returns an empty sequence when the category is absent or `null`.
pub fn category_values<'a>(
    document: &'a Value,
    category: Category,
    kind: DocumentKind,
) -> EngineResult<Vec<&'a Value>> {
    match document.get(category.field_name(kind)) {
        None => Ok(Vec::new()),
        Some(value) => records_of(value).ok_or(EngineError::MalformedCategory(category)),
    }
}

/// Parse one raw record, failing fast when it is not an object or lacks its key.
pub fn parse_record<R: MetadataRecord>(index: usize, value: &Value) -> EngineResult<R> {
    let malformed = |reason: String| EngineError::MalformedRecord {
        category: R::CATEGORY,
        index,
        reason,
    };

    if !value.is_object() {
        return Err(malformed(format!("expected an object, got `{}`", value)));
    }

    let record = R::deserialize(value).map_err(|e| malformed(e.to_string()))?;
    if record.key().trim().is_empty() {
        return Err(malformed(format!("empty `{}`", R::CATEGORY.key_field())));
    }
    Ok(record)
}

fn parse_category<R: MetadataRecord>(
    document: &Value,
    kind: DocumentKind,
) -> EngineResult<Option<Vec<R>>> {
    match document.get(R::CATEGORY.field_name(kind)) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => {
            let raw = records_of(value).ok_or(EngineError::MalformedCategory(R::CATEGORY))?;
            raw.into_iter()
                .enumerate()
                .map(|(index, record)| parse_record(index, record))
                .collect::<EngineResult<Vec<R>>>()
                .map(Some)
        }
    }
}

/// Build a typed document from a raw metadata document.
///
/// Tab settings are read from the field the kind stores them under and
/// land in the single `tab_settings` list. Layout assignments are only
/// read for kinds that carry them.
pub fn parse_document(kind: DocumentKind, document: &Value) -> EngineResult<AccessDocument> {
    let fields = document.as_object().ok_or_else(|| EngineError::MalformedDocument {
        kind,
        reason: "expected an object".to_string(),
    })?;

    let full_name = fields
        .get("fullName")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| EngineError::MalformedDocument {
            kind,
            reason: "missing `fullName`".to_string(),
        })?;

    let mut doc = AccessDocument::new(kind, full_name);
    doc.label = fields
        .get("label")
        .and_then(Value::as_str)
        .map(str::to_string);

    doc.application_visibilities = parse_category::<ApplicationVisibility>(document, kind)?;
    doc.class_accesses = parse_category::<ApexClassAccess>(document, kind)?;
    doc.custom_metadata_type_accesses = parse_category::<CustomMetadataTypeAccess>(document, kind)?;
    doc.custom_permissions = parse_category::<CustomPermission>(document, kind)?;
    doc.custom_setting_accesses = parse_category::<CustomSettingAccess>(document, kind)?;
    doc.field_permissions = parse_category::<FieldPermission>(document, kind)?;
    doc.flow_accesses = parse_category::<FlowAccess>(document, kind)?;
    doc.object_permissions = parse_category::<ObjectPermission>(document, kind)?;
    doc.page_accesses = parse_category::<ApexPageAccess>(document, kind)?;
    doc.record_type_visibilities = parse_category::<RecordTypeVisibility>(document, kind)?;
    doc.tab_settings = parse_category::<TabSetting>(document, kind)?;
    doc.user_permissions = parse_category::<UserPermission>(document, kind)?;
    if kind.has_layouts() {
        doc.layout_assignments = parse_category::<LayoutAssignment>(document, kind)?;
    }

    Ok(doc)
}

impl AccessDocument {
    /// Build a typed document from a raw metadata document.
    ///
    /// See [`parse_document`].
    pub fn from_metadata(kind: DocumentKind, document: &Value) -> EngineResult<Self> {
        parse_document(kind, document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::TabVisibility;
    use serde_json::json;

    fn sample_profile() -> Value {
        json!({
            "fullName": "Sales Profile",
            "custom": "true",
            "objectPermissions": {
                "object": "Account",
                "allowRead": "true",
                "allowCreate": "false",
                "allowEdit": "false",
                "allowDelete": "false",
                "viewAllRecords": "false",
                "modifyAllRecords": "false"
            },
            "fieldPermissions": [
                { "field": "Account.Rating", "readable": "true", "editable": "false" },
                { "field": "Account.Industry", "readable": "true", "editable": "true" }
            ],
            "tabVisibilities": { "tab": "standard-Account", "visibility": "DefaultOn" },
            "layoutAssignments": [
                { "layout": "Account-Account Layout" },
                { "layout": "Account-Partner Layout", "recordType": "Account.Partner" }
            ],
            "userPermissions": null
        })
    }

    #[test]
    fn test_single_record_is_wrapped() {
        let profile = sample_profile();
        let values =
            category_values(&profile, Category::ObjectPermissions, DocumentKind::Profile).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["object"], "Account");
    }

    #[test]
    fn test_absent_and_null_categories_are_empty() {
        let profile = sample_profile();
        assert!(category_values(&profile, Category::FlowAccesses, DocumentKind::Profile)
            .unwrap()
            .is_empty());
        assert!(category_values(&profile, Category::UserPermissions, DocumentKind::Profile)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_scalar_category_is_malformed() {
        let doc = json!({ "fullName": "X", "flowAccesses": 42 });
        let err = category_values(&doc, Category::FlowAccesses, DocumentKind::PermissionSet)
            .unwrap_err();
        assert_eq!(err, EngineError::MalformedCategory(Category::FlowAccesses));
    }

    #[test]
    fn test_parse_profile_document() {
        let doc = AccessDocument::from_metadata(DocumentKind::Profile, &sample_profile()).unwrap();

        assert_eq!(doc.full_name, "Sales Profile");
        assert_eq!(doc.records::<ObjectPermission>().len(), 1);
        assert!(doc.records::<ObjectPermission>()[0].allow_read);
        assert_eq!(doc.records::<FieldPermission>().len(), 2);
        assert_eq!(
            doc.records::<TabSetting>()[0].visibility,
            TabVisibility::Visible
        );
        assert_eq!(doc.records::<LayoutAssignment>().len(), 2);

        // Absent and null both stay absent
        assert!(doc.flow_accesses.is_none());
        assert!(doc.user_permissions.is_none());
    }

    #[test]
    fn test_permission_set_reads_tab_settings_field() {
        let raw = json!({
            "fullName": "Sales_Ops",
            "label": "Sales Ops",
            "tabSettings": [
                { "tab": "standard-Account", "visibility": "Available" },
                { "tab": "standard-Contact", "visibility": "Visible" }
            ],
            "tabVisibilities": { "tab": "ignored", "visibility": "Visible" },
            "layoutAssignments": { "layout": "Account-Account Layout" }
        });
        let doc = AccessDocument::from_metadata(DocumentKind::PermissionSet, &raw).unwrap();

        assert_eq!(doc.label.as_deref(), Some("Sales Ops"));
        let tabs = doc.records::<TabSetting>();
        assert_eq!(tabs.len(), 2);
        assert!(tabs.iter().all(|t| t.tab != "ignored"));

        // Permission sets never carry layouts
        assert!(doc.layout_assignments.is_none());
    }

    #[test]
    fn test_empty_list_is_present() {
        let raw = json!({ "fullName": "Empty", "customPermissions": [] });
        let doc = AccessDocument::from_metadata(DocumentKind::PermissionSet, &raw).unwrap();
        assert_eq!(doc.custom_permissions, Some(vec![]));
    }

    #[test]
    fn test_record_missing_key_fails_fast() {
        let raw = json!({
            "fullName": "Broken",
            "objectPermissions": [
                { "object": "Account", "allowRead": "true" },
                { "allowRead": "true" }
            ]
        });
        let err = AccessDocument::from_metadata(DocumentKind::PermissionSet, &raw).unwrap_err();
        match err {
            EngineError::MalformedRecord {
                category, index, ..
            } => {
                assert_eq!(category, Category::ObjectPermissions);
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_record_with_empty_key_fails_fast() {
        let raw = json!({
            "fullName": "Broken",
            "customPermissions": { "name": " ", "enabled": "true" }
        });
        let err = AccessDocument::from_metadata(DocumentKind::PermissionSet, &raw).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_RECORD");
        assert_eq!(err.category(), Some(Category::CustomPermissions));
    }

    #[test]
    fn test_non_object_record_fails_fast() {
        let raw = json!({ "fullName": "Broken", "flowAccesses": ["Flow_A"] });
        let err = AccessDocument::from_metadata(DocumentKind::PermissionSet, &raw).unwrap_err();
        assert_eq!(err.category(), Some(Category::FlowAccesses));
    }

    #[test]
    fn test_document_without_full_name() {
        let err = AccessDocument::from_metadata(DocumentKind::Profile, &json!({})).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_DOCUMENT");

        let err = AccessDocument::from_metadata(DocumentKind::Profile, &json!([1, 2])).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_DOCUMENT");
    }
}
