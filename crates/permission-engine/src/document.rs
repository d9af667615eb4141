//! # Access Documents
//!
//! An access document is the materialized form of a profile, permission set,
//! combined permission set group or combined user: a named bag of category
//! lists. A category may be absent (`None`), which is different from present
//! and empty.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::category::Category;
use crate::records::{
    ApexClassAccess, ApexPageAccess, ApplicationVisibility, CustomMetadataTypeAccess,
    CustomPermission, CustomSettingAccess, FieldPermission, FlowAccess, LayoutAssignment,
    MetadataRecord, ObjectPermission, RecordTypeVisibility, TabSetting, UserPermission,
};

/// Kind of access document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// A profile. The only kind that carries layout assignments.
    Profile,
    /// A permission set, including muting permission sets.
    PermissionSet,
    /// The combined result of a permission set group.
    PermissionSetGroup,
    /// The combined effective permissions of a user.
    User,
}

impl DocumentKind {
    /// Get the metadata type name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Profile => "Profile",
            DocumentKind::PermissionSet => "PermissionSet",
            DocumentKind::PermissionSetGroup => "PermissionSetGroup",
            DocumentKind::User => "User",
        }
    }

    /// Parse a kind from its metadata type name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "profile" => Some(DocumentKind::Profile),
            "permissionset" | "permission_set" => Some(DocumentKind::PermissionSet),
            "permissionsetgroup" | "permission_set_group" => Some(DocumentKind::PermissionSetGroup),
            "user" => Some(DocumentKind::User),
            _ => None,
        }
    }

    /// Whether documents of this kind carry page layout assignments.
    pub fn has_layouts(&self) -> bool {
        matches!(self, DocumentKind::Profile | DocumentKind::User)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A profile's, permission set's, group's or user's full set of category lists.
///
/// Documents are treated as immutable values once resolved. Combining
/// documents always builds a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDocument {
    /// Kind of document.
    pub kind: DocumentKind,
    /// API name of the profile, permission set, group or user.
    pub full_name: String,
    /// Display label, when the store provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_visibilities: Option<Vec<ApplicationVisibility>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_accesses: Option<Vec<ApexClassAccess>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_metadata_type_accesses: Option<Vec<CustomMetadataTypeAccess>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_permissions: Option<Vec<CustomPermission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_setting_accesses: Option<Vec<CustomSettingAccess>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_permissions: Option<Vec<FieldPermission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_accesses: Option<Vec<FlowAccess>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_assignments: Option<Vec<LayoutAssignment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_permissions: Option<Vec<ObjectPermission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_accesses: Option<Vec<ApexPageAccess>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type_visibilities: Option<Vec<RecordTypeVisibility>>,
    /// Tab settings, whichever field the source document stored them under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_settings: Option<Vec<TabSetting>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_permissions: Option<Vec<UserPermission>>,
}

impl AccessDocument {
    /// Create a document with every category absent.
    pub fn new(kind: DocumentKind, full_name: impl Into<String>) -> Self {
        Self {
            kind,
            full_name: full_name.into(),
            label: None,
            application_visibilities: None,
            class_accesses: None,
            custom_metadata_type_accesses: None,
            custom_permissions: None,
            custom_setting_accesses: None,
            field_permissions: None,
            flow_accesses: None,
            layout_assignments: None,
            object_permissions: None,
            page_accesses: None,
            record_type_visibilities: None,
            tab_settings: None,
            user_permissions: None,
        }
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the list for one category, marking it present.
    pub fn with_records<R: MetadataRecord>(mut self, records: Vec<R>) -> Self {
        *R::slot_mut(&mut self) = Some(records);
        self
    }

    /// Records of one category, empty when the category is absent.
    ///
    /// # Example
    ///
    /// ```
    /// use permission_engine::{AccessDocument, DocumentKind, ObjectPermission};
    ///
    /// let doc = AccessDocument::new(DocumentKind::PermissionSet, "Sales");
    /// assert!(doc.records::<ObjectPermission>().is_empty());
    /// ```
    pub fn records<R: MetadataRecord>(&self) -> &[R] {
        R::slot(self).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of records in a category, `None` when the category is absent.
    pub fn category_len(&self, category: Category) -> Option<usize> {
        match category {
            Category::ApplicationVisibilities => {
                self.application_visibilities.as_ref().map(Vec::len)
            }
            Category::ClassAccesses => self.class_accesses.as_ref().map(Vec::len),
            Category::CustomMetadataTypeAccesses => {
                self.custom_metadata_type_accesses.as_ref().map(Vec::len)
            }
            Category::CustomPermissions => self.custom_permissions.as_ref().map(Vec::len),
            Category::CustomSettingAccesses => self.custom_setting_accesses.as_ref().map(Vec::len),
            Category::FieldPermissions => self.field_permissions.as_ref().map(Vec::len),
            Category::FlowAccesses => self.flow_accesses.as_ref().map(Vec::len),
            Category::LayoutAssignments => self.layout_assignments.as_ref().map(Vec::len),
            Category::ObjectPermissions => self.object_permissions.as_ref().map(Vec::len),
            Category::PageAccesses => self.page_accesses.as_ref().map(Vec::len),
            Category::RecordTypeVisibilities => {
                self.record_type_visibilities.as_ref().map(Vec::len)
            }
            Category::TabSettings => self.tab_settings.as_ref().map(Vec::len),
            Category::UserPermissions => self.user_permissions.as_ref().map(Vec::len),
        }
    }

    /// Whether a category is present (possibly empty).
    pub fn has_category(&self, category: Category) -> bool {
        self.category_len(category).is_some()
    }

    /// Whether every category is absent.
    pub fn is_empty(&self) -> bool {
        Category::all().iter().all(|c| !self.has_category(*c))
    }

    /// Display name: the label when known, otherwise the API name.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.full_name)
    }

    /// Object API names that have an object permission on this document.
    pub fn permitted_objects(&self) -> impl Iterator<Item = &str> {
        self.records::<ObjectPermission>().iter().map(|op| op.object.as_str())
    }

    /// Write the document back in metadata shape.
    ///
    /// Tab settings are written under the kind-specific field name. Absent
    /// categories are omitted.
    pub fn to_metadata(&self) -> Result<Value, serde_json::Error> {
        let mut map = Map::new();
        map.insert("fullName".to_string(), Value::String(self.full_name.clone()));
        if let Some(label) = &self.label {
            map.insert("label".to_string(), Value::String(label.clone()));
        }

        self.put::<ApplicationVisibility>(&mut map)?;
        self.put::<ApexClassAccess>(&mut map)?;
        self.put::<CustomMetadataTypeAccess>(&mut map)?;
        self.put::<CustomPermission>(&mut map)?;
        self.put::<CustomSettingAccess>(&mut map)?;
        self.put::<FieldPermission>(&mut map)?;
        self.put::<FlowAccess>(&mut map)?;
        self.put::<LayoutAssignment>(&mut map)?;
        self.put::<ObjectPermission>(&mut map)?;
        self.put::<ApexPageAccess>(&mut map)?;
        self.put::<RecordTypeVisibility>(&mut map)?;
        self.put::<TabSetting>(&mut map)?;
        self.put::<UserPermission>(&mut map)?;

        Ok(Value::Object(map))
    }

    fn put<R: MetadataRecord>(
        &self,
        map: &mut Map<String, Value>,
    ) -> Result<(), serde_json::Error> {
        if let Some(records) = R::slot(self) {
            map.insert(
                R::CATEGORY.field_name(self.kind).to_string(),
                serde_json::to_value(records)?,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::TabVisibility;

    #[test]
    fn test_new_document_is_empty() {
        let doc = AccessDocument::new(DocumentKind::Profile, "Admin");
        assert!(doc.is_empty());
        assert_eq!(doc.display_name(), "Admin");
        for category in Category::all() {
            assert!(!doc.has_category(category));
        }
    }

    #[test]
    fn test_present_but_empty_category() {
        let doc = AccessDocument::new(DocumentKind::PermissionSet, "Empty")
            .with_records::<FlowAccess>(vec![]);
        assert!(doc.has_category(Category::FlowAccesses));
        assert_eq!(doc.category_len(Category::FlowAccesses), Some(0));
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_records_accessor() {
        let doc = AccessDocument::new(DocumentKind::PermissionSet, "Sales")
            .with_label("Sales Users")
            .with_records(vec![ObjectPermission::new("Account")]);

        assert_eq!(doc.records::<ObjectPermission>().len(), 1);
        assert!(doc.records::<FieldPermission>().is_empty());
        assert_eq!(doc.display_name(), "Sales Users");
        assert_eq!(doc.permitted_objects().collect::<Vec<_>>(), vec!["Account"]);
    }

    #[test]
    fn test_to_metadata_uses_kind_specific_tab_field() {
        let tabs = vec![TabSetting::new("standard-Account", TabVisibility::Visible)];

        let profile =
            AccessDocument::new(DocumentKind::Profile, "Admin").with_records(tabs.clone());
        let value = profile.to_metadata().unwrap();
        assert!(value.get("tabVisibilities").is_some());
        assert!(value.get("tabSettings").is_none());

        let ps = AccessDocument::new(DocumentKind::PermissionSet, "Sales").with_records(tabs);
        let value = ps.to_metadata().unwrap();
        assert_eq!(value["tabSettings"][0]["visibility"], "Visible");
        assert!(value.get("objectPermissions").is_none());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(DocumentKind::parse("Profile"), Some(DocumentKind::Profile));
        assert_eq!(DocumentKind::parse("permissionset"), Some(DocumentKind::PermissionSet));
        assert_eq!(DocumentKind::parse("widget"), None);
        assert!(DocumentKind::User.has_layouts());
        assert!(!DocumentKind::PermissionSetGroup.has_layouts());
    }
}
