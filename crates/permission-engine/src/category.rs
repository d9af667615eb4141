//! # Categories
//!
//! Defines the kinds of access control an access document carries.
//! Each category is stored under its own metadata field and keyed by
//! its own natural subject field.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::document::DocumentKind;

/// Categories of access control found on profiles and permission sets.
///
/// Twelve categories take part in merging. `LayoutAssignments` is carried
/// verbatim from a profile and never merged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    /// Application visibility, keyed by application name.
    ApplicationVisibilities,
    /// Apex class access, keyed by class name.
    ClassAccesses,
    /// Custom metadata type access, keyed by type name.
    CustomMetadataTypeAccesses,
    /// Custom permissions, keyed by permission name.
    CustomPermissions,
    /// Custom setting access, keyed by setting name.
    CustomSettingAccesses,
    /// Field-level security, keyed by `Object.Field`.
    FieldPermissions,
    /// Flow access, keyed by flow name.
    FlowAccesses,
    /// Page layout assignments (profile only, never merged).
    LayoutAssignments,
    /// Object CRUD permissions, keyed by object API name.
    ObjectPermissions,
    /// Visualforce page access, keyed by page name.
    PageAccesses,
    /// Record type visibility, keyed by `Object.RecordType`.
    RecordTypeVisibilities,
    /// Tab settings, keyed by tab name.
    TabSettings,
    /// System (user) permissions, keyed by permission name.
    UserPermissions,
}

impl Category {
    /// Get the API name of the category.
    ///
    /// This is also the metadata field name, except for tab settings whose
    /// field depends on the document kind (see [`Category::field_name`]).
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ApplicationVisibilities => "applicationVisibilities",
            Category::ClassAccesses => "classAccesses",
            Category::CustomMetadataTypeAccesses => "customMetadataTypeAccesses",
            Category::CustomPermissions => "customPermissions",
            Category::CustomSettingAccesses => "customSettingAccesses",
            Category::FieldPermissions => "fieldPermissions",
            Category::FlowAccesses => "flowAccesses",
            Category::LayoutAssignments => "layoutAssignments",
            Category::ObjectPermissions => "objectPermissions",
            Category::PageAccesses => "pageAccesses",
            Category::RecordTypeVisibilities => "recordTypeVisibilities",
            Category::TabSettings => "tabSettings",
            Category::UserPermissions => "userPermissions",
        }
    }

    /// Parse a category from its API name.
    ///
    /// Matching is case-insensitive and accepts a few common aliases.
    ///
    /// # Example
    ///
    /// ```
    /// use permission_engine::Category;
    ///
    /// assert_eq!(Category::parse("objectPermissions"), Some(Category::ObjectPermissions));
    /// assert_eq!(Category::parse("tabvisibilities"), Some(Category::TabSettings));
    /// assert_eq!(Category::parse("nope"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "applicationvisibilities" | "apps" => Some(Category::ApplicationVisibilities),
            "classaccesses" | "apexclasses" => Some(Category::ClassAccesses),
            "custommetadatatypeaccesses" | "custommetadatatypes" => {
                Some(Category::CustomMetadataTypeAccesses)
            }
            "custompermissions" => Some(Category::CustomPermissions),
            "customsettingaccesses" | "customsettings" => Some(Category::CustomSettingAccesses),
            "fieldpermissions" | "fields" => Some(Category::FieldPermissions),
            "flowaccesses" | "flows" => Some(Category::FlowAccesses),
            "layoutassignments" | "layouts" => Some(Category::LayoutAssignments),
            "objectpermissions" | "objects" => Some(Category::ObjectPermissions),
            "pageaccesses" | "visualforcepages" => Some(Category::PageAccesses),
            "recordtypevisibilities" | "recordtypes" => Some(Category::RecordTypeVisibilities),
            "tabsettings" | "tabvisibilities" | "tabs" => Some(Category::TabSettings),
            "userpermissions" | "systempermissions" => Some(Category::UserPermissions),
            _ => None,
        }
    }

    /// Metadata field holding this category on a document of `kind`.
    ///
    /// Profiles store tab settings under `tabVisibilities`, permission sets
    /// under `tabSettings`. A user's effective document is shaped like a
    /// profile, a group result like a permission set.
    ///
    /// # Example
    ///
    /// ```
    /// use permission_engine::{Category, DocumentKind};
    ///
    /// assert_eq!(Category::TabSettings.field_name(DocumentKind::Profile), "tabVisibilities");
    /// assert_eq!(Category::TabSettings.field_name(DocumentKind::PermissionSet), "tabSettings");
    /// ```
    pub fn field_name(&self, kind: DocumentKind) -> &'static str {
        match (self, kind) {
            (Category::TabSettings, DocumentKind::Profile | DocumentKind::User) => {
                "tabVisibilities"
            }
            _ => self.as_str(),
        }
    }

    /// Name of the natural key field of records in this category.
    pub fn key_field(&self) -> &'static str {
        match self {
            Category::ApplicationVisibilities => "application",
            Category::ClassAccesses => "apexClass",
            Category::CustomMetadataTypeAccesses
            | Category::CustomPermissions
            | Category::CustomSettingAccesses
            | Category::UserPermissions => "name",
            Category::FieldPermissions => "field",
            Category::FlowAccesses => "flow",
            Category::LayoutAssignments => "layout",
            Category::ObjectPermissions => "object",
            Category::PageAccesses => "apexPage",
            Category::RecordTypeVisibilities => "recordType",
            Category::TabSettings => "tab",
        }
    }

    /// Human-readable section title.
    pub fn title(&self) -> &'static str {
        match self {
            Category::ApplicationVisibilities => "Assigned Apps",
            Category::ClassAccesses => "Apex Class Accesses",
            Category::CustomMetadataTypeAccesses => "Custom Metadata Type Accesses",
            Category::CustomPermissions => "Custom Permissions",
            Category::CustomSettingAccesses => "Custom Setting Accesses",
            Category::FieldPermissions => "Field Level Permissions",
            Category::FlowAccesses => "Flow Accesses",
            Category::LayoutAssignments => "Page Layout Assignments",
            Category::ObjectPermissions => "Object Permissions",
            Category::PageAccesses => "Visualforce Page Accesses",
            Category::RecordTypeVisibilities => "Record Type Visibilities",
            Category::TabSettings => "Tab Visibilities",
            Category::UserPermissions => "System Permissions",
        }
    }

    /// Whether records of this category are merged across documents.
    pub fn is_mergeable(&self) -> bool {
        !matches!(self, Category::LayoutAssignments)
    }

    /// Get all categories.
    pub fn all() -> Vec<Self> {
        vec![
            Category::ApplicationVisibilities,
            Category::ClassAccesses,
            Category::CustomMetadataTypeAccesses,
            Category::CustomPermissions,
            Category::CustomSettingAccesses,
            Category::FieldPermissions,
            Category::FlowAccesses,
            Category::LayoutAssignments,
            Category::ObjectPermissions,
            Category::PageAccesses,
            Category::RecordTypeVisibilities,
            Category::TabSettings,
            Category::UserPermissions,
        ]
    }

    /// Get the categories that take part in merging.
    pub fn mergeable() -> Vec<Self> {
        Self::all().into_iter().filter(Category::is_mergeable).collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_round_trips_api_names() {
        for category in Category::all() {
            assert_eq!(Category::parse(category.as_str()), Some(category));
        }
    }

    #[test]
    fn test_category_parse_aliases() {
        assert_eq!(Category::parse("  Objects "), Some(Category::ObjectPermissions));
        assert_eq!(Category::parse("systemPermissions"), Some(Category::UserPermissions));
        assert_eq!(Category::parse("TABVISIBILITIES"), Some(Category::TabSettings));
        assert_eq!(Category::parse("all"), None);
    }

    #[test]
    fn test_tab_field_name_depends_on_kind() {
        let tabs = Category::TabSettings;
        assert_eq!(tabs.field_name(DocumentKind::Profile), "tabVisibilities");
        assert_eq!(tabs.field_name(DocumentKind::User), "tabVisibilities");
        assert_eq!(tabs.field_name(DocumentKind::PermissionSet), "tabSettings");
        assert_eq!(tabs.field_name(DocumentKind::PermissionSetGroup), "tabSettings");

        // Every other category uses its API name regardless of kind
        assert_eq!(
            Category::FieldPermissions.field_name(DocumentKind::Profile),
            "fieldPermissions"
        );
    }

    #[test]
    fn test_mergeable_excludes_layouts() {
        let mergeable = Category::mergeable();
        assert_eq!(mergeable.len(), 12);
        assert!(!mergeable.contains(&Category::LayoutAssignments));
    }

    #[test]
    fn test_key_fields() {
        assert_eq!(Category::ObjectPermissions.key_field(), "object");
        assert_eq!(Category::ClassAccesses.key_field(), "apexClass");
        assert_eq!(Category::UserPermissions.key_field(), "name");
        assert_eq!(Category::TabSettings.key_field(), "tab");
    }
}
