//! # Records
//!
//! Typed records for every access-control category, and the merge rules
//! each category follows.
//!
//! Boolean flags arrive from the metadata store as `"true"`/`"false"`
//! strings, real booleans, or not at all. All three forms are accepted;
//! a missing or `null` flag reads as `false`.

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::category::Category;
use crate::document::AccessDocument;

/// A record that lives in one category list of an [`AccessDocument`].
pub trait MetadataRecord: Clone + fmt::Debug + Serialize + DeserializeOwned {
    /// Category this record type belongs to.
    const CATEGORY: Category;

    /// Natural key of the record within its category.
    fn key(&self) -> &str;

    /// The document's list for this category, `None` when absent.
    fn slot(document: &AccessDocument) -> Option<&Vec<Self>>;

    /// Mutable access to the document's list for this category.
    fn slot_mut(document: &mut AccessDocument) -> &mut Option<Vec<Self>>;
}

/// A record with merge semantics.
///
/// `absorb` is the additive rule and may only raise grants. `mute` is the
/// subtractive rule and may only revoke them.
pub trait CategoryRecord: MetadataRecord {
    /// Combine a record with the same key from another contributing document.
    fn absorb(&mut self, other: &Self);

    /// Revoke whatever the muting record grants.
    fn mute(&mut self, muting: &Self);
}

pub(crate) mod flag {
    use serde::de::{Deserializer, Error as _};
    use serde::Deserialize;
    use serde_json::Value;

    /// Deserialize a metadata boolean.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" | "" => Ok(false),
                other => Err(D::Error::custom(format!("invalid boolean flag `{}`", other))),
            },
            Some(other) => Err(D::Error::custom(format!("invalid boolean flag `{}`", other))),
        }
    }
}

macro_rules! enabled_record {
    ($(#[$meta:meta])* $name:ident { $key:ident }, $category:expr, $slot:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            /// Natural key of the record.
            pub $key: String,
            /// Whether access is granted.
            #[serde(default, deserialize_with = "flag::deserialize")]
            pub enabled: bool,
        }

        impl $name {
            /// Create a record.
            pub fn new(key: impl Into<String>, enabled: bool) -> Self {
                Self {
                    $key: key.into(),
                    enabled,
                }
            }
        }

        impl MetadataRecord for $name {
            const CATEGORY: Category = $category;

            fn key(&self) -> &str {
                &self.$key
            }

            fn slot(document: &AccessDocument) -> Option<&Vec<Self>> {
                document.$slot.as_ref()
            }

            fn slot_mut(document: &mut AccessDocument) -> &mut Option<Vec<Self>> {
                &mut document.$slot
            }
        }

        impl CategoryRecord for $name {
            fn absorb(&mut self, other: &Self) {
                self.enabled |= other.enabled;
            }

            fn mute(&mut self, muting: &Self) {
                if muting.enabled {
                    self.enabled = false;
                }
            }
        }
    };
}

enabled_record!(
    /// Apex class access.
    ApexClassAccess { apex_class },
    Category::ClassAccesses,
    class_accesses
);

enabled_record!(
    /// Custom metadata type access.
    CustomMetadataTypeAccess { name },
    Category::CustomMetadataTypeAccesses,
    custom_metadata_type_accesses
);

enabled_record!(
    /// Custom permission grant.
    CustomPermission { name },
    Category::CustomPermissions,
    custom_permissions
);

enabled_record!(
    /// Custom setting access.
    CustomSettingAccess { name },
    Category::CustomSettingAccesses,
    custom_setting_accesses
);

enabled_record!(
    /// Flow access.
    FlowAccess { flow },
    Category::FlowAccesses,
    flow_accesses
);

enabled_record!(
    /// Visualforce page access.
    ApexPageAccess { apex_page },
    Category::PageAccesses,
    page_accesses
);

enabled_record!(
    /// System permission such as `ApiEnabled` or `ViewSetup`.
    UserPermission { name },
    Category::UserPermissions,
    user_permissions
);

/// Application visibility.
///
/// `default` is only meaningful on profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationVisibility {
    /// Application API name.
    pub application: String,
    /// Whether the app is visible.
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub visible: bool,
    /// Whether the app is the default app.
    #[serde(rename = "default", default, deserialize_with = "flag::deserialize")]
    pub is_default: bool,
}

impl ApplicationVisibility {
    /// Create a non-default application visibility.
    pub fn new(application: impl Into<String>, visible: bool) -> Self {
        Self {
            application: application.into(),
            visible,
            is_default: false,
        }
    }
}

impl MetadataRecord for ApplicationVisibility {
    const CATEGORY: Category = Category::ApplicationVisibilities;

    fn key(&self) -> &str {
        &self.application
    }

    fn slot(document: &AccessDocument) -> Option<&Vec<Self>> {
        document.application_visibilities.as_ref()
    }

    fn slot_mut(document: &mut AccessDocument) -> &mut Option<Vec<Self>> {
        &mut document.application_visibilities
    }
}

impl CategoryRecord for ApplicationVisibility {
    fn absorb(&mut self, other: &Self) {
        self.visible |= other.visible;
        self.is_default |= other.is_default;
    }

    fn mute(&mut self, muting: &Self) {
        if muting.visible {
            self.visible = false;
        }
    }
}

/// Record type visibility, keyed by `Object.RecordTypeName`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTypeVisibility {
    /// Record type identifier.
    pub record_type: String,
    /// Whether the record type is visible.
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub visible: bool,
    /// Profile only: default record type for the object.
    #[serde(rename = "default", default, deserialize_with = "flag::deserialize")]
    pub is_default: bool,
    /// Profile only: default person account record type.
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub person_account_default: bool,
}

impl RecordTypeVisibility {
    /// Create a record type visibility with no default flags.
    pub fn new(record_type: impl Into<String>, visible: bool) -> Self {
        Self {
            record_type: record_type.into(),
            visible,
            is_default: false,
            person_account_default: false,
        }
    }
}

impl MetadataRecord for RecordTypeVisibility {
    const CATEGORY: Category = Category::RecordTypeVisibilities;

    fn key(&self) -> &str {
        &self.record_type
    }

    fn slot(document: &AccessDocument) -> Option<&Vec<Self>> {
        document.record_type_visibilities.as_ref()
    }

    fn slot_mut(document: &mut AccessDocument) -> &mut Option<Vec<Self>> {
        &mut document.record_type_visibilities
    }
}

impl CategoryRecord for RecordTypeVisibility {
    fn absorb(&mut self, other: &Self) {
        self.visible |= other.visible;
        self.is_default |= other.is_default;
        self.person_account_default |= other.person_account_default;
    }

    fn mute(&mut self, muting: &Self) {
        if muting.visible {
            self.visible = false;
        }
    }
}

/// Tab visibility level.
///
/// Levels are ordered `None < Available < Visible`. Profiles spell them
/// `Hidden`, `DefaultOff` and `DefaultOn`; both spellings are accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TabVisibility {
    /// Tab hidden.
    #[default]
    None,
    /// Tab available in the app launcher but not shown by default.
    Available,
    /// Tab shown by default.
    Visible,
}

impl TabVisibility {
    /// Get the permission set spelling of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            TabVisibility::None => "None",
            TabVisibility::Available => "Available",
            TabVisibility::Visible => "Visible",
        }
    }

    /// Parse a level from either the permission set or the profile spelling.
    ///
    /// # Example
    ///
    /// ```
    /// use permission_engine::TabVisibility;
    ///
    /// assert_eq!(TabVisibility::parse("Visible"), Some(TabVisibility::Visible));
    /// assert_eq!(TabVisibility::parse("DefaultOff"), Some(TabVisibility::Available));
    /// assert_eq!(TabVisibility::parse("Hidden"), Some(TabVisibility::None));
    /// assert_eq!(TabVisibility::parse("sometimes"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "hidden" | "" => Some(TabVisibility::None),
            "available" | "defaultoff" => Some(TabVisibility::Available),
            "visible" | "defaulton" => Some(TabVisibility::Visible),
            _ => None,
        }
    }
}

impl fmt::Display for TabVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TabVisibility {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => TabVisibility::parse(&s)
                .ok_or_else(|| D::Error::custom(format!("unknown tab visibility `{}`", s))),
            None => Ok(TabVisibility::None),
        }
    }
}

/// Tab setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSetting {
    /// Tab name.
    pub tab: String,
    /// Visibility level.
    #[serde(default)]
    pub visibility: TabVisibility,
}

impl TabSetting {
    /// Create a tab setting.
    pub fn new(tab: impl Into<String>, visibility: TabVisibility) -> Self {
        Self {
            tab: tab.into(),
            visibility,
        }
    }
}

impl MetadataRecord for TabSetting {
    const CATEGORY: Category = Category::TabSettings;

    fn key(&self) -> &str {
        &self.tab
    }

    fn slot(document: &AccessDocument) -> Option<&Vec<Self>> {
        document.tab_settings.as_ref()
    }

    fn slot_mut(document: &mut AccessDocument) -> &mut Option<Vec<Self>> {
        &mut document.tab_settings
    }
}

impl CategoryRecord for TabSetting {
    fn absorb(&mut self, other: &Self) {
        self.visibility = self.visibility.max(other.visibility);
    }

    /// Only an `Available` mute is recognized, and it hides the tab entirely.
    fn mute(&mut self, muting: &Self) {
        if muting.visibility == TabVisibility::Available {
            self.visibility = TabVisibility::None;
        }
    }
}

/// Object CRUD permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPermission {
    /// Object API name.
    pub object: String,
    /// Read access.
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub allow_read: bool,
    /// Create access.
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub allow_create: bool,
    /// Edit access.
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub allow_edit: bool,
    /// Delete access.
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub allow_delete: bool,
    /// View all records regardless of sharing.
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub view_all_records: bool,
    /// Modify all records regardless of sharing.
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub modify_all_records: bool,
}

impl ObjectPermission {
    /// Create an object permission with every flag off.
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            ..Self::default()
        }
    }

    /// Labels of the granted flags, in display order.
    pub fn granted(&self) -> Vec<&'static str> {
        [
            (self.allow_read, "Read"),
            (self.allow_create, "Create"),
            (self.allow_edit, "Edit"),
            (self.allow_delete, "Delete"),
            (self.view_all_records, "View All"),
            (self.modify_all_records, "Modify All"),
        ]
        .into_iter()
        .filter_map(|(granted, label)| granted.then_some(label))
        .collect()
    }
}

impl MetadataRecord for ObjectPermission {
    const CATEGORY: Category = Category::ObjectPermissions;

    fn key(&self) -> &str {
        &self.object
    }

    fn slot(document: &AccessDocument) -> Option<&Vec<Self>> {
        document.object_permissions.as_ref()
    }

    fn slot_mut(document: &mut AccessDocument) -> &mut Option<Vec<Self>> {
        &mut document.object_permissions
    }
}

impl CategoryRecord for ObjectPermission {
    fn absorb(&mut self, other: &Self) {
        self.allow_read |= other.allow_read;
        self.allow_create |= other.allow_create;
        self.allow_edit |= other.allow_edit;
        self.allow_delete |= other.allow_delete;
        self.view_all_records |= other.view_all_records;
        self.modify_all_records |= other.modify_all_records;
    }

    fn mute(&mut self, muting: &Self) {
        self.allow_read &= !muting.allow_read;
        self.allow_create &= !muting.allow_create;
        self.allow_edit &= !muting.allow_edit;
        self.allow_delete &= !muting.allow_delete;
        self.view_all_records &= !muting.view_all_records;
        self.modify_all_records &= !muting.modify_all_records;
    }
}

/// Field-level security, keyed by `Object.Field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPermission {
    /// Field API name including its object.
    pub field: String,
    /// Read access.
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub readable: bool,
    /// Edit access.
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub editable: bool,
}

impl FieldPermission {
    /// Create a field permission.
    pub fn new(field: impl Into<String>, readable: bool, editable: bool) -> Self {
        Self {
            field: field.into(),
            readable,
            editable,
        }
    }

    /// Split the key into object and field API names.
    ///
    /// A key without a dot yields an empty object name.
    pub fn object_and_field(&self) -> (&str, &str) {
        match self.field.split_once('.') {
            Some((object, field)) => (object, field),
            None => ("", self.field.as_str()),
        }
    }
}

impl MetadataRecord for FieldPermission {
    const CATEGORY: Category = Category::FieldPermissions;

    fn key(&self) -> &str {
        &self.field
    }

    fn slot(document: &AccessDocument) -> Option<&Vec<Self>> {
        document.field_permissions.as_ref()
    }

    fn slot_mut(document: &mut AccessDocument) -> &mut Option<Vec<Self>> {
        &mut document.field_permissions
    }
}

impl CategoryRecord for FieldPermission {
    fn absorb(&mut self, other: &Self) {
        self.readable |= other.readable;
        self.editable |= other.editable;
    }

    /// Muting read hides the field entirely, so edit goes with it.
    fn mute(&mut self, muting: &Self) {
        if muting.readable {
            self.readable = false;
            self.editable = false;
        } else if muting.editable {
            self.editable = false;
        }
    }
}

/// Page layout assignment. Profiles only; never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutAssignment {
    /// Layout name, `Object-Layout Name`.
    pub layout: String,
    /// Record type, `Object.RecordType`. Absent for the master record type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
}

impl LayoutAssignment {
    /// Create a layout assignment.
    pub fn new(layout: impl Into<String>, record_type: Option<String>) -> Self {
        Self {
            layout: layout.into(),
            record_type,
        }
    }

    /// Split the layout name into object and layout names.
    pub fn object_and_layout(&self) -> (&str, &str) {
        match self.layout.split_once('-') {
            Some((object, layout)) => (object, layout),
            None => (self.layout.as_str(), ""),
        }
    }

    /// Record type name without its object prefix, `Master` when absent.
    pub fn record_type_name(&self) -> &str {
        match self.record_type.as_deref() {
            Some(rt) if !rt.is_empty() => rt.split_once('.').map(|(_, name)| name).unwrap_or(rt),
            _ => "Master",
        }
    }
}

impl MetadataRecord for LayoutAssignment {
    const CATEGORY: Category = Category::LayoutAssignments;

    fn key(&self) -> &str {
        &self.layout
    }

    fn slot(document: &AccessDocument) -> Option<&Vec<Self>> {
        document.layout_assignments.as_ref()
    }

    fn slot_mut(document: &mut AccessDocument) -> &mut Option<Vec<Self>> {
        &mut document.layout_assignments
    }
}
