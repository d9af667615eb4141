//! Metadata store
//!
//! This module provides the store abstraction the exporter reads
//! profiles, permission sets, object schemas and assignments from, and an
//! in-memory implementation.

use async_trait::async_trait;
use permission_engine::{AccessDocument, DocumentKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};

/// A field's API name and label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field API name, without the object prefix.
    pub api_name: String,
    /// Display label.
    pub label: String,
}

/// An object's label and field labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSchema {
    /// Object API name.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Known fields.
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl ObjectSchema {
    /// Create a schema with no fields.
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field.
    pub fn with_field(mut self, api_name: impl Into<String>, label: impl Into<String>) -> Self {
        self.fields.push(FieldSchema {
            api_name: api_name.into(),
            label: label.into(),
        });
        self
    }

    /// Label of a field, by API name.
    pub fn field_label(&self, api_name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.api_name == api_name)
            .map(|f| f.label.as_str())
    }
}

/// Members and muting set of a permission set group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupComponents {
    /// Member permission set names.
    pub member_names: Vec<String>,
    /// Muting permission set name, if the group has one.
    pub muting_name: Option<String>,
}

/// A user's profile and assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAssignments {
    /// Profile name.
    pub profile_name: String,
    /// Directly assigned permission set names.
    #[serde(default)]
    pub permission_set_names: Vec<String>,
    /// Assigned permission set group names.
    #[serde(default)]
    pub permission_set_group_names: Vec<String>,
}

impl UserAssignments {
    /// Create assignments with only a profile.
    pub fn new(profile_name: impl Into<String>) -> Self {
        Self {
            profile_name: profile_name.into(),
            permission_set_names: Vec::new(),
            permission_set_group_names: Vec::new(),
        }
    }
}

/// Source of access metadata.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Read documents of one kind by name.
    ///
    /// Returns a single object when one document matched, an array when
    /// several did, and `null` when none did. Names that do not exist are
    /// left out of the response.
    async fn read_documents(&self, kind: DocumentKind, names: &[String]) -> StoreResult<Value>;

    /// Describe an object's label and fields.
    async fn describe_object(&self, name: &str) -> StoreResult<Option<ObjectSchema>>;

    /// Look up a permission set group's members and muting set.
    async fn group_components(&self, group: &str) -> StoreResult<Option<GroupComponents>>;

    /// Look up a user's profile and assignments.
    async fn user_assignments(&self, username: &str) -> StoreResult<Option<UserAssignments>>;

    /// Application labels keyed by application API name.
    async fn application_labels(&self) -> StoreResult<HashMap<String, String>>;
}

/// Metadata store statistics.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Document read calls
    pub read_calls: u64,
    /// Names requested across all read calls
    pub names_requested: u64,
    /// Object describe calls
    pub describe_calls: u64,
}

#[derive(Default)]
struct MemoryState {
    documents: HashMap<(DocumentKind, String), Value>,
    objects: HashMap<String, ObjectSchema>,
    groups: HashMap<String, GroupComponents>,
    users: HashMap<String, UserAssignments>,
    applications: HashMap<String, String>,
    pending_failures: u32,
}

/// In-memory metadata store.
///
/// Suitable for tests and for exporting from metadata already on hand.
pub struct MemoryMetadataStore {
    state: Arc<RwLock<MemoryState>>,
    stats: Arc<RwLock<StoreStats>>,
    read_limit: Option<usize>,
}

impl std::fmt::Debug for MemoryMetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMetadataStore")
            .field("read_limit", &self.read_limit)
            .finish()
    }
}

impl MemoryMetadataStore {
    /// Create an empty store with no per-call limit.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            stats: Arc::new(RwLock::new(StoreStats::default())),
            read_limit: None,
        }
    }

    /// Reject read calls that ask for more than `limit` names.
    pub fn with_read_limit(mut self, limit: usize) -> Self {
        self.read_limit = Some(limit);
        self
    }

    /// Insert a raw metadata document, keyed by its `fullName`.
    pub async fn insert_document(&self, kind: DocumentKind, document: Value) -> StoreResult<()> {
        let name = document
            .get("fullName")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| StoreError::Backend(format!("{} document has no fullName", kind)))?
            .to_string();
        self.state.write().await.documents.insert((kind, name), document);
        Ok(())
    }

    /// Insert a typed document in metadata shape.
    pub async fn insert_access_document(&self, document: &AccessDocument) -> StoreResult<()> {
        let value = document
            .to_metadata()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.insert_document(document.kind, value).await
    }

    /// Insert an object schema.
    pub async fn insert_object(&self, schema: ObjectSchema) {
        self.state.write().await.objects.insert(schema.name.clone(), schema);
    }

    /// Insert a permission set group's components.
    pub async fn insert_group(&self, name: impl Into<String>, components: GroupComponents) {
        self.state.write().await.groups.insert(name.into(), components);
    }

    /// Insert a user's assignments.
    pub async fn insert_user(&self, username: impl Into<String>, assignments: UserAssignments) {
        self.state.write().await.users.insert(username.into(), assignments);
    }

    /// Insert an application label.
    pub async fn insert_application(&self, name: impl Into<String>, label: impl Into<String>) {
        self.state
            .write()
            .await
            .applications
            .insert(name.into(), label.into());
    }

    /// Make the next `count` read calls fail as unavailable.
    pub async fn fail_next_reads(&self, count: u32) {
        self.state.write().await.pending_failures = count;
    }

    /// Get store statistics.
    pub async fn stats(&self) -> StoreStats {
        self.stats.read().await.clone()
    }
}

impl Default for MemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn read_documents(&self, kind: DocumentKind, names: &[String]) -> StoreResult<Value> {
        {
            let mut stats = self.stats.write().await;
            stats.read_calls += 1;
            stats.names_requested += names.len() as u64;
        }

        if let Some(limit) = self.read_limit {
            if names.len() > limit {
                return Err(StoreError::RequestTooLarge {
                    limit,
                    requested: names.len(),
                });
            }
        }

        {
            let mut state = self.state.write().await;
            if state.pending_failures > 0 {
                state.pending_failures -= 1;
                return Err(StoreError::Unavailable("simulated outage".to_string()));
            }
        }

        let state = self.state.read().await;
        let mut found: Vec<Value> = names
            .iter()
            .filter_map(|name| state.documents.get(&(kind, name.clone())).cloned())
            .collect();

        Ok(match found.len() {
            0 => Value::Null,
            1 => found.remove(0),
            _ => Value::Array(found),
        })
    }

    async fn describe_object(&self, name: &str) -> StoreResult<Option<ObjectSchema>> {
        self.stats.write().await.describe_calls += 1;
        Ok(self.state.read().await.objects.get(name).cloned())
    }

    async fn group_components(&self, group: &str) -> StoreResult<Option<GroupComponents>> {
        Ok(self.state.read().await.groups.get(group).cloned())
    }

    async fn user_assignments(&self, username: &str) -> StoreResult<Option<UserAssignments>> {
        Ok(self.state.read().await.users.get(username).cloned())
    }

    async fn application_labels(&self) -> StoreResult<HashMap<String, String>> {
        Ok(self.state.read().await.applications.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permission_engine::CustomPermission;
    use serde_json::json;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_read_returns_single_or_list() {
        let store = MemoryMetadataStore::new();
        store
            .insert_document(DocumentKind::Profile, json!({"fullName": "Admin"}))
            .await
            .unwrap();
        store
            .insert_document(DocumentKind::Profile, json!({"fullName": "Standard"}))
            .await
            .unwrap();

        let one = store
            .read_documents(DocumentKind::Profile, &names(&["Admin"]))
            .await
            .unwrap();
        assert!(one.is_object());

        let many = store
            .read_documents(DocumentKind::Profile, &names(&["Admin", "Standard", "Missing"]))
            .await
            .unwrap();
        assert_eq!(many.as_array().map(Vec::len), Some(2));

        let none = store
            .read_documents(DocumentKind::Profile, &names(&["Missing"]))
            .await
            .unwrap();
        assert!(none.is_null());
    }

    #[tokio::test]
    async fn test_kinds_are_separate() {
        let store = MemoryMetadataStore::new();
        store
            .insert_document(DocumentKind::Profile, json!({"fullName": "Shared"}))
            .await
            .unwrap();

        let value = store
            .read_documents(DocumentKind::PermissionSet, &names(&["Shared"]))
            .await
            .unwrap();
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn test_read_limit() {
        let store = MemoryMetadataStore::new().with_read_limit(2);
        let err = store
            .read_documents(DocumentKind::PermissionSet, &names(&["a", "b", "c"]))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::RequestTooLarge { limit: 2, requested: 3 });
    }

    #[tokio::test]
    async fn test_insert_requires_full_name() {
        let store = MemoryMetadataStore::new();
        let err = store
            .insert_document(DocumentKind::PermissionSet, json!({"label": "No name"}))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "STORE_ERROR");
    }

    #[tokio::test]
    async fn test_insert_access_document_round_trips_through_metadata() {
        let store = MemoryMetadataStore::new();
        let doc = AccessDocument::new(DocumentKind::PermissionSet, "Support")
            .with_label("Support Agents")
            .with_records(vec![CustomPermission::new("Escalate", true)]);
        store.insert_access_document(&doc).await.unwrap();

        let value = store
            .read_documents(DocumentKind::PermissionSet, &names(&["Support"]))
            .await
            .unwrap();
        let parsed = AccessDocument::from_metadata(DocumentKind::PermissionSet, &value).unwrap();
        assert_eq!(parsed, doc);
    }

    #[tokio::test]
    async fn test_simulated_outage_and_stats() {
        let store = MemoryMetadataStore::new();
        store.fail_next_reads(1).await;

        let err = store
            .read_documents(DocumentKind::Profile, &names(&["Admin"]))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(store
            .read_documents(DocumentKind::Profile, &names(&["Admin"]))
            .await
            .is_ok());

        let stats = store.stats().await;
        assert_eq!(stats.read_calls, 2);
        assert_eq!(stats.names_requested, 2);
    }

    #[tokio::test]
    async fn test_lookups() {
        let store = MemoryMetadataStore::new();
        store
            .insert_object(
                ObjectSchema::new("Account", "Account").with_field("Rating", "Account Rating"),
            )
            .await;
        store
            .insert_group(
                "Sales_Group",
                GroupComponents {
                    member_names: names(&["Sales"]),
                    muting_name: None,
                },
            )
            .await;
        store.insert_user("jdoe", UserAssignments::new("Standard")).await;
        store.insert_application("standard__Sales", "Sales").await;

        let schema = store.describe_object("Account").await.unwrap().unwrap();
        assert_eq!(schema.field_label("Rating"), Some("Account Rating"));
        assert_eq!(schema.field_label("Missing"), None);
        assert!(store.describe_object("Case").await.unwrap().is_none());
        assert!(store.group_components("Sales_Group").await.unwrap().is_some());
        assert_eq!(
            store.user_assignments("jdoe").await.unwrap().unwrap().profile_name,
            "Standard"
        );
        assert_eq!(
            store.application_labels().await.unwrap().get("standard__Sales").map(String::as_str),
            Some("Sales")
        );
    }
}
