//! # Permission Export
//!
//! Exports the effective permissions of profiles, permission sets,
//! permission set groups and users as sectioned report sheets.
//!
//! ## Overview
//!
//! The permission-export crate handles:
//! - **Store**: An async metadata store abstraction with an in-memory backend
//! - **Resolution**: Chunked, concurrent, cached document reads
//! - **Combination**: Groups and users combined with `permission-engine`
//! - **Rendering**: One sheet per entity, sections filtered by component
//! - **Configuration**: Environment-driven limits and retry behavior
//!
//! ## Usage
//!
//! ```rust
//! use permission_engine::{AccessDocument, CustomPermission, DocumentKind};
//! use permission_export::{
//!     ExportConfig, ExportRequest, GroupComponents, MemoryMetadataStore, PermissionExporter,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = MemoryMetadataStore::new();
//! store
//!     .insert_access_document(
//!         &AccessDocument::new(DocumentKind::PermissionSet, "Support")
//!             .with_records(vec![CustomPermission::new("Escalate", true)]),
//!     )
//!     .await
//!     .unwrap();
//! store
//!     .insert_group(
//!         "Support_Team",
//!         GroupComponents { member_names: vec!["Support".to_string()], muting_name: None },
//!     )
//!     .await;
//!
//! let exporter = PermissionExporter::new(Arc::new(store), ExportConfig::default());
//! let request = ExportRequest::new().with_permission_set_groups(&["Support_Team"]);
//! let report = exporter.export(&request).await.unwrap();
//!
//! assert_eq!(report.sheets[0].title, "Permission Set Group: Support_Team");
//! # }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod render;
pub mod resolve;
pub mod retry;
pub mod store;

// Re-export main types for convenience
pub use config::{ConfigError, ExportConfig, IncludedComponents};
pub use error::{ExportError, ExportResult, StoreError, StoreResult};
pub use export::{EntityFailure, ExportRequest, PermissionExporter, PermissionReport};
pub use render::{ReportRenderer, SchemaCatalog, Section, SectionRenderer, Sheet};
pub use resolve::{DocumentResolver, Resolution};
pub use retry::{with_store_retry, RetryConfig};
pub use store::{
    FieldSchema, GroupComponents, MemoryMetadataStore, MetadataStore, ObjectSchema, StoreStats,
    UserAssignments,
};
