//! # Permission Engine
//!
//! This crate computes effective access-control configuration from CRM
//! metadata: profiles, permission sets, permission set groups and users.
//!
//! ## Overview
//!
//! The permission-engine crate handles:
//! - **Documents**: Typed access documents with one list per category
//! - **Normalization**: Single-or-list metadata fields turned into sequences
//! - **Merging**: Per-category conflict resolution across many documents
//! - **Groups**: Member permission sets combined, then muted
//! - **Users**: Profile plus assigned sets and groups combined
//!
//! ## Merge Rules
//!
//! ```text
//! Category                     Key           Rule
//! applicationVisibilities      application   visible OR
//! classAccesses                apexClass     enabled OR
//! customMetadataTypeAccesses   name          enabled OR
//! customPermissions            name          enabled OR
//! customSettingAccesses        name          enabled OR
//! flowAccesses                 flow          enabled OR
//! pageAccesses                 apexPage      enabled OR
//! recordTypeVisibilities       recordType    visible OR
//! userPermissions              name          enabled OR
//! tabSettings                  tab           None < Available < Visible, max wins
//! objectPermissions            object        six flags, OR each
//! fieldPermissions             field         readable OR, editable OR
//! layoutAssignments            -             copied from the profile
//! ```
//!
//! Muting only happens inside a permission set group. A muting record
//! revokes what it names and never grants.
//!
//! ## Usage
//!
//! ```rust
//! use permission_engine::{
//!     combine_group, combine_user, AccessDocument, DocumentKind, ObjectPermission,
//! };
//!
//! let read = ObjectPermission { allow_read: true, ..ObjectPermission::new("Account") };
//! let edit = ObjectPermission { allow_edit: true, ..ObjectPermission::new("Account") };
//! let reader = AccessDocument::new(DocumentKind::PermissionSet, "Account_Read")
//!     .with_records(vec![read]);
//! let editor = AccessDocument::new(DocumentKind::PermissionSet, "Account_Edit")
//!     .with_records(vec![edit]);
//!
//! let group = combine_group("Account_Team", &[&reader, &editor], None).unwrap();
//! let profile = AccessDocument::new(DocumentKind::Profile, "Standard User");
//! let user = combine_user("jdoe@example.com", &profile, &[&group]).unwrap();
//!
//! let account = &user.records::<ObjectPermission>()[0];
//! assert!(account.allow_read && account.allow_edit);
//! assert!(!account.allow_delete);
//! ```

pub mod category;
pub mod document;
pub mod error;
pub mod group;
pub mod merge;
pub mod normalize;
pub mod records;
pub mod user;

// Re-export main types for convenience
pub use category::Category;
pub use document::{AccessDocument, DocumentKind};
pub use error::{EngineError, EngineResult};
pub use group::combine_group;
pub use merge::{merge_category, merge_category_into, merge_documents};
pub use records::{
    ApexClassAccess, ApexPageAccess, ApplicationVisibility, CategoryRecord,
    CustomMetadataTypeAccess, CustomPermission, CustomSettingAccess, FieldPermission, FlowAccess,
    LayoutAssignment, MetadataRecord, ObjectPermission, RecordTypeVisibility, TabSetting,
    TabVisibility, UserPermission,
};
pub use user::combine_user;
