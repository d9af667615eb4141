//! # Category Merger
//!
//! Reduces N documents into one conflict-resolved record list per category,
//! then optionally subtracts a muting document.
//!
//! The additive phase is commutative and associative: every category rule is
//! a boolean OR or an ordinal max. The muting phase only revokes grants, and
//! only on keys the additive phase produced.

use std::collections::HashMap;

use crate::category::Category;
use crate::document::{AccessDocument, DocumentKind};
use crate::error::{EngineError, EngineResult};
use crate::records::{
    ApexClassAccess, ApexPageAccess, ApplicationVisibility, CategoryRecord,
    CustomMetadataTypeAccess, CustomPermission, CustomSettingAccess, FieldPermission, FlowAccess,
    ObjectPermission, RecordTypeVisibility, TabSetting, UserPermission,
};

/// Key → record map that remembers first-seen order.
struct MergedRecords<R> {
    index: HashMap<String, usize>,
    records: Vec<R>,
}

impl<R: CategoryRecord> MergedRecords<R> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            records: Vec::new(),
        }
    }

    fn absorb(&mut self, record: &R) {
        match self.index.get(record.key()) {
            Some(&slot) => self.records[slot].absorb(record),
            None => {
                self.index.insert(record.key().to_string(), self.records.len());
                self.records.push(record.clone());
            }
        }
    }

    fn mute(&mut self, muting: &R) {
        if let Some(&slot) = self.index.get(muting.key()) {
            self.records[slot].mute(muting);
        }
    }

    fn finish(self) -> Option<Vec<R>> {
        if self.records.is_empty() {
            None
        } else {
            Some(self.records)
        }
    }
}

fn checked<R: CategoryRecord>(index: usize, record: &R) -> EngineResult<&R> {
    if record.key().trim().is_empty() {
        return Err(EngineError::MalformedRecord {
            category: R::CATEGORY,
            index,
            reason: format!("empty `{}`", R::CATEGORY.key_field()),
        });
    }
    Ok(record)
}

/// Merge one category across `documents`, then subtract `muting`.
///
/// Returns `None` when no contributing document has a record in the
/// category. Input documents are never modified; the result is built from
/// fresh copies.
///
/// # Example
///
/// ```
/// use permission_engine::{merge_category, AccessDocument, CustomPermission, DocumentKind};
///
/// let a = AccessDocument::new(DocumentKind::PermissionSet, "A")
///     .with_records(vec![CustomPermission::new("X", true)]);
/// let mute = AccessDocument::new(DocumentKind::PermissionSet, "Mute")
///     .with_records(vec![CustomPermission::new("X", true)]);
///
/// let merged = merge_category::<CustomPermission>(&[&a], Some(&mute)).unwrap().unwrap();
/// assert!(!merged[0].enabled);
/// ```
pub fn merge_category<R: CategoryRecord>(
    documents: &[&AccessDocument],
    muting: Option<&AccessDocument>,
) -> EngineResult<Option<Vec<R>>> {
    let mut merged = MergedRecords::<R>::new();

    for document in documents {
        for (index, record) in document.records::<R>().iter().enumerate() {
            merged.absorb(checked(index, record)?);
        }
    }

    if let Some(muting) = muting {
        for (index, record) in muting.records::<R>().iter().enumerate() {
            merged.mute(checked(index, record)?);
        }
    }

    let merged = merged.finish();
    let category = R::CATEGORY;
    tracing::trace!(
        category = %category,
        documents = documents.len(),
        muted = muting.is_some(),
        records = merged.as_ref().map_or(0, Vec::len),
        "Merged category"
    );
    Ok(merged)
}

fn merge_slot<R: CategoryRecord>(
    target: &mut AccessDocument,
    documents: &[&AccessDocument],
    muting: Option<&AccessDocument>,
) -> EngineResult<()> {
    *R::slot_mut(target) = merge_category::<R>(documents, muting)?;
    Ok(())
}

/// Merge one category, chosen at runtime, into `target`.
///
/// Layout assignments have no merge semantics and leave `target` untouched.
pub fn merge_category_into(
    category: Category,
    target: &mut AccessDocument,
    documents: &[&AccessDocument],
    muting: Option<&AccessDocument>,
) -> EngineResult<()> {
    match category {
        Category::ApplicationVisibilities => {
            merge_slot::<ApplicationVisibility>(target, documents, muting)
        }
        Category::ClassAccesses => merge_slot::<ApexClassAccess>(target, documents, muting),
        Category::CustomMetadataTypeAccesses => {
            merge_slot::<CustomMetadataTypeAccess>(target, documents, muting)
        }
        Category::CustomPermissions => merge_slot::<CustomPermission>(target, documents, muting),
        Category::CustomSettingAccesses => {
            merge_slot::<CustomSettingAccess>(target, documents, muting)
        }
        Category::FieldPermissions => merge_slot::<FieldPermission>(target, documents, muting),
        Category::FlowAccesses => merge_slot::<FlowAccess>(target, documents, muting),
        Category::ObjectPermissions => merge_slot::<ObjectPermission>(target, documents, muting),
        Category::PageAccesses => merge_slot::<ApexPageAccess>(target, documents, muting),
        Category::RecordTypeVisibilities => {
            merge_slot::<RecordTypeVisibility>(target, documents, muting)
        }
        Category::TabSettings => merge_slot::<TabSetting>(target, documents, muting),
        Category::UserPermissions => merge_slot::<UserPermission>(target, documents, muting),
        Category::LayoutAssignments => Ok(()),
    }
}

/// Merge every mergeable category into a new document of `kind`.
///
/// Layout assignments are left absent; callers that carry them copy them
/// explicitly.
pub fn merge_documents(
    kind: DocumentKind,
    full_name: &str,
    documents: &[&AccessDocument],
    muting: Option<&AccessDocument>,
) -> EngineResult<AccessDocument> {
    let mut merged = AccessDocument::new(kind, full_name);
    for category in Category::mergeable() {
        merge_category_into(category, &mut merged, documents, muting)?;
    }
    Ok(merged)
}
