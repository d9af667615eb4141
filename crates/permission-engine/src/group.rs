//! # Permission Set Group Combiner
//!
//! A permission set group grants the union of its member permission sets,
//! minus whatever its muting permission set names.

use crate::document::{AccessDocument, DocumentKind};
use crate::error::{EngineError, EngineResult};
use crate::merge::merge_documents;

fn expect_permission_set(document: &AccessDocument) -> EngineResult<()> {
    if document.kind != DocumentKind::PermissionSet {
        return Err(EngineError::UnexpectedKind {
            expected: "PermissionSet",
            actual: document.kind,
            name: document.full_name.clone(),
        });
    }
    Ok(())
}

/// Combine a group's member permission sets and apply its muting set.
///
/// An empty group yields a document with every category absent, whether or
/// not a muting set is supplied. Its muting document is not inspected, so
/// the kind checks only apply once there is something to mute. Groups carry
/// no layout assignments.
///
/// # Example
///
/// ```
/// use permission_engine::{combine_group, AccessDocument, CustomPermission, DocumentKind};
///
/// let member = AccessDocument::new(DocumentKind::PermissionSet, "Support")
///     .with_records(vec![CustomPermission::new("Escalate", true)]);
/// let muting = AccessDocument::new(DocumentKind::PermissionSet, "Support_Muting")
///     .with_records(vec![CustomPermission::new("Escalate", true)]);
///
/// let group = combine_group("Support_Group", &[&member], Some(&muting)).unwrap();
/// assert!(!group.records::<CustomPermission>()[0].enabled);
/// ```
pub fn combine_group(
    name: &str,
    members: &[&AccessDocument],
    muting: Option<&AccessDocument>,
) -> EngineResult<AccessDocument> {
    if members.is_empty() {
        tracing::debug!(group = name, "Permission set group has no members");
        return Ok(AccessDocument::new(DocumentKind::PermissionSetGroup, name));
    }

    for member in members {
        expect_permission_set(member)?;
    }
    if let Some(muting) = muting {
        expect_permission_set(muting)?;
    }

    let combined = merge_documents(DocumentKind::PermissionSetGroup, name, members, muting)?;

    tracing::debug!(
        group = name,
        members = members.len(),
        muting = muting.map(|m| m.full_name.as_str()),
        "Combined permission set group"
    );
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::records::{
        ApplicationVisibility, CustomPermission, FieldPermission, LayoutAssignment,
        ObjectPermission, TabSetting, TabVisibility, UserPermission,
    };

    fn ps(name: &str) -> AccessDocument {
        AccessDocument::new(DocumentKind::PermissionSet, name)
    }

    #[test]
    fn test_empty_group_is_all_absent() {
        let muting = ps("Mute").with_records(vec![CustomPermission::new("X", true)]);

        let without = combine_group("Empty", &[], None).unwrap();
        let with = combine_group("Empty", &[], Some(&muting)).unwrap();

        for group in [&without, &with] {
            assert_eq!(group.kind, DocumentKind::PermissionSetGroup);
            assert_eq!(group.full_name, "Empty");
            assert!(group.is_empty());
        }
    }

    #[test]
    fn test_empty_group_skips_muting_kind_check() {
        let profile = AccessDocument::new(DocumentKind::Profile, "Standard")
            .with_records(vec![CustomPermission::new("X", true)]);

        let group = combine_group("Empty", &[], Some(&profile)).unwrap();
        assert_eq!(group.kind, DocumentKind::PermissionSetGroup);
        assert!(group.is_empty());
    }

    #[test]
    fn test_group_muting_revokes_custom_permission() {
        let a = ps("A").with_records(vec![CustomPermission::new("X", true)]);
        let b = ps("B").with_records(vec![
            CustomPermission::new("X", true),
            CustomPermission::new("Y", true),
        ]);
        let muting = ps("Mute").with_records(vec![CustomPermission::new("X", true)]);

        let group = combine_group("G", &[&a, &b], Some(&muting)).unwrap();
        let perms = group.records::<CustomPermission>();
        assert_eq!(perms.len(), 2);
        assert!(perms.iter().any(|p| p.name == "X" && !p.enabled));
        assert!(perms.iter().any(|p| p.name == "Y" && p.enabled));
    }

    #[test]
    fn test_group_tab_scenario() {
        let tab = |visibility| TabSetting::new("standard-Case", visibility);
        let a = ps("A").with_records(vec![tab(TabVisibility::Available)]);
        let b = ps("B").with_records(vec![tab(TabVisibility::Visible)]);

        let unmuted = combine_group("G", &[&a, &b], None).unwrap();
        assert_eq!(unmuted.records::<TabSetting>()[0].visibility, TabVisibility::Visible);

        let muting = ps("Mute").with_records(vec![tab(TabVisibility::Available)]);
        let muted = combine_group("G", &[&a, &b], Some(&muting)).unwrap();
        assert_eq!(muted.records::<TabSetting>()[0].visibility, TabVisibility::None);
    }

    #[test]
    fn test_group_field_scenario() {
        let a = ps("A").with_records(vec![FieldPermission::new("Account.Rating", true, false)]);
        let b = ps("B").with_records(vec![FieldPermission::new("Account.Rating", false, true)]);
        let muting =
            ps("Mute").with_records(vec![FieldPermission::new("Account.Rating", true, false)]);

        let unmuted = combine_group("G", &[&a, &b], None).unwrap();
        assert_eq!(
            unmuted.records::<FieldPermission>(),
            &[FieldPermission::new("Account.Rating", true, true)]
        );

        let muted = combine_group("G", &[&a, &b], Some(&muting)).unwrap();
        assert_eq!(
            muted.records::<FieldPermission>(),
            &[FieldPermission::new("Account.Rating", false, false)]
        );
    }

    #[test]
    fn test_group_object_muting_is_per_flag() {
        let member = ps("A").with_records(vec![ObjectPermission {
            allow_read: true,
            allow_create: true,
            allow_edit: true,
            ..ObjectPermission::new("Opportunity")
        }]);
        let muting = ps("Mute").with_records(vec![ObjectPermission {
            allow_edit: true,
            ..ObjectPermission::new("Opportunity")
        }]);

        let group = combine_group("G", &[&member], Some(&muting)).unwrap();
        assert_eq!(group.records::<ObjectPermission>()[0].granted(), vec!["Read", "Create"]);
    }

    #[test]
    fn test_group_without_layouts() {
        let member = ps("A").with_records(vec![UserPermission::new("ApiEnabled", true)]);
        let group = combine_group("G", &[&member], None).unwrap();
        assert!(!group.has_category(Category::LayoutAssignments));
        assert!(group.records::<LayoutAssignment>().is_empty());
        // Categories no member carries stay absent
        assert!(!group.has_category(Category::ApplicationVisibilities));
        assert!(group.records::<ApplicationVisibility>().is_empty());
    }

    #[test]
    fn test_group_rejects_profile_member() {
        let profile = AccessDocument::new(DocumentKind::Profile, "Admin");
        let err = combine_group("G", &[&profile], None).unwrap_err();
        assert_eq!(err.error_code(), "UNEXPECTED_KIND");

        let member = ps("A");
        let err = combine_group("G", &[&member], Some(&profile)).unwrap_err();
        assert!(err.to_string().contains("Admin"));
    }

    #[test]
    fn test_same_member_in_two_groups() {
        let shared = ps("Shared").with_records(vec![CustomPermission::new("X", true)]);
        let muting = ps("Mute").with_records(vec![CustomPermission::new("X", true)]);

        let muted = combine_group("G1", &[&shared], Some(&muting)).unwrap();
        let plain = combine_group("G2", &[&shared], None).unwrap();

        assert!(!muted.records::<CustomPermission>()[0].enabled);
        assert!(plain.records::<CustomPermission>()[0].enabled);
        assert!(shared.records::<CustomPermission>()[0].enabled);
    }
}
