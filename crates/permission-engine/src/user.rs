//! # User Effective-Permission Combiner
//!
//! A user's effective permissions are the union of their profile, their
//! directly assigned permission sets and their already-combined permission
//! set groups. Nothing is muted at this level.

use crate::document::{AccessDocument, DocumentKind};
use crate::error::{EngineError, EngineResult};
use crate::merge::merge_documents;

/// Combine a user's profile with their permission set and group assignments.
///
/// The profile contributes additively to every category and is the only
/// source of page layout assignments, which are copied verbatim.
///
/// # Example
///
/// ```
/// use permission_engine::{combine_user, AccessDocument, ApplicationVisibility, DocumentKind};
///
/// let profile = AccessDocument::new(DocumentKind::Profile, "Standard User")
///     .with_records(vec![ApplicationVisibility::new("standard__Sales", false)]);
/// let ps = AccessDocument::new(DocumentKind::PermissionSet, "Sales_Apps")
///     .with_records(vec![ApplicationVisibility::new("standard__Sales", true)]);
///
/// let user = combine_user("jdoe@example.com", &profile, &[&ps]).unwrap();
/// assert!(user.records::<ApplicationVisibility>()[0].visible);
/// ```
pub fn combine_user(
    name: &str,
    profile: &AccessDocument,
    assignments: &[&AccessDocument],
) -> EngineResult<AccessDocument> {
    if profile.kind != DocumentKind::Profile {
        return Err(EngineError::UnexpectedKind {
            expected: "Profile",
            actual: profile.kind,
            name: profile.full_name.clone(),
        });
    }
    for assignment in assignments {
        if !matches!(
            assignment.kind,
            DocumentKind::PermissionSet | DocumentKind::PermissionSetGroup
        ) {
            return Err(EngineError::UnexpectedKind {
                expected: "PermissionSet or PermissionSetGroup",
                actual: assignment.kind,
                name: assignment.full_name.clone(),
            });
        }
    }

    let mut contributors = Vec::with_capacity(assignments.len() + 1);
    contributors.push(profile);
    contributors.extend_from_slice(assignments);

    let mut combined = merge_documents(DocumentKind::User, name, &contributors, None)?;
    combined.layout_assignments = profile.layout_assignments.clone();

    tracing::debug!(
        user = name,
        profile = %profile.full_name,
        assignments = assignments.len(),
        "Combined user permissions"
    );
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::group::combine_group;
    use crate::records::{
        ApplicationVisibility, CustomPermission, FlowAccess, LayoutAssignment, ObjectPermission,
        TabSetting, TabVisibility,
    };

    fn profile() -> AccessDocument {
        AccessDocument::new(DocumentKind::Profile, "Standard User")
    }

    fn ps(name: &str) -> AccessDocument {
        AccessDocument::new(DocumentKind::PermissionSet, name)
    }

    #[test]
    fn test_profile_never_subtracts() {
        let sales = |visible| ApplicationVisibility::new("standard__Sales", visible);
        let profile = profile().with_records(vec![sales(false)]);
        let grant = ps("Sales").with_records(vec![sales(true)]);

        let user = combine_user("u", &profile, &[&grant]).unwrap();
        let apps = user.records::<ApplicationVisibility>();
        assert_eq!(apps.len(), 1);
        assert!(apps[0].visible);
    }

    #[test]
    fn test_profile_only_user() {
        let profile = profile().with_records(vec![FlowAccess::new("Onboarding", true)]);
        let user = combine_user("u", &profile, &[]).unwrap();

        assert_eq!(user.kind, DocumentKind::User);
        assert_eq!(user.full_name, "u");
        assert_eq!(user.records::<FlowAccess>(), profile.records::<FlowAccess>());
    }

    #[test]
    fn test_layouts_come_from_profile_only() {
        let layouts = vec![
            LayoutAssignment::new("Account-Account Layout", None),
            LayoutAssignment::new("Account-Partner Layout", Some("Account.Partner".to_string())),
        ];
        let profile = profile().with_records(layouts.clone());
        let mut assigned = ps("Extra");
        assigned.layout_assignments = Some(vec![LayoutAssignment::new("Case-Case Layout", None)]);

        let user = combine_user("u", &profile, &[&assigned]).unwrap();
        assert_eq!(user.layout_assignments, Some(layouts));
    }

    #[test]
    fn test_profile_without_layouts_yields_absent_layouts() {
        let user = combine_user("u", &profile(), &[]).unwrap();
        assert!(!user.has_category(Category::LayoutAssignments));
    }

    #[test]
    fn test_group_result_is_ordinary_contributor() {
        let member = ps("Member").with_records(vec![CustomPermission::new("X", true)]);
        let muting = ps("Mute").with_records(vec![CustomPermission::new("X", true)]);
        let group = combine_group("G", &[&member], Some(&muting)).unwrap();

        // Muted inside the group, granted again by a direct assignment
        let direct = ps("Direct").with_records(vec![CustomPermission::new("X", true)]);
        let user = combine_user("u", &profile(), &[&group, &direct]).unwrap();
        assert!(user.records::<CustomPermission>()[0].enabled);

        // Without the direct assignment the group's muted result stands
        let user = combine_user("u", &profile(), &[&group]).unwrap();
        assert!(!user.records::<CustomPermission>()[0].enabled);
    }

    #[test]
    fn test_profile_and_permission_set_tabs_share_one_field() {
        let profile = profile()
            .with_records(vec![TabSetting::new("standard-Account", TabVisibility::Available)]);
        let grant = ps("Tabs").with_records(vec![
            TabSetting::new("standard-Account", TabVisibility::Visible),
            TabSetting::new("standard-Lead", TabVisibility::Available),
        ]);

        let user = combine_user("u", &profile, &[&grant]).unwrap();
        let tabs = user.records::<TabSetting>();
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0].visibility, TabVisibility::Visible);

        // A user's document writes tabs back the way a profile does
        let value = user.to_metadata().unwrap();
        assert!(value.get("tabVisibilities").is_some());
    }

    #[test]
    fn test_object_permissions_union() {
        let profile = profile().with_records(vec![ObjectPermission {
            allow_read: true,
            ..ObjectPermission::new("Account")
        }]);
        let grant = ps("Edit").with_records(vec![ObjectPermission {
            allow_edit: true,
            ..ObjectPermission::new("Account")
        }]);

        let user = combine_user("u", &profile, &[&grant]).unwrap();
        assert_eq!(user.records::<ObjectPermission>()[0].granted(), vec!["Read", "Edit"]);
    }

    #[test]
    fn test_kind_checks() {
        let not_profile = ps("Imposter");
        let err = combine_user("u", &not_profile, &[]).unwrap_err();
        assert_eq!(err.error_code(), "UNEXPECTED_KIND");

        let second_profile = profile();
        let err = combine_user("u", &profile(), &[&second_profile]).unwrap_err();
        assert_eq!(err.error_code(), "UNEXPECTED_KIND");
    }
}
