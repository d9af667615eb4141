//! Export orchestration
//!
//! One export run resolves every requested entity, combines groups and
//! users, and renders a sheet per entity. A bad entity becomes a failure in
//! the report; a failing store aborts the run.

use chrono::{DateTime, Utc};
use permission_engine::{combine_group, combine_user, AccessDocument, DocumentKind, EngineError};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ExportConfig;
use crate::error::{absent_if_not_found, ExportError, ExportResult, StoreResult};
use crate::render::{ReportRenderer, SchemaCatalog, SectionRenderer, Sheet};
use crate::resolve::{DocumentResolver, Resolution};
use crate::retry::with_store_retry;
use crate::store::{GroupComponents, MetadataStore, UserAssignments};

/// Entities to export, by API name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportRequest {
    /// Profiles to export.
    pub profile_names: Vec<String>,
    /// Permission sets to export.
    pub permission_set_names: Vec<String>,
    /// Permission set groups to export, combined and muted.
    pub permission_set_group_names: Vec<String>,
    /// Users whose effective permissions to export.
    pub user_names: Vec<String>,
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

impl ExportRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add profiles.
    pub fn with_profiles(mut self, names: &[&str]) -> Self {
        self.profile_names.extend(owned(names));
        self
    }

    /// Add permission sets.
    pub fn with_permission_sets(mut self, names: &[&str]) -> Self {
        self.permission_set_names.extend(owned(names));
        self
    }

    /// Add permission set groups.
    pub fn with_permission_set_groups(mut self, names: &[&str]) -> Self {
        self.permission_set_group_names.extend(owned(names));
        self
    }

    /// Add users.
    pub fn with_users(mut self, names: &[&str]) -> Self {
        self.user_names.extend(owned(names));
        self
    }

    /// Check if nothing was requested.
    pub fn is_empty(&self) -> bool {
        self.profile_names.is_empty()
            && self.permission_set_names.is_empty()
            && self.permission_set_group_names.is_empty()
            && self.user_names.is_empty()
    }
}

/// An entity that could not be exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityFailure {
    /// Kind of entity.
    pub kind: DocumentKind,
    /// API name of the entity.
    pub name: String,
    /// Stable error code.
    pub code: String,
    /// Human-readable reason.
    pub message: String,
}

impl EntityFailure {
    fn not_found(kind: DocumentKind, name: &str, message: String) -> Self {
        Self {
            kind,
            name: name.to_string(),
            code: "NOT_FOUND".to_string(),
            message,
        }
    }

    fn engine(kind: DocumentKind, name: &str, error: &EngineError) -> Self {
        Self {
            kind,
            name: name.to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }

    fn dependency(kind: DocumentKind, name: &str, cause: &EntityFailure) -> Self {
        Self {
            kind,
            name: name.to_string(),
            code: cause.code.clone(),
            message: format!("{} '{}': {}", cause.kind, cause.name, cause.message),
        }
    }
}

/// The result of one export run.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionReport {
    /// Run identifier.
    pub run_id: Uuid,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// One sheet per exported entity.
    pub sheets: Vec<Sheet>,
    /// Entities that could not be exported.
    pub failures: Vec<EntityFailure>,
}

impl PermissionReport {
    /// Find a sheet by kind and name.
    pub fn sheet(&self, kind: DocumentKind, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.kind == kind && s.name == name)
    }

    /// Find a failure by kind and name.
    pub fn failure(&self, kind: DocumentKind, name: &str) -> Option<&EntityFailure> {
        self.failures.iter().find(|f| f.kind == kind && f.name == name)
    }
}

type Computed = Result<Arc<AccessDocument>, EntityFailure>;

/// Exports effective permissions from a [`MetadataStore`].
pub struct PermissionExporter {
    store: Arc<dyn MetadataStore>,
    config: ExportConfig,
    renderer: Arc<dyn ReportRenderer>,
}

impl std::fmt::Debug for PermissionExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionExporter")
            .field("config", &self.config)
            .finish()
    }
}

impl PermissionExporter {
    /// Create an exporter using the standard sectioned layout.
    pub fn new(store: Arc<dyn MetadataStore>, config: ExportConfig) -> Self {
        let renderer = Arc::new(SectionRenderer::new(config.included_components.clone()));
        Self {
            store,
            config,
            renderer,
        }
    }

    /// Replace the renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Run an export.
    ///
    /// Sheets follow the request: profiles, then permission sets, then
    /// groups, then users, each in request order.
    pub async fn export(&self, request: &ExportRequest) -> ExportResult<PermissionReport> {
        self.config.validate()?;
        if request.is_empty() {
            return Err(ExportError::EmptyRequest);
        }

        let run_id = Uuid::now_v7();
        tracing::info!(
            run_id = %run_id,
            profiles = request.profile_names.len(),
            permission_sets = request.permission_set_names.len(),
            groups = request.permission_set_group_names.len(),
            users = request.user_names.len(),
            "Starting permission export"
        );

        let mut users = HashMap::new();
        for name in unique(&request.user_names) {
            let assignments = absent_if_not_found(
                self.call("user_assignments", |store| {
                    let name = name.clone();
                    async move { store.user_assignments(&name).await }
                })
                .await,
            )?;
            users.insert(name, assignments);
        }

        let group_names = unique(
            request
                .permission_set_group_names
                .iter()
                .chain(users.values().flatten().flat_map(|u| &u.permission_set_group_names)),
        );
        let mut groups = HashMap::new();
        for name in group_names {
            let components = absent_if_not_found(
                self.call("group_components", |store| {
                    let name = name.clone();
                    async move { store.group_components(&name).await }
                })
                .await,
            )?;
            groups.insert(name, components);
        }

        let profile_names = unique(
            request
                .profile_names
                .iter()
                .chain(users.values().flatten().map(|u| &u.profile_name)),
        );
        let permission_set_names = unique(
            request
                .permission_set_names
                .iter()
                .chain(groups.values().flatten().flat_map(|g| {
                    g.member_names.iter().chain(g.muting_name.as_ref())
                }))
                .chain(users.values().flatten().flat_map(|u| &u.permission_set_names)),
        );

        let mut resolver = DocumentResolver::new(Arc::clone(&self.store), &self.config);
        resolver.resolve(DocumentKind::Profile, &profile_names).await?;
        resolver
            .resolve(DocumentKind::PermissionSet, &permission_set_names)
            .await?;

        let combined_groups: HashMap<String, Computed> = groups
            .iter()
            .map(|(name, components)| {
                (
                    name.clone(),
                    combine_group_entity(&resolver, name, components.as_ref()),
                )
            })
            .collect();

        let combined_users: HashMap<String, Computed> = users
            .iter()
            .map(|(name, assignments)| {
                (
                    name.clone(),
                    combine_user_entity(&resolver, &combined_groups, name, assignments.as_ref()),
                )
            })
            .collect();

        let mut entities: Vec<(DocumentKind, &String, Computed)> = Vec::new();
        for name in &request.profile_names {
            entities.push((
                DocumentKind::Profile,
                name,
                lookup(&resolver, DocumentKind::Profile, name),
            ));
        }
        for name in &request.permission_set_names {
            entities.push((
                DocumentKind::PermissionSet,
                name,
                lookup(&resolver, DocumentKind::PermissionSet, name),
            ));
        }
        for name in &request.permission_set_group_names {
            entities.push((
                DocumentKind::PermissionSetGroup,
                name,
                computed(&combined_groups, DocumentKind::PermissionSetGroup, name),
            ));
        }
        for name in &request.user_names {
            entities.push((
                DocumentKind::User,
                name,
                computed(&combined_users, DocumentKind::User, name),
            ));
        }

        let objects: BTreeSet<String> = entities
            .iter()
            .filter_map(|(_, _, result)| result.as_ref().ok())
            .flat_map(|doc| doc.permitted_objects().map(str::to_string))
            .collect();
        let schemas = resolver.describe_objects(objects).await?;
        let applications = self
            .call("application_labels", |store| async move { store.application_labels().await })
            .await?;
        let catalog = SchemaCatalog::new(schemas, applications);

        let mut sheets = Vec::new();
        let mut failures = Vec::new();
        for (kind, name, result) in entities {
            match result {
                Ok(document) => sheets.push(self.renderer.render(&document, &catalog)),
                Err(failure) => {
                    tracing::warn!(
                        run_id = %run_id,
                        kind = %kind,
                        name = %name,
                        code = %failure.code,
                        reason = %failure.message,
                        "Entity not exported"
                    );
                    failures.push(failure);
                }
            }
        }

        tracing::info!(
            run_id = %run_id,
            sheets = sheets.len(),
            failures = failures.len(),
            "Permission export finished"
        );

        Ok(PermissionReport {
            run_id,
            generated_at: Utc::now(),
            sheets,
            failures,
        })
    }

    async fn call<T, F, Fut>(&self, operation: &str, f: F) -> StoreResult<T>
    where
        F: Fn(Arc<dyn MetadataStore>) -> Fut,
        Fut: std::future::Future<Output = StoreResult<T>>,
    {
        with_store_retry(&self.config.retry, operation, || f(Arc::clone(&self.store))).await
    }
}

fn unique<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

fn lookup(resolver: &DocumentResolver, kind: DocumentKind, name: &str) -> Computed {
    match resolver.lookup(kind, name) {
        Resolution::Found(document) => Ok(document),
        Resolution::Malformed(e) => Err(EntityFailure::engine(kind, name, &e)),
        Resolution::Missing => Err(EntityFailure::not_found(
            kind,
            name,
            format!("{} '{}' not found", kind, name),
        )),
    }
}

fn computed(results: &HashMap<String, Computed>, kind: DocumentKind, name: &str) -> Computed {
    results.get(name).cloned().unwrap_or_else(|| {
        Err(EntityFailure::not_found(
            kind,
            name,
            format!("{} '{}' was not computed", kind, name),
        ))
    })
}

fn combine_group_entity(
    resolver: &DocumentResolver,
    name: &str,
    components: Option<&GroupComponents>,
) -> Computed {
    let kind = DocumentKind::PermissionSetGroup;
    let components = components.ok_or_else(|| {
        EntityFailure::not_found(kind, name, format!("permission set group '{}' not found", name))
    })?;

    let members = components
        .member_names
        .iter()
        .map(|member| lookup(resolver, DocumentKind::PermissionSet, member))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|cause| EntityFailure::dependency(kind, name, &cause))?;
    let muting = components
        .muting_name
        .as_ref()
        .map(|muting| lookup(resolver, DocumentKind::PermissionSet, muting))
        .transpose()
        .map_err(|cause| EntityFailure::dependency(kind, name, &cause))?;

    let members: Vec<&AccessDocument> = members.iter().map(Arc::as_ref).collect();
    combine_group(name, &members, muting.as_deref())
        .map(Arc::new)
        .map_err(|e| EntityFailure::engine(kind, name, &e))
}

fn combine_user_entity(
    resolver: &DocumentResolver,
    groups: &HashMap<String, Computed>,
    name: &str,
    assignments: Option<&UserAssignments>,
) -> Computed {
    let kind = DocumentKind::User;
    let assignments = assignments
        .ok_or_else(|| EntityFailure::not_found(kind, name, format!("user '{}' not found", name)))?;

    let profile = lookup(resolver, DocumentKind::Profile, &assignments.profile_name)
        .map_err(|cause| EntityFailure::dependency(kind, name, &cause))?;

    let mut contributors = Vec::new();
    for set in &assignments.permission_set_names {
        contributors.push(
            lookup(resolver, DocumentKind::PermissionSet, set)
                .map_err(|cause| EntityFailure::dependency(kind, name, &cause))?,
        );
    }
    for group in &assignments.permission_set_group_names {
        contributors.push(
            computed(groups, DocumentKind::PermissionSetGroup, group)
                .map_err(|cause| EntityFailure::dependency(kind, name, &cause))?,
        );
    }

    let contributors: Vec<&AccessDocument> = contributors.iter().map(Arc::as_ref).collect();
    combine_user(name, &profile, &contributors)
        .map(Arc::new)
        .map_err(|e| EntityFailure::engine(kind, name, &e))
}
