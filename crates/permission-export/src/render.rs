//! Report rendering
//!
//! Turns an effective-permission document into a sheet of titled tabular
//! sections. Sections only appear for categories the document carries and
//! the configuration includes.

use permission_engine::{
    AccessDocument, ApexClassAccess, ApexPageAccess, ApplicationVisibility, Category,
    CustomMetadataTypeAccess, CustomPermission, CustomSettingAccess, DocumentKind, FieldPermission,
    FlowAccess, LayoutAssignment, ObjectPermission, RecordTypeVisibility, TabSetting,
    UserPermission,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::config::IncludedComponents;
use crate::store::ObjectSchema;

/// Object and application labels used while rendering.
///
/// Unknown objects and fields render under their API names.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    objects: HashMap<String, ObjectSchema>,
    applications: HashMap<String, String>,
}

impl SchemaCatalog {
    /// Create a catalog.
    pub fn new(
        objects: HashMap<String, ObjectSchema>,
        applications: HashMap<String, String>,
    ) -> Self {
        Self {
            objects,
            applications,
        }
    }

    /// Object label, or the API name when unknown.
    pub fn object_label<'a>(&'a self, object: &'a str) -> &'a str {
        self.objects
            .get(object)
            .map(|schema| schema.label.as_str())
            .unwrap_or(object)
    }

    /// Field label, or the field API name when unknown.
    pub fn field_label<'a>(&'a self, object: &str, field: &'a str) -> &'a str {
        self.objects
            .get(object)
            .and_then(|schema| schema.field_label(field))
            .unwrap_or(field)
    }

    /// Application label, `None` when the application is unknown.
    pub fn application_label(&self, application: &str) -> Option<&str> {
        self.applications.get(application).map(String::as_str)
    }
}

/// One titled table in a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Category the section renders.
    pub category: Category,
    /// Section title.
    pub title: String,
    /// Column headers.
    pub columns: Vec<String>,
    /// Table rows, one cell per column.
    pub rows: Vec<Vec<String>>,
}

/// The rendered permissions of one profile, permission set, group or user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sheet {
    /// Kind of entity.
    pub kind: DocumentKind,
    /// API name of the entity.
    pub name: String,
    /// Sheet title.
    pub title: String,
    /// Sections, in report order.
    pub sections: Vec<Section>,
}

impl Sheet {
    /// Find a section by category.
    pub fn section(&self, category: Category) -> Option<&Section> {
        self.sections.iter().find(|s| s.category == category)
    }
}

/// Renders documents into sheets.
pub trait ReportRenderer: Send + Sync {
    /// Render one document.
    fn render(&self, document: &AccessDocument, catalog: &SchemaCatalog) -> Sheet;
}

/// The standard sectioned report layout.
#[derive(Debug, Clone, Default)]
pub struct SectionRenderer {
    components: IncludedComponents,
}

fn kind_title(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Profile => "Profile",
        DocumentKind::PermissionSet => "Permission Set",
        DocumentKind::PermissionSetGroup => "Permission Set Group",
        DocumentKind::User => "User",
    }
}

fn row<const N: usize>(cells: [&str; N]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn enabled_rows<'a, R: 'a>(
    records: &'a [R],
    name: impl Fn(&'a R) -> &'a str,
    enabled: impl Fn(&R) -> bool,
) -> Vec<Vec<String>> {
    let mut names: Vec<&str> = records.iter().filter(|r| enabled(*r)).map(name).collect();
    names.sort_unstable();
    names.into_iter().map(|n| row([n, "true"])).collect()
}

impl SectionRenderer {
    /// Create a renderer emitting the given components.
    pub fn new(components: IncludedComponents) -> Self {
        Self { components }
    }

    fn section(
        &self,
        document: &AccessDocument,
        category: Category,
        columns: &[&str],
        rows: impl FnOnce() -> Vec<Vec<String>>,
    ) -> Option<Section> {
        let present = document.category_len(category).unwrap_or(0) > 0;
        if !self.components.includes(category) || !present {
            return None;
        }
        Some(Section {
            category,
            title: category.title().to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows(),
        })
    }

    fn applications(&self, document: &AccessDocument, catalog: &SchemaCatalog) -> Option<Section> {
        self.section(
            document,
            Category::ApplicationVisibilities,
            &["Label", "API Name", "Default"],
            || {
                // Only visible apps are listed, so a muted app drops out of
                // a group's sheet instead of showing up as revoked.
                let mut apps: Vec<(&str, &ApplicationVisibility)> = document
                    .records::<ApplicationVisibility>()
                    .iter()
                    .filter(|app| app.visible)
                    .filter_map(|app| {
                        catalog
                            .application_label(&app.application)
                            .map(|label| (label, app))
                    })
                    .collect();
                apps.sort_by(|a, b| {
                    a.0.cmp(b.0)
                        .then_with(|| a.1.application.cmp(&b.1.application))
                });
                apps.into_iter()
                    .map(|(label, app)| {
                        let default = if app.is_default { "true" } else { "false" };
                        row([label, app.application.as_str(), default])
                    })
                    .collect()
            },
        )
    }

    fn layouts(
        &self,
        document: &AccessDocument,
        catalog: &SchemaCatalog,
        permitted: &HashSet<&str>,
    ) -> Option<Section> {
        if !document.kind.has_layouts() {
            return None;
        }
        self.section(
            document,
            Category::LayoutAssignments,
            &["Object Label", "Object API Name", "Record Type", "Page Layout Assignment"],
            || {
                let mut rows: Vec<(&str, &str, &str, &str)> = document
                    .records::<LayoutAssignment>()
                    .iter()
                    .filter_map(|assignment| {
                        let (object, _) = assignment.object_and_layout();
                        permitted.contains(object).then(|| {
                            (
                                catalog.object_label(object),
                                object,
                                assignment.record_type_name(),
                                assignment.layout.as_str(),
                            )
                        })
                    })
                    .collect();
                rows.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.2.cmp(b.2)));
                rows.into_iter().map(|(l, o, rt, layout)| row([l, o, rt, layout])).collect()
            },
        )
    }

    fn objects(&self, document: &AccessDocument, catalog: &SchemaCatalog) -> Option<Section> {
        self.section(
            document,
            Category::ObjectPermissions,
            &["Label", "API Name", "Permission"],
            || {
                let mut rows: Vec<(&str, &ObjectPermission)> = document
                    .records::<ObjectPermission>()
                    .iter()
                    .map(|op| (catalog.object_label(&op.object), op))
                    .collect();
                rows.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.object.cmp(&b.1.object)));
                rows.into_iter()
                    .map(|(label, op)| row([label, op.object.as_str(), &op.granted().join("/")]))
                    .collect()
            },
        )
    }

    fn fields(
        &self,
        document: &AccessDocument,
        catalog: &SchemaCatalog,
        permitted: &HashSet<&str>,
    ) -> Option<Section> {
        self.section(
            document,
            Category::FieldPermissions,
            &["Object Label", "Object API Name", "Field Label", "Field API Name", "Permission"],
            || {
                let mut rows: Vec<[&str; 5]> = document
                    .records::<FieldPermission>()
                    .iter()
                    .filter_map(|fp| {
                        let (object, field) = fp.object_and_field();
                        let access = if fp.editable {
                            "Edit"
                        } else if fp.readable {
                            "Read"
                        } else {
                            return None;
                        };
                        permitted.contains(object).then(|| {
                            [
                                catalog.object_label(object),
                                object,
                                catalog.field_label(object, field),
                                field,
                                access,
                            ]
                        })
                    })
                    .collect();
                rows.sort_by(|a, b| a[0].cmp(b[0]).then_with(|| a[3].cmp(b[3])));
                rows.into_iter().map(row).collect()
            },
        )
    }

    fn record_types(&self, document: &AccessDocument) -> Option<Section> {
        self.section(document, Category::RecordTypeVisibilities, &["Name", "Visibility"], || {
            let mut rows: Vec<&RecordTypeVisibility> =
                document.records::<RecordTypeVisibility>().iter().collect();
            rows.sort_by(|a, b| a.record_type.cmp(&b.record_type));
            rows.into_iter()
                .map(|rt| row([rt.record_type.as_str(), if rt.visible { "true" } else { "false" }]))
                .collect()
        })
    }

    fn tabs(&self, document: &AccessDocument) -> Option<Section> {
        self.section(document, Category::TabSettings, &["Name", "Visibility"], || {
            let mut rows: Vec<&TabSetting> = document.records::<TabSetting>().iter().collect();
            rows.sort_by(|a, b| a.tab.cmp(&b.tab));
            rows.into_iter()
                .map(|tab| row([tab.tab.as_str(), tab.visibility.as_str()]))
                .collect()
        })
    }
}

impl ReportRenderer for SectionRenderer {
    fn render(&self, document: &AccessDocument, catalog: &SchemaCatalog) -> Sheet {
        let permitted: HashSet<&str> = document.permitted_objects().collect();
        let enabled = &["Name", "Enabled"];

        let sections = [
            self.applications(document, catalog),
            self.section(document, Category::ClassAccesses, enabled, || {
                enabled_rows(
                    document.records::<ApexClassAccess>(),
                    |r| r.apex_class.as_str(),
                    |r| r.enabled,
                )
            }),
            self.section(document, Category::CustomMetadataTypeAccesses, enabled, || {
                enabled_rows(
                    document.records::<CustomMetadataTypeAccess>(),
                    |r| r.name.as_str(),
                    |r| r.enabled,
                )
            }),
            self.section(document, Category::CustomPermissions, enabled, || {
                enabled_rows(
                    document.records::<CustomPermission>(),
                    |r| r.name.as_str(),
                    |r| r.enabled,
                )
            }),
            self.section(document, Category::CustomSettingAccesses, enabled, || {
                enabled_rows(
                    document.records::<CustomSettingAccess>(),
                    |r| r.name.as_str(),
                    |r| r.enabled,
                )
            }),
            self.section(document, Category::FlowAccesses, enabled, || {
                enabled_rows(document.records::<FlowAccess>(), |r| r.flow.as_str(), |r| r.enabled)
            }),
            self.layouts(document, catalog, &permitted),
            self.objects(document, catalog),
            self.fields(document, catalog, &permitted),
            self.section(document, Category::PageAccesses, enabled, || {
                enabled_rows(
                    document.records::<ApexPageAccess>(),
                    |r| r.apex_page.as_str(),
                    |r| r.enabled,
                )
            }),
            self.record_types(document),
            self.tabs(document),
            self.section(document, Category::UserPermissions, &["Permission", "Access"], || {
                enabled_rows(
                    document.records::<UserPermission>(),
                    |r| r.name.as_str(),
                    |r| r.enabled,
                )
            }),
        ];

        Sheet {
            kind: document.kind,
            name: document.full_name.clone(),
            title: format!("{}: {}", kind_title(document.kind), document.display_name()),
            sections: sections.into_iter().flatten().collect(),
        }
    }
}
