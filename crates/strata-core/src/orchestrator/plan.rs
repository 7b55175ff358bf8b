//! Migration planning.
//!
//! A plan decides, per component, whether it is initialised, upgraded, or
//! left alone, and which migrations an upgrade runs. Planning never touches
//! the executor.

use super::config::MigrateConfig;
use crate::catalog::{ComponentCatalog, SchemaVersion};
use crate::error::MigrateError;
use crate::migration::MigrationStyle;
use crate::store::StoreError;
use std::collections::BTreeMap;
use std::fmt;

/// A migration selected for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMigration {
    /// Migration name.
    pub name: String,
    /// Version the migration belongs to.
    pub version: SchemaVersion,
    /// Declaration order within the component.
    pub ordering_index: usize,
    /// Declared style.
    pub style: MigrationStyle,
}

/// What a run does with one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentAction {
    /// No migrations apply; the record is left as is.
    Unchanged,
    /// No record exists; one is created at the target version.
    Initialise,
    /// Migrations run and the record moves to the target version.
    Upgrade,
}

impl fmt::Display for ComponentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentAction::Unchanged => write!(f, "unchanged"),
            ComponentAction::Initialise => write!(f, "initialise"),
            ComponentAction::Upgrade => write!(f, "upgrade"),
        }
    }
}

/// Plan for one component.
#[derive(Debug, Clone)]
pub struct ComponentPlan {
    /// Component name.
    pub component: String,
    /// Installed version, if any.
    pub installed: Option<SchemaVersion>,
    /// Version the run moves to.
    pub target: SchemaVersion,
    /// What happens.
    pub action: ComponentAction,
    /// Selected migrations in declaration order.
    pub migrations: Vec<PlannedMigration>,
}

/// Plan for a whole run, components in dependency order.
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    /// Per-component plans.
    pub components: Vec<ComponentPlan>,
}

impl MigrationPlan {
    /// Check if the run would change nothing.
    pub fn is_noop(&self) -> bool {
        self.components
            .iter()
            .all(|c| c.action == ComponentAction::Unchanged)
    }

    /// Total number of selected migrations.
    pub fn migration_count(&self) -> usize {
        self.components.iter().map(|c| c.migrations.len()).sum()
    }

    /// Components that run migrations, in dependency order.
    pub fn pending(&self) -> impl Iterator<Item = &ComponentPlan> {
        self.components
            .iter()
            .filter(|c| c.action == ComponentAction::Upgrade)
    }

    /// Components that get their first record.
    pub fn initialising(&self) -> impl Iterator<Item = &ComponentPlan> {
        self.components
            .iter()
            .filter(|c| c.action == ComponentAction::Initialise)
    }

    /// Look up a component's plan.
    pub fn component(&self, name: &str) -> Option<&ComponentPlan> {
        self.components.iter().find(|c| c.component == name)
    }
}

/// Build a plan against the installed versions reported by `installed`.
pub(crate) fn build_plan<F>(
    catalog: &ComponentCatalog,
    config: &MigrateConfig,
    targets: &BTreeMap<String, SchemaVersion>,
    installed: F,
) -> Result<MigrationPlan, MigrateError>
where
    F: Fn(&str) -> Result<Option<SchemaVersion>, StoreError>,
{
    if let Some(unknown) = targets.keys().find(|name| catalog.get(name).is_none()) {
        return Err(MigrateError::UnknownComponent(unknown.clone()));
    }

    let mut components = Vec::with_capacity(catalog.len());
    for spec in catalog.all_components() {
        let target = targets.get(&spec.name).unwrap_or(&spec.version).clone();
        if target > spec.version {
            return Err(MigrateError::TargetBeyondCode {
                component: spec.name.clone(),
                target,
                code: spec.version.clone(),
            });
        }

        let plan = match installed(&spec.name)? {
            None if config.initialise_missing => ComponentPlan {
                component: spec.name.clone(),
                installed: None,
                target,
                action: ComponentAction::Initialise,
                migrations: Vec::new(),
            },
            None => return Err(MigrateError::UnknownComponent(spec.name.clone())),
            Some(installed) if target < installed => {
                return Err(MigrateError::DowngradeUnsupported {
                    component: spec.name.clone(),
                    installed,
                    target,
                });
            }
            Some(installed) => {
                let migrations: Vec<PlannedMigration> = spec
                    .migrations_between(&installed, &target)
                    .into_iter()
                    .map(|m| PlannedMigration {
                        name: m.descriptor.name().to_string(),
                        version: m.version.clone(),
                        ordering_index: m.ordering_index,
                        style: m.descriptor.style(),
                    })
                    .collect();
                let action = if migrations.is_empty() {
                    ComponentAction::Unchanged
                } else {
                    ComponentAction::Upgrade
                };
                ComponentPlan {
                    component: spec.name.clone(),
                    installed: Some(installed),
                    target,
                    action,
                    migrations,
                }
            }
        };

        components.push(plan);
    }

    Ok(MigrationPlan { components })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ComponentSpec;
    use crate::migration::{MigrationDescriptor, OperationMigration, PhasedMigration};

    fn v(s: &str) -> SchemaVersion {
        SchemaVersion::parse(s).unwrap()
    }

    fn catalog() -> ComponentCatalog {
        ComponentCatalog::load(&vec![
            ComponentSpec::parse("blog", "0.2")
                .unwrap()
                .with_dependency("auth")
                .with_migration(
                    v("0.1"),
                    MigrationDescriptor::direct("create_posts", OperationMigration::default),
                )
                .with_migration(
                    v("0.2"),
                    MigrationDescriptor::scheduled("rekey_posts", PhasedMigration::default),
                ),
            ComponentSpec::parse("auth", "1.0").unwrap(),
        ])
        .unwrap()
    }

    fn installed(
        versions: &[(&str, &str)],
    ) -> impl Fn(&str) -> Result<Option<SchemaVersion>, StoreError> {
        let map: BTreeMap<String, SchemaVersion> = versions
            .iter()
            .map(|(name, version)| (name.to_string(), v(version)))
            .collect();
        move |name| Ok(map.get(name).cloned())
    }

    #[test]
    fn test_plan_selects_pending_migrations() {
        let plan = build_plan(
            &catalog(),
            &MigrateConfig::default(),
            &BTreeMap::new(),
            installed(&[("auth", "1.0"), ("blog", "0.0")]),
        )
        .unwrap();

        let names: Vec<&str> = plan.components.iter().map(|c| c.component.as_str()).collect();
        assert_eq!(names, vec!["auth", "blog"]);
        assert_eq!(plan.component("auth").unwrap().action, ComponentAction::Unchanged);

        let blog = plan.component("blog").unwrap();
        assert_eq!(blog.action, ComponentAction::Upgrade);
        assert_eq!(blog.target, v("0.2"));
        assert_eq!(blog.migrations.len(), 2);
        assert_eq!(blog.migrations[1].style, MigrationStyle::Scheduled);
        assert_eq!(plan.migration_count(), 2);
        assert!(!plan.is_noop());
    }

    #[test]
    fn test_target_override() {
        let targets = BTreeMap::from([("blog".to_string(), v("0.1"))]);
        let plan = build_plan(
            &catalog(),
            &MigrateConfig::default(),
            &targets,
            installed(&[("auth", "1.0"), ("blog", "0.0")]),
        )
        .unwrap();

        let blog = plan.component("blog").unwrap();
        assert_eq!(blog.target, v("0.1"));
        assert_eq!(blog.migrations[0].name, "create_posts");
        assert_eq!(blog.migrations.len(), 1);
    }

    #[test]
    fn test_up_to_date_is_noop() {
        let plan = build_plan(
            &catalog(),
            &MigrateConfig::default(),
            &BTreeMap::new(),
            installed(&[("auth", "1.0"), ("blog", "0.2")]),
        )
        .unwrap();
        assert!(plan.is_noop());
        assert_eq!(plan.pending().count(), 0);
    }

    #[test]
    fn test_missing_record() {
        let plan = build_plan(
            &catalog(),
            &MigrateConfig::default(),
            &BTreeMap::new(),
            installed(&[("auth", "1.0")]),
        )
        .unwrap();
        let blog = plan.component("blog").unwrap();
        assert_eq!(blog.action, ComponentAction::Initialise);
        assert!(blog.migrations.is_empty());
        assert_eq!(plan.initialising().count(), 1);

        let err = build_plan(
            &catalog(),
            &MigrateConfig::default().with_initialise_missing(false),
            &BTreeMap::new(),
            installed(&[("auth", "1.0")]),
        )
        .unwrap_err();
        assert!(matches!(err, MigrateError::UnknownComponent(name) if name == "blog"));
    }

    #[test]
    fn test_rejections() {
        let err = build_plan(
            &catalog(),
            &MigrateConfig::default(),
            &BTreeMap::new(),
            installed(&[("auth", "2.0"), ("blog", "0.0")]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::DowngradeUnsupported { ref component, .. } if component == "auth"
        ));

        let targets = BTreeMap::from([("ghost".to_string(), v("1"))]);
        let err = build_plan(
            &catalog(),
            &MigrateConfig::default(),
            &targets,
            installed(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, MigrateError::UnknownComponent(name) if name == "ghost"));
    }

    #[test]
    fn test_target_beyond_code_rejected() {
        let targets = BTreeMap::from([("blog".to_string(), v("9"))]);
        let err = build_plan(
            &catalog(),
            &MigrateConfig::default(),
            &targets,
            installed(&[("auth", "1.0"), ("blog", "0.1")]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::TargetBeyondCode { ref component, ref target, ref code }
                if component == "blog" && *target == v("9") && *code == v("0.2")
        ));

        // Also applies to components that would be initialised.
        let err = build_plan(&catalog(), &MigrateConfig::default(), &targets, installed(&[]))
            .unwrap_err();
        assert!(matches!(err, MigrateError::TargetBeyondCode { .. }));
    }
}
