//! Output formatters for command results.

use clap::ValueEnum;
use comfy_table::Table;
use serde_json::json;
use strata_core::{MigrationPlan, MigrationReport, SchemaOperation, SchemaVersion};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// One line of `strata status`.
#[derive(Debug, Clone)]
pub struct StatusRow {
    /// Component name.
    pub component: String,
    /// Version of the loaded code.
    pub code_version: SchemaVersion,
    /// Version in the store, if initialised.
    pub installed: Option<SchemaVersion>,
    /// Direct dependencies.
    pub dependencies: Vec<String>,
    /// Migrations between installed and code version.
    pub pending: usize,
}

/// Trait for formatting output.
pub trait Formatter {
    /// Format a migration plan.
    fn format_plan(&self, plan: &MigrationPlan) -> String;

    /// Format the outcome of a run and the operations it executed.
    fn format_report(&self, report: &MigrationReport, operations: &[SchemaOperation]) -> String;

    /// Format component status.
    fn format_status(&self, rows: &[StatusRow]) -> String;

    /// Format a dependency order.
    fn format_order(&self, order: &[&str]) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

fn version_or_dash(version: Option<&SchemaVersion>) -> String {
    version.map_or_else(|| "-".to_string(), ToString::to_string)
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_plan(&self, plan: &MigrationPlan) -> String {
        if plan.is_noop() {
            return "Nothing to migrate".to_string();
        }

        let mut table = Table::new();
        table.set_header(vec!["Component", "Installed", "Target", "Action", "Migrations"]);

        for component in &plan.components {
            let migrations: Vec<String> = component
                .migrations
                .iter()
                .map(|m| format!("{} ({}, {})", m.name, m.version, m.style))
                .collect();
            table.add_row(vec![
                component.component.clone(),
                version_or_dash(component.installed.as_ref()),
                component.target.to_string(),
                component.action.to_string(),
                migrations.join("\n"),
            ]);
        }

        format!("{}\n{} migration(s) pending", table, plan.migration_count())
    }

    fn format_report(&self, report: &MigrationReport, operations: &[SchemaOperation]) -> String {
        if report.is_noop() {
            return "Nothing to migrate".to_string();
        }

        let mut output = String::new();

        if !report.components.is_empty() {
            let mut table = Table::new();
            table.set_header(vec!["Component", "From", "To", "Migrations"]);
            for outcome in &report.components {
                table.add_row(vec![
                    outcome.component.clone(),
                    outcome.from.to_string(),
                    outcome.to.to_string(),
                    outcome.migrations_applied.to_string(),
                ]);
            }
            output.push_str(&table.to_string());
            output.push('\n');
        }

        if !report.initialised.is_empty() {
            output.push_str(&format!("Initialised: {}\n", report.initialised.join(", ")));
        }

        if !operations.is_empty() {
            let mut table = Table::new();
            table.set_header(vec!["#", "Operation"]);
            for (idx, op) in operations.iter().enumerate() {
                table.add_row(vec![(idx + 1).to_string(), op.to_string()]);
            }
            output.push_str(&table.to_string());
            output.push('\n');
        }

        let verb = if report.dry_run { "rolled back (dry run)" } else { "committed" };
        output.push_str(&format!(
            "{} migration(s), {} scheduled operation(s), {}",
            report.migrations_applied(),
            report.operations_flushed,
            verb
        ));
        output
    }

    fn format_status(&self, rows: &[StatusRow]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Component", "Installed", "Code", "Pending", "Depends on"]);

        for row in rows {
            table.add_row(vec![
                row.component.clone(),
                version_or_dash(row.installed.as_ref()),
                row.code_version.to_string(),
                row.pending.to_string(),
                row.dependencies.join(", "),
            ]);
        }

        table.to_string()
    }

    fn format_order(&self, order: &[&str]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["#", "Component"]);

        for (idx, name) in order.iter().enumerate() {
            table.add_row(vec![(idx + 1).to_string(), name.to_string()]);
        }

        table.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_plan(&self, plan: &MigrationPlan) -> String {
        let components: Vec<serde_json::Value> = plan
            .components
            .iter()
            .map(|c| {
                json!({
                    "component": c.component,
                    "installed": c.installed.as_ref().map(ToString::to_string),
                    "target": c.target.to_string(),
                    "action": c.action.to_string(),
                    "migrations": c.migrations.iter().map(|m| json!({
                        "name": m.name,
                        "version": m.version.to_string(),
                        "style": m.style.to_string(),
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();

        json!({
            "components": components,
            "migration_count": plan.migration_count(),
        })
        .to_string()
    }

    fn format_report(&self, report: &MigrationReport, operations: &[SchemaOperation]) -> String {
        let components: Vec<serde_json::Value> = report
            .components
            .iter()
            .map(|c| {
                json!({
                    "component": c.component,
                    "from": c.from.to_string(),
                    "to": c.to.to_string(),
                    "migrations_applied": c.migrations_applied,
                })
            })
            .collect();

        json!({
            "state": report.state.to_string(),
            "dry_run": report.dry_run,
            "components": components,
            "initialised": report.initialised,
            "operations_flushed": report.operations_flushed,
            "operations": operations,
        })
        .to_string()
    }

    fn format_status(&self, rows: &[StatusRow]) -> String {
        let rows: Vec<serde_json::Value> = rows
            .iter()
            .map(|r| {
                json!({
                    "component": r.component,
                    "installed": r.installed.as_ref().map(ToString::to_string),
                    "code_version": r.code_version.to_string(),
                    "pending": r.pending,
                    "dependencies": r.dependencies,
                })
            })
            .collect();
        serde_json::Value::Array(rows).to_string()
    }

    fn format_order(&self, order: &[&str]) -> String {
        json!(order).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, installed: Option<&str>) -> StatusRow {
        StatusRow {
            component: name.to_string(),
            code_version: SchemaVersion::parse("0.2").unwrap(),
            installed: installed.map(|v| SchemaVersion::parse(v).unwrap()),
            dependencies: vec!["core".to_string()],
            pending: 1,
        }
    }

    #[test]
    fn test_table_status() {
        let output = TableFormatter.format_status(&[row("blog", Some("0.1")), row("web", None)]);
        assert!(output.contains("blog"));
        assert!(output.contains("0.1"));
        assert!(output.contains("Depends on"));
    }

    #[test]
    fn test_json_status() {
        let output = JsonFormatter.format_status(&[row("blog", Some("0.1")), row("web", None)]);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["installed"], "0.1");
        assert!(value[1]["installed"].is_null());
        assert_eq!(value[1]["dependencies"][0], "core");
    }

    #[test]
    fn test_json_order() {
        let output = JsonFormatter.format_order(&["core", "auth"]);
        assert_eq!(output, r#"["core","auth"]"#);
    }

    #[test]
    fn test_empty_plan() {
        let plan = MigrationPlan::default();
        assert_eq!(TableFormatter.format_plan(&plan), "Nothing to migrate");

        let value: serde_json::Value =
            serde_json::from_str(&JsonFormatter.format_plan(&plan)).unwrap();
        assert_eq!(value["migration_count"], 0);
    }
}
