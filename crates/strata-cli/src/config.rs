//! Command-line configuration.

use crate::error::CliError;
use crate::formatter::OutputFormat;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use strata_core::{MigrateConfig, SchemaVersion};

/// Default version store directory.
pub const DEFAULT_DATA_PATH: &str = "./data";

/// Default manifest location.
pub const DEFAULT_MANIFEST: &str = "./strata.json";

/// Resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Directory of the sled database holding version records.
    pub data_path: PathBuf,
    /// Path to the JSON component manifest.
    pub manifest: PathBuf,
    /// Output format.
    pub format: OutputFormat,
}

impl CliConfig {
    /// Create a configuration with the given data path.
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            manifest: PathBuf::from(DEFAULT_MANIFEST),
            format: OutputFormat::Table,
        }
    }

    /// Set the manifest path.
    pub fn with_manifest(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.manifest = manifest.into();
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_PATH)
    }
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version, about = "Strata schema migration tool", long_about = None)]
pub struct Args {
    /// Path to the version store directory.
    #[arg(short, long, global = true, default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// Path to the component manifest.
    #[arg(short, long, global = true, default_value = DEFAULT_MANIFEST)]
    pub manifest: PathBuf,

    /// Output format.
    #[arg(long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Migrate every component to its target version.
    Migrate {
        /// Target version override, as `component=version`. Repeatable.
        #[arg(short, long = "target", value_parser = parse_target)]
        targets: Vec<(String, SchemaVersion)>,

        /// Run every migration, then roll back.
        #[arg(long)]
        dry_run: bool,

        /// Fail on components without a version record instead of initialising them.
        #[arg(long)]
        no_init: bool,
    },

    /// Show what `migrate` would do.
    Plan {
        /// Target version override, as `component=version`. Repeatable.
        #[arg(short, long = "target", value_parser = parse_target)]
        targets: Vec<(String, SchemaVersion)>,

        /// Fail on components without a version record instead of initialising them.
        #[arg(long)]
        no_init: bool,
    },

    /// Show installed and code versions of every component.
    Status,

    /// Print the component dependency order.
    Order {
        /// Restrict to this component and its transitive dependencies.
        #[arg(long)]
        root: Option<String>,
    },
}

impl Command {
    /// Orchestrator configuration implied by the flags.
    pub fn migrate_config(&self) -> MigrateConfig {
        match self {
            Command::Migrate {
                dry_run, no_init, ..
            } => MigrateConfig::default()
                .with_dry_run(*dry_run)
                .with_initialise_missing(!no_init),
            Command::Plan { no_init, .. } => {
                MigrateConfig::default().with_initialise_missing(!no_init)
            }
            Command::Status | Command::Order { .. } => MigrateConfig::default(),
        }
    }
}

impl Args {
    /// Split the arguments into configuration and the command to run.
    pub fn into_config(self) -> (CliConfig, Command) {
        let config = CliConfig::new(self.data_path)
            .with_manifest(self.manifest)
            .with_format(self.format);
        (config, self.command)
    }
}

/// Parse a `component=version` target.
pub fn parse_target(s: &str) -> Result<(String, SchemaVersion), String> {
    let (name, version) = s
        .split_once('=')
        .ok_or_else(|| format!("expected component=version, got `{}`", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing component name in `{}`", s));
    }
    let version = SchemaVersion::parse(version).map_err(|e| e.to_string())?;
    Ok((name.to_string(), version))
}

/// Collect targets, rejecting a component named twice.
pub fn target_map(
    targets: Vec<(String, SchemaVersion)>,
) -> Result<BTreeMap<String, SchemaVersion>, CliError> {
    let mut map = BTreeMap::new();
    for (name, version) in targets {
        if map.contains_key(&name) {
            return Err(CliError::Config(format!("target for {} given twice", name)));
        }
        map.insert(name, version);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.data_path, PathBuf::from("./data"));
        assert_eq!(config.manifest, PathBuf::from("./strata.json"));
        assert_eq!(config.format, OutputFormat::Table);
    }

    #[test]
    fn test_parse_migrate_args() {
        let args = Args::try_parse_from([
            "strata",
            "migrate",
            "--target",
            "blog=0.2",
            "-t",
            "auth=1.0",
            "--dry-run",
            "--data-path",
            "/var/lib/strata",
            "--format",
            "json",
        ])
        .unwrap();

        let (config, command) = args.into_config();
        assert_eq!(config.data_path, PathBuf::from("/var/lib/strata"));
        assert_eq!(config.format, OutputFormat::Json);

        let migrate = command.migrate_config();
        assert!(migrate.dry_run);
        assert!(migrate.initialise_missing);

        match command {
            Command::Migrate { targets, .. } => {
                let map = target_map(targets).unwrap();
                assert_eq!(map["blog"].to_string(), "0.2");
                assert_eq!(map["auth"].to_string(), "1.0");
            }
            other => panic!("expected migrate, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_target() {
        let (name, version) = parse_target("blog = 0.3").unwrap();
        assert_eq!(name, "blog");
        assert_eq!(version.to_string(), "0.3");

        assert!(parse_target("blog").is_err());
        assert!(parse_target("=1").is_err());
        assert!(parse_target("blog=x").is_err());
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let targets = vec![
            parse_target("blog=1").unwrap(),
            parse_target("blog=2").unwrap(),
        ];
        assert!(matches!(target_map(targets), Err(CliError::Config(_))));
    }

    #[test]
    fn test_no_init_flag() {
        let args = Args::try_parse_from(["strata", "plan", "--no-init"]).unwrap();
        assert!(!args.command.migrate_config().initialise_missing);
    }
}
