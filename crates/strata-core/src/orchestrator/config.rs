//! Orchestrator configuration.

/// Options for a migration run.
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    /// Run the whole protocol, then roll back instead of committing.
    pub dry_run: bool,
    /// Initialise components that have no version record at their target
    /// version instead of failing with `UnknownComponent`.
    pub initialise_missing: bool,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            initialise_missing: true,
        }
    }
}

impl MigrateConfig {
    /// Set dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set whether uninitialised components are initialised.
    pub fn with_initialise_missing(mut self, initialise_missing: bool) -> Self {
        self.initialise_missing = initialise_missing;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_builders() {
        let config = MigrateConfig::default();
        assert!(!config.dry_run);
        assert!(config.initialise_missing);

        let config = config.with_dry_run(true).with_initialise_missing(false);
        assert!(config.dry_run);
        assert!(!config.initialise_missing);
    }
}
