//! Schema executor used by the CLI.
//!
//! The CLI has no database driver of its own. It logs each operation and
//! keeps it for the command output, so a run can be reviewed or replayed
//! against the real backend.

use strata_core::{BoxError, SchemaExecutor, SchemaOperation};

/// Logs operations through `tracing` and collects them.
#[derive(Debug, Default)]
pub struct TraceExecutor {
    operations: Vec<SchemaOperation>,
    open: bool,
}

impl TraceExecutor {
    /// Create an empty executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations executed in the last run, in order.
    pub fn operations(&self) -> &[SchemaOperation] {
        &self.operations
    }
}

impl SchemaExecutor for TraceExecutor {
    fn execute(&mut self, operation: &SchemaOperation) -> Result<(), BoxError> {
        if !self.open {
            return Err(format!("`{}` executed outside of a run", operation).into());
        }
        tracing::info!(
            intent = %operation.intent,
            object = %operation.target,
            operation = %operation,
            "executing schema operation"
        );
        self.operations.push(operation.clone());
        Ok(())
    }

    fn begin(&mut self) -> Result<(), BoxError> {
        self.operations.clear();
        self.open = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BoxError> {
        self.open = false;
        tracing::debug!(operations = self.operations.len(), "executor committed");
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BoxError> {
        self.open = false;
        tracing::debug!(operations = self.operations.len(), "executor rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_operations_within_run() {
        let mut exec = TraceExecutor::new();
        let op = SchemaOperation::new("create_table", "post");

        assert!(exec.execute(&op).is_err());

        exec.begin().unwrap();
        exec.execute(&op).unwrap();
        exec.commit().unwrap();
        assert_eq!(exec.operations(), &[op.clone()]);

        exec.begin().unwrap();
        assert!(exec.operations().is_empty());
    }
}
