//! The schema executor boundary.
//!
//! Strata decides the order in which schema operations run, never how they are
//! carried out. A [`SchemaExecutor`] receives opaque [`SchemaOperation`]
//! descriptors and applies them to the live database.

use crate::error::BoxError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named DDL intent plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaOperation {
    /// What to do, e.g. `create_table` or `drop_constraint`.
    pub intent: String,
    /// The object the operation applies to.
    #[serde(default)]
    pub target: String,
    /// Intent-specific arguments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub arguments: BTreeMap<String, String>,
}

impl SchemaOperation {
    /// Create an operation without arguments.
    pub fn new(intent: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            target: target.into(),
            arguments: BTreeMap::new(),
        }
    }

    /// Add an argument.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Look up an argument.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).map(String::as_str)
    }
}

impl fmt::Display for SchemaOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.intent, self.target)?;
        if !self.arguments.is_empty() {
            let args: Vec<String> = self
                .arguments
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, " ({})", args.join(", "))?;
        }
        Ok(())
    }
}

/// Applies schema operations to a database.
///
/// The transaction hooks bracket one migration run. Backends without
/// transactional DDL can leave them as no-ops.
pub trait SchemaExecutor {
    /// Execute a single operation.
    fn execute(&mut self, operation: &SchemaOperation) -> Result<(), BoxError>;

    /// Called once before the first operation of a run.
    fn begin(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called once after a run completed and its versions were staged.
    fn commit(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called once when a run fails or is a dry run.
    fn rollback(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Transaction state as observed by a [`RecordingExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    /// No run has started.
    Idle,
    /// A run is in progress.
    Open,
    /// The last run committed.
    Committed,
    /// The last run rolled back.
    RolledBack,
}

/// An executor that records operations instead of applying them.
///
/// Useful for previews and tests. Failures can be injected by intent.
#[derive(Debug)]
pub struct RecordingExecutor {
    executed: Vec<SchemaOperation>,
    fail_on: Option<String>,
    state: ExecutorState,
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingExecutor {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            executed: Vec::new(),
            fail_on: None,
            state: ExecutorState::Idle,
        }
    }

    /// Fail every operation with the given intent.
    pub fn failing_on(mut self, intent: impl Into<String>) -> Self {
        self.fail_on = Some(intent.into());
        self
    }

    /// Operations executed so far, in order.
    pub fn executed(&self) -> &[SchemaOperation] {
        &self.executed
    }

    /// Intents of the executed operations, in order.
    pub fn intents(&self) -> Vec<&str> {
        self.executed.iter().map(|op| op.intent.as_str()).collect()
    }

    /// Current transaction state.
    pub fn state(&self) -> ExecutorState {
        self.state
    }
}

impl SchemaExecutor for RecordingExecutor {
    fn execute(&mut self, operation: &SchemaOperation) -> Result<(), BoxError> {
        if self.fail_on.as_deref() == Some(operation.intent.as_str()) {
            return Err(format!("injected failure for {}", operation).into());
        }
        self.executed.push(operation.clone());
        Ok(())
    }

    fn begin(&mut self) -> Result<(), BoxError> {
        self.state = ExecutorState::Open;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BoxError> {
        self.state = ExecutorState::Committed;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BoxError> {
        self.state = ExecutorState::RolledBack;
        Ok(())
    }
}
