//! Phase-tagged operation scheduling.
//!
//! Scheduled migrations do not touch the database directly. They register
//! operations under a [`Phase`], and the run flushes every phase in
//! [`PHASE_ORDER`] once all migrations have been scheduled. This lets one
//! component drop a foreign key that another component's constraint rebuild
//! depends on, regardless of which component owns which operation.

use crate::error::BoxError;
use crate::executor::{SchemaExecutor, SchemaOperation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Category of a scheduled schema operation.
///
/// Variants are declared in flush order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Remove foreign keys that reference structures about to change.
    DropForeignKey,
    /// Remove primary keys.
    DropPrimaryKey,
    /// Generic structural alteration and creation.
    Alter,
    /// Re-create primary keys.
    CreatePrimaryKey,
    /// Re-create foreign keys.
    CreateForeignKey,
    /// Rebuild indexes over the final structure.
    RebuildIndex,
}

/// Number of phases.
pub const PHASE_COUNT: usize = 6;

/// The global flush order.
///
/// Constraint removal, then structural removal, then alteration, then
/// constraint re-creation, then index rebuilds.
pub const PHASE_ORDER: [Phase; PHASE_COUNT] = [
    Phase::DropForeignKey,
    Phase::DropPrimaryKey,
    Phase::Alter,
    Phase::CreatePrimaryKey,
    Phase::CreateForeignKey,
    Phase::RebuildIndex,
];

impl Phase {
    /// The snake_case tag of this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::DropForeignKey => "drop_foreign_key",
            Phase::DropPrimaryKey => "drop_primary_key",
            Phase::Alter => "alter",
            Phase::CreatePrimaryKey => "create_primary_key",
            Phase::CreateForeignKey => "create_foreign_key",
            Phase::RebuildIndex => "rebuild_index",
        }
    }

    /// Position of this phase in [`PHASE_ORDER`].
    pub fn position(&self) -> usize {
        *self as usize
    }

    /// Check if operations in this phase remove structure.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Phase::DropForeignKey | Phase::DropPrimaryKey)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown phase tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown phase tag: {0}")]
pub struct UnknownPhase(pub String);

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PHASE_ORDER
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPhase(s.to_string()))
    }
}

/// The migration that registered an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MigrationOrigin {
    /// Owning component.
    pub component: String,
    /// Migration name.
    pub migration: String,
}

impl MigrationOrigin {
    /// Create an origin.
    pub fn new(component: impl Into<String>, migration: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            migration: migration.into(),
        }
    }
}

impl fmt::Display for MigrationOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.component, self.migration)
    }
}

/// An operation waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledOperation {
    /// Phase the operation runs in.
    pub phase: Phase,
    /// The operation handed to the executor.
    pub operation: SchemaOperation,
    /// Who scheduled it.
    pub origin: MigrationOrigin,
}

/// A scheduled operation failed while flushing.
#[derive(Debug, Error)]
#[error("{phase} operation `{operation}` from {origin} failed: {source}")]
pub struct FlushError {
    /// Phase being flushed.
    pub phase: Phase,
    /// The failing operation.
    pub operation: SchemaOperation,
    /// Who scheduled it.
    pub origin: MigrationOrigin,
    /// The executor's error.
    #[source]
    pub source: BoxError,
}

/// Accumulates phase-tagged operations for one run.
#[derive(Debug)]
pub struct PhaseQueue {
    buckets: [Vec<ScheduledOperation>; PHASE_COUNT],
    origin: MigrationOrigin,
}

impl Default for PhaseQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            origin: MigrationOrigin::new("", ""),
        }
    }

    /// Set the origin stamped on subsequently scheduled operations.
    pub fn set_origin(&mut self, origin: MigrationOrigin) {
        self.origin = origin;
    }

    /// The origin currently being stamped.
    pub fn origin(&self) -> &MigrationOrigin {
        &self.origin
    }

    /// Append an operation under `phase`.
    pub fn schedule(&mut self, phase: Phase, operation: SchemaOperation) {
        tracing::trace!(
            phase = %phase,
            operation = %operation,
            origin = %self.origin,
            "scheduled operation"
        );
        self.buckets[phase.position()].push(ScheduledOperation {
            phase,
            operation,
            origin: self.origin.clone(),
        });
    }

    /// Total number of queued operations.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Operations queued under one phase, in registration order.
    pub fn operations_in(&self, phase: Phase) -> &[ScheduledOperation] {
        &self.buckets[phase.position()]
    }

    /// All queued operations in flush order.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledOperation> {
        self.buckets.iter().flatten()
    }

    /// Execute every queued operation in [`PHASE_ORDER`].
    ///
    /// The queue is drained even when an operation fails; nothing after the
    /// failing operation is executed. Returns the number of operations run.
    pub fn flush(&mut self, executor: &mut dyn SchemaExecutor) -> Result<usize, FlushError> {
        let buckets = std::mem::take(&mut self.buckets);
        let mut executed = 0;

        for (phase, bucket) in PHASE_ORDER.iter().zip(buckets) {
            if bucket.is_empty() {
                continue;
            }
            tracing::debug!(phase = %phase, count = bucket.len(), "flushing phase");

            for scheduled in bucket {
                if let Err(source) = executor.execute(&scheduled.operation) {
                    return Err(FlushError {
                        phase: *phase,
                        operation: scheduled.operation,
                        origin: scheduled.origin,
                        source,
                    });
                }
                executed += 1;
            }
        }

        Ok(executed)
    }
}
