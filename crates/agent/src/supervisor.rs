// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor surface: the per-job actor owning one container's lifecycle.
//!
//! The reconciler depends on this interface only; implementations bind to
//! the host's container runtime and are supplied by the embedder.

use async_trait::async_trait;
use berth_core::{Job, JobId, PortAssignment};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Observed state of a supervised container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorStatus {
    PullingImage,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl fmt::Display for SupervisorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorStatus::PullingImage => write!(f, "pulling_image"),
            SupervisorStatus::Starting => write!(f, "starting"),
            SupervisorStatus::Running => write!(f, "running"),
            SupervisorStatus::Stopping => write!(f, "stopping"),
            SupervisorStatus::Stopped => write!(f, "stopped"),
            SupervisorStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Error from dispatching a supervisor operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    #[error("operation rejected: {0}")]
    Rejected(String),
}

/// Per-job actor with thread-safe method calls.
///
/// `start` and `stop` dispatch intent; they do not wait for the container.
/// `close` releases supervisor resources and is only called by the
/// reconciler once the supervisor reports `is_done()` with status
/// [`SupervisorStatus::Stopped`] (or unconditionally at agent shutdown).
#[async_trait]
pub trait Supervisor: Send + Sync {
    /// Request the container to be running. Idempotent.
    async fn start(&self) -> Result<(), SupervisorError>;
    /// Request the container to be halted. Idempotent.
    async fn stop(&self) -> Result<(), SupervisorError>;
    /// Release supervisor resources; returns once they are released.
    async fn close(&self);
    /// Intent flag: a start has been requested and not superseded.
    fn is_starting(&self) -> bool;
    /// Intent flag: a stop has been requested and not superseded.
    fn is_stopping(&self) -> bool;
    /// The supervisor has reached a terminal observation.
    fn is_done(&self) -> bool;
    /// Last observed container state.
    fn status(&self) -> SupervisorStatus;
}

/// Binds a supervisor to the host's container runtime.
pub trait SupervisorFactory: Send + Sync {
    fn create(&self, id: &JobId, job: &Job, ports: &PortAssignment) -> Arc<dyn Supervisor>;
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
