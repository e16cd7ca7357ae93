// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable per-job decision: a job bound to a goal and concrete host ports.

use crate::job::{Job, JobId};
use crate::task::Goal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Host ports assigned to a job, keyed by logical port name.
pub type PortAssignment = BTreeMap<String, u16>;

/// The committed mapping of all jobs this host has decided to run.
///
/// This is the value held in the persistent cell; it must outlive crashes
/// so allocated ports are never reshuffled across restarts.
pub type ExecutionMap = BTreeMap<JobId, Execution>;

/// Immutable record tying a job to its goal and allocated ports.
///
/// `ports = None` means allocation has not happened yet; once set, ports
/// only change by replacing the whole Execution or removing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub job: Job,
    pub goal: Goal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<PortAssignment>,
}

impl Execution {
    /// A fresh execution with no ports allocated yet.
    pub fn new(job: Job, goal: Goal) -> Self {
        Self { job, goal, ports: None }
    }

    /// Derive an execution with a different goal, keeping job and ports.
    pub fn with_goal(self, goal: Goal) -> Self {
        Self { goal, ..self }
    }

    /// Derive an execution with allocated ports.
    pub fn with_ports(self, ports: PortAssignment) -> Self {
        Self { ports: Some(ports), ..self }
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
