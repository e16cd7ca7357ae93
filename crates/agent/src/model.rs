// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane surface consumed by the reconciler.

use berth_core::{JobId, Task};
use std::collections::BTreeMap;

/// Notification capability: invoked after any mutation of the task set.
///
/// May be called from arbitrary threads; implementations must be
/// non-blocking (the reconciler registers one that just wakes its reactor).
pub type TasksChanged = Box<dyn Fn() + Send + Sync>;

/// The desired-state store published by the cluster control plane.
pub trait Model: Send + Sync {
    /// Snapshot of the desired tasks for this host.
    fn tasks(&self) -> BTreeMap<JobId, Task>;

    /// Register a listener invoked after any mutation of the task set.
    fn add_listener(&self, listener: TasksChanged);

    /// Remove the undeploy tombstone for a reaped job. Idempotent.
    fn remove_undeploy_tombstone(&self, id: &JobId);

    /// Remove the reported task status for a reaped job. Idempotent.
    fn remove_task_status(&self, id: &JobId);
}
