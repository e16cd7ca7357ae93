// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake collaborators for exercising the reconciler.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::model::{Model, TasksChanged};
use crate::supervisor::{Supervisor, SupervisorError, SupervisorFactory, SupervisorStatus};
use async_trait::async_trait;
use berth_core::{Goal, Job, JobId, PortAssignment, Task};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// ── Fake model ──────────────────────────────────────────────────────────

/// In-memory control-plane model with synchronous listener delivery.
#[derive(Clone, Default)]
pub struct FakeModel {
    inner: Arc<FakeModelInner>,
}

#[derive(Default)]
struct FakeModelInner {
    tasks: Mutex<BTreeMap<JobId, Task>>,
    listeners: Mutex<Vec<TasksChanged>>,
    removed_tombstones: Mutex<Vec<JobId>>,
    removed_statuses: Mutex<Vec<JobId>>,
}

impl FakeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish or replace a task and notify listeners.
    pub fn put_task(&self, id: impl Into<JobId>, task: Task) {
        self.inner.tasks.lock().insert(id.into(), task);
        self.notify();
    }

    /// Publish a task without notifying listeners, simulating a missed
    /// notification that only the timed refresh can repair.
    pub fn put_task_silently(&self, id: impl Into<JobId>, task: Task) {
        self.inner.tasks.lock().insert(id.into(), task);
    }

    /// Change the goal of an existing task and notify listeners.
    pub fn set_goal(&self, id: &JobId, goal: Goal) {
        if let Some(task) = self.inner.tasks.lock().get_mut(id) {
            task.goal = goal;
        }
        self.notify();
    }

    /// Delete a task outright (not an undeploy) and notify listeners.
    pub fn remove_task(&self, id: &JobId) {
        self.inner.tasks.lock().remove(id);
        self.notify();
    }

    /// Jobs whose undeploy tombstone the agent has removed, in call order.
    pub fn removed_tombstones(&self) -> Vec<JobId> {
        self.inner.removed_tombstones.lock().clone()
    }

    /// Jobs whose task status the agent has removed, in call order.
    pub fn removed_statuses(&self) -> Vec<JobId> {
        self.inner.removed_statuses.lock().clone()
    }

    fn notify(&self) {
        for listener in self.inner.listeners.lock().iter() {
            listener();
        }
    }
}

impl Model for FakeModel {
    fn tasks(&self) -> BTreeMap<JobId, Task> {
        self.inner.tasks.lock().clone()
    }

    fn add_listener(&self, listener: TasksChanged) {
        self.inner.listeners.lock().push(listener);
    }

    fn remove_undeploy_tombstone(&self, id: &JobId) {
        self.inner.tasks.lock().remove(id);
        self.inner.removed_tombstones.lock().push(id.clone());
    }

    fn remove_task_status(&self, id: &JobId) {
        self.inner.removed_statuses.lock().push(id.clone());
    }
}

// ── Fake supervisor ─────────────────────────────────────────────────────

struct FakeSupervisorState {
    starting: bool,
    stopping: bool,
    done: bool,
    status: SupervisorStatus,
}

impl Default for FakeSupervisorState {
    fn default() -> Self {
        Self { starting: false, stopping: false, done: false, status: SupervisorStatus::Starting }
    }
}

/// Scriptable supervisor: records commands, and lets tests report observed
/// container state via [`FakeSupervisor::report`].
#[derive(Default)]
pub struct FakeSupervisor {
    state: Mutex<FakeSupervisorState>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    closed: AtomicBool,
    fail_next: Mutex<Option<SupervisorError>>,
}

impl FakeSupervisor {
    /// Simulate the runtime poller observing `status`.
    pub fn report(&self, status: SupervisorStatus, done: bool) {
        let mut state = self.state.lock();
        state.status = status;
        state.done = done;
    }

    /// Make the next start/stop command fail with `error`.
    pub fn fail_next_command(&self, error: SupervisorError) {
        *self.fail_next.lock() = Some(error);
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Supervisor for FakeSupervisor {
    async fn start(&self) -> Result<(), SupervisorError> {
        if let Some(error) = self.fail_next.lock().take() {
            return Err(error);
        }
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.starting = true;
        state.stopping = false;
        state.done = false;
        state.status = SupervisorStatus::Starting;
        Ok(())
    }

    async fn stop(&self) -> Result<(), SupervisorError> {
        if let Some(error) = self.fail_next.lock().take() {
            return Err(error);
        }
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.stopping = true;
        state.starting = false;
        state.status = SupervisorStatus::Stopping;
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_starting(&self) -> bool {
        self.state.lock().starting
    }

    fn is_stopping(&self) -> bool {
        self.state.lock().stopping
    }

    fn is_done(&self) -> bool {
        self.state.lock().done
    }

    fn status(&self) -> SupervisorStatus {
        self.state.lock().status
    }
}

// ── Fake factory ────────────────────────────────────────────────────────

/// One supervisor construction observed by the fake factory.
#[derive(Clone)]
pub struct CreatedSupervisor {
    pub id: JobId,
    pub job: Job,
    pub ports: PortAssignment,
    pub supervisor: Arc<FakeSupervisor>,
}

/// Factory that mints [`FakeSupervisor`]s and records every construction.
#[derive(Clone, Default)]
pub struct FakeSupervisorFactory {
    inner: Arc<FactoryInner>,
}

#[derive(Default)]
struct FactoryInner {
    created: Mutex<Vec<CreatedSupervisor>>,
}

impl FakeSupervisorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every construction so far, in order.
    pub fn created(&self) -> Vec<CreatedSupervisor> {
        self.inner.created.lock().clone()
    }

    pub fn created_count(&self) -> usize {
        self.inner.created.lock().len()
    }

    /// How many supervisors have been constructed for `id`.
    pub fn created_for(&self, id: &JobId) -> usize {
        self.inner.created.lock().iter().filter(|c| &c.id == id).count()
    }

    /// The most recently constructed supervisor for `id`.
    pub fn latest(&self, id: &JobId) -> Option<Arc<FakeSupervisor>> {
        self.inner
            .created
            .lock()
            .iter()
            .rev()
            .find(|c| &c.id == id)
            .map(|c| c.supervisor.clone())
    }
}

impl SupervisorFactory for FakeSupervisorFactory {
    fn create(&self, id: &JobId, job: &Job, ports: &PortAssignment) -> Arc<dyn Supervisor> {
        let supervisor = Arc::new(FakeSupervisor::default());
        self.inner.created.lock().push(CreatedSupervisor {
            id: id.clone(),
            job: job.clone(),
            ports: ports.clone(),
            supervisor: supervisor.clone(),
        });
        supervisor
    }
}
