// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reconciler: drives running supervisors toward the desired task set.
//!
//! Level-triggered: every pass recomputes the full diff between the model's
//! tasks and the committed executions, so missed notifications are repaired
//! by the next timed refresh. All mutation of the execution map and the
//! supervisor map happens on the reactor worker.

use crate::config::AgentConfig;
use crate::model::Model;
use crate::reactor::{Reactor, ReactorHandle, Tick, TickFn};
use crate::supervisor::{Supervisor, SupervisorFactory, SupervisorStatus};
use async_trait::async_trait;
use berth_core::{Execution, ExecutionMap, Goal, JobId, PortAllocator, Task};
use berth_storage::{CellError, PersistentCell};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// In-memory map of live supervisors, keyed by job. Never persisted;
/// rebuilt from the executions cell at startup.
type SupervisorMap = BTreeMap<JobId, Arc<dyn Supervisor>>;

/// Node-local reconciliation agent.
///
/// Owns the reactor and the reconciler state. Constructing the agent
/// rebuilds supervisors for every persisted execution with allocated ports
/// (without starting them); [`Agent::start`] wires the model listener and
/// begins ticking.
pub struct Agent<M: Model, F: SupervisorFactory> {
    reconciler: Arc<Reconciler<M, F>>,
    reactor: Reactor,
    started: AtomicBool,
}

impl<M: Model, F: SupervisorFactory> std::fmt::Debug for Agent<M, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent").finish_non_exhaustive()
    }
}

impl<M: Model + 'static, F: SupervisorFactory + 'static> Agent<M, F> {
    /// Open the agent against the executions cell named by `config`.
    ///
    /// Fails with [`CellError::Incompatible`] if the persisted state was
    /// written by a different schema version.
    pub fn open(model: M, factory: F, config: &AgentConfig) -> Result<Self, CellError> {
        let cell = PersistentCell::open(&config.executions.path, ExecutionMap::new())?;
        Ok(Self::with_cell(
            model,
            factory,
            cell,
            PortAllocator::new(config.port_range()),
            config.interval(),
        ))
    }

    /// Build the agent from an already-open cell.
    pub fn with_cell(
        model: M,
        factory: F,
        executions: PersistentCell<ExecutionMap>,
        allocator: PortAllocator,
        interval: Duration,
    ) -> Self {
        let wakeup = ReactorHandle::new();
        let reconciler = Arc::new(Reconciler {
            model,
            factory,
            allocator,
            executions,
            supervisors: Mutex::new(SupervisorMap::new()),
            wakeup: wakeup.clone(),
        });
        reconciler.restore_supervisors();

        let reactor = Reactor::new(
            "reconcile",
            wakeup,
            reconciler.clone() as Arc<dyn TickFn>,
            interval,
        );
        Self { reconciler, reactor, started: AtomicBool::new(false) }
    }

    /// Register the model listener, start the reactor, and request an
    /// immediate reconciliation pass. No-op if already started.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let wakeup = self.reactor.handle();
        self.reconciler.model.add_listener(Box::new(move || wakeup.update()));
        self.reactor.start();
        self.reactor.update();
    }

    /// Stop the reactor (awaiting any in-flight pass), then release every
    /// supervisor. Containers are left to the supervisor implementation;
    /// after this returns the agent holds no supervisor references.
    pub async fn stop(&self) {
        self.reactor.stop().await;

        let supervisors: Vec<(JobId, Arc<dyn Supervisor>)> = {
            let mut map = self.reconciler.supervisors.lock();
            std::mem::take(&mut *map).into_iter().collect()
        };
        for (id, supervisor) in supervisors {
            debug!(job = %id, "closing supervisor at shutdown");
            supervisor.close().await;
        }
        info!("agent stopped");
    }

    /// Read-only copy of the committed executions.
    pub fn executions(&self) -> ExecutionMap {
        self.reconciler.executions.get()
    }

    /// Read-only snapshot of the supervised jobs and their observed status.
    pub fn supervised(&self) -> BTreeMap<JobId, SupervisorStatus> {
        self.reconciler
            .supervisors
            .lock()
            .iter()
            .map(|(id, s)| (id.clone(), s.status()))
            .collect()
    }

    /// Run one reconciliation pass directly, bypassing the reactor.
    ///
    /// Only safe while the reactor is not started; tests use this to tick
    /// deterministically.
    #[cfg(any(test, feature = "test-support"))]
    pub async fn tick(&self) -> Tick {
        self.reconciler.update().await
    }
}

/// The reactor callback: holds all reconciler state.
struct Reconciler<M, F> {
    model: M,
    factory: F,
    allocator: PortAllocator,
    executions: PersistentCell<ExecutionMap>,
    supervisors: Mutex<SupervisorMap>,
    /// For requesting a follow-up pass from within a pass.
    wakeup: ReactorHandle,
}

#[async_trait]
impl<M: Model, F: SupervisorFactory> TickFn for Reconciler<M, F> {
    async fn tick(&self) -> Tick {
        self.update().await
    }
}

impl<M: Model, F: SupervisorFactory> Reconciler<M, F> {
    /// Rebuild supervisors for persisted executions with allocated ports.
    /// They are not commanded here; the first pass delegates goals.
    fn restore_supervisors(&self) {
        let mut supervisors = self.supervisors.lock();
        for (id, execution) in self.executions.get() {
            if let Some(ports) = &execution.ports {
                info!(job = %id, goal = %execution.goal, "restoring supervisor from persisted execution");
                supervisors.insert(id.clone(), self.factory.create(&id, &execution.job, ports));
            }
        }
    }

    /// One reconciliation pass.
    async fn update(&self) -> Tick {
        // Snapshot desired and committed state.
        let tasks = self.model.tasks();
        let current = self.executions.get();

        // Merge goals and allocate ports for anything new.
        let next = allocate_pending(&self.allocator, merge_goals(current.clone(), &tasks));

        // Persist before touching any supervisor: a crash after this point
        // must never reshuffle ports already promised to a job.
        if next != current {
            if let Err(e) = self.executions.set(next) {
                warn!(error = %e, "failed to persist executions, aborting pass");
                return Tick::Completed;
            }
        }

        self.release_stopped().await;

        let executions = self.executions.get();
        self.spawn_missing(&executions);
        self.command_goals(&executions).await;

        let reaped = self.reap_tombstones(&executions);
        if !reaped.is_empty() {
            let mut remaining = executions;
            for id in &reaped {
                remaining.remove(id);
            }
            if let Err(e) = self.executions.set(remaining) {
                warn!(error = %e, "failed to persist reaped executions, will retry");
            }
        }

        Tick::Completed
    }

    /// Remove and close supervisors that report done and stopped, and
    /// request a follow-up pass so a replacement can be spawned if the job
    /// is still wanted.
    async fn release_stopped(&self) {
        let snapshot: Vec<(JobId, Arc<dyn Supervisor>)> = self
            .supervisors
            .lock()
            .iter()
            .map(|(id, s)| (id.clone(), s.clone()))
            .collect();

        for (id, supervisor) in snapshot {
            if supervisor.is_done() && supervisor.status() == SupervisorStatus::Stopped {
                info!(job = %id, "releasing stopped supervisor");
                self.supervisors.lock().remove(&id);
                supervisor.close().await;
                self.wakeup.update();
            }
        }
    }

    /// Create supervisors for executions that want to run, have ports, and
    /// have no live supervisor. A job whose previous supervisor has not
    /// been released yet is skipped, so the same job is never owned twice.
    fn spawn_missing(&self, executions: &ExecutionMap) {
        let missing: Vec<JobId> = {
            let supervisors = self.supervisors.lock();
            executions
                .iter()
                .filter(|(id, e)| {
                    e.goal == Goal::Start && e.ports.is_some() && !supervisors.contains_key(*id)
                })
                .map(|(id, _)| id.clone())
                .collect()
        };

        for id in missing {
            let Some(execution) = executions.get(&id) else { continue };
            let Some(ports) = &execution.ports else { continue };
            info!(job = %id, image = %execution.job.image, "creating supervisor");
            let supervisor = self.factory.create(&id, &execution.job, ports);
            self.supervisors.lock().insert(id, supervisor);
        }
    }

    /// Delegate each execution's goal to its supervisor. One failing job
    /// does not stall the others.
    async fn command_goals(&self, executions: &ExecutionMap) {
        let snapshot: Vec<(JobId, Arc<dyn Supervisor>)> = self
            .supervisors
            .lock()
            .iter()
            .map(|(id, s)| (id.clone(), s.clone()))
            .collect();

        for (id, supervisor) in snapshot {
            let Some(execution) = executions.get(&id) else { continue };
            let result = match execution.goal {
                Goal::Start if !supervisor.is_starting() => {
                    debug!(job = %id, "commanding start");
                    supervisor.start().await
                }
                Goal::Stop | Goal::Undeploy if !supervisor.is_stopping() => {
                    debug!(job = %id, goal = %execution.goal, "commanding stop");
                    supervisor.stop().await
                }
                _ => Ok(()),
            };
            if let Err(e) = result {
                warn!(job = %id, error = %e, "supervisor command failed");
            }
        }
    }

    /// Clean up the model for undeploy tombstones whose supervisor is gone,
    /// returning the jobs whose executions can now be dropped.
    fn reap_tombstones(&self, executions: &ExecutionMap) -> Vec<JobId> {
        let mut reaped = Vec::new();
        for (id, execution) in executions {
            if execution.goal == Goal::Undeploy && !self.supervisors.lock().contains_key(id) {
                info!(job = %id, "reaping undeployed job");
                self.model.remove_undeploy_tombstone(id);
                self.model.remove_task_status(id);
                reaped.push(id.clone());
            }
        }
        reaped
    }
}

/// Fold the desired task set into the execution map.
///
/// A goal change on a known job replaces only the goal; a new non-undeploy
/// task introduces a fresh execution with no ports; an undeploy for an
/// unknown job is ignored. Executions are never removed here: undeploy is
/// driven by a tombstone task, not by task deletion.
fn merge_goals(mut next: ExecutionMap, tasks: &BTreeMap<JobId, Task>) -> ExecutionMap {
    for (id, task) in tasks {
        match next.get(id) {
            Some(execution) if execution.goal != task.goal => {
                let merged = execution.clone().with_goal(task.goal);
                next.insert(id.clone(), merged);
            }
            None if task.goal != Goal::Undeploy => {
                next.insert(id.clone(), Execution::new(task.job.clone(), task.goal));
            }
            _ => {}
        }
    }
    next
}

/// Allocate host ports for executions that have none yet, in job order,
/// against the union of all ports already committed. A job that cannot be
/// satisfied keeps `ports = None` and is retried on the next pass.
fn allocate_pending(allocator: &PortAllocator, mut next: ExecutionMap) -> ExecutionMap {
    let mut used: BTreeSet<u16> = next
        .values()
        .filter_map(|e| e.ports.as_ref())
        .flat_map(|ports| ports.values().copied())
        .collect();

    let pending: Vec<JobId> =
        next.iter().filter(|(_, e)| e.ports.is_none()).map(|(id, _)| id.clone()).collect();

    for id in pending {
        let Some(execution) = next.get(&id) else { continue };
        match allocator.allocate(&execution.job.ports, &used) {
            Some(ports) => {
                used.extend(ports.values().copied());
                let allocated = execution.clone().with_ports(ports);
                next.insert(id, allocated);
            }
            None => {
                warn!(job = %id, "no ports available, allocation will be retried");
            }
        }
    }
    next
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
