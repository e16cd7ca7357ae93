// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness: an agent wired to fake collaborators and a real
//! executions cell in a temp directory, ticked deterministically.

#![allow(dead_code)] // not every test module uses every helper

pub use berth_agent::test_support::{FakeModel, FakeSupervisor, FakeSupervisorFactory};
pub use berth_agent::{Agent, Supervisor, SupervisorError, SupervisorStatus};
pub use berth_core::test_support::JobBuilder;
pub use berth_core::{ExecutionMap, Goal, Job, JobId, PortAllocator, Task};
pub use berth_storage::{CellError, PersistentCell};

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Dynamic allocation range used throughout the specs.
pub const RANGE: RangeInclusive<u16> = 20_000..=20_100;

pub struct Harness {
    pub model: FakeModel,
    pub factory: FakeSupervisorFactory,
    pub agent: Agent<FakeModel, FakeSupervisorFactory>,
    pub state_path: PathBuf,
    _dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        // The reactor is not started in tick-driven tests, so the interval
        // is irrelevant; lifecycle tests use `with_interval`.
        Self::with_interval(Duration::from_secs(3600))
    }

    pub fn with_interval(interval: Duration) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let state_path = dir.path().join("executions.json");
        let model = FakeModel::new();
        let factory = FakeSupervisorFactory::new();
        let cell = PersistentCell::open(&state_path, ExecutionMap::new()).expect("open cell");
        let agent = Agent::with_cell(
            model.clone(),
            factory.clone(),
            cell,
            PortAllocator::new(RANGE),
            interval,
        );
        Harness { model, factory, agent, state_path, _dir: dir }
    }

    /// Run one reconciliation pass directly (reactor not involved).
    pub async fn tick(&self) {
        self.agent.tick().await;
    }

    /// Simulate a process restart over the same on-disk state and control
    /// plane: the old agent is dropped (not stopped) and a fresh factory
    /// stands in for the new process's container runtime binding.
    pub fn restart(self) -> Self {
        let Harness { model, state_path, _dir, .. } = self;
        let factory = FakeSupervisorFactory::new();
        let cell = PersistentCell::open(&state_path, ExecutionMap::new()).expect("reopen cell");
        let agent = Agent::with_cell(
            model.clone(),
            factory.clone(),
            cell,
            PortAllocator::new(RANGE),
            Duration::from_secs(3600),
        );
        Harness { model, factory, agent, state_path, _dir }
    }

    /// What is on disk right now, read through a fresh cell.
    pub fn persisted(&self) -> ExecutionMap {
        PersistentCell::open(&self.state_path, ExecutionMap::new())
            .expect("reopen cell")
            .get()
    }

    pub fn supervisor(&self, id: &str) -> std::sync::Arc<FakeSupervisor> {
        self.factory.latest(&JobId::new(id)).expect("supervisor not created")
    }
}

/// Task with one dynamic port named "http".
pub fn http_task(goal: Goal) -> Task {
    Task::new(JobBuilder::new("registry/app:1.0").dynamic_port("http", 80).build(), goal)
}

/// Task requesting a specific host port.
pub fn fixed_task(goal: Goal, external: u16) -> Task {
    Task::new(JobBuilder::new("registry/app:1.0").fixed_port("http", 80, external).build(), goal)
}

/// Poll `cond` every 10ms until it holds, panicking after `deadline`.
pub async fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) {
    let start = std::time::Instant::now();
    while !cond() {
        assert!(start.elapsed() <= deadline, "condition not met within {deadline:?}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
