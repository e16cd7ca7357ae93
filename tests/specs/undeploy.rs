// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Undeploy tombstones: stop, release, reap.

use crate::prelude::*;

#[tokio::test]
async fn undeploy_stops_releases_and_reaps() {
    let h = Harness::new();
    h.model.put_task("j1", http_task(Goal::Start));
    h.tick().await;
    let supervisor = h.supervisor("j1");

    // Tick A: the tombstone goal is delegated as a stop.
    h.model.set_goal(&JobId::new("j1"), Goal::Undeploy);
    h.tick().await;
    assert_eq!(supervisor.stop_calls(), 1);
    assert!(!supervisor.is_closed());
    assert_eq!(h.agent.executions()[&JobId::new("j1")].goal, Goal::Undeploy);

    // The container halts; tick B releases the supervisor and reaps the
    // tombstone now that no supervisor owns the job.
    supervisor.report(SupervisorStatus::Stopped, true);
    h.tick().await;
    assert!(supervisor.is_closed());
    assert!(h.agent.supervised().is_empty());
    assert!(!h.agent.executions().contains_key(&JobId::new("j1")));
    assert_eq!(h.model.removed_tombstones(), vec![JobId::new("j1")]);
    assert_eq!(h.model.removed_statuses(), vec![JobId::new("j1")]);

    // The reap is durable.
    assert!(!h.persisted().contains_key(&JobId::new("j1")));

    // Follow-up passes are no-ops; model cleanup is not repeated.
    h.tick().await;
    assert_eq!(h.model.removed_tombstones().len(), 1);
    assert_eq!(h.factory.created_for(&JobId::new("j1")), 1);
}

#[tokio::test]
async fn a_tombstone_is_not_reaped_while_its_supervisor_lives() {
    let h = Harness::new();
    h.model.put_task("j1", http_task(Goal::Start));
    h.tick().await;
    let supervisor = h.supervisor("j1");

    h.model.set_goal(&JobId::new("j1"), Goal::Undeploy);
    h.tick().await;
    h.tick().await;

    // Still stopping: the execution and the tombstone must survive.
    assert!(h.agent.executions().contains_key(&JobId::new("j1")));
    assert!(h.model.removed_tombstones().is_empty());
    assert!(!supervisor.is_closed());
}

#[tokio::test]
async fn a_fresh_undeploy_task_for_an_unknown_job_is_ignored() {
    let h = Harness::new();
    h.model.put_task("ghost", http_task(Goal::Undeploy));
    h.tick().await;

    assert!(h.agent.executions().is_empty());
    assert_eq!(h.factory.created_count(), 0);
}

#[tokio::test]
async fn an_undeployed_job_can_be_deployed_again_under_the_same_id() {
    let h = Harness::new();
    h.model.put_task("j1", http_task(Goal::Start));
    h.tick().await;
    let first = h.supervisor("j1");

    h.model.set_goal(&JobId::new("j1"), Goal::Undeploy);
    h.tick().await;
    first.report(SupervisorStatus::Stopped, true);
    h.tick().await;
    assert!(first.is_closed());

    // A brand-new task under the reused id deploys from scratch.
    h.model.put_task("j1", http_task(Goal::Start));
    h.tick().await;
    assert_eq!(h.factory.created_for(&JobId::new("j1")), 2);
    assert_eq!(h.supervisor("j1").start_calls(), 1);
}
