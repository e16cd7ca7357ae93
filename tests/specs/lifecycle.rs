// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The full lifecycle through a live reactor: listener wiring, timed
//! refresh, and shutdown.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread")]
async fn model_notifications_drive_convergence() {
    let h = Harness::with_interval(Duration::from_secs(3600));
    h.agent.start();

    // Only the listener can wake the reactor at this interval.
    h.model.put_task("j1", http_task(Goal::Start));
    wait_until(Duration::from_secs(5), || {
        h.factory.latest(&JobId::new("j1")).map(|s| s.start_calls() == 1).unwrap_or(false)
    })
    .await;

    assert!(h.agent.executions()[&JobId::new("j1")].ports.is_some());
    h.agent.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn the_timed_refresh_repairs_missed_notifications() {
    let h = Harness::with_interval(Duration::from_millis(100));
    h.agent.start();

    // No notification is delivered for this task; only the refresh can
    // pick it up.
    h.model.put_task_silently("j1", http_task(Goal::Start));
    wait_until(Duration::from_secs(5), || {
        h.factory.latest(&JobId::new("j1")).map(|s| s.start_calls() == 1).unwrap_or(false)
    })
    .await;

    h.agent.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_closes_every_supervisor_and_drops_references() {
    let h = Harness::with_interval(Duration::from_secs(3600));
    h.agent.start();

    h.model.put_task("j1", http_task(Goal::Start));
    h.model.put_task("j2", http_task(Goal::Start));
    wait_until(Duration::from_secs(5), || h.factory.created_count() == 2).await;

    h.agent.stop().await;
    assert!(h.agent.supervised().is_empty());
    assert!(h.supervisor("j1").is_closed());
    assert!(h.supervisor("j2").is_closed());
}

#[tokio::test(flavor = "multi_thread")]
async fn a_released_supervisor_triggers_its_own_follow_up() {
    let h = Harness::with_interval(Duration::from_secs(3600));
    h.agent.start();

    h.model.put_task("j1", http_task(Goal::Start));
    wait_until(Duration::from_secs(5), || h.factory.created_for(&JobId::new("j1")) == 1).await;

    // The container dies on its own. The next pass (woken by an unrelated
    // model change) releases the old supervisor and requests the follow-up
    // that spawns its replacement without any further external events.
    h.supervisor("j1").report(SupervisorStatus::Stopped, true);
    h.model.put_task("j2", http_task(Goal::Start));

    wait_until(Duration::from_secs(5), || h.factory.created_for(&JobId::new("j1")) == 2).await;
    wait_until(Duration::from_secs(5), || {
        h.factory.latest(&JobId::new("j1")).map(|s| s.start_calls() == 1).unwrap_or(false)
    })
    .await;

    h.agent.stop().await;
}
