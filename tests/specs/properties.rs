// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property tests: the reconciler's invariants hold at quiescence after
//! every pass, across arbitrary histories of desired-state changes and
//! container exits.

use crate::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
enum Op {
    /// The control plane (re)publishes a task for one of four jobs.
    Desire { job: usize, goal: Goal },
    /// A supervised container halts on its own.
    ContainerStopped { job: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    let goal = prop_oneof![Just(Goal::Start), Just(Goal::Stop), Just(Goal::Undeploy)];
    prop_oneof![
        (0..4usize, goal).prop_map(|(job, goal)| Op::Desire { job, goal }),
        (0..4usize).prop_map(|job| Op::ContainerStopped { job }),
    ]
}

fn job_id(i: usize) -> JobId {
    JobId::new(format!("job-{i}"))
}

/// Odd-numbered jobs contend for the same fixed host port, so histories
/// exercise allocation failure and retry as well as the happy path.
fn job_task(i: usize, goal: Goal) -> Task {
    if i % 2 == 1 {
        fixed_task(goal, 20_050)
    } else {
        http_task(goal)
    }
}

fn assert_invariants(h: &Harness) {
    let executions = h.agent.executions();

    // No ghost supervisors: every supervisor has an execution.
    for id in h.agent.supervised().keys() {
        assert!(executions.contains_key(id), "supervisor without execution: {id}");
    }

    // No duplicate ownership: at most one unclosed supervisor per job.
    let mut live: BTreeSet<JobId> = BTreeSet::new();
    for created in h.factory.created() {
        if !created.supervisor.is_closed() {
            assert!(live.insert(created.id.clone()), "two live supervisors for {}", created.id);
        }
    }

    // Port disjointness across all committed executions.
    let mut seen = BTreeSet::new();
    for (id, execution) in &executions {
        if let Some(ports) = &execution.ports {
            for port in ports.values() {
                assert!(seen.insert(*port), "port {port} assigned twice (job {id})");
            }
        }
    }

    // Persistence before action: the committed view is always durable.
    assert_eq!(h.persisted(), executions);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invariants_hold_across_arbitrary_histories(
        ops in proptest::collection::vec(arb_op(), 1..24),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async move {
            let h = Harness::new();
            for op in ops {
                match op {
                    Op::Desire { job, goal } => {
                        h.model.put_task(job_id(job), job_task(job, goal));
                    }
                    Op::ContainerStopped { job } => {
                        if let Some(supervisor) = h.factory.latest(&job_id(job)) {
                            supervisor.report(SupervisorStatus::Stopped, true);
                        }
                    }
                }
                h.tick().await;
                assert_invariants(&h);
            }

            h.agent.stop().await;
            assert!(h.agent.supervised().is_empty());
        });
    }
}
