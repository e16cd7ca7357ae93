// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::job::{Job, PortSpec, Protocol};
use std::collections::BTreeMap;

// ── Builders ────────────────────────────────────────────────────────────

/// Fluent builder for [`Job`] test fixtures.
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new(image: &str) -> Self {
        Self { job: Job::new(image) }
    }

    pub fn command(mut self, argv: &[&str]) -> Self {
        self.job.command = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.job.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn dynamic_port(mut self, name: &str, internal: u16) -> Self {
        self.job.ports.insert(name.to_string(), PortSpec::dynamic(internal));
        self
    }

    pub fn fixed_port(mut self, name: &str, internal: u16, external: u16) -> Self {
        self.job.ports.insert(name.to_string(), PortSpec::fixed(internal, external));
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}

/// A minimal job with one dynamic port named "http".
pub fn http_job() -> Job {
    JobBuilder::new("busybox:latest").dynamic_port("http", 80).build()
}

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core domain types.
pub mod strategies {
    use super::*;
    use crate::task::Goal;
    use proptest::collection::{btree_map, btree_set};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    pub fn arb_goal() -> impl Strategy<Value = Goal> {
        prop_oneof![Just(Goal::Start), Just(Goal::Stop), Just(Goal::Undeploy)]
    }

    pub fn arb_protocol() -> impl Strategy<Value = Protocol> {
        prop_oneof![Just(Protocol::Tcp), Just(Protocol::Udp)]
    }

    pub fn arb_port_spec(external: impl Strategy<Value = Option<u16>>) -> impl Strategy<Value = PortSpec> {
        (1u16..=u16::MAX, arb_protocol(), external)
            .prop_map(|(internal, protocol, external)| PortSpec { internal, protocol, external })
    }

    /// A named port map mixing dynamic and explicitly requested ports.
    ///
    /// Explicit requests are drawn from `explicit_range` so tests can aim
    /// them inside or outside an allocator's dynamic range.
    pub fn arb_port_map(
        max_ports: usize,
        explicit_range: std::ops::RangeInclusive<u16>,
    ) -> impl Strategy<Value = BTreeMap<String, PortSpec>> {
        let external = prop_oneof![
            3 => Just(None::<u16>),
            1 => explicit_range.prop_map(Some),
        ];
        btree_map("[a-z]{1,8}", arb_port_spec(external), 0..=max_ports)
    }

    pub fn arb_used_ports(
        range: std::ops::RangeInclusive<u16>,
        max: usize,
    ) -> impl Strategy<Value = BTreeSet<u16>> {
        btree_set(range, 0..=max)
    }
}
