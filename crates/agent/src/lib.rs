// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! berth-agent: the node-local reconciliation agent.
//!
//! Continuously drives the containers on this host toward the desired
//! deployment state published by the control plane, and reports the
//! observed state back. The embedder supplies the control-plane [`Model`]
//! and a [`SupervisorFactory`] bound to the host's container runtime.

pub mod agent;
pub mod config;
pub mod model;
pub mod reactor;
pub mod supervisor;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent::Agent;
pub use config::{AgentConfig, ConfigError, ExecutionsConfig, PortsConfig, ReactorConfig};
pub use model::{Model, TasksChanged};
pub use reactor::{Reactor, ReactorHandle, Tick, TickFn};
pub use supervisor::{Supervisor, SupervisorError, SupervisorFactory, SupervisorStatus};
