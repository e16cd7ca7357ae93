// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host port allocation.
//!
//! Picks free host ports for a job's named logical ports, avoiding a
//! caller-supplied used-set. All-or-nothing: a job either gets its full
//! assignment or nothing, so a half-allocated job can never start.

use crate::execution::PortAssignment;
use crate::job::PortSpec;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

/// Allocates host ports for jobs from a configured dynamic range.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    range: RangeInclusive<u16>,
}

impl PortAllocator {
    pub fn new(range: RangeInclusive<u16>) -> Self {
        Self { range }
    }

    /// The dynamic allocation range.
    pub fn range(&self) -> &RangeInclusive<u16> {
        &self.range
    }

    /// Compute a full host-port assignment for `ports`, disjoint from `used`
    /// and internally disjoint, or `None` if any one port cannot be satisfied.
    ///
    /// Deterministic: port names are visited in sorted order, explicitly
    /// requested ports first, then the lowest free port in the range for
    /// each dynamic port.
    pub fn allocate(
        &self,
        ports: &BTreeMap<String, PortSpec>,
        used: &BTreeSet<u16>,
    ) -> Option<PortAssignment> {
        let mut taken = used.clone();
        let mut assignment = PortAssignment::new();

        // Explicit pass: requested host ports are non-negotiable.
        for (name, spec) in ports {
            if let Some(external) = spec.external {
                if !taken.insert(external) {
                    return None;
                }
                assignment.insert(name.clone(), external);
            }
        }

        // Dynamic pass: lowest free port in the configured range.
        for (name, spec) in ports {
            if spec.external.is_none() {
                let port = self.range.clone().find(|p| !taken.contains(p))?;
                taken.insert(port);
                assignment.insert(name.clone(), port);
            }
        }

        Some(assignment)
    }
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod tests;
