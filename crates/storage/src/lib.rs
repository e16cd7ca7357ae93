// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! berth-storage: atomic, durable persistence for the berth node agent.

pub mod cell;

pub use cell::{CellError, PersistentCell, CURRENT_CELL_VERSION};
