// Copyright (C) 2025 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! This crate implements the simulation driver at the heart of remora: reset,
//! stimulus injection, completion wait, and golden-value verification for a
//! clocked device reached only through its named signals.
//!
//! The driver is generic over [`ClockedDevice`], so it runs equally against a
//! verilated shared library (see the `remora-verilator` crate) or a pure-Rust
//! mock in tests.

pub mod device;
pub mod driver;
mod error;
pub mod golden;
pub mod stimulus;

pub use device::{
    ClockedDevice, DeviceError, PortDirection, PortValue, SIGNAL_CONTRACT,
};
pub use driver::{
    Comparison, Driver, DriverOptions, Verification, WaitOutcome,
    DEFAULT_MAX_WAIT_CYCLES,
};
pub use error::HarnessError;
pub use golden::Golden;
