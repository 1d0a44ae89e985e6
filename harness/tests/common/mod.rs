// Copyright (C) 2025 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! A pure-Rust device conforming to the signal contract, for driving the
//! harness without a verilated model: `ans1` counts non-newline characters
//! and `ans2` accumulates twice each line's length during the line-commit
//! cycle.

use remora_harness::{
    ClockedDevice, DeviceError, PortDirection, PortValue, SIGNAL_CONTRACT,
};

const DEVICE: &str = "char_count_model";

fn contract_entry(port: &str) -> Result<(usize, PortDirection), DeviceError> {
    SIGNAL_CONTRACT
        .iter()
        .find(|(name, _, _, _)| *name == port)
        .map(|(_, msb, lsb, direction)| (msb - lsb + 1, *direction))
        .ok_or(DeviceError::NoSuchPort {
            device: DEVICE.to_string(),
            port: port.to_string(),
        })
}

pub struct CharCountDevice {
    clock: u8,
    prev_clock: u8,
    clear: u8,
    valid_in: u8,
    char_in: u8,
    finished: bool,
    ans1: u64,
    ans2: u64,
    line_len: u64,
    committing: bool,
    /// Idle rising edges to sit through after the stimulus ends before
    /// asserting `finished`.
    latency: u64,
    countdown: u64,
    never_finish: bool,
}

impl CharCountDevice {
    pub fn new() -> Self {
        Self::with_latency(0)
    }

    pub fn with_latency(latency: u64) -> Self {
        Self {
            clock: 0,
            prev_clock: 0,
            clear: 0,
            valid_in: 0,
            char_in: 0,
            finished: false,
            ans1: 0,
            ans2: 0,
            line_len: 0,
            committing: false,
            latency,
            countdown: latency,
            never_finish: false,
        }
    }

    /// A device that computes answers but never asserts `finished`.
    pub fn never_finishing() -> Self {
        Self {
            never_finish: true,
            ..Self::new()
        }
    }
}

impl ClockedDevice for CharCountDevice {
    fn pin(
        &mut self,
        port: &str,
        value: impl Into<PortValue>,
    ) -> Result<(), DeviceError> {
        let (width, direction) = contract_entry(port)?;
        if !matches!(direction, PortDirection::Input | PortDirection::Inout) {
            return Err(DeviceError::InvalidPortDirection {
                device: DEVICE.to_string(),
                port: port.to_string(),
                direction,
                attempted_direction: PortDirection::Input,
            });
        }
        let value = value.into().as_u64();
        if width < 64 && (value >> width) != 0 {
            return Err(DeviceError::InvalidPortWidth {
                device: DEVICE.to_string(),
                port: port.to_string(),
                width,
                value,
            });
        }
        match port {
            "clock" => self.clock = value as u8,
            "clear" => self.clear = value as u8,
            "valid_in" => self.valid_in = value as u8,
            "char_in" => self.char_in = value as u8,
            _ => unreachable!("contract_entry admits only contract ports"),
        }
        Ok(())
    }

    fn read(&self, port: &str) -> Result<PortValue, DeviceError> {
        let (_, direction) = contract_entry(port)?;
        if !matches!(direction, PortDirection::Output | PortDirection::Inout) {
            return Err(DeviceError::InvalidPortDirection {
                device: DEVICE.to_string(),
                port: port.to_string(),
                direction,
                attempted_direction: PortDirection::Output,
            });
        }
        Ok(match port {
            "finished" => PortValue::CData(self.finished as u8),
            "ans1" => PortValue::QData(self.ans1),
            "ans2" => PortValue::QData(self.ans2),
            _ => unreachable!("contract_entry admits only contract ports"),
        })
    }

    fn eval(&mut self) {
        let rising = self.prev_clock == 0 && self.clock == 1;
        self.prev_clock = self.clock;
        if !rising {
            return;
        }
        if self.clear != 0 {
            self.finished = false;
            self.ans1 = 0;
            self.ans2 = 0;
            self.line_len = 0;
            self.committing = false;
            self.countdown = self.latency;
            return;
        }
        if self.committing {
            // the line-commit cycle; stimulus is held but ignored
            self.ans2 += 2 * self.line_len;
            self.line_len = 0;
            self.committing = false;
        } else if self.valid_in != 0 {
            if self.char_in == b'\n' {
                self.committing = true;
            } else {
                self.ans1 += 1;
                self.line_len += 1;
            }
        } else if self.countdown == 0 {
            if !self.never_finish {
                self.finished = true;
            }
        } else {
            self.countdown -= 1;
        }
    }
}
