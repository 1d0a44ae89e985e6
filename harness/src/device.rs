// Copyright (C) 2025 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! The capability interface the driver is written against: named input pins,
//! named output reads, and combinational/sequential evaluation.

use std::fmt;

use snafu::Snafu;

/// <https://www.digikey.com/en/maker/blogs/2024/verilog-ports-part-7-of-our-verilog-journey>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
    Inout,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
            PortDirection::Inout => "inout",
        }
        .fmt(f)
    }
}

/// A port value, tagged with the narrowest of Verilator's C data types that
/// holds it (`CData` for 1-8 bits up through `QData` for 33-64 bits).
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum PortValue {
    CData(u8),
    SData(u16),
    IData(u32),
    QData(u64),
}

impl PortValue {
    /// The maximum number of bits this value takes up.
    pub fn width(&self) -> usize {
        match self {
            Self::CData(_) => 8,
            Self::SData(_) => 16,
            Self::IData(_) => 32,
            Self::QData(_) => 64,
        }
    }

    /// The value zero-extended to 64 bits.
    pub fn as_u64(self) -> u64 {
        match self {
            Self::CData(cdata) => cdata as u64,
            Self::SData(sdata) => sdata as u64,
            Self::IData(idata) => idata as u64,
            Self::QData(qdata) => qdata,
        }
    }
}

impl fmt::Display for PortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortValue::CData(cdata) => cdata.fmt(f),
            PortValue::SData(sdata) => sdata.fmt(f),
            PortValue::IData(idata) => idata.fmt(f),
            PortValue::QData(qdata) => qdata.fmt(f),
        }
    }
}

impl From<u8> for PortValue {
    fn from(value: u8) -> Self {
        Self::CData(value)
    }
}

impl From<u16> for PortValue {
    fn from(value: u16) -> Self {
        Self::SData(value)
    }
}

impl From<u32> for PortValue {
    fn from(value: u32) -> Self {
        Self::IData(value)
    }
}

impl From<u64> for PortValue {
    fn from(value: u64) -> Self {
        Self::QData(value)
    }
}

/// Signal misuse detected at the device boundary.
#[derive(Debug, Snafu)]
pub enum DeviceError {
    #[snafu(display("Port {port} not found on device {device}"))]
    NoSuchPort { device: String, port: String },
    #[snafu(display(
        "Value {value} does not fit in port {port} of width {width} on device {device}"
    ))]
    InvalidPortWidth {
        device: String,
        port: String,
        width: usize,
        value: u64,
    },
    #[snafu(display(
        "Port {port} on device {device} is an {direction} port, but was used as an {attempted_direction} port"
    ))]
    InvalidPortDirection {
        device: String,
        port: String,
        direction: PortDirection,
        attempted_direction: PortDirection,
    },
}

/// A clocked device reached only through its named signals. The driver owns
/// exactly one of these for the lifetime of a run.
pub trait ClockedDevice {
    /// If `port` names an input (or inout) port and `value` fits in its
    /// width, drives the port to `value`. The new value is not observable
    /// until the next [`eval`](ClockedDevice::eval).
    fn pin(
        &mut self,
        port: &str,
        value: impl Into<PortValue>,
    ) -> Result<(), DeviceError>;

    /// If `port` names an output (or inout) port, returns its current value.
    fn read(&self, port: &str) -> Result<PortValue, DeviceError>;

    /// Evaluates the device's combinational and sequential update for the
    /// currently pinned inputs.
    fn eval(&mut self);
}

/// The pinout of a conforming device, as `(port, msb, lsb, direction)` rows
/// suitable for handing to a model-building runtime.
///
/// Timing assumptions that are part of this contract, not just of the driver:
/// a conforming device commits a completed line to internal storage during
/// exactly one cycle after the line's trailing newline, with the stimulus
/// pins held at their last-driven values; and once `finished` is asserted it
/// stays asserted, with `ans1`/`ans2` valid, until the next reset.
pub const SIGNAL_CONTRACT: &[(&str, usize, usize, PortDirection)] = &[
    ("clock", 0, 0, PortDirection::Input),
    ("clear", 0, 0, PortDirection::Input),
    ("valid_in", 0, 0, PortDirection::Input),
    ("char_in", 7, 0, PortDirection::Input),
    ("finished", 0, 0, PortDirection::Output),
    ("ans1", 63, 0, PortDirection::Output),
    ("ans2", 63, 0, PortDirection::Output),
];
