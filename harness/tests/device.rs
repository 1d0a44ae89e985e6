// Copyright (C) 2025 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

use remora_harness::{ClockedDevice, DeviceError, PortValue};

mod common;
use common::CharCountDevice;

#[test]
fn port_values_zero_extend() {
    assert_eq!(PortValue::CData(0xFF).as_u64(), 0xFF);
    assert_eq!(PortValue::QData(u64::MAX).as_u64(), u64::MAX);
    assert_eq!(PortValue::from(7u8).width(), 8);
    assert_eq!(PortValue::from(7u32).width(), 32);
    assert_eq!(PortValue::SData(512).to_string(), "512");
}

#[test]
fn unknown_port_is_rejected() {
    let mut device = CharCountDevice::new();
    assert!(matches!(
        device.pin("interrupt", 1u8),
        Err(DeviceError::NoSuchPort { .. })
    ));
    assert!(matches!(
        device.read("interrupt"),
        Err(DeviceError::NoSuchPort { .. })
    ));
}

#[test]
fn direction_misuse_is_rejected() {
    let mut device = CharCountDevice::new();
    assert!(matches!(
        device.read("char_in"),
        Err(DeviceError::InvalidPortDirection { .. })
    ));
    assert!(matches!(
        device.pin("finished", 1u8),
        Err(DeviceError::InvalidPortDirection { .. })
    ));
}

#[test]
fn oversized_value_is_rejected() {
    let mut device = CharCountDevice::new();
    assert!(matches!(
        device.pin("valid_in", 2u8),
        Err(DeviceError::InvalidPortWidth { width: 1, value: 2, .. })
    ));
    // a full-width byte is fine on the 8-bit character port
    device.pin("char_in", 0xFFu8).expect("char_in is 8 bits");
}
