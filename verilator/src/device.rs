// Copyright (C) 2025 Ethan Uppal.
//
// This Source Code Form is subject to the terms of the Mozilla Public License,
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at https://mozilla.org/MPL/2.0/.

//! A verilated module bound as a [`ClockedDevice`].

use std::collections::HashMap;

use libloading::{Library, Symbol};
use remora_harness::device::{
    ClockedDevice, DeviceError, PortDirection, PortValue,
};
use snafu::{ResultExt, Whatever};

use crate::types;

enum PortSetter<'ctx> {
    CData(Symbol<'ctx, extern "C" fn(*mut libc::c_void, types::CData)>),
    SData(Symbol<'ctx, extern "C" fn(*mut libc::c_void, types::SData)>),
    IData(Symbol<'ctx, extern "C" fn(*mut libc::c_void, types::IData)>),
    QData(Symbol<'ctx, extern "C" fn(*mut libc::c_void, types::QData)>),
}

enum PortGetter<'ctx> {
    CData(Symbol<'ctx, extern "C" fn(*mut libc::c_void) -> types::CData>),
    SData(Symbol<'ctx, extern "C" fn(*mut libc::c_void) -> types::SData>),
    IData(Symbol<'ctx, extern "C" fn(*mut libc::c_void) -> types::IData>),
    QData(Symbol<'ctx, extern "C" fn(*mut libc::c_void) -> types::QData>),
}

struct PortSlot<'ctx> {
    width: usize,
    direction: PortDirection,
    setter: Option<PortSetter<'ctx>>,
    getter: Option<PortGetter<'ctx>>,
}

/// A hardware device backed by a verilated shared library. Every port
/// accessor is resolved once at load time, so pinning and reading afterwards
/// cannot fail on a missing symbol.
///
/// See [`VerilatorRuntime::create_device`](crate::VerilatorRuntime::create_device).
pub struct VerilatedDevice<'ctx> {
    name: String,
    handle: *mut libc::c_void,
    eval: Symbol<'ctx, extern "C" fn(*mut libc::c_void)>,
    delete: Symbol<'ctx, extern "C" fn(*mut libc::c_void)>,
    ports: HashMap<String, PortSlot<'ctx>>,
}

fn resolve<'ctx, T>(
    library: &'ctx Library,
    symbol: &str,
) -> Result<Symbol<'ctx, T>, Whatever> {
    unsafe { library.get(symbol.as_bytes()) }
        .whatever_context(format!("Failed to load symbol {symbol}"))
}

impl<'ctx> VerilatedDevice<'ctx> {
    /// Binds the verilated module `name` from `library`, constructing one
    /// instance and resolving the accessor symbols for every port in
    /// `ports`.
    pub(crate) fn load(
        library: &'ctx Library,
        name: &str,
        ports: &[(&str, usize, usize, PortDirection)],
    ) -> Result<Self, Whatever> {
        let constructor: Symbol<extern "C" fn() -> *mut libc::c_void> =
            resolve(library, &format!("ffi_new_V{name}"))
                .whatever_context(format!(
                    "Failed to load constructor for module {name}"
                ))?;
        let eval = resolve(library, &format!("ffi_V{name}_eval"))
            .whatever_context(format!(
                "Failed to load evaluator for module {name}"
            ))?;
        let delete = resolve(library, &format!("ffi_delete_V{name}"))
            .whatever_context(format!(
                "Failed to load destructor for module {name}"
            ))?;

        let mut slots = HashMap::new();
        for (port, msb, lsb, direction) in ports.iter().copied() {
            let width = msb + 1 - lsb;

            let setter = if matches!(
                direction,
                PortDirection::Input | PortDirection::Inout
            ) {
                let symbol = format!("ffi_V{name}_pin_{port}");
                Some(match width {
                    1..=8 => PortSetter::CData(resolve(library, &symbol)?),
                    9..=16 => PortSetter::SData(resolve(library, &symbol)?),
                    17..=32 => PortSetter::IData(resolve(library, &symbol)?),
                    _ => PortSetter::QData(resolve(library, &symbol)?),
                })
            } else {
                None
            };

            let getter = if matches!(
                direction,
                PortDirection::Output | PortDirection::Inout
            ) {
                let symbol = format!("ffi_V{name}_read_{port}");
                Some(match width {
                    1..=8 => PortGetter::CData(resolve(library, &symbol)?),
                    9..=16 => PortGetter::SData(resolve(library, &symbol)?),
                    17..=32 => PortGetter::IData(resolve(library, &symbol)?),
                    _ => PortGetter::QData(resolve(library, &symbol)?),
                })
            } else {
                None
            };

            slots.insert(
                port.to_string(),
                PortSlot {
                    width,
                    direction,
                    setter,
                    getter,
                },
            );
        }

        let handle = (*constructor)();

        Ok(Self {
            name: name.to_string(),
            handle,
            eval,
            delete,
            ports: slots,
        })
    }

    fn slot(&self, port: &str) -> Result<&PortSlot<'ctx>, DeviceError> {
        self.ports.get(port).ok_or_else(|| DeviceError::NoSuchPort {
            device: self.name.clone(),
            port: port.to_string(),
        })
    }
}

impl ClockedDevice for VerilatedDevice<'_> {
    fn pin(
        &mut self,
        port: &str,
        value: impl Into<PortValue>,
    ) -> Result<(), DeviceError> {
        let value = value.into().as_u64();
        let slot = self.slot(port)?;
        let Some(setter) = &slot.setter else {
            return Err(DeviceError::InvalidPortDirection {
                device: self.name.clone(),
                port: port.to_string(),
                direction: slot.direction,
                attempted_direction: PortDirection::Input,
            });
        };
        if slot.width < 64 && (value >> slot.width) != 0 {
            return Err(DeviceError::InvalidPortWidth {
                device: self.name.clone(),
                port: port.to_string(),
                width: slot.width,
                value,
            });
        }
        match setter {
            PortSetter::CData(symbol) => {
                (**symbol)(self.handle, value as types::CData)
            }
            PortSetter::SData(symbol) => {
                (**symbol)(self.handle, value as types::SData)
            }
            PortSetter::IData(symbol) => {
                (**symbol)(self.handle, value as types::IData)
            }
            PortSetter::QData(symbol) => {
                (**symbol)(self.handle, value as types::QData)
            }
        }
        Ok(())
    }

    fn read(&self, port: &str) -> Result<PortValue, DeviceError> {
        let slot = self.slot(port)?;
        let Some(getter) = &slot.getter else {
            return Err(DeviceError::InvalidPortDirection {
                device: self.name.clone(),
                port: port.to_string(),
                direction: slot.direction,
                attempted_direction: PortDirection::Output,
            });
        };
        Ok(match getter {
            PortGetter::CData(symbol) => {
                PortValue::CData((**symbol)(self.handle))
            }
            PortGetter::SData(symbol) => {
                PortValue::SData((**symbol)(self.handle))
            }
            PortGetter::IData(symbol) => {
                PortValue::IData((**symbol)(self.handle))
            }
            PortGetter::QData(symbol) => {
                PortValue::QData((**symbol)(self.handle))
            }
        })
    }

    fn eval(&mut self) {
        (*self.eval)(self.handle);
    }
}

impl Drop for VerilatedDevice<'_> {
    fn drop(&mut self) {
        (*self.delete)(self.handle);
    }
}
