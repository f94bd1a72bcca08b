//! Module type names.
//!
//! The driver reports a numeric module type per attached module. A module
//! that is configured but not physically present carries the
//! [`NOT_CONNECTED`] flag in the same field.

use crate::abi::{DeviceInfo, NOT_CONNECTED, NOT_CONNECTED_MASK};

/// Label for module types missing from the table.
pub const UNKNOWN_MODULE: &str = "unknown moduletype";

const MODULE_NAMES: &[(u16, &str)] = &[
    (95, "RevPi Core"),
    (96, "RevPi DIO"),
    (97, "RevPi DI"),
    (98, "RevPi DO"),
    (103, "RevPi AIO"),
    (100, "Gateway DMX"),
    (71, "Gateway CANopen"),
    (73, "Gateway DeviceNet"),
    (74, "Gateway EtherCAT"),
    (75, "Gateway EtherNet/IP"),
    (93, "Gateway ModbusTCP"),
    (76, "Gateway Powerlink"),
    (77, "Gateway Profibus"),
    (79, "Gateway Profinet IRT"),
    (81, "Gateway SercosIII"),
    (0x6001, "ModbusTCP Slave Adapter"),
    (0x6002, "ModbusRTU Slave Adapter"),
    (0x6003, "ModbusTCP Master Adapter"),
    (0x6004, "ModbusRTU Master Adapter"),
];

/// Friendly name of `module_type`, ignoring the not-connected flag.
pub fn module_name(module_type: u16) -> &'static str {
    let module_type = module_type & NOT_CONNECTED_MASK;
    MODULE_NAMES
        .iter()
        .find(|(code, _)| *code == module_type)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_MODULE)
}

/// True when the configured module is not connected.
pub fn is_disconnected(module_type: u16) -> bool {
    module_type & NOT_CONNECTED != 0
}

impl DeviceInfo {
    pub fn module_name(&self) -> &'static str {
        module_name(self.module_type)
    }

    pub fn is_disconnected(&self) -> bool {
        is_disconnected(self.module_type)
    }

    /// Module type with the not-connected flag cleared.
    pub fn base_module_type(&self) -> u16 {
        self.module_type & NOT_CONNECTED_MASK
    }
}
