//! piControl driver ABI.
//!
//! Everything in this module is part of the binary contract with the kernel
//! driver: the device path, the ioctl command codes and the byte layout of
//! every request payload. None of it is configuration.
//!
//! ## Command codes
//!
//! | Command              | Code     | Payload                          |
//! |----------------------|----------|----------------------------------|
//! | `Reset`              | `0x4b0c` | none                             |
//! | `GetDeviceInfoList`  | `0x4b0d` | `[DeviceInfo; MAX_DEVICES]`      |
//! | `GetDeviceInfo`      | `0x4b0e` | `DeviceInfo`                     |
//! | `GetValue`           | `0x4b0f` | `BitValue`                       |
//! | `SetValue`           | `0x4b10` | `BitValue`                       |
//! | `FindVariable`       | `0x4b11` | `VariableDescriptor`             |
//! | `UpdateFirmware`     | `0x4b13` | none, or module address (`u32`)  |
//! | `DioResetCounter`    | `0x4b14` | `ResetCounterRequest`            |
//! | `GetLastMessage`     | `0x4b15` | `[u8; LAST_MESSAGE_LEN]`         |
//! | `WaitForEvent`       | `0x4b32` | event code (`i32`)               |

mod layout;

pub use layout::{validate_name, BitValue, DeviceInfo, ResetCounterRequest, VariableDescriptor};

use std::fmt;

/// Character device exposed by the piControl driver.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/piControl0";

/// Number of `DeviceInfo` slots handed to `GetDeviceInfoList`.
pub const MAX_DEVICES: usize = 255;

/// Size of the fixed variable-name buffer, terminator included.
pub const NAME_BUFFER_LEN: usize = 32;

/// Longest variable name that fits the name buffer.
pub const MAX_NAME_LEN: usize = NAME_BUFFER_LEN - 1;

/// Size of the buffer filled by `GetLastMessage`.
pub const LAST_MESSAGE_LEN: usize = 255;

/// Size of the process image maintained by the driver.
pub const PROCESS_IMAGE_LEN: usize = 4096;

/// Flag set in a module type when the configured module is not connected.
pub const NOT_CONNECTED: u16 = 0x8000;

/// Mask removing [`NOT_CONNECTED`] from a module type.
pub const NOT_CONNECTED_MASK: u16 = 0x7fff;

/// Event code written by `WaitForEvent` after a driver reset.
pub const EVENT_RESET: i32 = 1;

/// Requests understood by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Reset,
    GetDeviceInfo,
    GetDeviceInfoList,
    GetValue,
    SetValue,
    FindVariable,
    DioResetCounter,
    UpdateFirmware,
    GetLastMessage,
    WaitForEvent,
}

impl Command {
    /// All commands, in code order.
    pub const ALL: [Command; 10] = [
        Command::Reset,
        Command::GetDeviceInfoList,
        Command::GetDeviceInfo,
        Command::GetValue,
        Command::SetValue,
        Command::FindVariable,
        Command::UpdateFirmware,
        Command::DioResetCounter,
        Command::GetLastMessage,
        Command::WaitForEvent,
    ];

    /// Short name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Reset => "reset",
            Command::GetDeviceInfo => "get-device-info",
            Command::GetDeviceInfoList => "get-device-info-list",
            Command::GetValue => "get-value",
            Command::SetValue => "set-value",
            Command::FindVariable => "find-variable",
            Command::DioResetCounter => "dio-reset-counter",
            Command::UpdateFirmware => "update-firmware",
            Command::GetLastMessage => "get-last-message",
            Command::WaitForEvent => "wait-for-event",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric ioctl codes, one per [`Command`].
///
/// Owned by the transport rather than living in globals; [`CommandTable::KUNBUS`]
/// is the only table the shipped driver understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTable {
    pub reset: u32,
    pub get_device_info_list: u32,
    pub get_device_info: u32,
    pub get_value: u32,
    pub set_value: u32,
    pub find_variable: u32,
    pub update_firmware: u32,
    pub dio_reset_counter: u32,
    pub get_last_message: u32,
    pub wait_for_event: u32,
}

impl CommandTable {
    /// Codes of the KUNBUS piControl driver (`'K' << 8 | n`).
    pub const KUNBUS: CommandTable = CommandTable {
        reset: 0x4b0c,
        get_device_info_list: 0x4b0d,
        get_device_info: 0x4b0e,
        get_value: 0x4b0f,
        set_value: 0x4b10,
        find_variable: 0x4b11,
        update_firmware: 0x4b13,
        dio_reset_counter: 0x4b14,
        get_last_message: 0x4b15,
        wait_for_event: 0x4b32,
    };

    /// Code sent for `command`.
    pub fn code(&self, command: Command) -> u32 {
        match command {
            Command::Reset => self.reset,
            Command::GetDeviceInfoList => self.get_device_info_list,
            Command::GetDeviceInfo => self.get_device_info,
            Command::GetValue => self.get_value,
            Command::SetValue => self.set_value,
            Command::FindVariable => self.find_variable,
            Command::UpdateFirmware => self.update_firmware,
            Command::DioResetCounter => self.dio_reset_counter,
            Command::GetLastMessage => self.get_last_message,
            Command::WaitForEvent => self.wait_for_event,
        }
    }

    /// Reverse lookup, used by driver emulations.
    pub fn command(&self, code: u32) -> Option<Command> {
        Command::ALL.into_iter().find(|c| self.code(*c) == code)
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::KUNBUS
    }
}

#[cfg(test)]
mod tests;
