//! Request payload layouts.
//!
//! Each struct is encoded field by field, little-endian, with the padding
//! bytes the driver's C compiler inserts written out explicitly. Nothing
//! here relies on `#[repr(C)]` or on the host's packing rules.

use bytes::{Buf, BufMut};
use static_assertions::const_assert_eq;

use super::{MAX_NAME_LEN, NAME_BUFFER_LEN};
use crate::error::{PiControlError, Result};

fn check_len(what: &'static str, bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() < expected {
        return Err(PiControlError::MalformedPayload {
            what,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Description of one module attached to the controller.
///
/// Filled in wholesale by the driver; callers only read it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    /// Position of the module on the bus (0-255).
    pub address: u8,
    pub serial_number: u32,
    /// Module type, possibly carrying the not-connected flag.
    pub module_type: u16,
    pub hw_revision: u16,
    pub sw_major: u16,
    pub sw_minor: u16,
    pub svn_revision: u32,
    pub input_length: u16,
    pub output_length: u16,
    pub config_length: u16,
    pub base_offset: u16,
    pub input_offset: u16,
    pub output_offset: u16,
    pub config_offset: u16,
    /// Index of the module's first entry in the driver's variable table.
    pub first_entry: u16,
    /// Number of variable-table entries belonging to the module.
    pub entries: u16,
    pub module_state: u8,
    pub active: bool,
    pub reserved: [u8; DeviceInfo::RESERVED_LEN],
}

impl DeviceInfo {
    pub const RESERVED_LEN: usize = 30;

    /// `addr`, 3 pad, serial, 4 x u16, svn, 9 x u16, state, active, reserve, 2 pad.
    pub const WIRE_SIZE: usize = 1 + 3 + 4 + 2 * 4 + 4 + 2 * 9 + 1 + 1 + Self::RESERVED_LEN + 2;

    /// Request for a single module (`GetDeviceInfo`); only the address is read
    /// by the driver.
    pub fn request(address: u8) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        let mut buf = &mut out[..];
        buf.put_u8(self.address);
        buf.put_bytes(0, 3);
        buf.put_u32_le(self.serial_number);
        buf.put_u16_le(self.module_type);
        buf.put_u16_le(self.hw_revision);
        buf.put_u16_le(self.sw_major);
        buf.put_u16_le(self.sw_minor);
        buf.put_u32_le(self.svn_revision);
        buf.put_u16_le(self.input_length);
        buf.put_u16_le(self.output_length);
        buf.put_u16_le(self.config_length);
        buf.put_u16_le(self.base_offset);
        buf.put_u16_le(self.input_offset);
        buf.put_u16_le(self.output_offset);
        buf.put_u16_le(self.config_offset);
        buf.put_u16_le(self.first_entry);
        buf.put_u16_le(self.entries);
        buf.put_u8(self.module_state);
        buf.put_u8(u8::from(self.active));
        buf.put_slice(&self.reserved);
        buf.put_bytes(0, 2);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        check_len("DeviceInfo", bytes, Self::WIRE_SIZE)?;
        let mut buf = &bytes[..Self::WIRE_SIZE];

        let address = buf.get_u8();
        buf.advance(3);
        let serial_number = buf.get_u32_le();
        let module_type = buf.get_u16_le();
        let hw_revision = buf.get_u16_le();
        let sw_major = buf.get_u16_le();
        let sw_minor = buf.get_u16_le();
        let svn_revision = buf.get_u32_le();
        let input_length = buf.get_u16_le();
        let output_length = buf.get_u16_le();
        let config_length = buf.get_u16_le();
        let base_offset = buf.get_u16_le();
        let input_offset = buf.get_u16_le();
        let output_offset = buf.get_u16_le();
        let config_offset = buf.get_u16_le();
        let first_entry = buf.get_u16_le();
        let entries = buf.get_u16_le();
        let module_state = buf.get_u8();
        let active = buf.get_u8() != 0;
        let mut reserved = [0u8; Self::RESERVED_LEN];
        buf.copy_to_slice(&mut reserved);

        Ok(Self {
            address,
            serial_number,
            module_type,
            hw_revision,
            sw_major,
            sw_minor,
            svn_revision,
            input_length,
            output_length,
            config_length,
            base_offset,
            input_offset,
            output_offset,
            config_offset,
            first_entry,
            entries,
            module_state,
            active,
            reserved,
        })
    }
}

/// Symbolic variable resolved by the driver.
///
/// `bit` is only meaningful when `length == 1`; byte-aligned variables
/// report 0. A `length` of 0 after a lookup means the driver did not find
/// the name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariableDescriptor {
    pub name: String,
    /// Byte offset within the process image.
    pub address: u16,
    pub bit: u8,
    /// Length in bits: 1 for booleans, otherwise 8, 16 or 32.
    pub length: u16,
}

impl VariableDescriptor {
    /// name[32], address, bit, 1 pad, length.
    pub const WIRE_SIZE: usize = NAME_BUFFER_LEN + 2 + 1 + 1 + 2;

    /// Lookup request for `name`. Fails if the name does not fit the buffer.
    pub fn request(name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            ..Self::default()
        })
    }

    pub fn encode(&self) -> Result<[u8; Self::WIRE_SIZE]> {
        validate_name(&self.name)?;

        let mut out = [0u8; Self::WIRE_SIZE];
        let mut buf = &mut out[..];
        buf.put_slice(self.name.as_bytes());
        buf.put_bytes(0, NAME_BUFFER_LEN - self.name.len());
        buf.put_u16_le(self.address);
        buf.put_u8(self.bit);
        buf.put_u8(0);
        buf.put_u16_le(self.length);
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        check_len("VariableDescriptor", bytes, Self::WIRE_SIZE)?;
        let raw_name = &bytes[..NAME_BUFFER_LEN];
        let end = raw_name
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(NAME_BUFFER_LEN);
        let name = String::from_utf8_lossy(&raw_name[..end]).into_owned();

        let mut buf = &bytes[NAME_BUFFER_LEN..Self::WIRE_SIZE];

        let address = buf.get_u16_le();
        let bit = buf.get_u8();
        buf.advance(1);
        let length = buf.get_u16_le();

        Ok(Self {
            name,
            address,
            bit,
            length,
        })
    }
}

/// Checks a variable name against the fixed name buffer.
///
/// Names must be 1 to 31 bytes of printable, non-space ASCII. Longer names
/// are rejected rather than truncated.
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.len() > MAX_NAME_LEN {
        "name is longer than 31 bytes"
    } else if !name.bytes().all(|b| b.is_ascii_graphic()) {
        "name contains characters other than printable ASCII"
    } else {
        return Ok(());
    };

    Err(PiControlError::InvalidVariableName {
        name: name.to_string(),
        reason,
    })
}

/// Single-bit get/set payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitValue {
    pub address: u16,
    /// Must already be normalized into 0..=7.
    pub bit: u8,
    /// 0 or 1.
    pub value: u8,
}

impl BitValue {
    pub const WIRE_SIZE: usize = 2 + 1 + 1;

    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        let mut buf = &mut out[..];
        buf.put_u16_le(self.address);
        buf.put_u8(self.bit);
        buf.put_u8(self.value);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        check_len("BitValue", bytes, Self::WIRE_SIZE)?;
        let mut buf = &bytes[..Self::WIRE_SIZE];
        Ok(Self {
            address: buf.get_u16_le(),
            bit: buf.get_u8(),
            value: buf.get_u8(),
        })
    }
}

/// DIO counter reset: `bitfield` selects the counters of the module at `address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetCounterRequest {
    pub address: u8,
    pub bitfield: u16,
}

impl ResetCounterRequest {
    /// address, 1 pad, bitfield.
    pub const WIRE_SIZE: usize = 1 + 1 + 2;

    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        let mut buf = &mut out[..];
        buf.put_u8(self.address);
        buf.put_u8(0);
        buf.put_u16_le(self.bitfield);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        check_len("ResetCounterRequest", bytes, Self::WIRE_SIZE)?;
        let mut buf = &bytes[..Self::WIRE_SIZE];
        let address = buf.get_u8();
        buf.advance(1);
        Ok(Self {
            address,
            bitfield: buf.get_u16_le(),
        })
    }
}

// Sizes the driver was built with (sizeof on the ARM target).
const_assert_eq!(DeviceInfo::WIRE_SIZE, 72);
const_assert_eq!(VariableDescriptor::WIRE_SIZE, 38);
const_assert_eq!(BitValue::WIRE_SIZE, 4);
const_assert_eq!(ResetCounterRequest::WIRE_SIZE, 4);
