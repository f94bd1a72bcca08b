//! Bit addressing within the process image.
//!
//! The driver only accepts bit positions 0-7 in `GetValue`/`SetValue`
//! requests, while a descriptor resolved for a boolean may carry a larger
//! bit offset. [`normalize`] folds whole bytes of the bit offset into the
//! address and must run before every single-bit request.

use std::fmt;

use crate::error::{PiControlError, Result};

/// Canonical `(address, bit)` pair with `bit` in `0..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitAddress {
    address: u16,
    bit: u8,
}

impl BitAddress {
    /// Builds a normalized address from any `(address, bit)` pair.
    pub fn new(address: u16, bit: u8) -> Result<Self> {
        let (address, bit) = normalize(address, bit)?;
        Ok(Self { address, bit })
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn bit(&self) -> u8 {
        self.bit
    }

    /// Absolute bit index within the process image.
    pub fn bit_index(&self) -> u32 {
        u32::from(self.address) * 8 + u32::from(self.bit)
    }
}

impl fmt::Display for BitAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.address, self.bit)
    }
}

/// Returns `(address + bit / 8, bit % 8)`.
///
/// Fails with [`PiControlError::AddressOverflow`] when the folded address
/// does not fit in `u16`.
pub fn normalize(address: u16, bit: u8) -> Result<(u16, u8)> {
    address
        .checked_add(u16::from(bit / 8))
        .map(|address| (address, bit % 8))
        .ok_or(PiControlError::AddressOverflow { address, bit })
}
