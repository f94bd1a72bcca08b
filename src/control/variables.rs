//! Typed access to named variables.

use tracing::trace;

use super::PiControl;
use crate::abi::VariableDescriptor;
use crate::address::BitAddress;
use crate::codec::{self, Value, Width};
use crate::error::{PiControlError, Result};
use crate::transport::Driver;

/// A variable together with the value read from or written to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReading {
    pub variable: VariableDescriptor,
    pub value: Value,
}

enum Access {
    Bit(BitAddress),
    Bytes(Width),
}

/// Decides how a variable is accessed. Runs before any process-image I/O.
fn classify(variable: &VariableDescriptor) -> Result<Access> {
    match variable.length {
        1 => Ok(Access::Bit(BitAddress::new(variable.address, variable.bit)?)),
        length if length % 8 != 0 => Err(PiControlError::InvalidVariableLength {
            name: variable.name.clone(),
            length,
        }),
        length => Width::from_bit_length(length)
            .map(Access::Bytes)
            .ok_or(PiControlError::CodecMismatch(length)),
    }
}

impl<D: Driver> PiControl<D> {
    /// Resolves `name` and reads its current value.
    pub fn read_variable(&mut self, name: &str) -> Result<VariableReading> {
        let variable = self.variable_info(name)?;
        let value = match classify(&variable)? {
            Access::Bit(target) => Value::Bit(self.get_bit(target.address(), target.bit())?),
            Access::Bytes(width) => {
                let bytes = self.read_exact(u32::from(variable.address), width.byte_len())?;
                codec::decode(&bytes, width.bit_length())?
            }
        };
        trace!(variable = name, %value, "read variable");
        Ok(VariableReading { variable, value })
    }

    /// Resolves `name` and writes `raw`, narrowed to the variable's width.
    ///
    /// Values that do not fit are rejected; a bit accepts only 0 and 1.
    pub fn write_variable(&mut self, name: &str, raw: u32) -> Result<VariableReading> {
        let variable = self.variable_info(name)?;
        let value = match classify(&variable)? {
            Access::Bit(target) => {
                let value = Value::from_u32(raw, Width::Bit)?;
                self.set_bit(target.address(), target.bit(), raw != 0)?;
                value
            }
            Access::Bytes(width) => {
                let value = Value::from_u32(raw, width)?;
                self.write_all(u32::from(variable.address), &codec::encode(value)?)?;
                value
            }
        };
        trace!(variable = name, %value, "wrote variable");
        Ok(VariableReading { variable, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(length: u16) -> VariableDescriptor {
        VariableDescriptor {
            name: "Var".to_string(),
            address: 10,
            bit: 9,
            length,
        }
    }

    #[test]
    fn test_classify_bit_normalizes() {
        match classify(&descriptor(1)).unwrap() {
            Access::Bit(target) => {
                assert_eq!(target.address(), 11);
                assert_eq!(target.bit(), 1);
            }
            Access::Bytes(_) => panic!("expected bit access"),
        }
    }

    #[test]
    fn test_classify_widths() {
        for (length, width) in [(8, Width::U8), (16, Width::U16), (32, Width::U32)] {
            assert!(matches!(classify(&descriptor(length)).unwrap(), Access::Bytes(w) if w == width));
        }
    }

    #[test]
    fn test_classify_bit_past_end_of_address_space() {
        let variable = VariableDescriptor {
            address: 0xFFFF,
            bit: 8,
            ..descriptor(1)
        };
        assert!(matches!(
            classify(&variable),
            Err(PiControlError::AddressOverflow { address: 0xFFFF, bit: 8 })
        ));
    }

    #[test]
    fn test_classify_invalid_length() {
        assert!(matches!(
            classify(&descriptor(12)),
            Err(PiControlError::InvalidVariableLength { length: 12, .. })
        ));
    }

    #[test]
    fn test_classify_unsupported_multiple_of_eight() {
        assert!(matches!(
            classify(&descriptor(24)),
            Err(PiControlError::CodecMismatch(24))
        ));
    }
}
