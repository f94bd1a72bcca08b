//! Typed values and their process-image encoding.
//!
//! Byte-aligned variables are stored little-endian in 1, 2 or 4 bytes.
//! Single bits never pass through the codec: they travel in a `BitValue`
//! request instead.

use std::fmt;

use crate::error::{PiControlError, Result};

/// Storage width of a variable, derived from its bit length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    Bit,
    U8,
    U16,
    U32,
}

impl Width {
    /// Maps a supported bit length (1, 8, 16, 32).
    pub fn from_bit_length(length: u16) -> Option<Self> {
        match length {
            1 => Some(Width::Bit),
            8 => Some(Width::U8),
            16 => Some(Width::U16),
            32 => Some(Width::U32),
            _ => None,
        }
    }

    pub fn bit_length(&self) -> u16 {
        match self {
            Width::Bit => 1,
            Width::U8 => 8,
            Width::U16 => 16,
            Width::U32 => 32,
        }
    }

    /// Bytes occupied in the process image; 0 for a bit.
    pub fn byte_len(&self) -> usize {
        match self {
            Width::Bit => 0,
            Width::U8 => 1,
            Width::U16 => 2,
            Width::U32 => 4,
        }
    }

    /// Largest value representable at this width.
    pub fn max_value(&self) -> u32 {
        match self {
            Width::Bit => 1,
            Width::U8 => u32::from(u8::MAX),
            Width::U16 => u32::from(u16::MAX),
            Width::U32 => u32::MAX,
        }
    }
}

/// A process-image value of one of the supported widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Bit(bool),
    U8(u8),
    U16(u16),
    U32(u32),
}

impl Value {
    /// Narrows `raw` to `width`, rejecting values that do not fit.
    pub fn from_u32(raw: u32, width: Width) -> Result<Self> {
        let out_of_range = || PiControlError::ValueOutOfRange {
            value: raw,
            bit_length: width.bit_length(),
        };
        Ok(match width {
            Width::Bit => match raw {
                0 => Value::Bit(false),
                1 => Value::Bit(true),
                _ => return Err(out_of_range()),
            },
            Width::U8 => Value::U8(u8::try_from(raw).map_err(|_| out_of_range())?),
            Width::U16 => Value::U16(u16::try_from(raw).map_err(|_| out_of_range())?),
            Width::U32 => Value::U32(raw),
        })
    }

    pub fn width(&self) -> Width {
        match self {
            Value::Bit(_) => Width::Bit,
            Value::U8(_) => Width::U8,
            Value::U16(_) => Width::U16,
            Value::U32(_) => Width::U32,
        }
    }

    /// Widens to `u32`; a bit becomes 0 or 1.
    pub fn as_u32(&self) -> u32 {
        match *self {
            Value::Bit(v) => u32::from(v),
            Value::U8(v) => u32::from(v),
            Value::U16(v) => u32::from(v),
            Value::U32(v) => v,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Encodes a byte-aligned value little-endian.
///
/// `Value::Bit` has no byte encoding and yields [`PiControlError::CodecMismatch`].
pub fn encode(value: Value) -> Result<Vec<u8>> {
    match value {
        Value::Bit(_) => Err(PiControlError::CodecMismatch(1)),
        Value::U8(v) => Ok(vec![v]),
        Value::U16(v) => Ok(v.to_le_bytes().to_vec()),
        Value::U32(v) => Ok(v.to_le_bytes().to_vec()),
    }
}

/// Decodes `bytes` as a little-endian value of `bit_length` bits.
///
/// Extra trailing bytes are ignored; too few bytes is a
/// [`PiControlError::MalformedPayload`].
pub fn decode(bytes: &[u8], bit_length: u16) -> Result<Value> {
    match bit_length {
        8 => Ok(Value::U8(u8::from_le_bytes(take(bytes)?))),
        16 => Ok(Value::U16(u16::from_le_bytes(take(bytes)?))),
        32 => Ok(Value::U32(u32::from_le_bytes(take(bytes)?))),
        other => Err(PiControlError::CodecMismatch(other)),
    }
}

fn take<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .get(..N)
        .and_then(|raw| raw.try_into().ok())
        .ok_or(PiControlError::MalformedPayload {
            what: "value",
            expected: N,
            actual: bytes.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_300_as_u16() {
        assert_eq!(encode(Value::U16(300)).unwrap(), vec![0x2C, 0x01]);
    }

    #[test]
    fn test_decode_300_as_u16() {
        assert_eq!(decode(&[0x2C, 0x01], 16).unwrap(), Value::U16(300));
    }

    #[test]
    fn test_u32_little_endian() {
        assert_eq!(
            encode(Value::U32(0x1234_5678)).unwrap(),
            vec![0x78, 0x56, 0x34, 0x12]
        );
        assert_eq!(
            decode(&[0x78, 0x56, 0x34, 0x12], 32).unwrap(),
            Value::U32(0x1234_5678)
        );
    }

    #[test]
    fn test_u8() {
        assert_eq!(encode(Value::U8(0xfe)).unwrap(), vec![0xfe]);
        assert_eq!(decode(&[0xfe, 0xff], 8).unwrap(), Value::U8(0xfe));
    }

    #[test]
    fn test_bit_has_no_byte_encoding() {
        assert!(matches!(
            encode(Value::Bit(true)),
            Err(PiControlError::CodecMismatch(1))
        ));
        assert!(matches!(
            decode(&[1], 1),
            Err(PiControlError::CodecMismatch(1))
        ));
    }

    #[test]
    fn test_unsupported_lengths_are_codec_mismatch() {
        for length in [0, 12, 24, 64] {
            assert!(matches!(
                decode(&[0; 8], length),
                Err(PiControlError::CodecMismatch(l)) if l == length
            ));
        }
    }

    #[test]
    fn test_decode_short_input() {
        assert!(matches!(
            decode(&[0x01], 32),
            Err(PiControlError::MalformedPayload {
                expected: 4,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_from_u32_range_checks() {
        assert_eq!(Value::from_u32(255, Width::U8).unwrap(), Value::U8(255));
        assert_eq!(
            Value::from_u32(65535, Width::U16).unwrap(),
            Value::U16(65535)
        );
        assert_eq!(Value::from_u32(1, Width::Bit).unwrap(), Value::Bit(true));

        assert!(matches!(
            Value::from_u32(256, Width::U8),
            Err(PiControlError::ValueOutOfRange {
                value: 256,
                bit_length: 8
            })
        ));
        assert!(matches!(
            Value::from_u32(2, Width::Bit),
            Err(PiControlError::ValueOutOfRange { bit_length: 1, .. })
        ));
    }

    #[test]
    fn test_width_lengths() {
        assert_eq!(Width::from_bit_length(16), Some(Width::U16));
        assert_eq!(Width::from_bit_length(12), None);
        assert_eq!(Width::U32.byte_len(), 4);
        assert_eq!(Width::U16.max_value(), 65535);
    }
}
