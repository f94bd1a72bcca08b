//! Error types for piControl access.

use std::io;
use std::path::PathBuf;

use crate::abi::Command;

/// Result type for piControl operations.
pub type Result<T> = std::result::Result<T, PiControlError>;

/// Errors returned by the access layer.
///
/// Nothing is retried internally; every failure reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum PiControlError {
    /// The device node could not be opened.
    #[error("cannot open {}: {source}", .path.display())]
    DeviceOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Seek, read or write on the process image failed.
    #[error("process image I/O error: {0}")]
    Io(#[from] io::Error),

    /// The driver answered a request with a negative result code.
    #[error("{command} failed ({code}): {message}")]
    IoctlFailed {
        command: Command,
        code: i32,
        message: String,
    },

    #[error("cannot find variable '{0}'")]
    VariableNotFound(String),

    #[error("invalid variable name '{name}': {reason}")]
    InvalidVariableName { name: String, reason: &'static str },

    /// Resolved length is neither 1 nor a multiple of 8.
    #[error("variable '{name}' has invalid bit length {length}")]
    InvalidVariableLength { name: String, length: u16 },

    #[error("short transfer at offset {offset}: expected {expected} bytes, got {actual}")]
    PartialTransfer {
        offset: u32,
        expected: usize,
        actual: usize,
    },

    /// The codec was handed a bit length it does not encode. Internal error.
    #[error("internal error: no codec for bit length {0}")]
    CodecMismatch(u16),

    /// Folding `bit` into `address` runs past the 16-bit offset range.
    #[error("bit {bit} at address {address} is beyond the process image")]
    AddressOverflow { address: u16, bit: u8 },

    #[error("value {value} does not fit in {bit_length} bit(s)")]
    ValueOutOfRange { value: u32, bit_length: u16 },

    #[error("malformed {what} payload: expected {expected} bytes, got {actual}")]
    MalformedPayload {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("firmware update failed ({code}): {message}{}", .diagnostic.as_deref().map(|d| format!(" [{}]", d)).unwrap_or_default())]
    FirmwareUpdateFailed {
        code: i32,
        message: String,
        /// Driver's last message, read after the failed request.
        diagnostic: Option<String>,
    },
}

impl PiControlError {
    /// Returns true if a variable lookup found nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PiControlError::VariableNotFound(_))
    }

    /// Driver result code, if the driver produced one.
    pub fn code(&self) -> Option<i32> {
        match self {
            PiControlError::IoctlFailed { code, .. }
            | PiControlError::FirmwareUpdateFailed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true for failures reaching the device node itself.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            PiControlError::DeviceOpenFailed { .. } | PiControlError::Io(_)
        )
    }
}
