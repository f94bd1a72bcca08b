//! Driver transport.
//!
//! [`Driver`] is the seam between the access layer and the kernel: raw
//! control requests against numeric codes, plus positioned reads and writes
//! of the process image. [`crate::device::DeviceHandle`] talks to the real
//! character device; [`mock::MockDriver`] emulates the driver in memory.
//!
//! Control requests return the driver's signed result code untouched.
//! [`check`] turns negative codes into [`PiControlError::IoctlFailed`],
//! picking the message source the command calls for:
//!
//! | Commands             | Message source                     |
//! |----------------------|------------------------------------|
//! | `Reset`, `SetValue`  | [`DRIVER_MESSAGES`] table          |
//! | everything else      | errno description of `-code`       |

pub mod mock;

use nix::errno::Errno;
use tracing::trace;

use crate::abi::Command;
use crate::error::{PiControlError, Result};

/// Messages for write/reset failures, indexed by `-code - 1`.
pub const DRIVER_MESSAGES: [&str; 3] = [
    "Cannot connect to control process",
    "Offset seek error",
    "Cannot write to control process",
];

/// Fallback for codes outside [`DRIVER_MESSAGES`].
pub const UNKNOWN_DRIVER_MESSAGE: &str = "Unknown error";

/// Low-level access to the piControl driver.
///
/// Implementations open lazily: every operation issued while closed opens
/// the device first. Not internally synchronized; share a driver between
/// threads only behind a lock.
pub trait Driver {
    /// Opens the device if it is not open yet.
    fn open(&mut self) -> Result<()>;

    /// Releases the device. Calling it again is a no-op.
    fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Issues control request `request` with an optional in/out payload and
    /// returns the driver's result code. Negative codes are returned, not
    /// raised; only failing to reach the device is an `Err`.
    fn control(&mut self, request: u32, payload: Option<&mut [u8]>) -> Result<i32>;

    /// Seeks to `offset` and reads up to `buf.len()` bytes.
    ///
    /// A short read is not an error here.
    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize>;

    /// Seeks to `offset` and writes up to `data.len()` bytes.
    fn write_at(&mut self, offset: u32, data: &[u8]) -> Result<usize>;
}

impl<D: Driver + ?Sized> Driver for Box<D> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn control(&mut self, request: u32, payload: Option<&mut [u8]>) -> Result<i32> {
        (**self).control(request, payload)
    }

    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize> {
        (**self).read_at(offset, buf)
    }

    fn write_at(&mut self, offset: u32, data: &[u8]) -> Result<usize> {
        (**self).write_at(offset, data)
    }
}

/// Passes non-negative result codes through and maps negative ones to
/// [`PiControlError::IoctlFailed`].
pub fn check(command: Command, code: i32) -> Result<i32> {
    if code >= 0 {
        trace!(%command, code, "request succeeded");
        return Ok(code);
    }

    let message = describe(command, code);
    trace!(%command, code, %message, "request failed");
    Err(PiControlError::IoctlFailed {
        command,
        code,
        message,
    })
}

/// Human-readable text for a negative result code of `command`.
pub fn describe(command: Command, code: i32) -> String {
    match command {
        Command::Reset | Command::SetValue => driver_message(code).to_string(),
        _ => errno_message(code),
    }
}

/// Looks `code` up in [`DRIVER_MESSAGES`].
pub fn driver_message(code: i32) -> &'static str {
    usize::try_from(-i64::from(code) - 1)
        .ok()
        .and_then(|idx| DRIVER_MESSAGES.get(idx))
        .copied()
        .unwrap_or(UNKNOWN_DRIVER_MESSAGE)
}

/// Platform description of errno `-code`.
pub fn errno_message(code: i32) -> String {
    Errno::from_raw(code.saturating_neg()).desc().to_string()
}
