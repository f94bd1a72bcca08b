//! picontrol - RevPi piControl process-image access
//!
//! Talks to the piControl kernel driver of a Revolution Pi through its
//! character device: seek+read/write of the process image, and ioctl
//! requests for bit access, variable lookup, module enumeration, reset,
//! event waiting and firmware updates.
//!
//! ```no_run
//! use picontrol::PiControl;
//!
//! let mut pi = PiControl::new();
//! let reading = pi.read_variable("RevPiLED")?;
//! println!("{} = {}", reading.variable.name, reading.value);
//! # Ok::<(), picontrol::PiControlError>(())
//! ```

pub mod abi;
pub mod address;
pub mod cli;
pub mod codec;
pub mod config;
pub mod control;
pub mod device;
pub mod error;
#[cfg(feature = "events")]
pub mod events;
pub mod modules;
pub mod transport;
pub mod utils;

pub use abi::{Command, CommandTable, DeviceInfo, VariableDescriptor};
pub use address::{normalize, BitAddress};
pub use codec::{Value, Width};
pub use control::{DriverEvent, FirmwareUpdate, PiControl, VariableReading};
pub use device::DeviceHandle;
pub use error::{PiControlError, Result};
#[cfg(feature = "events")]
pub use events::EventWatcher;
pub use modules::module_name;
pub use transport::Driver;
