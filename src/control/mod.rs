//! piControl client.
//!
//! [`PiControl`] issues every driver request through a [`Driver`] and turns
//! result codes into [`PiControlError`]s. It owns the [`CommandTable`], so
//! nothing here depends on process-wide state.
//!
//! All operations block. Nothing is retried.

mod variables;

pub use variables::VariableReading;

use tracing::{debug, trace, warn};

use crate::abi::{
    BitValue, Command, CommandTable, DeviceInfo, ResetCounterRequest, VariableDescriptor,
    EVENT_RESET, LAST_MESSAGE_LEN, MAX_DEVICES,
};
use crate::address::BitAddress;
use crate::config::Config;
use crate::device::DeviceHandle;
use crate::error::{PiControlError, Result};
use crate::transport::{self, Driver};

/// Event reported by `WaitForEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    /// The driver was reset, typically after a configuration reload.
    Reset,
    Other(i32),
}

impl DriverEvent {
    pub fn from_code(code: i32) -> Self {
        match code {
            EVENT_RESET => DriverEvent::Reset,
            other => DriverEvent::Other(other),
        }
    }
}

/// Outcome of a successful firmware update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareUpdate {
    /// Non-negative result code of the request.
    pub result: i32,
    /// Driver's last message, if it left one.
    pub message: Option<String>,
}

/// Client for the piControl driver.
pub struct PiControl<D: Driver = DeviceHandle> {
    driver: D,
    commands: CommandTable,
}

impl PiControl<DeviceHandle> {
    /// Client for `/dev/piControl0`. The device is opened on first use.
    pub fn new() -> Self {
        Self::with_driver(DeviceHandle::new())
    }

    pub fn with_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::with_driver(DeviceHandle::with_path(path))
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_path(config.device.path.clone())
    }
}

impl Default for PiControl<DeviceHandle> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Driver> PiControl<D> {
    pub fn with_driver(driver: D) -> Self {
        Self::with_commands(driver, CommandTable::KUNBUS)
    }

    pub fn with_commands(driver: D, commands: CommandTable) -> Self {
        Self { driver, commands }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Opens the device now instead of on first use.
    pub fn open(&mut self) -> Result<()> {
        self.driver.open()
    }

    pub fn close(&mut self) -> Result<()> {
        self.driver.close()
    }

    pub fn is_open(&self) -> bool {
        self.driver.is_open()
    }

    fn request(&mut self, command: Command, payload: Option<&mut [u8]>) -> Result<i32> {
        let code = self.driver.control(self.commands.code(command), payload)?;
        transport::check(command, code)
    }

    /// Reinitializes the driver.
    pub fn reset(&mut self) -> Result<()> {
        self.request(Command::Reset, None)?;
        debug!("driver reset");
        Ok(())
    }

    // =========================================================================
    // Process image
    // =========================================================================

    /// Reads up to `len` bytes at `offset`. The result is shorter on a short
    /// read.
    pub fn read(&mut self, offset: u32, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let n = self.driver.read_at(offset, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Writes `data` at `offset` and returns the number of bytes written.
    pub fn write(&mut self, offset: u32, data: &[u8]) -> Result<usize> {
        self.driver.write_at(offset, data)
    }

    /// Like [`read`](Self::read), but a short read is a
    /// [`PiControlError::PartialTransfer`].
    pub fn read_exact(&mut self, offset: u32, len: usize) -> Result<Vec<u8>> {
        let buf = self.read(offset, len)?;
        if buf.len() != len {
            return Err(PiControlError::PartialTransfer {
                offset,
                expected: len,
                actual: buf.len(),
            });
        }
        Ok(buf)
    }

    pub fn write_all(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let n = self.write(offset, data)?;
        if n != data.len() {
            return Err(PiControlError::PartialTransfer {
                offset,
                expected: data.len(),
                actual: n,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Devices
    // =========================================================================

    /// Describes the module at bus `address`.
    pub fn device_info(&mut self, address: u8) -> Result<DeviceInfo> {
        let mut payload = DeviceInfo::request(address).encode();
        self.request(Command::GetDeviceInfo, Some(&mut payload))?;
        DeviceInfo::decode(&payload)
    }

    /// Lists every module known to the driver, at most [`MAX_DEVICES`].
    pub fn device_list(&mut self) -> Result<Vec<DeviceInfo>> {
        let mut payload = vec![0u8; MAX_DEVICES * DeviceInfo::WIRE_SIZE];
        let reported = self.request(Command::GetDeviceInfoList, Some(&mut payload))?;

        let mut count = usize::try_from(reported).unwrap_or_default();
        if count > MAX_DEVICES {
            warn!(
                reported,
                max = MAX_DEVICES,
                "driver reported more devices than slots, truncating"
            );
            count = MAX_DEVICES;
        }

        payload
            .chunks_exact(DeviceInfo::WIRE_SIZE)
            .take(count)
            .map(DeviceInfo::decode)
            .collect()
    }

    // =========================================================================
    // Bits
    // =========================================================================

    /// Reads one bit. `bit` may exceed 7; it is normalized first, and an
    /// address pushed past `u16::MAX` is [`PiControlError::AddressOverflow`].
    pub fn get_bit(&mut self, address: u16, bit: u8) -> Result<bool> {
        let target = BitAddress::new(address, bit)?;
        let mut payload = BitValue {
            address: target.address(),
            bit: target.bit(),
            value: 0,
        }
        .encode();
        self.request(Command::GetValue, Some(&mut payload))?;
        Ok(BitValue::decode(&payload)?.value != 0)
    }

    /// Writes one bit. `bit` may exceed 7; it is normalized first, and an
    /// address pushed past `u16::MAX` is [`PiControlError::AddressOverflow`].
    pub fn set_bit(&mut self, address: u16, bit: u8, value: bool) -> Result<()> {
        let target = BitAddress::new(address, bit)?;
        let mut payload = BitValue {
            address: target.address(),
            bit: target.bit(),
            value: u8::from(value),
        }
        .encode();
        self.request(Command::SetValue, Some(&mut payload))?;
        Ok(())
    }

    // =========================================================================
    // Variables
    // =========================================================================

    /// Resolves `name` to its location in the process image.
    ///
    /// Names are validated before anything is sent. A negative result or a
    /// zero length from the driver is [`PiControlError::VariableNotFound`].
    pub fn variable_info(&mut self, name: &str) -> Result<VariableDescriptor> {
        let mut payload = VariableDescriptor::request(name)?.encode()?;
        let code = self
            .driver
            .control(self.commands.code(Command::FindVariable), Some(&mut payload))?;
        if code < 0 {
            debug!(variable = name, code, "variable lookup failed");
            return Err(PiControlError::VariableNotFound(name.to_string()));
        }

        let descriptor = VariableDescriptor::decode(&payload)?;
        if descriptor.length == 0 {
            return Err(PiControlError::VariableNotFound(name.to_string()));
        }
        debug!(
            variable = name,
            address = descriptor.address,
            bit = descriptor.bit,
            length = descriptor.length,
            "resolved variable"
        );
        Ok(descriptor)
    }

    /// Returns whether the driver knows `name`.
    pub fn find_variable(&mut self, name: &str) -> Result<bool> {
        match self.variable_info(name) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Byte offset of `name` in the process image.
    pub fn variable_offset(&mut self, name: &str) -> Result<u16> {
        Ok(self.variable_info(name)?.address)
    }

    // =========================================================================
    // Module services
    // =========================================================================

    /// Resets the DIO counters selected by `bitfield` on the module at
    /// `address`.
    pub fn reset_counter(&mut self, address: u8, bitfield: u16) -> Result<i32> {
        let mut payload = ResetCounterRequest { address, bitfield }.encode();
        self.request(Command::DioResetCounter, Some(&mut payload))
    }

    /// Blocks until the driver signals an event.
    ///
    /// There is no timeout; see [`crate::events`] for running the wait on a
    /// blocking task.
    pub fn wait_for_event(&mut self) -> Result<DriverEvent> {
        let mut payload = [0u8; 4];
        self.request(Command::WaitForEvent, Some(&mut payload))?;
        Ok(DriverEvent::from_code(i32::from_le_bytes(payload)))
    }

    /// Text the driver left after its last firmware operation.
    pub fn last_message(&mut self) -> Result<Option<String>> {
        let mut payload = [0u8; LAST_MESSAGE_LEN];
        self.request(Command::GetLastMessage, Some(&mut payload))?;

        let end = payload
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(LAST_MESSAGE_LEN);
        if end == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&payload[..end]).into_owned()))
    }

    /// Updates module firmware. Address 0 updates every eligible module.
    ///
    /// The last message is read afterwards whatever the outcome and returned
    /// with the result, or as the diagnostic of the error.
    pub fn update_firmware(&mut self, address: u32) -> Result<FirmwareUpdate> {
        let request = self.commands.code(Command::UpdateFirmware);
        let code = if address == 0 {
            self.driver.control(request, None)?
        } else {
            let mut payload = address.to_le_bytes();
            self.driver.control(request, Some(&mut payload))?
        };
        if code < 0 {
            trace!(command = %Command::UpdateFirmware, address, code, "request failed");
        } else {
            trace!(command = %Command::UpdateFirmware, address, code, "request succeeded");
        }

        let message = match self.last_message() {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "cannot read last message after firmware update");
                None
            }
        };

        if code < 0 {
            if let Some(diagnostic) = &message {
                warn!(address, code, %diagnostic, "firmware update failed");
            }
            return Err(PiControlError::FirmwareUpdateFailed {
                code,
                message: transport::describe(Command::UpdateFirmware, code),
                diagnostic: message,
            });
        }

        Ok(FirmwareUpdate {
            result: code,
            message,
        })
    }
}
