//! In-memory piControl driver for testing.
//!
//! `MockDriver` answers control requests the way the kernel driver does,
//! decoding and encoding the same wire payloads, and keeps a 4096-byte
//! process image behind `read_at`/`write_at`.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::PathBuf;

use nix::errno::Errno;

use super::Driver;
use crate::abi::{
    BitValue, Command, CommandTable, DeviceInfo, ResetCounterRequest, VariableDescriptor,
    DEFAULT_DEVICE_PATH, EVENT_RESET, LAST_MESSAGE_LEN, MAX_DEVICES, PROCESS_IMAGE_LEN,
};
use crate::error::{PiControlError, Result};

fn errno(e: Errno) -> i32 {
    -(e as i32)
}

/// Mock piControl driver.
pub struct MockDriver {
    commands: CommandTable,
    open: bool,
    open_calls: usize,
    fail_on_open: bool,
    image: Vec<u8>,
    variables: HashMap<String, VariableDescriptor>,
    devices: Vec<DeviceInfo>,
    reported_devices: Option<i32>,
    last_message: Option<String>,
    events: VecDeque<i32>,
    failures: HashMap<Command, i32>,
    requests: Vec<Command>,
    image_reads: usize,
    image_writes: usize,
    firmware_targets: Vec<Option<u32>>,
    counter_resets: Vec<ResetCounterRequest>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self {
            commands: CommandTable::KUNBUS,
            open: false,
            open_calls: 0,
            fail_on_open: false,
            image: vec![0; PROCESS_IMAGE_LEN],
            variables: HashMap::new(),
            devices: Vec::new(),
            reported_devices: None,
            last_message: None,
            events: VecDeque::new(),
            failures: HashMap::new(),
            requests: Vec::new(),
            image_reads: 0,
            image_writes: 0,
            firmware_targets: Vec::new(),
            counter_resets: Vec::new(),
        }
    }
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a variable the driver will resolve.
    pub fn add_variable(&mut self, name: &str, address: u16, bit: u8, length: u16) {
        self.variables.insert(
            name.to_string(),
            VariableDescriptor {
                name: name.to_string(),
                address,
                bit,
                length,
            },
        );
    }

    pub fn add_device(&mut self, device: DeviceInfo) {
        self.devices.push(device);
    }

    /// Overrides the count returned by `GetDeviceInfoList`.
    pub fn set_reported_devices(&mut self, count: Option<i32>) {
        self.reported_devices = count;
    }

    pub fn set_last_message(&mut self, message: Option<&str>) {
        self.last_message = message.map(str::to_string);
    }

    pub fn push_event(&mut self, event: i32) {
        self.events.push_back(event);
    }

    /// Makes every later `command` request return `code`.
    pub fn set_fail_on(&mut self, command: Command, code: i32) {
        self.failures.insert(command, code);
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    pub fn set_fail_on_open(&mut self, fail: bool) {
        self.fail_on_open = fail;
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Writes straight into the image, bypassing the I/O counters.
    ///
    /// Bytes past the end of the image are dropped, as in `write_at`.
    /// Returns how many bytes landed.
    pub fn poke(&mut self, offset: usize, data: &[u8]) -> usize {
        let start = offset.min(self.image.len());
        let len = data.len().min(self.image.len() - start);
        self.image[start..start + len].copy_from_slice(&data[..len]);
        len
    }

    pub fn open_calls(&self) -> usize {
        self.open_calls
    }

    pub fn image_reads(&self) -> usize {
        self.image_reads
    }

    pub fn image_writes(&self) -> usize {
        self.image_writes
    }

    /// Control requests received so far, in order.
    pub fn requests(&self) -> &[Command] {
        &self.requests
    }

    /// `None` for an update-all request, otherwise the module address.
    pub fn firmware_targets(&self) -> &[Option<u32>] {
        &self.firmware_targets
    }

    pub fn counter_resets(&self) -> &[ResetCounterRequest] {
        &self.counter_resets
    }

    fn dispatch(&mut self, command: Command, payload: Option<&mut [u8]>) -> Result<i32> {
        match command {
            Command::Reset => {
                self.events.push_back(EVENT_RESET);
                Ok(0)
            }
            Command::GetDeviceInfoList => {
                let Some(buf) = payload else {
                    return Ok(errno(Errno::EFAULT));
                };
                let slots = (buf.len() / DeviceInfo::WIRE_SIZE).min(MAX_DEVICES);
                for (slot, device) in self.devices.iter().take(slots).enumerate() {
                    let start = slot * DeviceInfo::WIRE_SIZE;
                    buf[start..start + DeviceInfo::WIRE_SIZE].copy_from_slice(&device.encode());
                }
                let written = self.devices.len().min(slots) as i32;
                Ok(self.reported_devices.unwrap_or(written))
            }
            Command::GetDeviceInfo => {
                let Some(buf) = payload else {
                    return Ok(errno(Errno::EFAULT));
                };
                let request = DeviceInfo::decode(buf)?;
                match self.devices.iter().find(|d| d.address == request.address) {
                    Some(device) => {
                        buf[..DeviceInfo::WIRE_SIZE].copy_from_slice(&device.encode());
                        Ok(0)
                    }
                    None => Ok(errno(Errno::ENXIO)),
                }
            }
            Command::GetValue | Command::SetValue => {
                let Some(buf) = payload else {
                    return Ok(errno(Errno::EFAULT));
                };
                let mut value = BitValue::decode(buf)?;
                let Some(byte) = self.image.get_mut(usize::from(value.address)) else {
                    return Ok(errno(Errno::EFAULT));
                };
                if value.bit > 7 {
                    return Ok(errno(Errno::EINVAL));
                }
                let mask = 1u8 << value.bit;
                if command == Command::SetValue {
                    if value.value != 0 {
                        *byte |= mask;
                    } else {
                        *byte &= !mask;
                    }
                } else {
                    value.value = u8::from(*byte & mask != 0);
                    buf[..BitValue::WIRE_SIZE].copy_from_slice(&value.encode());
                }
                Ok(0)
            }
            Command::FindVariable => {
                let Some(buf) = payload else {
                    return Ok(errno(Errno::EFAULT));
                };
                let request = VariableDescriptor::decode(buf)?;
                match self.variables.get(&request.name) {
                    Some(found) => {
                        buf[..VariableDescriptor::WIRE_SIZE].copy_from_slice(&found.encode()?);
                        Ok(0)
                    }
                    None => Ok(errno(Errno::ENOENT)),
                }
            }
            Command::DioResetCounter => {
                let Some(buf) = payload else {
                    return Ok(errno(Errno::EFAULT));
                };
                self.counter_resets.push(ResetCounterRequest::decode(buf)?);
                Ok(0)
            }
            Command::UpdateFirmware => {
                let target = match payload {
                    Some(buf) if buf.len() >= 4 => {
                        Some(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
                    }
                    Some(_) => return Ok(errno(Errno::EFAULT)),
                    None => None,
                };
                self.firmware_targets.push(target);
                Ok(0)
            }
            Command::GetLastMessage => {
                let Some(buf) = payload else {
                    return Ok(errno(Errno::EFAULT));
                };
                buf.fill(0);
                if let Some(message) = &self.last_message {
                    let len = message.len().min(LAST_MESSAGE_LEN - 1).min(buf.len());
                    buf[..len].copy_from_slice(&message.as_bytes()[..len]);
                }
                Ok(0)
            }
            Command::WaitForEvent => {
                let Some(buf) = payload else {
                    return Ok(errno(Errno::EFAULT));
                };
                match self.events.pop_front() {
                    Some(event) if buf.len() >= 4 => {
                        buf[..4].copy_from_slice(&event.to_le_bytes());
                        Ok(0)
                    }
                    Some(_) => Ok(errno(Errno::EFAULT)),
                    // Nothing will ever wake this caller; report an interrupted wait
                    None => Ok(errno(Errno::EINTR)),
                }
            }
        }
    }
}

impl Driver for MockDriver {
    fn open(&mut self) -> Result<()> {
        if self.open {
            return Ok(());
        }
        if self.fail_on_open {
            return Err(PiControlError::DeviceOpenFailed {
                path: PathBuf::from(DEFAULT_DEVICE_PATH),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        self.open = true;
        self.open_calls += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn control(&mut self, request: u32, payload: Option<&mut [u8]>) -> Result<i32> {
        self.open()?;
        let Some(command) = self.commands.command(request) else {
            return Ok(errno(Errno::ENOTTY));
        };
        self.requests.push(command);
        if let Some(code) = self.failures.get(&command) {
            return Ok(*code);
        }
        self.dispatch(command, payload)
    }

    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize> {
        self.open()?;
        self.image_reads += 1;
        let start = (offset as usize).min(self.image.len());
        let len = buf.len().min(self.image.len() - start);
        buf[..len].copy_from_slice(&self.image[start..start + len]);
        Ok(len)
    }

    fn write_at(&mut self, offset: u32, data: &[u8]) -> Result<usize> {
        self.open()?;
        self.image_writes += 1;
        let start = (offset as usize).min(self.image.len());
        let len = data.len().min(self.image.len() - start);
        self.image[start..start + len].copy_from_slice(&data[..len]);
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_opens_lazily_once() {
        let mut driver = MockDriver::new();
        assert!(!driver.is_open());

        let mut buf = [0u8; 4];
        driver.read_at(0, &mut buf).unwrap();
        driver.read_at(4, &mut buf).unwrap();

        assert!(driver.is_open());
        assert_eq!(driver.open_calls(), 1);
    }

    #[test]
    fn test_mock_short_read_at_image_end() {
        let mut driver = MockDriver::new();
        let mut buf = [0u8; 8];
        let n = driver
            .read_at((PROCESS_IMAGE_LEN - 3) as u32, &mut buf)
            .unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn test_mock_poke_clamps_to_image() {
        let mut driver = MockDriver::new();
        assert_eq!(driver.poke(PROCESS_IMAGE_LEN - 2, &[1, 2, 3, 4]), 2);
        assert_eq!(&driver.image()[PROCESS_IMAGE_LEN - 2..], &[1, 2]);
        assert_eq!(driver.poke(PROCESS_IMAGE_LEN + 10, &[9]), 0);
        assert_eq!(driver.image_writes(), 0);
    }

    #[test]
    fn test_mock_unknown_request_is_enotty() {
        let mut driver = MockDriver::new();
        let code = driver.control(0x4b12, None).unwrap();
        assert_eq!(code, -(Errno::ENOTTY as i32));
    }

    #[test]
    fn test_mock_forced_failure() {
        let mut driver = MockDriver::new();
        driver.set_fail_on(Command::Reset, -1);
        let code = driver
            .control(CommandTable::KUNBUS.reset, None)
            .unwrap();
        assert_eq!(code, -1);
        assert_eq!(driver.requests(), &[Command::Reset]);
    }

    #[test]
    fn test_mock_fail_on_open() {
        let mut driver = MockDriver::new();
        driver.set_fail_on_open(true);
        let err = driver.open().unwrap_err();
        assert!(err.is_device_error());
        assert!(!driver.is_open());
    }

    #[test]
    fn test_mock_rejects_unnormalized_bit() {
        let mut driver = MockDriver::new();
        let mut payload = BitValue {
            address: 0,
            bit: 8,
            value: 1,
        }
        .encode();
        let code = driver
            .control(CommandTable::KUNBUS.set_value, Some(&mut payload))
            .unwrap();
        assert_eq!(code, -(Errno::EINVAL as i32));
    }
}
