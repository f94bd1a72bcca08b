//! The piControl character device.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr;

use nix::errno::Errno;
use nix::libc;
use tracing::{debug, trace};

use crate::abi::DEFAULT_DEVICE_PATH;
use crate::error::{PiControlError, Result};
use crate::transport::Driver;

/// Handle on the piControl device node.
///
/// The file is opened on first use and kept until [`Driver::close`] or drop.
#[derive(Debug)]
pub struct DeviceHandle {
    path: PathBuf,
    file: Option<File>,
}

impl DeviceHandle {
    /// Handle on `/dev/piControl0`.
    pub fn new() -> Self {
        Self::with_path(DEFAULT_DEVICE_PATH)
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> Result<&mut File> {
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open(&self.path)
                    .map_err(|source| PiControlError::DeviceOpenFailed {
                        path: self.path.clone(),
                        source,
                    })?;
                debug!(path = %self.path.display(), "opened piControl device");
                file
            }
        };
        Ok(self.file.insert(file))
    }
}

impl Default for DeviceHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for DeviceHandle {
    fn open(&mut self) -> Result<()> {
        self.file().map(|_| ())
    }

    fn close(&mut self) -> Result<()> {
        if self.file.take().is_some() {
            debug!(path = %self.path.display(), "closed piControl device");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn control(&mut self, request: u32, payload: Option<&mut [u8]>) -> Result<i32> {
        let fd = self.file()?.as_raw_fd();
        let arg = match payload {
            Some(buf) => {
                trace!(request, payload = %hex::encode(&*buf), "ioctl");
                buf.as_mut_ptr().cast::<libc::c_void>()
            }
            None => {
                trace!(request, "ioctl");
                ptr::null_mut()
            }
        };

        // SAFETY: `fd` is owned by `self.file`, which stays open across the
        // call. `arg` is null or points to a caller-owned buffer sized for
        // the request's payload.
        let rc = unsafe { libc::ioctl(fd, request as _, arg) };

        Ok(match Errno::result(rc) {
            Ok(code) => code,
            Err(errno) => -(errno as i32),
        })
    }

    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize> {
        let file = self.file()?;
        file.seek(SeekFrom::Start(u64::from(offset)))?;
        Ok(file.read(buf)?)
    }

    fn write_at(&mut self, offset: u32, data: &[u8]) -> Result<usize> {
        let file = self.file()?;
        file.seek(SeekFrom::Start(u64::from(offset)))?;
        Ok(file.write(data)?)
    }
}
