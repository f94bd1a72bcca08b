//! `DeviceHandle` against a regular file standing in for the device node.

use nix::errno::Errno;
use tempfile::NamedTempFile;

use picontrol::{DeviceHandle, Driver, PiControl, PiControlError};

fn image_file(len: usize) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    file.as_file().set_len(len as u64).unwrap();
    file
}

#[test]
fn test_opens_lazily_on_first_io() {
    let file = image_file(64);
    let mut handle = DeviceHandle::with_path(file.path());
    assert!(!handle.is_open());

    let mut buf = [0u8; 4];
    handle.read_at(0, &mut buf).unwrap();
    assert!(handle.is_open());
}

#[test]
fn test_open_is_idempotent_and_close_is_repeatable() {
    let file = image_file(64);
    let mut handle = DeviceHandle::with_path(file.path());

    handle.open().unwrap();
    handle.open().unwrap();
    assert!(handle.is_open());

    handle.close().unwrap();
    handle.close().unwrap();
    assert!(!handle.is_open());
}

#[test]
fn test_seek_then_read_and_write() {
    let file = image_file(64);
    let mut pi = PiControl::with_path(file.path());

    assert_eq!(pi.write(10, &[0x2C, 0x01]).unwrap(), 2);
    assert_eq!(pi.read(10, 2).unwrap(), vec![0x2C, 0x01]);
    assert_eq!(pi.read(9, 1).unwrap(), vec![0]);

    let on_disk = std::fs::read(file.path()).unwrap();
    assert_eq!(&on_disk[10..12], &[0x2C, 0x01]);
}

#[test]
fn test_short_read_at_end_of_image() {
    let file = image_file(16);
    let mut pi = PiControl::with_path(file.path());

    assert_eq!(pi.read(12, 8).unwrap().len(), 4);
    assert!(matches!(
        pi.read_exact(12, 8),
        Err(PiControlError::PartialTransfer {
            offset: 12,
            expected: 8,
            actual: 4
        })
    ));
}

#[test]
fn test_reopens_after_close() {
    let file = image_file(16);
    let mut pi = PiControl::with_path(file.path());

    pi.write(0, &[7]).unwrap();
    pi.close().unwrap();
    assert_eq!(pi.read(0, 1).unwrap(), vec![7]);
    assert!(pi.is_open());
}

#[test]
fn test_missing_device_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("piControl0");
    let mut pi = PiControl::with_path(&path);

    let err = pi.read(0, 1).unwrap_err();
    match err {
        PiControlError::DeviceOpenFailed { path: failed, source } => {
            assert_eq!(failed, path);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_ioctl_on_regular_file_is_reported() {
    let file = image_file(16);
    let mut pi = PiControl::with_path(file.path());

    let err = pi.device_list().unwrap_err();
    assert_eq!(err.code(), Some(-(Errno::ENOTTY as i32)));
    assert!(err.to_string().ends_with(Errno::ENOTTY.desc()));
}
