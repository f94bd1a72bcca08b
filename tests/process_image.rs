//! Variable access against the in-memory driver.

use proptest::prelude::*;

use picontrol::cli::{self, CliCommand};
use picontrol::transport::mock::MockDriver;
use picontrol::{DeviceInfo, PiControl, PiControlError, Value};

fn control_with(name: &str, address: u16, bit: u8, length: u16) -> PiControl<MockDriver> {
    let mut driver = MockDriver::new();
    driver.add_variable(name, address, bit, length);
    PiControl::with_driver(driver)
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn test_round_trip_every_supported_length() {
    let cases: [(u16, u32, Value); 4] = [
        (1, 1, Value::Bit(true)),
        (8, 0xa5, Value::U8(0xa5)),
        (16, 300, Value::U16(300)),
        (32, 0xdead_beef, Value::U32(0xdead_beef)),
    ];

    for (length, raw, expected) in cases {
        let mut pi = control_with("Var", 64, 3, length);
        let written = pi.write_variable("Var", raw).unwrap();
        assert_eq!(written.value, expected, "length {length}");

        let read = pi.read_variable("Var").unwrap();
        assert_eq!(read.value, expected, "length {length}");
        assert_eq!(read.variable.length, length);
    }
}

proptest! {
    #[test]
    fn u8_values_round_trip(value: u8) {
        let mut pi = control_with("Byte", 100, 0, 8);
        pi.write_variable("Byte", u32::from(value)).unwrap();
        prop_assert_eq!(pi.read_variable("Byte").unwrap().value, Value::U8(value));
    }

    #[test]
    fn u16_values_round_trip(value: u16) {
        let mut pi = control_with("Word", 100, 0, 16);
        pi.write_variable("Word", u32::from(value)).unwrap();
        prop_assert_eq!(pi.read_variable("Word").unwrap().value, Value::U16(value));
    }

    #[test]
    fn u32_values_round_trip(value: u32) {
        let mut pi = control_with("DWord", 100, 0, 32);
        pi.write_variable("DWord", value).unwrap();
        prop_assert_eq!(pi.read_variable("DWord").unwrap().value, Value::U32(value));
    }

    #[test]
    fn bits_land_on_normalized_position(address in 0u16..512, bit in 0u8..64, set: bool) {
        let mut pi = control_with("Flag", address, bit, 1);
        pi.write_variable("Flag", u32::from(set)).unwrap();

        let byte = usize::from(address) + usize::from(bit / 8);
        let mask = 1u8 << (bit % 8);
        prop_assert_eq!(pi.driver().image()[byte] & mask != 0, set);
        prop_assert_eq!(pi.read_variable("Flag").unwrap().value, Value::Bit(set));
    }
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_invalid_length_fails_before_io() {
    let mut pi = control_with("Odd", 10, 0, 12);

    let err = pi.read_variable("Odd").unwrap_err();
    assert!(matches!(
        err,
        PiControlError::InvalidVariableLength { length: 12, .. }
    ));

    let err = pi.write_variable("Odd", 1).unwrap_err();
    assert!(matches!(
        err,
        PiControlError::InvalidVariableLength { length: 12, .. }
    ));

    assert_eq!(pi.driver().image_reads(), 0);
    assert_eq!(pi.driver().image_writes(), 0);
}

#[test]
fn test_unknown_variable_is_not_found() {
    let mut pi = PiControl::with_driver(MockDriver::new());

    let err = pi.read_variable("DoesNotExist").unwrap_err();
    assert!(matches!(err, PiControlError::VariableNotFound(ref name) if name == "DoesNotExist"));
    assert_eq!(pi.driver().image_reads(), 0);
}

// =============================================================================
// Devices
// =============================================================================

#[test]
fn test_device_list_matches_reported_count() {
    let mut driver = MockDriver::new();
    for address in 0..10u8 {
        driver.add_device(DeviceInfo {
            address,
            module_type: 96,
            ..DeviceInfo::default()
        });
    }
    let mut pi = PiControl::with_driver(driver);

    assert_eq!(pi.device_list().unwrap().len(), 10);

    pi.driver_mut().set_reported_devices(Some(4));
    assert_eq!(pi.device_list().unwrap().len(), 4);

    pi.driver_mut().set_reported_devices(Some(1000));
    assert_eq!(pi.device_list().unwrap().len(), 255);
}

#[test]
fn test_device_listing_names_modules() {
    let mut driver = MockDriver::new();
    driver.add_device(DeviceInfo {
        address: 0,
        module_type: 95,
        active: true,
        ..DeviceInfo::default()
    });
    driver.add_device(DeviceInfo {
        address: 31,
        module_type: 12345,
        active: true,
        ..DeviceInfo::default()
    });
    let mut pi = PiControl::with_driver(driver);

    let mut out = Vec::new();
    cli::run(&mut pi, &CliCommand::List, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.starts_with("Found 2 devices:\n"));
    assert!(text.contains("module type: 95 (0x5f) RevPi Core V0.0\n"));
    assert!(text.contains("unknown moduletype"));
}
