use super::*;
use crate::error::PiControlError;

fn sample_device() -> DeviceInfo {
    DeviceInfo {
        address: 31,
        serial_number: 0x0102_0304,
        module_type: 96,
        hw_revision: 2,
        sw_major: 1,
        sw_minor: 4,
        svn_revision: 0x0a0b_0c0d,
        input_length: 70,
        output_length: 18,
        config_length: 44,
        base_offset: 113,
        input_offset: 113,
        output_offset: 183,
        config_offset: 201,
        first_entry: 12,
        entries: 40,
        module_state: 3,
        active: true,
        reserved: [0; DeviceInfo::RESERVED_LEN],
    }
}

// =============================================================================
// Command table
// =============================================================================

#[test]
fn test_kunbus_codes() {
    let table = CommandTable::KUNBUS;
    assert_eq!(table.code(Command::Reset), 0x4b0c);
    assert_eq!(table.code(Command::GetDeviceInfoList), 0x4b0d);
    assert_eq!(table.code(Command::GetDeviceInfo), 0x4b0e);
    assert_eq!(table.code(Command::GetValue), 0x4b0f);
    assert_eq!(table.code(Command::SetValue), 0x4b10);
    assert_eq!(table.code(Command::FindVariable), 0x4b11);
    assert_eq!(table.code(Command::UpdateFirmware), 0x4b13);
    assert_eq!(table.code(Command::DioResetCounter), 0x4b14);
    assert_eq!(table.code(Command::GetLastMessage), 0x4b15);
    assert_eq!(table.code(Command::WaitForEvent), 0x4b32);
}

#[test]
fn test_reverse_lookup_covers_every_command() {
    let table = CommandTable::default();
    for command in Command::ALL {
        assert_eq!(table.command(table.code(command)), Some(command));
    }
    assert_eq!(table.command(0x4b12), None);
}

// =============================================================================
// DeviceInfo
// =============================================================================

#[test]
fn test_device_info_field_offsets() {
    let bytes = sample_device().encode();

    assert_eq!(bytes[0], 31);
    assert_eq!(&bytes[1..4], &[0, 0, 0], "padding after addr");
    assert_eq!(&bytes[4..8], &[0x04, 0x03, 0x02, 0x01]);
    assert_eq!(&bytes[8..10], &96u16.to_le_bytes());
    assert_eq!(&bytes[14..16], &4u16.to_le_bytes(), "sw_minor");
    assert_eq!(&bytes[16..20], &[0x0d, 0x0c, 0x0b, 0x0a], "svn_revision");
    assert_eq!(&bytes[20..22], &70u16.to_le_bytes(), "input_length");
    assert_eq!(&bytes[28..30], &113u16.to_le_bytes(), "input_offset");
    assert_eq!(&bytes[30..32], &183u16.to_le_bytes(), "output_offset");
    assert_eq!(&bytes[34..36], &12u16.to_le_bytes(), "first_entry");
    assert_eq!(&bytes[36..38], &40u16.to_le_bytes(), "entries");
    assert_eq!(bytes[38], 3, "module_state");
    assert_eq!(bytes[39], 1, "active");
    assert_eq!(&bytes[70..72], &[0, 0], "trailing padding");
}

#[test]
fn test_device_info_decode_reads_driver_bytes() {
    let mut raw = [0u8; DeviceInfo::WIRE_SIZE];
    raw[0] = 0;
    raw[1..4].copy_from_slice(&[0xaa, 0xbb, 0xcc]); // pad is ignored
    raw[8..10].copy_from_slice(&95u16.to_le_bytes());
    raw[28..30].copy_from_slice(&0u16.to_le_bytes());
    raw[20..22].copy_from_slice(&6u16.to_le_bytes());
    raw[39] = 1;
    raw[40] = 0x7f;

    let info = DeviceInfo::decode(&raw).unwrap();
    assert_eq!(info.address, 0);
    assert_eq!(info.module_type, 95);
    assert_eq!(info.input_length, 6);
    assert!(info.active);
    assert_eq!(info.reserved[0], 0x7f);
}

#[test]
fn test_device_info_decode_short_buffer() {
    let err = DeviceInfo::decode(&[0u8; 40]).unwrap_err();
    assert!(matches!(
        err,
        PiControlError::MalformedPayload {
            what: "DeviceInfo",
            expected: 72,
            actual: 40
        }
    ));
}

#[test]
fn test_device_info_request_only_sets_address() {
    let bytes = DeviceInfo::request(32).encode();
    assert_eq!(bytes[0], 32);
    assert!(bytes[1..].iter().all(|b| *b == 0));
}

// =============================================================================
// VariableDescriptor
// =============================================================================

#[test]
fn test_variable_descriptor_layout() {
    let descriptor = VariableDescriptor {
        name: "RevPiLED".to_string(),
        address: 0x0106,
        bit: 5,
        length: 1,
    };
    let bytes = descriptor.encode().unwrap();

    assert_eq!(&bytes[..8], b"RevPiLED");
    assert!(bytes[8..32].iter().all(|b| *b == 0), "name is zero padded");
    assert_eq!(&bytes[32..34], &[0x06, 0x01]);
    assert_eq!(bytes[34], 5);
    assert_eq!(bytes[35], 0, "padding before length");
    assert_eq!(&bytes[36..38], &[1, 0]);
}

#[test]
fn test_variable_descriptor_decode_stops_at_nul() {
    let mut raw = [0u8; VariableDescriptor::WIRE_SIZE];
    raw[..4].copy_from_slice(b"I_12");
    raw[5] = b'x'; // garbage after the terminator
    raw[32..34].copy_from_slice(&520u16.to_le_bytes());
    raw[36..38].copy_from_slice(&16u16.to_le_bytes());

    let descriptor = VariableDescriptor::decode(&raw).unwrap();
    assert_eq!(descriptor.name, "I_12");
    assert_eq!(descriptor.address, 520);
    assert_eq!(descriptor.bit, 0);
    assert_eq!(descriptor.length, 16);
}

#[test]
fn test_name_of_31_bytes_fits() {
    let name = "A".repeat(MAX_NAME_LEN);
    let bytes = VariableDescriptor::request(&name).unwrap().encode().unwrap();
    assert_eq!(bytes[30], b'A');
    assert_eq!(bytes[31], 0, "terminator survives");
}

#[test]
fn test_name_of_32_bytes_is_rejected() {
    let name = "A".repeat(NAME_BUFFER_LEN);
    let err = VariableDescriptor::request(&name).unwrap_err();
    assert!(matches!(err, PiControlError::InvalidVariableName { .. }));
}

#[test]
fn test_empty_and_unprintable_names_are_rejected() {
    for name in ["", "with space", "tab\there", "Ünicode"] {
        assert!(
            validate_name(name).is_err(),
            "{:?} should be rejected",
            name
        );
    }
}

// =============================================================================
// Small payloads
// =============================================================================

#[test]
fn test_bit_value_layout() {
    let value = BitValue {
        address: 0x0203,
        bit: 7,
        value: 1,
    };
    assert_eq!(value.encode(), [0x03, 0x02, 7, 1]);
    assert_eq!(BitValue::decode(&[0x03, 0x02, 7, 1]).unwrap(), value);
}

#[test]
fn test_reset_counter_layout() {
    let request = ResetCounterRequest {
        address: 40,
        bitfield: 0x8001,
    };
    assert_eq!(request.encode(), [40, 0, 0x01, 0x80]);
    assert_eq!(
        ResetCounterRequest::decode(&[40, 0xff, 0x01, 0x80]).unwrap(),
        request
    );
}
