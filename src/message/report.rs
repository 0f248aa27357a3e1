use crate::error::DecodeError;
use crate::washer_state::{DeviceState, DeviceSubState, WasherState};

/// The minimum reassembled message length covering every decoded offset.
pub const MIN_REPORT_LEN: usize = 51;

/// Sentinel in the delay byte meaning "no start delay configured",
/// distinct from a literal zero-hour delay.
const NO_DELAY_SENTINEL: u8 = 128;

/// Sentinel in the declamped spin byte meaning rinse-hold is active
/// rather than a literal spin speed.
const RINSE_HOLD_SENTINEL: u8 = 17;

/// Strip the high-bit protocol flag from a byte, recovering its magnitude.
fn declamp(value: u8) -> u8 {
    if value < 128 {
        value
    } else {
        value - 128
    }
}

/// Decode one complete status report into a [`WasherState`].
///
/// The report layout is fixed-offset:
///
/// Offset | Meaning
/// 35     | device state code
/// 37     | temperature (high bit is a flag, declamped)
/// 38     | spin speed / 100, or 17 for rinse-hold (high bit declamped)
/// 44, 45 | program duration as hours, minutes
/// 46, 47 | remaining time as hours, minutes
/// 48, 49 | start delay as hours, minutes; 128 in the hours byte means none
/// 50     | device sub-state code
///
/// Pure and deterministic; a message shorter than [`MIN_REPORT_LEN`] is a
/// [`DecodeError::Truncated`] rather than an out-of-bounds access.
pub fn parse_report(message: &[u8]) -> Result<WasherState, DecodeError> {
    if message.len() < MIN_REPORT_LEN {
        return Err(DecodeError::Truncated {
            len: message.len(),
            needed: MIN_REPORT_LEN,
        });
    }

    let delay_minutes = if message[48] == NO_DELAY_SENTINEL {
        None
    } else {
        Some(u16::from(message[48]) * 60 + u16::from(message[49]))
    };

    Ok(WasherState {
        device_state: DeviceState::from_byte(message[35]),
        device_sub_state: DeviceSubState::from_byte(message[50]),
        temperature: declamp(message[37]),
        spin: u16::from(declamp(message[38])) * 100,
        rinse_hold: declamp(message[38]) == RINSE_HOLD_SENTINEL,
        duration_minutes: u16::from(message[44]) * 60 + u16::from(message[45]),
        remaining_minutes: u16::from(message[46]) * 60 + u16::from(message[47]),
        delay_minutes,
    })
}

#[cfg(test)]
pub(crate) fn report_fixture() -> Vec<u8> {
    let mut message = vec![0u8; MIN_REPORT_LEN];
    message[35] = 30; // running
    message[37] = 20;
    message[38] = 17;
    message[44] = 1;
    message[45] = 30;
    message[46] = 0;
    message[47] = 45;
    message[48] = 128;
    message[50] = 5; // rinsing
    message
}

#[test]
fn test_declamp() {
    for value in 0u8..128 {
        assert_eq!(declamp(value), value);
    }
    for value in 128u8..=255 {
        assert_eq!(declamp(value), value - 128);
    }
}

#[test]
fn test_parse_report_happy() {
    let state = parse_report(&report_fixture()).unwrap();
    assert_eq!(state.device_state, DeviceState::Running);
    assert_eq!(state.device_sub_state, DeviceSubState::Rinsing);
    assert_eq!(state.temperature, 20);
    assert!(state.rinse_hold);
    assert_eq!(state.duration_minutes, 90);
    assert_eq!(state.remaining_minutes, 45);
    assert_eq!(state.delay_minutes, None);
}

#[test]
fn test_parse_report_declamps_flagged_bytes() {
    let mut message = report_fixture();
    message[37] = 40 + 128;
    message[38] = 12 + 128;
    let state = parse_report(&message).unwrap();
    assert_eq!(state.temperature, 40);
    assert_eq!(state.spin, 1200);
    assert!(!state.rinse_hold);
}

#[test]
fn test_parse_report_zero_delay_is_not_absent() {
    let mut message = report_fixture();
    message[48] = 0;
    message[49] = 0;
    let state = parse_report(&message).unwrap();
    assert_eq!(state.delay_minutes, Some(0));

    message[48] = 2;
    message[49] = 15;
    let state = parse_report(&message).unwrap();
    assert_eq!(state.delay_minutes, Some(135));
}

#[test]
fn test_parse_report_unknown_codes() {
    let mut message = report_fixture();
    message[35] = 255;
    message[50] = 99;
    let state = parse_report(&message).unwrap();
    assert_eq!(state.device_state, DeviceState::Unknown);
    assert_eq!(state.device_sub_state, DeviceSubState::Unknown);
}

#[test]
fn test_parse_report_truncated() {
    let message = vec![0u8; MIN_REPORT_LEN - 1];
    assert_eq!(
        parse_report(&message),
        Err(DecodeError::Truncated { len: 50, needed: MIN_REPORT_LEN })
    );
    assert!(parse_report(&[]).is_err());
}
