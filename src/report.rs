//! Device-to-host report protocol.
//!
//! Every frame is 64 bytes:
//! ```text
//! [0]      report id, constant 0x01
//! [1]      event type: 0x00 MacroKey, 0x01 EncoderRotate, 0x02 Status
//! [2]      type-specific byte 0
//! [3]      type-specific byte 1
//! [4]      (Status only) volume; zero otherwise
//! [5]      (Status only) mic_level; zero otherwise
//! [6..63]  reserved, zero-filled
//! ```
//!
//! Payloads:
//! - MacroKey: `[key_index, press_flag]`
//! - EncoderRotate: `[encoder_id, direction]`, direction `0x01` CW / `0xFF` CCW
//! - Status: `[current_profile, mic_muted, volume, mic_level]`

use crate::config::{
    NUM_ENCODERS, NUM_MACRO_KEYS, PERCENT_MAX, PROFILE_MAX, PROFILE_MIN, REPORT_ID, REPORT_SIZE,
};
use crate::input::Direction;
use crate::state::DeviceState;

/// A complete frame as handed to the host link.
pub type ReportFrame = [u8; REPORT_SIZE];

/// Event type byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ReportKind {
    MacroKey = 0x00,
    EncoderRotate = 0x01,
    Status = 0x02,
}

impl ReportKind {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0x00 => Some(ReportKind::MacroKey),
            0x01 => Some(ReportKind::EncoderRotate),
            0x02 => Some(ReportKind::Status),
            _ => None,
        }
    }
}

/// One outbound event. Ephemeral: built per event, encoded, handed off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutboundReport {
    MacroKey {
        index: u8,
        pressed: bool,
    },
    EncoderRotate {
        encoder: u8,
        direction: Direction,
    },
    Status {
        profile: u8,
        mic_muted: bool,
        volume: u8,
        mic_level: u8,
    },
}

impl OutboundReport {
    /// Status snapshot of the (already mutated) device state.
    pub fn status(state: &DeviceState) -> Self {
        OutboundReport::Status {
            profile: state.current_profile(),
            mic_muted: state.mic_muted(),
            volume: state.volume(),
            mic_level: state.mic_level(),
        }
    }

    pub const fn kind(&self) -> ReportKind {
        match self {
            OutboundReport::MacroKey { .. } => ReportKind::MacroKey,
            OutboundReport::EncoderRotate { .. } => ReportKind::EncoderRotate,
            OutboundReport::Status { .. } => ReportKind::Status,
        }
    }

    /// Encode into a fresh 64-byte frame.
    ///
    /// # Panics
    ///
    /// On out-of-range indices or values. The router validates everything
    /// upstream, so reaching this is a programming error.
    pub fn encode(&self) -> ReportFrame {
        let mut frame = [0u8; REPORT_SIZE];
        frame[0] = REPORT_ID;
        frame[1] = self.kind() as u8;

        match *self {
            OutboundReport::MacroKey { index, pressed } => {
                assert!((index as usize) < NUM_MACRO_KEYS, "key index out of range");
                frame[2] = index;
                frame[3] = pressed as u8;
            }
            OutboundReport::EncoderRotate { encoder, direction } => {
                assert!((encoder as usize) < NUM_ENCODERS, "encoder id out of range");
                frame[2] = encoder;
                frame[3] = direction.delta() as u8;
            }
            OutboundReport::Status {
                profile,
                mic_muted,
                volume,
                mic_level,
            } => {
                assert!(
                    (PROFILE_MIN..=PROFILE_MAX).contains(&profile),
                    "profile out of range"
                );
                assert!(
                    volume <= PERCENT_MAX && mic_level <= PERCENT_MAX,
                    "percent out of range"
                );
                frame[2] = profile;
                frame[3] = mic_muted as u8;
                frame[4] = volume;
                frame[5] = mic_level;
            }
        }

        frame
    }

    /// Serialise into a byte slice for USB HID transmission.
    /// Returns the number of bytes written (64), or 0 if `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < REPORT_SIZE {
            return 0;
        }
        buf[..REPORT_SIZE].copy_from_slice(&self.encode());
        REPORT_SIZE
    }

    /// Parse a frame back into a report (host side / simulator).
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < REPORT_SIZE || data[0] != REPORT_ID {
            return None;
        }
        match ReportKind::from_u8(data[1])? {
            ReportKind::MacroKey => {
                if data[2] as usize >= NUM_MACRO_KEYS || data[3] > 1 {
                    return None;
                }
                Some(OutboundReport::MacroKey {
                    index: data[2],
                    pressed: data[3] == 1,
                })
            }
            ReportKind::EncoderRotate => {
                if data[2] as usize >= NUM_ENCODERS {
                    return None;
                }
                let direction = match data[3] {
                    0x01 => Direction::Cw,
                    0xFF => Direction::Ccw,
                    _ => return None,
                };
                Some(OutboundReport::EncoderRotate {
                    encoder: data[2],
                    direction,
                })
            }
            ReportKind::Status => Some(OutboundReport::Status {
                profile: data[2],
                mic_muted: data[3] != 0,
                volume: data[4],
                mic_level: data[5],
            }),
        }
    }
}

/// USB HID Report Descriptor for the vendor-defined 64-byte frame.
///
/// Report ID 0x01 is byte 0 of the frame, followed by 63 opaque bytes.
pub const REPORT_DESCRIPTOR: &[u8] = &[
    0x06, 0x00, 0xFF, // Usage Page (Vendor Defined 0xFF00)
    0x09, 0x01, // Usage (Vendor Usage 1)
    0xA1, 0x01, // Collection (Application)
    0x85, REPORT_ID, //   Report ID (1)
    0x09, 0x02, //   Usage (Vendor Usage 2)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x3F, //   Report Count (63)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0xC0, // End Collection
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_key_9_press_frame() {
        let frame = OutboundReport::MacroKey {
            index: 9,
            pressed: true,
        }
        .encode();
        let mut expected = [0u8; REPORT_SIZE];
        expected[0] = 0x01;
        expected[1] = 0x00;
        expected[2] = 0x09;
        expected[3] = 0x01;
        assert_eq!(frame, expected);
    }

    #[test]
    fn macro_key_release_clears_press_flag() {
        let frame = OutboundReport::MacroKey {
            index: 3,
            pressed: false,
        }
        .encode();
        assert_eq!(&frame[..4], &[0x01, 0x00, 0x03, 0x00]);
        assert!(frame[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn encoder_rotate_frame() {
        let cw = OutboundReport::EncoderRotate {
            encoder: 1,
            direction: Direction::Cw,
        }
        .encode();
        assert_eq!(&cw[..4], &[0x01, 0x01, 0x01, 0x01]);

        let ccw = OutboundReport::EncoderRotate {
            encoder: 0,
            direction: Direction::Ccw,
        }
        .encode();
        assert_eq!(&ccw[..4], &[0x01, 0x01, 0x00, 0xFF]);
        assert!(ccw[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn status_frame_uses_bytes_two_to_five() {
        let frame = OutboundReport::Status {
            profile: 3,
            mic_muted: true,
            volume: 70,
            mic_level: 45,
        }
        .encode();
        assert_eq!(&frame[..6], &[0x01, 0x02, 3, 1, 70, 45]);
        assert!(frame[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn status_reflects_device_state() {
        let state = DeviceState::default();
        assert_eq!(
            OutboundReport::status(&state),
            OutboundReport::Status {
                profile: 1,
                mic_muted: false,
                volume: 70,
                mic_level: 45,
            }
        );
    }

    #[test]
    #[should_panic(expected = "key index out of range")]
    fn out_of_range_key_fails_fast() {
        OutboundReport::MacroKey {
            index: 10,
            pressed: true,
        }
        .encode();
    }

    #[test]
    fn serialize_buffer_too_small() {
        let report = OutboundReport::MacroKey {
            index: 0,
            pressed: true,
        };
        let mut buf = [0u8; 8];
        assert_eq!(report.serialize(&mut buf), 0);

        let mut buf = [0u8; 64];
        assert_eq!(report.serialize(&mut buf), 64);
        assert_eq!(buf[0], REPORT_ID);
    }

    #[test]
    fn decode_rejects_foreign_frames() {
        let mut frame = [0u8; REPORT_SIZE];
        assert!(OutboundReport::decode(&frame).is_none()); // wrong id
        frame[0] = REPORT_ID;
        frame[1] = 0x07;
        assert!(OutboundReport::decode(&frame).is_none()); // unknown type
        frame[1] = 0x01;
        frame[3] = 0x02;
        assert!(OutboundReport::decode(&frame).is_none()); // bad direction
        assert!(OutboundReport::decode(&frame[..10]).is_none()); // short
    }

    #[test]
    fn decode_reads_back_encoded_status() {
        let report = OutboundReport::Status {
            profile: 8,
            mic_muted: false,
            volume: 100,
            mic_level: 0,
        };
        assert_eq!(OutboundReport::decode(&report.encode()), Some(report));
    }

    #[test]
    fn descriptor_declares_63_data_bytes() {
        assert_eq!(REPORT_DESCRIPTOR[7], 0x85);
        assert_eq!(REPORT_DESCRIPTOR[8], REPORT_ID);
        assert_eq!(REPORT_DESCRIPTOR[19], 0x3F);
        assert_eq!(*REPORT_DESCRIPTOR.last().unwrap(), 0xC0);
    }
}
