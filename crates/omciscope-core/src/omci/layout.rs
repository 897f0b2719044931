pub const TID_RANGE: std::ops::Range<usize> = 0..2;
pub const MESSAGE_TYPE_OFFSET: usize = 2;
pub const DEVICE_ID_OFFSET: usize = 3;
pub const CLASS_RANGE: std::ops::Range<usize> = 4..6;
pub const INSTANCE_RANGE: std::ops::Range<usize> = 6..8;
pub const CONTENTS_RANGE: std::ops::Range<usize> = 8..40;
pub const TRAILER_RANGE: std::ops::Range<usize> = 40..44;

pub const HEADER_LEN: usize = 8;
pub const CONTENTS_LEN: usize = 32;
/// Request frame: header + contents + trailer.
pub const FRAME_LEN: usize = 44;
/// Response frame: request frame + 4-byte CRC.
pub const FRAME_LEN_CRC: usize = 48;

/// Baseline device identifier, byte 3 of every frame.
pub const BASELINE_DEVICE_ID: u8 = 0x0A;

/// Trailer bytes closing every baseline frame.
pub const TRAILER: [u8; 4] = [0x00, 0x00, 0x00, 0x28];
/// The trailer as it appears in ASCII-hex payloads.
pub const TRAILER_HEX: &[u8; 8] = b"00000028";

/// Alarm bitmap width in bits (28 bytes of contents).
pub const ALARM_BITMAP_BITS: usize = 224;
pub const ALARM_BITMAP_LEN: usize = ALARM_BITMAP_BITS / 8;

pub const ONU_DATA_CLASS_ID: u16 = 2;
pub const ONU_G_CLASS_ID: u16 = 256;
pub const T_CONT_CLASS_ID: u16 = 262;

/// Transaction id 0 is reserved for ONU-initiated notifications.
pub const RESERVED_TID: u16 = 0;
