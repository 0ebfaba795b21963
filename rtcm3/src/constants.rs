pub const RTCM_PREAMBLE: u8 = 0xd3;
pub(crate) const RTCM_RESERVED_MASK: u8 = 0xfc; // 6 reserved bits following the preamble
pub(crate) const RTCM_HEADER_LEN: usize = 3; // preamble (1) + reserved/length (2)
pub(crate) const RTCM_CRC_LEN: usize = 3;
pub(crate) const RTCM_FRAME_OVERHEAD: usize = RTCM_HEADER_LEN + RTCM_CRC_LEN;
pub(crate) const RTCM_LENGTH_MASK: u16 = 0x03ff; // 10 bits for length (6 bits reserved)
pub const RTCM_MAX_PAYLOAD_LEN: usize = RTCM_LENGTH_MASK as usize;

pub(crate) const RTCM_MSG_NUM_BIT_OFFSET: usize = 24; // right after the header
pub(crate) const RTCM_MSG_NUM_BIT_LEN: usize = 12;

/// Speed of light, [m/s]
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
/// Distance light travels in 1 ms, [m]
pub const RANGE_1MS: f64 = SPEED_OF_LIGHT * 0.001;
