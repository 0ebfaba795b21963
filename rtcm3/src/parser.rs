use tracing::{debug, trace};

use crate::{
    bits::get_unsigned,
    constants::{
        RTCM_CRC_LEN, RTCM_FRAME_OVERHEAD, RTCM_HEADER_LEN, RTCM_LENGTH_MASK,
        RTCM_MAX_PAYLOAD_LEN, RTCM_MSG_NUM_BIT_LEN, RTCM_PREAMBLE, RTCM_RESERVED_MASK,
    },
    error::ParserError,
};

mod crc24q;

pub use crc24q::{crc24q, Crc24Q, CRC24Q_POLY};

/// One complete RTCM3 frame: preamble, length, payload and CRC.
///
/// A [RawFrame] can only be obtained from [Parser::catch_message] or from the
/// validating constructors, so its checksum always matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Vec<u8>,
}

impl RawFrame {
    /// Validates a single, complete frame.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ParserError> {
        if bytes.len() < RTCM_FRAME_OVERHEAD {
            return Err(ParserError::InvalidFrame {
                reason: "shorter than header and checksum",
            });
        }
        if !is_sync(&bytes) {
            return Err(ParserError::InvalidFrame {
                reason: "missing preamble",
            });
        }
        if frame_len(&bytes) != bytes.len() {
            return Err(ParserError::InvalidFrame {
                reason: "declared length does not match",
            });
        }
        check_crc(&bytes)?;
        Ok(Self { bytes })
    }

    /// Wraps `payload` into a frame, computing length field and checksum.
    pub fn from_payload(payload: &[u8]) -> Result<Self, ParserError> {
        if payload.len() > RTCM_MAX_PAYLOAD_LEN {
            return Err(ParserError::PayloadTooLong { len: payload.len() });
        }
        let mut bytes = Vec::with_capacity(payload.len() + RTCM_FRAME_OVERHEAD);
        bytes.push(RTCM_PREAMBLE);
        bytes.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        bytes.extend_from_slice(payload);
        let crc = crc24q(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes()[1..]);
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total frame length, header and checksum included
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Frames always carry at least header and checksum
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[RTCM_HEADER_LEN..self.bytes.len() - RTCM_CRC_LEN]
    }

    /// 12-bit message number, `None` if the payload is too short to hold one
    pub fn message_number(&self) -> Option<u16> {
        get_unsigned(self.payload(), 0, RTCM_MSG_NUM_BIT_LEN)
            .ok()
            .map(|num| num as u16)
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Preamble followed by six zero reserved bits. A lone trailing preamble is
/// accepted until the next byte arrives.
fn is_sync(buf: &[u8]) -> bool {
    buf.first() == Some(&RTCM_PREAMBLE)
        && buf.get(1).map_or(true, |b| b & RTCM_RESERVED_MASK == 0)
}

fn find_sync(buf: &[u8]) -> Option<usize> {
    (0..buf.len()).find(|&i| is_sync(&buf[i..]))
}

/// Total frame length announced by a header. `buf` holds at least 3 bytes.
fn frame_len(buf: &[u8]) -> usize {
    let pack_len = u16::from_be_bytes([buf[1], buf[2]]) & RTCM_LENGTH_MASK;
    usize::from(pack_len) + RTCM_FRAME_OVERHEAD
}

/// `frame` holds exactly one candidate frame.
fn check_crc(frame: &[u8]) -> Result<(), ParserError> {
    let data_len = frame.len() - RTCM_CRC_LEN;
    let received = u32::from_be_bytes([0, frame[data_len], frame[data_len + 1], frame[data_len + 2]]);
    let mut calc = Crc24Q::new();
    calc.update(&frame[..data_len]);
    calc.validate_result(received)
}

/// Streaming RTCM3 frame synchronizer.
///
/// Bytes are accumulated across calls to [Parser::catch_message], so any split of
/// the same stream yields the same frames. Bytes dropped between two frames
/// with valid checksums count as one parse error; garbage before the first or
/// after the last valid frame is not counted.
#[derive(Debug, Default)]
pub struct Parser {
    buf: Vec<u8>,
    synchronized: bool,
    skipped_some_bytes: bool,
    parse_errors: usize,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_buffer_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn buffer_len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the last examined frame had a valid checksum
    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    /// Number of anomalies found strictly between two valid frames
    pub fn parse_errors(&self) -> usize {
        self.parse_errors
    }

    /// Drops pending bytes and sync state. The error counter survives.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.synchronized = false;
        self.skipped_some_bytes = false;
    }

    /// Appends `chunk` to the pending tail and extracts every complete frame
    /// with a valid checksum, in stream order.
    pub fn catch_message(&mut self, chunk: &[u8]) -> Vec<RawFrame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut pos = 0;
        while pos < self.buf.len() {
            match find_sync(&self.buf[pos..]) {
                Some(0) => {},
                Some(skip) => {
                    trace!(skipped = skip, "dropping bytes before preamble");
                    self.mark_skipped();
                    pos += skip;
                },
                None => {
                    trace!(skipped = self.buf.len() - pos, "no preamble, dropping tail");
                    self.mark_skipped();
                    pos = self.buf.len();
                    break;
                },
            }

            let head = &self.buf[pos..];
            if head.len() < RTCM_FRAME_OVERHEAD {
                break;
            }
            let total = frame_len(head);
            if head.len() < total {
                break;
            }

            match check_crc(&head[..total]) {
                Ok(()) => {
                    let frame = RawFrame {
                        bytes: head[..total].to_vec(),
                    };
                    debug!(
                        len = total,
                        message = ?frame.message_number(),
                        "caught frame"
                    );
                    frames.push(frame);
                    pos += total;
                    if self.skipped_some_bytes {
                        self.parse_errors += 1;
                        self.skipped_some_bytes = false;
                    }
                    self.synchronized = true;
                },
                Err(err) => {
                    trace!(%err, "dropping preamble candidate");
                    self.mark_skipped();
                    pos += 1;
                },
            }
        }

        self.buf.drain(..pos);
        frames
    }

    /// Only anomalies after a valid frame are tracked; they are counted once
    /// another valid frame follows.
    fn mark_skipped(&mut self) {
        if self.synchronized {
            self.skipped_some_bytes = true;
            self.synchronized = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(payload: &[u8]) -> Vec<u8> {
        RawFrame::from_payload(payload).unwrap().into_bytes()
    }

    #[test]
    fn from_payload_layout() {
        let bytes = frame(&[0x40, 0x50, 0x17]);
        assert_eq!(&bytes[..3], &[0xd3, 0x00, 0x03]);
        assert_eq!(bytes.len(), 9);
        assert_eq!(crc24q(&bytes), 0); // CRC over data and its own checksum
    }

    #[test]
    fn from_bytes_validation() {
        let bytes = frame(&[0x40, 0x50, 0x17]);
        let raw = RawFrame::from_bytes(bytes.clone()).unwrap();
        assert_eq!(raw.message_number(), Some(1029));
        assert_eq!(raw.payload(), &[0x40, 0x50, 0x17]);
        assert_eq!(raw.len(), 9);

        let mut bad = bytes.clone();
        bad[4] ^= 0x80;
        assert!(matches!(
            RawFrame::from_bytes(bad),
            Err(ParserError::InvalidChecksum { .. })
        ));

        let mut short = bytes.clone();
        short.pop();
        assert!(matches!(
            RawFrame::from_bytes(short),
            Err(ParserError::InvalidFrame { .. })
        ));

        let mut reserved = bytes;
        reserved[1] = 0x04;
        assert!(matches!(
            RawFrame::from_bytes(reserved),
            Err(ParserError::InvalidFrame { .. })
        ));

        assert_eq!(
            RawFrame::from_payload(&[0u8; 1024]),
            Err(ParserError::PayloadTooLong { len: 1024 })
        );
    }

    #[test]
    fn message_number_needs_two_bytes() {
        let raw = RawFrame::from_payload(&[0x40]).unwrap();
        assert_eq!(raw.message_number(), None);
        let raw = RawFrame::from_payload(&[]).unwrap();
        assert_eq!(raw.payload(), &[] as &[u8]);
        assert_eq!(raw.message_number(), None);
    }

    #[test]
    fn sync_requires_zero_reserved_bits() {
        assert_eq!(find_sync(&[0x00, 0xd3, 0x80, 0xd3, 0x01]), Some(3));
        assert_eq!(find_sync(&[0x00, 0xd3]), Some(1));
        assert_eq!(find_sync(&[0x00, 0xd3, 0xff]), None);
    }

    #[test]
    fn waits_for_complete_frame() {
        let bytes = frame(&[0x40, 0x50, 0x17, 0x00]);
        let mut parser = Parser::new();
        assert!(parser.catch_message(&bytes[..5]).is_empty());
        assert_eq!(parser.buffer_len(), 5);
        let frames = parser.catch_message(&bytes[5..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &bytes[..]);
        assert!(parser.is_buffer_empty());
        assert!(parser.is_synchronized());
    }

    #[test]
    fn garbage_without_preamble_is_discarded() {
        let mut parser = Parser::new();
        assert!(parser.catch_message(b"abra-cadabra").is_empty());
        assert!(parser.is_buffer_empty());
        assert_eq!(parser.parse_errors(), 0);
    }

    #[test]
    fn reset_keeps_counter() {
        let a = frame(&[0x40, 0x50]);
        let mut parser = Parser::new();
        let mut stream = a.clone();
        stream.push(0x00);
        stream.extend_from_slice(&a);
        stream.push(0xd3);
        assert_eq!(parser.catch_message(&stream).len(), 2);
        assert_eq!(parser.parse_errors(), 1);
        assert_eq!(parser.buffer_len(), 1);
        parser.reset();
        assert!(parser.is_buffer_empty());
        assert!(!parser.is_synchronized());
        assert_eq!(parser.parse_errors(), 1);
    }
}
