use crate::decoder::ResultKind;

/// Error raised by the bit field extraction primitives
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitError {
    #[error("Invalid bit field width {len}, expect 1..=128")]
    InvalidWidth { len: usize },
    #[error("Bit field [{start}, {start}+{len}) overshoots buffer of {available} bits")]
    OutOfRange {
        start: usize,
        len: usize,
        available: usize,
    },
    #[error("Bit field of {len} bits does not fit the requested integer type")]
    Overflow { len: usize },
}

/// Error that possible while framing a single RTCM3 message
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("Not valid frame's checksum, expect {expect:06x}, got {got:06x}")]
    InvalidChecksum { expect: u32, got: u32 },
    #[error("Invalid frame: {reason}")]
    InvalidFrame { reason: &'static str },
    #[error("Payload of {len} bytes does not fit the 10-bit length field")]
    PayloadTooLong { len: usize },
}

/// Error raised while turning a validated frame into a decoded result
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Msg {message}: malformed structure: {reason}")]
    Structure { message: u16, reason: String },
    #[error(transparent)]
    Bits(#[from] BitError),
    #[error("Msg {message}: no sub-decoder registered")]
    UnsupportedMessage { message: u16 },
    #[error("Msg {message}: sub-decoder returned {got:?}, expect {expected:?}")]
    ResultTypeMismatch {
        message: u16,
        expected: ResultKind,
        got: ResultKind,
    },
}

impl DecodeError {
    pub(crate) fn structure(message: u16, reason: impl Into<String>) -> Self {
        Self::Structure {
            message,
            reason: reason.into(),
        }
    }
}

/// Sub-decoder contract violations detected at wiring time
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Empty message list in sub-decoder {subset}")]
    EmptyMessageSet { subset: String },
    #[error("Sub-decoder {subset} is already registered")]
    DuplicateSubset { subset: String },
    #[error("Sub-decoder {subset} declares no result type for msg {message}")]
    MissingResultKind { subset: String, message: u16 },
}
