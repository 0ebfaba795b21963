//! # rtcm3
//!
//! Stream framing and Multiple Signal Message (MSM) decoding for RTCM 10403.x
//! correction data.
//!
//! Framing
//! =======
//!
//! Bytes coming from a serial port, a file or an NTRIP caster are fed into a
//! [Parser] in chunks of any size. It returns every complete frame whose
//! CRC-24Q matches, resynchronizing on the next preamble after noise or
//! corruption:
//! ```
//! use rtcm3::{Parser, RawFrame};
//!
//! let frame = RawFrame::from_payload(&[0x40, 0x50, 0x17]).unwrap();
//! let mut stream = b"noise".to_vec();
//! stream.extend_from_slice(frame.as_bytes());
//!
//! let mut parser = Parser::new();
//! let frames = parser.catch_message(&stream[..7]);
//! assert!(frames.is_empty());
//! let frames = parser.catch_message(&stream[7..]);
//! assert_eq!(frames, vec![frame]);
//! ```
//!
//! Decoding
//! ========
//!
//! A [Decoder] dispatches frames to the sub-decoders registered with it.
//! [MsmDecoder] handles MSM1 to MSM7 for every constellation, returning either
//! the bare integer fields or observables in physical units:
//! ```
//! use rtcm3::{Decoded, Decoder, DecoderOptions, MsmDecoder, RawFrame};
//!
//! let mut decoder = Decoder::new();
//! decoder.register(MsmDecoder::msm123(DecoderOptions::default())).unwrap();
//! decoder.register(MsmDecoder::msm4567(DecoderOptions::default())).unwrap();
//!
//! // GPS MSM7 without satellites
//! let mut payload = [0u8; 22];
//! payload[..2].copy_from_slice(&[0x43, 0x50]);
//! let frame = RawFrame::from_payload(&payload).unwrap();
//! match decoder.decode(&frame) {
//!     Some(Decoded::Observables(obs)) => assert!(obs.header.satellites.is_empty()),
//!     _ => unreachable!(),
//! }
//! assert_eq!(decoder.dec_successes(), 1);
//! ```

pub use crate::{
    bits::{get_signed, get_unsigned, reverse_bits, BitReader, MAX_BIT_WIDTH},
    constants::{RANGE_1MS, RTCM_MAX_PAYLOAD_LEN, RTCM_PREAMBLE, SPEED_OF_LIGHT},
    decoder::{Decoded, Decoder, ResultKind, SubDecoder},
    error::{BitError, DecodeError, ParserError, RegistrationError},
    msm::{
        BareMsm, Constellation, DecoderOptions, MsmDecoder, MsmKind, MsmObservables, MsmType,
        ScaleFlags,
    },
    parser::{crc24q, Crc24Q, Parser, RawFrame, CRC24Q_POLY},
};

mod bits;
mod constants;
mod decoder;
mod error;
pub mod msm;
mod parser;
