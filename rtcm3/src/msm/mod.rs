//! Multiple Signal Messages (MSM1 .. MSM7)
//!
//! Decoding happens in two stages, mirroring how the data is transmitted:
//! [BareMsm] holds the integer fields exactly as found in the frame, and
//! [MsmObservables] holds them reconstructed into physical units.

use std::collections::BTreeSet;

use tracing::info;

use crate::{
    decoder::{Decoded, ResultKind, SubDecoder},
    error::DecodeError,
    parser::RawFrame,
};

mod bare;
mod header;
mod scaled;
mod signals;

pub use bare::{BareCellData, BareMsm, BareSatelliteData};
pub use header::{Cell, MsmHeader, MSM_HEADER_BITS};
pub use scaled::{
    lock_time_10bit, lock_time_4bit, ClockSteering, ExternalClock, MsmAux, MsmObservables,
    ObservablesHeader, ScaleFlags, SignalMap, SmoothingInterval,
};
pub use signals::SignalInfo;

const MSM_FIRST_MESSAGE: u16 = 1071;
const MSM_CONSTELLATION_STRIDE: u16 = 10;

/// MSM subtype, selects which data fields are carried and at which resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MsmType {
    Msm1,
    Msm2,
    Msm3,
    Msm4,
    Msm5,
    Msm6,
    Msm7,
}

impl MsmType {
    pub const ALL: [MsmType; 7] = [
        Self::Msm1,
        Self::Msm2,
        Self::Msm3,
        Self::Msm4,
        Self::Msm5,
        Self::Msm6,
        Self::Msm7,
    ];

    fn from_index(idx: u16) -> Option<Self> {
        Self::ALL.get(usize::from(idx)).copied()
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// 1 for MSM1, .., 7 for MSM7
    pub const fn number(self) -> u8 {
        self as u8 + 1
    }

    /// MSM4 .. MSM7 carry integer milliseconds and C/N0
    pub const fn has_integer_ms(self) -> bool {
        matches!(self, Self::Msm4 | Self::Msm5 | Self::Msm6 | Self::Msm7)
    }

    /// MSM5 and MSM7 carry extended info and phase range rates
    pub const fn has_phase_rate(self) -> bool {
        matches!(self, Self::Msm5 | Self::Msm7)
    }

    /// MSM6 and MSM7 use the extended resolution fields
    pub const fn is_high_resolution(self) -> bool {
        matches!(self, Self::Msm6 | Self::Msm7)
    }
}

/// GNSS a MSM message refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Constellation {
    Gps,
    Glonass,
    Galileo,
    Sbas,
    Qzss,
    BeiDou,
    NavIC,
}

impl Constellation {
    const ALL: [Constellation; 7] = [
        Self::Gps,
        Self::Glonass,
        Self::Galileo,
        Self::Sbas,
        Self::Qzss,
        Self::BeiDou,
        Self::NavIC,
    ];

    /// RINEX system identifier
    pub const fn rinex_letter(self) -> char {
        match self {
            Self::Gps => 'G',
            Self::Glonass => 'R',
            Self::Galileo => 'E',
            Self::Sbas => 'S',
            Self::Qzss => 'J',
            Self::BeiDou => 'C',
            Self::NavIC => 'I',
        }
    }
}

/// Classification of a MSM message number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MsmKind {
    pub message_number: u16,
    pub constellation: Constellation,
    pub msm: MsmType,
}

impl MsmKind {
    /// Returns `None` for anything outside 1071 ..= 1137 or for the reserved x8/x9/x0 numbers.
    pub fn from_message_number(message_number: u16) -> Option<Self> {
        let rel = message_number.checked_sub(MSM_FIRST_MESSAGE)?;
        let constellation =
            *Constellation::ALL.get(usize::from(rel / MSM_CONSTELLATION_STRIDE))?;
        let msm = MsmType::from_index(rel % MSM_CONSTELLATION_STRIDE)?;
        Some(Self {
            message_number,
            constellation,
            msm,
        })
    }

    pub fn message_number_for(constellation: Constellation, msm: MsmType) -> u16 {
        MSM_FIRST_MESSAGE
            + MSM_CONSTELLATION_STRIDE * constellation as u16
            + u16::from(msm.number() - 1)
    }
}

/// Wiring time options of the MSM sub-decoders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Return [BareMsm] instead of [MsmObservables]
    pub bare: bool,
    pub flags: ScaleFlags,
}

/// Sub-decoder for a subset of MSM types, across all constellations.
#[derive(Debug, Clone)]
pub struct MsmDecoder {
    subset: &'static str,
    messages: BTreeSet<u16>,
    options: DecoderOptions,
}

impl MsmDecoder {
    fn with_types(subset: &'static str, types: &[MsmType], options: DecoderOptions) -> Self {
        let messages = Constellation::ALL
            .iter()
            .flat_map(|c| types.iter().map(|t| MsmKind::message_number_for(*c, *t)))
            .collect();
        Self {
            subset,
            messages,
            options,
        }
    }

    /// MSM1, MSM2 and MSM3: compact observables without integer milliseconds
    pub fn msm123(options: DecoderOptions) -> Self {
        Self::with_types(
            "MSM123",
            &[MsmType::Msm1, MsmType::Msm2, MsmType::Msm3],
            options,
        )
    }

    /// MSM4 .. MSM7: full observables
    pub fn msm4567(options: DecoderOptions) -> Self {
        Self::with_types(
            "MSM4567",
            &[MsmType::Msm4, MsmType::Msm5, MsmType::Msm6, MsmType::Msm7],
            options,
        )
    }

    pub fn options(&self) -> DecoderOptions {
        self.options
    }
}

impl SubDecoder for MsmDecoder {
    fn subset(&self) -> &str {
        self.subset
    }

    fn implemented_messages(&self) -> &BTreeSet<u16> {
        &self.messages
    }

    fn result_kind(&self, message_number: u16) -> Option<ResultKind> {
        if !self.messages.contains(&message_number) {
            return None;
        }
        Some(if self.options.bare {
            ResultKind::BareMsm
        } else {
            ResultKind::Observables
        })
    }

    fn decode(&self, frame: &RawFrame) -> Result<Decoded, DecodeError> {
        let bare = BareMsm::decode(frame)?;
        if self.options.bare {
            info!(
                message = bare.kind.message_number,
                time = bare.header.epoch_time,
                sats = bare.header.satellite_count(),
                "decoded bare MSM"
            );
            return Ok(Decoded::BareMsm(bare));
        }
        let scaled = MsmObservables::from_bare(&bare, self.options.flags)?;
        info!(
            message = scaled.kind.message_number,
            time = scaled.header.epoch_time_ms,
            sats = scaled.header.satellites.len(),
            "decoded MSM observables"
        );
        Ok(Decoded::Observables(scaled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_message_numbers() {
        let kind = MsmKind::from_message_number(1077).unwrap();
        assert_eq!(kind.constellation, Constellation::Gps);
        assert_eq!(kind.msm, MsmType::Msm7);

        let kind = MsmKind::from_message_number(1097).unwrap();
        assert_eq!(kind.constellation, Constellation::Galileo);

        let kind = MsmKind::from_message_number(1081).unwrap();
        assert_eq!(kind.constellation, Constellation::Glonass);
        assert_eq!(kind.msm, MsmType::Msm1);

        let kind = MsmKind::from_message_number(1137).unwrap();
        assert_eq!(kind.constellation, Constellation::NavIC);
        assert_eq!(kind.msm, MsmType::Msm7);

        for num in [1070, 1078, 1079, 1080, 1138, 1147, 1005, 0] {
            assert_eq!(MsmKind::from_message_number(num), None, "{num}");
        }
    }

    #[test]
    fn message_number_for_round_trips() {
        for c in Constellation::ALL {
            for t in MsmType::ALL {
                let num = MsmKind::message_number_for(c, t);
                let kind = MsmKind::from_message_number(num).unwrap();
                assert_eq!((kind.constellation, kind.msm), (c, t));
            }
        }
    }

    #[test]
    fn subsets_cover_all_constellations() {
        let dec = MsmDecoder::msm4567(DecoderOptions::default());
        assert_eq!(dec.implemented_messages().len(), 28);
        assert!(dec.implemented_messages().contains(&1074));
        assert!(dec.implemented_messages().contains(&1137));
        assert!(!dec.implemented_messages().contains(&1073));
        assert_eq!(dec.result_kind(1127), Some(ResultKind::Observables));
        assert_eq!(dec.result_kind(1123), None);

        let dec = MsmDecoder::msm123(DecoderOptions {
            bare: true,
            ..Default::default()
        });
        assert_eq!(dec.implemented_messages().len(), 21);
        assert_eq!(dec.result_kind(1123), Some(ResultKind::BareMsm));
    }
}
