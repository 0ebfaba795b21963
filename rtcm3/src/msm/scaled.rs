use std::collections::BTreeMap;

use bitflags::bitflags;
use tracing::{debug, info, warn};

use super::{bare::BareMsm, signals::SignalInfo, Constellation, MsmKind, MsmType};
use crate::{constants::RANGE_1MS, error::DecodeError};

/// Observable of one kind, keyed by MSM signal id, then by satellite id
pub type SignalMap<T> = BTreeMap<u8, BTreeMap<u8, T>>;

bitflags! {
    /// Options applied while reconstructing observables
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ScaleFlags: u8 {
        /// Report carrier phase even while the half-cycle ambiguity is unresolved
        const REPORT_UNRESOLVED_HALF_CYCLE = 0x01;
    }
}

const ROUGH_RANGE_MS_INVALID: u8 = 255;
const ROUGH_RANGE_MOD_SCALE: f64 = 1.0 / 1024.0;
const FINE_PHASE_RATE_SCALE: f64 = 0.0001;
const GLONASS_TIME_MASK: u32 = 0x07ff_ffff;
const GLONASS_DAY_SHIFT: u32 = 27;

/// Resolution class of the cell fields
struct Resolution {
    range: f64,
    phase: f64,
    lock_time: fn(u16) -> u32,
    cnr: f64,
}

/// DF400, DF401, DF402, DF403
const STANDARD: Resolution = Resolution {
    range: 5.960464477539063e-08, // 2^-24
    phase: 1.862645149230957e-09, // 2^-29
    lock_time: lock_time_4bit,
    cnr: 1.0,
};

/// DF405, DF406, DF407, DF408
const EXTENDED: Resolution = Resolution {
    range: 1.862645149230957e-09, // 2^-29
    phase: 4.656612873077393e-10, // 2^-31
    lock_time: lock_time_10bit,
    cnr: 0.0625,
};

/// DF402 indicator to minimum lock time, [ms]
pub fn lock_time_4bit(t: u16) -> u32 {
    match t {
        0 => 0,
        1..=15 => 1 << (4 + t),
        _ => 0,
    }
}

/// DF407 indicator to minimum lock time, [ms]
pub fn lock_time_10bit(t: u16) -> u32 {
    let t = u32::from(t);
    match t {
        0..=63 => t,
        64..=703 => {
            let k = (t >> 5) - 1;
            (1 << k) * (t - 32 * k)
        },
        704 => 67_108_864,
        _ => 0,
    }
}

/// Most negative value of a `width` bit field, used as the "no data" pattern
fn is_absent(value: i32, width: usize) -> bool {
    value == -(1i32 << (width - 1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ClockSteering {
    Off,
    On,
    Undefined,
}

impl From<u8> for ClockSteering {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Off,
            1 => Self::On,
            _ => Self::Undefined,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ExternalClock {
    Internal,
    ExternalLocked,
    ExternalUnlocked,
    Undefined,
}

impl From<u8> for ExternalClock {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Internal,
            1 => Self::ExternalLocked,
            2 => Self::ExternalUnlocked,
            _ => Self::Undefined,
        }
    }
}

/// Divergence-free smoothing interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SmoothingInterval {
    None,
    UpTo30s,
    UpTo60s,
    UpTo120s,
    UpTo240s,
    UpTo480s,
    Over480s,
    Unlimited,
}

impl From<u8> for SmoothingInterval {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::None,
            1 => Self::UpTo30s,
            2 => Self::UpTo60s,
            3 => Self::UpTo120s,
            4 => Self::UpTo240s,
            5 => Self::UpTo480s,
            6 => Self::Over480s,
            _ => Self::Unlimited,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObservablesHeader {
    /// Epoch time, [ms]. Time of week, or time of day for GLONASS.
    pub epoch_time_ms: u32,
    /// GLONASS day of week, 0 for other constellations
    pub day: u8,
    /// Satellites present in the mask, ascending
    pub satellites: Vec<u8>,
    /// Signals present in the mask, ascending by id
    pub signals: Vec<SignalInfo>,
}

impl ObservablesHeader {
    pub fn epoch_time(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::from(self.epoch_time_ms))
    }

    pub fn signal(&self, id: u8) -> Option<&SignalInfo> {
        self.signals.iter().find(|s| s.id == id)
    }
}

/// Header fields that do not affect the observables
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MsmAux {
    pub station_id: u16,
    pub multiple_message: bool,
    pub iods: u8,
    pub clock_steering: ClockSteering,
    pub external_clock: ExternalClock,
    pub divergence_free_smoothing: bool,
    pub smoothing_interval: SmoothingInterval,
    /// MSM5/MSM7 extended satellite info by satellite id, e.g. GLONASS frequency channel + 7
    pub extended_info: BTreeMap<u8, u8>,
}

/// MSM observables in physical units.
///
/// Ranges and phases are in meters, phase range rate in m/s, C/N0 in dB-Hz,
/// lock time in ms. A signal appears in a map only if at least one satellite
/// reported a valid value for it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MsmObservables {
    pub kind: MsmKind,
    pub header: ObservablesHeader,
    pub aux: MsmAux,
    pub range: SignalMap<f64>,
    pub phase: SignalMap<f64>,
    pub doppler: SignalMap<f64>,
    pub cnr: SignalMap<f64>,
    pub lock_time: SignalMap<u32>,
    pub half_cycle: SignalMap<bool>,
}

fn insert<T>(map: &mut SignalMap<T>, signal: u8, satellite: u8, value: T) {
    map.entry(signal).or_default().insert(satellite, value);
}

impl MsmObservables {
    /// Reconstructs observables from bare fields.
    ///
    /// Fails only if the field vectors disagree with the masks, which cannot
    /// happen for a [BareMsm] produced by [BareMsm::decode].
    pub fn from_bare(bare: &BareMsm, flags: ScaleFlags) -> Result<Self, DecodeError> {
        bare.check_geometry()?;

        let kind = bare.kind;
        let hdr = &bare.header;
        let (epoch_time_ms, day) = if kind.constellation == Constellation::Glonass {
            (
                hdr.epoch_time & GLONASS_TIME_MASK,
                (hdr.epoch_time >> GLONASS_DAY_SHIFT) as u8,
            )
        } else {
            (hdr.epoch_time, 0)
        };
        let satellites: Vec<u8> = hdr.satellites().collect();

        let mut rv = Self {
            kind,
            header: ObservablesHeader {
                epoch_time_ms,
                day,
                signals: hdr
                    .signals()
                    .map(|id| SignalInfo::new(kind.constellation, id))
                    .collect(),
                satellites,
            },
            aux: MsmAux {
                station_id: hdr.station_id,
                multiple_message: hdr.multiple_message,
                iods: hdr.iods,
                clock_steering: hdr.clock_steering.into(),
                external_clock: hdr.external_clock.into(),
                divergence_free_smoothing: hdr.smoothing_indicator,
                smoothing_interval: hdr.smoothing_interval.into(),
                extended_info: bare
                    .header
                    .satellites()
                    .zip(bare.satellites.extended_info.iter().copied())
                    .collect(),
            },
            range: SignalMap::new(),
            phase: SignalMap::new(),
            doppler: SignalMap::new(),
            cnr: SignalMap::new(),
            lock_time: SignalMap::new(),
            half_cycle: SignalMap::new(),
        };
        if hdr.is_empty() {
            return Ok(rv);
        }
        rv.fill_cells(bare, flags);
        Ok(rv)
    }

    fn fill_cells(&mut self, bare: &BareMsm, flags: ScaleFlags) {
        let msm = self.kind.msm;
        let widths = msm.field_widths();
        let res = if msm.is_high_resolution() {
            &EXTENDED
        } else {
            &STANDARD
        };
        let sats = &bare.satellites;
        let cells = &bare.cells;

        // Coarse range [ms] and rough phase range rate [m/s] per satellite
        let coarse_by_sat: Vec<Option<f64>> = bare
            .header
            .satellites()
            .enumerate()
            .map(|(i, sat)| {
                let rough = f64::from(sats.rough_range_mod[i]) * ROUGH_RANGE_MOD_SCALE;
                match sats.rough_range_ms.get(i) {
                    None => Some(rough),
                    Some(&ROUGH_RANGE_MS_INVALID) => {
                        warn!(message = self.kind.message_number, sat, "no coarse range");
                        None
                    },
                    Some(&ms) => Some(f64::from(ms) + rough),
                }
            })
            .collect();
        let rate_by_sat: Vec<Option<f64>> = bare
            .header
            .satellites()
            .zip(sats.rough_phase_rate.iter())
            .map(|(sat, &rate)| {
                if is_absent(i32::from(rate), widths.rough_phase_rate) {
                    warn!(message = self.kind.message_number, sat, "no coarse phase rate");
                    None
                } else {
                    Some(f64::from(rate))
                }
            })
            .collect();

        for (ci, cell) in bare.header.cells().enumerate() {
            let (sat, sig) = (cell.satellite, cell.signal);
            let Some(coarse) = coarse_by_sat[cell.satellite_index] else {
                continue;
            };

            let mut range_present = true;
            if widths.fine_range != 0 {
                let fine = cells.fine_range[ci];
                if is_absent(fine, widths.fine_range) {
                    info!(message = self.kind.message_number, sat, sig, "no fine range");
                    range_present = false;
                } else {
                    let range = (coarse + f64::from(fine) * res.range) * RANGE_1MS;
                    insert(&mut self.range, sig, sat, range);
                }
            }

            // MSM3 has no phase without range
            let mut phase_present = false;
            if widths.fine_phase != 0 && (msm.has_integer_ms() || range_present) {
                let fine = cells.fine_phase[ci];
                if is_absent(fine, widths.fine_phase) {
                    info!(message = self.kind.message_number, sat, sig, "no fine phase");
                } else {
                    phase_present = true;
                    let unresolved = cells.half_cycle[ci];
                    if !unresolved || flags.contains(ScaleFlags::REPORT_UNRESOLVED_HALF_CYCLE) {
                        let phase = (coarse + f64::from(fine) * res.phase) * RANGE_1MS;
                        insert(&mut self.phase, sig, sat, phase);
                    } else {
                        debug!(
                            message = self.kind.message_number,
                            sat, sig, "unresolved half-cycle ambiguity, phase dropped"
                        );
                    }
                }
            }

            // MSM2/MSM3 report lock state only along with a phase
            if widths.lock_time != 0 && (msm.has_integer_ms() || phase_present) {
                insert(
                    &mut self.lock_time,
                    sig,
                    sat,
                    (res.lock_time)(cells.lock_time[ci]),
                );
                insert(&mut self.half_cycle, sig, sat, cells.half_cycle[ci]);
            }

            if widths.cnr != 0 {
                insert(&mut self.cnr, sig, sat, f64::from(cells.cnr[ci]) * res.cnr);
            }

            if widths.fine_phase_rate != 0 {
                if let Some(rate) = rate_by_sat[cell.satellite_index] {
                    let fine = cells.fine_phase_rate[ci];
                    if is_absent(i32::from(fine), widths.fine_phase_rate) {
                        info!(message = self.kind.message_number, sat, sig, "no fine phase rate");
                    } else {
                        let doppler = rate + f64::from(fine) * FINE_PHASE_RATE_SCALE;
                        insert(&mut self.doppler, sig, sat, doppler);
                    }
                }
            }
        }
    }

    /// Range of `satellite` on `signal`, [m]
    pub fn range_of(&self, signal: u8, satellite: u8) -> Option<f64> {
        self.range.get(&signal)?.get(&satellite).copied()
    }

    pub fn msm_type(&self) -> MsmType {
        self.kind.msm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_time_standard() {
        assert_eq!(lock_time_4bit(0), 0);
        assert_eq!(lock_time_4bit(1), 32);
        assert_eq!(lock_time_4bit(15), 524_288);
    }

    #[test]
    fn lock_time_extended() {
        assert_eq!(lock_time_10bit(0), 0);
        assert_eq!(lock_time_10bit(63), 63);
        assert_eq!(lock_time_10bit(64), 64);
        assert_eq!(lock_time_10bit(96), 4 * (96 - 32 * 2));
        assert_eq!(lock_time_10bit(703), (1 << 20) * (703 - 32 * 20));
        assert_eq!(lock_time_10bit(704), 67_108_864);
        assert_eq!(lock_time_10bit(705), 0);
        assert_eq!(lock_time_10bit(1023), 0);
    }

    #[test]
    fn lock_time_is_monotonic() {
        let mut last = 0;
        for t in 0..=704 {
            let v = lock_time_10bit(t);
            assert!(v >= last, "{t}");
            last = v;
        }
    }

    #[test]
    fn sentinels() {
        assert!(is_absent(-0x4000, 15));
        assert!(!is_absent(0x3fff, 15));
        assert!(is_absent(-0x20_0000, 22));
        assert!(is_absent(-0x8_0000, 20));
        assert!(is_absent(-0x80_0000, 24));
        assert!(is_absent(-0x2000, 14));
        assert!(!is_absent(0, 24));
    }

    #[test]
    fn header_enums() {
        assert_eq!(ClockSteering::from(1), ClockSteering::On);
        assert_eq!(ClockSteering::from(3), ClockSteering::Undefined);
        assert_eq!(ExternalClock::from(2), ExternalClock::ExternalUnlocked);
        assert_eq!(SmoothingInterval::from(0), SmoothingInterval::None);
        assert_eq!(SmoothingInterval::from(7), SmoothingInterval::Unlimited);
    }
}
