use num_traits::{FromPrimitive, PrimInt};
use tracing::trace;

use super::{header::MsmHeader, MsmKind, MsmType};
use crate::{
    bits::BitReader,
    constants::RTCM_CRC_LEN,
    error::{BitError, DecodeError},
    parser::RawFrame,
};

/// Width in bits of every MSM data field, zero when a subtype does not carry it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldWidths {
    // per satellite
    pub rough_range_ms: usize,
    pub extended_info: usize,
    pub rough_range_mod: usize,
    pub rough_phase_rate: usize,
    // per cell
    pub fine_range: usize,
    pub fine_phase: usize,
    pub lock_time: usize,
    pub half_cycle: usize,
    pub cnr: usize,
    pub fine_phase_rate: usize,
}

impl FieldWidths {
    const NONE: Self = Self {
        rough_range_ms: 0,
        extended_info: 0,
        rough_range_mod: 0,
        rough_phase_rate: 0,
        fine_range: 0,
        fine_phase: 0,
        lock_time: 0,
        half_cycle: 0,
        cnr: 0,
        fine_phase_rate: 0,
    };

    pub const fn per_satellite(&self) -> usize {
        self.rough_range_ms + self.extended_info + self.rough_range_mod + self.rough_phase_rate
    }

    pub const fn per_cell(&self) -> usize {
        self.fine_range
            + self.fine_phase
            + self.lock_time
            + self.half_cycle
            + self.cnr
            + self.fine_phase_rate
    }
}

const FIELD_WIDTHS: [FieldWidths; 7] = [
    // MSM1
    FieldWidths {
        rough_range_mod: 10,
        fine_range: 15,
        ..FieldWidths::NONE
    },
    // MSM2
    FieldWidths {
        rough_range_mod: 10,
        fine_phase: 22,
        lock_time: 4,
        half_cycle: 1,
        ..FieldWidths::NONE
    },
    // MSM3
    FieldWidths {
        rough_range_mod: 10,
        fine_range: 15,
        fine_phase: 22,
        lock_time: 4,
        half_cycle: 1,
        ..FieldWidths::NONE
    },
    // MSM4
    FieldWidths {
        rough_range_ms: 8,
        rough_range_mod: 10,
        fine_range: 15,
        fine_phase: 22,
        lock_time: 4,
        half_cycle: 1,
        cnr: 6,
        ..FieldWidths::NONE
    },
    // MSM5
    FieldWidths {
        rough_range_ms: 8,
        extended_info: 4,
        rough_range_mod: 10,
        rough_phase_rate: 14,
        fine_range: 15,
        fine_phase: 22,
        lock_time: 4,
        half_cycle: 1,
        cnr: 6,
        fine_phase_rate: 15,
    },
    // MSM6
    FieldWidths {
        rough_range_ms: 8,
        rough_range_mod: 10,
        fine_range: 20,
        fine_phase: 24,
        lock_time: 10,
        half_cycle: 1,
        cnr: 10,
        ..FieldWidths::NONE
    },
    // MSM7
    FieldWidths {
        rough_range_ms: 8,
        extended_info: 4,
        rough_range_mod: 10,
        rough_phase_rate: 14,
        fine_range: 20,
        fine_phase: 24,
        lock_time: 10,
        half_cycle: 1,
        cnr: 10,
        fine_phase_rate: 15,
    },
];

impl MsmType {
    pub(crate) const fn field_widths(self) -> FieldWidths {
        FIELD_WIDTHS[self.index()]
    }
}

/// Per-satellite fields in satellite order. Fields a subtype does not carry stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BareSatelliteData {
    /// DF397, integer milliseconds, 255 when invalid
    pub rough_range_ms: Vec<u8>,
    pub extended_info: Vec<u8>,
    /// DF398, rough range modulo 1 ms in 2^-10 ms
    pub rough_range_mod: Vec<u16>,
    /// DF399, m/s
    pub rough_phase_rate: Vec<i16>,
}

/// Per-cell fields in cell order. Fields a subtype does not carry stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BareCellData {
    /// DF400 or DF405
    pub fine_range: Vec<i32>,
    /// DF401 or DF406
    pub fine_phase: Vec<i32>,
    /// DF402 or DF407
    pub lock_time: Vec<u16>,
    /// DF420
    pub half_cycle: Vec<bool>,
    /// DF403 or DF408
    pub cnr: Vec<u16>,
    /// DF404
    pub fine_phase_rate: Vec<i16>,
}

/// MSM with every data field as transmitted, no scaling applied
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BareMsm {
    pub kind: MsmKind,
    pub header: MsmHeader,
    pub satellites: BareSatelliteData,
    pub cells: BareCellData,
}

fn read_unsigned<T: PrimInt + FromPrimitive>(
    reader: &mut BitReader<'_>,
    width: usize,
    count: usize,
) -> Result<Vec<T>, BitError> {
    if width == 0 {
        return Ok(Vec::new());
    }
    (0..count).map(|_| reader.read_u(width)).collect()
}

fn read_signed<T: PrimInt + FromPrimitive>(
    reader: &mut BitReader<'_>,
    width: usize,
    count: usize,
) -> Result<Vec<T>, BitError> {
    if width == 0 {
        return Ok(Vec::new());
    }
    (0..count).map(|_| reader.read_i(width)).collect()
}

fn read_flags(
    reader: &mut BitReader<'_>,
    width: usize,
    count: usize,
) -> Result<Vec<bool>, BitError> {
    if width == 0 {
        return Ok(Vec::new());
    }
    (0..count).map(|_| reader.read_bool()).collect()
}

/// Bytes needed for `bits`, plus the trailing checksum
fn frame_len_for(bits: usize) -> usize {
    bits.div_ceil(8) + RTCM_CRC_LEN
}

impl BareMsm {
    pub fn decode(frame: &RawFrame) -> Result<Self, DecodeError> {
        let message_number = frame
            .message_number()
            .ok_or_else(|| DecodeError::structure(0, "frame too short for a message number"))?;
        let kind = MsmKind::from_message_number(message_number)
            .ok_or_else(|| DecodeError::structure(message_number, "not a MSM message"))?;
        let (header, offset) = MsmHeader::decode(frame)?;
        let mut reader = BitReader::new(frame.as_bytes(), offset);

        let nsat = header.satellite_count();
        let ncell = header.cell_count();
        if nsat != 0 && ncell == 0 {
            return Err(DecodeError::structure(
                message_number,
                "satellites present without any cell",
            ));
        }

        let widths = kind.msm.field_widths();
        let expected =
            frame_len_for(offset + widths.per_satellite() * nsat + widths.per_cell() * ncell);
        if expected != frame.len() {
            return Err(DecodeError::structure(
                message_number,
                format!(
                    "{} sats and {} cells need a {} byte frame, got {}",
                    nsat,
                    ncell,
                    expected,
                    frame.len()
                ),
            ));
        }

        let satellites = BareSatelliteData {
            rough_range_ms: read_unsigned(&mut reader, widths.rough_range_ms, nsat)?,
            extended_info: read_unsigned(&mut reader, widths.extended_info, nsat)?,
            rough_range_mod: read_unsigned(&mut reader, widths.rough_range_mod, nsat)?,
            rough_phase_rate: read_signed(&mut reader, widths.rough_phase_rate, nsat)?,
        };
        let cells = BareCellData {
            fine_range: read_signed(&mut reader, widths.fine_range, ncell)?,
            fine_phase: read_signed(&mut reader, widths.fine_phase, ncell)?,
            lock_time: read_unsigned(&mut reader, widths.lock_time, ncell)?,
            half_cycle: read_flags(&mut reader, widths.half_cycle, ncell)?,
            cnr: read_unsigned(&mut reader, widths.cnr, ncell)?,
            fine_phase_rate: read_signed(&mut reader, widths.fine_phase_rate, ncell)?,
        };

        let consumed = frame_len_for(reader.offset());
        if consumed != frame.len() {
            return Err(DecodeError::structure(
                message_number,
                format!(
                    "data ends at byte {}, frame has {}",
                    consumed,
                    frame.len()
                ),
            ));
        }
        trace!(
            message = message_number,
            sats = nsat,
            cells = ncell,
            "MSM fields extracted"
        );

        Ok(Self {
            kind,
            header,
            satellites,
            cells,
        })
    }

    /// Checks that every field vector matches the header geometry for this subtype.
    pub(crate) fn check_geometry(&self) -> Result<(), DecodeError> {
        let widths = self.kind.msm.field_widths();
        let nsat = self.header.satellite_count();
        let ncell = self.header.cell_count();
        let expect = |width: usize, count: usize| if width == 0 { 0 } else { count };
        let sats = &self.satellites;
        let cells = &self.cells;
        let consistent = sats.rough_range_ms.len() == expect(widths.rough_range_ms, nsat)
            && sats.extended_info.len() == expect(widths.extended_info, nsat)
            && sats.rough_range_mod.len() == expect(widths.rough_range_mod, nsat)
            && sats.rough_phase_rate.len() == expect(widths.rough_phase_rate, nsat)
            && cells.fine_range.len() == expect(widths.fine_range, ncell)
            && cells.fine_phase.len() == expect(widths.fine_phase, ncell)
            && cells.lock_time.len() == expect(widths.lock_time, ncell)
            && cells.half_cycle.len() == expect(widths.half_cycle, ncell)
            && cells.cnr.len() == expect(widths.cnr, ncell)
            && cells.fine_phase_rate.len() == expect(widths.fine_phase_rate, ncell);
        if consistent {
            Ok(())
        } else {
            Err(DecodeError::structure(
                self.kind.message_number,
                "field counts do not match the masks",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_per_subtype() {
        let bits: Vec<_> = MsmType::ALL
            .iter()
            .map(|t| (t.field_widths().per_satellite(), t.field_widths().per_cell()))
            .collect();
        assert_eq!(
            bits,
            vec![
                (10, 15),
                (10, 27),
                (10, 42),
                (18, 48),
                (36, 63),
                (18, 65),
                (36, 80)
            ]
        );
    }

    #[test]
    fn frame_len_rounds_up() {
        assert_eq!(frame_len_for(24 + 169), 28);
        assert_eq!(frame_len_for(24 + 176), 28);
        assert_eq!(frame_len_for(24 + 177), 29);
    }
}
