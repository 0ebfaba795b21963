use crate::{
    bits::BitReader,
    constants::{RTCM_MSG_NUM_BIT_LEN, RTCM_MSG_NUM_BIT_OFFSET},
    error::DecodeError,
    parser::RawFrame,
};

/// Size of the fixed MSM header, message number to signal mask inclusive
pub const MSM_HEADER_BITS: usize = 169;

const SATELLITE_MASK_BITS: usize = 64;
const SIGNAL_MASK_BITS: usize = 32;
const MAX_CELL_MASK_BITS: usize = 64;

/// Fixed MSM header plus the variable cell mask.
///
/// All masks are stored bit-reversed compared to the wire: bit `i` of
/// `satellite_mask` stands for satellite `i + 1`, bit `j` of `signal_mask`
/// for signal `j + 1`, bit `k` of `cell_mask` for the `k`-th cell slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MsmHeader {
    pub message_number: u16,
    pub station_id: u16,
    /// Raw 30-bit epoch time, GLONASS packs day of week in the top 3 bits
    pub epoch_time: u32,
    pub multiple_message: bool,
    pub iods: u8,
    pub clock_steering: u8,
    pub external_clock: u8,
    pub smoothing_indicator: bool,
    pub smoothing_interval: u8,
    pub satellite_mask: u64,
    pub signal_mask: u32,
    pub cell_mask: u64,
}

/// One present satellite/signal combination, in transmission order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Position among the present satellites
    pub satellite_index: usize,
    /// 1-based satellite id
    pub satellite: u8,
    /// 1-based MSM signal id
    pub signal: u8,
}

fn mask_ids(mask: u64) -> impl Iterator<Item = u8> {
    (0u8..64).filter(move |i| mask >> i & 1 == 1).map(|i| i + 1)
}

impl MsmHeader {
    /// Decodes header and cell mask, returning the bit offset of the first data field.
    ///
    /// `frame` must carry a MSM message; only the header layout is checked here.
    pub fn decode(frame: &RawFrame) -> Result<(Self, usize), DecodeError> {
        let payload_bits = frame.payload().len() * 8;
        let mut reader = BitReader::new(frame.as_bytes(), RTCM_MSG_NUM_BIT_OFFSET);
        let message_number: u16 = reader.read_u(RTCM_MSG_NUM_BIT_LEN)?;
        if payload_bits < MSM_HEADER_BITS {
            return Err(DecodeError::structure(
                message_number,
                format!("payload of {payload_bits} bits cannot hold the MSM header"),
            ));
        }

        let mut header = MsmHeader {
            message_number,
            station_id: reader.read_u(12)?,
            epoch_time: reader.read_u(30)?,
            multiple_message: reader.read_bool()?,
            iods: reader.read_u(3)?,
            ..Default::default()
        };
        reader.skip(7)?;
        header.clock_steering = reader.read_u(2)?;
        header.external_clock = reader.read_u(2)?;
        header.smoothing_indicator = reader.read_bool()?;
        header.smoothing_interval = reader.read_u(3)?;
        header.satellite_mask = reader.read_mask(SATELLITE_MASK_BITS)?;
        // 32-bit masks always fit u32
        header.signal_mask = reader.read_mask(SIGNAL_MASK_BITS)? as u32;

        if header.satellite_mask == 0 {
            return Ok((header, reader.offset()));
        }

        let cell_bits = header.satellite_count() * header.signal_count();
        if cell_bits == 0 {
            return Err(DecodeError::structure(
                message_number,
                "satellites present without any signal",
            ));
        }
        if cell_bits > MAX_CELL_MASK_BITS {
            return Err(DecodeError::structure(
                message_number,
                format!("cell mask of {cell_bits} bits exceeds {MAX_CELL_MASK_BITS}"),
            ));
        }
        if cell_bits > payload_bits - MSM_HEADER_BITS {
            return Err(DecodeError::structure(
                message_number,
                format!("cell mask of {cell_bits} bits overruns the declared length"),
            ));
        }
        header.cell_mask = reader.read_mask(cell_bits)?;
        Ok((header, reader.offset()))
    }

    pub fn satellite_count(&self) -> usize {
        self.satellite_mask.count_ones() as usize
    }

    pub fn signal_count(&self) -> usize {
        self.signal_mask.count_ones() as usize
    }

    pub fn cell_count(&self) -> usize {
        self.cell_mask.count_ones() as usize
    }

    /// No satellite, no data: a valid but empty message
    pub fn is_empty(&self) -> bool {
        self.satellite_mask == 0
    }

    /// Present satellite ids, ascending
    pub fn satellites(&self) -> impl Iterator<Item = u8> {
        mask_ids(self.satellite_mask)
    }

    /// Present signal ids, ascending
    pub fn signals(&self) -> impl Iterator<Item = u8> {
        mask_ids(u64::from(self.signal_mask))
    }

    /// Present cells, satellite-major like on the wire
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let signals: Vec<u8> = self.signals().collect();
        let nsig = signals.len();
        self.satellites()
            .enumerate()
            .flat_map(move |(satellite_index, satellite)| {
                let slots = self
                    .cell_mask
                    .checked_shr((satellite_index * nsig) as u32)
                    .unwrap_or(0)
                    & low_bits(nsig);
                signals
                    .iter()
                    .enumerate()
                    .filter(move |(j, _)| slots >> j & 1 == 1)
                    .map(move |(_, &signal)| Cell {
                        satellite_index,
                        satellite,
                        signal,
                    })
                    .collect::<Vec<_>>()
            })
    }
}

fn low_bits(len: usize) -> u64 {
    if len >= 64 {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}
