#![allow(dead_code)]

//! Forging of RTCM3 frames and MSM payloads for the integration tests.

use byteorder::{BigEndian, WriteBytesExt};
use rtcm3::{
    crc24q,
    msm::{BareCellData, BareSatelliteData},
    MsmKind, MsmType, RawFrame, RTCM_PREAMBLE,
};

/// Message 1005 with a short body
pub const FRAME_A: [u8; 12] = [
    0xd3, 0x00, 0x06, 0x3e, 0xd0, 0x00, 0x01, 0x02, 0x03, 0xb1, 0xdf, 0xca,
];
/// Message 1029 with a short body
pub const FRAME_B: [u8; 12] = [
    0xd3, 0x00, 0x06, 0x40, 0x50, 0x17, 0x00, 0x84, 0x73, 0xa8, 0xb3, 0x6d,
];
/// Message 1077, truncated body
pub const FRAME_C: [u8; 10] = [0xd3, 0x00, 0x04, 0x43, 0x50, 0x11, 0x22, 0xd5, 0xb2, 0xee];

/// Wraps `payload` into a frame the way a receiver would emit it.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut wtr = Vec::with_capacity(payload.len() + 6);
    wtr.write_u8(RTCM_PREAMBLE).unwrap();
    wtr.write_u16::<BigEndian>(payload.len() as u16).unwrap();
    wtr.extend_from_slice(payload);
    let crc = crc24q(&wtr);
    wtr.write_u24::<BigEndian>(crc).unwrap();
    wtr
}

/// MSB-first bit packer
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    len: usize,
}

impl BitWriter {
    pub fn push(&mut self, value: u64, width: usize) {
        for i in (0..width).rev() {
            self.push_bit(value >> i & 1 == 1);
        }
    }

    pub fn push_signed(&mut self, value: i64, width: usize) {
        self.push(value as u64, width);
    }

    pub fn push_bit(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> (self.len % 8);
        }
        self.len += 1;
    }

    pub fn bit_len(&self) -> usize {
        self.len
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Field widths per subtype, in transmission order:
/// ms, ext info, rough mod, rough rate | fine range, fine phase, lock, hc, cnr, fine rate
pub fn widths(msm: MsmType) -> ([usize; 4], [usize; 6]) {
    match msm {
        MsmType::Msm1 => ([0, 0, 10, 0], [15, 0, 0, 0, 0, 0]),
        MsmType::Msm2 => ([0, 0, 10, 0], [0, 22, 4, 1, 0, 0]),
        MsmType::Msm3 => ([0, 0, 10, 0], [15, 22, 4, 1, 0, 0]),
        MsmType::Msm4 => ([8, 0, 10, 0], [15, 22, 4, 1, 6, 0]),
        MsmType::Msm5 => ([8, 4, 10, 14], [15, 22, 4, 1, 6, 15]),
        MsmType::Msm6 => ([8, 0, 10, 0], [20, 24, 10, 1, 10, 0]),
        MsmType::Msm7 => ([8, 4, 10, 14], [20, 24, 10, 1, 10, 15]),
    }
}

/// Description of a MSM message, serialized by [MsmBuilder::payload].
#[derive(Debug, Clone, Default)]
pub struct MsmBuilder {
    pub message: u16,
    pub station_id: u16,
    pub epoch_time: u32,
    pub multiple_message: bool,
    pub iods: u8,
    pub clock_steering: u8,
    pub external_clock: u8,
    pub smoothing_indicator: bool,
    pub smoothing_interval: u8,
    /// 1-based, ascending
    pub satellites: Vec<u8>,
    /// 1-based, ascending
    pub signals: Vec<u8>,
    /// Satellite-major presence of every satellite/signal slot
    pub cells: Vec<bool>,
    pub sat_data: BareSatelliteData,
    pub cell_data: BareCellData,
}

impl MsmBuilder {
    pub fn new(message: u16) -> Self {
        Self {
            message,
            ..Default::default()
        }
    }

    /// Every slot of `satellites` x `signals` present
    pub fn with_geometry(mut self, satellites: &[u8], signals: &[u8]) -> Self {
        self.satellites = satellites.to_vec();
        self.signals = signals.to_vec();
        self.cells = vec![true; satellites.len() * signals.len()];
        self
    }

    pub fn msm(&self) -> MsmType {
        MsmKind::from_message_number(self.message).unwrap().msm
    }

    pub fn payload(&self) -> Vec<u8> {
        let mut w = BitWriter::default();
        w.push(u64::from(self.message), 12);
        w.push(u64::from(self.station_id), 12);
        w.push(u64::from(self.epoch_time), 30);
        w.push_bit(self.multiple_message);
        w.push(u64::from(self.iods), 3);
        w.push(0, 7);
        w.push(u64::from(self.clock_steering), 2);
        w.push(u64::from(self.external_clock), 2);
        w.push_bit(self.smoothing_indicator);
        w.push(u64::from(self.smoothing_interval), 3);
        for id in 1..=64 {
            w.push_bit(self.satellites.contains(&id));
        }
        for id in 1..=32 {
            w.push_bit(self.signals.contains(&id));
        }
        if !self.satellites.is_empty() {
            for &cell in &self.cells {
                w.push_bit(cell);
            }
        }

        let (sat_w, cell_w) = widths(self.msm());
        let sats = &self.sat_data;
        push_all(&mut w, sat_w[0], sats.rough_range_ms.iter().map(|&v| u64::from(v)));
        push_all(&mut w, sat_w[1], sats.extended_info.iter().map(|&v| u64::from(v)));
        push_all(&mut w, sat_w[2], sats.rough_range_mod.iter().map(|&v| u64::from(v)));
        push_all(&mut w, sat_w[3], sats.rough_phase_rate.iter().map(|&v| v as u64));
        let cells = &self.cell_data;
        push_all(&mut w, cell_w[0], cells.fine_range.iter().map(|&v| v as u64));
        push_all(&mut w, cell_w[1], cells.fine_phase.iter().map(|&v| v as u64));
        push_all(&mut w, cell_w[2], cells.lock_time.iter().map(|&v| u64::from(v)));
        push_all(&mut w, cell_w[3], cells.half_cycle.iter().map(|&v| u64::from(v)));
        push_all(&mut w, cell_w[4], cells.cnr.iter().map(|&v| u64::from(v)));
        push_all(&mut w, cell_w[5], cells.fine_phase_rate.iter().map(|&v| v as u64));
        w.into_bytes()
    }

    pub fn frame(&self) -> Vec<u8> {
        frame(&self.payload())
    }

    pub fn raw(&self) -> RawFrame {
        RawFrame::from_bytes(self.frame()).unwrap()
    }
}

fn push_all(w: &mut BitWriter, width: usize, values: impl Iterator<Item = u64>) {
    if width == 0 {
        return;
    }
    for v in values {
        w.push(v, width);
    }
}

/// Same value for every satellite / cell
pub fn fill<T: Clone>(value: T, count: usize) -> Vec<T> {
    vec![value; count]
}

pub fn assert_close(got: f64, expect: f64) {
    assert!(
        (got - expect).abs() < 1e-6,
        "got {got}, expect {expect}"
    );
}
