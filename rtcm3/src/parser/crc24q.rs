use crate::ParserError;

/// CRC-24Q generator polynomial, x^24 + x^23 + x^18 + x^17 + x^14 + x^11 + x^10 + x^7 + x^6 + x^5 + x^4 + x^3 + x + 1
pub const CRC24Q_POLY: u32 = 0x0186_4cfb;

const CRC24Q_MASK: u32 = 0x00ff_ffff;

const CRC24Q_TABLE: [u32; 256] = make_table();

const fn make_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 16;
        let mut bit = 0;
        while bit < 8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24Q_POLY;
            }
            bit += 1;
        }
        table[i] = crc & CRC24Q_MASK;
        i += 1;
    }
    table
}

/// [CRC-24Q](https://gssc.esa.int/navipedia/index.php/CRC-24Q) calculator supporting both
/// streaming and single-shot use. Initial value is zero, there is no final XOR.
#[derive(Default, Debug, Clone, Copy)]
pub struct Crc24Q {
    crc: u32,
}

impl Crc24Q {
    pub const fn new() -> Self {
        Self { crc: 0 }
    }

    /// Update checksum with new bytes
    pub const fn update(&mut self, bytes: &[u8]) {
        let mut i = 0;
        while i < bytes.len() {
            self.update_byte(bytes[i]);
            i += 1;
        }
    }

    pub const fn update_byte(&mut self, byte: u8) {
        let idx = ((self.crc >> 16) ^ byte as u32) & 0xff;
        self.crc = ((self.crc << 8) & CRC24Q_MASK) ^ CRC24Q_TABLE[idx as usize];
    }

    /// Get the current checksum result
    pub const fn result(self) -> u32 {
        self.crc
    }

    pub(crate) fn validate_result(self, received: u32) -> Result<(), ParserError> {
        if self.crc == received {
            Ok(())
        } else {
            Err(ParserError::InvalidChecksum {
                expect: received,
                got: self.crc,
            })
        }
    }
}

/// Single-shot CRC-24Q over `bytes`
pub const fn crc24q(bytes: &[u8]) -> u32 {
    let mut calc = Crc24Q::new();
    calc.update(bytes);
    calc.result()
}
