use super::Constellation;

/// MSM signal id resolved to its RINEX observation code and carrier
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SignalInfo {
    /// 1-based MSM signal id
    pub id: u8,
    /// RINEX 3 code, e.g. `1C`, `None` for ids reserved in the signal table
    pub rinex_code: Option<&'static str>,
    /// Carrier frequency, [MHz]. GLONASS reports the FDMA center frequency.
    pub carrier_mhz: Option<f64>,
}

impl SignalInfo {
    pub fn new(constellation: Constellation, id: u8) -> Self {
        let rinex_code = rinex_code(constellation, id);
        Self {
            id,
            rinex_code,
            carrier_mhz: rinex_code.and_then(|code| carrier_mhz(constellation, code)),
        }
    }
}

fn rinex_code(constellation: Constellation, id: u8) -> Option<&'static str> {
    use Constellation::*;
    let code = match (constellation, id) {
        (Gps, 2) => "1C",
        (Gps, 3) => "1P",
        (Gps, 4) => "1W",
        (Gps, 8) => "2C",
        (Gps, 9) => "2P",
        (Gps, 10) => "2W",
        (Gps, 15) => "2S",
        (Gps, 16) => "2L",
        (Gps, 17) => "2X",
        (Gps, 22) => "5I",
        (Gps, 23) => "5Q",
        (Gps, 24) => "5X",
        (Gps, 30) => "1S",
        (Gps, 31) => "1L",
        (Gps, 32) => "1X",

        (Glonass, 2) => "1C",
        (Glonass, 3) => "1P",
        (Glonass, 8) => "2C",
        (Glonass, 9) => "2P",

        (Galileo, 2) => "1C",
        (Galileo, 3) => "1A",
        (Galileo, 4) => "1B",
        (Galileo, 5) => "1X",
        (Galileo, 6) => "1Z",
        (Galileo, 8) => "6C",
        (Galileo, 9) => "6A",
        (Galileo, 10) => "6B",
        (Galileo, 11) => "6X",
        (Galileo, 12) => "6Z",
        (Galileo, 14) => "7I",
        (Galileo, 15) => "7Q",
        (Galileo, 16) => "7X",
        (Galileo, 18) => "8I",
        (Galileo, 19) => "8Q",
        (Galileo, 20) => "8X",
        (Galileo, 22) => "5I",
        (Galileo, 23) => "5Q",
        (Galileo, 24) => "5X",

        (Sbas, 2) => "1C",
        (Sbas, 22) => "5I",
        (Sbas, 23) => "5Q",
        (Sbas, 24) => "5X",

        (Qzss, 2) => "1C",
        (Qzss, 9) => "6S",
        (Qzss, 10) => "6L",
        (Qzss, 11) => "6X",
        (Qzss, 15) => "2S",
        (Qzss, 16) => "2L",
        (Qzss, 17) => "2X",
        (Qzss, 22) => "5I",
        (Qzss, 23) => "5Q",
        (Qzss, 24) => "5X",
        (Qzss, 30) => "1S",
        (Qzss, 31) => "1L",
        (Qzss, 32) => "1X",

        (BeiDou, 2) => "2I",
        (BeiDou, 3) => "2Q",
        (BeiDou, 4) => "2X",
        (BeiDou, 8) => "6I",
        (BeiDou, 9) => "6Q",
        (BeiDou, 10) => "6X",
        (BeiDou, 14) => "7I",
        (BeiDou, 15) => "7Q",
        (BeiDou, 16) => "7X",

        (NavIC, 8) => "9A",
        (NavIC, 22) => "5A",

        _ => return None,
    };
    Some(code)
}

/// Carrier by RINEX band digit
fn carrier_mhz(constellation: Constellation, code: &str) -> Option<f64> {
    use Constellation::*;
    let band = code.chars().next()?;
    let freq = match (constellation, band) {
        (Gps | Qzss | Sbas | Galileo, '1') => 1575.42,
        (Gps | Qzss, '2') => 1227.60,
        (Gps | Qzss | Sbas | Galileo | NavIC, '5') => 1176.45,
        (Qzss | Galileo, '6') => 1278.75,
        (Galileo, '7') => 1207.14,
        (Galileo, '8') => 1191.795,
        (Glonass, '1') => 1602.0,
        (Glonass, '2') => 1246.0,
        (BeiDou, '2') => 1561.098,
        (BeiDou, '6') => 1268.52,
        (BeiDou, '7') => 1207.14,
        (NavIC, '9') => 2492.028,
        _ => return None,
    };
    Some(freq)
}
