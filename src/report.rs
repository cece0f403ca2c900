/// IQ report line formatting.
///
/// Each CTE report becomes one ASCII line:
///
/// `$IQ,<locator-id>,<tag-id>,<timestamp-ms>,<seq>,<channel>,<rssi>,<i0>,<q0>,...,<iN>,<qN>\n`
///
/// Device ids are 48-bit addresses as unsigned decimal; samples are signed
/// 8-bit decimals.
use core::fmt::{self, Write};

use heapless::String;

use crate::radio::{Address, MAX_IQ_SAMPLES};

/// Line prefix identifying an IQ record
pub const IQ_PREFIX: &str = "$IQ";

/// Longest possible IQ line: header plus every sample as "-128,".
pub const MAX_REPORT_LEN: usize = 64 + MAX_IQ_SAMPLES * 5;

/// Buffer type for one formatted IQ line
pub type ReportLine = String<MAX_REPORT_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportError {
    /// The record does not fit in the output buffer
    Overflow,
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Overflow => write!(f, "IQ record exceeds line buffer"),
        }
    }
}

/// One CTE IQ report ready to be written out.
#[derive(Debug, Clone, Copy)]
pub struct IqRecord<'a> {
    pub locator: &'a Address,
    pub tag: &'a Address,
    pub timestamp_ms: u32,
    pub sequence: u8,
    pub channel: u8,
    pub rssi: i8,
    /// Interleaved I/Q samples; an unpaired trailing byte is dropped
    pub samples: &'a [i8],
}

impl IqRecord<'_> {
    /// Write the record, newline included.
    pub fn write_to<W: Write>(&self, w: &mut W) -> fmt::Result {
        write!(
            w,
            "{},{},{},{},{},{},{}",
            IQ_PREFIX,
            self.locator.as_u64(),
            self.tag.as_u64(),
            self.timestamp_ms,
            self.sequence,
            self.channel,
            self.rssi
        )?;
        for pair in self.samples.chunks_exact(2) {
            write!(w, ",{},{}", pair[0], pair[1])?;
        }
        w.write_char('\n')
    }

    pub fn to_line(&self) -> Result<ReportLine, ReportError> {
        let mut line = ReportLine::new();
        self.write_to(&mut line).map_err(|_| ReportError::Overflow)?;
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::AddressKind;

    const LOCATOR: Address = Address::new([0x01, 0x00, 0x00, 0x00, 0x00, 0x00], AddressKind::Public);
    const TAG: Address = Address::new([0x00, 0x01, 0x00, 0x00, 0x00, 0x00], AddressKind::Random);

    fn record(samples: &[i8]) -> IqRecord<'_> {
        IqRecord {
            locator: &LOCATOR,
            tag: &TAG,
            timestamp_ms: 123_456,
            sequence: 9,
            channel: 37,
            rssi: -62,
            samples,
        }
    }

    #[test]
    fn formats_header_and_samples() {
        let line = record(&[1, -2, 127, -128]).to_line().unwrap();
        assert_eq!(line.as_str(), "$IQ,1,256,123456,9,37,-62,1,-2,127,-128\n");
    }

    #[test]
    fn empty_samples_still_newline_terminated() {
        let line = record(&[]).to_line().unwrap();
        assert_eq!(line.as_str(), "$IQ,1,256,123456,9,37,-62\n");
    }

    #[test]
    fn unpaired_trailing_sample_dropped() {
        let line = record(&[5, 6, 7]).to_line().unwrap();
        assert_eq!(line.as_str(), "$IQ,1,256,123456,9,37,-62,5,6\n");
    }

    #[test]
    fn full_buffer_of_minimum_samples_fits() {
        let samples = [-128i8; MAX_IQ_SAMPLES];
        let mut ids = record(&samples);
        let max = Address::new([0xFF; 6], AddressKind::Public);
        ids.locator = &max;
        ids.tag = &max;
        ids.timestamp_ms = u32::MAX;
        ids.rssi = -128;
        let line = ids.to_line().unwrap();
        assert!(line.starts_with("$IQ,281474976710655,281474976710655,4294967295,"));
        assert!(line.ends_with("-128\n"));
        // 127 pairs, last byte unpaired
        assert_eq!(line.matches(',').count(), 6 + (MAX_IQ_SAMPLES / 2) * 2);
    }

    #[test]
    fn overflow_reported_for_small_buffer() {
        let mut small = String::<16>::new();
        assert!(record(&[1, 2]).write_to(&mut small).is_err());
    }

    #[test]
    fn sample_count_matches_pairs() {
        let samples: std::vec::Vec<i8> = (0..40).map(|v| v as i8 - 20).collect();
        let line = record(&samples).to_line().unwrap();
        let fields: std::vec::Vec<&str> = line.trim_end().split(',').collect();
        assert_eq!(fields.len(), 7 + 40);
        assert_eq!(fields[7], "-20");
        assert_eq!(fields[46], "19");
    }
}
