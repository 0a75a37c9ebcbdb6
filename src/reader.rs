//! Sequential archive decoding.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use log::{debug, warn};

use crate::block::DayBlock;
use crate::channel::Channel;
use crate::constants::{BLOCK_SIZE, FIELD_SLOTS, HEADER_SIZE};
use crate::header::StationHeader;
use crate::series::TimeSeries;
use crate::Error;

/// Aggregation granularity a decoded archive can be materialized at.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Resolution {
    /// 1440 samples per day, 60 s period.
    #[default]
    Minute,
    /// 24 hourly means per day, timestamped at half past.
    Hour,
    /// One daily mean per day.
    Day,
    /// Eight 3-hour K indices per day, timestamped at +90 minutes.
    K,
}

impl Resolution {
    /// Sampling period of the materialized series.
    pub fn sampling_period(&self) -> Duration {
        match self {
            Self::Minute => Duration::seconds(60),
            Self::Hour => Duration::seconds(3_600),
            Self::Day => Duration::seconds(86_400),
            Self::K => Duration::seconds(10_800),
        }
    }

    /// Offset of the first timestamp from the day/window start.
    pub fn offset(&self) -> Duration {
        match self {
            Self::Hour => Duration::minutes(30),
            Self::K => Duration::minutes(90),
            _ => Duration::zero(),
        }
    }
}

/// Inclusive calendar day window applied while decoding. Blocks
/// outside the window are still decoded (the stream has no index,
/// position must advance block by block) but dropped from the result.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TimeFrame {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl TimeFrame {
    pub fn starting(start: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }
    pub fn ending(end: NaiveDate) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(start) = self.start {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if date > end {
                return false;
            }
        }
        true
    }
}

/// Streaming (header, block) pair decoder over any [Read]able
/// interface. A short or corrupt trailing record after at least one
/// successful pair terminates the iteration silently: IAF archives
/// in the wild carry trailing garbage more often than not.
pub struct Decoder<R: Read> {
    reader: R,
    decoded: usize,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, decoded: 0 }
    }

    /// Reads exactly `buf.len()` bytes; Ok(false) on immediate EOF.
    fn fill(&mut self, buf: &mut [u8]) -> Result<bool, Error> {
        let mut offset = 0;
        while offset < buf.len() {
            let size = self.reader.read(&mut buf[offset..])?;
            if size == 0 {
                if offset == 0 {
                    return Ok(false);
                }
                return Err(Error::NotEnoughBytes);
            }
            offset += size;
        }
        Ok(true)
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<(StationHeader, DayBlock), Error>;
    /// Decodes the next (header, block) pair from the stream.
    fn next(&mut self) -> Option<Self::Item> {
        let mut header_buf = [0u8; HEADER_SIZE];
        match self.fill(&mut header_buf) {
            Ok(true) => {},
            Ok(false) => return None,
            Err(e) => {
                if self.decoded > 0 {
                    debug!("trailing {} ignored after {} day(s)", e, self.decoded);
                    return None;
                }
                return Some(Err(e));
            },
        }
        let header = match StationHeader::decode(&header_buf) {
            Ok(header) => header,
            Err(e) => {
                if self.decoded > 0 {
                    debug!("trailing {} ignored after {} day(s)", e, self.decoded);
                    return None;
                }
                return Some(Err(e));
            },
        };
        let mut block_buf = vec![0u8; BLOCK_SIZE];
        match self.fill(&mut block_buf) {
            Ok(true) => {},
            _ => {
                if self.decoded > 0 {
                    debug!("short final record ignored after {} day(s)", self.decoded);
                    return None;
                }
                return Some(Err(Error::NotEnoughBytes));
            },
        }
        match DayBlock::decode(&block_buf, header.date) {
            Ok(block) => {
                self.decoded += 1;
                Some(Ok((header, block)))
            },
            Err(e) => {
                if self.decoded > 0 {
                    return None;
                }
                Some(Err(e))
            },
        }
    }
}

/// Format sniffing: true when the file opens with a well formed
/// 64 byte station header. Does not decode any day block.
pub fn is_iaf_file(path: &Path) -> bool {
    let mut buf = [0u8; HEADER_SIZE];
    match File::open(path) {
        Ok(mut fd) => match fd.read_exact(&mut buf) {
            Ok(_) => StationHeader::sniff(&buf),
            Err(_) => false,
        },
        Err(_) => false,
    }
}

/// A fully decoded IAF archive: the first station header plus all
/// day blocks retained by the (optional) time frame, in stream order.
#[derive(Clone, Debug, PartialEq)]
pub struct Archive {
    /// Station metadata, latched from the first decoded header.
    pub header: StationHeader,
    /// Retained day blocks.
    pub days: Vec<DayBlock>,
}

impl Archive {
    /// Decodes every (header, block) pair offered by `reader`.
    pub fn from_reader<R: Read>(reader: R, frame: Option<TimeFrame>) -> Result<Self, Error> {
        let mut decoder = Decoder::new(reader);
        let mut header: Option<StationHeader> = None;
        let mut days = Vec::new();
        for pair in decoder.by_ref() {
            let (day_header, block) = pair?;
            if header.is_none() {
                header = Some(day_header.clone());
            }
            match frame {
                Some(frame) if !frame.contains(day_header.date) => {
                    debug!("dropping {} (outside requested frame)", day_header.date);
                },
                _ => days.push(block),
            }
        }
        let header = header.ok_or(Error::FormatMismatch)?;
        if days.is_empty() {
            warn!("{}: no day block retained", header.station);
        }
        Ok(Self { header, days })
    }

    /// Decodes a complete file.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        Self::from_reader(File::open(path)?, None)
    }

    /// Decodes a file, retaining only days inside `frame`.
    pub fn from_file_with(path: &Path, frame: TimeFrame) -> Result<Self, Error> {
        Self::from_reader(File::open(path)?, Some(frame))
    }

    /// Decodes an in-memory archive.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_reader(bytes, None)
    }

    /// Calendar day of the earliest retained block.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.iter().map(|day| day.date).min()
    }

    /// Materializes the archive at the requested [Resolution].
    /// None when no day block was retained. Field channels are
    /// labeled from the header component code; the K series exposes
    /// the `k` and `ir` channels.
    pub fn to_series(&self, resolution: Resolution) -> Option<TimeSeries> {
        let first = self.first_date()?;
        let start = first.and_hms_opt(0, 0, 0).unwrap() + resolution.offset();
        let mut series = TimeSeries::new(start, resolution.sampling_period());

        if resolution == Resolution::K {
            let mut k = Vec::with_capacity(self.days.len() * 8);
            let mut ir = Vec::with_capacity(self.days.len() * 4);
            for day in &self.days {
                k.extend(day.k_values());
                ir.extend(day.reserved.iter().map(|raw| *raw as f64));
            }
            return Some(
                series
                    .with_channel(Channel::K, k)
                    .with_channel(Channel::Ir, ir),
            );
        }

        let slots = self.header.components.slots();
        for slot in 0..FIELD_SLOTS {
            let samples: Vec<f64> = match resolution {
                Resolution::Minute => self
                    .days
                    .iter()
                    .flat_map(|day| day.minute_values(slot))
                    .collect(),
                Resolution::Hour => self
                    .days
                    .iter()
                    .flat_map(|day| day.hour_values(slot))
                    .collect(),
                Resolution::Day => self.days.iter().map(|day| day.daily_value(slot)).collect(),
                Resolution::K => unreachable!(),
            };
            series = series.with_channel(slots[slot], samples);
        }
        Some(series)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel::ComponentSet;
    use crate::constants::{FORMAT_VERSION, MISSING_FIELD};
    use crate::sentinel::{encode_angle, encode_field};

    fn testbench_header(date: NaiveDate) -> StationHeader {
        StationHeader {
            station: "AAA".to_string(),
            date,
            colatitude: encode_angle(90.0 - 43.250),
            longitude: encode_angle(76.920),
            elevation: 1300,
            components: ComponentSet::from_code("XYZG"),
            institution: "GFZ".to_string(),
            conversion: 10000,
            quality: "IMAG".to_string(),
            sensor_type: "FGE".to_string(),
            k9_limit: 300,
            digital_sampling: 1234,
            orientation: "XYZF".to_string(),
            publication: NaiveDate::from_ymd_opt(2011, 6, 1).unwrap(),
            version: FORMAT_VERSION,
            reserved: 0,
        }
    }

    fn testbench_archive(days: u64) -> Vec<u8> {
        let mut bytes = Vec::new();
        let first = NaiveDate::from_ymd_opt(2010, 3, 1).unwrap();
        for offset in 0..days {
            let date = first + Duration::days(offset as i64);
            let header = testbench_header(date);
            let mut block = DayBlock::empty(date);
            for minute in 0..1440 {
                block.minutes[0][minute] = encode_field(100.0 + offset as f64);
            }
            block.daily[0] = encode_field(100.0 + offset as f64);
            block.k[0] = 30;
            bytes.extend_from_slice(&header.encode());
            bytes.extend_from_slice(&block.encode());
        }
        bytes
    }

    #[test]
    fn sequential_decoding() {
        let bytes = testbench_archive(3);
        let archive = Archive::from_bytes(&bytes).unwrap();
        assert_eq!(archive.header.station, "AAA");
        assert_eq!(archive.days.len(), 3);
        assert_eq!(
            archive.first_date(),
            NaiveDate::from_ymd_opt(2010, 3, 1)
        );
    }

    #[test]
    fn trailing_garbage_tolerated() {
        let mut bytes = testbench_archive(2);
        bytes.extend_from_slice(&[0x55; 300]);
        let archive = Archive::from_bytes(&bytes).unwrap();
        assert_eq!(archive.days.len(), 2);
        // short final record
        let mut bytes = testbench_archive(2);
        bytes.extend_from_slice(&testbench_archive(1)[..5000]);
        let archive = Archive::from_bytes(&bytes).unwrap();
        assert_eq!(archive.days.len(), 2);
    }

    #[test]
    fn not_an_archive() {
        assert!(matches!(
            Archive::from_bytes(&[0u8; 400]),
            Err(Error::FormatMismatch)
        ));
        assert!(Archive::from_bytes(&[]).is_err());
    }

    #[test]
    fn time_frame_filtering() {
        let bytes = testbench_archive(5);
        let frame = TimeFrame::between(
            NaiveDate::from_ymd_opt(2010, 3, 2).unwrap(),
            NaiveDate::from_ymd_opt(2010, 3, 4).unwrap(),
        );
        let archive = Archive::from_reader(bytes.as_slice(), Some(frame)).unwrap();
        assert_eq!(archive.days.len(), 3);
        assert_eq!(
            archive.first_date(),
            NaiveDate::from_ymd_opt(2010, 3, 2)
        );
    }

    #[test]
    fn minute_resolution() {
        let bytes = testbench_archive(2);
        let archive = Archive::from_bytes(&bytes).unwrap();
        let series = archive.to_series(Resolution::Minute).unwrap();
        assert_eq!(series.sampling_period, Duration::seconds(60));
        assert_eq!(series.len(), 2880);
        let x = series.channel(Channel::X).unwrap();
        assert_eq!(x[0], 100.0);
        assert_eq!(x[1440], 101.0);
        // slot 2 (Z) was never written: missing
        let z = series.channel(Channel::Z).unwrap();
        assert!(z[0].is_nan());
        // ΔF slot labeled from the "XYZG" code
        assert!(series.has_channel(Channel::DeltaF));
    }

    #[test]
    fn hour_day_k_resolutions() {
        let bytes = testbench_archive(2);
        let archive = Archive::from_bytes(&bytes).unwrap();

        let hours = archive.to_series(Resolution::Hour).unwrap();
        assert_eq!(hours.len(), 48);
        assert_eq!(hours.start.time(), chrono::NaiveTime::from_hms_opt(0, 30, 0).unwrap());

        let days = archive.to_series(Resolution::Day).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days.channel(Channel::X).unwrap()[1], 101.0);

        let k = archive.to_series(Resolution::K).unwrap();
        assert_eq!(k.sampling_period, Duration::seconds(10_800));
        assert_eq!(k.start.time(), chrono::NaiveTime::from_hms_opt(1, 30, 0).unwrap());
        let kvals = k.channel(Channel::K).unwrap();
        assert_eq!(kvals.len(), 16);
        assert_eq!(kvals[0], 30.0);
        assert!(kvals[1].is_nan());
    }

    #[test]
    fn all_missing_day() {
        let date = NaiveDate::from_ymd_opt(2010, 3, 1).unwrap();
        let header = testbench_header(date);
        let mut bytes = header.encode().to_vec();
        bytes.extend_from_slice(&DayBlock::empty(date).encode());
        let archive = Archive::from_bytes(&bytes).unwrap();
        assert_eq!(archive.days[0].minutes[0][0], MISSING_FIELD);
        let series = archive.to_series(Resolution::Minute).unwrap();
        assert!(series.channel(Channel::X).unwrap().iter().all(|v| v.is_nan()));
    }
}
