//! The 64 byte IAF station header record.
use chrono::{Datelike, NaiveDate};

use crate::channel::ComponentSet;
use crate::constants::{FORMAT_VERSION, HEADER_SIZE};
use crate::sentinel::decode_angle;
use crate::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Station and period description preceding every day block.
/// 16 fixed width fields, 64 bytes, little endian integers and
/// 4 byte left justified ASCII strings.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StationHeader {
    /// 3 letter IAGA observatory code.
    pub station: String,
    /// Calendar day this header describes (wire encoded as YYYYDDD).
    pub date: NaiveDate,
    /// Acquisition colatitude code: `round((90 − latitude) * 1000)`.
    pub colatitude: i32,
    /// Acquisition longitude code: `round(longitude * 1000)`, east positive.
    pub longitude: i32,
    /// Elevation above sea level (m).
    pub elevation: i32,
    /// Recorded components ("XYZG", "HDZF", ...).
    pub components: ComponentSet,
    /// Publishing institution (4 characters on the wire).
    pub institution: String,
    /// Data conversion factor (angle/distance, instrument dependent).
    pub conversion: i32,
    /// Data quality code.
    pub quality: String,
    /// Sensor type descriptor.
    pub sensor_type: String,
    /// Station K9 limit (nT).
    pub k9_limit: i32,
    /// Digital sampling code.
    pub digital_sampling: i32,
    /// Sensor orientation ("XYZF", "HDZF", ...).
    pub orientation: String,
    /// Publication date, day is meaningless (wire encoded as "YYMM").
    pub publication: NaiveDate,
    /// Format version, always 3 on production.
    pub version: i32,
    /// Reserved word, 0 on production.
    pub reserved: i32,
}

fn put_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn get_i32(buf: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

/// Left justified, space padded, truncated to 4 bytes.
fn put_str(buf: &mut [u8], offset: usize, value: &str) {
    let mut field = [b' '; 4];
    for (idx, byte) in value.bytes().take(4).enumerate() {
        field[idx] = byte;
    }
    buf[offset..offset + 4].copy_from_slice(&field);
}

/// Reads a 4 byte string field, trimming padding (space or NUL).
fn get_str(buf: &[u8], offset: usize) -> String {
    let field = &buf[offset..offset + 4];
    let text: String = field
        .iter()
        .map(|b| *b as char)
        .filter(|c| c.is_ascii() && *c != '\0')
        .collect();
    text.trim().to_string()
}

/// Two digit year pivot used by the "YYMM" publication field:
/// 00..=68 maps onto 20xx, 69..=99 onto 19xx.
fn publication_year(two_digits: i32) -> i32 {
    if two_digits <= 68 {
        2000 + two_digits
    } else {
        1900 + two_digits
    }
}

impl StationHeader {
    /// Packs this header into its 64 byte wire form.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        put_str(&mut buf, 0, &self.station.to_uppercase());
        put_i32(
            &mut buf,
            4,
            self.date.year() * 1000 + self.date.ordinal() as i32,
        );
        put_i32(&mut buf, 8, self.colatitude);
        put_i32(&mut buf, 12, self.longitude);
        put_i32(&mut buf, 16, self.elevation);
        put_str(&mut buf, 20, &self.components.wire_code());
        put_str(&mut buf, 24, &self.institution);
        put_i32(&mut buf, 28, self.conversion);
        put_str(&mut buf, 32, &self.quality);
        put_str(&mut buf, 36, &self.sensor_type);
        put_i32(&mut buf, 40, self.k9_limit);
        put_i32(&mut buf, 44, self.digital_sampling);
        put_str(&mut buf, 48, &self.orientation.to_uppercase());
        let publication = format!(
            "{:02}{:02}",
            self.publication.year() % 100,
            self.publication.month()
        );
        put_str(&mut buf, 52, &publication);
        put_i32(&mut buf, 56, self.version);
        put_i32(&mut buf, 60, self.reserved);
        buf
    }

    /// Unpacks a 64 byte station header.
    /// [Error::FormatMismatch] when the slice is not exactly 64 bytes
    /// or the embedded YYYYDDD date is not a valid calendar date:
    /// both conditions mean "this is not an IAF stream".
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() != HEADER_SIZE {
            return Err(Error::FormatMismatch);
        }
        let code = get_i32(buf, 4);
        // seven digits: four digit year + three digit day of year
        if !(1_000_000..=9_999_999).contains(&code) {
            return Err(Error::FormatMismatch);
        }
        let date = NaiveDate::from_yo_opt(code / 1000, (code % 1000) as u32)
            .ok_or(Error::FormatMismatch)?;
        let publication_field = get_str(buf, 52);
        let publication = if publication_field.len() == 4 {
            let year: i32 = publication_field[..2].parse().map_err(|_| Error::FormatMismatch)?;
            let month: u32 = publication_field[2..].parse().map_err(|_| Error::FormatMismatch)?;
            NaiveDate::from_ymd_opt(publication_year(year), month, 1)
                .ok_or(Error::FormatMismatch)?
        } else {
            date
        };
        Ok(Self {
            station: get_str(buf, 0),
            date,
            colatitude: get_i32(buf, 8),
            longitude: get_i32(buf, 12),
            elevation: get_i32(buf, 16),
            components: ComponentSet::from_code(&get_str(buf, 20)),
            institution: get_str(buf, 24),
            conversion: get_i32(buf, 28),
            quality: get_str(buf, 32),
            sensor_type: get_str(buf, 36),
            k9_limit: get_i32(buf, 40),
            digital_sampling: get_i32(buf, 44),
            orientation: get_str(buf, 48),
            publication,
            version: get_i32(buf, 56),
            reserved: get_i32(buf, 60),
        })
    }

    /// Format sniffing helper: true when `buf` opens with a well
    /// formed station header.
    pub fn sniff(buf: &[u8]) -> bool {
        buf.len() >= HEADER_SIZE && Self::decode(&buf[..HEADER_SIZE]).is_ok()
    }

    /// Acquisition latitude in degrees (90° − colatitude).
    pub fn latitude(&self) -> f64 {
        90.0 - decode_angle(self.colatitude)
    }

    /// Acquisition longitude in degrees, east positive.
    pub fn longitude_degrees(&self) -> f64 {
        decode_angle(self.longitude)
    }

    /// Same header, different calendar day.
    pub fn for_date(&self, date: NaiveDate) -> Self {
        let mut header = self.clone();
        header.date = date;
        header
    }
}

impl Default for StationHeader {
    fn default() -> Self {
        Self {
            station: String::new(),
            date: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
            colatitude: 0,
            longitude: 0,
            elevation: 0,
            components: ComponentSet::from_code("XYZF"),
            institution: String::new(),
            conversion: 0,
            quality: String::new(),
            sensor_type: String::new(),
            k9_limit: 0,
            digital_sampling: 0,
            orientation: String::new(),
            publication: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
            version: FORMAT_VERSION,
            reserved: 0,
        }
    }
}
