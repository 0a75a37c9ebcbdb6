//! One calendar day of archive data: the 23488 byte block.
use chrono::NaiveDate;

use crate::constants::{
    BLOCK_SIZE, FIELD_SLOTS, HOURS_PER_DAY, K_PER_DAY, MINUTES_PER_DAY, MISSING_FIELD, MISSING_K,
    RESERVED_WORDS,
};
use crate::sentinel::{decode_field, decode_k, FieldClass};
use crate::Error;

/// A decoded IAF day block. Every field is a raw scaled integer;
/// use the accessor methods for sentinel aware physical values.
///
/// Wire layout, all little endian `i32`, in order: minute X/Y/Z/ΔF
/// (4×1440), hourly means X/Y/Z/ΔF (4×24), daily means X/Y/Z/ΔF
/// (4×1), eight 3-hour K values, four reserved words.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DayBlock {
    /// Calendar day, carried by the preceding station header.
    pub date: NaiveDate,
    /// Minute samples per slot.
    pub minutes: [[i32; MINUTES_PER_DAY]; FIELD_SLOTS],
    /// Hourly means per slot.
    pub hours: [[i32; HOURS_PER_DAY]; FIELD_SLOTS],
    /// Daily mean per slot.
    pub daily: [i32; FIELD_SLOTS],
    /// 3-hour K indices.
    pub k: [i32; K_PER_DAY],
    /// Reserved words, 0 on production.
    pub reserved: [i32; RESERVED_WORDS],
}

impl DayBlock {
    /// A block with every sample missing.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            minutes: [[MISSING_FIELD; MINUTES_PER_DAY]; FIELD_SLOTS],
            hours: [[MISSING_FIELD; HOURS_PER_DAY]; FIELD_SLOTS],
            daily: [MISSING_FIELD; FIELD_SLOTS],
            k: [MISSING_K; K_PER_DAY],
            reserved: [0; RESERVED_WORDS],
        }
    }

    /// Packs this block into its fixed wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BLOCK_SIZE);
        for slot in &self.minutes {
            for value in slot {
                buf.extend_from_slice(&value.to_le_bytes());
            }
        }
        for slot in &self.hours {
            for value in slot {
                buf.extend_from_slice(&value.to_le_bytes());
            }
        }
        for value in &self.daily {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        for value in &self.k {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        for value in &self.reserved {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf
    }

    /// Unpacks one day block. [Error::NotEnoughBytes] on a short
    /// slice; the reader treats that as end of archive, never as a
    /// hard failure.
    pub fn decode(buf: &[u8], date: NaiveDate) -> Result<Self, Error> {
        if buf.len() < BLOCK_SIZE {
            return Err(Error::NotEnoughBytes);
        }
        let mut offset = 0;
        let mut next = || {
            let value = i32::from_le_bytes([
                buf[offset],
                buf[offset + 1],
                buf[offset + 2],
                buf[offset + 3],
            ]);
            offset += 4;
            value
        };
        let mut block = Self::empty(date);
        for slot in 0..FIELD_SLOTS {
            for minute in 0..MINUTES_PER_DAY {
                block.minutes[slot][minute] = next();
            }
        }
        for slot in 0..FIELD_SLOTS {
            for hour in 0..HOURS_PER_DAY {
                block.hours[slot][hour] = next();
            }
        }
        for slot in 0..FIELD_SLOTS {
            block.daily[slot] = next();
        }
        for idx in 0..K_PER_DAY {
            block.k[idx] = next();
        }
        for idx in 0..RESERVED_WORDS {
            block.reserved[idx] = next();
        }
        Ok(block)
    }

    /// Minute samples of one slot as physical values (NaN = missing).
    pub fn minute_values(&self, slot: usize) -> Vec<f64> {
        let class = FieldClass::of_slot(slot);
        self.minutes[slot]
            .iter()
            .map(|raw| decode_field(*raw, class))
            .collect()
    }

    /// Hourly means of one slot as physical values (NaN = missing).
    pub fn hour_values(&self, slot: usize) -> Vec<f64> {
        let class = FieldClass::of_slot(slot);
        self.hours[slot]
            .iter()
            .map(|raw| decode_field(*raw, class))
            .collect()
    }

    /// Daily mean of one slot as a physical value (NaN = missing).
    pub fn daily_value(&self, slot: usize) -> f64 {
        decode_field(self.daily[slot], FieldClass::of_slot(slot))
    }

    /// The eight K indices as physical values (NaN = missing).
    pub fn k_values(&self) -> Vec<f64> {
        self.k.iter().map(|raw| decode_k(*raw)).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sentinel::encode_field;
    use rand::Rng;

    #[test]
    fn fixed_block_size() {
        assert_eq!(BLOCK_SIZE, 23488);
        let date = NaiveDate::from_ymd_opt(2010, 3, 1).unwrap();
        assert_eq!(DayBlock::empty(date).encode().len(), BLOCK_SIZE);
    }

    #[test]
    fn round_trip_mixed_content() {
        let date = NaiveDate::from_ymd_opt(2010, 3, 1).unwrap();
        let mut rng = rand::thread_rng();
        let mut block = DayBlock::empty(date);
        for slot in 0..FIELD_SLOTS {
            for minute in 0..MINUTES_PER_DAY {
                block.minutes[slot][minute] = if rng.gen_bool(0.1) {
                    MISSING_FIELD
                } else {
                    encode_field(rng.gen_range(-4444.0..8888.0))
                };
            }
            for hour in 0..HOURS_PER_DAY {
                block.hours[slot][hour] = encode_field(rng.gen_range(-4444.0..8888.0));
            }
            block.daily[slot] = encode_field(rng.gen_range(-4444.0..8888.0));
        }
        for idx in 0..K_PER_DAY {
            block.k[idx] = rng.gen_range(0..=90);
        }
        let encoded = block.encode();
        let decoded = DayBlock::decode(&encoded, date).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn short_slice_is_not_a_block() {
        let date = NaiveDate::from_ymd_opt(2010, 3, 1).unwrap();
        let encoded = DayBlock::empty(date).encode();
        assert!(matches!(
            DayBlock::decode(&encoded[..BLOCK_SIZE - 1], date),
            Err(Error::NotEnoughBytes)
        ));
    }

    #[test]
    fn sentinel_aware_accessors() {
        let date = NaiveDate::from_ymd_opt(2010, 3, 1).unwrap();
        let mut block = DayBlock::empty(date);
        block.minutes[0][0] = encode_field(8000.0);
        block.k[0] = 30;
        let minutes = block.minute_values(0);
        assert_eq!(minutes[0], 8000.0);
        assert!(minutes[1].is_nan());
        assert!(block.daily_value(0).is_nan());
        let k = block.k_values();
        assert_eq!(k[0], 30.0);
        assert!(k[1].is_nan());
    }
}
