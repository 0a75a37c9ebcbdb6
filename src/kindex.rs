//! Per day K index tables feeding the yearly text summary.
use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::constants::{K_PER_DAY, K_SUM_SATURATION, MISSING_K};
use crate::sentinel::sanitize_k;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Eight 3-hour K values per calendar day. Lifecycle is independent
/// from the binary archive: the producer only consults it to fill
/// the K slots of each day block and to append lines to the yearly
/// `<STATION><yy>K.DKA` summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KIndexTable {
    days: BTreeMap<NaiveDate, [i32; K_PER_DAY]>,
}

impl KIndexTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one day of K values. Out of range slots are stored
    /// as the missing sentinel right away.
    pub fn insert(&mut self, date: NaiveDate, values: [i32; K_PER_DAY]) {
        let mut sane = [MISSING_K; K_PER_DAY];
        for (slot, value) in values.iter().enumerate() {
            sane[slot] = sanitize_k(*value);
        }
        self.days.insert(date, sane);
    }

    /// K values of one day; absent or malformed days yield all
    /// missing slots.
    pub fn day(&self, date: NaiveDate) -> [i32; K_PER_DAY] {
        self.days
            .get(&date)
            .copied()
            .unwrap_or([MISSING_K; K_PER_DAY])
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Daily K sum for the text summary, saturated at 999.
    /// Missing slots contribute their sentinel, so any incomplete
    /// day saturates.
    pub fn day_sum(values: &[i32; K_PER_DAY]) -> i32 {
        let sum: i32 = values.iter().sum();
        sum.min(K_SUM_SATURATION)
    }
}
