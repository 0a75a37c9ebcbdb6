//! Evenly sampled multi channel time series.
//!
//! This is the unit the archive reader returns and the producer
//! consumes. The codec only relies on a handful of operations:
//! day range slicing, the guarded mean, the HDZ to XYZ relabel and
//! the ΔF derivation. Anything fancier (filtering, resampling,
//! baseline work) lives outside this crate.
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::channel::Channel;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One labeled channel column. NaN marks missing samples.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelData {
    pub channel: Channel,
    pub samples: Vec<f64>,
}

/// Ordered, evenly sampled, multi channel measurements.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeSeries {
    /// Timestamp of the first sample.
    pub start: NaiveDateTime,
    /// Nominal sampling period.
    #[cfg_attr(feature = "serde", serde(with = "duration_seconds"))]
    pub sampling_period: Duration,
    /// Explicit per sample timestamps. None means perfectly even
    /// sampling from `start`; acquisition chains with clock or DST
    /// artifacts (duplicated minutes) provide the real column.
    pub timestamps: Option<Vec<NaiveDateTime>>,
    /// Channel columns, all of identical length.
    pub channels: Vec<ChannelData>,
}

#[cfg(feature = "serde")]
mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.num_seconds().serialize(s)
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::seconds(i64::deserialize(d)?))
    }
}

impl TimeSeries {
    /// An empty series starting at `start` with the given period.
    pub fn new(start: NaiveDateTime, sampling_period: Duration) -> Self {
        Self {
            start,
            sampling_period,
            timestamps: None,
            channels: Vec::new(),
        }
    }

    /// Attaches an explicit timestamp column (ascending). The first
    /// entry overrides `start`.
    pub fn with_timestamps(mut self, timestamps: Vec<NaiveDateTime>) -> Self {
        if let Some(first) = timestamps.first() {
            self.start = *first;
        }
        self.timestamps = Some(timestamps);
        self
    }

    /// Builder style channel attachment.
    pub fn with_channel(mut self, channel: Channel, samples: Vec<f64>) -> Self {
        self.channels.push(ChannelData { channel, samples });
        self
    }

    /// Number of samples per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map(|c| c.samples.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column of one channel, if recorded.
    pub fn channel(&self, channel: Channel) -> Option<&[f64]> {
        self.channels
            .iter()
            .find(|c| c.channel == channel)
            .map(|c| c.samples.as_slice())
    }

    pub fn has_channel(&self, channel: Channel) -> bool {
        self.channel(channel).is_some()
    }

    /// Timestamp of sample `index`.
    pub fn timestamp(&self, index: usize) -> NaiveDateTime {
        match &self.timestamps {
            Some(timestamps) => timestamps[index],
            None => self.start + self.sampling_period * index as i32,
        }
    }

    /// Timestamp of the last sample.
    pub fn end(&self) -> NaiveDateTime {
        match self.len() {
            0 => self.start,
            n => self.timestamp(n - 1),
        }
    }

    /// Time span between first and last sample, rounded to whole days.
    pub fn span_days(&self) -> i64 {
        let seconds = (self.end() - self.start).num_seconds();
        (seconds + 43_200) / 86_400
    }

    /// Calendar day of the first sample.
    pub fn first_date(&self) -> NaiveDate {
        self.start.date()
    }

    /// All samples falling inside `[00:00, 24:00)` of `date`.
    /// An empty series comes back when the day is not covered.
    pub fn day_slice(&self, date: NaiveDate) -> TimeSeries {
        let day_start = date.and_hms_opt(0, 0, 0).unwrap();
        let day_end = day_start + Duration::days(1);
        let (first, last) = match &self.timestamps {
            Some(timestamps) => {
                let len = self.len().min(timestamps.len());
                let first = timestamps[..len].partition_point(|ts| *ts < day_start);
                let last = timestamps[..len].partition_point(|ts| *ts < day_end);
                (first, last)
            },
            None => {
                let period = self.sampling_period.num_seconds().max(1);
                let len = self.len() as i64;
                let from = (day_start - self.start).num_seconds();
                let first = if from <= 0 {
                    0
                } else {
                    (from + period - 1) / period
                };
                let until = (day_end - self.start).num_seconds();
                let last = ((until + period - 1) / period).clamp(0, len);
                (first.clamp(0, last) as usize, last as usize)
            },
        };

        let start = if first < self.len() {
            self.timestamp(first)
        } else {
            day_start
        };
        let mut sliced = TimeSeries::new(start, self.sampling_period);
        for column in &self.channels {
            sliced.channels.push(ChannelData {
                channel: column.channel,
                samples: column.samples[first..last].to_vec(),
            });
        }
        sliced
    }

    /// Relabels an H/D/Z series onto geographic X/Y/Z axes:
    /// `x = h·cos(d)`, `y = h·sin(d)` with the declination in degrees.
    /// Series without both H and D channels are returned untouched.
    pub fn to_xyz(mut self) -> TimeSeries {
        let (h, d) = match (self.channel(Channel::H), self.channel(Channel::D)) {
            (Some(h), Some(d)) => (h.to_vec(), d.to_vec()),
            _ => return self,
        };
        for column in self.channels.iter_mut() {
            match column.channel {
                Channel::H => {
                    column.channel = Channel::X;
                    column.samples = h
                        .iter()
                        .zip(d.iter())
                        .map(|(h, d)| h * d.to_radians().cos())
                        .collect();
                },
                Channel::D => {
                    column.channel = Channel::Y;
                    column.samples = h
                        .iter()
                        .zip(d.iter())
                        .map(|(h, d)| h * d.to_radians().sin())
                        .collect();
                },
                _ => {},
            }
        }
        self
    }

    /// Derives ΔF = F − |(X, Y, Z)| and attaches it as a new channel.
    /// Requires F plus the three vector components; NaN propagates.
    pub fn with_delta_f(mut self) -> TimeSeries {
        let f = match self.channel(Channel::F) {
            Some(f) => f.to_vec(),
            None => return self,
        };
        let (x, y, z) = match (
            self.channel(Channel::X),
            self.channel(Channel::Y),
            self.channel(Channel::Z),
        ) {
            (Some(x), Some(y), Some(z)) => (x.to_vec(), y.to_vec(), z.to_vec()),
            _ => return self,
        };
        let delta: Vec<f64> = (0..f.len())
            .map(|i| f[i] - (x[i] * x[i] + y[i] * y[i] + z[i] * z[i]).sqrt())
            .collect();
        self.channels.push(ChannelData {
            channel: Channel::DeltaF,
            samples: delta,
        });
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn minute_series(date: (i32, u32, u32), days: usize) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let n = days * 1440;
        TimeSeries::new(start, Duration::seconds(60))
            .with_channel(Channel::X, vec![1.0; n])
            .with_channel(Channel::Y, vec![2.0; n])
            .with_channel(Channel::Z, vec![3.0; n])
    }

    #[test]
    fn day_slicing() {
        let series = minute_series((2010, 3, 1), 3);
        let day = series.day_slice(NaiveDate::from_ymd_opt(2010, 3, 2).unwrap());
        assert_eq!(day.len(), 1440);
        assert_eq!(
            day.start,
            NaiveDate::from_ymd_opt(2010, 3, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        // uncovered day
        let day = series.day_slice(NaiveDate::from_ymd_opt(2010, 4, 1).unwrap());
        assert!(day.is_empty());
    }

    #[test]
    fn span_rounds_to_days() {
        let series = minute_series((2010, 3, 1), 28);
        // 28 × 1440 samples: last timestamp is 23:59 of day 28
        assert_eq!(series.span_days(), 28);
        let series = minute_series((2010, 3, 1), 27);
        assert_eq!(series.span_days(), 27);
    }

    #[test]
    fn hdz_relabel() {
        let start = NaiveDate::from_ymd_opt(2010, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let series = TimeSeries::new(start, Duration::seconds(60))
            .with_channel(Channel::H, vec![100.0])
            .with_channel(Channel::D, vec![60.0])
            .with_channel(Channel::Z, vec![50.0]);
        let series = series.to_xyz();
        assert!(series.has_channel(Channel::X));
        assert!(series.has_channel(Channel::Y));
        assert!(!series.has_channel(Channel::H));
        let x = series.channel(Channel::X).unwrap()[0];
        let y = series.channel(Channel::Y).unwrap()[0];
        assert!((x - 50.0).abs() < 1e-9);
        assert!((y - 86.60254037844386).abs() < 1e-9);
    }

    #[test]
    fn delta_f_derivation() {
        let start = NaiveDate::from_ymd_opt(2010, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let series = TimeSeries::new(start, Duration::seconds(60))
            .with_channel(Channel::X, vec![3.0, f64::NAN])
            .with_channel(Channel::Y, vec![4.0, 4.0])
            .with_channel(Channel::Z, vec![0.0, 0.0])
            .with_channel(Channel::F, vec![6.0, 6.0])
            .with_delta_f();
        let df = series.channel(Channel::DeltaF).unwrap();
        assert!((df[0] - 1.0).abs() < 1e-9);
        assert!(df[1].is_nan());
    }
}
