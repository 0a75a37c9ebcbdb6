//! IAF: INTERMAGNET monthly archive encoding, decoding and production.
//!
//! The IAF format stores one calendar month of geomagnetic observatory
//! data as concatenated binary day records. Each record is a 64 byte
//! station header followed by a fixed 23488 byte block holding four
//! channels at minute, hourly and daily resolution, eight 3-hour K
//! indices and four reserved words. All values are fixed-point scaled
//! integers with dedicated sentinel codes for missing samples.
//!
//! Use [Archive] to parse existing files and [Producer] to generate
//! the binary archive together with its two derived text products
//! (the yearly K index summary and the one-time station README).
use thiserror::Error;

mod block;
mod channel;
mod header;
mod kindex;
mod meta;
mod production;
mod reader;
mod series;
mod writer;

pub(crate) mod constants;
pub(crate) mod sentinel;

pub use block::DayBlock;
pub use channel::{Channel, ComponentSet};
pub use header::StationHeader;
pub use kindex::KIndexTable;
pub use meta::StationMeta;
pub use reader::{is_iaf_file, Archive, Decoder, Resolution, TimeFrame};
pub use series::{ChannelData, TimeSeries};
pub use writer::{Mode, Producer, ProductionReport, Warning};

pub mod prelude {
    pub use crate::block::DayBlock;
    pub use crate::channel::{Channel, ComponentSet};
    pub use crate::header::StationHeader;
    pub use crate::kindex::KIndexTable;
    pub use crate::meta::StationMeta;
    pub use crate::reader::{is_iaf_file, Archive, Decoder, Resolution, TimeFrame};
    pub use crate::series::{ChannelData, TimeSeries};
    pub use crate::writer::{Mode, Producer, ProductionReport, Warning};
    pub use crate::Error;
    // re-export
    pub use chrono::{NaiveDate, NaiveDateTime};
}

#[derive(Error, Debug)]
pub enum Error {
    /// Header is not 64 bytes, or its embedded year + day-of-year
    /// field does not form a valid calendar date. Callers use this
    /// condition for format sniffing: it means "not an IAF file",
    /// not "corrupt input".
    #[error("not an IAF station header")]
    FormatMismatch,
    /// Stream terminated inside a record.
    #[error("not enough bytes available")]
    NotEnoughBytes,
    /// One or more required header fields could not be resolved at
    /// production time. Every unresolved field is listed.
    #[error("missing required header fields: {0:?}")]
    MissingHeaderFields(Vec<&'static str>),
    /// Production requires a non empty time series.
    #[error("time series contains no data")]
    EmptySeries,
    /// IAF archives are built from minute data exclusively.
    #[error("minute data required, found {0} s sampling period")]
    NonMinuteSampling(i64),
    /// The series must cover at least one month.
    #[error("data must cover at least 28 days, found {0}")]
    InsufficientCoverage(i64),
    /// Acquisition coordinates are declared in a reference frame we
    /// cannot translate. Conversion to WGS84 is up to the caller.
    #[error("unsupported location reference {0:?}: convert to WGS84 (EPSG:4326) first")]
    UnsupportedCrs(String),
    #[error("i/o error")]
    Io(#[from] std::io::Error),
}
