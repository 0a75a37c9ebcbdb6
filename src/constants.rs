//! IAF record geometry and sentinel codes.

/// Station header record length (bytes).
pub const HEADER_SIZE: usize = 64;

/// Minute samples per channel per day.
pub const MINUTES_PER_DAY: usize = 1440;

/// Hourly means per channel per day.
pub const HOURS_PER_DAY: usize = 24;

/// 3-hour K index slots per day.
pub const K_PER_DAY: usize = 8;

/// Trailing reserved words per day block.
pub const RESERVED_WORDS: usize = 4;

/// Channel slots carried by every day block (X, Y, Z, F or ΔF).
pub const FIELD_SLOTS: usize = 4;

/// Encoded day block length (bytes): all fields are 4 byte
/// little endian signed integers.
pub const BLOCK_SIZE: usize =
    4 * (FIELD_SLOTS * (MINUTES_PER_DAY + HOURS_PER_DAY + 1) + K_PER_DAY + RESERVED_WORDS);

/// Raw sentinel standing for a missing field sample.
pub const MISSING_FIELD: i32 = 999_999;

/// Raw sentinel filling the fourth slot when neither F nor ΔF exists.
pub const DISABLED_FIELD: i32 = 888_888;

/// Raw sentinel for a missing 3-hour K value.
pub const MISSING_K: i32 = 999;

/// Largest raw K value considered valid.
pub const K_VALID_MAX: i32 = 880;

/// Daily K sums never exceed this in the text summary.
pub const K_SUM_SATURATION: i32 = 999;

/// Fixed point scale for field values (one decimal digit).
pub const FIELD_SCALE: f64 = 10.0;

/// Fixed point scale for the header latitude/longitude codes
/// (three decimal digits, i.e. millidegrees).
pub const ANGLE_SCALE: f64 = 1000.0;

/// Decoded field values above this are missing.
pub const FIELD_VALID_MAX: f64 = 8888.0;

/// F/ΔF values below this are missing (F is magnitude-like,
/// hence the asymmetric range).
pub const TOTAL_FIELD_VALID_MIN: f64 = -4444.0;

/// Minimum fraction of valid minute samples required before an
/// hourly or daily mean is committed.
pub const MEAN_VALID_FRACTION: f64 = 0.9;

/// IAF format version written into every header.
pub const FORMAT_VERSION: i32 = 3;

/// Digital sampling code used when the declared one cannot be parsed.
pub const DEFAULT_DIGITAL_SAMPLING: i32 = 1234;

/// Minimum time span (days) accepted for archive production.
pub const MIN_COVERAGE_DAYS: i64 = 28;
