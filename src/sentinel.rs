//! Fixed point scaling and sentinel mapping.
//!
//! Field samples are stored as `round(value * 10)`; the header
//! latitude/longitude codes as `round(degrees * 1000)`. Missing
//! samples map to dedicated raw sentinels rather than NaN.
use crate::constants::{
    ANGLE_SCALE, FIELD_SCALE, FIELD_VALID_MAX, K_VALID_MAX, MEAN_VALID_FRACTION, MISSING_FIELD,
    MISSING_K, TOTAL_FIELD_VALID_MIN,
};

/// Decoding range class of a block slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldClass {
    /// X/Y/Z style components: valid within ±8888.0 nT.
    Vector,
    /// F/ΔF slot: magnitude-like, valid within −4444.0..=8888.0 nT.
    Total,
}

impl FieldClass {
    /// Class of block slot `idx` (the fourth slot holds F or ΔF).
    pub fn of_slot(idx: usize) -> Self {
        if idx == 3 {
            Self::Total
        } else {
            Self::Vector
        }
    }
}

/// Decodes a raw field integer; missing values come back as NaN.
pub fn decode_field(raw: i32, class: FieldClass) -> f64 {
    let value = raw as f64 / FIELD_SCALE;
    if value > FIELD_VALID_MAX {
        return f64::NAN;
    }
    if class == FieldClass::Total && value < TOTAL_FIELD_VALID_MIN {
        return f64::NAN;
    }
    value
}

/// Encodes a field value; NaN maps to the missing sentinel.
pub fn encode_field(value: f64) -> i32 {
    if value.is_nan() {
        MISSING_FIELD
    } else {
        (value * FIELD_SCALE).round() as i32
    }
}

/// Decodes a raw K value; anything above 880 is missing.
pub fn decode_k(raw: i32) -> f64 {
    if raw > K_VALID_MAX || raw < 0 {
        f64::NAN
    } else {
        raw as f64
    }
}

/// Clamps a raw K value onto the valid range or the missing sentinel.
pub fn sanitize_k(raw: i32) -> i32 {
    if (0..=K_VALID_MAX).contains(&raw) {
        raw
    } else {
        MISSING_K
    }
}

/// Encodes an angle (degrees) as a millidegree code.
pub fn encode_angle(degrees: f64) -> i32 {
    (degrees * ANGLE_SCALE).round() as i32
}

/// Decodes a millidegree code back to degrees.
pub fn decode_angle(code: i32) -> f64 {
    code as f64 / ANGLE_SCALE
}

/// Mean of the valid (non NaN) samples, committed only when the
/// valid fraction reaches `min_valid` (0.9 for IAF products).
pub fn guarded_mean(samples: &[f64], min_valid: f64) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let valid: Vec<f64> = samples.iter().copied().filter(|v| !v.is_nan()).collect();
    if (valid.len() as f64) < min_valid * (samples.len() as f64) {
        return None;
    }
    Some(valid.iter().sum::<f64>() / valid.len() as f64)
}

/// [guarded_mean] with the standard IAF completeness threshold.
pub fn iaf_mean(samples: &[f64]) -> Option<f64> {
    guarded_mean(samples, MEAN_VALID_FRACTION)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constants::DISABLED_FIELD;

    #[test]
    fn field_round_trip_precision() {
        for raw in [-44440, -1234, 0, 4567, 88880] {
            let value = raw as f64 / 10.0;
            let encoded = encode_field(value);
            assert_eq!(encoded, raw);
            let decoded = decode_field(encoded, FieldClass::Vector);
            assert!((decoded - value).abs() < 0.1);
        }
    }
    #[test]
    fn missing_round_trip() {
        assert_eq!(encode_field(f64::NAN), MISSING_FIELD);
        assert!(decode_field(MISSING_FIELD, FieldClass::Vector).is_nan());
        assert!(decode_field(MISSING_FIELD, FieldClass::Total).is_nan());
        assert!(decode_field(DISABLED_FIELD, FieldClass::Vector).is_nan());
    }
    #[test]
    fn total_field_asymmetric_range() {
        // valid for a vector slot, missing for the F/ΔF slot
        let raw = encode_field(-5000.0);
        assert_eq!(decode_field(raw, FieldClass::Vector), -5000.0);
        assert!(decode_field(raw, FieldClass::Total).is_nan());
        // within the shared range both decode
        let raw = encode_field(-4444.0);
        assert_eq!(decode_field(raw, FieldClass::Total), -4444.0);
    }
    #[test]
    fn k_sentinels() {
        assert_eq!(decode_k(70) as i32, 70);
        assert!(decode_k(999).is_nan());
        assert!(decode_k(881).is_nan());
        assert_eq!(sanitize_k(880), 880);
        assert_eq!(sanitize_k(881), MISSING_K);
        assert_eq!(sanitize_k(-1), MISSING_K);
    }
    #[test]
    fn angle_codes() {
        // 43.250°N => colatitude code 46750; 76.920°E => 76920
        assert_eq!(encode_angle(90.0 - 43.250), 46750);
        assert_eq!(encode_angle(76.920), 76920);
        assert!((decode_angle(46750) - 46.750).abs() < 1e-9);
    }
    #[test]
    fn guarded_mean_threshold() {
        let mut samples = vec![10.0; 100];
        assert_eq!(guarded_mean(&samples, 0.9), Some(10.0));
        for sample in samples.iter_mut().take(10) {
            *sample = f64::NAN;
        }
        // exactly 90% valid still commits
        assert_eq!(guarded_mean(&samples, 0.9), Some(10.0));
        samples[10] = f64::NAN;
        assert_eq!(guarded_mean(&samples, 0.9), None);
    }
}
