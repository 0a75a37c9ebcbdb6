//! Strongly typed station metadata for archive production.
//!
//! Every field is optional; [StationMeta::validate] resolves the
//! required header set with typed defaults and reports the complete
//! list of fields it could not resolve.
use chrono::{NaiveDate, Utc};

use crate::channel::ComponentSet;
use crate::constants::{DEFAULT_DIGITAL_SAMPLING, FORMAT_VERSION};
use crate::header::StationHeader;
use crate::sentinel::encode_angle;
use crate::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Station description gathered from acquisition metadata.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StationMeta {
    /// 3 letter IAGA observatory code.
    pub iaga_code: Option<String>,
    /// Acquisition latitude (degrees, north positive).
    pub latitude: Option<f64>,
    /// Acquisition longitude (degrees, east positive).
    pub longitude: Option<f64>,
    /// Coordinate reference the latitude/longitude are declared in,
    /// e.g. "EPSG:4326". Empty means "assumed WGS84".
    pub location_reference: Option<String>,
    /// Elevation above sea level (m).
    pub elevation: Option<f64>,
    /// Recorded components ("XYZ", "HDZF", ...).
    pub components: Option<String>,
    /// Publishing institution.
    pub institution: Option<String>,
    /// Data conversion factor.
    pub conversion: Option<f64>,
    /// Data quality code ("IMAG", ...).
    pub quality: Option<String>,
    /// Sensor type descriptor.
    pub sensor_type: Option<String>,
    /// Station K9 limit (nT).
    pub k9_limit: Option<i32>,
    /// Digital sampling description; defaults to code 1234 when it
    /// does not parse as an integer.
    pub digital_sampling: Option<String>,
    /// Sensor orientation ("XYZF", "HDZF", ...).
    pub sensor_orientation: Option<String>,
    /// Publication date; defaults to the current month when absent.
    pub publication_date: Option<NaiveDate>,
    /// Free text description of the applied sampling filter,
    /// quoted in the README.
    pub sampling_filter: Option<String>,
    /// Observatory name (README).
    pub station_name: Option<String>,
    /// Street address (README).
    pub street: Option<String>,
    /// City (README).
    pub city: Option<String>,
    /// Postal code (README).
    pub postal_code: Option<String>,
    /// Country (README).
    pub country: Option<String>,
    /// Web page (README).
    pub web: Option<String>,
    /// Contact email (README).
    pub email: Option<String>,
}

impl StationMeta {
    /// Verifies the declared coordinate reference is WGS84.
    /// The conversion itself is an external concern: anything else
    /// is rejected so the caller converts upstream.
    pub fn check_location_reference(&self) -> Result<(), Error> {
        match &self.location_reference {
            None => Ok(()),
            Some(reference) => {
                let r = reference.trim();
                if r.is_empty()
                    || r.to_uppercase().contains("WGS84")
                    || r.to_uppercase().contains("EPSG:4326")
                {
                    Ok(())
                } else {
                    Err(Error::UnsupportedCrs(reference.clone()))
                }
            },
        }
    }

    /// Resolves the required header field set for `date`.
    /// Typed defaults: format version 3, reserved 0, digital sampling
    /// code 1234 when unparseable, publication date = current month
    /// when absent. Every other missing field aborts the production
    /// and is listed in [Error::MissingHeaderFields].
    pub fn validate(&self, date: NaiveDate) -> Result<StationHeader, Error> {
        let mut missing: Vec<&'static str> = Vec::new();
        let mut require_str = |value: &Option<String>, name: &'static str| match value {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => {
                missing.push(name);
                String::new()
            },
        };
        let station = require_str(&self.iaga_code, "iaga_code");
        let components = require_str(&self.components, "components");
        let institution = require_str(&self.institution, "institution");
        let quality = require_str(&self.quality, "quality");
        let sensor_type = require_str(&self.sensor_type, "sensor_type");
        let orientation = require_str(&self.sensor_orientation, "sensor_orientation");

        let latitude = match self.latitude {
            Some(lat) if (-90.0..=90.0).contains(&lat) => lat,
            _ => {
                // out of range is as unusable as absent: degrees required
                missing.push("latitude");
                0.0
            },
        };
        let longitude = match self.longitude {
            Some(lon) => lon,
            None => {
                missing.push("longitude");
                0.0
            },
        };
        let elevation = match self.elevation {
            Some(elevation) => elevation.round() as i32,
            None => {
                missing.push("elevation");
                0
            },
        };
        let conversion = match self.conversion {
            Some(conversion) => conversion.round() as i32,
            None => {
                missing.push("conversion");
                0
            },
        };
        let k9_limit = match self.k9_limit {
            Some(k9) => k9,
            None => {
                missing.push("k9_limit");
                0
            },
        };

        if !missing.is_empty() {
            return Err(Error::MissingHeaderFields(missing));
        }

        let digital_sampling = self
            .digital_sampling
            .as_deref()
            .and_then(|code| code.trim().parse::<i32>().ok())
            .unwrap_or(DEFAULT_DIGITAL_SAMPLING);
        let publication = self
            .publication_date
            .unwrap_or_else(|| Utc::now().date_naive());

        Ok(StationHeader {
            station: station.chars().take(3).collect::<String>().to_uppercase(),
            date,
            colatitude: encode_angle(90.0 - latitude),
            longitude: encode_angle(longitude),
            elevation,
            components: ComponentSet::from_code(&components),
            institution,
            conversion,
            quality,
            sensor_type,
            k9_limit,
            digital_sampling,
            orientation,
            publication,
            version: FORMAT_VERSION,
            reserved: 0,
        })
    }

    /// README prerequisites; returns every absent field.
    pub fn readme_fields_missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let mut check = |value: &Option<String>, name: &'static str| {
            if value.as_deref().map(str::trim).filter(|v| !v.is_empty()).is_none() {
                missing.push(name);
            }
        };
        check(&self.station_name, "station_name");
        check(&self.institution, "institution");
        check(&self.street, "street");
        check(&self.city, "city");
        check(&self.postal_code, "postal_code");
        check(&self.country, "country");
        check(&self.web, "web");
        check(&self.email, "email");
        if self.k9_limit.is_none() {
            missing.push("k9_limit");
        }
        missing
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn testbench_meta() -> StationMeta {
        StationMeta {
            iaga_code: Some("AAA".to_string()),
            latitude: Some(43.250),
            longitude: Some(76.920),
            elevation: Some(1300.0),
            components: Some("XYZ".to_string()),
            institution: Some("GFZ".to_string()),
            conversion: Some(10000.0),
            quality: Some("IMAG".to_string()),
            sensor_type: Some("FGE".to_string()),
            k9_limit: Some(300),
            digital_sampling: Some("0.125 second".to_string()),
            sensor_orientation: Some("XYZF".to_string()),
            publication_date: NaiveDate::from_ymd_opt(2011, 6, 1),
            ..Default::default()
        }
    }

    #[test]
    fn validation_with_defaults() {
        let date = NaiveDate::from_ymd_opt(2010, 3, 1).unwrap();
        let header = testbench_meta().validate(date).unwrap();
        assert_eq!(header.station, "AAA");
        assert_eq!(header.colatitude, 46750);
        assert_eq!(header.longitude, 76920);
        // "0.125 second" is not an integer code
        assert_eq!(header.digital_sampling, 1234);
        assert_eq!(header.version, 3);
        assert_eq!(header.reserved, 0);
    }

    #[test]
    fn missing_fields_are_enumerated() {
        let date = NaiveDate::from_ymd_opt(2010, 3, 1).unwrap();
        let mut meta = testbench_meta();
        meta.k9_limit = None;
        meta.institution = None;
        meta.latitude = Some(1234.0); // not degrees
        match meta.validate(date) {
            Err(Error::MissingHeaderFields(fields)) => {
                assert!(fields.contains(&"k9_limit"));
                assert!(fields.contains(&"institution"));
                assert!(fields.contains(&"latitude"));
            },
            other => panic!("expected MissingHeaderFields, got {:?}", other),
        }
    }

    #[test]
    fn location_reference_check() {
        let mut meta = testbench_meta();
        assert!(meta.check_location_reference().is_ok());
        meta.location_reference = Some("WGS84, EPSG:4326".to_string());
        assert!(meta.check_location_reference().is_ok());
        meta.location_reference = Some("EPSG:31254".to_string());
        assert!(matches!(
            meta.check_location_reference(),
            Err(Error::UnsupportedCrs(_))
        ));
    }

    #[test]
    fn readme_prerequisites() {
        let meta = testbench_meta();
        let missing = meta.readme_fields_missing();
        assert!(missing.contains(&"station_name"));
        assert!(missing.contains(&"email"));
        assert!(!missing.contains(&"institution"));
    }
}
