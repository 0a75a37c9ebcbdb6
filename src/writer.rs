//! Archive production: binary IAF file, yearly K summary, README.
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, NaiveDate};
use itertools::Itertools;
use log::{info, warn};

use crate::block::DayBlock;
use crate::channel::Channel;
use crate::constants::{
    DISABLED_FIELD, FIELD_SLOTS, HOURS_PER_DAY, MIN_COVERAGE_DAYS, MINUTES_PER_DAY, MISSING_FIELD,
    MISSING_K,
};
use crate::header::StationHeader;
use crate::kindex::KIndexTable;
use crate::meta::StationMeta;
use crate::production::{archive_path, k_summary_path, readme_path};
use crate::reader::Archive;
use crate::sentinel::{encode_field, iaf_mean};
use crate::series::TimeSeries;
use crate::Error;

/// Archive file write mode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Truncate any existing file and write the new content.
    #[default]
    Overwrite,
    /// Append raw day records to an existing file. The caller must
    /// guarantee the day ranges do not overlap: no merging happens.
    Append,
    /// Merge with any existing archive, existing days win.
    Skip,
    /// Merge with any existing archive, new days win.
    Replace,
}

/// Non fatal production events, logged and reported to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    /// A calendar day offered more than 1440 minute samples
    /// (clock/DST anomaly). The first 1440 were kept.
    DayOverrun { date: NaiveDate, samples: usize },
    /// A calendar day offered fewer than 1440 minute samples;
    /// the tail was padded with missing values.
    ShortDay { date: NaiveDate, samples: usize },
    /// README prerequisites unmet: the file was skipped while the
    /// archive (and K summary) were still produced.
    ReadmeSkipped { missing: Vec<&'static str> },
}

/// What a production run created.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductionReport {
    /// Number of day records encoded.
    pub days_written: usize,
    /// Binary archive location (upper cased base name).
    pub archive_path: PathBuf,
    /// K summary location, when a K table was supplied.
    pub k_summary_path: Option<PathBuf>,
    /// README location, when it was created by this run.
    pub readme_path: Option<PathBuf>,
    /// Non fatal events.
    pub warnings: Vec<Warning>,
}

/// One rendered day: wire header + block + optional K summary line.
struct DayRecord {
    header: StationHeader,
    block: DayBlock,
    k_line: Option<String>,
}

/// IAF archive producer.
///
/// ```no_run
/// use iaf::prelude::*;
///
/// let meta = StationMeta {
///     iaga_code: Some("AAA".to_string()),
///     latitude: Some(43.250),
///     longitude: Some(76.920),
///     // ... remaining required fields ...
///     ..Default::default()
/// };
/// # let series: TimeSeries = todo!();
/// let report = Producer::new(meta)
///     .with_mode(Mode::Overwrite)
///     .write(series, std::path::Path::new("/data/aaa10mar.bin"))
///     .unwrap();
/// ```
pub struct Producer<'a> {
    meta: StationMeta,
    mode: Mode,
    k_indices: Option<&'a KIndexTable>,
}

impl<'a> Producer<'a> {
    pub fn new(meta: StationMeta) -> Self {
        Self {
            meta,
            mode: Mode::default(),
            k_indices: None,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Attaches a K index table: fills the K slots of every block
    /// and unlocks the yearly `<STATION><yy>K.DKA` summary.
    pub fn with_k_indices(mut self, table: &'a KIndexTable) -> Self {
        self.k_indices = Some(table);
        self
    }

    /// Validates, encodes and writes the archive plus its derived
    /// text products. Fatal conditions surface before any file is
    /// touched; non fatal ones are logged and listed in the report.
    pub fn write(&self, series: TimeSeries, path: &Path) -> Result<ProductionReport, Error> {
        let mut warnings = Vec::new();
        let (header, series) = self.preconditions(series)?;
        let records = self.render_days(&header, &series, &mut warnings);

        let archive = archive_path(path);
        let dir = archive.parent().unwrap_or(Path::new(".")).to_path_buf();
        let days_written = records.len();

        self.materialize_archive(&archive, &records)?;
        info!(
            "{}: {} day(s) written to {:?}",
            header.station, days_written, archive
        );

        let k_summary = match self.k_indices {
            Some(_) => Some(self.write_k_summary(&dir, &header, &records)?),
            None => None,
        };
        let readme = self.write_readme(&dir, &header, &series, &mut warnings)?;

        Ok(ProductionReport {
            days_written,
            archive_path: archive,
            k_summary_path: k_summary,
            readme_path: readme,
            warnings,
        })
    }

    /// Ordered validation; the first failure aborts the production
    /// before anything touches the filesystem.
    fn preconditions(&self, series: TimeSeries) -> Result<(StationHeader, TimeSeries), Error> {
        if series.is_empty() {
            return Err(Error::EmptySeries);
        }
        let period = series.sampling_period.num_seconds();
        if period != 60 {
            return Err(Error::NonMinuteSampling(period));
        }
        let span = series.span_days();
        if span < MIN_COVERAGE_DAYS {
            return Err(Error::InsufficientCoverage(span));
        }

        let mut meta = self.meta.clone();
        let components = meta
            .components
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();

        // H/D/Z acquisition: relabel onto geographic axes first
        let mut series = if components.starts_with("hdz") {
            meta.components = Some(components.replacen("hdz", "xyz", 1));
            series.to_xyz()
        } else {
            series
        };

        // ΔF slot: derive from F when possible, flag the component
        // and orientation codes accordingly
        if !series.has_channel(Channel::DeltaF) && series.has_channel(Channel::F) {
            series = series.with_delta_f();
        }
        if series.has_channel(Channel::DeltaF) {
            meta.components = Some(append_code(meta.components.as_deref(), 'g'));
            meta.sensor_orientation =
                Some(append_code(meta.sensor_orientation.as_deref(), 'f').to_uppercase());
        }

        meta.check_location_reference()?;

        let header = meta.validate(series.first_date())?;
        Ok((header, series))
    }

    /// Slices, aggregates and encodes one block per calendar day.
    fn render_days(
        &self,
        header: &StationHeader,
        series: &TimeSeries,
        warnings: &mut Vec<Warning>,
    ) -> Vec<DayRecord> {
        // the fourth slot carries ΔF when recorded or derived,
        // otherwise it is disabled altogether
        let fourth = if series.has_channel(Channel::DeltaF) {
            Some(Channel::DeltaF)
        } else {
            None
        };
        let slots = [
            Some(Channel::X),
            Some(Channel::Y),
            Some(Channel::Z),
            fourth,
        ];
        let first = series.first_date();
        let last = series.end().date();
        let mut records = Vec::new();

        let mut date = first;
        while date <= last {
            let day = series.day_slice(date);
            let mut block = DayBlock::empty(date);

            if day.len() > MINUTES_PER_DAY {
                warn!(
                    "{}: found {} minute samples (expected 1440), truncating",
                    date,
                    day.len()
                );
                warnings.push(Warning::DayOverrun {
                    date,
                    samples: day.len(),
                });
            } else if day.len() < MINUTES_PER_DAY {
                warn!(
                    "{}: found {} minute samples (expected 1440), padding with missing",
                    date,
                    day.len()
                );
                warnings.push(Warning::ShortDay {
                    date,
                    samples: day.len(),
                });
            }

            for (slot, channel) in slots.into_iter().enumerate() {
                let samples = match channel.and_then(|ch| day.channel(ch)) {
                    Some(samples) => normalize_day(samples),
                    None if slot == 3 => {
                        // disabled slot: no F and no ΔF recorded
                        block.minutes[slot] = [DISABLED_FIELD; MINUTES_PER_DAY];
                        block.hours[slot] = [DISABLED_FIELD; HOURS_PER_DAY];
                        block.daily[slot] = DISABLED_FIELD;
                        continue;
                    },
                    // vector channel absent from the series:
                    // everything stays at the missing sentinel
                    None => continue,
                };
                for (minute, value) in samples.iter().enumerate() {
                    block.minutes[slot][minute] = encode_field(*value);
                }
                // hourly means: 60 minute flat window, committed at
                // the same 90% completeness threshold as daily means
                for hour in 0..HOURS_PER_DAY {
                    let window = &samples[hour * 60..(hour + 1) * 60];
                    block.hours[slot][hour] = match iaf_mean(window) {
                        Some(mean) => encode_field(mean),
                        None => MISSING_FIELD,
                    };
                }
                // daily mean, gated per channel on its own valid count
                block.daily[slot] = match iaf_mean(&samples) {
                    Some(mean) => encode_field(mean),
                    None => MISSING_FIELD,
                };
            }

            let k_line = match self.k_indices {
                Some(table) => {
                    let values = table.day(date);
                    block.k = values;
                    Some(k_summary_line(date, &values))
                },
                None => {
                    block.k = [MISSING_K; 8];
                    None
                },
            };

            records.push(DayRecord {
                header: header.for_date(date),
                block,
                k_line,
            });
            date = date + Duration::days(1);
        }
        records
    }

    /// Writes the binary archive according to the selected [Mode].
    fn materialize_archive(&self, path: &Path, records: &[DayRecord]) -> Result<(), Error> {
        match self.mode {
            Mode::Overwrite => {
                let mut fd = File::create(path)?;
                for record in records {
                    fd.write_all(&record.header.encode())?;
                    fd.write_all(&record.block.encode())?;
                }
            },
            Mode::Append => {
                let mut fd = OpenOptions::new().create(true).append(true).open(path)?;
                for record in records {
                    fd.write_all(&record.header.encode())?;
                    fd.write_all(&record.block.encode())?;
                }
            },
            Mode::Skip | Mode::Replace => {
                let mut merged: BTreeMap<NaiveDate, (StationHeader, DayBlock)> = BTreeMap::new();
                if self.mode == Mode::Replace {
                    // existing first, new days override
                    self.merge_existing(path, &mut merged)?;
                    for record in records {
                        merged.insert(
                            record.block.date,
                            (record.header.clone(), record.block.clone()),
                        );
                    }
                } else {
                    // new first, existing days override
                    for record in records {
                        merged.insert(
                            record.block.date,
                            (record.header.clone(), record.block.clone()),
                        );
                    }
                    self.merge_existing(path, &mut merged)?;
                }
                // atomic rewrite
                let tmp = path.with_extension("tmp");
                {
                    let mut fd = File::create(&tmp)?;
                    for (header, block) in merged.values() {
                        fd.write_all(&header.encode())?;
                        fd.write_all(&block.encode())?;
                    }
                }
                std::fs::rename(&tmp, path)?;
            },
        }
        Ok(())
    }

    fn merge_existing(
        &self,
        path: &Path,
        merged: &mut BTreeMap<NaiveDate, (StationHeader, DayBlock)>,
    ) -> Result<(), Error> {
        if !path.exists() {
            return Ok(());
        }
        let existing = Archive::from_file(path)?;
        for block in existing.days {
            let header = existing.header.for_date(block.date);
            merged.insert(block.date, (header, block));
        }
        Ok(())
    }

    /// Appends one line per rendered day to the yearly K summary,
    /// creating the fixed header block when the file does not exist.
    fn write_k_summary(
        &self,
        dir: &Path,
        header: &StationHeader,
        records: &[DayRecord],
    ) -> Result<PathBuf, Error> {
        let year = records
            .first()
            .map(|record| record.block.date.year())
            .unwrap_or(header.date.year());
        let path = k_summary_path(dir, &header.station, year);

        if !path.exists() {
            let mut fd = File::create(&path)?;
            let head = [
                format!("{:^66}", header.station),
                format!(
                    "                  Geographical latitude: {:>10.3} N",
                    header.latitude()
                ),
                format!(
                    "                  Geographical longitude:{:>10.3} E",
                    header.longitude_degrees()
                ),
                String::new(),
                format!(
                    "            K-index values for {}     (K9-limit = {:>4} nT)",
                    year, header.k9_limit
                ),
                String::new(),
                "  DA-MON-YR  DAY #    1    2    3    4      5    6    7    8       SK"
                    .to_string(),
                String::new(),
            ];
            for line in &head {
                fd.write_all(line.as_bytes())?;
                fd.write_all(b"\r\n")?;
            }
        }
        let mut fd = OpenOptions::new().append(true).open(&path)?;
        for record in records {
            if let Some(line) = &record.k_line {
                fd.write_all(line.as_bytes())?;
                fd.write_all(b"\r\n")?;
            }
        }
        info!("{}: K summary updated at {:?}", header.station, path);
        Ok(path)
    }

    /// Creates the one time station README when absent and when all
    /// prerequisites resolve. A miss only downgrades to a warning:
    /// the archive and K summary stand regardless.
    fn write_readme(
        &self,
        dir: &Path,
        header: &StationHeader,
        series: &TimeSeries,
        warnings: &mut Vec<Warning>,
    ) -> Result<Option<PathBuf>, Error> {
        let missing = self.meta.readme_fields_missing();
        if !missing.is_empty() {
            warn!(
                "{}: README skipped, missing {}",
                header.station,
                missing.iter().join(", ")
            );
            warnings.push(Warning::ReadmeSkipped { missing });
            return Ok(None);
        }
        let path = readme_path(dir, &header.station);
        if path.exists() {
            return Ok(None);
        }

        let meta = &self.meta;
        let station = header.station.to_uppercase();
        let name = meta.station_name.as_deref().unwrap_or_default();
        let year = series.first_date().year();
        let blank = String::new();

        let address = [
            meta.station_name.as_deref(),
            meta.institution.as_deref(),
            meta.street.as_deref(),
            meta.city.as_deref(),
            meta.postal_code.as_deref(),
            meta.country.as_deref(),
        ];
        let mut lines = vec![
            format!("{:^66}", station),
            blank.clone(),
            format!("{:>23} OBSERVATORY INFORMATION {:>5}", name.to_uppercase(), year),
            blank.clone(),
            format!("ACKNOWLEDGEMT: Users of {}-data should acknowledge:", station),
        ];
        for field in address.iter().flatten() {
            lines.push(format!("               {}", field));
        }
        if let Some(web) = &meta.web {
            lines.push(format!("               {}", web));
        }
        lines.extend([
            blank.clone(),
            format!("STATION ID   : {}", station),
            format!(
                "LOCATION     : {}, {}",
                meta.city.as_deref().unwrap_or_default(),
                meta.country.as_deref().unwrap_or_default()
            ),
            format!("ORGANIZATION : {}", meta.institution.as_deref().unwrap_or_default()),
            format!("CO-LATITUDE  : {:.3} Deg.", 90.0 - header.latitude()),
            format!("LONGITUDE    : {:.3} Deg. E", header.longitude_degrees()),
            format!("ELEVATION    : {} meters", header.elevation),
            blank.clone(),
            "ABSOLUTE".to_string(),
            "INSTRUMENTS  : please insert manually".to_string(),
            "RECORDING".to_string(),
            "VARIOMETER   : please insert manually".to_string(),
            format!("ORIENTATION  : {}", header.orientation),
            blank.clone(),
            "DYNAMIC RANGE: please insert manually".to_string(),
            "RESOLUTION   : please insert manually".to_string(),
            "SAMPLING RATE: please insert manually".to_string(),
            format!("FILTER       : {}", meta.sampling_filter.as_deref().unwrap_or_default()),
            "K-NUMBERS    : Computer derived (FMI method)".to_string(),
            format!("K9-LIMIT     : {:>4} nT", header.k9_limit),
            blank.clone(),
            "GINS         : please insert manually".to_string(),
            "SATELLITE    : please insert manually".to_string(),
            "OBSERVER(S)  : please insert manually".to_string(),
            "ENGINEER(S)  : please insert manually".to_string(),
            "CONTACT      : ".to_string(),
        ]);
        for field in address.iter().flatten() {
            lines.push(format!("               {}", field));
        }
        if let Some(email) = &meta.email {
            lines.push(format!("               {}", email));
        }

        let mut fd = File::create(&path)?;
        for line in &lines {
            fd.write_all(line.as_bytes())?;
            fd.write_all(b"\r\n")?;
        }
        info!("{}: README created at {:?}", header.station, path);
        Ok(Some(path))
    }
}

/// Pads or truncates one day of samples to exactly 1440 minutes.
fn normalize_day(samples: &[f64]) -> Vec<f64> {
    let mut day = samples[..samples.len().min(MINUTES_PER_DAY)].to_vec();
    day.resize(MINUTES_PER_DAY, f64::NAN);
    day
}

/// Appends a component/orientation suffix letter once.
fn append_code(code: Option<&str>, letter: char) -> String {
    let mut code = code.unwrap_or_default().to_lowercase();
    if !code.contains(letter) && code.len() < FIELD_SLOTS {
        code.push(letter);
    }
    code
}

/// One fixed width line of the yearly K summary.
fn k_summary_line(date: NaiveDate, values: &[i32; 8]) -> String {
    let mut line = format!(
        "  {}   {}",
        date.format("%d-%b-%y"),
        date.format("%j")
    );
    let widths = [6, 5, 5, 5, 7, 5, 5, 5];
    for (value, width) in values.iter().zip(widths) {
        line.push_str(&format!("{:>width$}", value, width = width));
    }
    line.push_str(&format!("{:>9}", KIndexTable::day_sum(values)));
    line
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn k_summary_line_layout() {
        let date = NaiveDate::from_ymd_opt(2010, 3, 5).unwrap();
        let line = k_summary_line(date, &[10, 20, 30, 40, 50, 60, 70, 80]);
        assert_eq!(
            line,
            "  05-Mar-10   064    10   20   30   40     50   60   70   80      360"
        );
        // eight values of 200: true sum 1600 saturates at 999
        let line = k_summary_line(date, &[200; 8]);
        assert!(line.ends_with("      999"));
    }

    #[test]
    fn day_normalization() {
        let day = normalize_day(&vec![1.0; 1441]);
        assert_eq!(day.len(), 1440);
        let day = normalize_day(&vec![1.0; 100]);
        assert_eq!(day.len(), 1440);
        assert!(day[100].is_nan());
        assert_eq!(day[99], 1.0);
    }

    #[test]
    fn code_suffixes() {
        assert_eq!(append_code(Some("XYZ"), 'g'), "xyzg");
        assert_eq!(append_code(Some("xyzg"), 'g'), "xyzg");
        assert_eq!(append_code(Some("XYZF"), 'g'), "xyzf");
    }
}
