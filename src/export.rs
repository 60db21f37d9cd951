use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, SecondsFormat};

use crate::error::MonitorError;
use crate::param::AuxField;
use crate::sample::Sample;

pub const HEADER: [&str; 9] = [
    "timestamp",
    "left_x",
    "right_x",
    "difference",
    "left_y",
    "right_y",
    "left_lid",
    "right_lid",
    "pupil_dilation",
];

/// `osc_eye_data_<YYYYmmdd_HHMMSS>.csv` in the current directory.
pub fn default_export_path() -> PathBuf {
    PathBuf::from(format!(
        "osc_eye_data_{}.csv",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write one row per sample to any writer.
pub fn write_samples<W: Write>(writer: W, samples: &[Sample]) -> Result<(), MonitorError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;
    for sample in samples {
        let mut record = vec![
            sample.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            sample.left_x.to_string(),
            sample.right_x.to_string(),
            sample.difference().to_string(),
        ];
        record.extend(AuxField::ALL.iter().map(|&f| cell(sample.aux(f))));
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn export_csv<P: AsRef<Path>>(path: P, samples: &[Sample]) -> Result<(), MonitorError> {
    let file = std::fs::File::create(path).map_err(csv::Error::from)?;
    write_samples(file, samples)
}
