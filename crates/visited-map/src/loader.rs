//! Loading visited places from CSV files

use rayon::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use visited_map_lib::{DataError, RawRecord};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to read CSV from {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Read place records from CSV with a `name,longitude,latitude,date,description,image` header
///
/// Rows whose field count does not match the header are logged and skipped. Coordinates are
/// left unparsed so that ingestion can report them per row.
pub fn read_records(reader: impl Read, source: &str) -> Result<Vec<RawRecord>, LoadError> {
    #[cfg(feature = "profiling")]
    profiling::scope!("loader::read_records");

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    // A missing or unreadable header makes the whole file unusable
    reader.headers().map_err(|e| LoadError::Csv {
        path: source.to_string(),
        source: e,
    })?;

    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<RawRecord>().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("{source}: skipping malformed row {row}: {e}"),
        }
    }

    tracing::debug!("{source}: read {} records", records.len());
    Ok(records)
}

fn read_file(path: &Path) -> Result<Vec<RawRecord>, LoadError> {
    let source = path.display().to_string();
    let file = File::open(path).map_err(|e| LoadError::Io {
        path: source.clone(),
        source: e,
    })?;
    read_records(std::io::BufReader::new(file), &source)
}

/// Load all files in parallel, keeping records in file order
///
/// Any unreadable file aborts the whole load.
pub fn load_files(paths: &[PathBuf]) -> Result<Vec<RawRecord>, LoadError> {
    #[cfg(feature = "profiling")]
    profiling::scope!("loader::load_files");

    let per_file = paths
        .par_iter()
        .map(|path| read_file(path))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(per_file.into_iter().flatten().collect())
}

/// Places shown when no file was given
pub fn sample_places() -> Vec<RawRecord> {
    const SAMPLES: [(&str, &str, &str, &str, &str); 12] = [
        ("New York", "-74.0060", "40.7128", "2015-06-12", "First trip abroad"),
        ("Boston", "-71.0589", "42.3601", "2015-06-20", "Harbor walk"),
        ("Paris", "2.3522", "48.8566", "2017-04-02", "Louvre and Montmartre"),
        ("Versailles", "2.1301", "48.8049", "2017-04-04", "Day trip from Paris"),
        ("London", "-0.1276", "51.5072", "2019-11-18", "Conference week"),
        ("Tokyo", "139.6917", "35.6895", "2018-03-27", "Cherry blossoms"),
        ("Kyoto", "135.7681", "35.0116", "2018-04-01", "Temples"),
        ("Nara", "135.8048", "34.6851", "2018-04-02", "Deer park"),
        ("Sydney", "151.2093", "-33.8688", "2022-12-24", "Christmas at the beach"),
        ("Cairo", "31.2357", "30.0444", "2021-02-10", "Pyramids of Giza"),
        ("Lima", "-77.0428", "-12.0464", "2016-08-15", "Ceviche tour"),
        ("Home", "-3.7038", "40.4168", "", "Where it all started"),
    ];

    SAMPLES
        .iter()
        .map(|&(name, longitude, latitude, date, description)| RawRecord {
            name: name.to_string(),
            longitude: longitude.to_string(),
            latitude: latitude.to_string(),
            date: date.to_string(),
            description: description.to_string(),
            image: None,
        })
        .collect()
}
