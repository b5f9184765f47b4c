//! Facility dataset loading from CSV.

use csv::{ReaderBuilder, StringRecord, Trim};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use xxhash_rust::xxh64::xxh64;

use crate::error::{Error, Result};
use crate::models::{Facility, FacilityType};

// Accepted header spellings, compared after trimming and lowercasing
const ID_COLUMNS: &[&str] = &["id", "facility_id", "ccn", "npi"];
const NAME_COLUMNS: &[&str] = &["name", "facility_name", "facility name"];
const TYPE_COLUMNS: &[&str] = &["type", "facility_type"];
const LAT_COLUMNS: &[&str] = &["latitude", "lat"];
const LON_COLUMNS: &[&str] = &["longitude", "lon", "lng"];
const AFFILIATION_COLUMNS: &[&str] = &["affiliation", "health_system"];
const CITY_COLUMNS: &[&str] = &["city", "city/town"];

/// Facilities read from a file, with a fingerprint of the raw bytes
#[derive(Debug, Clone)]
pub struct Dataset {
    pub path: PathBuf,
    /// xxh64 of the file as stored on disk (before decompression)
    pub source_hash: u64,
    pub facilities: Vec<Facility>,
}

/// Column positions resolved from the header row
struct ColumnMap {
    id: usize,
    name: usize,
    facility_type: usize,
    latitude: usize,
    longitude: usize,
    affiliation: Option<usize>,
    city: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .collect();

        Ok(Self {
            id: require(&normalized, ID_COLUMNS)?,
            name: require(&normalized, NAME_COLUMNS)?,
            facility_type: require(&normalized, TYPE_COLUMNS)?,
            latitude: require(&normalized, LAT_COLUMNS)?,
            longitude: require(&normalized, LON_COLUMNS)?,
            affiliation: position(&normalized, AFFILIATION_COLUMNS),
            city: position(&normalized, CITY_COLUMNS),
        })
    }
}

fn position(headers: &[String], aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|h| aliases.iter().any(|a| h == a))
}

fn require(headers: &[String], aliases: &[&str]) -> Result<usize> {
    position(headers, aliases).ok_or_else(|| Error::MissingColumn(aliases[0].to_string()))
}

/// One raw CSV row, before validation
#[derive(Debug)]
pub struct FacilityRecord<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub facility_type: &'a str,
    pub latitude: &'a str,
    pub longitude: &'a str,
    pub affiliation: Option<&'a str>,
    pub city: Option<&'a str>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl<'a> FacilityRecord<'a> {
    fn from_record(record: &'a StringRecord, columns: &ColumnMap) -> Self {
        let get = |i: usize| record.get(i).unwrap_or("").trim();
        Self {
            id: get(columns.id),
            name: get(columns.name),
            facility_type: get(columns.facility_type),
            latitude: get(columns.latitude),
            longitude: get(columns.longitude),
            affiliation: non_empty(columns.affiliation.and_then(|i| record.get(i))),
            city: non_empty(columns.city.and_then(|i| record.get(i))),
        }
    }

    /// Validate the row and build a facility. `row` is only used in messages.
    pub fn into_facility(self, row: usize) -> Result<Facility> {
        let invalid_record = |reason: String| Error::InvalidRecord { row, reason };

        if self.id.is_empty() {
            return Err(invalid_record("missing id".to_string()));
        }
        if self.name.is_empty() {
            return Err(invalid_record(format!("facility '{}' has no name", self.id)));
        }

        let facility_type: FacilityType = self.facility_type.parse().map_err(invalid_record)?;

        let coordinate = |value: &str, axis: &str| -> Result<f64> {
            if value.is_empty() {
                return Err(Error::invalid(self.id, format!("row {row}: missing {axis}")));
            }
            value
                .parse::<f64>()
                .map_err(|_| invalid_record(format!("{axis} '{value}' is not a number")))
        };
        let lat = coordinate(self.latitude, "latitude")?;
        let lon = coordinate(self.longitude, "longitude")?;

        let mut facility = Facility::new(self.id, self.name, facility_type, lat, lon).map_err(
            |e| match e {
                Error::InvalidInput { facility, reason } => Error::InvalidInput {
                    facility,
                    reason: format!("row {row}: {reason}"),
                },
                other => other,
            },
        )?;
        facility.affiliation = self.affiliation.map(str::to_string);
        facility.city = self.city.map(str::to_string);
        Ok(facility)
    }
}

/// Parse facilities from CSV text. The first invalid row aborts loading.
///
/// Short rows are padded with empty fields, so a truncated row fails on the
/// first missing value instead of as a malformed CSV.
pub fn read_facilities<R: Read>(reader: R) -> Result<Vec<Facility>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut facilities = Vec::new();
    for (i, result) in csv_reader.records().enumerate() {
        let record = result?;
        let row = i + 1;
        let facility = FacilityRecord::from_record(&record, &columns).into_facility(row)?;
        debug!("Row {}: {} ({})", row, facility.id, facility.facility_type);
        facilities.push(facility);
    }

    if facilities.is_empty() {
        return Err(Error::EmptyDataset);
    }
    Ok(facilities)
}

/// Load a facility CSV file; `.gz` files are decompressed first
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    info!("Loading facilities from {}", path.display());

    let bytes = std::fs::read(path)?;
    let source_hash = xxh64(&bytes, 0);

    let reader: Box<dyn Read + '_> = if path.extension().is_some_and(|e| e == "gz") {
        Box::new(GzDecoder::new(bytes.as_slice()))
    } else {
        Box::new(bytes.as_slice())
    };

    let facilities = read_facilities(reader)?;
    info!(
        "Loaded {} facilities (xxh64 {:016x})",
        facilities.len(),
        source_hash
    );

    Ok(Dataset {
        path: path.to_path_buf(),
        source_hash,
        facilities,
    })
}
