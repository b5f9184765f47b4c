//! Error type shared by the library modules.

use thiserror::Error;

/// Errors produced while loading facilities or computing overlaps.
#[derive(Debug, Error)]
pub enum Error {
    /// A facility failed validation (coordinates, duplicate id, region bounds)
    #[error("invalid facility '{facility}': {reason}")]
    InvalidInput { facility: String, reason: String },

    #[error("dataset contains no facilities")]
    EmptyDataset,

    #[error("service radius must be a positive number of miles, got {0}")]
    InvalidRadius(f64),

    #[error("input is missing required column '{0}'")]
    MissingColumn(String),

    /// A row of the input file could not be turned into a facility.
    /// `row` is the 1-based data row, header excluded.
    #[error("invalid record at row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    #[error("facilities {facilities:?} share location {location} but are not verified as co-located")]
    UnverifiedColocation {
        location: String,
        facilities: Vec<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn invalid(facility: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            facility: facility.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
