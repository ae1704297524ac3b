//! Error types for flood modelling and exposure analysis

use thiserror::Error;

/// Broad category of a failure, so callers can tell bad input data from bad
/// configuration from a single anomalous feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The grid or its georeference cannot support the computation
    InputData,
    /// A caller-supplied parameter was rejected before running
    Configuration,
    /// One vector feature could not be processed
    Feature,
    /// Reading or writing external data failed
    Io,
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Grid has no coordinate reference system")]
    MissingCrs,

    #[error("Cannot tell whether CRS {0} is geographic or projected")]
    UnclassifiedCrs(String),

    #[error("Elevation grid has no finite cells")]
    NoValidCells,

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("No reprojection from WGS84 to {0}")]
    UnsupportedCrs(String),

    #[error("Cannot reproject ({lon}, {lat}): {reason}")]
    Reprojection { lon: f64, lat: f64, reason: String },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}

impl Error {
    /// Shorthand for an [`Error::InvalidParameter`]
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// The failure category this error belongs to
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Io(_) | Error::Tiff(_) | Error::UnsupportedDataType(_) => ErrorClass::Io,
            Error::InvalidDimensions { .. }
            | Error::IndexOutOfBounds { .. }
            | Error::SizeMismatch { .. }
            | Error::MissingCrs
            | Error::UnclassifiedCrs(_)
            | Error::NoValidCells => ErrorClass::InputData,
            Error::InvalidParameter { .. } | Error::UnsupportedCrs(_) => ErrorClass::Configuration,
            Error::Reprojection { .. } | Error::InvalidGeometry(_) => ErrorClass::Feature,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
