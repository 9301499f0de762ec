pub mod layout;
pub mod output;
pub mod parser;
pub mod scan;


pub use layout::OutputLayout;
pub use output::write_csv;
pub use parser::{CountMismatch, LogParser, ParseSummary, ParsedLog, ParserSettings, TimingRecord};
pub use scan::{scan, ScanReport};

use std::{num::ParseIntError, path::PathBuf};
use thiserror::Error;

/// Everything that can abort the processing of a single raw log
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}: segment {segment} starts with {found:?}, expected one of {expected:?}", file.display())]
    BadPrefix {
        file: PathBuf,
        segment: usize,
        found: String,
        expected: Vec<String>,
    },
    #[error("{}: segment {segment} has no {extension:?} extension after the test path", file.display())]
    MissingExtension {
        file: PathBuf,
        segment: usize,
        extension: String,
    },
    #[error("{}: segment {segment} has no timing value after {marker:?}", file.display())]
    MissingTiming {
        file: PathBuf,
        segment: usize,
        marker: String,
    },
    #[error("{}: segment {segment} timing {digits:?} is not a valid time: {source}", file.display())]
    InvalidTiming {
        file: PathBuf,
        segment: usize,
        digits: String,
        source: ParseIntError,
    },
    #[error("Failed to write {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[error("{} is not located below the raw output root {}", path.display(), root.display())]
    OutsideRawRoot { path: PathBuf, root: PathBuf },
    #[error("Selection glob is invalid")]
    InvalidGlob(#[from] globset::Error),
    #[error("Timing marker could not be compiled")]
    InvalidMarker(#[from] regex::Error),
    #[error("Parser setting `{0}` must not be empty")]
    EmptySetting(&'static str),
}
