use crate::{output::write_csv, OutputLayout, ParseError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ParserSettings {
    // text introducing every per-test segment, everything before the first one is preamble
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    // suite-relative path prefixes a segment has to start with
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,
    // extension terminating the test path
    #[serde(default = "default_extension")]
    pub extension: String,
    // literal text directly followed by the elapsed time
    // NOTE: the first occurrence wins, independent of the optimization level that was run
    #[serde(default = "default_timing_marker")]
    pub timing_marker: String,
    #[serde(default = "default_expected_segments")]
    pub expected_segments: usize,
    // glob selecting raw logs during a directory scan
    #[serde(default = "default_select")]
    pub select: String,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            prefixes: default_prefixes(),
            extension: default_extension(),
            timing_marker: default_timing_marker(),
            expected_segments: default_expected_segments(),
            select: default_select(),
        }
    }
}

fn default_delimiter() -> String {
    "Timing file ".into()
}

fn default_prefixes() -> Vec<String> {
    vec!["../bench0/".into(), "../bench1/".into()]
}

fn default_extension() -> String {
    ".l4".into()
}

fn default_timing_marker() -> String {
    "-O0: ".into()
}

fn default_expected_segments() -> usize {
    13
}

fn default_select() -> String {
    "bench0*.txt".into()
}

/// One test case extracted from a raw log
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TimingRecord {
    pub test: String,
    pub elapsed: u64,
}

impl TimingRecord {
    pub fn new(test: impl Into<String>, elapsed: u64) -> Self {
        Self {
            test: test.into(),
            elapsed,
        }
    }
}

/// Number of parsed segments differs from the configured amount
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountMismatch {
    pub file: PathBuf,
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for CountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} contains {} segments, expected {}",
            self.file.display(),
            self.actual,
            self.expected
        )
    }
}

#[derive(Clone, Debug)]
pub struct ParsedLog {
    pub records: Vec<TimingRecord>,
    pub mismatch: Option<CountMismatch>,
}

/// Outcome of a raw log that was parsed and written successfully
#[derive(Clone, Debug)]
pub struct ParseSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub records: Vec<TimingRecord>,
    pub mismatch: Option<CountMismatch>,
}

#[derive(Clone, Debug)]
pub struct LogParser {
    settings: ParserSettings,
    timing: Regex,
}

impl LogParser {
    pub fn new(settings: ParserSettings) -> Result<Self, ParseError> {
        if settings.delimiter.is_empty() {
            return Err(ParseError::EmptySetting("delimiter"));
        }
        if settings.timing_marker.is_empty() {
            return Err(ParseError::EmptySetting("timing_marker"));
        }
        if settings.extension.is_empty() {
            return Err(ParseError::EmptySetting("extension"));
        }
        if settings.prefixes.is_empty() {
            return Err(ParseError::EmptySetting("prefixes"));
        }

        // the leftmost match is always the first marker, an empty capture means no digits follow it
        let timing = Regex::new(&format!(
            "{}([0-9]*)",
            regex::escape(&settings.timing_marker)
        ))?;

        Ok(Self { settings, timing })
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// Split a raw log into segments and extract one record per segment.
    /// `file` is only used to label errors and the count mismatch.
    pub fn parse_str(&self, file: &Path, content: &str) -> Result<ParsedLog, ParseError> {
        let records = content
            .split(self.settings.delimiter.as_str())
            .skip(1)
            .enumerate()
            .map(|(segment, chunk)| self.parse_segment(file, segment, chunk))
            .collect::<Result<Vec<_>, _>>()?;

        let mismatch = (records.len() != self.settings.expected_segments).then(|| CountMismatch {
            file: file.to_path_buf(),
            expected: self.settings.expected_segments,
            actual: records.len(),
        });

        Ok(ParsedLog { records, mismatch })
    }

    fn parse_segment(
        &self,
        file: &Path,
        segment: usize,
        chunk: &str,
    ) -> Result<TimingRecord, ParseError> {
        let path = self
            .settings
            .prefixes
            .iter()
            .find_map(|prefix| chunk.strip_prefix(prefix.as_str()))
            .ok_or_else(|| {
                let width = self.settings.prefixes.iter().map(String::len).max().unwrap_or(0);

                ParseError::BadPrefix {
                    file: file.to_path_buf(),
                    segment,
                    found: chunk.chars().take(width).collect(),
                    expected: self.settings.prefixes.clone(),
                }
            })?;

        let test = match path.find(self.settings.extension.as_str()) {
            Some(end) => &path[..end],
            None => {
                return Err(ParseError::MissingExtension {
                    file: file.to_path_buf(),
                    segment,
                    extension: self.settings.extension.clone(),
                })
            }
        };

        let digits = self
            .timing
            .captures(chunk)
            .and_then(|captures| captures.get(1))
            .map(|digits| digits.as_str())
            .filter(|digits| !digits.is_empty())
            .ok_or_else(|| ParseError::MissingTiming {
                file: file.to_path_buf(),
                segment,
                marker: self.settings.timing_marker.clone(),
            })?;

        let elapsed = digits
            .parse::<u64>()
            .map_err(|source| ParseError::InvalidTiming {
                file: file.to_path_buf(),
                segment,
                digits: digits.to_owned(),
                source,
            })?;

        debug!(segment, test, elapsed, "Parsed segment");

        Ok(TimingRecord::new(test, elapsed))
    }

    /// Parse a raw log and write its records as CSV below the formatted root
    #[tracing::instrument(skip(self, layout), level = "debug")]
    pub fn parse_file(
        &self,
        path: &Path,
        layout: &OutputLayout,
    ) -> Result<ParseSummary, ParseError> {
        // resolve the destination first, a log outside the raw root should not be read at all
        let output = layout.output_path(path)?;
        let bytes = fs::read(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ParsedLog { records, mismatch } =
            self.parse_str(path, &String::from_utf8_lossy(&bytes))?;

        if let Some(ref mismatch) = mismatch {
            warn!(
                file = ?mismatch.file,
                actual = mismatch.actual,
                expected = mismatch.expected,
                "Unexpected number of segments: {mismatch}"
            );
        }

        write_csv(&output, &records)?;
        info!(
            "Wrote {} records from {} to {}",
            records.len(),
            path.display(),
            output.display()
        );

        Ok(ParseSummary {
            input: path.to_path_buf(),
            output,
            records,
            mismatch,
        })
    }
}
