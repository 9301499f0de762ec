use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Pair of directory roots: raw logs are read below `raw`, CSVs are written
/// to the mirrored location below `formatted`
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OutputLayout {
    #[serde(default = "default_raw_root")]
    pub raw: PathBuf,
    #[serde(default = "default_formatted_root")]
    pub formatted: PathBuf,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            raw: default_raw_root(),
            formatted: default_formatted_root(),
        }
    }
}

fn default_raw_root() -> PathBuf {
    PathBuf::from("timeData/RawOutput")
}

fn default_formatted_root() -> PathBuf {
    PathBuf::from("timeData/FormattedOutput")
}

impl OutputLayout {
    pub fn new(raw: impl Into<PathBuf>, formatted: impl Into<PathBuf>) -> Self {
        Self {
            raw: raw.into(),
            formatted: formatted.into(),
        }
    }

    /// Relocate `input` from the raw root to the formatted root and replace
    /// everything after the first `.` of the file name with `csv`
    pub fn output_path(&self, input: &Path) -> Result<PathBuf, ParseError> {
        let outside = || ParseError::OutsideRawRoot {
            path: input.to_path_buf(),
            root: self.raw.clone(),
        };

        let relative = input.strip_prefix(&self.raw).map_err(|_| outside())?;
        let file_name = relative.file_name().ok_or_else(outside)?.to_string_lossy();
        let base = file_name
            .split_once('.')
            .map_or(file_name.as_ref(), |(base, _)| base);

        let mut output = self.formatted.join(relative);
        output.set_file_name(format!("{base}.csv"));

        Ok(output)
    }
}
