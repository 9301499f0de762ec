use crate::{ParseError, TimingRecord};
use csv::{Terminator, WriterBuilder};
use std::{fs, path::Path};

/// Write `records` as headerless, CRLF terminated `test,elapsed` rows, replacing any previous file
pub fn write_csv(path: &Path, records: &[TimingRecord]) -> Result<(), ParseError> {
    let csv_error = |source| ParseError::Csv {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ParseError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::CRLF)
        .from_path(path)
        .map_err(csv_error)?;

    for record in records {
        writer.serialize(record).map_err(csv_error)?;
    }

    writer.flush().map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })
}
