use crate::{CountMismatch, LogParser, OutputLayout, ParseError, ParseSummary};
use globset::GlobBuilder;
use ignore::{DirEntry, WalkBuilder};
use std::{fs, path::PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Default)]
pub struct ScanReport {
    pub parsed: Vec<ParseSummary>,
    pub failed: Vec<(PathBuf, ParseError)>,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &CountMismatch> {
        self.parsed
            .iter()
            .filter_map(|summary| summary.mismatch.as_ref())
    }
}

/// Parse every selected raw log directly inside the raw root.
/// A failing file is recorded in the report and never stops the scan.
#[tracing::instrument(skip(parser), level = "info")]
pub fn scan(parser: &LogParser, layout: &OutputLayout) -> Result<ScanReport, ParseError> {
    let glob = GlobBuilder::new(&parser.settings().select)
        .literal_separator(true)
        .build()?
        .compile_matcher();

    if let Err(source) = fs::read_dir(&layout.raw) {
        return Err(ParseError::Io {
            path: layout.raw.clone(),
            source,
        });
    }

    let mut builder = WalkBuilder::new(&layout.raw);

    // only direct children, hidden or ignored logs are still logs
    builder
        .max_depth(Some(1))
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b));

    let paths = builder
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Failed to read an entry of {}: {e}", layout.raw.display());
                None
            }
        })
        .filter(|entry| entry.depth() > 0 && glob.is_match(entry.file_name()))
        // follows symlinks, a linked log is selected like a regular one
        .filter(|entry| {
            let is_file = entry.path().is_file();

            if !is_file {
                warn!("Skipping {}, it is not a file", entry.path().display());
            }

            is_file
        })
        .map(DirEntry::into_path)
        .collect::<Vec<_>>();

    info!("Selected {} raw logs in {}", paths.len(), layout.raw.display());

    let mut report = ScanReport::default();

    for path in paths {
        match parser.parse_file(&path, layout) {
            Ok(summary) => report.parsed.push(summary),
            Err(e) => {
                error!(path = ?path, "Failed to parse raw log: {e}");
                report.failed.push((path, e));
            }
        }
    }

    Ok(report)
}
