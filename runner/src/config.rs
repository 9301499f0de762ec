use crate::combinations::{self, OptionMap, Setting};
use itertools::Itertools;
use optbench_ingest::{OutputLayout, ParserSettings};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Error,
    os::unix::fs::MetadataExt,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tracing::{error, warn};

// check if a file is executable
pub fn check_executable(path: &Path) -> Result<bool, ConfigErrors> {
    if !path.is_file() {
        Err(ConfigErrors::FileNotFound)
    } else {
        match File::open(path).map(|file| file.metadata()) {
            Ok(Ok(metadata)) => Ok((metadata.mode() & 0o111) != 0),
            Ok(Err(e)) | Err(e) => Err(ConfigErrors::MetadataNotFound(e)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("File not found")]
    FileNotFound,
    #[error("Metadata not found")]
    MetadataNotFound(#[from] Error),
    #[error("Failed to read config {}: {source}", path.display())]
    Read { path: PathBuf, source: Error },
    #[error("Failed to deserialize config")]
    Deserialize(#[from] serde_yaml::Error),
}

/// What the configuration is about to be used for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Run,
    Parse,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    // option name -> flag, combined into settings of one and two options
    #[serde(default = "default_options")]
    pub options: OptionMap,
    // fixed settings timed in addition to the generated ones
    #[serde(default = "combinations::presets")]
    pub presets: Vec<Setting>,
    // benchmark suites passed to the timing tool
    #[serde(default = "default_suites")]
    pub suites: Vec<String>,
    #[serde(default)]
    pub tool: ToolConfig,
    // raw logs are written to and read from `layout.raw`
    #[serde(default)]
    pub layout: OutputLayout,
    #[serde(default)]
    pub parse: ParserSettings,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    #[serde(default = "default_tool_exec")]
    pub exec: PathBuf,
    // forwarded as --limit-run
    #[serde(default = "default_limit_run")]
    pub limit_run: u32,
    // seconds, the tool is trusted to enforce its own limit when absent
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            exec: default_tool_exec(),
            limit_run: default_limit_run(),
            timeout: None,
        }
    }
}

impl ToolConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            options: default_options(),
            presets: combinations::presets(),
            suites: default_suites(),
            tool: ToolConfig::default(),
            layout: OutputLayout::default(),
            parse: ParserSettings::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        let content = fs::read_to_string(path).map_err(|source| ConfigErrors::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigErrors> {
        // an empty document is the reference configuration
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        match serde_yaml::from_str::<Self>(content) {
            Ok(config) => Ok(config),
            Err(e) => {
                error!("Failed to deserialize config: {e}");

                Err(e.into())
            }
        }
    }

    /// every setting of the experiment, generated ones first
    pub fn settings(&self) -> Vec<Setting> {
        combinations::settings(&self.options, &self.presets)
    }

    /// Validate the configuration for `stage`, returns true if an error was found.
    /// All problems are logged instead of stopping at the first one.
    pub fn preflight_checks(&self, stage: Stage) -> bool {
        let mut contains_error = false;

        if self.parse.prefixes.is_empty() {
            error!("parse.prefixes is empty, no segment could ever be accepted");
            contains_error = true;
        }

        for (name, value) in [
            ("delimiter", &self.parse.delimiter),
            ("extension", &self.parse.extension),
            ("timing_marker", &self.parse.timing_marker),
        ] {
            if value.is_empty() {
                error!("parse.{name} must not be empty");
                contains_error = true;
            }
        }

        if self.parse.expected_segments == 0 {
            warn!("parse.expected_segments is 0, every non-empty log will be reported");
        }

        if stage == Stage::Parse {
            return contains_error;
        }

        if self.suites.is_empty() {
            error!("No suite was defined, unable to time any setting");
            contains_error = true;
        }

        if self.tool.limit_run == 0 {
            error!("tool.limit_run cannot be 0");
            contains_error = true;
        }

        if self.tool.timeout == Some(0) {
            error!("tool.timeout cannot be 0, omit it to disable the timeout");
            contains_error = true;
        }

        for name in self.options.keys().filter(|name| name.contains('-')) {
            warn!("Option {name} contains '-', its labels will be ambiguous");
        }

        let settings = self.settings();

        // labels become part of the raw log file name
        for setting in settings
            .iter()
            .filter(|setting| setting.label.contains(['/', '\0']))
        {
            error!(
                "Label {:?} contains a path separator or NUL, it cannot name a raw log",
                setting.label
            );
            contains_error = true;
        }

        // settings with equal labels would overwrite each others logs
        for (label, count) in settings
            .iter()
            .map(|setting| setting.label.as_str())
            .counts()
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .sorted()
        {
            error!("Label {label} is used by {count} settings");
            contains_error = true;
        }

        match check_executable(&self.tool.exec) {
            Ok(true) => {}
            Ok(false) => {
                error!(
                    "Timing tool {} is not executable",
                    self.tool.exec.to_string_lossy()
                );
                contains_error = true;
            }
            Err(e) => {
                error!(
                    "Failed to determine if tool.exec ({}) is an executable: {e}",
                    self.tool.exec.to_string_lossy()
                );
                contains_error = true;
            }
        }

        contains_error
    }
}

fn default_options() -> OptionMap {
    [
        ("DeadCode", "--killDeadCode"),
        ("ConstOpts", "--doConstOpts"),
        ("Inlining", "--doInlining"),
        ("OnlyPushOnce", "--onlyPushOnce"),
        ("Alloc5More", "-r 5"),
        ("unsafe", "--unsafeForExperiments"),
    ]
    .into_iter()
    .map(|(name, flag)| (name.to_owned(), flag.to_owned()))
    .collect()
}

fn default_suites() -> Vec<String> {
    vec!["bench0".into(), "bench1".into()]
}

fn default_tool_exec() -> PathBuf {
    PathBuf::from("../grader/timecompiler")
}

fn default_limit_run() -> u32 {
    30
}
