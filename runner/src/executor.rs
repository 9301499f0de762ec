use crate::{
    combinations::Setting,
    config::{ExperimentConfig, ToolConfig},
};
use itertools::iproduct;
use nix::{
    sys::signal::{killpg, Signal},
    unistd::Pid,
};
use std::{
    fs::{self, File},
    os::unix::process::CommandExt,
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use wait_timeout::ChildExt;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Failed to create raw log {}: {source}", path.display())]
    CreateLog {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to spawn timing tool {}: {source}", exec.display())]
    Spawn {
        exec: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to wait for the timing tool: {0}")]
    Wait(#[source] std::io::Error),
    #[error("Timing tool exited abnormally ({status})")]
    AbnormalExit { status: ExitStatus },
    #[error("Timing tool ran into the timeout of {0:?} and was killed")]
    Timeout(Duration),
}

/// `<dir>/<suite>RawOutput_<label>.txt`
pub fn raw_log_path(dir: &Path, suite: &str, label: &str) -> PathBuf {
    dir.join(format!("{suite}RawOutput_{label}.txt"))
}

#[derive(Debug, Clone)]
pub struct RunRecord {
    pub suite: String,
    pub label: String,
    pub log: PathBuf,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct RunFailure {
    pub suite: String,
    pub label: String,
    pub error: ExecutorError,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub completed: Vec<RunRecord>,
    pub failed: Vec<RunFailure>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The external program producing the raw timing logs
#[derive(Debug, Clone)]
pub struct TimingTool {
    pub exec: PathBuf,
    pub limit_run: u32,
    pub timeout: Option<Duration>,
}

impl TimingTool {
    pub fn load(config: &ToolConfig) -> Self {
        Self {
            exec: config.exec.clone(),
            limit_run: config.limit_run,
            timeout: config.timeout(),
        }
    }

    /// `<exec> <suite> --limit-run=<N> -a <flags>`, flags are split on whitespace like a shell would
    pub fn command(&self, suite: &str, setting: &Setting) -> Command {
        let mut command = Command::new(&self.exec);

        command
            .arg(suite)
            .arg(format!("--limit-run={}", self.limit_run))
            .arg("-a")
            .args(setting.flags.split_whitespace());

        command
    }

    /// Time `setting` on `suite`, stdout and stderr of the tool both end up in the raw log
    #[instrument(skip(self, setting), fields(label = %setting.label), level = "info")]
    pub fn run(
        &self,
        suite: &str,
        setting: &Setting,
        dir: &Path,
    ) -> Result<RunRecord, ExecutorError> {
        let log = raw_log_path(dir, suite, &setting.label);
        let create_error = |source| ExecutorError::CreateLog {
            path: log.clone(),
            source,
        };

        let stdout = File::create(&log).map_err(create_error)?;
        let stderr = stdout.try_clone().map_err(create_error)?;

        let mut command = self.command(suite, setting);

        debug!("Running {command:?} > {}", log.display());

        // a killed tool must not leave children writing into the log, so it gets its own group
        // NOTE: only with a timeout, otherwise Ctrl-C should still reach the tool
        if self.timeout.is_some() {
            command.process_group(0);
        }

        let start = Instant::now();
        let mut child = command
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| ExecutorError::Spawn {
                exec: self.exec.clone(),
                source,
            })?;

        let status = match self.timeout {
            Some(timeout) => match child.wait_timeout(timeout).map_err(ExecutorError::Wait)? {
                Some(status) => status,
                None => {
                    // child hasn't exited yet, the group id equals its pid
                    if let Err(errno) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
                        warn!("Failed to kill process group of {}: {errno}", child.id());

                        if let Err(e) = child.kill() {
                            warn!("Failed to kill timing tool {}: {e}", child.id());
                        }
                    }
                    child.wait().map_err(ExecutorError::Wait)?;

                    return Err(ExecutorError::Timeout(timeout));
                }
            },
            None => child.wait().map_err(ExecutorError::Wait)?,
        };
        let elapsed = start.elapsed();

        debug!(
            "Finished in {} ms | status: {}",
            elapsed.as_millis(),
            status.success()
        );

        if !status.success() {
            return Err(ExecutorError::AbnormalExit { status });
        }

        Ok(RunRecord {
            suite: suite.to_owned(),
            label: setting.label.clone(),
            log,
            elapsed,
        })
    }
}

/// Times every setting on every suite, one blocking run after another
#[derive(Debug, Clone)]
pub struct Executor {
    tool: TimingTool,
    suites: Vec<String>,
    output: PathBuf,
}

impl Executor {
    pub fn load(config: &ExperimentConfig) -> Self {
        Self::new(
            TimingTool::load(&config.tool),
            config.suites.clone(),
            config.layout.raw.clone(),
        )
    }

    pub fn new(tool: TimingTool, suites: Vec<String>, output: PathBuf) -> Self {
        Self {
            tool,
            suites,
            output,
        }
    }

    /// raw log and command for every setting x suite pair, nothing is spawned
    pub fn plan(&self, settings: &[Setting]) -> Vec<(PathBuf, Command)> {
        iproduct!(settings, self.suites.iter())
            .map(|(setting, suite)| {
                (
                    raw_log_path(&self.output, suite, &setting.label),
                    self.tool.command(suite, setting),
                )
            })
            .collect()
    }

    /// Run all pairs, a failing pair is recorded and never stops the remaining ones.
    /// Only failing to create the output directory aborts the experiment.
    #[instrument(skip_all, level = "info")]
    pub fn execute(&self, settings: &[Setting]) -> Result<RunReport, ExecutorError> {
        fs::create_dir_all(&self.output).map_err(|source| ExecutorError::CreateLog {
            path: self.output.clone(),
            source,
        })?;

        let total = settings.len() * self.suites.len();
        let mut report = RunReport::default();

        info!(
            "Timing {} settings on {} suites with {}",
            settings.len(),
            self.suites.len(),
            self.tool.exec.display()
        );

        for (processed, (setting, suite)) in iproduct!(settings, self.suites.iter()).enumerate() {
            debug!("Flags for {}: {}", setting.label, setting.flags);

            match self.tool.run(suite, setting, &self.output) {
                Ok(record) => report.completed.push(record),
                Err(e) => {
                    error!(suite = suite.as_str(), label = setting.label.as_str(), "Run failed: {e}");
                    report.failed.push(RunFailure {
                        suite: suite.clone(),
                        label: setting.label.clone(),
                        error: e,
                    });
                }
            }

            info!("Done with {}/{total}", processed + 1);
        }

        Ok(report)
    }
}
