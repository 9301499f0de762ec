use crate::{
    config::{ConfigErrors, ExperimentConfig, Stage},
    executor::Executor,
};
use clap::{ArgAction, Parser, Subcommand};
use optbench_ingest::{scan, LogParser};
use std::path::PathBuf;
use tracing::{error, info};

/// Time compiler optimization settings and turn the raw timing logs into CSV files
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Experiment configuration (YAML), the reference setup is used when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity, overridden by RUST_LOG
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Parse captured raw logs into CSV files (default)
    Parse,
    /// Print every setting that would be timed
    Settings,
    /// Time every setting on every suite
    Run {
        /// Only print the commands
        #[arg(long)]
        dry_run: bool,
        /// Parse the raw logs once all runs finished
        #[arg(long)]
        parse: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ExperimentConfig, ConfigErrors> {
    match path {
        Some(path) => ExperimentConfig::load(path),
        None => {
            info!("No config given, using the reference configuration");

            Ok(ExperimentConfig::default())
        }
    }
}

/// returns true if every selected log was parsed
fn parse(config: &ExperimentConfig) -> bool {
    if config.preflight_checks(Stage::Parse) {
        return false;
    }

    let parser = match LogParser::new(config.parse.clone()) {
        Ok(parser) => parser,
        Err(e) => {
            error!("Failed to set up the log parser: {e}");
            return false;
        }
    };

    match scan(&parser, &config.layout) {
        Ok(report) => {
            // count mismatches were already reported by the parser
            for (path, e) in report.failed.iter() {
                error!("{}: {e}", path.display());
            }
            info!(
                "Parsed {} raw logs, {} failed",
                report.parsed.len(),
                report.failed.len()
            );

            report.is_clean()
        }
        Err(e) => {
            error!("Failed to scan {}: {e}", config.layout.raw.display());
            false
        }
    }
}

fn print_settings(config: &ExperimentConfig) -> bool {
    let settings = config.settings();

    for setting in settings.iter() {
        println!("{}\t{}", setting.label, setting.flags);
    }
    info!("{} settings", settings.len());

    true
}

/// returns true if every run finished successfully
fn run(config: &ExperimentConfig, dry_run: bool) -> bool {
    let settings = config.settings();
    let executor = Executor::load(config);

    if dry_run {
        for (log, command) in executor.plan(&settings) {
            println!("{command:?} > {}", log.display());
        }

        return true;
    }

    if config.preflight_checks(Stage::Run) {
        return false;
    }

    match executor.execute(&settings) {
        Ok(report) => {
            for failure in report.failed.iter() {
                error!("{} on {}: {}", failure.label, failure.suite, failure.error);
            }
            info!(
                "Finished {} runs, {} failed",
                report.completed.len(),
                report.failed.len()
            );

            report.is_clean()
        }
        Err(e) => {
            error!("Failed to start the experiment: {e}");
            false
        }
    }
}

/// Dispatch `cli`, parsing raw logs when no subcommand is given.
/// Returns true if every selected log or run succeeded and the config was valid.
pub fn execute(cli: Cli) -> bool {
    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return false;
        }
    };

    match cli.command.unwrap_or(Commands::Parse) {
        Commands::Parse => parse(&config),
        Commands::Settings => print_settings(&config),
        Commands::Run {
            dry_run,
            parse: then_parse,
        } => {
            // logs of a failed run are still worth parsing
            let ran = run(&config, dry_run);

            if then_parse && !dry_run {
                parse(&config) && ran
            } else {
                ran
            }
        }
    }
}
