use crate::{
    combinations::Setting,
    config::{check_executable, ConfigErrors, ExperimentConfig, Stage},
};
use std::{fs, os::unix::fs::PermissionsExt, path::PathBuf};

#[test]
pub fn empty_document_is_reference() {
    let config = ExperimentConfig::from_yaml("").unwrap();

    assert_eq!(config, ExperimentConfig::default());
    assert_eq!(config.options.len(), 6);
    assert_eq!(config.suites, vec!["bench0", "bench1"]);
    assert_eq!(config.tool.limit_run, 30);
    assert_eq!(config.parse.expected_segments, 13);
    assert_eq!(config.parse.timing_marker, "-O0: ");
    // 6 singles, 15 pairs and 3 presets
    assert_eq!(config.settings().len(), 24);
}

#[test]
pub fn partial_document() {
    let config = ExperimentConfig::from_yaml(
        "options:
  A: -a
  B: -b
suites: [bench1]
tool:
  exec: /opt/timecompiler
  timeout: 600
layout:
  raw: logs/RawOutput
parse:
  expected_segments: 20
",
    )
    .unwrap();

    assert_eq!(config.options.len(), 2);
    assert_eq!(config.suites, vec!["bench1"]);
    assert_eq!(config.tool.exec, PathBuf::from("/opt/timecompiler"));
    assert_eq!(config.tool.limit_run, 30);
    assert_eq!(config.tool.timeout().unwrap().as_secs(), 600);
    assert_eq!(config.layout.raw, PathBuf::from("logs/RawOutput"));
    assert_eq!(config.parse.expected_segments, 20);
    assert_eq!(config.parse.select, "bench0*.txt");
    assert_eq!(config.settings().len(), 3 + 3);
}

#[test]
pub fn unknown_fields_are_rejected() {
    assert!(matches!(
        ExperimentConfig::from_yaml("tool:\n  exec: x\n  retries: 3\n"),
        Err(ConfigErrors::Deserialize(_))
    ));
}

#[test]
pub fn parse_stage_ignores_tool() {
    let mut config = ExperimentConfig::default();
    config.tool.exec = PathBuf::from("/definitely/not/here");

    assert!(!config.preflight_checks(Stage::Parse));
    assert!(config.preflight_checks(Stage::Run));
}

#[test]
pub fn run_stage_accepts_executable_tool() {
    let dir = tempfile::tempdir().unwrap();
    let tool = dir.path().join("timecompiler");
    fs::write(&tool, "#!/bin/sh\n").unwrap();
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

    let mut config = ExperimentConfig::default();
    config.tool.exec = tool.clone();
    assert!(!config.preflight_checks(Stage::Run));

    fs::set_permissions(&tool, fs::Permissions::from_mode(0o644)).unwrap();
    assert!(!check_executable(&tool).unwrap());
    assert!(config.preflight_checks(Stage::Run));
}

#[test]
pub fn duplicate_labels_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    let tool = dir.path().join("timecompiler");
    fs::write(&tool, "#!/bin/sh\n").unwrap();
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

    let mut config = ExperimentConfig::default();
    config.tool.exec = tool;
    config.presets.push(Setting::new("DeadCode", "--killDeadCode"));

    assert!(config.preflight_checks(Stage::Run));
}

#[test]
pub fn invalid_parse_settings_are_errors() {
    let mut config = ExperimentConfig::default();
    config.parse.prefixes.clear();

    assert!(config.preflight_checks(Stage::Parse));
}

#[test]
pub fn missing_file_is_read_error() {
    assert!(matches!(
        ExperimentConfig::load(&PathBuf::from("/definitely/not/here.yaml")),
        Err(ConfigErrors::Read { .. })
    ));
}

#[test]
pub fn labels_with_separators_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    let tool = dir.path().join("timecompiler");
    fs::write(&tool, "#!/bin/sh\n").unwrap();
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

    let mut config = ExperimentConfig::default();
    config.tool.exec = tool;
    assert!(!config.preflight_checks(Stage::Run));

    config
        .options
        .insert("Alloc/5".to_owned(), "-r 5".to_owned());
    assert!(config.preflight_checks(Stage::Run));

    config.options.remove("Alloc/5");
    assert!(!config.preflight_checks(Stage::Run));
    config.presets.push(Setting::new("O3/fast", "-r 9"));
    assert!(config.preflight_checks(Stage::Run));
}
