use optbench_ingest::{scan, LogParser, OutputLayout, ParseError, ParserSettings};
use std::{fs, os::unix::fs::symlink, path::Path};

fn write_log(dir: &Path, name: &str, segments: &[(&str, u64)]) {
    let mut content = String::from("timecompiler: running bench0\n");

    for (test, elapsed) in segments {
        content.push_str(&format!(
            "Timing file ../bench0/{test}.l4\n  -O0: {elapsed}\n  -O1: 1\n"
        ));
    }

    fs::write(dir.join(name), content).unwrap();
}

fn thirteen() -> Vec<(String, u64)> {
    (0..13).map(|i| (format!("t{i}"), 100 + i)).collect()
}

#[test]
fn scan_parses_selected_logs_and_survives_failures() {
    let root = tempfile::tempdir().unwrap();
    let raw = root.path().join("RawOutput");
    let formatted = root.path().join("FormattedOutput");
    fs::create_dir_all(&raw).unwrap();

    let good = thirteen();
    let good_refs = good.iter().map(|(t, e)| (t.as_str(), *e)).collect::<Vec<_>>();
    write_log(&raw, "bench0RawOutput_DeadCode.txt", &good_refs);
    write_log(&raw, "bench0RawOutput_O1.txt", &good_refs[..10]);
    fs::write(
        raw.join("bench0RawOutput_Broken.txt"),
        "Timing file ../bench0/x.l4\n  no timing here\n",
    )
    .unwrap();
    // not selected
    write_log(&raw, "bench1RawOutput_DeadCode.txt", &good_refs);
    fs::write(raw.join("bench0notes.md"), "ignore me").unwrap();

    let layout = OutputLayout::new(&raw, &formatted);
    let parser = LogParser::new(ParserSettings::default()).unwrap();
    let report = scan(&parser, &layout).unwrap();

    assert_eq!(report.parsed.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(!report.is_clean());

    let (failed_path, error) = &report.failed[0];
    assert!(failed_path.ends_with("bench0RawOutput_Broken.txt"));
    assert!(matches!(error, ParseError::MissingTiming { segment: 0, .. }));
    assert!(!formatted.join("bench0RawOutput_Broken.csv").exists());

    let csv = fs::read_to_string(formatted.join("bench0RawOutput_DeadCode.csv")).unwrap();
    let expected = good
        .iter()
        .map(|(test, elapsed)| format!("{test},{elapsed}\r\n"))
        .collect::<String>();
    assert_eq!(csv, expected);

    let mismatches = report.mismatches().collect::<Vec<_>>();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].actual, 10);
    assert!(mismatches[0].file.ends_with("bench0RawOutput_O1.txt"));
    let short = fs::read_to_string(formatted.join("bench0RawOutput_O1.csv")).unwrap();
    assert_eq!(short.lines().count(), 10);

    assert!(!formatted.join("bench1RawOutput_DeadCode.csv").exists());
    assert!(!formatted.join("bench0notes.csv").exists());
}

#[test]
fn reparsing_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let raw = root.path().join("RawOutput");
    fs::create_dir_all(&raw).unwrap();
    write_log(&raw, "bench0RawOutput_O2.txt", &[("a", 1), ("b", 2)]);

    let layout = OutputLayout::new(&raw, root.path().join("FormattedOutput"));
    let parser = LogParser::new(ParserSettings::default()).unwrap();

    let first = scan(&parser, &layout).unwrap();
    let output = first.parsed[0].output.clone();
    let before = fs::read_to_string(&output).unwrap();

    scan(&parser, &layout).unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), before);
    assert_eq!(before, "a,1\r\nb,2\r\n");
}

#[test]
fn missing_raw_root_is_an_error() {
    let root = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(root.path().join("nope"), root.path().join("out"));
    let parser = LogParser::new(ParserSettings::default()).unwrap();

    assert!(matches!(
        scan(&parser, &layout),
        Err(ParseError::Io { .. })
    ));
}

#[test]
fn symlinked_logs_are_selected() {
    let root = tempfile::tempdir().unwrap();
    let raw = root.path().join("RawOutput");
    let archive = root.path().join("archive");
    fs::create_dir_all(&raw).unwrap();
    fs::create_dir_all(&archive).unwrap();

    let good = thirteen();
    let good_refs = good.iter().map(|(t, e)| (t.as_str(), *e)).collect::<Vec<_>>();
    write_log(&archive, "run1.txt", &good_refs);
    symlink(archive.join("run1.txt"), raw.join("bench0RawOutput_O0.txt")).unwrap();
    // dangling links and directories are skipped, not parsed
    symlink(archive.join("missing.txt"), raw.join("bench0RawOutput_O1.txt")).unwrap();
    fs::create_dir_all(raw.join("bench0RawOutput_O2.txt")).unwrap();

    let formatted = root.path().join("FormattedOutput");
    let layout = OutputLayout::new(&raw, &formatted);
    let parser = LogParser::new(ParserSettings::default()).unwrap();
    let report = scan(&parser, &layout).unwrap();

    assert_eq!(report.parsed.len(), 1);
    assert!(report.is_clean());
    assert_eq!(report.parsed[0].records.len(), 13);
    assert!(formatted.join("bench0RawOutput_O0.csv").is_file());
    assert!(!formatted.join("bench0RawOutput_O2.csv").exists());
}
