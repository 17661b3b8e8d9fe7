use predicates::prelude::*;
use std::fs;
use assert_cmd::Command;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("trace-charts").unwrap();
    // keep a user's settings file and environment out of the tests
    cmd.env("XDG_CONFIG_HOME", std::env::temp_dir().join("trace-charts-cli-tests"));
    for var in ["THEME", "WIDTH", "HEIGHT", "LOCALE", "FONT"] {
        cmd.env_remove(format!("TRACE_CHARTS_{var}"));
    }
    cmd
}

#[test]
fn cli_shows_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("trace-charts"))
        .stdout(predicate::str::contains("render"));
}

#[test]
fn lists_chart_types() {
    cli()
        .arg("types")
        .assert()
        .success()
        .stdout("pie\nbar\nline\nheatmap\ntimeline\nflow\n");
}

#[test]
fn lists_themes_and_marks_the_current_one() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("settings.json");
    fs::write(
        &config,
        r##"{"theme": "ops", "themes": {"ops": {"background": "#000000", "text": "#ffffff",
            "grid": "#333333", "accent": "#00ff00", "colors": {"primary": ["#00ff00"]}}}}"##,
    )
    .unwrap();
    cli()
        .args(["themes", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("  default"))
        .stdout(predicate::str::contains("* ops"));
}

#[test]
fn renders_svg_from_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("io.json");
    let out = dir.path().join("io.svg");
    fs::write(&data, r#"{"sda": 120, "sdb": 45}"#).unwrap();
    cli()
        .args(["render", "--type", "bar", "--width", "400", "--height", "300", "--data"])
        .arg(&data)
        .arg("--out")
        .arg(&out)
        .args(["--options", r#"{"title": "Reads per device"}"#])
        .assert()
        .success()
        .stderr(predicate::str::contains("Wrote bar chart (2 records)"));
    let svg = fs::read_to_string(&out).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("viewBox=\"0 0 400 300\""));
    assert!(svg.contains("Reads per device"));
}

#[test]
fn exports_csv_from_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("flows.csv");
    cli()
        .args(["render", "-t", "flow", "-d", "-", "-o"])
        .arg(&out)
        .write_stdin(r#"{"links": [{"source": "a", "target": "b", "count": 4}]}"#)
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&out).unwrap(), "source,target,count\na,b,4");
}

#[test]
fn png_output_is_inferred_from_the_extension() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("counts.json");
    let out = dir.path().join("counts.png");
    fs::write(&data, r#"[{"label": "tcp", "value": 3}, {"label": "udp", "value": 1}]"#).unwrap();
    cli()
        .args(["render", "--type", "pie", "--theme", "dark", "--data"])
        .arg(&data)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    assert!(fs::read(&out).unwrap().starts_with(b"\x89PNG"));
}

#[test]
fn unknown_chart_type_fails() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("d.json");
    fs::write(&data, "{}").unwrap();
    cli()
        .args(["render", "--type", "sunburst", "--out", "x.svg", "--data"])
        .arg(&data)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown chart type"));
}

#[test]
fn empty_data_cannot_be_drawn() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("d.json");
    let out = dir.path().join("d.svg");
    fs::write(&data, "[]").unwrap();
    cli()
        .args(["render", "--type", "line", "--data"])
        .arg(&data)
        .arg("--out")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No data available"));
    assert!(!out.exists());
}

#[test]
fn unknown_theme_fails() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("d.json");
    fs::write(&data, r#"{"a": 1}"#).unwrap();
    cli()
        .args(["render", "--type", "pie", "--theme", "neon", "--out", "x.svg", "--data"])
        .arg(&data)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown theme `neon`"));
}
