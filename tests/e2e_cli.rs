//! CLI end-to-end tests
//!
//! Tests for the castforged command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Get a command for the castforged binary
#[allow(deprecated)]
fn castforged_cmd() -> Command {
    Command::cargo_bin("castforged").unwrap()
}

/// Write a config file so tests never pick up one from the working directory.
fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("castforged.toml");
    fs::write(&path, contents).unwrap();
    path
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = castforged_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = castforged_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("castforged"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = castforged_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("castforged"));
}

#[test]
fn test_cli_tokenize() {
    let mut cmd = castforged_cmd();
    cmd.args(["tokenize", r#"ffmpeg -i "my movie.mkv" -f mpegts 'pipe:'"#])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"["ffmpeg","-i","my movie.mkv","-f","mpegts","pipe:"]"#,
        ));
}

#[test]
fn test_cli_tokenize_unclosed_quote() {
    let mut cmd = castforged_cmd();
    cmd.args(["tokenize", "ffmpeg -i 'movie.mkv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unclosed quote"));
}

#[test]
fn test_cli_tokenize_escape_first_char() {
    let mut cmd = castforged_cmd();
    cmd.args(["tokenize", "--escape-first-char", "\"abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"["\"abc"]"#));
}

#[test]
fn test_cli_range() {
    let mut cmd = castforged_cmd();
    cmd.args([
        "range",
        "bytes=500-999",
        "--size",
        "1000",
        "--duration",
        "0:01:40",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("npt=00:00:50.000-00:01:40.000"))
    .stdout(predicate::str::contains(
        "npt=00:00:50.000-00:01:40.000/00:01:40.000 bytes=500-999/1000",
    ));
}

#[test]
fn test_cli_range_out_of_bounds() {
    let mut cmd = castforged_cmd();
    cmd.args(["range", "bytes=0-1000", "--size", "1000", "--duration", "0:01:40"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of bounds"));
}

#[test]
fn test_cli_features() {
    let mut cmd = castforged_cmd();
    cmd.args([
        "features",
        "--profile-name",
        "MP3",
        "--time-seek",
        "--byte-range",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains(
        "DLNA.ORG_PN=MP3;DLNA.ORG_OP=11;DLNA.ORG_CI=0;DLNA.ORG_FLAGS=01700000000000000000000000000000",
    ));
}

#[test]
fn test_cli_plan_vp8() {
    let temp = tempdir().unwrap();
    let config = write_config(&temp, "");

    let mut cmd = castforged_cmd();
    cmd.args([
        "plan",
        "--config",
        path_str(&config),
        "/media/movie.mkv",
        "--profile",
        "vp8-webm",
        "--start",
        "0:01:30",
        "--length",
        "0:00:10",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("-ss 0:01:30 -t 0:00:10 -i /media/movie.mkv"))
    .stdout(predicate::str::contains("-f webm pipe:"));
}

#[test]
fn test_cli_plan_custom_quotes_paths() {
    let temp = tempdir().unwrap();
    let config = write_config(&temp, "");

    let mut cmd = castforged_cmd();
    cmd.args([
        "plan",
        "--config",
        path_str(&config),
        "/media/my movie.mkv",
        "--profile",
        "custom",
        "--custom-command",
        "encoder --in {input} --out -",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("encoder --in '/media/my movie.mkv' --out -"));
}

#[test]
fn test_cli_plan_unknown_profile() {
    let mut cmd = castforged_cmd();
    cmd.args(["plan", "/media/movie.mkv", "--profile", "divx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown transcode profile"));
}

#[cfg(unix)]
#[test]
fn test_cli_transcode_custom_to_file() {
    let temp = tempdir().unwrap();
    let config = write_config(&temp, "");
    let source = temp.path().join("clip.mkv");
    fs::write(&source, b"not really a movie").unwrap();
    let output = temp.path().join("out.bin");

    let mut cmd = castforged_cmd();
    cmd.args([
        "transcode",
        "--config",
        path_str(&config),
        path_str(&source),
        "--profile",
        "custom",
        "--custom-command",
        "printf {filestem}",
        "--output",
        path_str(&output),
    ])
    .assert()
    .success();

    assert_eq!(fs::read_to_string(&output).unwrap(), "clip");
}

#[cfg(unix)]
#[test]
fn test_cli_transcode_failure_is_reported() {
    let temp = tempdir().unwrap();
    let config = write_config(&temp, "");
    let source = temp.path().join("clip.mkv");
    fs::write(&source, b"x").unwrap();

    let mut cmd = castforged_cmd();
    cmd.args([
        "transcode",
        "--config",
        path_str(&config),
        path_str(&source),
        "--profile",
        "custom",
        "--custom-command",
        "sh -c 'exit 3'",
        "--output",
        path_str(&temp.path().join("out.bin")),
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed"));
}

#[test]
fn test_cli_transcode_range_requires_duration() {
    let mut cmd = castforged_cmd();
    cmd.args([
        "transcode",
        "/media/movie.mkv",
        "--range",
        "bytes=0-",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--duration"));
}

#[test]
fn test_cli_transcode_nonexistent_file() {
    let temp = tempdir().unwrap();
    let config = write_config(&temp, "");

    let mut cmd = castforged_cmd();
    cmd.args([
        "transcode",
        "--config",
        path_str(&config),
        "/nonexistent/path/movie.mkv",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("exist"));
}

#[test]
fn test_cli_probe_nonexistent_file() {
    let temp = tempdir().unwrap();
    let config = write_config(&temp, "");

    let mut cmd = castforged_cmd();
    cmd.args([
        "probe",
        "--config",
        path_str(&config),
        "/nonexistent/path/movie.mkv",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("exist"));
}

#[test]
fn test_cli_check_tools_command() {
    let temp = tempdir().unwrap();
    let config = write_config(&temp, "");

    let mut cmd = castforged_cmd();
    cmd.args(["check-tools", "--config", path_str(&config)])
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg"))
        .stdout(predicate::str::contains("ffprobe"));
}

#[test]
fn test_cli_validate_config() {
    let temp = tempdir().unwrap();
    let config = write_config(
        &temp,
        r#"
[transcode]
policy = "strict"
threads = 2

[dlna]
flags = "81700000000000000000000000000000"
"#,
    );

    let mut cmd = castforged_cmd();
    cmd.args(["validate", path_str(&config)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Policy: strict"))
        .stdout(predicate::str::contains("DLNA.ORG_FLAGS=81700000000000000000000000000000"));
}

#[test]
fn test_cli_validate_invalid_config() {
    let temp = tempdir().unwrap();
    let config = write_config(&temp, "[transcode]\nmin_length_ms = 0\n");

    let mut cmd = castforged_cmd();
    cmd.args(["validate", path_str(&config)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("min_length_ms"));
}
