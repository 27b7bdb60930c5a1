//! Tests for the spieluhr command line
//!
//! Every run happens in a fresh temp dir with HOME and XDG_CONFIG_HOME
//! pointed at it, so no stray config leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Format 0 file at 480 ticks per quarter from (delta, pitch) note ons.
fn midi_file(notes: &[(u8, u8)]) -> Vec<u8> {
    let mut track = Vec::new();
    for &(delta, pitch) in notes {
        // Deltas stay below 0x80 so each fits one VLQ byte
        track.extend([delta, 0x90, pitch, 100]);
    }
    track.extend([0x00, 0xFF, 0x2F, 0x00]);

    let mut out = b"MThd".to_vec();
    out.extend(6u32.to_be_bytes());
    out.extend(0u16.to_be_bytes());
    out.extend(1u16.to_be_bytes());
    out.extend(480u16.to_be_bytes());
    out.extend(b"MTrk");
    out.extend((track.len() as u32).to_be_bytes());
    out.extend(track);
    out
}

fn melody() -> Vec<u8> {
    midi_file(&[(0, 60), (120, 62), (120, 64), (120, 65), (120, 67), (0, 72)])
}

fn spieluhr(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("spieluhr").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir)
        .env_remove("RUST_LOG");
    for var in [
        "SPIELUHR_BOX",
        "SPIELUHR_FILTER",
        "SPIELUHR_TRANSPOSE",
        "SPIELUHR_SEARCH",
        "SPIELUHR_PAPER",
        "SPIELUHR_LOG_LEVEL",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn converts_to_every_output() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("tune.mid"), melody()).unwrap();

    spieluhr(dir.path())
        .args(["convert", "tune.mid", "-m", "out.mid", "-s", "out.svg", "-p", "out.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("box:        sankyo20"))
        .stdout(predicate::str::contains("holes:      6"));

    let midi = std::fs::read(dir.path().join("out.mid")).unwrap();
    assert!(midi.starts_with(b"MThd"));
    let svg = std::fs::read_to_string(dir.path().join("out.svg")).unwrap();
    assert!(svg.contains("<svg"));
    let pdf = std::fs::read(dir.path().join("out.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[test]
fn fixed_transpose_skips_search() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("tune.mid"), melody()).unwrap();

    spieluhr(dir.path())
        .args(["convert", "tune.mid", "-t", "-12", "-b", "sankyo15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-12 semitones (fixed)"))
        .stdout(predicate::str::contains("box:        sankyo15"));
}

#[test]
fn unknown_box_lists_available() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("tune.mid"), melody()).unwrap();

    spieluhr(dir.path())
        .args(["convert", "tune.mid", "-b", "polyphon", "-m", "out.mid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("polyphon"))
        .stderr(predicate::str::contains("teanola30"));

    assert!(!dir.path().join("out.mid").exists());
}

#[test]
fn empty_tune_writes_nothing() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("silent.mid"), midi_file(&[])).unwrap();

    spieluhr(dir.path())
        .args(["convert", "silent.mid", "-m", "out.mid", "-s", "out.svg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no notes"));

    assert!(!dir.path().join("out.mid").exists());
    assert!(!dir.path().join("out.svg").exists());
}

#[test]
fn missing_input_is_reported() {
    let dir = TempDir::new().unwrap();

    spieluhr(dir.path())
        .args(["convert", "nowhere.mid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read nowhere.mid"));
}

#[test]
fn garbage_input_is_malformed() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("tune.mid"), b"RIFF\0\0\0\0WAVE").unwrap();

    spieluhr(dir.path())
        .args(["convert", "tune.mid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("MThd"));
}

#[test]
fn local_config_sets_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("tune.mid"), melody()).unwrap();
    std::fs::write(
        dir.path().join("spieluhr.toml"),
        "[conversion]\nbox = \"sankyo33\"\n\n[sheet]\npaper = \"a4x2\"\n",
    )
    .unwrap();

    spieluhr(dir.path())
        .args(["convert", "tune.mid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("box:        sankyo33"));
}

#[test]
fn unknown_paper_is_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("tune.mid"), melody()).unwrap();

    spieluhr(dir.path())
        .args(["convert", "tune.mid", "--paper", "tabloid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sheet.paper"));
}

#[test]
fn boxes_lists_registry() {
    let dir = TempDir::new().unwrap();

    spieluhr(dir.path())
        .arg("boxes")
        .assert()
        .success()
        .stdout(predicate::str::contains("sankyo15"))
        .stdout(predicate::str::contains("sankyo20"))
        .stdout(predicate::str::contains("teanola30"))
        .stdout(predicate::str::contains("sankyo33"))
        .stdout(predicate::str::contains("(default)"));
}

#[test]
fn config_reflects_file_and_env() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "[conversion]\nfilter = 30\n").unwrap();

    spieluhr(dir.path())
        .env("SPIELUHR_PAPER", "legal")
        .args(["config", "-c"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("# loaded from"))
        .stdout(predicate::str::contains("filter = 30"))
        .stdout(predicate::str::contains("paper = \"legal\""))
        .stdout(predicate::str::contains("$SPIELUHR_PAPER"));
}

#[test]
fn bad_search_mode_fails_parsing() {
    let dir = TempDir::new().unwrap();

    spieluhr(dir.path())
        .args(["convert", "tune.mid", "--search", "sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sideways"));
}
