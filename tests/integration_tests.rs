//! Integration tests for the Vidguard CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Command isolated from the user's config files and environment
fn vidguard(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("vidguard").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("VIDGUARD_VALIDATOR__FFMPEG")
        .env_remove("VIDGUARD_RUNNER__JOBS");
    cmd
}

/// Test CLI binary exists and responds to --help
#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    vidguard(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("verify"));
}

/// Test CLI responds to --version
#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    vidguard(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vidguard"));
}

/// Test invalid subcommand shows error
#[test]
fn test_invalid_subcommand() {
    let home = TempDir::new().unwrap();
    vidguard(home.path())
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_config_show_merges_environment() {
    let home = TempDir::new().unwrap();
    vidguard(home.path())
        .env("VIDGUARD_VALIDATOR__TIMEOUT_SECS", "42")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"timeout_secs\": 42"))
        .stdout(predicate::str::contains("\"checkpoint_interval\": 10"));
}

#[test]
fn test_config_get_and_validate() {
    let home = TempDir::new().unwrap();
    fs::write(home.path().join("vidguard.toml"), "[runner]\njobs = 3\n").unwrap();

    vidguard(home.path())
        .args(["config", "get", "runner.jobs"])
        .assert()
        .success()
        .stdout(predicate::str::diff("3\n"));

    vidguard(home.path())
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_invalid_config_rejected() {
    let home = TempDir::new().unwrap();
    fs::write(home.path().join("vidguard.toml"), "[runner]\ncheckpoint_interval = 0\n").unwrap();

    vidguard(home.path())
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("checkpoint_interval"));
}

#[test]
fn test_missing_ffmpeg_fails_fast() {
    let home = TempDir::new().unwrap();
    vidguard(home.path())
        .env("VIDGUARD_VALIDATOR__FFMPEG", "/nonexistent/ffmpeg")
        .args(["verify", "."])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ffmpeg is not installed or not in PATH"));
}

#[cfg(unix)]
mod with_fake_ffmpeg {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    /// Stand-in for `ffmpeg -v error -i <file> -f null -` keyed on the file name
    const FAKE_FFMPEG: &str = r#"#!/bin/sh
case "$(basename "$4")" in
  *bad*) echo "moov atom not found" >&2; exit 1 ;;
  *dts*) echo "Application provided invalid, non monotonically increasing dts to muxer" >&2 ;;
  *slow*) exec sleep 5 ;;
  *hang*) touch "$(dirname "$4")/.hang-started"; exec sleep 30 ;;
esac
exit 0
"#;

    struct Fixture {
        home: TempDir,
        library: PathBuf,
        ffmpeg: PathBuf,
    }

    impl Fixture {
        fn new(files: &[&str]) -> Self {
            let home = TempDir::new().unwrap();
            let ffmpeg = home.path().join("fake-ffmpeg");
            fs::write(&ffmpeg, FAKE_FFMPEG).unwrap();
            fs::set_permissions(&ffmpeg, fs::Permissions::from_mode(0o755)).unwrap();

            let library = home.path().join("library");
            for file in files {
                let path = library.join(file);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(&path, vec![0u8; 64]).unwrap();
            }

            Self { home, library, ffmpeg }
        }

        fn cmd(&self) -> Command {
            let mut cmd = vidguard(self.home.path());
            cmd.env("VIDGUARD_VALIDATOR__FFMPEG", &self.ffmpeg);
            cmd
        }

        fn path(&self, name: &str) -> PathBuf {
            self.home.path().join(name)
        }
    }

    #[test]
    fn test_all_valid_exits_zero() {
        let fx = Fixture::new(&["Course A/01.mp4", "Course A/02.mp4", "Course B/01.MP4", "notes.txt"]);

        fx.cmd()
            .arg("verify")
            .arg(&fx.library)
            .args(["-j", "2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Found 3 video file(s)"))
            .stdout(predicate::str::contains("Total Files Scanned: 3"))
            .stdout(predicate::str::contains("All video files passed integrity verification!"))
            .stdout(predicate::str::contains("Verification complete in"));
    }

    #[test]
    fn test_corrupted_file_exits_one_and_reports() {
        let fx = Fixture::new(&["Course A/good.mp4", "Course A/bad.mp4", "Course B/dts.mp4"]);
        let report = fx.path("report.txt");
        let json = fx.path("out/report.json");

        fx.cmd()
            .arg("verify")
            .arg(&fx.library)
            .arg("-o")
            .arg(&report)
            .arg("--json")
            .arg(&json)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Corrupted Files: 2"))
            .stdout(predicate::str::contains("Found 2 corrupted file(s) in 2 course(s)"))
            .stdout(predicate::str::contains("COURSE: Course A"))
            .stdout(predicate::str::contains("Error: moov atom not found"));

        let text = fs::read_to_string(&report).unwrap();
        assert!(text.contains("  DTS warnings: 1"));

        let data: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(data["metadata"]["total_files"], 3);
        assert_eq!(data["metadata"]["corrupted_files"], 2);
        assert_eq!(data["metadata"]["total_size"], 192);
        let files = data["files"].as_array().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0]["relative_path"], "Course A/bad.mp4");
        assert_eq!(files[0]["is_valid"], false);
    }

    #[test]
    fn test_timeout_is_reported() {
        let fx = Fixture::new(&["Course/slow.mp4"]);

        fx.cmd()
            .arg("verify")
            .arg(&fx.library)
            .args(["--timeout", "1"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Verification timed out (>1s)"))
            .stdout(predicate::str::contains("  Timeouts: 1"));
    }

    #[test]
    fn test_checkpoint_written_and_resumed() {
        let fx = Fixture::new(&["Course/a.mp4", "Course/b.mp4", "Course/c.mp4"]);
        let checkpoint = fx.path("state/checkpoint.json");

        // Legacy two-field record for one file
        fs::create_dir_all(checkpoint.parent().unwrap()).unwrap();
        let done = fx.library.join("Course/a.mp4");
        let mut legacy = serde_json::Map::new();
        legacy.insert(done.to_string_lossy().into_owned(), serde_json::json!([true, null]));
        fs::write(&checkpoint, serde_json::Value::Object(legacy).to_string()).unwrap();

        fx.cmd()
            .arg("verify")
            .arg(&fx.library)
            .arg("-c")
            .arg(&checkpoint)
            .arg("--resume")
            .assert()
            .success()
            .stdout(predicate::str::contains("Resumed from checkpoint: 1 files already verified"))
            .stdout(predicate::str::contains("Remaining files to verify: 2"))
            .stdout(predicate::str::contains("Total Files Scanned: 3"));

        let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&checkpoint).unwrap()).unwrap();
        let saved = saved.as_object().unwrap();
        assert_eq!(saved.len(), 3);
        assert!(saved.values().all(|record| record.as_array().unwrap().len() == 3));
    }

    #[test]
    fn test_malformed_checkpoint_is_fatal() {
        let fx = Fixture::new(&["Course/a.mp4"]);
        let checkpoint = fx.path("checkpoint.json");
        fs::write(&checkpoint, "{ not json").unwrap();

        fx.cmd()
            .arg("verify")
            .arg(&fx.library)
            .arg("-c")
            .arg(&checkpoint)
            .arg("--resume")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("malformed"));
    }

    #[test]
    fn test_reverify_from_json_report() {
        let fx = Fixture::new(&["Course A/bad.mp4", "Course A/fixed.mp4"]);
        let report = fx.path("report.json");
        let bad = fx.library.join("Course A/bad.mp4");
        let fixed = fx.library.join("Course A/fixed.mp4");
        let entry = |path: &Path| {
            serde_json::json!({
                "path": path,
                "relative_path": path.strip_prefix(&fx.library).unwrap(),
                "size": 64,
                "is_valid": false,
                "error": "moov atom not found"
            })
        };
        let document = serde_json::json!({
            "metadata": {
                "generated": "2026-01-01T00:00:00.000000",
                "root_directory": fx.library,
                "total_files": 5,
                "corrupted_files": 2,
                "valid_files": 3,
                "total_size": 320
            },
            "files": [entry(&bad), entry(&fixed)]
        });
        fs::write(&report, document.to_string()).unwrap();

        fx.cmd()
            .arg("verify")
            .arg("--reverify")
            .arg(&report)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Loaded 2 file(s) to re-verify"))
            .stdout(predicate::str::contains("Total Files Scanned: 2"))
            .stdout(predicate::str::contains("Corrupted Files: 1"))
            .stdout(predicate::str::contains(format!("Root Directory: {}", fx.library.display())));
    }

    #[test]
    fn test_missing_directory_fails() {
        let fx = Fixture::new(&[]);
        fx.cmd()
            .arg("verify")
            .arg(fx.path("absent"))
            .assert()
            .code(1)
            .stderr(predicate::str::contains("does not exist"));
    }

    #[test]
    fn test_empty_library_is_nothing_to_do() {
        let fx = Fixture::new(&["Course/readme.txt"]);
        fx.cmd()
            .arg("verify")
            .arg(&fx.library)
            .assert()
            .success()
            .stdout(predicate::str::contains("No video files found"));
    }

    #[test]
    fn test_checkpoint_failures_shown_in_quiet_mode() {
        let fx = Fixture::new(&["Course/a.mp4"]);
        // A directory cannot be replaced by the saved checkpoint
        let checkpoint = fx.path("state");
        fs::create_dir_all(&checkpoint).unwrap();

        fx.cmd()
            .arg("-q")
            .arg("verify")
            .arg(&fx.library)
            .arg("-c")
            .arg(&checkpoint)
            .assert()
            .success()
            .stderr(predicate::str::contains("Could not save checkpoint"))
            .stderr(predicate::str::contains("Failed to save checkpoint at exit"));
    }

    /// Start a run over one quick and one hanging file, signal it once the
    /// quick one is done, and return its exit code, stderr and checkpoint
    fn interrupt_run(signal: &str, whole_group: bool) -> (Option<i32>, String, serde_json::Value, Fixture) {
        use std::os::unix::process::CommandExt;

        let fx = Fixture::new(&["Course/a.mp4", "Course/hang.mp4"]);
        let checkpoint = fx.path("checkpoint.json");

        let mut command = std::process::Command::new(assert_cmd::cargo::cargo_bin("vidguard"));
        command
            .current_dir(fx.home.path())
            .env("HOME", fx.home.path())
            .env("VIDGUARD_VALIDATOR__FFMPEG", &fx.ffmpeg)
            .arg("verify")
            .arg(&fx.library)
            .args(["-j", "2", "-c"])
            .arg(&checkpoint)
            .arg("--json")
            .arg(fx.path("report.json"))
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if whole_group {
            // Stands in for a terminal, which signals the foreground group
            command.process_group(0);
        }
        let child = command.spawn().unwrap();

        let marker = fx.library.join("Course/.hang-started");
        let deadline = Instant::now() + Duration::from_secs(20);
        while !marker.exists() {
            assert!(Instant::now() < deadline, "hanging file was never started");
            std::thread::sleep(Duration::from_millis(20));
        }
        // Let the quick file finish
        std::thread::sleep(Duration::from_millis(500));

        let target = if whole_group {
            format!("-{}", child.id())
        } else {
            child.id().to_string()
        };
        let status = std::process::Command::new("kill")
            .arg(format!("-{signal}"))
            .arg("--")
            .arg(&target)
            .status()
            .unwrap();
        assert!(status.success());

        let output = child.wait_with_output().unwrap();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let saved = serde_json::from_str(&fs::read_to_string(&checkpoint).unwrap()).unwrap();
        (output.status.code(), stderr, saved, fx)
    }

    fn assert_only_quick_file_saved(saved: &serde_json::Value, fx: &Fixture) {
        let saved = saved.as_object().unwrap();
        assert_eq!(saved.len(), 1, "unexpected checkpoint: {saved:?}");
        let quick = fx.library.join("Course/a.mp4").to_string_lossy().into_owned();
        assert_eq!(saved[&quick][0], true);
        // Interrupted runs leave no report behind
        assert!(!fx.path("report.json").exists());
    }

    #[test]
    fn test_sigint_flushes_checkpoint_and_exits_130() {
        let (code, stderr, saved, fx) = interrupt_run("INT", false);
        assert_eq!(code, Some(130));
        assert!(stderr.contains("Interrupted! Saving checkpoint before exit..."));
        assert_only_quick_file_saved(&saved, &fx);
    }

    #[test]
    fn test_sigterm_flushes_checkpoint_and_exits_130() {
        let (code, stderr, saved, fx) = interrupt_run("TERM", false);
        assert_eq!(code, Some(130));
        assert!(stderr.contains("Interrupted! Saving checkpoint before exit..."));
        assert_only_quick_file_saved(&saved, &fx);
    }

    #[test]
    fn test_terminal_ctrl_c_does_not_record_in_flight_files() {
        let (code, stderr, saved, fx) = interrupt_run("INT", true);
        assert_eq!(code, Some(130));
        assert!(stderr.contains("Checkpoint saved to:"));
        assert_only_quick_file_saved(&saved, &fx);
    }
}
