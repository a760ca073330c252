// ffpulse-cli/tests/cli_integration.rs
//
// Runs the `ffpulse` binary against shell scripts standing in for ffmpeg and
// ffprobe.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("ffpulse")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("probe"));
}

#[test]
fn test_run_requires_id_and_input() {
    Command::cargo_bin("ffpulse")
        .unwrap()
        .args(["run", "--output-name", "out.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--id"));
}

#[cfg(unix)]
mod standin {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::{TempDir, tempdir};

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Bin dir with a 120s ffprobe and an ffmpeg that reports 30s and 60s,
    /// writes the output file and exits `code`.
    fn binaries(code: i32) -> TempDir {
        let bin = tempdir().unwrap();
        write_script(bin.path(), "ffprobe", "echo 120.000000");
        let engine = r#"for arg; do case "$arg" in *.mp4) out="$arg";; esac; done
printf 'frame=   10 fps=0.0 q=28.0 size=       1kB time=00:00:30.00 bitrate=   1.0kbits/s speed=  1x\r' >&2
printf 'frame=   20 fps=0.0 q=28.0 size=       2kB time=00:01:00.00 bitrate=   1.0kbits/s speed=  1x\r' >&2
: > "$out""#;
        write_script(bin.path(), "ffmpeg", &format!("{engine}\nexit {code}"));
        bin
    }

    fn ffpulse(bin: &TempDir, out: &Path) -> Command {
        let mut cmd = Command::cargo_bin("ffpulse").unwrap();
        cmd.env("FFPULSE_FFMPEG_PATH", bin.path().join("ffmpeg"))
            .env("FFPULSE_FFPROBE_PATH", bin.path().join("ffprobe"))
            .env("FFPULSE_OUTPUT_DIR", out)
            .env_remove("FFPULSE_PROBE_POLICY");
        cmd
    }

    #[test]
    fn test_probe_prints_duration() {
        let bin = binaries(0);
        let out = tempdir().unwrap();
        ffpulse(&bin, out.path())
            .args(["--json", "probe", "/media/in.mov"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""durationSecs":120.0"#));
    }

    #[test]
    fn test_run_emits_json_progress() {
        let bin = binaries(0);
        let out = tempdir().unwrap();
        ffpulse(&bin, out.path())
            .args([
                "--json", "run", "--id", "job-1", "-i", "/media/in.mov", "-n", "in.mp4", "--",
                "-i", "/media/in.mov",
            ])
            .assert()
            .success()
            .stdout(predicate::eq(
                "{\"taskId\":\"job-1\",\"progress\":25.0}\n\
                 {\"taskId\":\"job-1\",\"progress\":50.0}\n\
                 {\"taskId\":\"job-1\",\"progress\":100.0}\n",
            ));
        assert!(out.path().join("in.mp4").exists());
    }

    #[test]
    fn test_run_reports_engine_failure() {
        let bin = binaries(1);
        let out = tempdir().unwrap();
        ffpulse(&bin, out.path())
            .args(["--json", "run", "--id", "job-2", "-i", "/media/in.mov", "-n", "in.mp4"])
            .assert()
            .failure()
            .stdout(predicate::str::contains(r#"{"taskId":"job-2","error":1}"#))
            .stderr(predicate::str::contains("exited with code 1"));
    }

    #[test]
    fn test_run_fails_when_probe_fails() {
        let bin = binaries(0);
        write_script(bin.path(), "ffprobe", "echo 'in.mov: No such file' >&2\nexit 1");
        let out = tempdir().unwrap();
        ffpulse(&bin, out.path())
            .args(["run", "--id", "job-3", "-i", "/media/in.mov", "-n", "in.mp4"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Duration probe failed"));
        assert!(!out.path().join("in.mp4").exists());
    }

    #[test]
    fn test_batch_runs_every_task() {
        let bin = binaries(0);
        let out = tempdir().unwrap();
        let tasks = out.path().join("tasks.json");
        fs::write(
            &tasks,
            r#"[
                {"id": "a", "input": "/media/a.mov", "outputName": "a.mp4", "args": ["-i", "/media/a.mov"]},
                {"id": "b", "input": "/media/b.mov", "outputName": "b.mp4", "args": ["-i", "/media/b.mov"]}
            ]"#,
        )
        .unwrap();

        ffpulse(&bin, out.path())
            .arg("--json")
            .arg("batch")
            .arg(&tasks)
            .assert()
            .success()
            .stdout(predicate::str::contains(r#"{"taskId":"a","progress":100.0}"#))
            .stdout(predicate::str::contains(r#"{"taskId":"b","progress":100.0}"#));
        assert!(out.path().join("a.mp4").exists());
        assert!(out.path().join("b.mp4").exists());
    }

    #[test]
    fn test_batch_missing_tasks_file() {
        let bin = binaries(0);
        let out = tempdir().unwrap();
        ffpulse(&bin, out.path())
            .args(["batch", "/definitely/not/here/tasks.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read tasks file"));
    }
}
