//! Integration tests for the backup run and the completion poller
//!
//! The mirroring program is replaced by small shell scripts, so these tests
//! only run on Unix.

#![cfg(unix)]

use site_backup::config::Config;
use site_backup::mirror::{ExitClass, MirrorMode};
use site_backup::run::{
    marker_path, run_backup, wait_for_completion, RunOptions, WaitOptions, WaitOutcome,
};
use site_backup::BackupError;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Writes an executable shell script standing in for wget
fn fake_wget(dir: &Path, body: &str) -> PathBuf {
    let script = dir.join("fake-wget");
    fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}

fn config(dir: &TempDir, program: &Path) -> Config {
    let mut config = Config::default();
    config.mirror.download_dir = dir.path().join("curr-download");
    config.mirror.program = program.display().to_string();
    config
}

fn options() -> RunOptions {
    RunOptions {
        url: "https://www.example.com/".to_string(),
        mode: MirrorMode::Incremental,
    }
}

fn quick_wait(download_dir: &Path) -> WaitOptions {
    WaitOptions {
        timeout_secs: 1,
        check_interval_secs: 1,
        ..WaitOptions::new(download_dir, "example")
    }
}

#[tokio::test]
async fn test_failed_run_hands_off_to_waiter() {
    let dir = TempDir::new().unwrap();
    let program = fake_wget(dir.path(), "echo 'connection refused' >&2\nexit 4");
    let config = config(&dir, &program);

    let err = run_backup(&config, &options(), None).await.unwrap_err();
    assert!(matches!(err, BackupError::Mirror(_)));

    let download_dir = &config.mirror.download_dir;
    assert!(marker_path(download_dir).exists());

    let outcome = wait_for_completion(&quick_wait(download_dir)).await.unwrap();
    assert_eq!(outcome, WaitOutcome::MarkerFound);
    assert!(!marker_path(download_dir).exists());
}

#[tokio::test]
async fn test_marker_is_consumed_exactly_once() {
    let dir = TempDir::new().unwrap();
    let program = fake_wget(dir.path(), "exit 0");
    let config = config(&dir, &program);
    let download_dir = &config.mirror.download_dir;

    run_backup(&config, &options(), None).await.unwrap();

    let first = wait_for_completion(&quick_wait(download_dir)).await.unwrap();
    assert_eq!(first, WaitOutcome::MarkerFound);

    // The directory was just touched, so the fallback applies
    let second = wait_for_completion(&quick_wait(download_dir)).await.unwrap();
    assert!(matches!(second, WaitOutcome::RecentlyModified { .. }));
}

#[tokio::test]
async fn test_tolerated_exit_and_domain_merge() {
    let dir = TempDir::new().unwrap();
    let program = fake_wget(
        dir.path(),
        r#"for arg in "$@"; do
  case "$arg" in
    --directory-prefix=*) prefix="${arg#--directory-prefix=}" ;;
  esac
done
mkdir -p "$prefix/example.com/bitacora/node" "$prefix/www.example.com"
echo bare > "$prefix/example.com/bitacora/node/7.html"
echo orig > "$prefix/example.com/bitacora/node/7.html.orig"
echo www > "$prefix/www.example.com/index.html"
exit 8"#,
    );
    let config = config(&dir, &program);
    let download_dir = &config.mirror.download_dir;

    let report = run_backup(&config, &options(), None).await.unwrap();

    assert_eq!(report.mirror, ExitClass::Tolerated);
    assert_eq!(report.merge.map(|m| m.copied), Some(1));
    assert!(download_dir
        .join("www.example.com/bitacora/node/7.html")
        .exists());
    assert!(!download_dir
        .join("www.example.com/bitacora/node/7.html.orig")
        .exists());
    assert!(!download_dir.join("example.com").exists());
    assert!(marker_path(download_dir).exists());
}

#[tokio::test]
async fn test_force_redownload_passes_force_flags() {
    let dir = TempDir::new().unwrap();
    let args_file = dir.path().join("args.txt");
    let program = fake_wget(
        dir.path(),
        &format!(r#"printf '%s\n' "$@" > "{}""#, args_file.display()),
    );
    let config = config(&dir, &program);
    let options = RunOptions {
        mode: MirrorMode::ForceRedownload,
        ..options()
    };

    run_backup(&config, &options, None).await.unwrap();

    let args = fs::read_to_string(&args_file).unwrap();
    let args: Vec<&str> = args.lines().collect();
    assert!(args.contains(&"--no-timestamping"));
    assert!(args.contains(&"--force-directories"));
    assert!(!args.contains(&"--timestamping"));
    assert!(!args.contains(&"--continue"));
    assert_eq!(args.last(), Some(&"https://www.example.com/"));
}
