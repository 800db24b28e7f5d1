//! Command-line tests against the built binary

#![cfg(unix)]

use site_backup::run::marker_path;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::process::Command;
use tempfile::TempDir;

fn site_backup() -> Command {
    Command::new(env!("CARGO_BIN_EXE_site-backup"))
}

#[test]
fn test_unreadable_config_still_completes_run() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[mirror\nprogram = ").unwrap();
    let download_dir = dir.path().join("dl");

    let status = site_backup()
        .arg("--config")
        .arg(&config)
        .args(["run", "--url", "https://www.example.com/"])
        .arg("--download-dir")
        .arg(&download_dir)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    assert!(marker_path(&download_dir).exists());
}

#[test]
fn test_unreadable_config_notifies_recipient() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "not = [valid").unwrap();
    let download_dir = dir.path().join("dl");

    // Defaults name `mail`; a stand-in earlier on PATH records the call
    let bin = dir.path().join("bin");
    let sent = dir.path().join("sent.txt");
    fs::create_dir(&bin).unwrap();
    let mail = bin.join("mail");
    let script = format!(
        "#!/bin/sh\necho \"$2 -> $3\" > \"{0}\"\ncat >> \"{0}\"\n",
        sent.display()
    );
    fs::write(&mail, script).unwrap();
    fs::set_permissions(&mail, fs::Permissions::from_mode(0o755)).unwrap();
    let path = format!("{}:{}", bin.display(), std::env::var("PATH").unwrap_or_default());

    let status = site_backup()
        .env("PATH", path)
        .arg("--config")
        .arg(&config)
        .args(["run", "--url", "https://www.example.com/"])
        .arg("--download-dir")
        .arg(&download_dir)
        .args(["--email", "me@example.com"])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    assert!(marker_path(&download_dir).exists());

    let sent = fs::read_to_string(&sent).unwrap();
    assert!(sent.starts_with("Website Backup Failed - "));
    assert!(sent.contains("-> me@example.com"));
    assert!(sent.contains("Failed to parse TOML"));
}

#[test]
fn test_unreadable_config_for_wait_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[[[").unwrap();

    let status = site_backup()
        .arg("--config")
        .arg(&config)
        .arg("wait")
        .arg("--download-dir")
        .arg(dir.path())
        .args(["--name", "example"])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    assert!(!marker_path(dir.path()).exists());
}
