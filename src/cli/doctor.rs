//! Environment readiness check.
//!
//! Verifies everything a validation run needs before any browser is
//! launched: a Chrome/Chromium binary, configured credentials, a readable
//! input file, and a writable log directory. Every failure includes a fix
//! instruction.

use crate::cli::output::{self, Styled};
use crate::config::Settings;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Run the doctor diagnostic.
pub fn run(input: Option<&Path>, env_file: Option<&Path>) -> Result<()> {
    let s = Styled::new();
    let mut ready = true;

    output::print_header(&s);

    let settings = Settings::load(env_file)?;

    output::print_section(&s, "Browser");
    match find_chrome() {
        Some(path) => {
            let version = chrome_version(&path).unwrap_or_else(|| "unknown version".to_string());
            output::print_check(
                s.ok_sym(),
                "Chrome:",
                &format!("{version} at {}", path.display()),
            );
        }
        None => {
            output::print_check(s.fail_sym(), "Chrome:", "not found");
            output::print_detail("Install Chrome/Chromium or set LEADVET_CHROME_PATH.");
            ready = false;
        }
    }
    eprintln!();

    output::print_section(&s, "Credentials");
    if settings.credentials.is_some() {
        output::print_check(s.ok_sym(), "Account:", "email and password configured");
    } else {
        output::print_check(s.fail_sym(), "Account:", "not configured");
        output::print_detail("Set LEADVET_EMAIL and LEADVET_PASSWORD (or use an env file).");
        ready = false;
    }
    output::print_check(s.ok_sym(), "Assistant URL:", &settings.assistant_url);
    eprintln!();

    output::print_section(&s, "Files");
    match input {
        Some(path) if path.is_file() => {
            output::print_check(s.ok_sym(), "Input:", &path.display().to_string());
        }
        Some(path) => {
            output::print_check(
                s.fail_sym(),
                "Input:",
                &format!("{} is not readable", path.display()),
            );
            ready = false;
        }
        None => {
            output::print_check(s.warn_sym(), "Input:", "not specified (pass --input to check)");
        }
    }

    match std::fs::create_dir_all(&settings.log_dir) {
        Ok(()) => {
            output::print_check(s.ok_sym(), "Log dir:", &settings.log_dir.display().to_string());
        }
        Err(e) => {
            output::print_check(
                s.fail_sym(),
                "Log dir:",
                &format!("{} ({e})", settings.log_dir.display()),
            );
            ready = false;
        }
    }

    if ready {
        output::print_status(&s, &s.green("ready"), "all checks passed");
        Ok(())
    } else {
        output::print_status(&s, &s.red("not ready"), "fix the failed checks above");
        std::process::exit(1);
    }
}

/// Locate a Chrome/Chromium binary: explicit env override, then PATH, then
/// the standard install locations.
pub fn find_chrome() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("LEADVET_CHROME_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ]
    };
    candidates
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn chrome_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!version.is_empty()).then_some(version)
}
