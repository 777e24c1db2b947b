//! Build metadata for `ledgercheck --version`: commit and target triple.
//!
//! Packaged sources carry no `.git`; packagers can set
//! `LEDGERCHECK_BUILD_COMMIT` instead, otherwise the commit reads `unknown`.

use std::path::{Path, PathBuf};
use std::process::Command;

const COMMIT_ENV: &str = "LEDGERCHECK_BUILD_COMMIT";

fn main() {
    println!("cargo:rerun-if-env-changed={COMMIT_ENV}");

    let commit = std::env::var(COMMIT_ENV)
        .ok()
        .filter(|c| !c.trim().is_empty())
        .or_else(git_commit)
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", commit.trim());

    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=TARGET={target}");
}

fn git_commit() -> Option<String> {
    let git_dir = workspace_root()?.join(".git");
    if !git_dir.exists() {
        return None;
    }
    println!("cargo:rerun-if-changed={}", git_dir.join("HEAD").display());
    println!("cargo:rerun-if-changed={}", git_dir.join("refs/heads").display());

    let output = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .current_dir(git_dir.parent()?)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

fn workspace_root() -> Option<PathBuf> {
    let manifest = std::env::var("CARGO_MANIFEST_DIR").ok()?;
    Path::new(&manifest).ancestors().nth(2).map(Path::to_path_buf)
}
