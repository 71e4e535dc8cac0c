//! Build script for ghapp-agent - embeds version information.
//!
//! `BUILD_INFO_HUMAN` is `{CARGO_PKG_VERSION} ({git}) {rustc}` where `{git}`
//! is `git describe --tags --always --dirty` when it names a tag, and
//! `v{CARGO_PKG_VERSION}-{commit timestamp}-{short sha}` otherwise. Parts
//! that cannot be determined (no git, no rustc on PATH) are left out.

use std::process::Command;

use chrono::Utc;

fn main() {
    ["src", "build.rs", "Cargo.toml"]
        .iter()
        .for_each(|path| println!("cargo:rerun-if-changed={path}"));

    let components = [
        Some(env!("CARGO_PKG_VERSION").to_string()),
        git_version().map(|v| format!("({v})")),
        command_output("rustc", &["--version"]),
    ];

    let build_info = components.into_iter().flatten().collect::<Vec<_>>().join(" ");
    println!("cargo:rustc-env=BUILD_INFO_HUMAN={build_info}");
}

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn git_version() -> Option<String> {
    let describe = command_output("git", &["describe", "--tags", "--always", "--dirty"])?;
    if describe.contains('v') || describe.contains("-g") {
        return Some(describe);
    }

    let commit = command_output("git", &["rev-parse", "--short=12", "HEAD"])?;
    let timestamp = command_output("git", &["log", "-1", "--format=%ct"])
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
        .format("%Y%m%d%H%M%S");
    let dirty = if describe.ends_with("-dirty") { "+dirty" } else { "" };

    Some(format!(
        "v{}-{timestamp}-{commit}{dirty}",
        env!("CARGO_PKG_VERSION")
    ))
}
