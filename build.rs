// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

fn main() {
    built::write_built_file().expect("Failed to acquire build-time information");

    let version = git(&["describe", "--match", "v[0-9]*", "--tags", "HEAD"])
        .map(|v| v.trim_start_matches('v').to_string())
        .or_else(|| git(&["rev-parse", "--short", "HEAD"]));
    let dirty = git(&["diff-index", "--name-only", "HEAD", "--"]).is_some();

    let mut out = String::from("// Git information generated at build time\n");
    match version {
        Some(v) => out.push_str(&format!(
            "pub const GIT_VERSION: Option<&'static str> = Some(\"{v}\");\n"
        )),
        None => out.push_str("pub const GIT_VERSION: Option<&'static str> = None;\n"),
    }
    out.push_str(&format!(
        "pub const GIT_DIRTY: Option<bool> = {};\n",
        if dirty { "Some(true)" } else { "None" }
    ));

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    fs::write(Path::new(&out_dir).join("git_built.rs"), out).expect("Failed to write git info");
}

/// Run a git command and return its trimmed stdout if successful and not empty.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
