use std::env;
use std::fs;
use std::process::Command;

use anyhow::Result;
use chrono::TimeZone;
use vergen_gitcl::{Emitter, GitclBuilder};

fn main() -> Result<()> {
    // Git information, with a plain fallback emission for tarball builds.
    let gitcl = GitclBuilder::default()
        .describe(true, true, Some("[0-9]*"))
        .build()?;
    let gitcl_res = Emitter::default()
        .idempotent()
        .fail_on_error()
        .add_instructions(&gitcl)
        .and_then(|emitter| emitter.emit());
    if let Err(e) = gitcl_res {
        eprintln!("error occurred while generating instructions: {e:?}");
        Emitter::default().idempotent().fail_on_error().emit()?;
    }

    // Build timestamp, honoring reproducible-build environments.
    let now = match env::var("SOURCE_DATE_EPOCH") {
        Ok(val) => chrono::Utc
            .timestamp_opt(val.parse::<i64>()?, 0)
            .single()
            .unwrap_or_else(chrono::Utc::now),
        Err(_) => chrono::Utc::now(),
    };
    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    );

    // Embedded difraw library version for `--version`.
    let difraw_version = difraw_version_from_metadata()
        .or_else(|_| difraw_version_from_manifest())
        .unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=DIFRAW_VERSION={difraw_version}");
    println!("cargo:rerun-if-changed=difraw/Cargo.toml");

    Ok(())
}

/// Resolve the difraw version through cargo metadata.
fn difraw_version_from_metadata() -> Result<String> {
    let output = Command::new("cargo")
        .args(["metadata", "--format-version", "1", "--no-deps"])
        .output()?;
    if !output.status.success() {
        anyhow::bail!("cargo metadata failed");
    }

    let metadata: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    for package in metadata["packages"].as_array().into_iter().flatten() {
        if package["name"].as_str() == Some("difraw") {
            if let Some(version) = package["version"].as_str() {
                return Ok(version.to_string());
            }
        }
    }
    anyhow::bail!("difraw package not found in metadata")
}

/// Fallback: read the version line straight from the member manifest.
fn difraw_version_from_manifest() -> Result<String> {
    let manifest = fs::read_to_string("difraw/Cargo.toml")?;
    for line in manifest.lines() {
        let line = line.trim();
        if line.starts_with("version") {
            if let Some((_, value)) = line.split_once('=') {
                return Ok(value.trim().trim_matches('"').to_string());
            }
        }
    }
    anyhow::bail!("no version in difraw/Cargo.toml")
}
