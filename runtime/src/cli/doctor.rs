//! Environment readiness check.

use crate::config::HarvestConfig;
use crate::renderer::chromium::find_chromium;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Check the browser binary and the output directory.
pub async fn run(chromium_path: Option<PathBuf>) -> Result<()> {
    let mut config = HarvestConfig::from_env();
    if chromium_path.is_some() {
        config.browser.chromium_path = chromium_path;
    }

    println!("Feedharvest Doctor");
    println!("==================");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    let chromium = find_chromium(config.browser.chromium_path.as_ref());
    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome or Chromium, or pass --chromium-path."
        ),
    }

    let writable = check_writable(&config.output_dir);
    match &writable {
        Ok(()) => println!(
            "[OK] Output directory is writable: {}",
            config.output_dir.display()
        ),
        Err(e) => println!(
            "[!!] Output directory {} is not writable: {e}",
            config.output_dir.display()
        ),
    }

    println!();
    if chromium.is_some() && writable.is_ok() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}

/// Create the directory if needed and prove a file can be written there.
pub fn check_writable(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let probe = dir.join(".feedharvest-doctor");
    std::fs::write(&probe, b"ok")?;
    std::fs::remove_file(&probe)
}
