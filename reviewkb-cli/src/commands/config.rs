//! Config command - print the effective configuration as TOML

use std::path::Path;

use anyhow::Context;
use reviewkb_core::Config;

pub fn print(config: &Config, explicit_path: Option<&Path>) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;

    println!("reviewkb Configuration");
    println!("======================");
    println!();

    let path = explicit_path
        .map(Path::to_path_buf)
        .or_else(Config::default_config_path);
    if let Some(path) = path {
        if path.exists() {
            println!("# Config file: {}", path.display());
        } else {
            println!("# Config file: {} (not found - using defaults)", path.display());
        }
    }
    println!(
        "# Database: {}",
        config.database_config().path.display()
    );
    println!();
    print!("{rendered}");

    Ok(())
}
