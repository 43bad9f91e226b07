//! Show or initialize the configuration file.

use macrokit_common::config::{config_file_path, AppConfig};
use macrokit_session_engine::HotkeyAction;

pub fn run(config: &AppConfig, init: bool) -> anyhow::Result<()> {
    let path = config_file_path();

    if init {
        if path.exists() {
            println!("Configuration already exists at: {}", path.display());
        } else {
            let written = AppConfig::default().save()?;
            println!("Wrote default configuration to: {}", written.display());
        }
        return Ok(());
    }

    println!("Configuration file: {}", path.display());
    if !path.exists() {
        println!("  (not present, showing defaults)");
    }
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    println!();

    println!("Hotkeys:");
    for (action, key) in HotkeyAction::bindings(config) {
        println!("  {action:?}: {key}");
    }

    Ok(())
}
