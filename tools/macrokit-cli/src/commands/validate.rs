//! Validate a recording file.

use std::path::PathBuf;

use macrokit_recording_model::recording::Recording;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating recording at: {}", path.display());

    // Parse without the storage-level check so every issue can be listed.
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    let recording: Recording = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse recording: {e}"))?;

    println!("  Name: {}", recording.name);
    println!("  Version: {}", recording.version);
    println!("  Events: {}", recording.len());
    println!("  Duration: {}ns", recording.duration_ns);

    let errors = recording.validate();
    if errors.is_empty() {
        println!("\nRecording is valid.");
        return Ok(());
    }

    println!("\nValidation issues:");
    for error in &errors {
        println!("  - {error}");
    }
    anyhow::bail!("{} issue(s) found", errors.len())
}
