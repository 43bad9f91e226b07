//! Show recording information.

use std::collections::BTreeMap;
use std::path::PathBuf;

use macrokit_recording_model::event::EventKind;
use macrokit_recording_model::storage::{JsonStorage, RecordingStorage};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let recording = JsonStorage::new()
        .load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load recording: {e}"))?;

    println!("Recording: {}", recording.name);
    println!("  Version: {}", recording.version);
    println!("  Created: {}", recording.created_at);
    if let Some(ref description) = recording.description {
        println!("  Description: {description}");
    }
    println!("  Duration: {:.3}s", recording.duration().as_secs_f64());
    println!("  Events: {}", recording.len());
    println!();

    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for event in &recording.events {
        let kind = match event.kind {
            EventKind::PointerMove { .. } => "pointer_move",
            EventKind::Button { .. } => "button",
            EventKind::Scroll { .. } => "scroll",
            EventKind::Key { .. } => "key",
        };
        *kinds.entry(kind).or_default() += 1;
    }
    println!("Event kinds:");
    for (kind, count) in &kinds {
        println!("  {kind}: {count}");
    }
    println!();

    let meta = &recording.metadata;
    println!("Metadata:");
    if let (Some(w), Some(h)) = (meta.screen_width, meta.screen_height) {
        println!("  Screen: {w}x{h}");
    }
    if let Some(ref version) = meta.app_version {
        println!("  Written by: macrokit {version}");
    }

    Ok(())
}
