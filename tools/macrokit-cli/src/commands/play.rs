//! Replay a recording through the tracing actuator.

use std::path::PathBuf;
use std::sync::Arc;

use macrokit_common::config::AppConfig;
use macrokit_input_bridge::{ManualEventSource, TracingActuator};
use macrokit_recording_model::storage::JsonStorage;
use macrokit_session_engine::{Coordinator, PlaybackConfig, PlayerState, SessionKind};
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;

pub async fn run(
    app_config: &AppConfig,
    path: PathBuf,
    speed: Option<String>,
    loop_mode: Option<String>,
    count: Option<u32>,
) -> anyhow::Result<()> {
    let mut settings = app_config.playback.clone();
    if let Some(speed) = speed {
        settings.speed = speed;
    }
    if let Some(count) = count {
        settings.loop_count = count;
        if loop_mode.is_none() {
            settings.loop_mode = "count".to_string();
        }
    }
    if let Some(loop_mode) = loop_mode {
        settings.loop_mode = loop_mode;
    }
    let config = PlaybackConfig::try_from(&settings)?;

    let coordinator = Coordinator::new(
        Arc::new(TracingActuator::new()),
        Arc::new(ManualEventSource::new()),
        Arc::new(JsonStorage::new()),
        Handle::current(),
    );
    coordinator.set_playback_speed(config.speed)?;
    coordinator.set_playback_loop(config.loop_mode)?;
    let recording = coordinator.load_recording(&path)?;

    println!("Playing: {}", recording.name);
    println!("  Events: {}", recording.len());
    println!("  Duration: {:.3}s", recording.duration().as_secs_f64());
    println!("  Speed: {}x", config.speed);
    println!("  Loop: {:?}", config.loop_mode);
    println!();
    println!("Press Ctrl+C to stop playback...");

    let mut rx = coordinator.subscribe();
    coordinator.toggle_playback()?;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                coordinator.stop()?;
                println!("\nPlayback stopped.");
                break;
            }
            event = rx.recv() => match event {
                Ok(event) if event.session == SessionKind::Player && !event.active => {
                    println!("Playback finished after {} pass(es).", event.loop_index);
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Progress notifications dropped");
                    if coordinator.player_state() == PlayerState::Idle {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    let progress = coordinator.playback_progress();
    tracing::info!(
        events = progress.current_event,
        total = progress.total_events,
        loop_index = progress.current_loop,
        "Playback ended"
    );
    coordinator.shutdown();
    Ok(())
}
