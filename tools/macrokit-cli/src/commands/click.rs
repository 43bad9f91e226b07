//! Run the auto-clicker through the tracing actuator.

use std::sync::Arc;

use macrokit_common::config::AppConfig;
use macrokit_input_bridge::{ManualEventSource, TracingActuator};
use macrokit_recording_model::storage::JsonStorage;
use macrokit_session_engine::{AutoClickerConfig, ClickerState, Coordinator, SessionKind};
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;

/// Command-line overrides for the persisted clicker settings.
pub struct ClickArgs {
    pub interval_ms: Option<u64>,
    pub jitter_ms: Option<i64>,
    pub button: Option<String>,
    pub double: bool,
    pub count: Option<u32>,
    pub at: Option<String>,
}

pub async fn run(app_config: &AppConfig, args: ClickArgs) -> anyhow::Result<()> {
    let mut settings = app_config.clicker.clone();
    if let Some(interval_ms) = args.interval_ms {
        settings.interval_ms = interval_ms;
    }
    if let Some(jitter_ms) = args.jitter_ms {
        settings.jitter_ms = jitter_ms;
    }
    if let Some(button) = args.button {
        settings.button = button;
    }
    if args.double {
        settings.click_type = "double".to_string();
    }
    if let Some(count) = args.count {
        settings.repeat_mode = "count".to_string();
        settings.repeat_count = count;
    }
    if let Some(at) = args.at {
        settings.fixed_position = Some(parse_position(&at)?);
    }
    let config = AutoClickerConfig::try_from(&settings)?;

    let coordinator = Coordinator::new(
        Arc::new(TracingActuator::new()),
        Arc::new(ManualEventSource::new()),
        Arc::new(JsonStorage::new()),
        Handle::current(),
    );
    coordinator.set_autoclicker_config(config.clone())?;

    println!("Auto-clicker:");
    println!("  Interval: {}ms", config.interval.as_millis());
    println!("  Jitter: ±{}ms", config.jitter.as_millis());
    println!("  Button: {} ({})", config.button.as_str(), config.click_type.as_str());
    println!("  Repeat: {:?}", config.repeat);
    println!("  Position: {:?}", config.position);
    println!();
    println!("Press Ctrl+C to stop...");

    let mut rx = coordinator.subscribe();
    coordinator.toggle_autoclicker()?;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                coordinator.stop()?;
                println!();
                break;
            }
            event = rx.recv() => match event {
                Ok(event) if event.session == SessionKind::AutoClicker && !event.active => break,
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {
                    if coordinator.autoclicker_state() == ClickerState::Stopped {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    println!("Clicks performed: {}", coordinator.click_count());
    coordinator.shutdown();
    Ok(())
}

fn parse_position(value: &str) -> anyhow::Result<[i32; 2]> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("Expected X,Y but got {value:?}"))?;
    Ok([x.trim().parse()?, y.trim().parse()?])
}
