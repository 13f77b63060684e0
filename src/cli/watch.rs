use crate::sensor::{AmberSensor, SensorState};
use anyhow::Result;
use chrono::Utc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Shortest tick the poll loop runs at, whatever the configured interval.
pub const MIN_POLL_TICK: Duration = Duration::from_secs(1);

/// Polls the sensor on a fixed tick until Ctrl-C.
///
/// Each tick awaits the previous update, so refreshes never overlap. A zero interval polls
/// every [`MIN_POLL_TICK`].
pub async fn watch(mut sensor: AmberSensor, poll_interval: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(poll_interval.max(MIN_POLL_TICK));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_state = sensor.state();
    info!(sensor = %sensor.name(), state = %last_state, "Watching Amber Electric prices");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = sensor.update(Utc::now()).await {
                    error!(error = %e, "Update failed, retrying on the next tick");
                }
                last_state = report_change(&sensor, last_state);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping");
                return Ok(());
            }
        }
    }
}

fn report_change(sensor: &AmberSensor, last_state: SensorState) -> SensorState {
    let state = sensor.state();
    if state != last_state {
        info!(
            sensor = %sensor.name(),
            state = %state,
            last_update = ?sensor.last_updated(),
            "Sensor state changed"
        );
        println!("{}: {}", sensor.name(), state);
    }
    state
}
