use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{AppConfig, AppPaths},
    db::{DatabaseOptions, SaveDatabase},
    gametime::{write_sample, RawTimeSample},
    paths::{detect_db_path, detect_server_settings_path},
    server_settings::TimeSpeedSource,
};

use super::retry::RetryPolicy;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::{log_debug, log_error, log_info};

/// Everything one poll iteration needs.
pub struct PollContext {
    pub db: SaveDatabase,
    pub speed: TimeSpeedSource,
    pub state_file: PathBuf,
}

impl PollContext {
    /// Locates and opens the save database. `None` means the poller cannot
    /// run at all; the rest of the application carries on without it.
    pub fn prepare(config: &AppConfig, paths: &AppPaths) -> Option<Self> {
        let path_ini = paths.path_ini();

        let Some(db_path) = detect_db_path(config.db_path.as_deref(), &path_ini) else {
            log_error!(
                "SCUM.db not found or disk disconnected; time poller disabled. Set the path in {}",
                path_ini.display()
            );
            return None;
        };

        let options = DatabaseOptions {
            busy_timeout: config.db_busy_timeout(),
            ensure_indexes: config.ensure_indexes,
        };
        let db = match SaveDatabase::open(db_path, options) {
            Ok(db) => db,
            Err(err) => {
                log_error!("time poller disabled: {err:#}");
                return None;
            }
        };

        let server_settings = detect_server_settings_path(
            config.server_settings_path.as_deref(),
            &path_ini,
            Some(db.path()),
        );
        if let Some(path) = &server_settings {
            log_info!("Reading day length from {}", path.display());
        }

        Some(Self {
            db,
            speed: TimeSpeedSource::new(server_settings),
            state_file: paths.state_file(),
        })
    }
}

/// One iteration: read the active player's time and republish it.
pub async fn poll_once(ctx: &mut PollContext) -> Result<RawTimeSample> {
    let player = ctx.db.get_active_player_time().await?;
    let sample = RawTimeSample::new(player.map(|p| p.time_of_day), ctx.speed.current());

    let path = ctx.state_file.clone();
    let to_write = sample.clone();
    tokio::task::spawn_blocking(move || write_sample(&path, &to_write))
        .await
        .context("state file writer join failed")??;

    Ok(sample)
}

pub async fn poll_loop(mut ctx: PollContext, interval: Duration, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut retry = RetryPolicy::default();

    log_info!("time poller started, writing {}", ctx.state_file.display());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // The wait may have raced with a stop request.
                if cancel_token.is_cancelled() {
                    break;
                }

                match poll_once(&mut ctx).await {
                    Ok(sample) => {
                        retry.record_success();
                        log_debug!(
                            "polled time_of_day={:?} speed={:?}",
                            sample.time_of_day,
                            sample.time_speed
                        );
                    }
                    Err(err) => {
                        retry.record_failure(&err);
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                break;
            }
        }
    }

    log_info!("time poller shutting down");
}
