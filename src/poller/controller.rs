use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use super::loop_worker::{poll_loop, PollContext};

/// Owns the background poll task and its stop signal.
pub struct PollerController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl PollerController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn start(&mut self, ctx: PollContext, interval: Duration) -> Result<()> {
        if self.handle.is_some() {
            bail!("time poller already active");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(ctx, interval, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            info!("Stopping time poller");
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("time poller task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for PollerController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_support::seed_save_database, DatabaseOptions, SaveDatabase};
    use crate::server_settings::TimeSpeedSource;
    use tempfile::tempdir;

    #[tokio::test]
    async fn start_twice_is_rejected_and_stop_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("SCUM.db");
        seed_save_database(&db_path, Some(10.0));

        let make_ctx = || PollContext {
            db: SaveDatabase::open(db_path.clone(), DatabaseOptions::default()).unwrap(),
            speed: TimeSpeedSource::new(None),
            state_file: dir.path().join("data.ini"),
        };

        let mut controller = PollerController::new();
        controller
            .start(make_ctx(), Duration::from_millis(10))
            .unwrap();
        assert!(controller.is_running());
        assert!(controller
            .start(make_ctx(), Duration::from_millis(10))
            .is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        controller.stop().await.unwrap();
        assert!(!controller.is_running());
        controller.stop().await.unwrap();
        assert!(dir.path().join("data.ini").exists());
    }
}
