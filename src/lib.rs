pub mod config;
pub mod dashboard;
pub mod db;
pub mod gametime;
pub mod paths;
pub mod poller;
pub mod server_settings;
pub mod settings;
pub mod utils;
pub mod widgets;

use std::time::Duration;

use anyhow::{Context, Result};
use config::{AppConfig, AppPaths};
use dashboard::Dashboard;
use log::{error, info, warn};
use poller::{PollContext, PollerController};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::MissedTickBehavior,
};

/// Stdin reads park a blocking thread; don't let it hold up exit.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

pub fn run() {
    let paths = match AppPaths::from_env() {
        Ok(paths) => paths,
        Err(err) => {
            eprintln!("daywatch: {err:#}");
            return;
        }
    };

    utils::logging::init(Some(&paths.log_file()), config::debug_from_env());

    info!("daywatch starting up in {}", paths.root().display());

    let config = AppConfig::load(&paths).unwrap_or_else(|err| {
        warn!("Using default configuration: {err:#}");
        AppConfig::default()
    });

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {err}");
            return;
        }
    };

    if let Err(err) = runtime.block_on(serve(config, paths)) {
        error!("daywatch stopped: {err:#}");
    }
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
}

async fn serve(config: AppConfig, paths: AppPaths) -> Result<()> {
    let mut poller = PollerController::new();
    if let Some(ctx) = PollContext::prepare(&config, &paths) {
        poller.start(ctx, config.poll_interval())?;
    }

    let mut dashboard = Dashboard::new(&config, &paths)?;

    let mut ticker = tokio::time::interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                println!("{}", dashboard.tick());
            }
            line = input.next_line(), if input_open => match line {
                Ok(Some(line)) => {
                    let combo = line.trim();
                    if !combo.is_empty() && dashboard.dispatch_shortcut(combo).is_none() {
                        warn!("No stopwatch action bound to '{combo}'");
                    }
                }
                Ok(None) => input_open = false,
                Err(err) => {
                    warn!("Shortcut input closed: {err}");
                    input_open = false;
                }
            },
            result = &mut shutdown => {
                result.context("failed to listen for shutdown signal")?;
                info!("Shutdown requested");
                break;
            }
        }
    }

    poller.stop().await
}
