use anyhow::{Context, Result};
use log::{error, info};
use std::sync::Arc;

use tasksync::backend::factory;
use tasksync::config::Config;
use tasksync::connectivity::{Connectivity, ConnectivityProbe};
use tasksync::logger::Logger;
use tasksync::storage::{LocalStorage, TaskStore};
use tasksync::sync::SyncService;
use tasksync::sync_coordinator::SyncCoordinator;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    if let Some(flag) = args.next() {
        if flag == "--generate-config" {
            let path = match args.next() {
                Some(path) => path.into(),
                None => Config::get_default_config_path()?,
            };
            return Config::generate_default_config(path);
        }
        eprintln!("Usage: tasksync [--generate-config [path]]");
        return Ok(());
    }

    let config = Config::load()?;
    let logger = Logger::new();
    logger.install(&config.logging)?;

    let storage = LocalStorage::new(&config.storage).await?;
    let store = Arc::new(TaskStore::new(storage).await.context("Failed to load tasks")?);
    let gateway = factory::create_gateway(&config.remote)?;
    info!("Using {} gateway at {}", gateway.gateway_type(), config.remote.base_url);
    let connectivity = Connectivity::new(true);

    let service = SyncService::new(store, gateway, connectivity.clone(), config.remote.page_size);
    let coordinator = SyncCoordinator::from_config(service, &config.sync);

    if config.sync.connectivity_probe_enabled {
        let probe = ConnectivityProbe::new(
            connectivity,
            &config.remote.base_url,
            config.sync.probe_interval(),
            coordinator.cancellation_token().child_token(),
        )?;
        tokio::spawn(probe.run());
    }

    coordinator.start();
    coordinator.load_initial().await;

    let mut state_rx = coordinator.observe();
    let mut last_summary = String::new();
    loop {
        let summary = {
            let state = state_rx.borrow_and_update();
            format!(
                "{} task(s), {} pending, {}{}",
                state.tasks.len(),
                state.pending_sync_count,
                if state.is_offline { "offline" } else { "online" },
                if state.is_syncing { ", syncing" } else { "" }
            )
        };
        if summary != last_summary {
            info!("{summary}");
            last_summary = summary;
        }
        if let Some(message) = coordinator.state().error {
            error!("{message}");
            coordinator.dismiss_error();
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    coordinator.shutdown().await;
    Ok(())
}
