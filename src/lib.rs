pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod matcher;
pub mod models;
pub mod platform;
pub mod presence;
#[cfg(test)]
mod test_utils;
pub mod twitch;
pub mod validation;

use crate::config::{
    read_store, write_store, ConfigStore, Credentials, Paths, RulesWatcher, Settings, SharedStore,
};
use crate::constants::PRESENCE_CHANNEL_CAPACITY;
use crate::dispatch::{ControllerConfig, DispatchController};
use crate::error::AppError;
use crate::platform::{NativeWindows, WindowSnapshotProvider};
use crate::presence::sse::PresenceStream;
use crate::presence::PresenceState;
use crate::twitch::{RemoteStateUpdater, TwitchClient};
use crate::validation::validate_presence_endpoint;
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Error type for daemon startup failures
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Could not determine configuration directory: {0}")]
    Paths(AppError),
    #[error("Not logged in to Twitch: {0}")]
    Credentials(AppError),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(AppError),
    #[error("Invalid presence endpoint: {0}")]
    Presence(AppError),
    #[error("Failed to wait for shutdown signal: {0}")]
    Signal(std::io::Error),
}

/// Lock a mutex, recovering from poisoning if necessary
pub(crate) fn safe_lock<'a, T>(mutex: &'a Mutex<T>, context: &str) -> std::sync::MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("{context} mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct DaemonOptions {
    /// Overrides the per-user configuration directory.
    pub config_dir: Option<PathBuf>,
}

/// Run the switcher until Ctrl-C.
pub async fn run(options: DaemonOptions) -> Result<(), InitError> {
    let paths = match options.config_dir {
        Some(dir) => Paths::at(&dir),
        None => Paths::discover().map_err(InitError::Paths)?,
    };
    info!("Using configuration in {}", paths.config_dir().display());

    let settings = Settings::load(&paths.settings_file());
    let credentials =
        Credentials::load(&paths.credentials_file()).map_err(InitError::Credentials)?;
    let twitch = TwitchClient::new(credentials).map_err(InitError::HttpClient)?;
    check_token(&twitch).await;

    let rules_path = paths.rules_file();
    let store = ConfigStore::load(&rules_path).shared();
    info!("Loaded {} rules", read_store(&store).len());

    let cancel = CancellationToken::new();
    let presence = PresenceState::new();
    let (tx, rx) = mpsc::channel(PRESENCE_CHANNEL_CAPACITY);
    let consumer = presence::spawn_consumer(presence.clone(), rx);
    match settings.presence_endpoint.as_deref() {
        Some(endpoint) => {
            let (url, id) = validate_presence_endpoint(endpoint).map_err(InitError::Presence)?;
            let stream = PresenceStream::new(url).map_err(InitError::HttpClient)?;
            info!("Following presence stream {id}");
            tokio::spawn(stream.run(tx, cancel.child_token()));
        }
        None => {
            info!("No presence endpoint configured; using window detection only");
            drop(tx);
        }
    }

    let reloader = match RulesWatcher::new(&rules_path) {
        Ok(watcher) => Some(spawn_rules_reloader(
            rules_path.clone(),
            watcher,
            Arc::clone(&store),
            cancel.child_token(),
        )),
        Err(e) => {
            warn!("Rules hot reload disabled: {e}");
            None
        }
    };

    let controller = DispatchController::new(
        Arc::new(NativeWindows::new()) as Arc<dyn WindowSnapshotProvider>,
        Arc::clone(&store),
        presence,
        Arc::new(twitch) as Arc<dyn RemoteStateUpdater>,
        ControllerConfig {
            scan_interval: settings.scan_interval(),
        },
    );
    controller.start();

    let signal = tokio::signal::ctrl_c().await;
    info!("Shutting down");
    controller.shutdown(Duration::from_secs(5)).await;
    cancel.cancel();
    if consumer.await.is_err() {
        warn!("Presence consumer ended abnormally");
    }

    if let Some(reloader) = reloader {
        if reloader.await.is_err() {
            warn!("Rules reloader ended abnormally");
        }
    }
    persist_rules(&rules_path, &store);

    signal.map_err(InitError::Signal)
}

async fn check_token(twitch: &TwitchClient) {
    match twitch.validate_token().await {
        Ok(info) if !info.can_manage_broadcast() => {
            warn!(
                "Twitch token lacks the {} scope; category updates will fail",
                twitch::REQUIRED_SCOPE
            );
        }
        Ok(info) => info!(
            "Authenticated with Twitch as {}",
            info.login.as_deref().unwrap_or("unknown user")
        ),
        Err(e) => warn!("Could not validate Twitch token: {e}"),
    }
}

/// Swap edits to the rules file into the shared store as they land. A file
/// that fails to parse leaves the current rules in place.
fn spawn_rules_reloader(
    path: PathBuf,
    mut watcher: RulesWatcher,
    store: SharedStore,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                changed = watcher.changed() => {
                    if !changed {
                        break;
                    }
                }
            }
            match ConfigStore::read(&path) {
                Ok(reloaded) => {
                    let unchanged = *read_store(&store) == reloaded;
                    if unchanged {
                        debug!("Rules file touched without changes");
                        continue;
                    }
                    info!("Reloaded {} rules from {}", reloaded.len(), path.display());
                    *write_store(&store) = reloaded;
                }
                Err(e) => warn!("Keeping current rules, {} is unreadable: {e}", path.display()),
            }
        }
    })
}

/// Write the rule list back on exit. Edits made on disk while running win, and
/// the file is only rewritten when normalizing it changed something.
fn persist_rules(path: &Path, store: &SharedStore) {
    let latest = match ConfigStore::read(path) {
        Ok(latest) => latest,
        Err(e) => {
            warn!("Leaving {} as is, it is unreadable: {e}", path.display());
            return;
        }
    };
    *write_store(store) = latest.clone();

    let on_disk = fs::read_to_string(path).ok();
    if on_disk.is_none() && latest.is_empty() {
        return;
    }
    match latest.to_json() {
        Ok(json) if on_disk.as_deref() == Some(json.as_str()) => {}
        Ok(_) => match latest.save(path) {
            Ok(()) => info!("Saved {} rules to {}", latest.len(), path.display()),
            Err(e) => error!("Failed to save rules to {}: {e}", path.display()),
        },
        Err(e) => error!("Failed to serialize rules: {e}"),
    }
}
