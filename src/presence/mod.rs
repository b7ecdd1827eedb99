//! Remote presence: what the presence stream says is being played.
//!
//! The stream client parses named events into [`PresenceUpdate`]s and pushes
//! them onto a channel. A consumer task applies them to [`PresenceState`], which
//! the dispatch loop reads once per scan.

pub mod sse;

use crate::models::{FriendPayload, TitlePayload};
use crate::safe_lock;
use log::{debug, info};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One parsed event from the presence stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceUpdate {
    /// A title is being played.
    Title { id: String, name: Option<String> },
    /// Nothing is being played (the stream sends `{}`).
    NoTitle,
    /// Account presence, informational only.
    Friend { name: String, online: bool },
}

/// Turn a named stream event into an update. Unknown events and malformed
/// payloads yield `None`.
pub fn parse_event(event: &str, data: &str) -> Option<PresenceUpdate> {
    match event {
        "title" => parse_title(data),
        "friend" | "presence" => parse_friend(data),
        _ => {
            debug!("Ignoring presence event '{event}'");
            None
        }
    }
}

fn parse_title(data: &str) -> Option<PresenceUpdate> {
    let value: Value = match serde_json::from_str(data.trim()) {
        Ok(value) => value,
        Err(e) => {
            debug!("Discarding malformed title payload: {e}");
            return None;
        }
    };

    if value.as_object().is_some_and(serde_json::Map::is_empty) {
        return Some(PresenceUpdate::NoTitle);
    }

    match serde_json::from_value::<TitlePayload>(value) {
        Ok(title) if title.id.trim().is_empty() => Some(PresenceUpdate::NoTitle),
        Ok(title) => Some(PresenceUpdate::Title {
            id: title.id,
            name: title.name,
        }),
        Err(e) => {
            debug!("Discarding malformed title payload: {e}");
            None
        }
    }
}

fn parse_friend(data: &str) -> Option<PresenceUpdate> {
    match serde_json::from_str::<FriendPayload>(data) {
        Ok(friend) => Some(PresenceUpdate::Friend {
            online: friend.presence.as_ref().is_some_and(|p| p.is_online()),
            name: friend.name,
        }),
        Err(e) => {
            debug!("Discarding malformed presence payload: {e}");
            None
        }
    }
}

/// Latest view of the remote presence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceSnapshot {
    pub title_id: Option<String>,
    pub title_name: Option<String>,
}

/// Shared, atomically replaced presence snapshot.
#[derive(Debug, Clone, Default)]
pub struct PresenceState {
    inner: Arc<Mutex<PresenceSnapshot>>,
}

impl PresenceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PresenceSnapshot {
        safe_lock(&self.inner, "Presence").clone()
    }

    pub fn title_id(&self) -> Option<String> {
        safe_lock(&self.inner, "Presence").title_id.clone()
    }

    pub fn apply(&self, update: &PresenceUpdate) {
        match update {
            PresenceUpdate::Title { id, name } => {
                let next = PresenceSnapshot {
                    title_id: Some(id.clone()),
                    title_name: name.clone(),
                };
                let mut current = safe_lock(&self.inner, "Presence");
                if *current != next {
                    info!(
                        "Presence title: {} ({id})",
                        name.as_deref().unwrap_or("unknown")
                    );
                    *current = next;
                }
            }
            PresenceUpdate::NoTitle => {
                let mut current = safe_lock(&self.inner, "Presence");
                if current.title_id.is_some() {
                    info!("Presence title cleared");
                }
                *current = PresenceSnapshot::default();
            }
            PresenceUpdate::Friend { name, online } => {
                let state = if *online { "online" } else { "offline" };
                info!("Presence account: {name} ({state})");
            }
        }
    }
}

/// Apply updates from `rx` until every sender is gone.
pub fn spawn_consumer(state: PresenceState, mut rx: mpsc::Receiver<PresenceUpdate>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            state.apply(&update);
        }
        debug!("Presence consumer stopped");
    })
}
