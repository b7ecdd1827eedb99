//! Shared test fakes for the dispatch pipeline.
//!
//! This module provides in-memory stand-ins for the window enumerator and the
//! remote updater so the scan cycle can be driven without a display or network.

#![cfg(test)]

use crate::config::ConfigStore;
use crate::models::{Rule, WindowRecord};
use crate::platform::WindowSnapshotProvider;
use crate::twitch::{RemoteStateUpdater, UpdateError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::{Notify, Semaphore};

/// Window provider returning whatever the test last set.
#[derive(Default)]
pub struct FakeWindows {
    windows: Mutex<Vec<WindowRecord>>,
    scans: AtomicUsize,
}

impl FakeWindows {
    pub fn with(executables: &[&str]) -> Self {
        let fake = Self::default();
        fake.set(executables);
        fake
    }

    pub fn set(&self, executables: &[&str]) {
        let windows = executables
            .iter()
            .map(|exe| WindowRecord::new("Window", "Class", exe))
            .collect();
        *self.windows.lock().unwrap() = windows;
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

impl WindowSnapshotProvider for FakeWindows {
    fn list_visible_windows(&self) -> Vec<WindowRecord> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.windows.lock().unwrap().clone()
    }
}

/// Updater that records every category it was asked to set.
///
/// It can be told to fail, or to block inside the call until
/// [`RecordingUpdater::release`] is called.
#[derive(Default)]
pub struct RecordingUpdater {
    calls: Mutex<Vec<String>>,
    fail: AtomicBool,
    gate: Option<Semaphore>,
    entered: Notify,
}

impl RecordingUpdater {
    pub fn failing() -> Self {
        let updater = Self::default();
        updater.set_failing(true);
        updater
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Let one blocked call finish.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    /// Wait until a call has entered the updater.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }
}

#[async_trait]
impl RemoteStateUpdater for RecordingUpdater {
    async fn update_category(&self, category_id: &str) -> Result<(), UpdateError> {
        self.calls.lock().unwrap().push(category_id.to_string());
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(UpdateError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }
}

/// The two-game rule set used across dispatch tests.
pub fn two_game_store() -> ConfigStore {
    let mut store = ConfigStore::new();
    store.insert(Rule::new(10, "Game One", "1001", "game1.exe")).unwrap();
    store.insert(Rule::new(5, "Game Two", "1002", "game2.exe")).unwrap();
    store
}
