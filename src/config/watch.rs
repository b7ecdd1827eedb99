//! Filesystem notifications for the rules file.
//!
//! The watcher sits on the parent directory, because saves replace the file
//! through a rename and a watch on the file itself would be lost with the old
//! inode.

use crate::error::AppError;
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use tokio::sync::mpsc;

/// Live watch on one file. Dropping it stops the notifications.
pub struct RulesWatcher {
    // Kept alive for the lifetime of the watch
    _watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<()>,
}

impl RulesWatcher {
    /// Start watching `path`. Its directory is created if missing.
    pub fn new(path: &Path) -> Result<Self, AppError> {
        let dir = path
            .parent()
            .ok_or_else(|| AppError::Config(format!("{} has no parent", path.display())))?;
        let file_name = path
            .file_name()
            .map(ToOwned::to_owned)
            .ok_or_else(|| AppError::Config(format!("{} is not a file", path.display())))?;
        fs::create_dir_all(dir)?;

        let (tx, events) = mpsc::unbounded_channel();
        let mut watcher = recommended_watcher(move |result: notify::Result<Event>| match result {
            Ok(event) => {
                if touches(&event, &file_name) {
                    let _ = tx.send(());
                }
            }
            Err(e) => log::warn!("Rules watcher error: {e}"),
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            events,
        })
    }

    /// Wait for the file to change. Notifications that piled up meanwhile are
    /// folded into one. Returns false if the watcher is gone.
    pub async fn changed(&mut self) -> bool {
        if self.events.recv().await.is_none() {
            return false;
        }
        while self.events.try_recv().is_ok() {}
        true
    }
}

/// True when `event` may have changed the file named `file_name`.
fn touches(event: &Event, file_name: &OsStr) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    // No paths means the backend lost track; assume the worst
    event.paths.is_empty()
        || event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RenameMode};
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn name() -> OsString {
        OsString::from("rules.json")
    }

    #[test]
    fn test_rename_onto_rules_file_counts() {
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/cfg/rules.json.tmp"))
            .add_path(PathBuf::from("/cfg/rules.json"));
        assert!(touches(&event, &name()));
    }

    #[test]
    fn test_temp_file_alone_is_ignored() {
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/cfg/rules.json.tmp"));
        assert!(!touches(&event, &name()));

        let other = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/cfg/settings.json"));
        assert!(!touches(&other, &name()));
    }

    #[test]
    fn test_access_is_ignored() {
        let event = Event::new(EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("/cfg/rules.json"));
        assert!(!touches(&event, &name()));
    }

    #[test]
    fn test_pathless_event_counts() {
        assert!(touches(&Event::new(EventKind::Any), &name()));
    }

    #[tokio::test]
    async fn test_changed_fires_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let mut watcher = RulesWatcher::new(&path).unwrap();

        let mut store = crate::config::ConfigStore::new();
        store
            .insert(crate::models::Rule::new(1, "A", "1", "a.exe"))
            .unwrap();
        store.save(&path).unwrap();

        let fired = tokio::time::timeout(std::time::Duration::from_secs(5), watcher.changed())
            .await
            .unwrap();
        assert!(fired);
    }
}
