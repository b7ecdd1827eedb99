pub use crate::models::WindowRecord;

/// Source of the visible-window snapshot taken on every scan.
///
/// Implementations return visible, non-minimized top-level windows only, with
/// system processes and the running process already filtered out.
pub trait WindowSnapshotProvider: Send + Sync {
    fn list_visible_windows(&self) -> Vec<WindowRecord>;
}
