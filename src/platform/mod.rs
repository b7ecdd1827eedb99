pub mod filter;
pub mod types;

pub use types::{WindowRecord, WindowSnapshotProvider};

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::LinuxWindows as NativeWindows;

// No native enumerator yet: the presence stream still drives matching
#[cfg(not(target_os = "linux"))]
pub struct NativeWindows;

#[cfg(not(target_os = "linux"))]
impl WindowSnapshotProvider for NativeWindows {
    fn list_visible_windows(&self) -> Vec<WindowRecord> {
        Vec::new()
    }
}

#[cfg(not(target_os = "linux"))]
impl NativeWindows {
    pub fn new() -> Self {
        log::warn!("Window detection is not supported on this platform; relying on presence only");
        Self
    }
}
