use super::filter::is_excluded_executable;
use super::{WindowRecord, WindowSnapshotProvider};
use log::warn;
use std::path::Path;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt, Window};
use x11rb::rust_connection::RustConnection;

struct Atoms {
    client_list: Atom,
    wm_state: Atom,
    wm_state_hidden: Atom,
    wm_state_skip_taskbar: Atom,
    wm_name: Atom,
    wm_pid: Atom,
}

/// EWMH window enumeration over X11 (works under XWayland for most games).
pub struct LinuxWindows {
    conn: Option<RustConnection>,
    root: Window,
    atoms: Option<Atoms>,
    own_pid: u32,
}

impl Default for LinuxWindows {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxWindows {
    pub fn new() -> Self {
        let own_pid = std::process::id();
        let disabled = Self {
            conn: None,
            root: 0,
            atoms: None,
            own_pid,
        };

        let (conn, screen_num) = match x11rb::connect(None) {
            Ok(pair) => pair,
            Err(e) => {
                // Headless or pure Wayland: report no windows rather than failing
                warn!("Failed to connect to X server: {e}. Window detection disabled.");
                return disabled;
            }
        };
        let Some(root) = conn.setup().roots.get(screen_num).map(|s| s.root) else {
            warn!("Invalid screen number {screen_num}. Window detection disabled.");
            return disabled;
        };

        let atoms = Self::intern_atoms(&conn);
        if atoms.is_none() {
            warn!("Failed to intern EWMH atoms. Window detection disabled.");
        }
        Self {
            conn: Some(conn),
            root,
            atoms,
            own_pid,
        }
    }

    fn intern_atoms(conn: &RustConnection) -> Option<Atoms> {
        let atom = |name: &str| -> Option<Atom> {
            conn.intern_atom(false, name.as_bytes())
                .ok()?
                .reply()
                .ok()
                .map(|r| r.atom)
        };
        Some(Atoms {
            client_list: atom("_NET_CLIENT_LIST")?,
            wm_state: atom("_NET_WM_STATE")?,
            wm_state_hidden: atom("_NET_WM_STATE_HIDDEN")?,
            wm_state_skip_taskbar: atom("_NET_WM_STATE_SKIP_TASKBAR")?,
            wm_name: atom("_NET_WM_NAME")?,
            wm_pid: atom("_NET_WM_PID")?,
        })
    }

    fn property32(&self, window: Window, property: Atom, kind: AtomEnum) -> Vec<u32> {
        let Some(conn) = self.conn.as_ref() else {
            return Vec::new();
        };
        conn.get_property(false, window, property, kind, 0, 4096)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .and_then(|reply| reply.value32().map(|values| values.collect::<Vec<u32>>()))
            .unwrap_or_default()
    }

    fn property_string(&self, window: Window, property: Atom) -> Option<String> {
        let reply = self
            .conn
            .as_ref()?
            .get_property(false, window, property, AtomEnum::ANY, 0, 1024)
            .ok()?
            .reply()
            .ok()?;

        if reply.value.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(&reply.value).into_owned())
    }

    fn is_hidden(&self, atoms: &Atoms, window: Window) -> bool {
        self.property32(window, atoms.wm_state, AtomEnum::ATOM)
            .iter()
            .any(|s| *s == atoms.wm_state_hidden || *s == atoms.wm_state_skip_taskbar)
    }

    fn title(&self, atoms: &Atoms, window: Window) -> String {
        self.property_string(window, atoms.wm_name)
            .or_else(|| self.property_string(window, AtomEnum::WM_NAME.into()))
            .unwrap_or_default()
    }

    fn window_class(&self, window: Window) -> String {
        // WM_CLASS is "instance\0class\0"
        self.property_string(window, AtomEnum::WM_CLASS.into())
            .and_then(|s| s.split('\0').rfind(|part| !part.is_empty()).map(str::to_string))
            .unwrap_or_default()
    }

    fn record(&self, atoms: &Atoms, window: Window) -> Option<WindowRecord> {
        if self.is_hidden(atoms, window) {
            return None;
        }
        let pid = self
            .property32(window, atoms.wm_pid, AtomEnum::CARDINAL)
            .first()
            .copied()?;
        if pid == self.own_pid {
            return None;
        }

        let executable = executable_for_pid(pid)?;
        if is_excluded_executable(&executable) {
            return None;
        }

        Some(WindowRecord {
            title: self.title(atoms, window),
            window_class: self.window_class(window),
            executable,
        })
    }
}

impl WindowSnapshotProvider for LinuxWindows {
    fn list_visible_windows(&self) -> Vec<WindowRecord> {
        let Some(atoms) = self.atoms.as_ref() else {
            return Vec::new();
        };
        self.property32(self.root, atoms.client_list, AtomEnum::WINDOW)
            .into_iter()
            .filter_map(|window| self.record(atoms, window))
            .collect()
    }
}

/// File name of the binary a process runs, falling back to its `comm`.
fn executable_for_pid(pid: u32) -> Option<String> {
    let proc_dir = Path::new("/proc").join(pid.to_string());
    std::fs::read_link(proc_dir.join("exe"))
        .ok()
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .or_else(|| {
            std::fs::read_to_string(proc_dir.join("comm"))
                .ok()
                .map(|comm| comm.trim().to_string())
        })
        .filter(|name| !name.is_empty())
}
