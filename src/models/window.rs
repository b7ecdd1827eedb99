/// A visible, non-minimized top-level window and the executable that owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowRecord {
    pub title: String,
    pub window_class: String,
    pub executable: String,
}

impl WindowRecord {
    pub fn new(title: &str, window_class: &str, executable: &str) -> Self {
        Self {
            title: title.to_string(),
            window_class: window_class.to_string(),
            executable: executable.to_string(),
        }
    }
}

impl std::fmt::Display for WindowRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}) {}", self.executable, self.title)
    }
}
