use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;

/// A tracked application: when its executable is on screen, the channel
/// category is switched to `category_id`.
///
/// Field names on disk follow the `GameSettings.json` layout so existing
/// rule files load as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "Priority", default)]
    pub priority: i32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Id")]
    pub category_id: String,
    #[serde(rename = "ExecutableName")]
    pub executable_match: String,
    /// Written as `""` when unset; older readers require the field.
    #[serde(
        rename = "BoxArtPath",
        default,
        serialize_with = "artwork_to_disk",
        deserialize_with = "artwork_from_disk"
    )]
    pub artwork_path: Option<String>,
}

#[allow(clippy::ref_option, reason = "signature fixed by serde's serialize_with")]
fn artwork_to_disk<S: Serializer>(path: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(path.as_deref().unwrap_or_default())
}

fn artwork_from_disk<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let path = Option::<String>::deserialize(deserializer)?;
    Ok(path.filter(|p| !p.trim().is_empty()))
}

impl Rule {
    pub fn new(priority: i32, name: &str, category_id: &str, executable_match: &str) -> Self {
        Self {
            priority,
            name: name.to_string(),
            category_id: category_id.to_string(),
            executable_match: executable_match.to_string(),
            artwork_path: None,
        }
    }

    /// Case-insensitive suffix test against a window's executable name.
    pub fn matches_executable(&self, executable: &str) -> bool {
        let pattern = self.executable_match.to_lowercase();
        !pattern.is_empty() && executable.to_lowercase().ends_with(&pattern)
    }

    /// Case-insensitive equality against a presence title id.
    pub fn matches_title_id(&self, title_id: &str) -> bool {
        self.executable_match.to_lowercase() == title_id.to_lowercase()
    }

    /// True when both rules claim the same executable.
    pub fn collides_with(&self, other: &Rule) -> bool {
        self.executable_match.to_lowercase() == other.executable_match.to_lowercase()
    }

    /// Scan order: priority descending, then name ascending.
    pub fn scan_order(a: &Rule, b: &Rule) -> Ordering {
        b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name))
    }
}
