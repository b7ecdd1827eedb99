use serde::Deserialize;

/// Payload of a `title` event: the title currently being played.
#[derive(Debug, Clone, Deserialize)]
pub struct TitlePayload {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub since: Option<String>,
}

/// Payload of a `friend`/`presence` event. Only the parts used for status.
#[derive(Debug, Clone, Deserialize)]
pub struct FriendPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub presence: Option<FriendPresence>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FriendPresence {
    #[serde(default)]
    pub state: String,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: i64,
}

impl FriendPresence {
    pub fn is_online(&self) -> bool {
        self.state == "ONLINE" || self.state == "PLAYING"
    }
}
