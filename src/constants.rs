// src/constants.rs

/// Default scan cadence in seconds
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 5;

/// Upper bound for a configured scan cadence (1 hour)
pub const MAX_SCAN_INTERVAL_SECS: u64 = 60 * 60;

/// Timeout applied to every Twitch API request
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Maximum rule name length
pub const MAX_RULE_NAME_LEN: usize = 100;

/// Maximum executable match length
pub const MAX_EXECUTABLE_MATCH_LEN: usize = 260;

/// Maximum category id length
pub const MAX_CATEGORY_ID_LEN: usize = 32;

/// Twitch application client id used for Helix requests
pub const TWITCH_CLIENT_ID: &str = "h8g2xb4ce47gt5rhelstl7c1w0p55x";

/// Helix API root
pub const HELIX_BASE_URL: &str = "https://api.twitch.tv/helix";

/// OAuth token validation endpoint
pub const OAUTH_VALIDATE_URL: &str = "https://id.twitch.tv/oauth2/validate";

/// Only host accepted for presence stream endpoints
pub const PRESENCE_HOST: &str = "nxapi-presence.fancy.org.uk";

/// Presence stream reconnect backoff bounds
pub const PRESENCE_RECONNECT_MIN_SECS: u64 = 1;
pub const PRESENCE_RECONNECT_MAX_SECS: u64 = 60;

/// Longest SSE line kept while waiting for its newline
pub const SSE_MAX_LINE_BYTES: usize = 64 * 1024;

/// Capacity of the presence update channel
pub const PRESENCE_CHANNEL_CAPACITY: usize = 32;
