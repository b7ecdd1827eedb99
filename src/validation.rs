use crate::constants::{
    MAX_CATEGORY_ID_LEN, MAX_EXECUTABLE_MATCH_LEN, MAX_RULE_NAME_LEN, MAX_SCAN_INTERVAL_SECS,
    PRESENCE_HOST,
};
use crate::error::AppError;
use url::Url;

fn non_empty<'a>(field: &'static str, value: &'a str, max_len: usize) -> Result<&'a str, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::InvalidInput {
            field,
            reason: "cannot be empty".into(),
        });
    }
    if value.len() > max_len {
        return Err(AppError::InvalidInput {
            field,
            reason: format!("cannot exceed {max_len} characters"),
        });
    }
    Ok(value)
}

/// Validate a rule's display name.
pub fn validate_rule_name(name: &str) -> Result<&str, AppError> {
    non_empty("name", name, MAX_RULE_NAME_LEN)
}

/// Validate the executable suffix a rule matches on.
pub fn validate_executable_match(executable: &str) -> Result<&str, AppError> {
    let executable = non_empty("executable", executable, MAX_EXECUTABLE_MATCH_LEN)?;
    if executable.contains(['/', '\\']) {
        return Err(AppError::InvalidInput {
            field: "executable",
            reason: "must be a file name, not a path".into(),
        });
    }
    Ok(executable)
}

/// Validate the category id a rule dispatches. Any non-empty string is
/// passed through to the remote as-is.
pub fn validate_category_id(category_id: &str) -> Result<&str, AppError> {
    non_empty("category_id", category_id, MAX_CATEGORY_ID_LEN)
}

/// Validate the scan cadence in seconds.
pub fn validate_scan_interval(secs: u64) -> Result<(), AppError> {
    if !(1..=MAX_SCAN_INTERVAL_SECS).contains(&secs) {
        return Err(AppError::InvalidInput {
            field: "scan_interval_secs",
            reason: format!("must be 1-{MAX_SCAN_INTERVAL_SECS}"),
        });
    }
    Ok(())
}

/// Validate a presence stream endpoint of the form
/// `https://nxapi-presence.fancy.org.uk/api/presence/<id>/events`.
/// Returns the parsed URL and the presence id.
pub fn validate_presence_endpoint(endpoint: &str) -> Result<(Url, String), AppError> {
    let err = |reason: &str| AppError::InvalidInput {
        field: "presence_endpoint",
        reason: reason.into(),
    };

    let url = Url::parse(endpoint.trim()).map_err(|e| err(&e.to_string()))?;
    if url.scheme() != "https" {
        return Err(err("must use https"));
    }
    if url.host_str() != Some(PRESENCE_HOST) {
        return Err(err(&format!("host must be {PRESENCE_HOST}")));
    }

    let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
    match segments.as_slice() {
        ["api", "presence", id, "events"] if !id.is_empty() => {
            let id = (*id).to_string();
            Ok((url, id))
        }
        _ => Err(err("path must be /api/presence/<id>/events")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rule_name_trims() {
        assert_eq!(validate_rule_name("  Celeste ").unwrap(), "Celeste");
    }

    #[test]
    fn test_validate_rule_name_empty() {
        assert!(validate_rule_name("   ").is_err());
    }

    #[test]
    fn test_validate_executable_match_rejects_paths() {
        assert!(validate_executable_match("game.exe").is_ok());
        assert!(validate_executable_match("C:\\Games\\game.exe").is_err());
        assert!(validate_executable_match("/usr/bin/game").is_err());
    }

    #[test]
    fn test_validate_category_id() {
        assert_eq!(validate_category_id(" 509658 ").unwrap(), "509658");
        assert_eq!(validate_category_id("G1").unwrap(), "G1");
        assert!(validate_category_id("  ").is_err());
        assert!(validate_category_id(&"1".repeat(MAX_CATEGORY_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_scan_interval() {
        assert!(validate_scan_interval(5).is_ok());
        assert!(validate_scan_interval(0).is_err());
        assert!(validate_scan_interval(MAX_SCAN_INTERVAL_SECS + 1).is_err());
    }

    #[test]
    fn test_validate_presence_endpoint_valid() {
        let (url, id) = validate_presence_endpoint(
            "https://nxapi-presence.fancy.org.uk/api/presence/abc123/events",
        )
        .unwrap();
        assert_eq!(id, "abc123");
        assert_eq!(url.host_str(), Some(PRESENCE_HOST));
    }

    #[test]
    fn test_validate_presence_endpoint_invalid() {
        assert!(validate_presence_endpoint("http://nxapi-presence.fancy.org.uk/api/presence/a/events").is_err());
        assert!(validate_presence_endpoint("https://example.com/api/presence/a/events").is_err());
        assert!(validate_presence_endpoint("https://nxapi-presence.fancy.org.uk/api/presence/a").is_err());
        assert!(validate_presence_endpoint("https://nxapi-presence.fancy.org.uk/api/presence//events").is_err());
        assert!(validate_presence_endpoint("not a url").is_err());
    }
}
