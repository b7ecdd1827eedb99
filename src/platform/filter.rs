//! Executables that never represent something worth broadcasting.

const SYSTEM_EXACT: &[&str] = &[
    "startmenuexperiencehost.exe",
    "applicationframehost.exe",
    "peopleexperiencehost.exe",
    "shellexperiencehost.exe",
    "microsoft.notes.exe",
    "systemsettings.exe",
    "textinputhost.exe",
    "searchapp.exe",
    "video.ui.exe",
    "searchui.exe",
    "lockapp.exe",
    "cortana.exe",
    "gamebar.exe",
    "tabtip.exe",
    "time.exe",
    "explorer.exe",
    "taskhostw.exe",
    "dwm.exe",
    "ctfmon.exe",
    "audiodg.exe",
    "svchost.exe",
    "conhost.exe",
    "fontdrvhost.exe",
    "runtimebroker.exe",
    "calculatorapp.exe",
    "rtkuwp.exe",
    // Desktop shells and compositors
    "gnome-shell",
    "plasmashell",
    "xfdesktop",
    "xfce4-panel",
    "kwin_x11",
    "kwin_wayland",
    "xwayland",
    // Browsers and chat stay on screen while playing
    "brave.exe",
    "brave",
    "firefox.exe",
    "firefox",
    "chrome.exe",
    "chrome",
    "chromium",
    "msedge.exe",
    "opera.exe",
    "opera",
    "discord.exe",
    "discord",
];

const SYSTEM_PREFIXES: &[&str] = &["windowsinternal"];

/// True when `executable` is a known system or always-open process.
pub fn is_excluded_executable(executable: &str) -> bool {
    let exe = executable.to_lowercase();
    SYSTEM_EXACT.contains(&exe.as_str()) || SYSTEM_PREFIXES.iter().any(|p| exe.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excludes_exact_names_case_insensitively() {
        assert!(is_excluded_executable("explorer.exe"));
        assert!(is_excluded_executable("RuntimeBroker.exe"));
        assert!(is_excluded_executable("Discord.exe"));
        assert!(is_excluded_executable("firefox"));
    }

    #[test]
    fn test_excludes_prefixes() {
        assert!(is_excluded_executable("WindowsInternal.ComposableShell.exe"));
    }

    #[test]
    fn test_keeps_games() {
        assert!(!is_excluded_executable("Celeste.exe"));
        assert!(!is_excluded_executable("steam_app_1145360"));
    }
}
