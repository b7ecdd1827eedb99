use crate::models::{Rule, WindowRecord};

/// Where a match came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    /// A visible window's executable ends with the rule's pattern.
    Window,
    /// The presence stream reports the rule's title id.
    Presence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched<'a> {
    pub rule: &'a Rule,
    pub source: MatchSource,
}

/// Pick the rule describing what the user is doing right now.
///
/// Rules are walked in scan order (priority descending, name ascending) and the
/// first rule whose pattern is a suffix of any window executable wins. Only when
/// no window matches is the presence title id consulted.
pub fn find_match<'a>(
    windows: &[WindowRecord],
    rules: &'a [Rule],
    presence_title_id: Option<&str>,
) -> Option<Matched<'a>> {
    let mut ordered: Vec<&Rule> = rules.iter().collect();
    ordered.sort_by(|a, b| Rule::scan_order(a, b));

    if !windows.is_empty() {
        let local = ordered
            .iter()
            .copied()
            .find(|rule| windows.iter().any(|w| rule.matches_executable(&w.executable)));
        if let Some(rule) = local {
            return Some(Matched {
                rule,
                source: MatchSource::Window,
            });
        }
    }

    let title_id = presence_title_id.filter(|id| !id.is_empty())?;
    rules
        .iter()
        .find(|rule| rule.matches_title_id(title_id))
        .map(|rule| Matched {
            rule,
            source: MatchSource::Presence,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<Rule> {
        vec![
            Rule::new(5, "Game Two", "G2", "game2.exe"),
            Rule::new(10, "Game One", "G1", "game1.exe"),
        ]
    }

    fn window(exe: &str) -> WindowRecord {
        WindowRecord::new("Window", "Class", exe)
    }

    #[test]
    fn test_local_match_is_case_insensitive() {
        let rules = rules();
        let matched = find_match(&[window("Game1.exe")], &rules, None).unwrap();
        assert_eq!(matched.rule.category_id, "G1");
        assert_eq!(matched.source, MatchSource::Window);
    }

    #[test]
    fn test_local_match_beats_presence() {
        let rules = rules();
        let matched = find_match(&[window("game2.exe")], &rules, Some("game1.exe")).unwrap();
        assert_eq!(matched.rule.category_id, "G2");
        assert_eq!(matched.source, MatchSource::Window);
    }

    #[test]
    fn test_presence_fallback_when_no_windows() {
        let rules = rules();
        let matched = find_match(&[], &rules, Some("game1.exe")).unwrap();
        assert_eq!(matched.rule.category_id, "G1");
        assert_eq!(matched.source, MatchSource::Presence);
    }

    #[test]
    fn test_presence_fallback_when_windows_do_not_match() {
        let rules = rules();
        let matched = find_match(&[window("notepad.exe")], &rules, Some("GAME2.EXE")).unwrap();
        assert_eq!(matched.rule.category_id, "G2");
    }

    #[test]
    fn test_nothing_to_match() {
        let rules = rules();
        assert!(find_match(&[], &rules, None).is_none());
        assert!(find_match(&[], &rules, Some("")).is_none());
        assert!(find_match(&[window("notepad.exe")], &rules, Some("unknown")).is_none());
    }

    #[test]
    fn test_empty_rule_set() {
        assert!(find_match(&[window("game1.exe")], &[], Some("game1.exe")).is_none());
    }

    #[test]
    fn test_higher_priority_wins_when_both_visible() {
        let rules = rules();
        let windows = [window("game2.exe"), window("game1.exe")];
        let matched = find_match(&windows, &rules, None).unwrap();
        assert_eq!(matched.rule.category_id, "G1", "Higher priority rule should win");
    }

    #[test]
    fn test_equal_priority_breaks_tie_by_name() {
        let rules = vec![
            Rule::new(1, "Zelda", "Z", "zelda.exe"),
            Rule::new(1, "Astro", "A", "astro.exe"),
        ];
        let windows = [window("zelda.exe"), window("astro.exe")];
        let matched = find_match(&windows, &rules, None).unwrap();
        assert_eq!(matched.rule.category_id, "A");
    }

    #[test]
    fn test_suffix_pattern_matches_longer_executable() {
        let rules = vec![Rule::new(1, "Minecraft", "M", "java.exe")];
        let matched = find_match(&[window("OpenJDK-java.exe")], &rules, None).unwrap();
        assert_eq!(matched.rule.category_id, "M");
    }

    #[test]
    fn test_match_is_deterministic() {
        let rules = rules();
        let windows = [window("game1.exe"), window("game2.exe")];
        let first = find_match(&windows, &rules, Some("game2.exe")).map(|m| m.rule.clone());
        for _ in 0..10 {
            let again = find_match(&windows, &rules, Some("game2.exe")).map(|m| m.rule.clone());
            assert_eq!(first, again);
        }
    }
}
