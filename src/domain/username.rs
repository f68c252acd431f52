//! Username normalization and collision resolution.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Fallback used when a base string normalizes to nothing.
pub const FALLBACK_USERNAME: &str = "user";

fn separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("Invalid regex"))
}

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9_.-]{3,60}$").expect("Invalid regex"))
}

/// Lowercases `base` and collapses every run of non `[a-z0-9]` characters into one `.`.
#[must_use]
pub fn normalize(base: &str) -> String {
    let lowered = base.trim().to_lowercase();
    let collapsed = separator_regex().replace_all(&lowered, ".");
    let trimmed = collapsed.trim_matches('.');
    if trimmed.is_empty() {
        FALLBACK_USERNAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Explicitly chosen usernames must match `^[a-z0-9_.-]{3,60}$`.
#[must_use]
pub fn is_valid_username(username: &str) -> bool {
    username_regex().is_match(username)
}

/// Picks the base used for suggestions: the display name, else the email local part.
#[must_use]
pub fn suggestion_base<'a>(name: &'a str, email: &'a str) -> Option<&'a str> {
    let name = name.trim();
    if !name.is_empty() {
        return Some(name);
    }
    let local = email.trim().split('@').next().unwrap_or_default().trim();
    (!local.is_empty()).then_some(local)
}

/// First free candidate in `base, base2, base3, ...` against `taken`.
///
/// `base` must already be normalized.
#[must_use]
pub fn first_free(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2_u64..)
        .map(|i| format!("{base}{i}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taken(names: &[&str]) -> HashSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize("John  Smith"), "john.smith");
        assert_eq!(normalize("  Mary-Jane O'Neil "), "mary.jane.o.neil");
        assert_eq!(normalize("__admin__"), "admin");
        assert_eq!(normalize("Ünïcode Name"), "n.code.name");
    }

    #[test]
    fn normalize_falls_back_when_empty() {
        assert_eq!(normalize(""), "user");
        assert_eq!(normalize("!!!"), "user");
    }

    #[test]
    fn first_free_appends_increasing_suffix() {
        assert_eq!(first_free("john.smith", &taken(&[])), "john.smith");
        assert_eq!(first_free("john.smith", &taken(&["john.smith"])), "john.smith2");
        assert_eq!(
            first_free("john.smith", &taken(&["john.smith", "john.smith2", "john.smith3"])),
            "john.smith4"
        );
        // Gaps are filled in order.
        assert_eq!(first_free("ana", &taken(&["ana", "ana3"])), "ana2");
    }

    #[test]
    fn suggestion_never_collides() {
        let existing = taken(&["tech", "tech2", "tech4", "tech.user"]);
        for base in ["tech", "tech.user", "other"] {
            let suggestion = first_free(base, &existing);
            assert!(!existing.contains(&suggestion), "{suggestion} collides");
        }
    }

    #[test]
    fn suggestion_base_prefers_name() {
        assert_eq!(suggestion_base("Jane", "x@y.z"), Some("Jane"));
        assert_eq!(suggestion_base("  ", "jane.doe@corp.io"), Some("jane.doe"));
        assert_eq!(suggestion_base("", ""), None);
        assert_eq!(suggestion_base("", "@corp.io"), None);
    }

    #[test]
    fn username_format() {
        assert!(is_valid_username("tech_01"));
        assert!(is_valid_username("a.b-c"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("Upper"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(&"x".repeat(61)));
    }
}
