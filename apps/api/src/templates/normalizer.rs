//! Placeholder normalization: collapses every typed placeholder into `<*>`
//! so templates that differ only in placeholder names compare equal.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// The canonical wildcard every placeholder collapses to.
pub const WILDCARD: &str = "<*>";

static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]+)>").unwrap());

/// Trims `template` and replaces each `<...>` span with [`WILDCARD`].
pub fn normalize(template: &str) -> String {
    match PLACEHOLDER_PATTERN.replace_all(template.trim(), WILDCARD) {
        Cow::Borrowed(unchanged) => unchanged.to_string(),
        Cow::Owned(replaced) => replaced,
    }
}

/// Placeholder names in order of appearance, duplicates included.
pub fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER_PATTERN
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_mixed_vocabulary() {
        assert_eq!(normalize("<TIMESTAMP> <*> <IP_ADDRESS>"), "<*> <*> <*>");
    }

    #[test]
    fn test_normalize_login_template() {
        assert_eq!(
            normalize("<TIMESTAMP> User <USERNAME> logged in from <IP_ADDRESS>"),
            "<*> User <*> logged in from <*>"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "  <A> x <B>  ",
            "no placeholders here",
            "<<nested>>",
            "a < b > c",
            "",
            "<> stays",
            "<open but never closed",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_different_names_same_structure_normalize_equal() {
        assert_eq!(
            normalize("Session for <USER> closed"),
            normalize("Session for <USERNAME> closed")
        );
    }

    #[test]
    fn test_normalize_without_placeholders_only_trims() {
        assert_eq!(normalize("\t kernel panic \n"), "kernel panic");
    }

    #[test]
    fn test_normalize_stops_at_first_closing_bracket() {
        assert_eq!(normalize("<<nested>>"), "<*>>");
        assert_eq!(normalize("<a>b>"), "<*>b>");
    }

    #[test]
    fn test_empty_brackets_are_not_placeholders() {
        assert_eq!(normalize("value <> here"), "value <> here");
    }

    #[test]
    fn test_placeholders_in_order() {
        assert_eq!(
            placeholders("<TIMESTAMP> <LEVEL> retry <COUNT> of <COUNT>"),
            vec!["TIMESTAMP", "LEVEL", "COUNT", "COUNT"]
        );
        assert!(placeholders("plain text").is_empty());
    }
}
