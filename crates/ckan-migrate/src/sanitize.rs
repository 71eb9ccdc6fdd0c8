//! Name normalization for the target catalog's slug grammar.

/// Maximum length of a catalog name.
pub const MAX_NAME_LEN: usize = 100;

/// Normalizes a free-text name into `[a-z0-9_-]{0,100}`.
///
/// Lowercases and replaces every other character with `_`. Substitutes at
/// the end of the name are dropped (`"My Org!"` becomes `my_org`) unless
/// nothing would be left. The result is truncated to [`MAX_NAME_LEN`].
/// An empty name is returned unchanged.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let mapped: Vec<(char, bool)> = name
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' | '-' => (c, false),
            _ => ('_', true),
        })
        .collect();

    let keep = mapped
        .iter()
        .rposition(|(_, substituted)| !substituted)
        .map_or(mapped.len(), |last| last + 1);

    mapped
        .into_iter()
        .take(keep.min(MAX_NAME_LEN))
        .map(|(c, _)| c)
        .collect()
}

/// Truncates to at most `max` characters without splitting a code point.
#[must_use]
pub fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize_name("My Org!"), "my_org");
        assert_eq!(sanitize_name("Water Quality 2020"), "water_quality_2020");
        assert_eq!(sanitize_name("already-fine_1"), "already-fine_1");
    }

    #[test]
    fn test_sanitize_empty_passes_through() {
        assert_eq!(sanitize_name(""), "");
    }

    #[test]
    fn test_sanitize_keeps_literal_trailing_underscore() {
        assert_eq!(sanitize_name("draft_"), "draft_");
        assert_eq!(sanitize_name("A.B."), "a_b");
    }

    #[test]
    fn test_sanitize_all_substituted_keeps_placeholders() {
        assert_eq!(sanitize_name("!!"), "__");
    }

    #[test]
    fn test_sanitize_non_ascii() {
        assert_eq!(sanitize_name("Données Publiques"), "donn_es_publiques");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(150);
        assert_eq!(sanitize_name(&long).len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            /// Property: output only uses the slug alphabet and fits the length bound
            #[test]
            fn prop_output_in_slug_grammar(name in "\\PC{0,300}") {
                let out = sanitize_name(&name);
                prop_assert!(out.chars().count() <= MAX_NAME_LEN);
                prop_assert!(out
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'));
            }

            /// Property: sanitizing twice equals sanitizing once
            #[test]
            fn prop_idempotent(name in "\\PC{0,300}") {
                let once = sanitize_name(&name);
                prop_assert_eq!(sanitize_name(&once), once);
            }
        }
    }
}
