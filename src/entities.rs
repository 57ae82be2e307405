use crate::generated::entities::NAMED_ENTITIES;
use crate::policy::PolicySet;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Matches a complete character reference: `&name;`, `&#123;`, or `&#x1F;`
fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(?:#(?:[0-9]+|[xX][0-9a-fA-F]+)|[a-zA-Z][a-zA-Z0-9]*);").expect("valid regex")
    })
}

/// Look up a named reference (no `&`/`;`) in the bundled table
pub fn lookup(name: &str) -> Option<&'static str> {
    NAMED_ENTITIES
        .binary_search_by_key(&name, |&(n, _)| n)
        .ok()
        .map(|i| NAMED_ENTITIES[i].1)
}

/// Replace character references with their decoded characters so obfuscated
/// payloads normalize before scanning or display.
///
/// Named references resolve through the policy's `entities` overrides first,
/// then the bundled table. Unknown references and unrepresentable numeric
/// references pass through unchanged.
pub fn strip_entities(html: &str, policy: &PolicySet) -> String {
    entity_regex()
        .replace_all(html, |caps: &Captures| {
            let whole = &caps[0];
            let body = &whole[1..whole.len() - 1];
            if let Some(number) = body.strip_prefix('#') {
                let code = match number.strip_prefix(|c: char| c == 'x' || c == 'X') {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => number.parse::<u32>().ok(),
                };
                match code.and_then(char::from_u32) {
                    Some(ch) if ch != '\0' => ch.to_string(),
                    _ => whole.to_string(),
                }
            } else if let Some(replacement) = policy.entity_overrides().get(body) {
                replacement.clone()
            } else if let Some(replacement) = lookup(body) {
                replacement.to_string()
            } else {
                whole.to_string()
            }
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_for_binary_search() {
        for pair in NAMED_ENTITIES.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn test_named_decoding() {
        let policy = PolicySet::default();
        assert_eq!(strip_entities("&lt;script&gt;", &policy), "<script>");
        assert_eq!(strip_entities("a &amp; b", &policy), "a & b");
        assert_eq!(strip_entities("&copy; 2024", &policy), "\u{00A9} 2024");
    }

    #[test]
    fn test_numeric_decoding() {
        let policy = PolicySet::default();
        assert_eq!(strip_entities("&#65;&#66;", &policy), "AB");
        assert_eq!(strip_entities("&#x41;&#X42;", &policy), "AB");
    }

    #[test]
    fn test_unknown_reference_passes_through() {
        let policy = PolicySet::default();
        assert_eq!(strip_entities("&nope;", &policy), "&nope;");
        // Missing semicolon never matches
        assert_eq!(strip_entities("&amp stop", &policy), "&amp stop");
    }

    #[test]
    fn test_invalid_codepoint_passes_through() {
        let policy = PolicySet::default();
        assert_eq!(strip_entities("&#x110000;", &policy), "&#x110000;");
        assert_eq!(strip_entities("&#0;", &policy), "&#0;");
    }

    #[test]
    fn test_policy_override_wins_over_table() {
        let yaml = "entities:\n  copy: \"(c)\"\n";
        let policy = PolicySet::from_yaml(yaml);
        assert_eq!(strip_entities("&copy;", &policy), "(c)");
    }

    #[test]
    fn test_attribute_encoding_round_trip() {
        let policy = PolicySet::default();
        let original = "a<b>&\"c'\td\ne\rf";
        let encoded = crate::encoder::encode_for_attribute(original);
        assert_eq!(strip_entities(&encoded, &policy), original);
    }
}
