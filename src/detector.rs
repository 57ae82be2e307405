use crate::policy::{PolicyCategory, PolicyKind, PolicySet};
use crate::report::{Alert, AlertKind, ScanResult, Severity};
use regex::Regex;
use std::sync::OnceLock;

/// One entry of the fixed XSS signature battery
struct Signature {
    name: &'static str,
    pattern: &'static str,
}

/// Fixed, ordered signature list. Alert order follows this list.
const XSS_SIGNATURES: &[Signature] = &[
    Signature {
        // Closed blocks and bare unterminated openings both match
        name: "script_block",
        pattern: r"(?is)<script\b[^>]*>(?:.*?</script\s*>)?",
    },
    Signature {
        name: "script_uri",
        pattern: r"(?i)\b(?:javascript|vbscript)\s*:",
    },
    Signature {
        name: "event_handler",
        pattern: r"(?i)\bon\w+\s*=",
    },
    Signature {
        name: "embedded_content",
        pattern: r"(?i)<\s*(?:iframe|object|embed|link|meta)\b",
    },
    Signature {
        name: "css_code",
        pattern: r"(?i)\b(?:expression|url)\s*\(",
    },
    Signature {
        name: "char_reference",
        pattern: r"&#(?:[0-9]+|[xX][0-9a-fA-F]+);?",
    },
];

fn signature_regexes() -> &'static Vec<Regex> {
    static REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        XSS_SIGNATURES
            .iter()
            .map(|s| Regex::new(s.pattern).expect("valid regex"))
            .collect()
    })
}

/// Matches `href`/`src`/`action` attribute assignments and captures the value
/// in whichever quoting style it uses
fn url_attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(href|src|action)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
            .expect("valid regex")
    })
}

/// Protocol token of a URL value: the substring before the first colon,
/// lowercased. No colon means no token.
fn protocol_token(value: &str) -> Option<String> {
    value
        .split_once(':')
        .map(|(scheme, _)| scheme.trim().to_lowercase())
}

/// Read-only scanner classifying raw HTML against the shared policy.
///
/// Holds no mutable state: identical input and policy always produce
/// identical output, independent of call order.
pub struct Detector<'a> {
    policy: &'a PolicySet,
}

impl<'a> Detector<'a> {
    pub fn new(policy: &'a PolicySet) -> Self {
        Self { policy }
    }

    /// Scan against the fixed signature battery plus the blacklisted-tag
    /// list. One alert per matching signature, then one alert collapsing
    /// every blacklisted-tag match.
    pub fn scan_for_xss(&self, html: &str) -> ScanResult {
        let mut alerts = Vec::new();

        for (signature, re) in XSS_SIGNATURES.iter().zip(signature_regexes().iter()) {
            let matches: Vec<String> =
                re.find_iter(html).map(|m| m.as_str().to_string()).collect();
            if !matches.is_empty() {
                alerts.push(
                    Alert::new(AlertKind::XssPattern, Severity::High, matches)
                        .with_signature(signature.name),
                );
            }
        }

        let blacklisted = self.policy.get(PolicyCategory::Tags, PolicyKind::Blacklist);
        if !blacklisted.is_empty() {
            // Alternation is rebuilt from the policy on every call
            let re = blacklist_tag_regex(blacklisted);
            let matches: Vec<String> =
                re.find_iter(html).map(|m| m.as_str().to_string()).collect();
            if !matches.is_empty() {
                alerts.push(Alert::new(
                    AlertKind::BlacklistedTag,
                    Severity::High,
                    matches,
                ));
            }
        }

        ScanResult::new(alerts, html.len())
    }

    /// Flag every `href`/`src`/`action` value whose protocol token is on the
    /// blacklisted-protocol list. One alert per flagged URL occurrence.
    pub fn has_dangerous_protocols(&self, html: &str) -> ScanResult {
        let deny = self
            .policy
            .get(PolicyCategory::Protocols, PolicyKind::Blacklist);
        let mut alerts = Vec::new();

        for caps in url_attribute_regex().captures_iter(html) {
            let attribute = caps[1].to_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or("");
            if let Some(token) = protocol_token(value) {
                if deny.contains(&token) {
                    alerts.push(
                        Alert::new(
                            AlertKind::DangerousProtocol,
                            Severity::High,
                            vec![value.to_string()],
                        )
                        .with_protocol(&token, &attribute),
                    );
                }
            }
        }

        ScanResult::new(alerts, html.len())
    }

    /// Match each blacklisted attribute name as an inline `name="…"` /
    /// `name='…'` assignment. One alert per handler name, aggregating all of
    /// that name's matches.
    pub fn contains_inline_event_handlers(&self, html: &str) -> ScanResult {
        let handlers = self
            .policy
            .get(PolicyCategory::Attributes, PolicyKind::Blacklist);
        let mut alerts = Vec::new();

        for name in handlers {
            let re = handler_regex(name);
            let matches: Vec<String> =
                re.find_iter(html).map(|m| m.as_str().to_string()).collect();
            if !matches.is_empty() {
                alerts.push(
                    Alert::new(AlertKind::InlineEventHandler, Severity::High, matches)
                        .with_handler(name),
                );
            }
        }

        ScanResult::new(alerts, html.len())
    }
}

/// Opening-tag alternation built from the policy's blacklisted tag names
fn blacklist_tag_regex(tags: &[String]) -> Regex {
    let alternation: Vec<String> = tags.iter().map(|t| regex::escape(t)).collect();
    Regex::new(&format!(r"(?i)<\s*(?:{})\b", alternation.join("|"))).expect("valid regex")
}

fn handler_regex(name: &str) -> Regex {
    Regex::new(&format!(
        r#"(?i)\b{}\s*=\s*(?:"[^"]*"|'[^']*')"#,
        regex::escape(name)
    ))
    .expect("valid regex")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PolicySet {
        PolicySet::default()
    }

    #[test]
    fn test_plain_text_is_safe() {
        let policy = policy();
        let detector = Detector::new(&policy);
        let result = detector.scan_for_xss("just some text with no markup");
        assert!(result.safe);
        assert_eq!(result.total_matches, 0);
        assert_eq!(result.scanned_length, 29);
    }

    #[test]
    fn test_script_block_detected() {
        let policy = policy();
        let detector = Detector::new(&policy);
        let result = detector.scan_for_xss("<p>Hi <script>alert(1)</script></p>");
        assert!(!result.safe);
        let script = result
            .alerts
            .iter()
            .find(|a| a.signature.as_deref() == Some("script_block"))
            .expect("script_block alert");
        assert_eq!(script.matches, vec!["<script>alert(1)</script>"]);
        assert_eq!(script.severity, Severity::High);
    }

    #[test]
    fn test_unterminated_script_detected() {
        let policy = policy();
        let detector = Detector::new(&policy);
        let result = detector.scan_for_xss("before <script src=x.js> after");
        assert!(result
            .alerts
            .iter()
            .any(|a| a.signature.as_deref() == Some("script_block")));
    }

    #[test]
    fn test_handler_pattern_and_script_both_alert() {
        let policy = policy();
        let detector = Detector::new(&policy);
        let result =
            detector.scan_for_xss(r#"<p onclick="steal()">Hi <script>x()</script></p>"#);
        // script_block + event_handler signatures at minimum
        assert!(result.alerts.len() >= 2);
        assert!(result
            .alerts
            .iter()
            .any(|a| a.signature.as_deref() == Some("event_handler")));
    }

    #[test]
    fn test_blacklisted_tags_collapse_into_one_alert() {
        let policy = policy();
        let detector = Detector::new(&policy);
        let result = detector.scan_for_xss("<iframe></iframe><object></object>");
        let tag_alerts: Vec<_> = result
            .alerts
            .iter()
            .filter(|a| a.kind == AlertKind::BlacklistedTag)
            .collect();
        assert_eq!(tag_alerts.len(), 1);
        assert_eq!(tag_alerts[0].count, 2);
    }

    #[test]
    fn test_javascript_protocol_flagged() {
        let policy = policy();
        let detector = Detector::new(&policy);
        let result =
            detector.has_dangerous_protocols(r#"<a href="JavaScript:alert(1)">x</a>"#);
        assert!(!result.safe);
        assert_eq!(result.alerts[0].protocol.as_deref(), Some("javascript"));
        assert_eq!(result.alerts[0].attribute.as_deref(), Some("href"));
    }

    #[test]
    fn test_relative_url_has_no_protocol_token() {
        let policy = policy();
        let detector = Detector::new(&policy);
        let result = detector.has_dangerous_protocols(r#"<a href="/relative/path">x</a>"#);
        assert!(result.safe);
    }

    #[test]
    fn test_https_protocol_allowed() {
        let policy = policy();
        let detector = Detector::new(&policy);
        let result = detector.has_dangerous_protocols(r#"<img src='https://a.example/x.png'>"#);
        assert!(result.safe);
    }

    #[test]
    fn test_unquoted_url_value() {
        let policy = policy();
        let detector = Detector::new(&policy);
        let result = detector.has_dangerous_protocols("<a href=javascript:alert(1)>x</a>");
        assert!(!result.safe);
    }

    #[test]
    fn test_inline_handlers_aggregate_per_name() {
        let policy = policy();
        let detector = Detector::new(&policy);
        let html = r#"<a onclick="a()">1</a><b onclick='b()'>2</b><i onerror="c()">3</i>"#;
        let result = detector.contains_inline_event_handlers(html);
        assert_eq!(result.alerts.len(), 2);
        let onclick = result
            .alerts
            .iter()
            .find(|a| a.handler.as_deref() == Some("onclick"))
            .unwrap();
        assert_eq!(onclick.count, 2);
    }

    #[test]
    fn test_scans_are_deterministic() {
        let policy = policy();
        let detector = Detector::new(&policy);
        let html = r#"<iframe onload="x()"></iframe>"#;
        let first = detector.scan_for_xss(html);
        let second = detector.scan_for_xss(html);
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_blacklist_drives_tag_scan() {
        let yaml = "blacklist:\n  tags:\n    - marquee\n";
        let policy = PolicySet::from_yaml(yaml);
        let detector = Detector::new(&policy);
        let result = detector.scan_for_xss("<marquee>hi</marquee><script>x</script>");
        let tag_alert = result
            .alerts
            .iter()
            .find(|a| a.kind == AlertKind::BlacklistedTag)
            .unwrap();
        assert_eq!(tag_alert.matches, vec!["<marquee"]);
    }

    #[test]
    fn test_char_reference_signature() {
        let policy = policy();
        let detector = Detector::new(&policy);
        let result = detector.scan_for_xss("&#106;&#x61;vascript");
        assert!(result
            .alerts
            .iter()
            .any(|a| a.signature.as_deref() == Some("char_reference")));
    }
}
