use crate::policy::{PolicyCategory, PolicyKind, PolicySet};
use crate::report::{Alert, AlertKind, Severity};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

fn closed_script_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"))
}

/// An opening with no matching close swallows the rest of the input; the
/// tail would otherwise stay executable
fn open_script_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script\b[^>]*>.*$").expect("valid regex"))
}

fn style_attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\s+style\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).expect("valid regex")
    })
}

/// Any tag, opening or closing; group 1 is the tag name
fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</?([a-zA-Z][a-zA-Z0-9]*)[^>]*>").expect("valid regex"))
}

/// Opening tags only; group 1 is the name, group 2 the raw attribute run
fn opening_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<([a-zA-Z][a-zA-Z0-9]*)([^>]*)>").expect("valid regex"))
}

/// One attribute inside a tag: either `name=value` (any quoting) or a bare
/// boolean name
fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"([a-zA-Z][a-zA-Z0-9:_-]*)\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)|([a-zA-Z][a-zA-Z0-9:_-]*)"#,
        )
        .expect("valid regex")
    })
}

/// The effective allow policy one sanitization pass runs under, echoed back
/// in its outcome for auditability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowPolicy {
    pub allowed_tags: Vec<String>,
    pub allowed_attributes: Vec<String>,
}

/// Result of [`Sanitizer::strip_scripts`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripOutcome {
    pub stripped: String,
    pub alerts: Vec<Alert>,
}

/// Result of [`Sanitizer::remove_inline_styles`].
///
/// `removed_count` counts stripped attributes; `alerts` describes why they
/// were stripped. The two are independent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleOutcome {
    pub cleaned: String,
    pub alerts: Vec<Alert>,
    pub removed_count: usize,
}

/// Result of [`Sanitizer::sanitize_with_policy`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyOutcome {
    pub sanitized: String,
    pub alerts: Vec<Alert>,
    pub policy: AllowPolicy,
}

/// Policy-driven destructive rewriting of untrusted HTML.
///
/// Every operation is a pure text-to-text transform: same input and policy,
/// same output. Nothing here reads or writes outside the given string.
pub struct Sanitizer<'a> {
    policy: &'a PolicySet,
}

impl<'a> Sanitizer<'a> {
    pub fn new(policy: &'a PolicySet) -> Self {
        Self { policy }
    }

    /// Remove every `<script>…</script>` block, plus any bare `<script…>`
    /// opening with no matching close (unterminated block, removed to end of
    /// input).
    pub fn strip_scripts(&self, html: &str) -> StripOutcome {
        let mut matches: Vec<String> = closed_script_regex()
            .find_iter(html)
            .map(|m| m.as_str().to_string())
            .collect();
        let stripped = closed_script_regex().replace_all(html, "").to_string();

        let stripped = match open_script_regex().find(&stripped) {
            Some(m) => {
                matches.push(m.as_str().to_string());
                stripped[..m.start()].to_string()
            }
            None => stripped,
        };

        let alerts = if matches.is_empty() {
            Vec::new()
        } else {
            vec![
                Alert::new(AlertKind::XssPattern, Severity::High, matches)
                    .with_signature("script_block"),
            ]
        };
        StripOutcome { stripped, alerts }
    }

    /// Strip every `style="…"` / `style='…'` attribute
    pub fn remove_inline_styles(&self, html: &str) -> StyleOutcome {
        let matches: Vec<String> = style_attribute_regex()
            .find_iter(html)
            .map(|m| m.as_str().trim_start().to_string())
            .collect();
        let removed_count = matches.len();
        let cleaned = style_attribute_regex().replace_all(html, "").to_string();

        let alerts = if matches.is_empty() {
            Vec::new()
        } else {
            vec![Alert::new(AlertKind::InlineStyle, Severity::Medium, matches)]
        };
        StyleOutcome {
            cleaned,
            alerts,
            removed_count,
        }
    }

    /// Remove every tag not in `allowed_tags` (keeping its text content) and
    /// every attribute not in `allowed_attributes`, echoing the effective
    /// policy back in the outcome.
    pub fn sanitize_with_policy(&self, html: &str, policy: &AllowPolicy) -> PolicyOutcome {
        let allowed_tags: HashSet<String> =
            policy.allowed_tags.iter().map(|t| t.to_lowercase()).collect();
        let allowed_attributes: HashSet<String> = policy
            .allowed_attributes
            .iter()
            .map(|a| a.to_lowercase())
            .collect();

        // Pass 1: drop disallowed tags, keep their inner text
        let mut removed_tags: Vec<(String, Vec<String>)> = Vec::new();
        let tag_filtered = tag_regex().replace_all(html, |caps: &Captures| {
            let name = caps[1].to_lowercase();
            if allowed_tags.contains(&name) {
                caps[0].to_string()
            } else {
                match removed_tags.iter_mut().find(|(n, _)| n == &name) {
                    Some((_, literals)) => literals.push(caps[0].to_string()),
                    None => removed_tags.push((name, vec![caps[0].to_string()])),
                }
                String::new()
            }
        });

        // Pass 2: rewrite surviving opening tags with only allowed attributes
        let mut removed_attrs: Vec<(String, Vec<String>)> = Vec::new();
        let sanitized = opening_tag_regex()
            .replace_all(&tag_filtered, |caps: &Captures| {
                let name = &caps[1];
                let attr_run = &caps[2];
                let self_closing = attr_run.trim_end().ends_with('/');

                let mut kept = String::new();
                for attr in attribute_regex().captures_iter(attr_run) {
                    let attr_name = attr
                        .get(1)
                        .or_else(|| attr.get(3))
                        .map(|m| m.as_str())
                        .unwrap_or("");
                    if attr_name.is_empty() {
                        continue;
                    }
                    let lower = attr_name.to_lowercase();
                    if allowed_attributes.contains(&lower) {
                        kept.push(' ');
                        kept.push_str(attr.get(0).map(|m| m.as_str()).unwrap_or(""));
                    } else {
                        let literal = attr.get(0).map(|m| m.as_str().to_string()).unwrap_or_default();
                        match removed_attrs.iter_mut().find(|(n, _)| n == &lower) {
                            Some((_, literals)) => literals.push(literal),
                            None => removed_attrs.push((lower, vec![literal])),
                        }
                    }
                }

                if self_closing {
                    format!("<{}{} />", name, kept)
                } else {
                    format!("<{}{}>", name, kept)
                }
            })
            .to_string();

        let mut alerts = Vec::new();
        for (name, literals) in removed_tags {
            alerts.push(
                Alert::new(AlertKind::DisallowedTag, Severity::Medium, literals)
                    .with_signature(&name),
            );
        }
        for (name, literals) in removed_attrs {
            let mut alert = Alert::new(AlertKind::DisallowedAttribute, Severity::Medium, literals);
            alert.attribute = Some(name);
            alerts.push(alert);
        }

        PolicyOutcome {
            sanitized,
            alerts,
            policy: policy.clone(),
        }
    }

    /// Whitelist policy drawn from the shared store
    pub fn whitelist_policy(&self) -> AllowPolicy {
        AllowPolicy {
            allowed_tags: self
                .policy
                .get(PolicyCategory::Tags, PolicyKind::Whitelist)
                .to_vec(),
            allowed_attributes: self
                .policy
                .get(PolicyCategory::Attributes, PolicyKind::Whitelist)
                .to_vec(),
        }
    }

    /// Strict-mode policy drawn from the shared store
    pub fn strict_policy(&self) -> AllowPolicy {
        AllowPolicy {
            allowed_tags: self
                .policy
                .get(PolicyCategory::Tags, PolicyKind::StrictMode)
                .to_vec(),
            allowed_attributes: self
                .policy
                .get(PolicyCategory::Attributes, PolicyKind::StrictMode)
                .to_vec(),
        }
    }

    /// Sanitize under the strict-mode tag/attribute lists
    pub fn sanitize_strict(&self, html: &str) -> PolicyOutcome {
        self.sanitize_with_policy(html, &self.strict_policy())
    }

    /// General-purpose cleanup: strip script blocks, then apply the
    /// whitelist policy
    pub fn sanitize_html(&self, html: &str) -> PolicyOutcome {
        let scripts = self.strip_scripts(html);
        let mut outcome = self.sanitize_with_policy(&scripts.stripped, &self.whitelist_policy());
        let mut alerts = scripts.alerts;
        alerts.append(&mut outcome.alerts);
        outcome.alerts = alerts;
        outcome
    }

    /// True when the fragment already conforms to the whitelist policy, i.e.
    /// sanitizing it would change nothing
    pub fn is_html_safe_subset(&self, html: &str) -> bool {
        self.sanitize_with_policy(html, &self.whitelist_policy())
            .sanitized
            == html
    }
}
