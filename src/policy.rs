use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Which token list a [`PolicySet`] lookup targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyCategory {
    Tags,
    Attributes,
    Protocols,
}

/// Which policy tier a [`PolicySet`] lookup targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyKind {
    Whitelist,
    Blacklist,
    StrictMode,
}

// ─── Built-in defaults ───────────────────────────────────────────────────────

const DEFAULT_WHITELIST_TAGS: &[&str] = &[
    "p", "br", "strong", "em", "b", "i", "u", "ul", "ol", "li", "a", "img", "h1", "h2", "h3",
    "h4", "h5", "h6", "blockquote", "code", "pre", "span", "div", "table", "thead", "tbody",
    "tr", "th", "td", "hr",
];

const DEFAULT_WHITELIST_ATTRIBUTES: &[&str] = &[
    "href", "src", "alt", "title", "class", "id", "style", "width", "height",
];

const DEFAULT_WHITELIST_PROTOCOLS: &[&str] = &["http", "https", "mailto", "tel"];

const DEFAULT_BLACKLIST_TAGS: &[&str] = &[
    "script", "iframe", "object", "embed", "form", "link", "meta", "style", "base", "applet",
];

const DEFAULT_BLACKLIST_ATTRIBUTES: &[&str] = &[
    "onclick",
    "ondblclick",
    "onerror",
    "onload",
    "onunload",
    "onmouseover",
    "onmouseout",
    "onmousedown",
    "onmouseup",
    "onfocus",
    "onblur",
    "onchange",
    "onsubmit",
    "onkeydown",
    "onkeypress",
    "onkeyup",
];

const DEFAULT_BLACKLIST_PROTOCOLS: &[&str] = &["javascript", "vbscript", "data", "file", "about"];

const DEFAULT_STRICT_TAGS: &[&str] = &["p", "br", "strong", "em", "b", "i", "u"];

const DEFAULT_STRICT_ATTRIBUTES: &[&str] = &["title"];

const DEFAULT_STRICT_PROTOCOLS: &[&str] = &["https"];

// ─── Override document (the YAML shape users supply) ─────────────────────────

/// Partial per-category override for one policy tier.
///
/// A list that is present replaces the built-in list for that category
/// wholesale; an absent list keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Vec<String>>,
}

/// Top-level policy override document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<CategoryOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blacklist: Option<CategoryOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_mode: Option<CategoryOverride>,
    /// Extra named character references (name without `&`/`;` → replacement),
    /// merged over the bundled table by `strip_entities`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<HashMap<String, String>>,
}

// ─── Policy store ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CategorySet {
    tags: Vec<String>,
    attributes: Vec<String>,
    protocols: Vec<String>,
}

impl CategorySet {
    fn from_defaults(tags: &[&str], attributes: &[&str], protocols: &[&str]) -> Self {
        Self {
            tags: normalize(tags.iter().map(|s| s.to_string())),
            attributes: normalize(attributes.iter().map(|s| s.to_string())),
            protocols: normalize(protocols.iter().map(|s| s.to_string())),
        }
    }

    fn apply(&mut self, over: &CategoryOverride) {
        if let Some(ref tags) = over.tags {
            self.tags = normalize(tags.iter().cloned());
        }
        if let Some(ref attributes) = over.attributes {
            self.attributes = normalize(attributes.iter().cloned());
        }
        if let Some(ref protocols) = over.protocols {
            self.protocols = normalize(protocols.iter().cloned());
        }
    }

    fn list(&self, category: PolicyCategory) -> &[String] {
        match category {
            PolicyCategory::Tags => &self.tags,
            PolicyCategory::Attributes => &self.attributes,
            PolicyCategory::Protocols => &self.protocols,
        }
    }
}

/// Lowercase and deduplicate, preserving first-occurrence order
fn normalize(tokens: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for token in tokens {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            continue;
        }
        if seen.insert(token.clone()) {
            out.push(token);
        }
    }
    out
}

/// The allow/deny policy shared by the detector and the sanitizer.
///
/// Constructed once (from built-in defaults, optionally overlaid by a YAML
/// override document), then read-shared for the lifetime of a scanning
/// session. Construction never fails: a malformed or unreadable override
/// falls back to the defaults and records a warning instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySet {
    whitelist: CategorySet,
    blacklist: CategorySet,
    strict_mode: CategorySet,
    entities: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

impl Default for PolicySet {
    fn default() -> Self {
        Self {
            whitelist: CategorySet::from_defaults(
                DEFAULT_WHITELIST_TAGS,
                DEFAULT_WHITELIST_ATTRIBUTES,
                DEFAULT_WHITELIST_PROTOCOLS,
            ),
            blacklist: CategorySet::from_defaults(
                DEFAULT_BLACKLIST_TAGS,
                DEFAULT_BLACKLIST_ATTRIBUTES,
                DEFAULT_BLACKLIST_PROTOCOLS,
            ),
            strict_mode: CategorySet::from_defaults(
                DEFAULT_STRICT_TAGS,
                DEFAULT_STRICT_ATTRIBUTES,
                DEFAULT_STRICT_PROTOCOLS,
            ),
            entities: HashMap::new(),
            warning: None,
        }
    }
}

impl PolicySet {
    /// Built-in default policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with a structured override
    pub fn with_overrides(over: &PolicyOverride) -> Self {
        let mut set = Self::default();
        if let Some(ref w) = over.whitelist {
            set.whitelist.apply(w);
        }
        if let Some(ref b) = over.blacklist {
            set.blacklist.apply(b);
        }
        if let Some(ref s) = over.strict_mode {
            set.strict_mode.apply(s);
        }
        if let Some(ref entities) = over.entities {
            set.entities = entities.clone();
        }
        set
    }

    /// Parse a YAML override document.
    ///
    /// A parse failure falls back to the built-in defaults; the failure is
    /// recorded on [`PolicySet::warning`] and logged, never raised.
    pub fn from_yaml(yaml: &str) -> Self {
        match serde_yaml::from_str::<PolicyOverride>(yaml) {
            Ok(over) => Self::with_overrides(&over),
            Err(err) => {
                let warning = format!("policy override ignored: {}", err);
                tracing::warn!(error = %err, "malformed policy override, using defaults");
                Self {
                    warning: Some(warning),
                    ..Self::default()
                }
            }
        }
    }

    /// Load a YAML override file.
    ///
    /// An unreadable file behaves like a malformed one: defaults plus a
    /// warning. Policy load failure must never block sanitization.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(&content),
            Err(err) => {
                let warning = format!("policy file '{}' ignored: {}", path.display(), err);
                tracing::warn!(path = %path.display(), error = %err, "unreadable policy file, using defaults");
                Self {
                    warning: Some(warning),
                    ..Self::default()
                }
            }
        }
    }

    /// Token list for a (category, kind) pair.
    ///
    /// Every combination is defined; an empty policy list yields an empty
    /// slice, never an error.
    pub fn get(&self, category: PolicyCategory, kind: PolicyKind) -> &[String] {
        match kind {
            PolicyKind::Whitelist => self.whitelist.list(category),
            PolicyKind::Blacklist => self.blacklist.list(category),
            PolicyKind::StrictMode => self.strict_mode.list(category),
        }
    }

    /// Named-entity overrides from the config (name → replacement)
    pub fn entity_overrides(&self) -> &HashMap<String, String> {
        &self.entities
    }

    /// Warning recorded when override loading fell back to defaults
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_lowercase_and_deduplicated() {
        let policy = PolicySet::default();
        for &category in &[
            PolicyCategory::Tags,
            PolicyCategory::Attributes,
            PolicyCategory::Protocols,
        ] {
            for &kind in &[
                PolicyKind::Whitelist,
                PolicyKind::Blacklist,
                PolicyKind::StrictMode,
            ] {
                let list = policy.get(category, kind);
                for token in list {
                    assert_eq!(token, &token.to_lowercase());
                }
                let unique: std::collections::HashSet<_> = list.iter().collect();
                assert_eq!(unique.len(), list.len());
            }
        }
    }

    #[test]
    fn test_override_replaces_single_list_only() {
        let over = PolicyOverride {
            blacklist: Some(CategoryOverride {
                tags: Some(vec!["custom".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let policy = PolicySet::with_overrides(&over);
        assert_eq!(
            policy.get(PolicyCategory::Tags, PolicyKind::Blacklist),
            &["custom".to_string()]
        );
        // Sibling lists keep the built-in defaults
        assert!(policy
            .get(PolicyCategory::Attributes, PolicyKind::Blacklist)
            .contains(&"onclick".to_string()));
        assert!(policy
            .get(PolicyCategory::Protocols, PolicyKind::Blacklist)
            .contains(&"javascript".to_string()));
    }

    #[test]
    fn test_override_tokens_normalized() {
        let over = PolicyOverride {
            whitelist: Some(CategoryOverride {
                tags: Some(vec!["P".to_string(), " p ".to_string(), "Div".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let policy = PolicySet::with_overrides(&over);
        assert_eq!(
            policy.get(PolicyCategory::Tags, PolicyKind::Whitelist),
            &["p".to_string(), "div".to_string()]
        );
    }

    #[test]
    fn test_malformed_yaml_falls_back_with_warning() {
        let policy = PolicySet::from_yaml(":: this is not: [valid, yaml");
        assert!(policy.warning().is_some());
        assert_eq!(
            policy.get(PolicyCategory::Tags, PolicyKind::Blacklist),
            PolicySet::default().get(PolicyCategory::Tags, PolicyKind::Blacklist)
        );
    }

    #[test]
    fn test_valid_yaml_override() {
        let yaml = "blacklist:\n  tags:\n    - marquee\n    - blink\n";
        let policy = PolicySet::from_yaml(yaml);
        assert!(policy.warning().is_none());
        assert_eq!(
            policy.get(PolicyCategory::Tags, PolicyKind::Blacklist),
            &["marquee".to_string(), "blink".to_string()]
        );
    }

    #[test]
    fn test_missing_file_falls_back_with_warning() {
        let policy = PolicySet::from_file("/nonexistent/policy.yaml");
        assert!(policy.warning().is_some());
        assert_eq!(
            policy.get(PolicyCategory::Tags, PolicyKind::Whitelist),
            PolicySet::default().get(PolicyCategory::Tags, PolicyKind::Whitelist)
        );
    }

    #[test]
    fn test_entity_overrides() {
        let yaml = "entities:\n  widearrow: \"\\u2192\"\n";
        let policy = PolicySet::from_yaml(yaml);
        assert_eq!(
            policy.entity_overrides().get("widearrow").map(String::as_str),
            Some("\u{2192}")
        );
    }
}
