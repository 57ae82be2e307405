//! # tagsafe — HTML injection scanning and policy-driven sanitization
//!
//! Scans untrusted HTML fragments for injection risk and neutralizes it
//! before storage or rendering, for server-side or build-time content
//! pipelines.
//!
//! ## Features
//! - Pattern-based threat detection (script blocks, dangerous protocols,
//!   inline event handlers) producing structured alerts
//! - Policy-driven tag/attribute/protocol filtering with whitelist,
//!   blacklist, and strict-mode tiers, overridable from a YAML file
//! - Multi-step auto-remediation with a per-step audit log
//! - Context-specific output encoding for HTML-attribute, CSS, and
//!   script-string contexts
//!
//! Detection is best-effort text matching, not HTML parsing: there is no DOM,
//! so tag boundaries under heavily malformed markup are approximate.
//!
//! ## Example — scan and remediate
//! ```ignore
//! use tagsafe::{auto_remediate, scan_for_xss, RemediationOptions};
//!
//! let html = r#"<p onclick="steal()">Hi <script>x()</script></p>"#;
//!
//! let scan = scan_for_xss(html);
//! assert!(!scan.safe);
//!
//! let fixed = auto_remediate(html, RemediationOptions::default());
//! assert_eq!(fixed.html, "<p>Hi </p>");
//! ```
//!
//! ## Example — custom policy
//! ```ignore
//! use tagsafe::{Analyzer, PolicySet};
//!
//! let policy = PolicySet::from_yaml("blacklist:\n  tags: [marquee]\n");
//! let analyzer = Analyzer::new(&policy);
//! let report = analyzer.security_report("<marquee>hi</marquee>");
//! ```

pub mod analyzer;
pub mod detector;
pub mod encoder;
pub mod entities;
pub mod error;
pub mod generated;
pub mod policy;
pub mod report;
pub mod sanitizer;

// --- Core types ---
pub use analyzer::Analyzer;
pub use detector::Detector;
pub use error::{TagsafeError, TagsafeResult};
pub use policy::{CategoryOverride, PolicyCategory, PolicyKind, PolicyOverride, PolicySet};
pub use report::{
    Alert, AlertKind, Remediation, RemediationLogEntry, RemediationMode, RemediationOptions,
    RemediationStep, ScanResult, SecurityReport, Severity,
};
pub use sanitizer::{AllowPolicy, PolicyOutcome, Sanitizer, StripOutcome, StyleOutcome};

// --- Encoders ---
pub use encoder::{encode_for_attribute, encode_for_css, encode_for_script_string};

use std::sync::OnceLock;

/// Process-wide default policy, shared by the convenience functions below.
/// Callers with a custom policy construct [`Detector`] / [`Sanitizer`] /
/// [`Analyzer`] against their own [`PolicySet`].
fn default_policy() -> &'static PolicySet {
    static POLICY: OnceLock<PolicySet> = OnceLock::new();
    POLICY.get_or_init(PolicySet::default)
}

/// Scan against the fixed XSS signature battery and the default blacklist
pub fn scan_for_xss(html: &str) -> ScanResult {
    Detector::new(default_policy()).scan_for_xss(html)
}

/// Flag URL attributes carrying blacklisted protocols
pub fn has_dangerous_protocols(html: &str) -> ScanResult {
    Detector::new(default_policy()).has_dangerous_protocols(html)
}

/// Flag blacklisted inline event handler assignments
pub fn contains_inline_event_handlers(html: &str) -> ScanResult {
    Detector::new(default_policy()).contains_inline_event_handlers(html)
}

/// True when all three scans come back clean
pub fn is_safe_html(html: &str) -> bool {
    let detector = Detector::new(default_policy());
    detector.scan_for_xss(html).safe
        && detector.has_dangerous_protocols(html).safe
        && detector.contains_inline_event_handlers(html).safe
}

/// Strip script blocks, then apply the default whitelist policy
pub fn sanitize_html(html: &str) -> PolicyOutcome {
    Sanitizer::new(default_policy()).sanitize_html(html)
}

/// Sanitize under the default strict-mode lists
pub fn sanitize_strict(html: &str) -> PolicyOutcome {
    Sanitizer::new(default_policy()).sanitize_strict(html)
}

/// Sanitize under an explicit allow policy
pub fn sanitize_with_policy(html: &str, policy: &AllowPolicy) -> PolicyOutcome {
    Sanitizer::new(default_policy()).sanitize_with_policy(html, policy)
}

/// Remove every `<script>` block (closed or unterminated)
pub fn strip_scripts(html: &str) -> StripOutcome {
    Sanitizer::new(default_policy()).strip_scripts(html)
}

/// Decode character references (named, numeric, hex) using the bundled table
pub fn strip_entities(html: &str) -> String {
    entities::strip_entities(html, default_policy())
}

/// True when the fragment already conforms to the default whitelist policy
pub fn is_html_safe_subset(html: &str) -> bool {
    Sanitizer::new(default_policy()).is_html_safe_subset(html)
}

/// Aggregate security report over the default policy
pub fn security_report(html: &str) -> SecurityReport {
    Analyzer::new(default_policy()).security_report(html)
}

/// Run the three-step remediation pipeline over the default policy
pub fn auto_remediate(html: &str, options: RemediationOptions) -> Remediation {
    Analyzer::new(default_policy()).auto_remediate(html, options)
}
