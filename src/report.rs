use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How serious a detected signal is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// What family of risk signal an [`Alert`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// One of the fixed XSS pattern signatures matched
    XssPattern,
    /// An opening tag from the blacklisted tag list matched
    BlacklistedTag,
    /// A URL attribute carried a blacklisted protocol
    DangerousProtocol,
    /// A blacklisted inline event handler attribute was assigned
    InlineEventHandler,
    /// The sanitizer removed a tag outside the allowed set
    DisallowedTag,
    /// The sanitizer removed an attribute outside the allowed set
    DisallowedAttribute,
    /// The sanitizer removed an inline style attribute
    InlineStyle,
}

/// One detected issue. Pure data: produced by a scan or a sanitizer pass,
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    /// Name of the fixed signature that matched (pattern alerts only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Every matched substring, in occurrence order
    pub matches: Vec<String>,
    pub count: usize,
    /// Protocol token that triggered the alert (protocol alerts only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Attribute the offending value was found in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    /// Event handler name (inline handler alerts only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
}

impl Alert {
    pub fn new(kind: AlertKind, severity: Severity, matches: Vec<String>) -> Self {
        let count = matches.len();
        Self {
            kind,
            severity,
            signature: None,
            matches,
            count,
            protocol: None,
            attribute: None,
            handler: None,
        }
    }

    pub fn with_signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    pub fn with_protocol(mut self, protocol: &str, attribute: &str) -> Self {
        self.protocol = Some(protocol.to_string());
        self.attribute = Some(attribute.to_string());
        self
    }

    pub fn with_handler(mut self, handler: &str) -> Self {
        self.handler = Some(handler.to_string());
        self
    }
}

/// Outcome of one read-only scan.
///
/// `safe` is derived from `alerts` at construction and is not independently
/// settable; use [`ScanResult::new`] so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub safe: bool,
    pub alerts: Vec<Alert>,
    pub total_matches: usize,
    pub scanned_length: usize,
}

impl ScanResult {
    pub fn new(alerts: Vec<Alert>, scanned_length: usize) -> Self {
        let total_matches = alerts.iter().map(|a| a.count).sum();
        Self {
            safe: alerts.is_empty(),
            alerts,
            total_matches,
            scanned_length,
        }
    }
}

/// One step of the auto-remediation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationStep {
    StripScripts,
    RemoveInlineStyles,
    ApplyPolicy,
}

impl std::fmt::Display for RemediationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StripScripts => write!(f, "strip_scripts"),
            Self::RemoveInlineStyles => write!(f, "remove_inline_styles"),
            Self::ApplyPolicy => write!(f, "apply_policy"),
        }
    }
}

/// Audit record for one executed remediation step.
///
/// Entries are appended in execution order within a single remediation run
/// and are not persisted anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationLogEntry {
    pub step: RemediationStep,
    pub alerts: Vec<Alert>,
    pub bytes_before: usize,
    pub bytes_after: usize,
    /// How many attributes a removal step stripped, where that differs from
    /// the number of alerts describing why
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_count: Option<usize>,
}

/// How aggressively [`auto_remediate`](crate::auto_remediate) rewrites input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemediationMode {
    #[default]
    Moderate,
    Strict,
}

/// Options for one remediation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemediationOptions {
    pub mode: RemediationMode,
    /// When true (the default), moderate mode keeps inline styles
    pub preserve_content: bool,
}

impl Default for RemediationOptions {
    fn default() -> Self {
        Self {
            mode: RemediationMode::Moderate,
            preserve_content: true,
        }
    }
}

/// Result of a full remediation run: the rewritten HTML plus the audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remediation {
    pub html: String,
    pub mode: RemediationMode,
    pub log: Vec<RemediationLogEntry>,
    pub total_alerts: usize,
    pub bytes_before: usize,
    pub bytes_after: usize,
    /// Size reduction as a percentage string with two decimals; `"0.00"`
    /// for empty input
    pub reduction_percent: String,
}

/// Aggregate security snapshot of one HTML fragment.
///
/// Immutable once constructed; the tag count and URL list are derived from
/// the raw input with their own patterns, separate from the scan alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityReport {
    pub xss: ScanResult,
    pub protocols: ScanResult,
    pub handlers: ScanResult,
    pub dangerous_tag_count: usize,
    pub suspicious_urls: Vec<String>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl SecurityReport {
    /// True when every scan came back clean
    pub fn is_safe(&self) -> bool {
        self.xss.safe && self.protocols.safe && self.handlers.safe
    }

    /// Total alert count across all three scans
    pub fn alert_count(&self) -> usize {
        self.xss.alerts.len() + self.protocols.alerts.len() + self.handlers.alerts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_result_safe_derivation() {
        let clean = ScanResult::new(vec![], 10);
        assert!(clean.safe);
        assert_eq!(clean.total_matches, 0);

        let alert = Alert::new(
            AlertKind::XssPattern,
            Severity::High,
            vec!["<script>".to_string(), "<script>".to_string()],
        );
        let dirty = ScanResult::new(vec![alert], 10);
        assert!(!dirty.safe);
        assert_eq!(dirty.total_matches, 2);
    }

    #[test]
    fn test_alert_count_matches_length() {
        let alert = Alert::new(
            AlertKind::InlineEventHandler,
            Severity::High,
            vec!["onclick=\"x()\"".to_string()],
        )
        .with_handler("onclick");
        assert_eq!(alert.count, 1);
        assert_eq!(alert.handler.as_deref(), Some("onclick"));
    }

    #[test]
    fn test_remediation_options_default() {
        let options = RemediationOptions::default();
        assert_eq!(options.mode, RemediationMode::Moderate);
        assert!(options.preserve_content);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = SecurityReport {
            xss: ScanResult::new(vec![], 0),
            protocols: ScanResult::new(vec![], 0),
            handlers: ScanResult::new(vec![], 0),
            dangerous_tag_count: 0,
            suspicious_urls: vec![],
            recommendations: vec![],
            generated_at: Utc::now(),
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: SecurityReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
