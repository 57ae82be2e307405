use crate::detector::Detector;
use crate::policy::{PolicyCategory, PolicyKind, PolicySet};
use crate::report::{
    Remediation, RemediationLogEntry, RemediationMode, RemediationOptions, RemediationStep,
    SecurityReport,
};
use crate::sanitizer::Sanitizer;
use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;

/// The analyzer's own URL extraction, kept separate from the detector's
/// protocol scan (the report derives its counts independently)
fn report_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:href|src|action)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
            .expect("valid regex")
    })
}

/// Composes the detector and the sanitizer into reporting and
/// auto-remediation entry points against one shared policy.
pub struct Analyzer<'a> {
    policy: &'a PolicySet,
    detector: Detector<'a>,
    sanitizer: Sanitizer<'a>,
}

impl<'a> Analyzer<'a> {
    pub fn new(policy: &'a PolicySet) -> Self {
        Self {
            policy,
            detector: Detector::new(policy),
            sanitizer: Sanitizer::new(policy),
        }
    }

    /// Aggregate security snapshot: all three scans plus report-specific
    /// derived counts and one recommendation per unsafe category. Pure read;
    /// the input is never modified.
    pub fn security_report(&self, html: &str) -> SecurityReport {
        let xss = self.detector.scan_for_xss(html);
        let protocols = self.detector.has_dangerous_protocols(html);
        let handlers = self.detector.contains_inline_event_handlers(html);

        let dangerous_tag_count = self.count_dangerous_tags(html);
        let suspicious_urls = self.collect_suspicious_urls(html);

        let mut recommendations = Vec::new();
        if !xss.safe {
            recommendations
                .push("Strip or encode script content before rendering this fragment.".to_string());
        }
        if !protocols.safe {
            recommendations
                .push("Rewrite or drop links that use blacklisted protocols.".to_string());
        }
        if !handlers.safe {
            recommendations.push(
                "Remove inline event handler attributes or sanitize with the whitelist policy."
                    .to_string(),
            );
        }

        SecurityReport {
            xss,
            protocols,
            handlers,
            dangerous_tag_count,
            suspicious_urls,
            recommendations,
            generated_at: Utc::now(),
        }
    }

    /// Count opening tags from the blacklist, independent of the detector's
    /// alert objects
    fn count_dangerous_tags(&self, html: &str) -> usize {
        let tags = self.policy.get(PolicyCategory::Tags, PolicyKind::Blacklist);
        if tags.is_empty() {
            return 0;
        }
        let alternation: Vec<String> = tags.iter().map(|t| regex::escape(t)).collect();
        let re = Regex::new(&format!(r"(?i)<\s*(?:{})\b", alternation.join("|")))
            .expect("valid regex");
        re.find_iter(html).count()
    }

    /// Every URL attribute value whose protocol token is blacklisted, in
    /// occurrence order
    fn collect_suspicious_urls(&self, html: &str) -> Vec<String> {
        let deny = self
            .policy
            .get(PolicyCategory::Protocols, PolicyKind::Blacklist);
        let mut urls = Vec::new();
        for caps in report_url_regex().captures_iter(html) {
            let value = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or("");
            if let Some((scheme, _)) = value.split_once(':') {
                if deny.contains(&scheme.trim().to_lowercase()) {
                    urls.push(value.to_string());
                }
            }
        }
        urls
    }

    /// Sequential three-step remediation pipeline with a per-step audit log.
    ///
    /// 1. Strip scripts — always.
    /// 2. Remove inline styles — when `preserve_content` is false or the
    ///    mode is strict.
    /// 3. Apply policy sanitization — strict-mode lists under
    ///    [`RemediationMode::Strict`], whitelist lists otherwise.
    ///
    /// Each step feeds the next; there is no rollback.
    pub fn auto_remediate(&self, html: &str, options: RemediationOptions) -> Remediation {
        let bytes_before = html.len();
        let mut log: Vec<RemediationLogEntry> = Vec::new();

        let before = html.len();
        let scripts = self.sanitizer.strip_scripts(html);
        tracing::debug!(
            step = %RemediationStep::StripScripts,
            removed = before - scripts.stripped.len(),
            "remediation step"
        );
        log.push(RemediationLogEntry {
            step: RemediationStep::StripScripts,
            alerts: scripts.alerts,
            bytes_before: before,
            bytes_after: scripts.stripped.len(),
            removed_count: None,
        });
        let mut current = scripts.stripped;

        if !options.preserve_content || options.mode == RemediationMode::Strict {
            let before = current.len();
            let styles = self.sanitizer.remove_inline_styles(&current);
            tracing::debug!(
                step = %RemediationStep::RemoveInlineStyles,
                removed = styles.removed_count,
                "remediation step"
            );
            log.push(RemediationLogEntry {
                step: RemediationStep::RemoveInlineStyles,
                alerts: styles.alerts,
                bytes_before: before,
                bytes_after: styles.cleaned.len(),
                removed_count: Some(styles.removed_count),
            });
            current = styles.cleaned;
        }

        let allow = match options.mode {
            RemediationMode::Strict => self.sanitizer.strict_policy(),
            RemediationMode::Moderate => self.sanitizer.whitelist_policy(),
        };
        let before = current.len();
        let outcome = self.sanitizer.sanitize_with_policy(&current, &allow);
        tracing::debug!(
            step = %RemediationStep::ApplyPolicy,
            alerts = outcome.alerts.len(),
            "remediation step"
        );
        log.push(RemediationLogEntry {
            step: RemediationStep::ApplyPolicy,
            alerts: outcome.alerts,
            bytes_before: before,
            bytes_after: outcome.sanitized.len(),
            removed_count: None,
        });

        let html_out = outcome.sanitized;
        let bytes_after = html_out.len();
        Remediation {
            total_alerts: log.iter().map(|entry| entry.alerts.len()).sum(),
            reduction_percent: reduction_percent(bytes_before, bytes_after),
            html: html_out,
            mode: options.mode,
            log,
            bytes_before,
            bytes_after,
        }
    }
}

/// `(before - after) / before * 100`, two decimals; empty input is the
/// defined `"0.00"` case, never a division error
fn reduction_percent(before: usize, after: usize) -> String {
    if before == 0 {
        return "0.00".to_string();
    }
    let reduction = (before.saturating_sub(after)) as f64 / before as f64 * 100.0;
    format!("{:.2}", reduction)
}
