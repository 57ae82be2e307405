use std::env;
use std::fs;
use std::process;

use tagsafe::{
    Analyzer, PolicySet, Remediation, RemediationMode, RemediationOptions, SecurityReport,
    TagsafeError, TagsafeResult,
};
use tracing_subscriber::EnvFilter;

struct Options {
    config: Option<String>,
    json: bool,
    remediate: bool,
    strict: bool,
    strip_styles: bool,
    files: Vec<String>,
}

fn usage() -> ! {
    eprintln!("Usage: tagsafe-scan [options] <file.html>...");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <policy.yaml>  Policy override file");
    eprintln!("  --json                  Print reports as JSON");
    eprintln!("  --remediate             Write remediated HTML to stdout");
    eprintln!("  --strict                Use strict remediation mode");
    eprintln!("  --strip-styles          Remove inline styles in moderate mode");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  tagsafe-scan comment.html");
    eprintln!("  tagsafe-scan --config policy.yaml --json uploads/*.html");
    eprintln!("  tagsafe-scan --remediate --strict page.html > page.clean.html");
    process::exit(1);
}

fn parse_args() -> Options {
    let mut options = Options {
        config: None,
        json: false,
        remediate: false,
        strict: false,
        strip_styles: false,
        files: Vec::new(),
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => match args.next() {
                Some(path) => options.config = Some(path),
                None => usage(),
            },
            "--json" => options.json = true,
            "--remediate" => options.remediate = true,
            "--strict" => options.strict = true,
            "--strip-styles" => options.strip_styles = true,
            "--help" | "-h" => usage(),
            _ => options.files.push(arg),
        }
    }

    if options.files.is_empty() {
        usage();
    }
    options
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let options = parse_args();

    let policy = match options.config {
        Some(ref path) => PolicySet::from_file(path),
        None => PolicySet::default(),
    };
    if let Some(warning) = policy.warning() {
        eprintln!("warning: {}", warning);
    }

    let analyzer = Analyzer::new(&policy);
    let mut exit_code = 0;

    for file_path in &options.files {
        match process_file(&analyzer, file_path, &options) {
            Ok(true) => {}
            Ok(false) => exit_code = 1,
            Err(err) => {
                eprintln!("✗ {}", err);
                exit_code = 1;
            }
        }
    }

    process::exit(exit_code);
}

/// Scan (and optionally remediate) one file. Returns whether it was clean.
fn process_file(analyzer: &Analyzer, file_path: &str, options: &Options) -> TagsafeResult<bool> {
    let html = fs::read_to_string(file_path).map_err(|err| TagsafeError::FileRead {
        path: file_path.to_string(),
        message: err.to_string(),
    })?;

    let report = analyzer.security_report(&html);

    if options.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).expect("report serializes")
        );
    } else {
        print_report(file_path, &report);
    }

    if options.remediate {
        let remediation = analyzer.auto_remediate(
            &html,
            RemediationOptions {
                mode: if options.strict {
                    RemediationMode::Strict
                } else {
                    RemediationMode::Moderate
                },
                preserve_content: !options.strip_styles,
            },
        );
        print_remediation_log(file_path, &remediation);
        println!("{}", remediation.html);
    }

    Ok(report.is_safe())
}

fn print_report(file_path: &str, report: &SecurityReport) {
    if report.is_safe() {
        println!("✓ {} is clean", file_path);
        return;
    }

    println!("✗ {} has {} alert(s):", file_path, report.alert_count());
    for (label, scan) in [
        ("xss", &report.xss),
        ("protocols", &report.protocols),
        ("handlers", &report.handlers),
    ] {
        for alert in &scan.alerts {
            let detail = alert
                .signature
                .as_deref()
                .or(alert.handler.as_deref())
                .or(alert.protocol.as_deref())
                .unwrap_or("match");
            println!("  [{}] {}: {} match(es)", label, detail, alert.count);
        }
    }
    if report.dangerous_tag_count > 0 {
        println!("  dangerous tags: {}", report.dangerous_tag_count);
    }
    for url in &report.suspicious_urls {
        println!("  suspicious url: {}", url);
    }
    for recommendation in &report.recommendations {
        println!("  → {}", recommendation);
    }
}

fn print_remediation_log(file_path: &str, remediation: &Remediation) {
    eprintln!(
        "{}: {} step(s), {} alert(s), {} → {} bytes ({}% reduction)",
        file_path,
        remediation.log.len(),
        remediation.total_alerts,
        remediation.bytes_before,
        remediation.bytes_after,
        remediation.reduction_percent
    );
    for entry in &remediation.log {
        eprintln!(
            "  {}: {} alert(s), {} → {} bytes",
            entry.step,
            entry.alerts.len(),
            entry.bytes_before,
            entry.bytes_after
        );
    }
}
