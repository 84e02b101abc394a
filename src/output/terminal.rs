//! Rich terminal output formatting

use crate::certificate::{ScoreRating, SecurityAssessment, StatusLabel};
use crate::models::NormalizedCertificate;
use crate::utils::SubdomainReport;
use console::{style, Style};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style as TabledStyle},
    Table, Tabled,
};

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl FieldRow {
    fn new(field: &str, value: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

/// Section header
pub fn format_header(title: &str) -> String {
    style(format!("━━━ {} ━━━", title)).cyan().bold().to_string()
}

/// Certificate overview, security score and domain list
pub fn format_certificate_report(
    cert: &NormalizedCertificate,
    assessment: &SecurityAssessment,
    verbose: bool,
) -> String {
    let details = &cert.details;
    let mut out = String::new();

    out.push_str(&format_header("Certificate"));
    out.push_str("\n\n");

    let mut rows = vec![
        FieldRow::new("Domain", cert.primary_domain().unwrap_or("-")),
        FieldRow::new("Issuer", or_dash(&cert.issuer)),
        FieldRow::new("Valid From", cert.not_before.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        FieldRow::new("Valid Until", cert.not_after.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        FieldRow::new("Status", format_status(assessment.status, assessment.days_remaining)),
        FieldRow::new(
            "Signature Algorithm",
            details.signature_algorithm.as_deref().unwrap_or("-"),
        ),
        FieldRow::new(
            "Public Key",
            match details.key_bits() {
                Some(bits) => format!(
                    "{} {} bits",
                    details
                        .public_key
                        .as_ref()
                        .and_then(|pk| pk.algorithm.as_deref())
                        .unwrap_or(""),
                    bits
                )
                .trim()
                .to_string(),
                None => "-".to_string(),
            },
        ),
    ];

    if verbose {
        rows.push(FieldRow::new("Subject", or_dash(&details.subject.to_string())));
        rows.push(FieldRow::new(
            "Serial Number",
            details.serial_number.as_deref().unwrap_or("-"),
        ));
        rows.push(FieldRow::new(
            "SHA256 Fingerprint",
            details.fingerprint256.as_deref().unwrap_or("-"),
        ));
        rows.push(FieldRow::new(
            "Validity Period",
            format!("{} days", cert.validity_period_days()),
        ));
        if let Some(summary) = &details.issuer_summary {
            if let Some(subject) = &summary.subject {
                rows.push(FieldRow::new("Issued By", or_dash(&subject.to_string())));
            }
        }
        rows.push(FieldRow::new(
            "Retrieved",
            cert.retrieved_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ));
    }

    let table = Table::new(rows)
        .with(TabledStyle::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    out.push_str(&table);
    out.push_str("\n\n");

    out.push_str(&format_assessment(assessment));

    out.push('\n');
    out.push_str(&style("Domains:").bold().to_string());
    out.push('\n');
    if cert.domains.is_empty() {
        out.push_str(&format!("  {}\n", style("(none)").dim()));
    }
    for domain in &cert.domains {
        out.push_str(&format!("  {} {}\n", style("•").cyan(), domain));
    }

    out
}

/// Score box and the individual checks
pub fn format_assessment(assessment: &SecurityAssessment) -> String {
    let rating_style = match assessment.rating {
        ScoreRating::Good => Style::new().green().bold(),
        ScoreRating::Fair => Style::new().yellow().bold(),
        ScoreRating::Poor => Style::new().red().bold(),
    };

    let mut out = String::new();
    out.push_str(&format!(
        "{} {} {}\n\n",
        style("Security Score:").bold(),
        rating_style.apply_to(format!("{}/100", assessment.score)),
        rating_style.apply_to(format!("({})", assessment.rating)),
    ));

    for check in &assessment.checks {
        let icon = if check.passed {
            style("✓").green()
        } else {
            style("✗").red()
        };
        out.push_str(&format!(
            "  {} {}: {}\n",
            icon,
            style(&check.name).bold(),
            check.detail
        ));
    }
    out
}

/// Base domain and subdomain list
pub fn format_subdomain_report(report: &SubdomainReport) -> String {
    let mut out = format!("{} {}\n", style("Base domain:").bold(), report.base_domain);
    if report.subdomains.is_empty() {
        out.push_str(&format!("  {}\n", style("No subdomains found").dim()));
    }
    for subdomain in &report.subdomains {
        out.push_str(&format!("  {} {}\n", style("•").cyan(), subdomain));
    }
    out
}

pub fn print_certificate_report(
    cert: &NormalizedCertificate,
    assessment: &SecurityAssessment,
    verbose: bool,
) {
    println!();
    print!("{}", format_certificate_report(cert, assessment, verbose));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", style("ℹ").blue(), message);
}

fn format_status(status: StatusLabel, days: i64) -> String {
    match status {
        StatusLabel::Expired if days == 0 => style("Expired today").red().bold().to_string(),
        StatusLabel::Expired => style(format!("Expired {} days ago", days.abs()))
            .red()
            .to_string(),
        StatusLabel::ExpiringSoon => style(format!("Expiring soon ({} days left)", days))
            .yellow()
            .to_string(),
        StatusLabel::Valid => style(format!("Valid ({} days left)", days)).green().to_string(),
    }
}

fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}
