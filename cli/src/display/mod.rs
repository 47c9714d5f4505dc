use byoc_core::api::CveResponse;
use byoc_core::{ByocError, CveLookup, CveRecord, Severity};
use colored::Colorize;

pub fn print_report(keyword: &str, lookup: &CveLookup) {
    println!("\n{}", "=".repeat(60));
    println!("CVE lookup: {}", keyword);
    println!("{}", "=".repeat(60));
    println!(
        "Showing {} of {} result(s){}",
        lookup.cves.len(),
        lookup.total,
        if lookup.cached { " (cached)" } else { "" }
    );
    println!();

    if lookup.cves.is_empty() {
        println!("No vulnerabilities found.");
        return;
    }

    for cve in &lookup.cves {
        print_record(cve);
    }
}

fn print_record(cve: &CveRecord) {
    let score = cve
        .score
        .map(|s| format!(" {:.1}", s))
        .unwrap_or_default();
    println!(
        "  - [{}] {}{}",
        cve.id.bold(),
        severity_label(cve.severity),
        score
    );
    if !cve.published_date.is_empty() {
        println!("    Published: {}", cve.published_date);
    }
    if !cve.description.is_empty() {
        println!("    {}", cve.description);
    }
    if !cve.affected_packages.is_empty() {
        println!("    Packages: {}", cve.affected_packages.join(", "));
    }
    if !cve.fixed_versions.is_empty() {
        println!("    Fixed in: {}", cve.fixed_versions.join(", ").green());
    }
    for reference in &cve.references {
        println!("    {}", reference.dimmed());
    }
    println!();
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    let label = severity.as_str();
    match severity {
        Severity::Critical => label.red().bold(),
        Severity::High => label.red(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.blue(),
        Severity::None | Severity::Unknown => label.normal(),
    }
}

pub fn print_rate_limited(error: &ByocError) {
    eprintln!("{} {}", "⚠️ ".yellow(), error);
    eprintln!("Please try again later, or configure nvd.api_key for a higher limit.");
}

pub fn print_json(response: &CveResponse) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(response)?)
}
