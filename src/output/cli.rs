use crate::index::IndexStats;
use crate::model::{Advisory, SeverityLevel};
use anyhow::Result;
use std::collections::BTreeSet;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct AdvisoryRow {
    #[tabled(rename = "GHSA")]
    ghsa_id: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Ecosystem")]
    ecosystem: String,
    #[tabled(rename = "Packages")]
    packages: String,
    #[tabled(rename = "Published")]
    published: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

#[derive(Tabled)]
struct PackageRow {
    #[tabled(rename = "Ecosystem")]
    ecosystem: String,
    #[tabled(rename = "Package")]
    name: String,
    #[tabled(rename = "Vulnerable")]
    vulnerable: String,
    #[tabled(rename = "Patched In")]
    patched: String,
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn print_advisory_table(advisories: &[Advisory]) -> Result<()> {
    println!();

    if advisories.is_empty() {
        println!("No advisories found.");
        return Ok(());
    }

    let rows: Vec<AdvisoryRow> = advisories.iter().map(advisory_row).collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);

    println!();
    print_summary(advisories);

    Ok(())
}

pub fn print_advisory_detail(advisory: &Advisory) -> Result<()> {
    println!();
    println!("{}  {}", advisory.ghsa_id, format_severity(&advisory.severity));
    println!("{}", advisory.summary);
    println!();

    if let Some(cve) = &advisory.cve_id {
        println!("  CVE:        {}", cve);
    }
    if let Some(cvss) = &advisory.cvss {
        println!("  CVSS:       {:.1} ({})", cvss.score, cvss.vector_string);
    }
    println!("  Published:  {}", advisory.published_at);
    println!("  Updated:    {}", advisory.updated_at);
    if let Some(withdrawn) = &advisory.withdrawn_at {
        println!("  Withdrawn:  {}", withdrawn);
    }
    if !advisory.cwes.is_empty() {
        let cwes: Vec<&str> = advisory.cwes.iter().map(|c| c.cwe_id.as_str()).collect();
        println!("  CWEs:       {}", cwes.join(", "));
    }
    println!("  URL:        {}", advisory.html_url);

    if !advisory.vulnerabilities.is_empty() {
        println!();
        let rows: Vec<PackageRow> = advisory
            .vulnerabilities
            .iter()
            .map(|v| PackageRow {
                ecosystem: v.package.ecosystem.to_string(),
                name: truncate(&v.package.name, 40),
                vulnerable: v.vulnerable_version_range.clone(),
                patched: v
                    .first_patched_version
                    .clone()
                    .unwrap_or_else(|| "-".to_string()),
            })
            .collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
    }

    if !advisory.description.is_empty() {
        println!();
        println!("{}", advisory.description.trim());
    }

    if !advisory.references.is_empty() {
        println!();
        println!("References:");
        for reference in &advisory.references {
            println!("  {}", reference);
        }
    }

    Ok(())
}

pub fn print_stats_table(stats: &IndexStats) -> Result<()> {
    let rows = vec![
        StatRow {
            metric: "Files seen",
            value: stats.files_seen.to_string(),
        },
        StatRow {
            metric: "Indexed",
            value: stats.indexed.to_string(),
        },
        StatRow {
            metric: "Skipped (unparseable)",
            value: stats.skipped.to_string(),
        },
        StatRow {
            metric: "Duplicate ids",
            value: stats.duplicates.to_string(),
        },
        StatRow {
            metric: "Directory errors",
            value: stats.dir_errors.to_string(),
        },
        StatRow {
            metric: "Build time",
            value: format!("{} ms", stats.elapsed_ms),
        },
    ];

    println!();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
    Ok(())
}

fn advisory_row(advisory: &Advisory) -> AdvisoryRow {
    let ecosystems: BTreeSet<&str> = advisory
        .vulnerabilities
        .iter()
        .map(|v| v.package.ecosystem.as_str())
        .collect();
    let packages: BTreeSet<&str> = advisory
        .vulnerabilities
        .iter()
        .map(|v| v.package.name.as_str())
        .filter(|name| !name.is_empty())
        .collect();

    AdvisoryRow {
        ghsa_id: advisory.ghsa_id.clone(),
        severity: format_severity(&advisory.severity),
        ecosystem: join_or_dash(ecosystems),
        packages: truncate(&join_or_dash(packages), 30),
        published: advisory
            .published_at
            .get(..10)
            .unwrap_or(&advisory.published_at)
            .to_string(),
        summary: truncate(&advisory.summary, 60),
    }
}

fn print_summary(advisories: &[Advisory]) {
    let count = |level: SeverityLevel| {
        advisories
            .iter()
            .filter(|a| a.severity.parse::<SeverityLevel>().ok() == Some(level))
            .count()
    };

    println!("Summary:");
    println!("  Advisories: {}", advisories.len());
    println!(
        "  Severity: {} critical, {} high, {} medium, {} low",
        count(SeverityLevel::Critical),
        count(SeverityLevel::High),
        count(SeverityLevel::Medium),
        count(SeverityLevel::Low)
    );
}

fn format_severity(severity: &str) -> String {
    match severity.parse::<SeverityLevel>() {
        Ok(SeverityLevel::Critical) => "\x1b[31mCRITICAL\x1b[0m".to_string(),
        Ok(SeverityLevel::High) => "\x1b[91mHIGH\x1b[0m".to_string(),
        Ok(SeverityLevel::Medium) => "\x1b[33mMEDIUM\x1b[0m".to_string(),
        Ok(SeverityLevel::Low) => "\x1b[32mLOW\x1b[0m".to_string(),
        _ => "UNKNOWN".to_string(),
    }
}

fn join_or_dash(items: BTreeSet<&str>) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.into_iter().collect::<Vec<_>>().join(", ")
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AffectedPackage, Ecosystem, PackageRef};

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("ééééééé", 6), "ééé...");
    }

    #[test]
    fn test_format_severity() {
        assert!(format_severity("moderate").contains("MEDIUM"));
        assert_eq!(format_severity("unknown"), "UNKNOWN");
        assert_eq!(format_severity("bogus"), "UNKNOWN");
    }

    #[test]
    fn test_advisory_row() {
        let advisory = Advisory {
            ghsa_id: "GHSA-row0-0000-0000".to_string(),
            cve_id: None,
            url: String::new(),
            html_url: String::new(),
            summary: "Something".to_string(),
            description: String::new(),
            advisory_type: "reviewed".to_string(),
            severity: "high".to_string(),
            published_at: "2026-01-27T10:00:00Z".to_string(),
            updated_at: "2026-01-27T10:00:00Z".to_string(),
            withdrawn_at: None,
            vulnerabilities: ["b-pkg", "a-pkg", "a-pkg"]
                .into_iter()
                .map(|name| AffectedPackage {
                    package: PackageRef {
                        ecosystem: Ecosystem::Npm,
                        name: name.to_string(),
                    },
                    vulnerable_version_range: "*".to_string(),
                    first_patched_version: None,
                })
                .collect(),
            cvss: None,
            cwes: Vec::new(),
            credits: Vec::new(),
            references: Vec::new(),
        };

        let row = advisory_row(&advisory);
        assert_eq!(row.ecosystem, "npm");
        assert_eq!(row.packages, "a-pkg, b-pkg");
        assert_eq!(row.published, "2026-01-27");
    }
}
