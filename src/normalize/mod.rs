//! Conversion of raw OSV records into canonical advisories.
//!
//! [`normalize`] is a pure function: it never touches the filesystem and
//! accepts any record that deserialized as an [`OsvRecord`].
//!
//! # Example
//!
//! ```
//! use advisory_index::model::OsvRecord;
//! use advisory_index::normalize::normalize;
//!
//! let record: OsvRecord = serde_json::from_str(r#"{
//!     "id": "GHSA-aaaa-bbbb-cccc",
//!     "aliases": ["CVE-2026-0001"],
//!     "details": "Prototype pollution in merge.\n\nMore text.",
//!     "published": "2026-01-27T10:00:00Z",
//!     "modified": "2026-01-28T00:00:00Z"
//! }"#).unwrap();
//!
//! let advisory = normalize(&record);
//! assert_eq!(advisory.cve_id.as_deref(), Some("CVE-2026-0001"));
//! assert_eq!(advisory.summary, "Prototype pollution in merge.");
//! ```

pub mod cvss;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::model::{
    Advisory, AffectedPackage, Cvss, Cwe, Ecosystem, OsvAffected, OsvEvent, OsvRecord,
    PackageRef, SeverityLevel,
};

const API_BASE: &str = "https://api.github.com/advisories";
const HTML_BASE: &str = "https://github.com/advisories";

/// Maps one raw record to its canonical advisory.
pub fn normalize(record: &OsvRecord) -> Advisory {
    let db = record.database_specific.clone().unwrap_or_default();
    let description = record.details.clone().unwrap_or_default();

    let summary = record
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| first_line(&description));

    let cve_id = record
        .aliases
        .iter()
        .find(|alias| alias.starts_with("CVE-"))
        .cloned();

    let published_at = record
        .published
        .as_deref()
        .map(normalize_timestamp)
        .unwrap_or_default();
    let updated_at = record
        .modified
        .as_deref()
        .map(normalize_timestamp)
        .unwrap_or_else(|| published_at.clone());

    Advisory {
        url: format!("{}/{}", API_BASE, record.id),
        html_url: format!("{}/{}", HTML_BASE, record.id),
        ghsa_id: record.id.clone(),
        cve_id,
        summary,
        description,
        advisory_type: "reviewed".to_string(),
        severity: normalize_severity(db.severity.as_deref()),
        published_at,
        updated_at,
        withdrawn_at: record.withdrawn.as_deref().map(normalize_timestamp),
        vulnerabilities: record.affected.iter().map(affected_package).collect(),
        cvss: extract_cvss(record),
        cwes: db.cwe_ids.into_iter().map(Cwe::from_id).collect(),
        credits: Vec::new(),
        references: record.references.iter().map(|r| r.url.clone()).collect(),
    }
}

/// Builds the human-readable range expression from one range's events.
///
/// The introduced and fixed bounds are searched independently, so they may
/// come from different events.
pub fn version_range(events: &[OsvEvent]) -> String {
    let introduced = events.iter().find_map(|e| e.introduced.as_deref());
    let fixed = events.iter().find_map(|e| e.fixed.as_deref());

    match (introduced, fixed) {
        (Some(introduced), Some(fixed)) => format!(">= {}, < {}", introduced, fixed),
        (Some(introduced), None) => format!(">= {}", introduced),
        (None, Some(fixed)) => format!("< {}", fixed),
        (None, None) => "*".to_string(),
    }
}

/// The fixed value of the first event carrying one.
pub fn first_patched_version(events: &[OsvEvent]) -> Option<String> {
    events.iter().find_map(|e| e.fixed.clone())
}

/// One entry per affected block. A block without a package still yields an
/// entry, under [`Ecosystem::Other`] with an empty name.
fn affected_package(affected: &OsvAffected) -> AffectedPackage {
    let package = match &affected.package {
        Some(package) => PackageRef {
            ecosystem: Ecosystem::from_osv(&package.ecosystem),
            name: package.name.clone(),
        },
        None => PackageRef {
            ecosystem: Ecosystem::Other,
            name: String::new(),
        },
    };
    let events = affected
        .ranges
        .first()
        .map(|r| r.events.as_slice())
        .unwrap_or_default();

    AffectedPackage {
        package,
        vulnerable_version_range: version_range(events),
        first_patched_version: first_patched_version(events),
    }
}

fn extract_cvss(record: &OsvRecord) -> Option<Cvss> {
    record
        .severity
        .iter()
        .filter(|s| s.severity_type.eq_ignore_ascii_case("CVSS_V3"))
        .find_map(|s| {
            cvss::base_score(&s.score).map(|score| Cvss {
                vector_string: s.score.clone(),
                score,
            })
        })
}

fn normalize_severity(raw: Option<&str>) -> String {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => SeverityLevel::Unknown.as_str().to_string(),
        Some(raw) => raw
            .parse::<SeverityLevel>()
            .map(|level| level.as_str().to_string())
            .unwrap_or_else(|_| raw.to_ascii_lowercase()),
    }
}

/// Re-renders an RFC 3339 timestamp as `YYYY-MM-DDTHH:MM:SSZ` in UTC so that
/// string order equals chronological order. Unparseable input is kept as-is.
fn normalize_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| {
            ts.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        })
        .unwrap_or_else(|_| raw.to_string())
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(introduced: Option<&str>, fixed: Option<&str>) -> OsvEvent {
        OsvEvent {
            introduced: introduced.map(str::to_string),
            fixed: fixed.map(str::to_string),
            ..Default::default()
        }
    }

    fn sample_record() -> OsvRecord {
        serde_json::from_str(
            r#"{
                "schema_version": "1.4.0",
                "id": "GHSA-xxxx-yyyy-zzzz",
                "modified": "2026-01-28T12:30:00.123Z",
                "published": "2026-01-27T10:00:00Z",
                "aliases": ["GO-2026-0001", "CVE-2026-1234"],
                "summary": "XSS in widget renderer",
                "details": "The widget renderer does not escape input.",
                "severity": [
                    {"type": "CVSS_V4", "score": "CVSS:4.0/AV:N/AC:L/AT:N/PR:N/UI:N/VC:H/VI:H/VA:H/SC:N/SI:N/SA:N"},
                    {"type": "CVSS_V3", "score": "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H"}
                ],
                "affected": [
                    {
                        "package": {"ecosystem": "npm", "name": "widget"},
                        "ranges": [
                            {"type": "ECOSYSTEM", "events": [{"introduced": "0"}, {"fixed": "1.2.3"}]},
                            {"type": "ECOSYSTEM", "events": [{"introduced": "2.0.0"}, {"fixed": "2.0.1"}]}
                        ]
                    },
                    {
                        "package": {"ecosystem": "PyPI", "name": "widget-py"},
                        "ranges": [{"type": "ECOSYSTEM", "events": [{"introduced": "0"}, {"last_affected": "3.1"}]}]
                    }
                ],
                "references": [
                    {"type": "ADVISORY", "url": "https://nvd.nist.gov/vuln/detail/CVE-2026-1234"},
                    {"type": "WEB", "url": "https://example.com/fix"}
                ],
                "database_specific": {
                    "cwe_ids": ["CWE-79"],
                    "severity": "MODERATE",
                    "github_reviewed": true,
                    "github_reviewed_at": "2026-01-27T09:00:00Z",
                    "nvd_published_at": null
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_version_range_both_bounds() {
        let events = [event(Some("1.0.0"), None), event(None, Some("2.0.0"))];
        assert_eq!(version_range(&events), ">= 1.0.0, < 2.0.0");
        assert_eq!(first_patched_version(&events), Some("2.0.0".to_string()));
    }

    #[test]
    fn test_version_range_introduced_only() {
        let events = [event(Some("1.0.0"), None)];
        assert_eq!(version_range(&events), ">= 1.0.0");
        assert_eq!(first_patched_version(&events), None);
    }

    #[test]
    fn test_version_range_fixed_only() {
        assert_eq!(version_range(&[event(None, Some("0.9.1"))]), "< 0.9.1");
    }

    #[test]
    fn test_version_range_empty() {
        assert_eq!(version_range(&[]), "*");
    }

    #[test]
    fn test_normalize_full_record() {
        let advisory = normalize(&sample_record());

        assert_eq!(advisory.ghsa_id, "GHSA-xxxx-yyyy-zzzz");
        assert_eq!(advisory.cve_id.as_deref(), Some("CVE-2026-1234"));
        assert_eq!(advisory.summary, "XSS in widget renderer");
        assert_eq!(advisory.severity, "medium");
        assert_eq!(advisory.advisory_type, "reviewed");
        assert_eq!(advisory.published_at, "2026-01-27T10:00:00Z");
        assert_eq!(advisory.updated_at, "2026-01-28T12:30:00Z");
        assert_eq!(advisory.withdrawn_at, None);
        assert_eq!(
            advisory.html_url,
            "https://github.com/advisories/GHSA-xxxx-yyyy-zzzz"
        );
        assert!(advisory.credits.is_empty());
        assert_eq!(advisory.references.len(), 2);

        assert_eq!(advisory.vulnerabilities.len(), 2);
        let npm = &advisory.vulnerabilities[0];
        assert_eq!(npm.package.ecosystem, Ecosystem::Npm);
        assert_eq!(npm.vulnerable_version_range, ">= 0, < 1.2.3");
        assert_eq!(npm.first_patched_version.as_deref(), Some("1.2.3"));

        let pip = &advisory.vulnerabilities[1];
        assert_eq!(pip.package.ecosystem, Ecosystem::Pip);
        assert_eq!(pip.vulnerable_version_range, ">= 0");
        assert_eq!(pip.first_patched_version, None);

        let cvss = advisory.cvss.unwrap();
        assert_eq!(
            cvss.vector_string,
            "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H"
        );
        assert_eq!(cvss.score, 9.8);

        assert_eq!(advisory.cwes, vec![Cwe::from_id("CWE-79")]);
        assert_eq!(advisory.cwes[0].name, "CWE-79");
    }

    #[test]
    fn test_summary_falls_back_to_first_detail_line() {
        let record: OsvRecord = serde_json::from_str(
            r#"{"id": "GHSA-1", "details": "\n  First line here  \nSecond line"}"#,
        )
        .unwrap();
        let advisory = normalize(&record);
        assert_eq!(advisory.summary, "First line here");
        assert_eq!(advisory.description, "\n  First line here  \nSecond line");
    }

    #[test]
    fn test_sparse_record() {
        let record: OsvRecord = serde_json::from_str(r#"{"id": "GHSA-2"}"#).unwrap();
        let advisory = normalize(&record);
        assert_eq!(advisory.summary, "");
        assert_eq!(advisory.severity, "unknown");
        assert_eq!(advisory.cve_id, None);
        assert!(advisory.cvss.is_none());
        assert!(advisory.vulnerabilities.is_empty());
        assert!(advisory.cwes.is_empty());
    }

    #[test]
    fn test_withdrawn_timestamp_is_kept() {
        let record: OsvRecord = serde_json::from_str(
            r#"{"id": "GHSA-3", "published": "2025-03-01T00:00:00Z", "withdrawn": "2025-04-01T08:00:00+02:00"}"#,
        )
        .unwrap();
        let advisory = normalize(&record);
        assert!(advisory.is_withdrawn());
        assert_eq!(advisory.withdrawn_at.as_deref(), Some("2025-04-01T06:00:00Z"));
        assert_eq!(advisory.updated_at, "2025-03-01T00:00:00Z");
    }

    #[test]
    fn test_affected_entry_without_package_is_kept() {
        let record: OsvRecord = serde_json::from_str(
            r#"{"id": "GHSA-4", "affected": [
                {"ranges": [{"type": "ECOSYSTEM", "events": [{"introduced": "0"}, {"fixed": "2.0.0"}]}]},
                {"package": {"ecosystem": "npm", "name": "left-pad"}}
            ]}"#,
        )
        .unwrap();
        let advisory = normalize(&record);

        assert_eq!(advisory.vulnerabilities.len(), 2);
        let bare = &advisory.vulnerabilities[0];
        assert_eq!(bare.package.ecosystem, Ecosystem::Other);
        assert_eq!(bare.package.name, "");
        assert_eq!(bare.vulnerable_version_range, ">= 0, < 2.0.0");
        assert_eq!(bare.first_patched_version.as_deref(), Some("2.0.0"));
        assert_eq!(advisory.vulnerabilities[1].package.name, "left-pad");
    }

    #[test]
    fn test_timestamp_left_verbatim_when_unparseable() {
        assert_eq!(normalize_timestamp("yesterday"), "yesterday");
    }
}
