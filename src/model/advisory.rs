use serde::{Deserialize, Serialize};

use super::Ecosystem;

/// The canonical advisory shape served by every adapter.
///
/// Timestamps are kept as fixed-width ISO-8601 UTC strings so that plain
/// string comparison orders them chronologically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub ghsa_id: String,
    pub cve_id: Option<String>,
    pub url: String,
    pub html_url: String,
    pub summary: String,
    pub description: String,
    #[serde(rename = "type")]
    pub advisory_type: String,
    pub severity: String,
    pub published_at: String,
    pub updated_at: String,
    pub withdrawn_at: Option<String>,
    pub vulnerabilities: Vec<AffectedPackage>,
    pub cvss: Option<Cvss>,
    pub cwes: Vec<Cwe>,
    pub credits: Vec<Credit>,
    #[serde(default)]
    pub references: Vec<String>,
}

impl Advisory {
    pub fn is_withdrawn(&self) -> bool {
        self.withdrawn_at.is_some()
    }

    /// Returns true if any affected package belongs to `ecosystem`.
    pub fn affects_ecosystem(&self, ecosystem: Ecosystem) -> bool {
        self.vulnerabilities
            .iter()
            .any(|v| v.package.ecosystem == ecosystem)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectedPackage {
    pub package: PackageRef,
    pub vulnerable_version_range: String,
    pub first_patched_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRef {
    pub ecosystem: Ecosystem,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cvss {
    pub vector_string: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cwe {
    pub cwe_id: String,
    pub name: String,
}

impl Cwe {
    /// Builds a CWE entry whose display name is the identifier itself.
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            cwe_id: id,
        }
    }
}

/// Attribution entry. The on-disk format carries nothing compatible, so
/// locally indexed advisories always have an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub login: String,
    #[serde(rename = "type")]
    pub credit_type: String,
}
