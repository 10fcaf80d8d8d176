use serde::Deserialize;

/// A raw vulnerability record in the OSV schema, one per JSON file.
///
/// Every field except `id` is optional so that sparse records still parse;
/// anything the normalizer cannot use is simply ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct OsvRecord {
    pub id: String,
    pub modified: Option<String>,
    pub published: Option<String>,
    pub withdrawn: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub summary: Option<String>,
    pub details: Option<String>,
    #[serde(default)]
    pub severity: Vec<OsvSeverity>,
    #[serde(default)]
    pub affected: Vec<OsvAffected>,
    #[serde(default)]
    pub references: Vec<OsvReference>,
    #[serde(default)]
    pub database_specific: Option<OsvDatabaseSpecific>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsvSeverity {
    #[serde(rename = "type")]
    pub severity_type: String,
    pub score: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsvAffected {
    pub package: Option<OsvPackage>,
    #[serde(default)]
    pub ranges: Vec<OsvRange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsvPackage {
    pub ecosystem: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsvRange {
    #[serde(rename = "type")]
    pub range_type: Option<String>,
    #[serde(default)]
    pub events: Vec<OsvEvent>,
}

/// One bound in a range. OSV puts exactly one key per event object, but the
/// fields are independent here so a malformed event never fails the record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsvEvent {
    pub introduced: Option<String>,
    pub fixed: Option<String>,
    pub last_affected: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsvReference {
    #[serde(rename = "type")]
    pub reference_type: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsvDatabaseSpecific {
    #[serde(default)]
    pub cwe_ids: Vec<String>,
    pub severity: Option<String>,
    pub github_reviewed: Option<bool>,
    pub github_reviewed_at: Option<String>,
    pub nvd_published_at: Option<String>,
}
