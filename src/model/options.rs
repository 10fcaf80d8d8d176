use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;
use crate::query::DateFilter;

/// Default page size for `list` and `search`.
pub const DEFAULT_PER_PAGE: usize = 30;

/// Largest page size accepted at the boundary.
pub const MAX_PER_PAGE: usize = 100;

/// Package ecosystems an advisory can be filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Rubygems,
    Npm,
    Pip,
    Maven,
    Nuget,
    Composer,
    Go,
    Rust,
    Erlang,
    Actions,
    Pub,
    Swift,
    Other,
}

impl Ecosystem {
    pub const ALL: [Ecosystem; 13] = [
        Ecosystem::Rubygems,
        Ecosystem::Npm,
        Ecosystem::Pip,
        Ecosystem::Maven,
        Ecosystem::Nuget,
        Ecosystem::Composer,
        Ecosystem::Go,
        Ecosystem::Rust,
        Ecosystem::Erlang,
        Ecosystem::Actions,
        Ecosystem::Pub,
        Ecosystem::Swift,
        Ecosystem::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Rubygems => "rubygems",
            Ecosystem::Npm => "npm",
            Ecosystem::Pip => "pip",
            Ecosystem::Maven => "maven",
            Ecosystem::Nuget => "nuget",
            Ecosystem::Composer => "composer",
            Ecosystem::Go => "go",
            Ecosystem::Rust => "rust",
            Ecosystem::Erlang => "erlang",
            Ecosystem::Actions => "actions",
            Ecosystem::Pub => "pub",
            Ecosystem::Swift => "swift",
            Ecosystem::Other => "other",
        }
    }

    /// Maps an OSV ecosystem name (e.g. `PyPI`, `crates.io`) onto the
    /// enumerated ecosystems. Unrecognized names map to [`Ecosystem::Other`].
    pub fn from_osv(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "npm" => Ecosystem::Npm,
            "pypi" => Ecosystem::Pip,
            "maven" => Ecosystem::Maven,
            "nuget" => Ecosystem::Nuget,
            "rubygems" => Ecosystem::Rubygems,
            "packagist" => Ecosystem::Composer,
            "go" => Ecosystem::Go,
            "crates.io" => Ecosystem::Rust,
            "hex" => Ecosystem::Erlang,
            "github actions" => Ecosystem::Actions,
            "pub" => Ecosystem::Pub,
            "swifturl" => Ecosystem::Swift,
            _ => Ecosystem::Other,
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ecosystem {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Ecosystem::ALL
            .into_iter()
            .find(|e| e.as_str() == lowered)
            .ok_or_else(|| QueryError::InvalidEcosystem(s.to_string()))
    }
}

/// Severity tiers accepted by the severity filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl SeverityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Low => "low",
            SeverityLevel::Medium => "medium",
            SeverityLevel::High => "high",
            SeverityLevel::Critical => "critical",
            SeverityLevel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeverityLevel {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(SeverityLevel::Low),
            "medium" | "moderate" => Ok(SeverityLevel::Medium),
            "high" => Ok(SeverityLevel::High),
            "critical" => Ok(SeverityLevel::Critical),
            "unknown" => Ok(SeverityLevel::Unknown),
            _ => Err(QueryError::InvalidSeverity(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Published,
    Updated,
}

impl FromStr for SortField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "published" => Ok(SortField::Published),
            "updated" => Ok(SortField::Updated),
            _ => Err(QueryError::InvalidSort(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(QueryError::InvalidDirection(s.to_string())),
        }
    }
}

/// Validated options for [`list`](crate::query::list).
///
/// The query engine trusts these values. `per_page` is not capped here;
/// [`ListParams::validate`] enforces the ceiling at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisoryListOptions {
    pub ghsa_id: Option<String>,
    pub cve_id: Option<String>,
    pub ecosystem: Option<Ecosystem>,
    pub severity: Option<SeverityLevel>,
    pub cwes: Vec<String>,
    pub is_withdrawn: Option<bool>,
    pub affects: Option<String>,
    pub published: Option<DateFilter>,
    pub updated: Option<DateFilter>,
    pub per_page: usize,
    pub page: usize,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl Default for AdvisoryListOptions {
    fn default() -> Self {
        Self {
            ghsa_id: None,
            cve_id: None,
            ecosystem: None,
            severity: None,
            cwes: Vec::new(),
            is_withdrawn: None,
            affects: None,
            published: None,
            updated: None,
            per_page: DEFAULT_PER_PAGE,
            page: 1,
            sort: SortField::default(),
            direction: SortDirection::default(),
        }
    }
}

/// Validated options for [`search`](crate::query::search).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub ecosystem: Option<Ecosystem>,
    pub severity: Option<SeverityLevel>,
    pub per_page: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            ecosystem: None,
            severity: None,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Raw list parameters as they arrive from a query string or tool call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListParams {
    pub ghsa_id: Option<String>,
    pub cve_id: Option<String>,
    pub ecosystem: Option<String>,
    pub severity: Option<String>,
    pub cwes: Option<String>,
    pub is_withdrawn: Option<bool>,
    pub affects: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub per_page: Option<usize>,
    pub page: Option<usize>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl ListParams {
    /// Checks every parameter and converts the bag into typed options.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] for unknown enum values, a page size outside
    /// `1..=100`, a zero page number, or a malformed date filter.
    pub fn validate(&self) -> Result<AdvisoryListOptions, QueryError> {
        let cwes = self
            .cwes
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let page = match self.page {
            Some(0) => return Err(QueryError::InvalidPage),
            Some(page) => page,
            None => 1,
        };

        Ok(AdvisoryListOptions {
            ghsa_id: non_empty(&self.ghsa_id),
            cve_id: non_empty(&self.cve_id),
            ecosystem: parse_opt(&self.ecosystem)?,
            severity: parse_opt(&self.severity)?,
            cwes,
            is_withdrawn: self.is_withdrawn,
            affects: non_empty(&self.affects),
            published: parse_opt(&self.published)?,
            updated: parse_opt(&self.updated)?,
            per_page: validate_per_page(self.per_page)?,
            page,
            sort: parse_opt(&self.sort)?.unwrap_or_default(),
            direction: parse_opt(&self.direction)?.unwrap_or_default(),
        })
    }
}

/// Raw search parameters. `q` is accepted as an alias for `query`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(alias = "q")]
    pub query: Option<String>,
    pub ecosystem: Option<String>,
    pub severity: Option<String>,
    pub per_page: Option<usize>,
}

impl SearchParams {
    /// Returns the search text and the typed options.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MissingQuery`] when no non-blank query was given,
    /// plus the same enum and page-size errors as [`ListParams::validate`].
    pub fn validate(&self) -> Result<(String, SearchOptions), QueryError> {
        let query = non_empty(&self.query).ok_or(QueryError::MissingQuery)?;
        let options = SearchOptions {
            ecosystem: parse_opt(&self.ecosystem)?,
            severity: parse_opt(&self.severity)?,
            per_page: validate_per_page(self.per_page)?,
        };
        Ok((query, options))
    }
}

fn validate_per_page(per_page: Option<usize>) -> Result<usize, QueryError> {
    match per_page {
        None => Ok(DEFAULT_PER_PAGE),
        Some(n) if (1..=MAX_PER_PAGE).contains(&n) => Ok(n),
        Some(n) => Err(QueryError::InvalidPerPage(n)),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_opt<T: FromStr<Err = QueryError>>(value: &Option<String>) -> Result<Option<T>, QueryError> {
    non_empty(value).map(|s| s.parse()).transpose()
}
