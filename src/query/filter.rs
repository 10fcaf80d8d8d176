//! The predicate pipeline shared by `list` and `search`.

use crate::model::{Advisory, AdvisoryListOptions, Ecosystem, SearchOptions, SeverityLevel};

use super::DateFilter;

/// The set of active predicates. An advisory passes when every active
/// predicate accepts it; `None`/empty fields are inactive.
#[derive(Debug, Default)]
pub struct Predicates<'a> {
    ghsa_id: Option<&'a str>,
    cve_id: Option<&'a str>,
    severity: Option<SeverityLevel>,
    is_withdrawn: Option<bool>,
    ecosystem: Option<Ecosystem>,
    cwes: &'a [String],
    affects: Option<&'a str>,
    published: Option<&'a DateFilter>,
    updated: Option<&'a DateFilter>,
    /// Lower-cased search text.
    text: Option<String>,
}

impl<'a> Predicates<'a> {
    pub fn for_list(options: &'a AdvisoryListOptions) -> Self {
        Self {
            ghsa_id: options.ghsa_id.as_deref(),
            cve_id: options.cve_id.as_deref(),
            severity: options.severity,
            is_withdrawn: options.is_withdrawn,
            ecosystem: options.ecosystem,
            cwes: &options.cwes,
            affects: options.affects.as_deref(),
            published: options.published.as_ref(),
            updated: options.updated.as_ref(),
            text: None,
        }
    }

    /// Text match plus the ecosystem and severity filters. Date, CWE and
    /// identity filters are not part of search.
    pub fn for_search(query: &str, options: &SearchOptions) -> Self {
        Self {
            severity: options.severity,
            ecosystem: options.ecosystem,
            text: Some(query.to_lowercase()),
            ..Default::default()
        }
    }

    pub fn matches(&self, advisory: &Advisory) -> bool {
        self.matches_text(advisory)
            && self.matches_identity(advisory)
            && self.matches_membership(advisory)
            && self.matches_affects(advisory)
            && self.matches_dates(advisory)
    }

    fn matches_identity(&self, advisory: &Advisory) -> bool {
        if let Some(id) = self.ghsa_id {
            if advisory.ghsa_id != id {
                return false;
            }
        }
        if let Some(cve) = self.cve_id {
            if advisory.cve_id.as_deref() != Some(cve) {
                return false;
            }
        }
        if let Some(severity) = self.severity {
            if !advisory.severity.eq_ignore_ascii_case(severity.as_str()) {
                return false;
            }
        }
        if let Some(withdrawn) = self.is_withdrawn {
            if advisory.is_withdrawn() != withdrawn {
                return false;
            }
        }
        true
    }

    fn matches_membership(&self, advisory: &Advisory) -> bool {
        if let Some(ecosystem) = self.ecosystem {
            if !advisory.affects_ecosystem(ecosystem) {
                return false;
            }
        }
        if !self.cwes.is_empty()
            && !advisory
                .cwes
                .iter()
                .any(|cwe| self.cwes.iter().any(|wanted| *wanted == cwe.cwe_id))
        {
            return false;
        }
        true
    }

    fn matches_affects(&self, advisory: &Advisory) -> bool {
        match self.affects {
            Some(name) => advisory
                .vulnerabilities
                .iter()
                .any(|v| v.package.name.contains(name)),
            None => true,
        }
    }

    fn matches_dates(&self, advisory: &Advisory) -> bool {
        self.published
            .map_or(true, |f| f.matches(&advisory.published_at))
            && self
                .updated
                .map_or(true, |f| f.matches(&advisory.updated_at))
    }

    fn matches_text(&self, advisory: &Advisory) -> bool {
        let Some(text) = self.text.as_deref() else {
            return true;
        };
        advisory.summary.to_lowercase().contains(text)
            || advisory.description.to_lowercase().contains(text)
            || advisory.ghsa_id.to_lowercase().contains(text)
            || advisory
                .cve_id
                .as_deref()
                .is_some_and(|cve| cve.to_lowercase().contains(text))
    }
}
