use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::AdvisorySource;
use crate::error::{SourceError, SourceResult};
use crate::model::{
    Advisory, AdvisoryListOptions, AffectedPackage, Credit, Cvss, Cwe, Ecosystem, PackageRef,
    SortDirection, SortField,
};

const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Forwards queries to the GitHub global security advisories API.
///
/// The remote API has no free-text search, so this source leaves
/// [`AdvisorySource::search_advisories`] unsupported.
pub struct GitHubSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubSource {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header(
                "User-Agent",
                concat!("advisory-index/", env!("CARGO_PKG_VERSION")),
            );
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }
}

impl Default for GitHubSource {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Translates list options into the API's query parameters.
fn list_query(options: &AdvisoryListOptions) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("type", "reviewed".to_string()),
        ("per_page", options.per_page.to_string()),
        ("page", options.page.to_string()),
        (
            "sort",
            match options.sort {
                SortField::Published => "published",
                SortField::Updated => "updated",
            }
            .to_string(),
        ),
        (
            "direction",
            match options.direction {
                SortDirection::Asc => "asc",
                SortDirection::Desc => "desc",
            }
            .to_string(),
        ),
    ];

    if let Some(id) = &options.ghsa_id {
        query.push(("ghsa_id", id.clone()));
    }
    if let Some(cve) = &options.cve_id {
        query.push(("cve_id", cve.clone()));
    }
    if let Some(ecosystem) = options.ecosystem {
        query.push(("ecosystem", ecosystem.to_string()));
    }
    if let Some(severity) = options.severity {
        query.push(("severity", severity.to_string()));
    }
    if !options.cwes.is_empty() {
        query.push(("cwes", options.cwes.join(",")));
    }
    if let Some(withdrawn) = options.is_withdrawn {
        query.push(("is_withdrawn", withdrawn.to_string()));
    }
    if let Some(affects) = &options.affects {
        query.push(("affects", affects.clone()));
    }
    if let Some(published) = &options.published {
        query.push(("published", published.as_expr().to_string()));
    }
    if let Some(updated) = &options.updated {
        query.push(("updated", updated.as_expr().to_string()));
    }

    query
}

#[async_trait]
impl AdvisorySource for GitHubSource {
    fn kind(&self) -> &'static str {
        "github"
    }

    async fn list_advisories(&self, options: &AdvisoryListOptions) -> SourceResult<Vec<Advisory>> {
        let url = format!("{}/advisories", self.base_url);
        let response = self.request(&url).query(&list_query(options)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(upstream_error(status, response.text().await.unwrap_or_default()));
        }

        let advisories: Vec<GhAdvisory> = response.json().await?;
        debug!("GitHub returned {} advisories", advisories.len());
        Ok(advisories.into_iter().map(Advisory::from).collect())
    }

    async fn get_advisory(&self, ghsa_id: &str) -> SourceResult<Option<Advisory>> {
        let url = format!("{}/advisories/{}", self.base_url, ghsa_id);
        let response = self.request(&url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(upstream_error(status, response.text().await.unwrap_or_default()));
        }

        let advisory: GhAdvisory = response.json().await?;
        Ok(Some(advisory.into()))
    }
}

fn upstream_error(status: StatusCode, body: String) -> SourceError {
    SourceError::Upstream {
        source_name: "github",
        status: status.as_u16(),
        message: body,
    }
}

// Response types for the global advisories endpoint. Most fields are
// nullable upstream, so they are converted rather than deserialized into
// `Advisory` directly.
#[derive(Deserialize)]
struct GhAdvisory {
    ghsa_id: String,
    cve_id: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    html_url: String,
    summary: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    advisory_type: Option<String>,
    severity: Option<String>,
    published_at: Option<String>,
    updated_at: Option<String>,
    withdrawn_at: Option<String>,
    #[serde(default)]
    vulnerabilities: Vec<GhVulnerability>,
    cvss: Option<GhCvss>,
    #[serde(default)]
    cwes: Vec<GhCwe>,
    #[serde(default)]
    credits: Vec<GhCredit>,
    #[serde(default)]
    references: Vec<String>,
}

#[derive(Deserialize)]
struct GhVulnerability {
    package: Option<GhPackage>,
    vulnerable_version_range: Option<String>,
    first_patched_version: Option<String>,
}

#[derive(Deserialize)]
struct GhPackage {
    ecosystem: String,
    name: String,
}

#[derive(Deserialize)]
struct GhCvss {
    vector_string: Option<String>,
    score: Option<f64>,
}

#[derive(Deserialize)]
struct GhCwe {
    cwe_id: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct GhCredit {
    user: Option<GhUser>,
    #[serde(rename = "type")]
    credit_type: Option<String>,
}

#[derive(Deserialize)]
struct GhUser {
    login: String,
}

impl From<GhAdvisory> for Advisory {
    fn from(gh: GhAdvisory) -> Self {
        let cvss = gh.cvss.and_then(|c| match (c.vector_string, c.score) {
            (Some(vector_string), Some(score)) => Some(Cvss {
                vector_string,
                score,
            }),
            _ => None,
        });

        Advisory {
            ghsa_id: gh.ghsa_id,
            cve_id: gh.cve_id,
            url: gh.url,
            html_url: gh.html_url,
            summary: gh.summary.unwrap_or_default(),
            description: gh.description.unwrap_or_default(),
            advisory_type: gh.advisory_type.unwrap_or_else(|| "reviewed".to_string()),
            severity: gh
                .severity
                .map(|s| s.to_ascii_lowercase())
                .unwrap_or_else(|| "unknown".to_string()),
            published_at: gh.published_at.unwrap_or_default(),
            updated_at: gh.updated_at.unwrap_or_default(),
            withdrawn_at: gh.withdrawn_at,
            vulnerabilities: gh
                .vulnerabilities
                .into_iter()
                .filter_map(|v| {
                    let package = v.package?;
                    Some(AffectedPackage {
                        package: PackageRef {
                            ecosystem: package.ecosystem.parse().unwrap_or(Ecosystem::Other),
                            name: package.name,
                        },
                        vulnerable_version_range: v
                            .vulnerable_version_range
                            .unwrap_or_else(|| "*".to_string()),
                        first_patched_version: v.first_patched_version,
                    })
                })
                .collect(),
            cvss,
            cwes: gh
                .cwes
                .into_iter()
                .map(|c| Cwe {
                    name: c.name.unwrap_or_else(|| c.cwe_id.clone()),
                    cwe_id: c.cwe_id,
                })
                .collect(),
            credits: gh
                .credits
                .into_iter()
                .filter_map(|c| {
                    Some(Credit {
                        login: c.user?.login,
                        credit_type: c.credit_type.unwrap_or_default(),
                    })
                })
                .collect(),
            references: gh.references,
        }
    }
}
