//! Advisory data sources.
//!
//! Transport adapters talk to advisories only through the
//! [`AdvisorySource`] trait, so the in-memory index can be swapped for
//! another backing store without touching them.
//!
//! # Available Sources
//!
//! | Source | Kind | Search |
//! |--------|------|--------|
//! | [`LocalSource`] | `local` | yes |
//! | [`GitHubSource`] | `github` | no |

mod github;
mod local;

pub use github::GitHubSource;
pub use local::LocalSource;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{Config, SourceKind};
use crate::error::{SourceError, SourceResult};
use crate::model::{Advisory, AdvisoryListOptions, SearchOptions};

/// Read access to a collection of advisories.
///
/// `search_advisories` is optional: sources that cannot search keep the
/// default implementation, which returns [`SourceError::Unsupported`].
/// Callers should check [`supports_search`](Self::supports_search) or treat
/// that error as "feature not available".
#[async_trait]
pub trait AdvisorySource: Send + Sync {
    /// Short identifier of the backing store, e.g. `"local"`.
    fn kind(&self) -> &'static str;

    async fn list_advisories(&self, options: &AdvisoryListOptions) -> SourceResult<Vec<Advisory>>;

    /// Looks up one advisory. `Ok(None)` when it does not exist.
    async fn get_advisory(&self, ghsa_id: &str) -> SourceResult<Option<Advisory>>;

    fn supports_search(&self) -> bool {
        false
    }

    async fn search_advisories(
        &self,
        _query: &str,
        _options: &SearchOptions,
    ) -> SourceResult<Vec<Advisory>> {
        Err(SourceError::Unsupported(self.kind(), "search"))
    }

    /// Drops any cached data so the next call sees the current backing
    /// store. A no-op for sources that do not cache.
    async fn refresh(&self) {}
}

/// Builds the source selected in `config`.
pub fn from_config(config: &Config) -> Arc<dyn AdvisorySource> {
    match config.source {
        SourceKind::Local => Arc::new(LocalSource::new(config.advisories_root())),
        SourceKind::Github => Arc::new(GitHubSource::new(config.github_token.clone())),
    }
}
