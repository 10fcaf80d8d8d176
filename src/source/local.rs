use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::AdvisorySource;
use crate::error::SourceResult;
use crate::index::AdvisoryIndex;
use crate::model::{Advisory, AdvisoryListOptions, SearchOptions};

/// Serves advisories from the in-memory index over a local clone.
pub struct LocalSource {
    index: Arc<AdvisoryIndex>,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            index: Arc::new(AdvisoryIndex::new(root)),
        }
    }

    pub fn with_index(index: Arc<AdvisoryIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &Arc<AdvisoryIndex> {
        &self.index
    }
}

#[async_trait]
impl AdvisorySource for LocalSource {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn list_advisories(&self, options: &AdvisoryListOptions) -> SourceResult<Vec<Advisory>> {
        Ok(self.index.list(options).await)
    }

    async fn get_advisory(&self, ghsa_id: &str) -> SourceResult<Option<Advisory>> {
        Ok(self.index.get(ghsa_id).await)
    }

    fn supports_search(&self) -> bool {
        true
    }

    async fn search_advisories(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> SourceResult<Vec<Advisory>> {
        Ok(self.index.search(query, options).await)
    }

    async fn refresh(&self) {
        self.index.invalidate().await;
    }
}
