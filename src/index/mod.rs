//! The in-memory advisory index.
//!
//! [`AdvisoryIndex`] owns the store for one advisory tree. The store is
//! built lazily by the first caller of [`AdvisoryIndex::ensure_indexed`];
//! concurrent first callers share that single build. After
//! [`AdvisoryIndex::invalidate`] the next caller builds a fresh generation.
//!
//! # Example
//!
//! ```no_run
//! use advisory_index::index::AdvisoryIndex;
//! use advisory_index::model::AdvisoryListOptions;
//!
//! #[tokio::main]
//! async fn main() {
//!     let index = AdvisoryIndex::new("./advisory-database/advisories/github-reviewed");
//!     let latest = index.list(&AdvisoryListOptions::default()).await;
//!     println!("{} advisories on the first page", latest.len());
//! }
//! ```

mod loader;
mod store;

pub use loader::{load_file, load_tree, IndexStats};
pub use store::AdvisoryStore;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{error, info};

use crate::model::{Advisory, AdvisoryListOptions, SearchOptions};
use crate::query;

/// One build of the store. Replaced wholesale on invalidation.
#[derive(Default)]
struct Generation {
    built: OnceCell<Built>,
}

#[derive(Clone)]
struct Built {
    store: Arc<AdvisoryStore>,
    stats: IndexStats,
}

pub struct AdvisoryIndex {
    root: PathBuf,
    generation: RwLock<Arc<Generation>>,
    builds: AtomicUsize,
}

impl AdvisoryIndex {
    /// Creates an index over the advisory subtree at `root`. Nothing is read
    /// until the first query.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            generation: RwLock::new(Arc::new(Generation::default())),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Builds the store if this generation has not been built yet and
    /// returns it. Callers arriving while a build is running wait for that
    /// build instead of starting another.
    pub async fn ensure_indexed(&self) -> Arc<AdvisoryStore> {
        self.current().await.store
    }

    /// Statistics from the current generation's build.
    pub async fn stats(&self) -> IndexStats {
        self.current().await.stats
    }

    pub async fn is_indexed(&self) -> bool {
        self.generation.read().await.built.initialized()
    }

    /// Drops the current store. The next query triggers a new build.
    pub async fn invalidate(&self) {
        *self.generation.write().await = Arc::new(Generation::default());
        info!("Advisory index invalidated");
    }

    /// Invalidates and immediately rebuilds.
    pub async fn rebuild(&self) -> IndexStats {
        self.invalidate().await;
        self.stats().await
    }

    /// Number of tree walks performed by this index so far.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub async fn list(&self, options: &AdvisoryListOptions) -> Vec<Advisory> {
        let store = self.ensure_indexed().await;
        query::list(&store, options)
    }

    pub async fn get(&self, ghsa_id: &str) -> Option<Advisory> {
        let store = self.ensure_indexed().await;
        query::get(&store, ghsa_id)
    }

    pub async fn search(&self, text: &str, options: &SearchOptions) -> Vec<Advisory> {
        let store = self.ensure_indexed().await;
        query::search(&store, text, options)
    }

    async fn current(&self) -> Built {
        let generation = self.generation.read().await.clone();
        generation.built.get_or_init(|| self.build()).await.clone()
    }

    async fn build(&self) -> Built {
        self.builds.fetch_add(1, Ordering::SeqCst);
        info!("Building advisory index from {}", self.root.display());

        let root = self.root.clone();
        match tokio::task::spawn_blocking(move || load_tree(&root)).await {
            Ok((store, stats)) => Built {
                store: Arc::new(store),
                stats,
            },
            Err(e) => {
                error!("Advisory index build aborted: {}", e);
                Built {
                    store: Arc::new(AdvisoryStore::default()),
                    stats: IndexStats::default(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree_with(ids: &[&str]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for id in ids {
            let body = serde_json::json!({
                "id": id,
                "summary": format!("summary {}", id),
                "published": "2026-01-01T00:00:00Z",
            });
            fs::write(tmp.path().join(format!("{}.json", id)), body.to_string()).unwrap();
        }
        tmp
    }

    #[tokio::test]
    async fn test_ensure_indexed_is_idempotent() {
        let tmp = tree_with(&["GHSA-a", "GHSA-b"]);
        let index = AdvisoryIndex::new(tmp.path());

        assert!(!index.is_indexed().await);
        let first = index.ensure_indexed().await;
        let second = index.ensure_indexed().await;

        assert!(index.is_indexed().await);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);
        assert_eq!(index.build_count(), 1);
    }

    #[tokio::test]
    async fn test_store_does_not_see_new_files_until_invalidated() {
        let tmp = tree_with(&["GHSA-a"]);
        let index = AdvisoryIndex::new(tmp.path());
        assert_eq!(index.ensure_indexed().await.len(), 1);

        let body = serde_json::json!({ "id": "GHSA-b" });
        fs::write(tmp.path().join("GHSA-b.json"), body.to_string()).unwrap();
        assert!(index.get("GHSA-b").await.is_none());

        index.invalidate().await;
        assert!(!index.is_indexed().await);
        assert!(index.get("GHSA-b").await.is_some());
        assert_eq!(index.build_count(), 2);
    }

    #[tokio::test]
    async fn test_rebuild_returns_fresh_stats() {
        let tmp = tree_with(&["GHSA-a", "GHSA-b", "GHSA-c"]);
        let index = AdvisoryIndex::new(tmp.path());
        index.ensure_indexed().await;

        fs::remove_file(tmp.path().join("GHSA-c.json")).unwrap();
        let stats = index.rebuild().await;
        assert_eq!(stats.indexed, 2);
        assert_eq!(index.build_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_callers_share_one_build() {
        let tmp = tree_with(&["GHSA-a", "GHSA-b", "GHSA-c"]);
        let index = Arc::new(AdvisoryIndex::new(tmp.path()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let index = Arc::clone(&index);
                tokio::spawn(async move { index.ensure_indexed().await.len() })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 3);
        }
        assert_eq!(index.build_count(), 1);
    }
}
