use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::AdvisoryStore;
use crate::error::IndexError;
use crate::model::{Advisory, OsvRecord};
use crate::normalize::normalize;

/// Counters collected while building the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub files_seen: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub dir_errors: usize,
    pub elapsed_ms: u64,
}

/// Walks `root` and loads every `.json` file into a fresh store.
///
/// Never fails as a whole: unreadable directories and bad files are logged
/// and counted, and a missing root yields an empty store. Entries are
/// visited in file-name order, so a duplicate identifier resolves to the
/// last path in that order.
pub fn load_tree(root: &Path) -> (AdvisoryStore, IndexStats) {
    let started = Instant::now();
    let mut store = AdvisoryStore::default();
    let mut stats = IndexStats::default();

    if !root.is_dir() {
        warn!("Advisory directory not found: {}", root.display());
    }

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // walkdir skips the failing subtree and carries on with siblings
                warn!("Skipping unreadable path: {}", e);
                stats.dir_errors += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_json(entry.path()) {
            continue;
        }
        stats.files_seen += 1;

        match load_file(entry.path()) {
            Ok(advisory) => {
                let id = advisory.ghsa_id.clone();
                if store.insert(advisory).is_some() {
                    debug!("Duplicate advisory {} replaced by {}", id, entry.path().display());
                    stats.duplicates += 1;
                }
            }
            Err(e) => {
                warn!("{}", e);
                stats.skipped += 1;
            }
        }
    }

    stats.indexed = store.len();
    stats.elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        "Indexed {} advisories from {} ({} skipped, {} directory errors) in {}ms",
        stats.indexed,
        root.display(),
        stats.skipped,
        stats.dir_errors,
        stats.elapsed_ms
    );

    (store, stats)
}

/// Reads, parses and normalizes a single advisory file.
pub fn load_file(path: &Path) -> Result<Advisory, IndexError> {
    let content = fs::read_to_string(path).map_err(|source| IndexError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let record: OsvRecord = serde_json::from_str(&content).map_err(|source| IndexError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(normalize(&record))
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_advisory(dir: &Path, rel: &str, id: &str, summary: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let body = serde_json::json!({
            "id": id,
            "summary": summary,
            "published": "2026-01-01T00:00:00Z",
            "modified": "2026-01-02T00:00:00Z",
        });
        fs::write(&path, body.to_string()).unwrap();
        path
    }

    #[test]
    fn test_one_malformed_file_among_many() {
        let tmp = TempDir::new().unwrap();
        for i in 0..99 {
            let id = format!("GHSA-test-{:04}", i);
            write_advisory(tmp.path(), &format!("2026/01/{0}/{0}.json", id), &id, "ok");
        }
        let broken = tmp.path().join("2026/01/GHSA-broken/GHSA-broken.json");
        fs::create_dir_all(broken.parent().unwrap()).unwrap();
        fs::write(&broken, "{ not json").unwrap();

        let (store, stats) = load_tree(tmp.path());

        assert_eq!(store.len(), 99);
        assert_eq!(stats.files_seen, 100);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.indexed, 99);
    }

    #[test]
    fn test_schema_violation_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write_advisory(tmp.path(), "a/GHSA-a.json", "GHSA-a", "fine");
        fs::write(tmp.path().join("a/no-id.json"), r#"{"summary": "missing id"}"#).unwrap();

        let (store, stats) = load_tree(tmp.path());
        assert_eq!(store.len(), 1);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_non_json_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        write_advisory(tmp.path(), "x/GHSA-x.json", "GHSA-x", "x");
        fs::write(tmp.path().join("x/README.md"), "# notes").unwrap();
        fs::write(tmp.path().join("x/GHSA-x.json.bak"), "garbage").unwrap();

        let (store, stats) = load_tree(tmp.path());
        assert_eq!(store.len(), 1);
        assert_eq!(stats.files_seen, 1);
        assert_eq!(stats.skipped, 0);
    }

    #[test]
    fn test_json_extension_is_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        write_advisory(tmp.path(), "u/GHSA-upper.JSON", "GHSA-upper", "upper");
        write_advisory(tmp.path(), "u/GHSA-mixed.Json", "GHSA-mixed", "mixed");

        let (store, stats) = load_tree(tmp.path());
        assert_eq!(store.len(), 2);
        assert_eq!(stats.files_seen, 2);
        assert!(store.get("GHSA-upper").is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_skips_only_that_subtree() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        write_advisory(tmp.path(), "a/GHSA-a.json", "GHSA-a", "a");
        write_advisory(tmp.path(), "b/GHSA-b.json", "GHSA-b", "b");
        write_advisory(tmp.path(), "c/GHSA-c.json", "GHSA-c", "c");

        let locked = tmp.path().join("b");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not apply to root.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let (store, stats) = load_tree(tmp.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(stats.dir_errors, 1);
        assert!(store.get("GHSA-a").is_some());
        assert!(store.get("GHSA-b").is_none());
        assert!(store.get("GHSA-c").is_some());
    }

    #[test]
    fn test_missing_root_yields_empty_store() {
        let tmp = TempDir::new().unwrap();
        let (store, stats) = load_tree(&tmp.path().join("does-not-exist"));
        assert!(store.is_empty());
        assert_eq!(stats.indexed, 0);
    }

    #[test]
    fn test_duplicate_id_last_path_wins() {
        let tmp = TempDir::new().unwrap();
        write_advisory(tmp.path(), "a/GHSA-dup.json", "GHSA-dup", "from a");
        write_advisory(tmp.path(), "b/GHSA-dup.json", "GHSA-dup", "from b");

        let (store, stats) = load_tree(tmp.path());
        assert_eq!(store.len(), 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(store.get("GHSA-dup").unwrap().summary, "from b");
    }

    #[test]
    fn test_load_file_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "[]").unwrap();

        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, IndexError::Json { .. }));
        assert!(err.to_string().contains("bad.json"));
    }
}
