use advisory_index::index::AdvisoryIndex;
use advisory_index::mcp::McpServer;
use advisory_index::model::{AdvisoryListOptions, Ecosystem, ListParams, SearchOptions};
use advisory_index::source::{AdvisorySource, LocalSource};
use futures::future::join_all;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Writes a record the way github/advisory-database lays them out:
/// `<year>/<month>/<id>/<id>.json`.
fn write_record(root: &Path, record: &Value) {
    let id = record["id"].as_str().unwrap();
    let dir = root.join("2026").join("01").join(id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{}.json", id)), record.to_string()).unwrap();
}

/// 35 advisories published an hour apart, alternating npm and PyPI, plus one
/// file that is not valid JSON.
fn database() -> TempDir {
    let tmp = TempDir::new().unwrap();
    for i in 0..35u32 {
        let ecosystem = if i % 2 == 0 { "npm" } else { "PyPI" };
        let severity = if i == 7 { "CRITICAL" } else { "MODERATE" };
        write_record(
            tmp.path(),
            &json!({
                "id": format!("GHSA-test-{:04}-0000", i),
                "summary": format!("Advisory number {}", i),
                "details": "Remote code execution via crafted input.",
                "published": format!("2026-01-{:02}T{:02}:00:00Z", 1 + i / 24, i % 24),
                "modified": "2026-02-01T00:00:00Z",
                "affected": [{
                    "package": { "ecosystem": ecosystem, "name": format!("pkg-{}", i) },
                    "ranges": [{ "type": "ECOSYSTEM", "events": [{ "introduced": "0" }, { "fixed": "1.2.3" }] }]
                }],
                "database_specific": { "severity": severity }
            }),
        );
    }

    let broken = tmp.path().join("2026").join("01").join("GHSA-brok-en00-0000");
    fs::create_dir_all(&broken).unwrap();
    fs::write(broken.join("GHSA-brok-en00-0000.json"), "{ \"id\": ").unwrap();

    tmp
}

mod building {
    use super::*;

    #[tokio::test]
    async fn test_malformed_file_is_skipped() {
        let tmp = database();
        let index = AdvisoryIndex::new(tmp.path());

        let stats = index.stats().await;
        assert_eq!(stats.files_seen, 36);
        assert_eq!(stats.indexed, 35);
        assert_eq!(stats.skipped, 1);
        assert_eq!(index.ensure_indexed().await.len(), 35);
    }

    #[tokio::test]
    async fn test_concurrent_callers_trigger_one_build() {
        let tmp = database();
        let index = Arc::new(AdvisoryIndex::new(tmp.path()));

        let sizes = join_all((0..32).map(|_| {
            let index = Arc::clone(&index);
            async move { index.ensure_indexed().await.len() }
        }))
        .await;

        assert!(sizes.iter().all(|&n| n == 35));
        assert_eq!(index.build_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_root_yields_empty_results() {
        let tmp = TempDir::new().unwrap();
        let index = AdvisoryIndex::new(tmp.path().join("does-not-exist"));

        assert!(index.list(&AdvisoryListOptions::default()).await.is_empty());
        assert!(index.get("GHSA-test-0000-0000").await.is_none());
    }
}

mod querying {
    use super::*;

    #[tokio::test]
    async fn test_pagination_boundary() {
        let tmp = database();
        let source = LocalSource::new(tmp.path());

        let page = |n: usize| ListParams {
            page: Some(n),
            ..Default::default()
        };

        let first = source.list_advisories(&page(1).validate().unwrap()).await.unwrap();
        let second = source.list_advisories(&page(2).validate().unwrap()).await.unwrap();
        let third = source.list_advisories(&page(3).validate().unwrap()).await.unwrap();

        assert_eq!(first.len(), 30);
        assert_eq!(second.len(), 5);
        assert!(third.is_empty());

        // Newest first by default.
        assert_eq!(first[0].ghsa_id, "GHSA-test-0034-0000");
        assert_eq!(second[4].ghsa_id, "GHSA-test-0000-0000");
    }

    #[tokio::test]
    async fn test_filters_compose() {
        let tmp = database();
        let source = LocalSource::new(tmp.path());

        let options = ListParams {
            ecosystem: Some("pip".to_string()),
            published: Some("2026-01-02".to_string()),
            per_page: Some(100),
            ..Default::default()
        }
        .validate()
        .unwrap();

        let results = source.list_advisories(&options).await.unwrap();
        // Day two holds i = 24..=34, of which the odd ones are PyPI.
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|a| a.affects_ecosystem(Ecosystem::Pip)));
        assert!(results.iter().all(|a| a.published_at.starts_with("2026-01-02")));
    }

    #[tokio::test]
    async fn test_normalized_fields() {
        let tmp = database();
        let source = LocalSource::new(tmp.path());

        let advisory = source
            .get_advisory("GHSA-test-0007-0000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(advisory.severity, "critical");
        assert_eq!(advisory.vulnerabilities[0].vulnerable_version_range, ">= 0, < 1.2.3");
        assert_eq!(
            advisory.vulnerabilities[0].first_patched_version.as_deref(),
            Some("1.2.3")
        );
        assert_eq!(advisory.updated_at, "2026-02-01T00:00:00Z");
    }

    #[tokio::test]
    async fn test_search_keeps_store_order_and_truncates() {
        let tmp = database();
        let source = LocalSource::new(tmp.path());

        let options = SearchOptions {
            per_page: 3,
            ..Default::default()
        };
        let results = source
            .search_advisories("REMOTE CODE", &options)
            .await
            .unwrap();

        let ids: Vec<&str> = results.iter().map(|a| a.ghsa_id.as_str()).collect();
        assert_eq!(
            ids,
            ["GHSA-test-0000-0000", "GHSA-test-0001-0000", "GHSA-test-0002-0000"]
        );
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_files() {
        let tmp = database();
        let source = LocalSource::new(tmp.path());
        assert!(source.get_advisory("GHSA-late-0000-0000").await.unwrap().is_none());

        write_record(
            tmp.path(),
            &json!({ "id": "GHSA-late-0000-0000", "published": "2026-03-01T00:00:00Z" }),
        );
        source.refresh().await;

        assert!(source.get_advisory("GHSA-late-0000-0000").await.unwrap().is_some());
        assert_eq!(source.index().build_count(), 2);
    }
}

mod mcp {
    use super::*;

    #[tokio::test]
    async fn test_not_found_is_a_tool_error() {
        let tmp = database();
        let server = McpServer::new(Arc::new(LocalSource::new(tmp.path())));

        let request = json!({
            "jsonrpc": "2.0",
            "id": "req-1",
            "method": "tools/call",
            "params": { "name": "get_advisory", "arguments": { "ghsa_id": "GHSA-nope-nope-nope" } }
        });
        let reply = server.handle_message(&request.to_string()).await.unwrap();
        let response: Value = serde_json::from_str(&reply).unwrap();

        assert_eq!(response["id"], "req-1");
        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(
            response["result"]["content"][0]["text"],
            "Advisory GHSA-nope-nope-nope not found"
        );
    }
}
