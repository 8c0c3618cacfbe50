//! End-to-end flow: precache install, cache-first serving, lazy population,
//! and a version bump retiring the old bucket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;

use sajucache_core::cache::CacheManager;
use sajucache_core::models::{FetchedResponse, PrecacheManifest};
use sajucache_core::net::{FetchError, Fetcher};
use sajucache_core::worker::{FetchOutcome, Worker};

const ORIGIN: &str = "https://saju.example";

/// In-memory origin server: URL -> body, with a request counter.
struct ScriptedNet {
    routes: HashMap<String, Vec<u8>>,
    requests: AtomicUsize,
}

impl ScriptedNet {
    fn new(routes: &[(&str, &[u8])]) -> Self {
        Self {
            routes: routes
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_vec()))
                .collect(),
            requests: AtomicUsize::new(0),
        }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedNet {
    async fn fetch(&self, url: &Url) -> Result<FetchedResponse, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.routes.get(url.as_str()) {
            Some(body) => Ok(FetchedResponse {
                url: url.clone(),
                final_url: url.clone(),
                status: 200,
                content_type: Some("application/octet-stream".to_string()),
                allows_cross_origin: false,
                body: body.clone(),
            }),
            None => Err(FetchError::Transport(format!("no route to {}", url))),
        }
    }
}

fn worker_for(root: &std::path::Path, manifest: &PrecacheManifest, net: Arc<ScriptedNet>) -> Worker {
    Worker::new(
        Url::parse(ORIGIN).unwrap(),
        manifest.bucket_name(),
        CacheManager::new(root.to_path_buf()).unwrap(),
        net,
    )
}

fn manifest(version: &str, assets: &[&str]) -> PrecacheManifest {
    PrecacheManifest {
        version: version.to_string(),
        assets: assets.iter().map(|s| s.to_string()).collect(),
    }
}

#[tokio::test]
async fn offline_flow_across_a_version_bump() {
    let root = tempfile::tempdir().unwrap();

    // --- build v1 ships ---
    let v1_net = Arc::new(ScriptedNet::new(&[
        ("https://saju.example/index.html", b"<html>v1</html>".as_slice()),
        ("https://saju.example/assets/index-BT0rlPEg.js", b"console.log('v1')".as_slice()),
        ("https://saju.example/daily/fortune.json", b"{\"pillar\":\"geng-wu\"}".as_slice()),
    ]));
    let v1_manifest = manifest("v1", &["/index.html", "/assets/index-BT0rlPEg.js"]);
    let v1 = worker_for(root.path(), &v1_manifest, Arc::clone(&v1_net));

    let report = v1.install(&v1_manifest).await.unwrap();
    assert_eq!(report.bucket, "saju-static-v1");
    assert_eq!(report.assets, 2);
    assert_eq!(v1_net.requests(), 2);

    // Precached assets come back without touching the network
    match v1.handle_fetch("https://saju.example/index.html").await.unwrap() {
        FetchOutcome::Cached(hit) => assert_eq!(hit.body, b"<html>v1</html>"),
        other => panic!("expected cache hit, got {:?}", other),
    }
    assert_eq!(v1_net.requests(), 2);

    // A miss is fetched once, then served from the bucket
    assert!(matches!(
        v1.handle_fetch("https://saju.example/daily/fortune.json").await.unwrap(),
        FetchOutcome::Network(_)
    ));
    assert!(matches!(
        v1.handle_fetch("https://saju.example/daily/fortune.json").await.unwrap(),
        FetchOutcome::Cached(_)
    ));
    assert_eq!(v1_net.requests(), 3);

    // --- build v2 ships with a renamed bundle ---
    let v2_net = Arc::new(ScriptedNet::new(&[
        ("https://saju.example/index.html", b"<html>v2</html>".as_slice()),
        ("https://saju.example/assets/index-Ck3qR9aZ.js", b"console.log('v2')".as_slice()),
    ]));
    let v2_manifest = manifest("v2", &["/index.html", "/assets/index-Ck3qR9aZ.js"]);
    let v2 = worker_for(root.path(), &v2_manifest, Arc::clone(&v2_net));

    v2.install(&v2_manifest).await.unwrap();

    // Both buckets exist until activation
    let statuses = v2.status().unwrap();
    assert_eq!(statuses.len(), 2);
    assert!(statuses.iter().any(|s| s.name == "saju-static-v1" && !s.active));
    assert!(statuses.iter().any(|s| s.name == "saju-static-v2" && s.active));

    // Activation deletes the old version's bucket
    let report = v2.activate().await.unwrap();
    assert_eq!(report.removed, vec!["saju-static-v1"]);
    let statuses = v2.status().unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].name, "saju-static-v2");
    assert_eq!(statuses[0].entries, 2);

    // The new shell is served from the new bucket
    match v2.handle_fetch("https://saju.example/index.html").await.unwrap() {
        FetchOutcome::Cached(hit) => assert_eq!(hit.body, b"<html>v2</html>"),
        other => panic!("expected cache hit, got {:?}", other),
    }
}
