//! Integration test: cache, ledger and the generate flow against every store
//! backend, with stub collaborators standing in for the external services.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use mindmap_core::cache::ContentCache;
use mindmap_core::error::{Error, Result};
use mindmap_core::generation::ContentGenerator;
use mindmap_core::images::{ImageResult, ImageSearch};
use mindmap_core::ledger::UserMapLedger;
use mindmap_core::model::mindmap::{CachedMapKey, MindMapRecord};
use mindmap_core::model::user::LoginProfile;
use mindmap_core::query::MindMapEngine;
use mindmap_core::query::generate::GenerateRequest;
use mindmap_core::render::DiagramRenderer;
use mindmap_core::storage::KeyValueStore;
use mindmap_core::storage::duckdb::DuckDbStore;
use mindmap_core::storage::memory::MemoryStore;

const USER: &str = "ada@example.com";

fn stores() -> Vec<(&'static str, Arc<dyn KeyValueStore>)> {
    let memory: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let duckdb: Arc<dyn KeyValueStore> = Arc::new(DuckDbStore::open_in_memory().unwrap());
    vec![("memory", memory), ("duckdb", duckdb)]
}

struct StubGenerator {
    calls: AtomicUsize,
    response: String,
}

impl StubGenerator {
    fn new(response: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: response.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ContentGenerator for StubGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

struct StubRenderer {
    fail: bool,
}

#[async_trait::async_trait]
impl DiagramRenderer for StubRenderer {
    async fn render(&self, source: &str) -> Result<Vec<u8>> {
        if self.fail {
            return Err(Error::Render("renderer offline".to_string()));
        }
        Ok(format!("<svg><!-- {} --></svg>", source.len()).into_bytes())
    }
}

struct StubImages;

#[async_trait::async_trait]
impl ImageSearch for StubImages {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ImageResult>> {
        Ok((0..max_results)
            .map(|i| ImageResult {
                url: format!("https://img.example.com/{i}.jpg"),
                alt: format!("{query} image"),
            })
            .collect())
    }
}

const FENCED: &str = "Sure!\n```mermaid\nmindmap\n  root((Rust))\n    Ownership\n```";

fn engine(store: Arc<dyn KeyValueStore>, generator: Arc<StubGenerator>) -> MindMapEngine {
    MindMapEngine::new(
        store,
        generator,
        Arc::new(StubRenderer { fail: false }),
        Arc::new(StubImages),
    )
    .with_admin_email("admin@example.com")
}

// ========== Content cache ==========

#[tokio::test]
async fn test_cache_normalization_on_every_backend() {
    for (name, store) in stores() {
        let cache = ContentCache::new(store);
        cache.put("  Rust Lang ", "SIMPLE", "mindmap\n  a").await.unwrap();
        for (topic, map_type) in [("rust lang", "simple"), ("RUST LANG", " Simple\t")] {
            assert_eq!(
                cache.get(topic, map_type).await.unwrap().as_deref(),
                Some("mindmap\n  a"),
                "{name}: {topic:?}/{map_type:?}"
            );
        }
    }
}

#[tokio::test]
async fn test_cache_expiry_on_duckdb() {
    let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
    let cache = ContentCache::new(store.clone()).with_ttl(Duration::ZERO);
    cache.put("rust", "simple", "src").await.unwrap();
    assert!(cache.get("rust", "simple").await.unwrap().is_none());
    assert!(cache.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cache_remove_once_on_every_backend() {
    for (name, store) in stores() {
        let cache = ContentCache::new(store);
        cache.put("rust", "simple", "src").await.unwrap();
        assert!(cache.remove("Rust", "Simple").await.unwrap(), "{name}");
        assert!(!cache.remove("rust", "simple").await.unwrap(), "{name}");
        assert!(!cache.remove("never", "stored").await.unwrap(), "{name}");
    }
}

#[tokio::test]
async fn test_list_all_skips_foreign_keys() {
    for (name, store) in stores() {
        let cache = ContentCache::new(store.clone());
        cache.put("rust", "overview", "a").await.unwrap();
        cache.put(" RUST ", "Overview", "b").await.unwrap();
        store
            .set_with_ttl("mindmap:bad", "{}", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .set_with_ttl("mindmap:a:b:c", "{}", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            cache.list_all().await.unwrap(),
            vec![CachedMapKey {
                topic: "rust".to_string(),
                map_type: "overview".to_string(),
            }],
            "{name}"
        );
    }
}

#[tokio::test]
async fn test_duckdb_cache_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mindmap.duckdb");
    {
        let store = Arc::new(DuckDbStore::open(&path).unwrap());
        ContentCache::new(store.clone())
            .put("rust", "simple", "persisted")
            .await
            .unwrap();
        UserMapLedger::new(store)
            .insert(USER, &MindMapRecord::new("rust", "simple", "persisted"))
            .await
            .unwrap();
    }
    let store = Arc::new(DuckDbStore::open(&path).unwrap());
    assert_eq!(
        ContentCache::new(store.clone())
            .get("rust", "simple")
            .await
            .unwrap()
            .as_deref(),
        Some("persisted")
    );
    assert_eq!(UserMapLedger::new(store).count(USER).await.unwrap(), 1);
}

// ========== Ledger ==========

#[tokio::test]
async fn test_ledger_limit_two() {
    for (name, store) in stores() {
        let ledger = UserMapLedger::new(store);
        ledger.set_limit(USER, 2).await.unwrap();
        for topic in ["a", "b"] {
            ledger
                .insert(USER, &MindMapRecord::new(topic, "simple", "src"))
                .await
                .unwrap();
        }
        let err = ledger
            .insert(USER, &MindMapRecord::new("c", "simple", "src"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::QuotaExceeded { used: 2, limit: 2 }),
            "{name}: {err:?}"
        );
        assert_eq!(ledger.count(USER).await.unwrap(), 2, "{name}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_ledger_concurrent_inserts_respect_limit() {
    const LIMIT: usize = 3;
    const ATTEMPTS: usize = 12;
    const ROUNDS: usize = 20;

    for round in 0..ROUNDS {
        for (name, store) in stores() {
            let ledger = Arc::new(UserMapLedger::new(store));
            ledger.set_limit(USER, LIMIT).await.unwrap();
            let start = Arc::new(tokio::sync::Barrier::new(ATTEMPTS));

            let mut handles = Vec::new();
            for i in 0..ATTEMPTS {
                let ledger = ledger.clone();
                let start = start.clone();
                handles.push(tokio::spawn(async move {
                    start.wait().await;
                    ledger
                        .insert(USER, &MindMapRecord::new(&format!("t{i}"), "simple", "src"))
                        .await
                }));
            }

            let mut ok = 0;
            let mut rejected = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(()) => ok += 1,
                    Err(Error::QuotaExceeded { .. }) => rejected += 1,
                    Err(e) => panic!("{name} round {round}: unexpected error {e:?}"),
                }
            }
            assert_eq!(ok, LIMIT, "{name} round {round}");
            assert_eq!(rejected, ATTEMPTS - LIMIT, "{name} round {round}");
            assert_eq!(ledger.count(USER).await.unwrap(), LIMIT, "{name} round {round}");
        }
    }
}

#[tokio::test]
async fn test_raising_limit_admits_another_insert() {
    for (name, store) in stores() {
        let ledger = UserMapLedger::new(store);
        ledger.set_limit(USER, 2).await.unwrap();
        for topic in ["a", "b"] {
            ledger
                .insert(USER, &MindMapRecord::new(topic, "simple", "src"))
                .await
                .unwrap();
        }
        let third = MindMapRecord::new("c", "simple", "src");
        assert!(ledger.insert(USER, &third).await.is_err(), "{name}");

        ledger.set_limit(USER, 3).await.unwrap();
        ledger.insert(USER, &third).await.unwrap();
        assert_eq!(ledger.count(USER).await.unwrap(), 3, "{name}");
    }
}

#[tokio::test]
async fn test_ledgers_are_per_user() {
    for (name, store) in stores() {
        let ledger = UserMapLedger::new(store);
        ledger.set_limit(USER, 1).await.unwrap();
        ledger
            .insert(USER, &MindMapRecord::new("a", "simple", "src"))
            .await
            .unwrap();
        ledger
            .insert("bob@example.com", &MindMapRecord::new("a", "simple", "src"))
            .await
            .unwrap();
        assert_eq!(ledger.count("bob@example.com").await.unwrap(), 1, "{name}");
    }
}

// ========== Generate flow ==========

#[tokio::test]
async fn test_generate_miss_then_hit() {
    for (name, store) in stores() {
        let generator = Arc::new(StubGenerator::new(FENCED));
        let engine = engine(store, generator.clone());

        let first = engine
            .generate(USER, GenerateRequest::new("Rust", "simple"))
            .await
            .unwrap();
        assert!(!first.cached, "{name}");
        assert_eq!(first.mermaid_code, "mindmap\n  root((Rust))\n    Ownership");
        assert!(first.svg.starts_with("<svg"));

        let second = engine
            .generate(USER, GenerateRequest::new(" rust ", "SIMPLE"))
            .await
            .unwrap();
        assert!(second.cached, "{name}");
        assert_eq!(second.mermaid_code, first.mermaid_code);
        assert_ne!(second.mind_map_id, first.mind_map_id);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1, "{name}");

        // Cache hits still consume quota.
        assert_eq!(engine.ledger.count(USER).await.unwrap(), 2, "{name}");
        let maps = engine.list_mind_maps(USER).await.unwrap();
        assert_eq!(maps.len(), 2);
        assert_eq!(maps[0].id, second.mind_map_id);
    }
}

#[tokio::test]
async fn test_generate_hits_quota() {
    for (name, store) in stores() {
        let engine = engine(store, Arc::new(StubGenerator::new(FENCED)));
        engine.set_limit(USER, 2).await.unwrap();

        for topic in ["a", "b"] {
            engine
                .generate(USER, GenerateRequest::new(topic, "simple"))
                .await
                .unwrap();
        }
        let err = engine
            .generate(USER, GenerateRequest::new("c", "simple"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded { used: 2, limit: 2 }), "{name}");
        assert_eq!(engine.ledger.count(USER).await.unwrap(), 2);
    }
}

#[tokio::test]
async fn test_generate_caches_before_recording() {
    for (name, store) in stores() {
        let engine = engine(store, Arc::new(StubGenerator::new(FENCED)));
        engine.set_limit(USER, 0).await.unwrap();

        let err = engine
            .generate(USER, GenerateRequest::new("Rust", "simple"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded { .. }), "{name}");
        assert!(
            engine.cache.get("rust", "simple").await.unwrap().is_some(),
            "{name}"
        );
    }
}

#[tokio::test]
async fn test_generate_without_mermaid_fails_cleanly() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let engine = engine(store, Arc::new(StubGenerator::new("I cannot help with that.")));

    let err = engine
        .generate(USER, GenerateRequest::new("Rust", "simple"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Generation(_)));
    assert!(err.is_upstream());
    assert!(engine.cache.list_all().await.unwrap().is_empty());
    assert_eq!(engine.ledger.count(USER).await.unwrap(), 0);
}

#[tokio::test]
async fn test_render_failure_writes_nothing() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let engine = MindMapEngine::new(
        store,
        Arc::new(StubGenerator::new(FENCED)),
        Arc::new(StubRenderer { fail: true }),
        Arc::new(StubImages),
    );

    let err = engine
        .generate(USER, GenerateRequest::new("Rust", "simple"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Render(_)));
    assert!(engine.cache.get("rust", "simple").await.unwrap().is_none());
    assert_eq!(engine.ledger.count(USER).await.unwrap(), 0);
}

#[tokio::test]
async fn test_generate_validates_request() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let engine = engine(store, Arc::new(StubGenerator::new(FENCED)));
    for req in [
        GenerateRequest::new("", "simple"),
        GenerateRequest::new("Rust", "  "),
    ] {
        let err = engine.generate(USER, req).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}

// ========== Users and admin views ==========

#[tokio::test]
async fn test_admin_views() {
    for (name, store) in stores() {
        let engine = engine(store, Arc::new(StubGenerator::new(FENCED)));
        engine
            .login(&LoginProfile {
                email: USER.to_string(),
                name: "Ada".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        engine
            .generate(USER, GenerateRequest::new("Rust", "simple"))
            .await
            .unwrap();

        let sessions = engine.session_overview().await.unwrap();
        assert_eq!(sessions.len(), 1, "{name}");
        assert!(sessions[0].online);
        assert_eq!(sessions[0].mind_maps_used, 1);
        assert_eq!(sessions[0].mind_map_limit, 5);

        let stats = engine.stats().await.unwrap();
        assert_eq!(stats.total_users, 1, "{name}");
        assert_eq!(stats.online_users, 1);
        assert_eq!(stats.total_mind_maps, 1);

        engine.set_limit(USER, 9).await.unwrap();
        let users = engine.all_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].limit, 9);

        engine.reset_mind_maps(USER).await.unwrap();
        assert_eq!(engine.stats().await.unwrap().total_mind_maps, 0);

        engine.terminate_session(USER).await.unwrap();
        assert!(engine.session_overview().await.unwrap().is_empty());
        assert!(matches!(
            engine.terminate_session(USER).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }
}

#[tokio::test]
async fn test_stats_ignore_users_without_login() {
    for (name, store) in stores() {
        let engine = engine(store, Arc::new(StubGenerator::new(FENCED)));
        engine
            .login(&LoginProfile {
                email: USER.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        engine.set_limit("limited@example.com", 9).await.unwrap();
        engine.set_banned("banned@example.com", true).await.unwrap();
        // Generating stamps last_active and fills a ledger without a login.
        engine
            .generate("anonymous@example.com", GenerateRequest::new("Rust", "simple"))
            .await
            .unwrap();

        let stats = engine.stats().await.unwrap();
        assert_eq!(stats.total_users, 1, "{name}");
        assert_eq!(stats.online_users, 0, "{name}");
        assert_eq!(stats.total_mind_maps, 0, "{name}");
        assert_eq!(
            stats.total_users,
            engine.session_overview().await.unwrap().len(),
            "{name}"
        );
    }
}

#[tokio::test]
async fn test_clear_cached_map() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let engine = engine(store, Arc::new(StubGenerator::new(FENCED)));
    engine
        .generate(USER, GenerateRequest::new("Rust", "simple"))
        .await
        .unwrap();

    assert_eq!(engine.cached_maps().await.unwrap().len(), 1);
    assert!(matches!(
        engine.clear_cached_map("", "simple").await.unwrap_err(),
        Error::Validation(_)
    ));
    engine.clear_cached_map("RUST", "simple").await.unwrap();
    assert!(matches!(
        engine.clear_cached_map("rust", "simple").await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn test_banned_user_is_refused() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let engine = engine(store, Arc::new(StubGenerator::new(FENCED)));
    engine.set_banned(USER, true).await.unwrap();
    let err = engine
        .login(&LoginProfile {
            email: USER.to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
}

#[tokio::test]
async fn test_current_user_and_images() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let engine = engine(store, Arc::new(StubGenerator::new(FENCED))).with_image_results(3);

    let me = engine.current_user("admin@example.com").await.unwrap();
    assert!(me.is_admin);
    assert_eq!(me.limit, 5);
    assert!(!engine.current_user(USER).await.unwrap().is_admin);

    assert_eq!(engine.related_images("rust").await.unwrap().len(), 3);
    assert!(matches!(
        engine.related_images("   ").await.unwrap_err(),
        Error::Validation(_)
    ));
}
