//! S5 (cache hit) and S6 (integrity tamper) from the scenario table, each
//! exercised against the public API rather than the unit-level internals.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pronuncia_core::pack::{self, CHECKSUMS_FILENAME};
use pronuncia_core::textref::{CacheConfig, TextRefCache, ToIpaOutput};

#[tokio::test]
async fn s5_second_lookup_is_a_cache_hit_and_does_not_recompute() {
    let cache = TextRefCache::new(CacheConfig {
        max_size: 10,
        ttl_seconds: None,
    });
    let calls = Arc::new(AtomicUsize::new(0));

    let make_compute = |calls: Arc<AtomicUsize>| {
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(ToIpaOutput {
                tokens: vec!["o".into(), "l".into(), "a".into()],
                meta: Default::default(),
            })
        }
    };

    let first = cache
        .get_or_compute("ola", "es", "lexicon", make_compute(calls.clone()))
        .await
        .unwrap();
    let second = cache
        .get_or_compute("ola", "es", "lexicon", make_compute(calls.clone()))
        .await
        .unwrap();

    assert_eq!(first.tokens, second.tokens);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = cache.stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[test]
fn s6_tampering_with_a_covered_file_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let inventory_path = dir.path().join("inventory.yaml");
    fs::write(&inventory_path, "consonants: [p, b, t, d, k, g]").unwrap();

    let checksums = pack::generate(dir.path(), None).unwrap();
    pack::write(dir.path(), &checksums).unwrap();

    // Tamper: append a byte to a file covered by the manifest.
    let mut contents = fs::read(&inventory_path).unwrap();
    contents.push(b'!');
    fs::write(&inventory_path, contents).unwrap();

    let result = pack::verify(dir.path(), &[]);
    assert!(!result.valid);
    assert_eq!(result.failed_files, vec!["inventory.yaml".to_string()]);
    assert!(dir.path().join(CHECKSUMS_FILENAME).exists());
}
