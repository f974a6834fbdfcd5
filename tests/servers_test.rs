//! Server pool and failover tests
//!
//! Tests for ServerPool ordering, activation and the retry server selection
//! built on its snapshots.

use yenc_decoder::{Article, ServerConfig, ServerPool, select_retry_server};

fn pool() -> ServerPool {
    ServerPool::new(vec![
        ServerConfig::new("backup.example.com", 119, 50),
        ServerConfig::new("news.example.com", 119, 100),
        ServerConfig::new("news2.example.com", 119, 100),
    ])
}

#[test]
fn test_server_pool_creation() {
    let pool = pool();
    assert_eq!(pool.server_count(), 3);
    // Highest priority first, configuration order within a tier
    assert_eq!(
        pool.server_ids(),
        vec![
            "news.example.com:119",
            "news2.example.com:119",
            "backup.example.com:119"
        ]
    );
}

#[test]
fn test_disabled_servers_start_inactive() {
    let mut config = ServerConfig::new("news.example.com", 563, 10);
    config.enabled = false;
    let pool = ServerPool::new(vec![config]);
    assert!(!pool.is_active("news.example.com:563"));
}

#[test]
fn test_set_active_unknown_server() {
    let pool = pool();
    assert!(!pool.set_active("unknown:119", false));
    assert!(pool.set_active("news.example.com:119", false));
    assert!(!pool.is_active("news.example.com:119"));
}

#[test]
fn test_snapshot_tiers() {
    let pool = pool();
    let snapshot = pool.snapshot();
    assert!(snapshot[0].is_highest(&snapshot));
    assert!(snapshot[1].is_highest(&snapshot));
    assert!(!snapshot[2].is_highest(&snapshot));

    // With the primaries down the backup becomes the top tier
    pool.set_active("news.example.com:119", false);
    pool.set_active("news2.example.com:119", false);
    let snapshot = pool.snapshot();
    assert!(snapshot[2].is_highest(&snapshot));
}

#[test]
fn test_retry_walks_primaries_then_fill() {
    let pool = pool();
    let article = Article::new("<a@b>", 1);
    let mut picked = Vec::new();

    while let Some(target) = select_retry_server(&pool.snapshot(), &article) {
        article.add_to_try_list(&target.server_id);
        picked.push((target.server_id, target.fill));
    }

    assert_eq!(
        picked,
        vec![
            ("news.example.com:119".to_string(), false),
            ("news2.example.com:119".to_string(), false),
            ("backup.example.com:119".to_string(), true),
        ]
    );
}

#[test]
fn test_retry_with_primary_down() {
    let pool = pool();
    pool.set_active("news.example.com:119", false);
    let article = Article::new("<a@b>", 1);
    article.add_to_try_list("news2.example.com:119");

    let target = select_retry_server(&pool.snapshot(), &article).unwrap();
    assert_eq!(target.server_id, "backup.example.com:119");
    assert!(target.fill);
}
