//! Article cache contract and an in-memory implementation
//!
//! The decode worker reserves cache space for every article it queues and
//! releases the reservation when it picks the article up. Those two answers
//! drive the backpressure on the fetch layer.
//!
//! # Example
//!
//! ```
//! use yenc_decoder::cache::{ArticleCache, MemoryArticleCache};
//! use yenc_decoder::Article;
//!
//! let cache = MemoryArticleCache::new(1024);
//! assert!(cache.reserve_space(512));
//! assert!(!cache.reserve_space(1024)); // over the limit
//! assert!(cache.free_reserve_space(1024)); // room again
//!
//! let article = Article::new("<part1@example.com>", 3);
//! cache.save_article(&article, vec![1, 2, 3]).unwrap();
//! assert_eq!(cache.load("<part1@example.com>"), Some(vec![1, 2, 3]));
//! ```

use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, MutexGuard};

use crate::job::Article;

/// Storage for decoded article payloads
pub trait ArticleCache: Send + Sync {
    /// Reserve room for an article that is about to be decoded
    ///
    /// Returns false when the cache is (now) over its limit.
    fn reserve_space(&self, size: usize) -> bool;

    /// Release a reservation made by [`ArticleCache::reserve_space`]
    ///
    /// Returns true when the cache has room again.
    fn free_reserve_space(&self, size: usize) -> bool;

    /// Store a decoded payload
    ///
    /// # Errors
    ///
    /// Returns an IO error if the payload could not be stored.
    fn save_article(&self, article: &Article, data: Vec<u8>) -> io::Result<()>;
}

/// Byte-limited in-memory article cache
#[derive(Debug)]
pub struct MemoryArticleCache {
    /// Maximum number of bytes (stored + reserved)
    limit: usize,
    state: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    reserved: usize,
    stored: usize,
    articles: HashMap<String, Vec<u8>>,
}

impl CacheState {
    fn used(&self) -> usize {
        self.reserved + self.stored
    }
}

impl MemoryArticleCache {
    /// Create a cache holding at most `limit` bytes
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Remove and return a stored payload
    pub fn take(&self, message_id: &str) -> Option<Vec<u8>> {
        let mut state = self.state();
        let data = state.articles.remove(message_id)?;
        state.stored = state.stored.saturating_sub(data.len());
        Some(data)
    }

    /// Copy of a stored payload
    pub fn load(&self, message_id: &str) -> Option<Vec<u8>> {
        self.state().articles.get(message_id).cloned()
    }

    /// Check if a payload is stored
    pub fn contains(&self, message_id: &str) -> bool {
        self.state().articles.contains_key(message_id)
    }

    /// Number of stored payloads
    pub fn len(&self) -> usize {
        self.state().articles.len()
    }

    /// Check if nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently stored or reserved
    pub fn used(&self) -> usize {
        self.state().used()
    }

    /// Maximum number of bytes
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl ArticleCache for MemoryArticleCache {
    fn reserve_space(&self, size: usize) -> bool {
        let mut state = self.state();
        state.reserved += size;
        state.used() <= self.limit
    }

    fn free_reserve_space(&self, size: usize) -> bool {
        let mut state = self.state();
        state.reserved = state.reserved.saturating_sub(size);
        state.used() < self.limit
    }

    fn save_article(&self, article: &Article, data: Vec<u8>) -> io::Result<()> {
        let mut state = self.state();
        state.stored += data.len();
        if let Some(old) = state.articles.insert(article.message_id().to_string(), data) {
            state.stored = state.stored.saturating_sub(old.len());
        }
        Ok(())
    }
}
