//! yEnc article decode worker for Usenet downloads
//!
//! Fetched article bodies are queued on a single decode worker which parses
//! the yEnc envelope, decodes and CRC-checks the payload and settles the
//! outcome: the payload goes to the article cache and the article is
//! registered with the job queue, or the article is retried on another
//! server. Damaged jobs get extra repair volumes queued early, and the
//! worker throttles the fetch layer when the cache fills up.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use yenc_decoder::cache::MemoryArticleCache;
//! use yenc_decoder::throttle::SharedThrottle;
//! use yenc_decoder::yenc::encode_article;
//! use yenc_decoder::{
//!     Article, DecodeRequest, Decoder, DecoderConfig, Job, JobQueue, NzbFile, ServerConfig,
//!     ServerPool,
//! };
//!
//! struct Queue;
//!
//! impl JobQueue for Queue {
//!     fn register_article(&self, _article: &Arc<Article>, _found: bool) {}
//! }
//!
//! let cache = Arc::new(MemoryArticleCache::new(1024 * 1024));
//! let (decoder, _handle) = Decoder::new(
//!     DecoderConfig::default(),
//!     Arc::new(ServerPool::new(vec![ServerConfig::new("news.example.com", 563, 0)])),
//!     cache.clone(),
//!     Arc::new(SharedThrottle::new()),
//!     Arc::new(Queue),
//! )
//! .unwrap();
//!
//! let article = Arc::new(Article::new("<part1@example.com>", 5));
//! let file = Arc::new(NzbFile::new("\"hello.txt\" yEnc (1/1)", vec![article.clone()]));
//! let job = Arc::new(Job::new("hello", vec![file.clone()]));
//! let lines = encode_article(b"hello", "hello.txt", 128, None).unwrap();
//!
//! let verdict = decoder.process(&DecodeRequest::new(job, file.clone(), article, lines));
//! assert!(verdict.found);
//! assert_eq!(file.filename(), "hello.txt");
//! assert_eq!(cache.load("<part1@example.com>"), Some(b"hello".to_vec()));
//! ```

/// Article cache contract and an in-memory cache
pub mod cache;
/// Decode outcome classification
pub mod classify;
mod config;
mod decoder;
mod error;
/// Cross-server retry for failed articles
pub mod failover;
mod job;
mod queue;
/// Prospective repair volume download
pub mod repair;
/// Server pool with priority tiers
pub mod servers;
/// Fetch throttling
pub mod throttle;
/// yEnc envelope parsing, decoding and encoding
pub mod yenc;

pub use cache::{ArticleCache, MemoryArticleCache};
pub use classify::{DecodeStatus, Presence, Verdict};
pub use config::{DecoderConfig, MAX_DECODE_QUEUE, ServerConfig};
pub use decoder::{DecodeRequest, Decoder, DecoderEvent, DecoderHandle};
pub use error::{BadYencKind, DecodeError, DecoderError, Result};
pub use failover::{RetryTarget, search_new_server, select_retry_server};
pub use job::{Article, ArticleLog, FileType, Job, JobStatus, NzbFile};
pub use queue::JobQueue;
pub use servers::{ServerInfo, ServerPool};
pub use throttle::{FetchThrottle, SharedThrottle};
pub use yenc::{DecodedArticle, decode_article, encode_article};
