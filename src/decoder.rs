//! The decode worker
//!
//! A single dedicated thread owns the decode queue and handles one article
//! at a time, so all decode-time changes to articles, files and jobs happen
//! on that thread. Producers queue articles through a [`DecoderHandle`]; every
//! enqueue and dequeue also steers the fetch layer through the
//! [`FetchThrottle`], depending on queue depth and free cache space.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use yenc_decoder::cache::MemoryArticleCache;
//! use yenc_decoder::throttle::SharedThrottle;
//! use yenc_decoder::{
//!     Article, DecodeRequest, Decoder, DecoderConfig, Job, JobQueue, NzbFile, ServerConfig,
//!     ServerPool,
//! };
//!
//! struct Queue;
//!
//! impl JobQueue for Queue {
//!     fn register_article(&self, article: &Arc<Article>, found: bool) {
//!         println!("{} finished (found: {})", article, found);
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let servers = Arc::new(ServerPool::new(vec![ServerConfig::new("news.example.com", 563, 0)]));
//! let (decoder, handle) = Decoder::new(
//!     DecoderConfig::default(),
//!     servers,
//!     Arc::new(MemoryArticleCache::new(64 * 1024 * 1024)),
//!     Arc::new(SharedThrottle::new()),
//!     Arc::new(Queue),
//! )?;
//! let worker = decoder.spawn();
//!
//! let article = Arc::new(Article::new("<part1@example.com>", 384_000));
//! let file = Arc::new(NzbFile::new("file.rar", vec![article.clone()]));
//! let job = Arc::new(Job::new("job", vec![file.clone()]));
//! let lines = vec![b"=ybegin line=128 size=0 name=file.rar".to_vec(), b"=yend size=0".to_vec()];
//! handle.decode(DecodeRequest::new(job, file, article, lines))?;
//!
//! handle.stop()?;
//! worker.await?;
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::ArticleCache;
use crate::classify::{Classifier, Verdict};
use crate::config::DecoderConfig;
use crate::error::{BadYencKind, DecodeError, DecoderError, Result};
use crate::job::{Article, FileType, Job, NzbFile};
use crate::queue::JobQueue;
use crate::repair::acquire_repair_blocks;
use crate::servers::ServerPool;
use crate::throttle::FetchThrottle;
use crate::yenc::{DecodedArticle, decode_article};

/// One fetched article waiting to be decoded
#[derive(Debug, Clone)]
pub struct DecodeRequest {
    /// Job owning the article
    pub job: Arc<Job>,
    /// File owning the article
    pub file: Arc<NzbFile>,
    /// The article
    pub article: Arc<Article>,
    /// Raw response lines, without line terminators
    pub lines: Vec<Vec<u8>>,
}

impl DecodeRequest {
    /// Bundle an article with its raw response
    pub fn new(job: Arc<Job>, file: Arc<NzbFile>, article: Arc<Article>, lines: Vec<Vec<u8>>) -> Self {
        Self {
            job,
            file,
            article,
            lines,
        }
    }

    /// Bytes of raw data carried
    pub fn size(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }
}

/// Notifications published by the decode worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    /// A UUencoded article was seen; the job has been paused
    UuencodeDetected {
        /// Job name
        job: String,
    },
    /// An article was finished as not found
    ArticleMissing {
        /// Job name
        job: String,
        /// Message-ID of the article
        article: String,
    },
    /// Held-back repair volumes were added to a job
    RepairBlocksAdded {
        /// Job name
        job: String,
        /// File whose damage triggered the addition
        file: String,
        /// Number of repair blocks added
        blocks: u64,
    },
}

enum Message {
    Decode(Box<DecodeRequest>),
    Shutdown,
}

struct Shared {
    config: DecoderConfig,
    cache: Arc<dyn ArticleCache>,
    throttle: Arc<dyn FetchThrottle>,
    depth: AtomicUsize,
    events: broadcast::Sender<DecoderEvent>,
}

/// Producer side of the decode queue
///
/// Cheap to clone; all clones feed the same worker.
#[derive(Clone)]
pub struct DecoderHandle {
    tx: mpsc::UnboundedSender<Message>,
    shared: Arc<Shared>,
}

impl DecoderHandle {
    /// Queue an article for decoding
    ///
    /// Never blocks. When the cache has no room for the article and the
    /// queue is deeper than the configured high-water mark, the fetch layer
    /// is delayed.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::QueueClosed`] if the worker has stopped.
    pub fn decode(&self, request: DecodeRequest) -> Result<()> {
        let size = request.size();
        let depth = self.shared.depth.fetch_add(1, Ordering::AcqRel) + 1;
        if self.tx.send(Message::Decode(Box::new(request))).is_err() {
            self.shared.depth.fetch_sub(1, Ordering::AcqRel);
            return Err(DecoderError::QueueClosed);
        }

        // A full cache still lets a few articles into the queue
        if !self.shared.cache.reserve_space(size) && depth > self.shared.config.max_decode_queue {
            self.shared.throttle.delay();
        }
        Ok(())
    }

    /// Ask the worker to exit once it reaches this point of the queue
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::QueueClosed`] if the worker has already stopped.
    pub fn stop(&self) -> Result<()> {
        self.tx
            .send(Message::Shutdown)
            .map_err(|_| DecoderError::QueueClosed)
    }

    /// Number of articles waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.shared.depth.load(Ordering::Acquire)
    }

    /// Subscribe to worker notifications
    pub fn subscribe(&self) -> broadcast::Receiver<DecoderEvent> {
        self.shared.events.subscribe()
    }
}

impl std::fmt::Debug for DecoderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderHandle")
            .field("queue_len", &self.queue_len())
            .finish()
    }
}

/// Consumer side of the decode queue
pub struct Decoder {
    rx: mpsc::UnboundedReceiver<Message>,
    shared: Arc<Shared>,
    servers: Arc<ServerPool>,
    job_queue: Arc<dyn JobQueue>,
}

impl Decoder {
    /// Create a worker and the handle feeding it
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidConfig`] if `config` does not validate.
    pub fn new(
        config: DecoderConfig,
        servers: Arc<ServerPool>,
        cache: Arc<dyn ArticleCache>,
        throttle: Arc<dyn FetchThrottle>,
        job_queue: Arc<dyn JobQueue>,
    ) -> Result<(Self, DecoderHandle)> {
        config.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity);
        let shared = Arc::new(Shared {
            config,
            cache,
            throttle,
            depth: AtomicUsize::new(0),
            events,
        });

        let decoder = Self {
            rx,
            shared: shared.clone(),
            servers,
            job_queue,
        };
        Ok((decoder, DecoderHandle { tx, shared }))
    }

    /// Subscribe to worker notifications
    pub fn subscribe(&self) -> broadcast::Receiver<DecoderEvent> {
        self.shared.events.subscribe()
    }

    /// Run the worker on a dedicated blocking thread
    ///
    /// Decoding and checksumming are CPU bound, so they stay off the async
    /// worker threads that run the fetch layer.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || self.run())
    }

    /// Process queued articles until a stop request or until every handle is gone
    ///
    /// Blocks the calling thread while the queue is empty. Must not be called
    /// from within an async context; use [`Decoder::spawn`] there.
    pub fn run(mut self) {
        loop {
            let request = match self.rx.blocking_recv() {
                Some(Message::Decode(request)) => request,
                Some(Message::Shutdown) => {
                    debug!("Decoder stop requested");
                    break;
                }
                None => {
                    debug!("All decoder handles dropped");
                    break;
                }
            };

            let depth = self
                .shared
                .depth
                .fetch_sub(1, Ordering::AcqRel)
                .saturating_sub(1);

            // Check if the space that's now free lets the fetch layer continue
            let freed = self.shared.cache.free_reserve_space(request.size());
            if (freed || depth < self.shared.config.max_decode_queue)
                && self.shared.throttle.is_delayed()
            {
                self.shared.throttle.undelay();
            }

            self.process(&request);
        }
    }

    /// Decode one article and settle its outcome
    ///
    /// Moves the payload into the cache, then updates the file and job and
    /// either retries the article on another server or registers it with the
    /// job queue.
    pub fn process(&self, request: &DecodeRequest) -> Verdict {
        let DecodeRequest {
            job,
            file,
            article,
            lines,
        } = request;
        let art_id = article.message_id();

        let outcome = if lines.is_empty() {
            Err(DecodeError::EmptyResponse)
        } else if job.is_precheck() {
            Err(DecodeError::BadYenc(BadYencKind::Precheck))
        } else {
            debug!("Decoding {}", art_id);
            decode_guarded(lines)
        };
        self.apply_envelope(job, file, &outcome);

        let servers = self.servers.snapshot();
        let classifier = Classifier {
            article,
            file,
            job,
            servers: &servers,
            job_queue: self.job_queue.as_ref(),
        };
        let mut verdict = classifier.classify(lines, outcome);

        // Counts and logs apply only once the payload is stored
        if let Some(data) = verdict.data.take().filter(|data| !data.is_empty()) {
            if let Err(e) = self.shared.cache.save_article(article, data) {
                warn!("Decoding {} failed: {}", art_id, e);
                self.shared.throttle.pause();
                article.set_fetcher(None);
                self.job_queue.reset_try_lists(file, job);
                verdict.register = false;
                verdict.counted = false;
                verdict.log = None;
                return verdict;
            }
        }

        if verdict.counted {
            file.inc_article_count();
        }
        if let Some(log) = verdict.log {
            job.inc_log(log, art_id);
        }

        if verdict.is_damage() && self.shared.config.prospective_par_download && job.has_extra_pars() {
            let blocks = acquire_repair_blocks(job, file);
            if blocks > 0 {
                self.emit(DecoderEvent::RepairBlocksAdded {
                    job: job.name().to_string(),
                    file: file.filename(),
                    blocks,
                });
            }
        }

        if verdict.register {
            self.job_queue.register_article(article, verdict.found);
            if !verdict.found {
                self.emit(DecoderEvent::ArticleMissing {
                    job: job.name().to_string(),
                    article: art_id.to_string(),
                });
            }
        }

        verdict
    }

    fn apply_envelope(
        &self,
        job: &Job,
        file: &NzbFile,
        outcome: &std::result::Result<Option<DecodedArticle>, DecodeError>,
    ) {
        let name = match outcome {
            Ok(Some(decoded)) => decoded.name.as_deref(),
            Err(DecodeError::Crc { name, .. }) => name.as_deref(),
            Err(DecodeError::BadYenc(BadYencKind::Uuencoded)) => {
                file.set_file_type(FileType::Uu);
                if job.pause() {
                    warn!(
                        "UUencode detected, only yEnc encoding is supported [{}]",
                        job.name()
                    );
                    self.emit(DecoderEvent::UuencodeDetected {
                        job: job.name().to_string(),
                    });
                }
                return;
            }
            _ => return,
        };

        file.set_file_type(FileType::Yenc);
        if let Some(name) = name {
            if file.set_yenc_filename(name) {
                debug!("Renamed {} from yEnc header", name);
            }
        }
    }

    fn emit(&self, event: DecoderEvent) {
        // No subscribers is fine
        let _ = self.shared.events.send(event);
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("config", &self.shared.config)
            .field("servers", &self.servers)
            .finish()
    }
}

/// Decode with any panic turned into [`DecodeError::Unknown`]
fn decode_guarded(lines: &[Vec<u8>]) -> std::result::Result<Option<DecodedArticle>, DecodeError> {
    panic::catch_unwind(AssertUnwindSafe(|| decode_article(lines)))
        .unwrap_or_else(|payload| Err(DecodeError::Unknown(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic during decode".to_string()
    }
}
