//! Shared doubles for the decoder integration tests

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use yenc_decoder::{
    Article, ArticleCache, DecodeRequest, Decoder, DecoderConfig, DecoderHandle, FetchThrottle,
    Job, JobQueue, NzbFile, ServerConfig, ServerPool,
};

/// Install a log subscriber honouring RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Job queue that remembers every registration
#[derive(Default)]
pub struct RecordingQueue {
    registered: Mutex<Vec<(String, bool)>>,
    threads: Mutex<Vec<ThreadId>>,
    resets: AtomicUsize,
}

impl RecordingQueue {
    pub fn registered(&self) -> Vec<(String, bool)> {
        self.registered.lock().unwrap().clone()
    }

    /// Threads the registrations were made on
    pub fn threads(&self) -> Vec<ThreadId> {
        self.threads.lock().unwrap().clone()
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl JobQueue for RecordingQueue {
    fn register_article(&self, article: &Arc<Article>, found: bool) {
        self.threads.lock().unwrap().push(thread::current().id());
        self.registered
            .lock()
            .unwrap()
            .push((article.message_id().to_string(), found));
    }

    fn reset_try_lists(&self, file: &NzbFile, job: &Job) {
        self.resets.fetch_add(1, Ordering::SeqCst);
        file.reset_try_list();
        job.reset_try_list();
    }
}

/// Cache whose answers are set by the test
pub struct ScriptedCache {
    pub room_on_reserve: AtomicBool,
    pub room_on_free: AtomicBool,
    pub fail_saves: AtomicBool,
    pub reserved: AtomicUsize,
    pub freed: AtomicUsize,
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl Default for ScriptedCache {
    fn default() -> Self {
        Self {
            room_on_reserve: AtomicBool::new(true),
            room_on_free: AtomicBool::new(true),
            fail_saves: AtomicBool::new(false),
            reserved: AtomicUsize::new(0),
            freed: AtomicUsize::new(0),
            saved: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedCache {
    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().unwrap().clone()
    }
}

impl ArticleCache for ScriptedCache {
    fn reserve_space(&self, size: usize) -> bool {
        self.reserved.fetch_add(size, Ordering::SeqCst);
        self.room_on_reserve.load(Ordering::SeqCst)
    }

    fn free_reserve_space(&self, size: usize) -> bool {
        self.freed.fetch_add(size, Ordering::SeqCst);
        self.room_on_free.load(Ordering::SeqCst)
    }

    fn save_article(&self, article: &Article, data: Vec<u8>) -> io::Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(io::Error::other("disk full"));
        }
        self.saved
            .lock()
            .unwrap()
            .push((article.message_id().to_string(), data));
        Ok(())
    }
}

/// Throttle that counts calls
#[derive(Default)]
pub struct CountingThrottle {
    delayed: AtomicBool,
    pub delays: AtomicUsize,
    pub undelays: AtomicUsize,
    pub pauses: AtomicUsize,
}

impl FetchThrottle for CountingThrottle {
    fn delay(&self) {
        self.delays.fetch_add(1, Ordering::SeqCst);
        self.delayed.store(true, Ordering::SeqCst);
    }

    fn undelay(&self) {
        self.undelays.fetch_add(1, Ordering::SeqCst);
        self.delayed.store(false, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn is_delayed(&self) -> bool {
        self.delayed.load(Ordering::SeqCst)
    }
}

/// A decoder wired to recording doubles
pub struct Harness {
    pub decoder: Decoder,
    pub handle: DecoderHandle,
    pub pool: Arc<ServerPool>,
    pub queue: Arc<RecordingQueue>,
    pub cache: Arc<ScriptedCache>,
    pub throttle: Arc<CountingThrottle>,
}

impl Harness {
    /// Servers are given as (host, priority); ids are `host:119`
    pub fn new(servers: &[(&str, u32)]) -> Self {
        Self::with_config(servers, DecoderConfig::default())
    }

    pub fn with_config(servers: &[(&str, u32)], config: DecoderConfig) -> Self {
        init_tracing();
        let pool = Arc::new(ServerPool::new(
            servers
                .iter()
                .map(|(host, priority)| ServerConfig::new(*host, 119, *priority))
                .collect(),
        ));
        let queue = Arc::new(RecordingQueue::default());
        let cache = Arc::new(ScriptedCache::default());
        let throttle = Arc::new(CountingThrottle::default());
        let (decoder, handle) = Decoder::new(
            config,
            pool.clone(),
            cache.clone(),
            throttle.clone(),
            queue.clone(),
        )
        .unwrap();

        Self {
            decoder,
            handle,
            pool,
            queue,
            cache,
            throttle,
        }
    }
}

/// A job with one file holding one article, fetched from `fetcher`
pub struct Download {
    pub job: Arc<Job>,
    pub file: Arc<NzbFile>,
    pub article: Arc<Article>,
}

impl Download {
    pub fn new(fetcher: &str) -> Self {
        Self::build(fetcher, false)
    }

    pub fn precheck(fetcher: &str) -> Self {
        Self::build(fetcher, true)
    }

    fn build(fetcher: &str, precheck: bool) -> Self {
        let article = Arc::new(Article::new("<part1of1@example.com>", 1024));
        article.set_fetcher(Some(fetcher.to_string()));
        let file = Arc::new(NzbFile::new(
            "\"my.download.rar\" yEnc (1/1)",
            vec![article.clone()],
        ));
        let job = Job::new("My.Download", vec![file.clone()]).with_precheck(precheck);
        Self {
            job: Arc::new(job),
            file,
            article,
        }
    }

    pub fn request(&self, lines: Vec<Vec<u8>>) -> DecodeRequest {
        DecodeRequest::new(
            self.job.clone(),
            self.file.clone(),
            self.article.clone(),
            lines,
        )
    }
}

/// Lines from string literals
pub fn text(lines: &[&str]) -> Vec<Vec<u8>> {
    lines.iter().map(|line| line.as_bytes().to_vec()).collect()
}
