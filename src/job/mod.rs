//! Download job model: jobs, their files and the files' articles
//!
//! Only the decode-time view of a job is modelled here: the fields the
//! decode worker reads or updates. Persistence belongs to the job queue.

mod article;
mod file;

pub use article::Article;
pub use file::{FileType, NzbFile};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Per-job failure logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArticleLog {
    /// Articles with a CRC error or a malformed envelope
    Bad,
    /// Articles missing from every server
    Missing,
    /// Articles removed from the server (DMCA, cancel, ...)
    Killed,
    /// Duplicate articles
    Duplicate,
}

impl ArticleLog {
    /// All log categories
    pub const ALL: [ArticleLog; 4] = [
        ArticleLog::Bad,
        ArticleLog::Missing,
        ArticleLog::Killed,
        ArticleLog::Duplicate,
    ];
}

/// Scheduling status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    /// Waiting or downloading
    #[default]
    Active,
    /// Paused by the user or by the decoder
    Paused,
}

/// A download job (one NZB)
#[derive(Debug)]
pub struct Job {
    name: String,
    precheck: bool,
    state: Mutex<JobState>,
}

#[derive(Debug, Default)]
struct JobState {
    files: Vec<Arc<NzbFile>>,
    extra_pars: BTreeMap<String, Vec<Arc<NzbFile>>>,
    status: JobStatus,
    logs: HashMap<ArticleLog, Vec<String>>,
    try_list: HashSet<String>,
}

impl Job {
    /// Create a job with its active files
    pub fn new(name: impl Into<String>, files: Vec<Arc<NzbFile>>) -> Self {
        Self {
            name: name.into(),
            precheck: false,
            state: Mutex::new(JobState {
                files,
                ..JobState::default()
            }),
        }
    }

    /// Only probe for article presence instead of downloading bodies
    #[must_use]
    pub fn with_precheck(mut self, precheck: bool) -> Self {
        self.precheck = precheck;
        self
    }

    /// Register a set of repair volumes held back from the download
    #[must_use]
    pub fn with_extra_pars(self, set_name: impl Into<String>, files: Vec<Arc<NzbFile>>) -> Self {
        self.state().extra_pars.insert(set_name.into(), files);
        self
    }

    fn state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Final name of the job
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this job only probes for presence
    pub fn is_precheck(&self) -> bool {
        self.precheck
    }

    /// Current status
    pub fn status(&self) -> JobStatus {
        self.state().status
    }

    /// Check if the job is paused
    pub fn is_paused(&self) -> bool {
        self.status() == JobStatus::Paused
    }

    /// Pause the job; returns false if it already was paused
    pub fn pause(&self) -> bool {
        let mut state = self.state();
        let was_active = state.status != JobStatus::Paused;
        state.status = JobStatus::Paused;
        was_active
    }

    /// Resume a paused job
    pub fn resume(&self) {
        self.state().status = JobStatus::Active;
    }

    /// Files currently part of the download
    pub fn files(&self) -> Vec<Arc<NzbFile>> {
        self.state().files.clone()
    }

    /// Add a repair volume to the active files
    pub fn add_par_file(&self, file: Arc<NzbFile>) {
        self.state().files.push(file);
    }

    /// Check if any held-back repair volumes remain
    pub fn has_extra_pars(&self) -> bool {
        self.state().extra_pars.values().any(|files| !files.is_empty())
    }

    /// Remaining held-back repair volumes of one set
    pub fn extra_pars(&self, set_name: &str) -> Vec<Arc<NzbFile>> {
        self.state()
            .extra_pars
            .get(set_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Name of the first non-empty repair set whose name occurs in `filename`
    pub fn par_set_for(&self, filename: &str) -> Option<String> {
        self.state()
            .extra_pars
            .iter()
            .find(|(set, files)| !files.is_empty() && filename.contains(set.as_str()))
            .map(|(set, _)| set.clone())
    }

    /// Replace the held-back volumes of a set
    pub fn set_extra_pars(&self, set_name: &str, files: Vec<Arc<NzbFile>>) {
        self.state().extra_pars.insert(set_name.to_string(), files);
    }

    /// Append an entry to one of the failure logs
    pub fn inc_log(&self, log: ArticleLog, entry: impl Into<String>) {
        self.state().logs.entry(log).or_default().push(entry.into());
    }

    /// Entries of one failure log
    pub fn log(&self, log: ArticleLog) -> Vec<String> {
        self.state().logs.get(&log).cloned().unwrap_or_default()
    }

    /// Number of entries in one failure log
    pub fn log_count(&self, log: ArticleLog) -> usize {
        self.state().logs.get(&log).map_or(0, Vec::len)
    }

    /// Mark a server as having nothing left to offer for this job
    pub fn add_to_try_list(&self, server_id: &str) {
        self.state().try_list.insert(server_id.to_string());
    }

    /// Check if a server was exhausted for this job
    pub fn server_in_try_list(&self, server_id: &str) -> bool {
        self.state().try_list.contains(server_id)
    }

    /// Let every server be considered for this job again
    pub fn reset_try_list(&self) {
        self.state().try_list.clear();
    }
}
