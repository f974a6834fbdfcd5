//! Job queue contract used by the decode worker

use std::sync::Arc;

use crate::job::{Article, Job, NzbFile};

/// The part of the job queue the decode worker talks to
///
/// Implementations synchronise internally; the worker never holds a lock
/// across these calls.
pub trait JobQueue: Send + Sync {
    /// Finish an article, either found (possibly damaged) or missing
    ///
    /// Called at most once per article.
    fn register_article(&self, article: &Arc<Article>, found: bool);

    /// Let the fetch layer offer the file and the job to every server again
    ///
    /// Servers that were given up on for the whole file or job become
    /// candidates again for all of its articles. Per-article try lists are
    /// left alone.
    fn reset_try_lists(&self, file: &NzbFile, job: &Job) {
        file.reset_try_list();
        job.reset_try_list();
    }
}
