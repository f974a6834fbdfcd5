//! Cross-server retry for articles that failed to decode
//!
//! When an article is missing or unusable on the server that delivered it,
//! the worker looks for an active server that has not been tried for this
//! article yet. Servers in the highest active priority tier are preferred;
//! lower tiers are fill servers, only used when no primary is left.

use tracing::{debug, info};

use crate::job::{Article, ArticleLog, Job, NzbFile};
use crate::queue::JobQueue;
use crate::servers::ServerInfo;

/// Untried server an article can be retried on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryTarget {
    /// Server identifier
    pub server_id: String,
    /// Whether the server is a fill server
    pub fill: bool,
}

/// Pick an untried server for an article
///
/// The first untried primary server wins; otherwise the first untried fill
/// server. Servers in the article's try list are never returned.
pub fn select_retry_server(servers: &[ServerInfo], article: &Article) -> Option<RetryTarget> {
    let mut fill = None;

    for server in servers {
        if !server.active || article.server_in_try_list(&server.id) {
            continue;
        }
        if server.is_highest(servers) {
            return Some(RetryTarget {
                server_id: server.id.clone(),
                fill: false,
            });
        }
        if fill.is_none() {
            fill = Some(RetryTarget {
                server_id: server.id.clone(),
                fill: true,
            });
        }
    }

    fill
}

/// Try to set an article up for a retry on another server
///
/// The server that delivered the article goes onto its try list. If an
/// untried server exists, the article's fetcher is cleared and the try lists
/// of the file and job are reset, so servers given up on for the whole file
/// or job are considered again for every article. Otherwise the article is
/// logged as missing on the job.
///
/// Returns true if the article will be retried.
pub fn search_new_server(
    article: &Article,
    file: &NzbFile,
    job: &Job,
    servers: &[ServerInfo],
    job_queue: &dyn JobQueue,
) -> bool {
    if let Some(fetcher) = article.fetcher() {
        article.add_to_try_list(&fetcher);
    }

    match select_retry_server(servers, article) {
        Some(target) => {
            if target.fill {
                article.set_allow_fill_server(true);
            }
            article.clear_fetcher();

            // Allow all servers to iterate over this job and file again
            job_queue.reset_try_lists(file, job);

            debug!(
                "{} => found at least one untested server ({})",
                article, target.server_id
            );
            true
        }
        None => {
            let msg = format!("{} => missing from all servers, discarding", article);
            info!("{}", msg);
            job.inc_log(ArticleLog::Missing, msg);
            false
        }
    }
}
