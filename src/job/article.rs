use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// One fetch unit (a Usenet article) belonging to a file
///
/// The fetch state lives behind a mutex because the retrieval layer and the
/// decode worker both touch it, never at the same time for one article.
#[derive(Debug)]
pub struct Article {
    message_id: String,
    bytes: u64,
    state: Mutex<ArticleState>,
}

#[derive(Debug, Default)]
struct ArticleState {
    fetcher: Option<String>,
    try_list: HashSet<String>,
    tries: u32,
    allow_fill_server: bool,
}

impl Article {
    /// Create a new article with an empty try list
    pub fn new(message_id: impl Into<String>, bytes: u64) -> Self {
        Self {
            message_id: message_id.into(),
            bytes,
            state: Mutex::new(ArticleState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ArticleState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Message-ID of the article
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Size of the article as announced in the NZB
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Server currently assigned to fetch this article
    pub fn fetcher(&self) -> Option<String> {
        self.state().fetcher.clone()
    }

    /// Assign (or clear) the fetching server
    pub fn set_fetcher(&self, server_id: Option<String>) {
        self.state().fetcher = server_id;
    }

    /// Number of fetch attempts on the current server
    pub fn tries(&self) -> u32 {
        self.state().tries
    }

    /// Count one more fetch attempt
    ///
    /// Called by the fetch layer for every attempt it makes. The decoder only
    /// resets the count, when it moves the article to another server.
    pub fn record_try(&self) {
        self.state().tries += 1;
    }

    /// Forget the current fetcher and its attempt count
    pub(crate) fn clear_fetcher(&self) {
        let mut state = self.state();
        state.fetcher = None;
        state.tries = 0;
    }

    /// Whether fill servers may be used for this article
    pub fn allow_fill_server(&self) -> bool {
        self.state().allow_fill_server
    }

    /// Permit (or forbid) fill servers for this article
    pub fn set_allow_fill_server(&self, allow: bool) {
        self.state().allow_fill_server = allow;
    }

    /// Mark a server as tried for this article
    pub fn add_to_try_list(&self, server_id: &str) {
        self.state().try_list.insert(server_id.to_string());
    }

    /// Check if a server was already tried for this article
    pub fn server_in_try_list(&self, server_id: &str) -> bool {
        self.state().try_list.contains(server_id)
    }

    /// Servers tried so far
    pub fn try_list(&self) -> HashSet<String> {
        self.state().try_list.clone()
    }

    /// Allow every server to be tried again
    pub fn reset_try_list(&self) {
        self.state().try_list.clear();
    }
}

impl std::fmt::Display for Article {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message_id)
    }
}
