use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::article::Article;

/// Encoding detected for a file's articles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    /// No article decoded yet
    #[default]
    Unknown,
    /// yEnc encoded
    Yenc,
    /// Legacy UUencode (not supported)
    Uu,
}

/// A file of a download job, made up of articles
#[derive(Debug)]
pub struct NzbFile {
    articles: Vec<Arc<Article>>,
    blocks: Option<u32>,
    state: Mutex<FileState>,
}

#[derive(Debug)]
struct FileState {
    filename: String,
    yenc_named: bool,
    file_type: FileType,
    article_count: usize,
    try_list: HashSet<String>,
}

impl NzbFile {
    /// Create a file from its NZB name and articles
    pub fn new(filename: impl Into<String>, articles: Vec<Arc<Article>>) -> Self {
        Self {
            articles,
            blocks: None,
            state: Mutex::new(FileState {
                filename: filename.into(),
                yenc_named: false,
                file_type: FileType::Unknown,
                article_count: 0,
                try_list: HashSet::new(),
            }),
        }
    }

    /// Mark this file as a repair (PAR2) volume holding `blocks` recovery blocks
    #[must_use]
    pub fn with_blocks(mut self, blocks: u32) -> Self {
        self.blocks = Some(blocks);
        self
    }

    fn state(&self) -> MutexGuard<'_, FileState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current filename
    pub fn filename(&self) -> String {
        self.state().filename.clone()
    }

    /// Take the filename announced by yEnc, only the first time one is seen
    ///
    /// Returns true if the name was applied.
    pub fn set_yenc_filename(&self, name: &str) -> bool {
        let mut state = self.state();
        if state.yenc_named {
            return false;
        }
        state.filename = name.to_string();
        state.yenc_named = true;
        true
    }

    /// Encoding detected so far
    pub fn file_type(&self) -> FileType {
        self.state().file_type
    }

    /// Record the detected encoding
    pub fn set_file_type(&self, file_type: FileType) {
        self.state().file_type = file_type;
    }

    /// Number of articles decoded successfully
    pub fn article_count(&self) -> usize {
        self.state().article_count
    }

    /// Count one more decoded article
    pub fn inc_article_count(&self) {
        self.state().article_count += 1;
    }

    /// Recovery blocks carried by this file (repair volumes only)
    pub fn blocks(&self) -> Option<u32> {
        self.blocks
    }

    /// Articles of this file
    pub fn articles(&self) -> &[Arc<Article>] {
        &self.articles
    }

    /// Mark a server as having nothing left to offer for this file
    pub fn add_to_try_list(&self, server_id: &str) {
        self.state().try_list.insert(server_id.to_string());
    }

    /// Check if a server was exhausted for this file
    pub fn server_in_try_list(&self, server_id: &str) -> bool {
        self.state().try_list.contains(server_id)
    }

    /// Let every server be considered for this file again
    pub fn reset_try_list(&self) {
        self.state().try_list.clear();
    }
}
