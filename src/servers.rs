//! Server pool shared between the fetch layer and the decode worker
//!
//! The pool is owned by the fetch layer, which flips servers on and off as
//! they fail or recover. The decode worker only ever reads it, through a
//! point-in-time [`ServerPool::snapshot`].
//!
//! # Example
//!
//! ```
//! use yenc_decoder::{ServerConfig, ServerPool};
//!
//! let pool = ServerPool::new(vec![
//!     ServerConfig::new("news-primary.com", 563, 100),
//!     ServerConfig::new("news-backup.com", 563, 50),
//! ]);
//!
//! pool.set_active("news-primary.com:563", false);
//! let snapshot = pool.snapshot();
//! assert!(!snapshot[0].active);
//! assert!(snapshot[1].is_highest(&snapshot));
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use crate::ServerConfig;

/// Point-in-time view of one server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Unique server identifier (host:port)
    pub id: String,
    /// Priority (higher = preferred)
    pub priority: u32,
    /// Whether the server is currently in use
    pub active: bool,
}

impl ServerInfo {
    /// Check if no other active server outranks this one
    ///
    /// Servers below the highest active priority tier are fill servers.
    pub fn is_highest(&self, servers: &[ServerInfo]) -> bool {
        !servers
            .iter()
            .any(|other| other.id != self.id && other.active && other.priority > self.priority)
    }
}

#[derive(Debug)]
struct ServerEntry {
    id: String,
    priority: u32,
    active: AtomicBool,
}

/// All configured servers, in priority order
#[derive(Debug)]
pub struct ServerPool {
    servers: Vec<ServerEntry>,
}

impl ServerPool {
    /// Create a pool from server configurations
    pub fn new(configs: Vec<ServerConfig>) -> Self {
        let mut servers: Vec<ServerEntry> = configs
            .into_iter()
            .map(|config| ServerEntry {
                id: config.id(),
                priority: config.priority,
                active: AtomicBool::new(config.enabled),
            })
            .collect();

        // Sort by priority (descending)
        servers.sort_by(|a, b| b.priority.cmp(&a.priority));

        Self { servers }
    }

    /// Turn a server on or off; returns false for an unknown server
    pub fn set_active(&self, server_id: &str, active: bool) -> bool {
        match self.servers.iter().find(|s| s.id == server_id) {
            Some(server) => {
                server.active.store(active, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Check if a server is active
    pub fn is_active(&self, server_id: &str) -> bool {
        self.servers
            .iter()
            .any(|s| s.id == server_id && s.active.load(Ordering::Relaxed))
    }

    /// Copy of the current pool state
    pub fn snapshot(&self) -> Vec<ServerInfo> {
        self.servers
            .iter()
            .map(|s| ServerInfo {
                id: s.id.clone(),
                priority: s.priority,
                active: s.active.load(Ordering::Relaxed),
            })
            .collect()
    }

    /// Get list of server IDs in priority order
    pub fn server_ids(&self) -> Vec<String> {
        self.servers.iter().map(|s| s.id.clone()).collect()
    }

    /// Get number of servers in the pool
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }
}
