//! Decoder and server pool configuration

use crate::error::{DecoderError, Result};

/// Default high-water mark for the decode queue
pub const MAX_DECODE_QUEUE: usize = 10;

/// Decode worker configuration
///
/// # Example
///
/// ```
/// use yenc_decoder::DecoderConfig;
///
/// let config = DecoderConfig::default()
///     .with_max_decode_queue(20)
///     .with_prospective_par_download(false);
/// assert!(config.validate().is_ok());
/// ```
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecoderConfig {
    /// Queue depth above which a full cache throttles the fetch layer
    #[cfg_attr(feature = "serde", serde(default = "default_max_decode_queue"))]
    pub max_decode_queue: usize,

    /// Pull extra repair blocks into a job as soon as damage is seen
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub prospective_par_download: bool,

    /// Number of events buffered for slow subscribers
    #[cfg_attr(feature = "serde", serde(default = "default_event_capacity"))]
    pub event_capacity: usize,
}

#[cfg(feature = "serde")]
fn default_max_decode_queue() -> usize {
    MAX_DECODE_QUEUE
}

#[cfg(feature = "serde")]
fn default_true() -> bool {
    true
}

#[cfg(feature = "serde")]
fn default_event_capacity() -> usize {
    256
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_decode_queue: MAX_DECODE_QUEUE,
            prospective_par_download: true,
            event_capacity: 256,
        }
    }
}

impl DecoderConfig {
    /// Set the decode queue high-water mark
    pub fn with_max_decode_queue(mut self, max_decode_queue: usize) -> Self {
        self.max_decode_queue = max_decode_queue;
        self
    }

    /// Enable or disable prospective repair block download
    pub fn with_prospective_par_download(mut self, enabled: bool) -> Self {
        self.prospective_par_download = enabled;
        self
    }

    /// Set the event channel capacity
    pub fn with_event_capacity(mut self, event_capacity: usize) -> Self {
        self.event_capacity = event_capacity;
        self
    }

    /// Check the configuration for values the worker cannot run with
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidConfig`] for a zero queue high-water
    /// mark or a zero event capacity.
    pub fn validate(&self) -> Result<()> {
        if self.max_decode_queue == 0 {
            return Err(DecoderError::InvalidConfig(
                "max_decode_queue must be greater than 0".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(DecoderError::InvalidConfig(
                "event_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// News server entry of the server pool
///
/// Higher priority is preferred. Servers that are not in the highest active
/// priority tier are only used as fill servers.
///
/// # Example
///
/// ```
/// use yenc_decoder::ServerConfig;
///
/// let primary = ServerConfig::new("news.example.com", 563, 100);
/// let fill = ServerConfig::new("block.example.net", 443, 10);
/// assert_eq!(primary.id(), "news.example.com:563");
/// assert!(fill.enabled);
/// ```
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerConfig {
    /// Server hostname (e.g., "news.example.com")
    pub host: String,

    /// Server port (typically 119 for plain, 563 for TLS)
    pub port: u16,

    /// Priority (higher = preferred)
    pub priority: u32,

    /// Whether the server starts out active
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub enabled: bool,
}

impl ServerConfig {
    /// Create a new, enabled server entry
    pub fn new(host: impl Into<String>, port: u16, priority: u32) -> Self {
        Self {
            host: host.into(),
            port,
            priority,
            enabled: true,
        }
    }

    /// Unique server identifier (host:port)
    pub fn id(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
