//! Decoder error types

use thiserror::Error;

/// Why an article could not be treated as a yEnc article
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadYencKind {
    /// No `=ybegin` line in the head of the article
    MissingBegin,
    /// `=ybegin` found but no `=yend` in the tail
    MissingEnd,
    /// The job only probes for presence, so the body is never decoded
    Precheck,
    /// A UUencode `begin ` marker was found; only yEnc is supported
    Uuencoded,
}

impl std::fmt::Display for BadYencKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            BadYencKind::MissingBegin => "missing =ybegin",
            BadYencKind::MissingEnd => "missing =yend",
            BadYencKind::Precheck => "precheck probe",
            BadYencKind::Uuencoded => "UUencoded article",
        };
        f.write_str(reason)
    }
}

/// Outcome of a failed decode attempt for a single article
///
/// None of these ever escape the decode worker; each one is resolved into a
/// retry on another server or a registration of the article.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Envelope absent or incomplete, or an unsupported encoding
    #[error("Badly formed yEnc article: {0}")]
    BadYenc(BadYencKind),

    /// Payload decoded but its checksum does not match the declared one
    ///
    /// The decoded bytes are kept so the damaged payload can still be cached.
    #[error("CRC error ({need_crc} -> {got_crc})")]
    Crc {
        /// Checksum declared in `=yend` (8 uppercase hex digits)
        need_crc: String,
        /// Checksum computed over the decoded bytes
        got_crc: String,
        /// Decoded (damaged) payload
        data: Vec<u8>,
        /// Filename from `=ybegin`, if present
        name: Option<String>,
    },

    /// Server returned no lines at all
    #[error("Empty response")]
    EmptyResponse,

    /// Any other fault during decode
    #[error("Unknown decode failure: {0}")]
    Unknown(String),
}

/// Errors raised by the decoder plumbing itself
#[derive(Error, Debug)]
pub enum DecoderError {
    /// The worker has shut down and no longer accepts articles
    #[error("Decode queue closed")]
    QueueClosed,

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias using DecoderError
pub type Result<T> = std::result::Result<T, DecoderError>;
