//! Outcome classification for one decode attempt
//!
//! Every attempt ends in one of the [`DecodeStatus`] states. The
//! [`Classifier`] turns that state into a [`Verdict`]: whether the article
//! was found, whether it is finished (registered) this round, which failure
//! log it goes into and which payload, if any, should be cached. Articles
//! that are missing or unusable are handed to the server failover first;
//! when another server is available, judgement is deferred to that attempt.

use regex::bytes::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::error::{BadYencKind, DecodeError};
use crate::failover::search_new_server;
use crate::job::{Article, ArticleLog, Job, NzbFile};
use crate::queue::JobQueue;
use crate::servers::ServerInfo;
use crate::yenc::DecodedArticle;

#[allow(clippy::expect_used)]
static MESSAGE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)message-id:").expect("BUG: invalid message-id pattern"));

#[allow(clippy::expect_used)]
static REMOVAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)dmca|removed|cancel|blocked").expect("BUG: invalid removal pattern")
});

/// Status line prefix of a successful STAT probe
const PROBE_FOUND: &[u8] = b"223 ";

/// Result state of one decode attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// Payload decoded and verified
    Decoded,
    /// Payload decoded but the checksum does not match
    CrcMismatch,
    /// Envelope missing or incomplete, UUencode, or a precheck probe
    BadYenc,
    /// Nothing was returned
    EmptyResponse,
    /// Any other decode fault
    UnknownFailure,
}

impl DecodeStatus {
    /// Map a decode result onto its status
    pub fn of(outcome: &Result<Option<DecodedArticle>, DecodeError>) -> Self {
        match outcome {
            Ok(Some(_)) => DecodeStatus::Decoded,
            Ok(None) | Err(DecodeError::EmptyResponse) => DecodeStatus::EmptyResponse,
            Err(DecodeError::Crc { .. }) => DecodeStatus::CrcMismatch,
            Err(DecodeError::BadYenc(_)) => DecodeStatus::BadYenc,
            Err(DecodeError::Unknown(_)) => DecodeStatus::UnknownFailure,
        }
    }
}

/// What the raw response reveals about an article that did not decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Presence {
    /// The server has the article
    pub found: bool,
    /// The server removed the article (DMCA, cancel, ...)
    pub killed: bool,
}

/// Look for presence and removal markers in a raw response
///
/// In precheck mode a `223 ` status line is proof of presence. Otherwise
/// any `Message-ID:` header means found; a removal notice outside the
/// `X-` headers means killed and ends the scan.
///
/// # Example
///
/// ```
/// use yenc_decoder::classify::inspect_response;
///
/// let presence = inspect_response(&["223 0 <a@b>"], true);
/// assert!(presence.found);
///
/// let presence = inspect_response(&["Message-ID: <a@b>", "Removed per DMCA notice"], false);
/// assert!(presence.found && presence.killed);
/// ```
pub fn inspect_response<L: AsRef<[u8]>>(lines: &[L], precheck: bool) -> Presence {
    let mut presence = Presence::default();

    if precheck
        && lines
            .first()
            .is_some_and(|line| line.as_ref().starts_with(PROBE_FOUND))
    {
        presence.found = true;
        return presence;
    }

    for line in lines {
        let line = line.as_ref();
        if MESSAGE_ID_RE.is_match(line) {
            presence.found = true;
        }
        if !line.starts_with(b"X-") && REMOVAL_RE.is_match(line) {
            presence.killed = true;
            break;
        }
    }

    presence
}

/// Final word on one decode attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Classified state
    pub status: DecodeStatus,
    /// Whether the article exists (possibly damaged)
    pub found: bool,
    /// Whether the article is finished this round
    pub register: bool,
    /// Whether the article adds to the file's decoded count
    pub counted: bool,
    /// Failure log to record the article in
    pub log: Option<ArticleLog>,
    /// Payload to cache
    pub data: Option<Vec<u8>>,
}

impl Verdict {
    /// Check if the attempt left the job short of data
    pub fn is_damage(&self) -> bool {
        self.log.is_some() || !self.found
    }
}

/// Classifies decode attempts of one article
pub struct Classifier<'a> {
    /// Article being decoded
    pub article: &'a Article,
    /// File owning the article
    pub file: &'a NzbFile,
    /// Job owning the file
    pub job: &'a Job,
    /// Server pool snapshot
    pub servers: &'a [ServerInfo],
    /// Job queue for try-list resets
    pub job_queue: &'a dyn JobQueue,
}

impl Classifier<'_> {
    /// Turn a decode result into a verdict
    ///
    /// `lines` is the raw response, inspected when the envelope was unusable.
    pub fn classify<L: AsRef<[u8]>>(
        &self,
        lines: &[L],
        outcome: Result<Option<DecodedArticle>, DecodeError>,
    ) -> Verdict {
        let status = DecodeStatus::of(&outcome);
        let art_id = self.article.message_id();

        match outcome {
            Ok(Some(decoded)) => Verdict {
                status,
                found: true,
                register: true,
                counted: true,
                log: None,
                data: Some(decoded.data),
            },
            Ok(None) | Err(DecodeError::EmptyResponse) => {
                let retry = self.search_new_server();
                Verdict {
                    status,
                    found: false,
                    register: !retry,
                    counted: false,
                    log: None,
                    data: None,
                }
            }
            Err(DecodeError::Crc {
                need_crc,
                got_crc,
                data,
                ..
            }) => {
                info!("CRC Error in {} ({} -> {})", art_id, need_crc, got_crc);
                Verdict {
                    status,
                    found: true,
                    register: true,
                    counted: false,
                    log: Some(ArticleLog::Bad),
                    data: Some(data),
                }
            }
            Err(DecodeError::BadYenc(kind)) => self.bad_yenc(lines, kind),
            Err(DecodeError::Unknown(reason)) => {
                info!("Unknown Error while decoding {}: {}", art_id, reason);
                let retry = self.search_new_server();
                Verdict {
                    status,
                    found: false,
                    register: !retry,
                    counted: false,
                    log: (!retry).then_some(ArticleLog::Bad),
                    data: None,
                }
            }
        }
    }

    fn bad_yenc<L: AsRef<[u8]>>(&self, lines: &[L], kind: BadYencKind) -> Verdict {
        let art_id = self.article.message_id();
        let precheck = self.job.is_precheck();
        let presence = inspect_response(lines, precheck);

        let mut log = None;
        if presence.killed {
            info!("Article removed from server ({})", art_id);
            log = Some(ArticleLog::Killed);
        } else if precheck {
            if presence.found {
                debug!("Server has article {}", art_id);
            }
        } else if !presence.found {
            info!("Badly formed yEnc article in {} ({})", art_id, kind);
            log = Some(ArticleLog::Bad);
        }

        let mut register = true;
        if (!presence.found || presence.killed) && self.search_new_server() {
            register = false;
            log = None;
        }

        Verdict {
            status: DecodeStatus::BadYenc,
            found: presence.found,
            register,
            counted: false,
            log,
            data: None,
        }
    }

    fn search_new_server(&self) -> bool {
        search_new_server(
            self.article,
            self.file,
            self.job,
            self.servers,
            self.job_queue,
        )
    }
}
