use regex::bytes::Regex;
use std::sync::LazyLock;

use super::types::{Envelope, YencFields};

/// Number of lines searched for `=ybegin` from the start of an article
pub const HEAD_SCAN_LINES: usize = 40;

/// Number of lines searched for `=yend` from the end of an article
pub const TAIL_SCAN_LINES: usize = 10;

// Example: =ybegin part=1 line=128 size=123 name=-=DUMMY=- abc.par
#[allow(clippy::expect_used)]
static FIELD_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-zA-Z0-9]+)=").expect("BUG: invalid yEnc key pattern"));

/// Locate the yEnc envelope in an article and trim it off the payload
///
/// Scans the first [`HEAD_SCAN_LINES`] lines for `=ybegin` (and a `=ypart`
/// directly after it) and the last [`TAIL_SCAN_LINES`] lines of what remains
/// for `=yend`. Returns the markers found and the payload window between
/// them. When nothing is found the window is the input unchanged.
///
/// # Example
///
/// ```
/// use yenc_decoder::yenc::parse_envelope;
///
/// let lines = [
///     "=ybegin line=128 size=3 name=x.bin",
///     "kkk",
///     "=yend size=3 crc32=0",
/// ];
/// let (envelope, payload) = parse_envelope(&lines);
/// assert_eq!(envelope.begin.unwrap().get_str("name"), Some("x.bin"));
/// assert_eq!(payload.len(), 1);
/// ```
pub fn parse_envelope<L: AsRef<[u8]>>(lines: &[L]) -> (Envelope, &[L]) {
    let mut envelope = Envelope::default();
    let mut window = lines;

    for i in 0..window.len().min(HEAD_SCAN_LINES) {
        let line = window[i].as_ref();
        if !line.starts_with(b"=ybegin ") {
            continue;
        }

        // A filename may itself contain "key=" sequences, so cap the splits
        let mut splits = 3;
        if find(line, b" part=").is_some_and(|pos| pos > 0) {
            splits += 1;
        }
        if find(line, b" total=").is_some_and(|pos| pos > 0) {
            splits += 1;
        }
        envelope.begin = Some(split_fields(line, Some(splits)));

        match window.get(i + 1) {
            Some(next) if next.as_ref().starts_with(b"=ypart ") => {
                envelope.part = Some(split_fields(next.as_ref(), None));
                window = &window[i + 2..];
            }
            _ => window = &window[i + 1..],
        }
        break;
    }

    for back in 1..=window.len().min(TAIL_SCAN_LINES) {
        let idx = window.len() - back;
        let line = window[idx].as_ref();
        if line.starts_with(b"=yend ") {
            envelope.end = Some(split_fields(line, None));
            window = &window[..idx];
            break;
        }
    }

    (envelope, window)
}

/// Split a header line into `key=value` fields
///
/// Keys are runs of ASCII alphanumerics followed by `=`; a value runs up to
/// the next key and is whitespace-trimmed. With `limit`, at most that many
/// keys are recognised and the last value takes the rest of the line.
pub fn split_fields(line: &[u8], limit: Option<usize>) -> YencFields {
    let mut fields = YencFields::default();
    let mut current: Option<(String, usize)> = None;

    for caps in FIELD_KEY_RE
        .captures_iter(line)
        .take(limit.unwrap_or(usize::MAX))
    {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if let Some((prev, start)) = current.take() {
            fields.insert(prev, line[start..whole.start()].trim_ascii().to_vec());
        }
        current = Some((
            String::from_utf8_lossy(key.as_bytes()).into_owned(),
            whole.end(),
        ));
    }

    if let Some((prev, start)) = current {
        fields.insert(prev, line[start..].trim_ascii().to_vec());
    }

    fields
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
