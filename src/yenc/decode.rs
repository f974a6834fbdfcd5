use tracing::debug;

use super::envelope::{HEAD_SCAN_LINES, parse_envelope};
use super::types::{DecodedArticle, YencFields};
use crate::error::{BadYencKind, DecodeError};

/// Decode the body of one article
///
/// Empty lines are dropped first; if nothing is left there is no payload and
/// `Ok(None)` is returned. Otherwise the envelope is located, the payload
/// lines are decoded and the CRC32 of the result is checked against
/// `pcrc32` (multi-part) or `crc32` (single-part) from the `=yend` line.
/// When the expected checksum is missing the payload is accepted as is.
///
/// # Errors
///
/// - [`DecodeError::BadYenc`] when the envelope is missing or incomplete, or
///   when the article is UUencoded.
/// - [`DecodeError::Crc`] when the checksum does not match; the decoded bytes
///   travel with the error.
/// - [`DecodeError::Unknown`] when the payload ends in a dangling escape.
///
/// # Example
///
/// ```
/// use yenc_decoder::yenc::{decode_article, encode_article};
///
/// let lines = encode_article(b"Test", "test.txt", 128, None).unwrap();
/// let decoded = decode_article(&lines).unwrap().unwrap();
/// assert_eq!(decoded.data, b"Test");
/// assert_eq!(decoded.crc32.len(), 8);
/// ```
pub fn decode_article<L: AsRef<[u8]>>(
    lines: &[L],
) -> Result<Option<DecodedArticle>, DecodeError> {
    let lines: Vec<&[u8]> = lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return Ok(None);
    }

    let (envelope, payload) = parse_envelope(&lines);

    let Some(begin) = envelope.begin else {
        if is_uuencoded(&lines) {
            return Err(DecodeError::BadYenc(BadYencKind::Uuencoded));
        }
        return Err(DecodeError::BadYenc(BadYencKind::MissingBegin));
    };
    let Some(end) = envelope.end else {
        return Err(DecodeError::BadYenc(BadYencKind::MissingEnd));
    };

    let name = begin.get("name").map(fix_name);
    if name.is_none() {
        debug!("Possible corrupt header detected => ybegin: {:?}", begin);
    }

    let data = decode_payload(payload)?;
    let crc32 = format!("{:08X}", crc32fast::hash(&data));

    let declared = match &envelope.part {
        // The file checksum doubles as the part checksum when one part holds it all
        Some(part) => end
            .get_str("pcrc32")
            .or_else(|| spans_whole_file(&begin, part).then(|| end.get_str("crc32")).flatten()),
        None => end.get_str("crc32"),
    };
    match declared {
        Some(declared) => {
            let need_crc = format!("{:0>8}", declared.to_ascii_uppercase());
            if need_crc != crc32 {
                return Err(DecodeError::Crc {
                    need_crc,
                    got_crc: crc32,
                    data,
                    name,
                });
            }
        }
        None => debug!("Corrupt header detected => yend: {:?}", end),
    }

    Ok(Some(DecodedArticle {
        name,
        part: begin.get_u64("part"),
        data,
        crc32,
    }))
}

fn spans_whole_file(begin: &YencFields, part: &YencFields) -> bool {
    part.get_u64("begin") == Some(1)
        && part.get_u64("end").is_some()
        && part.get_u64("end") == begin.get_u64("size")
}

/// Decode yEnc payload lines into raw bytes
///
/// yEnc decoding: output = (input - 42) mod 256
/// Escape sequences: =X means (X - 64 - 42) mod 256
///
/// An escape may straddle a line break. Bare CR and LF bytes are never part
/// of the payload and are skipped.
///
/// # Errors
///
/// Returns [`DecodeError::Unknown`] if the payload ends in a lone `=`.
pub fn decode_payload<L: AsRef<[u8]>>(lines: &[L]) -> Result<Vec<u8>, DecodeError> {
    let capacity = lines.iter().map(|line| line.as_ref().len()).sum();
    let mut output = Vec::with_capacity(capacity);
    let mut escaped = false;

    for line in lines {
        for &byte in line.as_ref() {
            if byte == b'\r' || byte == b'\n' {
                continue;
            }
            if escaped {
                output.push(byte.wrapping_sub(64).wrapping_sub(42));
                escaped = false;
            } else if byte == b'=' {
                escaped = true;
            } else {
                output.push(byte.wrapping_sub(42));
            }
        }
    }

    if escaped {
        return Err(DecodeError::Unknown(
            "Incomplete escape sequence at end of payload".to_string(),
        ));
    }

    Ok(output)
}

/// Turn a raw yEnc filename into a `String`
///
/// Names are UTF-8 when valid, otherwise they are read as Latin-1, which is
/// what most posting tools emit.
pub fn fix_name(raw: &[u8]) -> String {
    let name = match std::str::from_utf8(raw) {
        Ok(name) => name.to_string(),
        Err(_) => raw.iter().map(|&b| char::from(b)).collect(),
    };
    name.trim().to_string()
}

fn is_uuencoded(lines: &[&[u8]]) -> bool {
    lines
        .iter()
        .take(HEAD_SCAN_LINES)
        .any(|line| line.starts_with(b"begin "))
}
