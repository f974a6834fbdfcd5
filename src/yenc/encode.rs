use crate::error::{DecoderError, Result};

use super::types::PartSpec;

/// Encode binary data into the lines of a yEnc article
///
/// # Arguments
/// * `data` - Binary data to encode (the part data)
/// * `name` - Original filename
/// * `line_length` - Maximum encoded line length (typically 128, max 997)
/// * `part` - Position of this part for multi-part posts
///
/// # Returns
/// Lines without terminators: `=ybegin`, optional `=ypart`, payload, `=yend`
///
/// # Errors
/// Returns [`DecoderError::InvalidConfig`] for a line length outside 2-997.
pub fn encode_article(
    data: &[u8],
    name: &str,
    line_length: usize,
    part: Option<PartSpec>,
) -> Result<Vec<Vec<u8>>> {
    // An escape pair must always fit on one line
    if !(2..=997).contains(&line_length) {
        return Err(DecoderError::InvalidConfig(format!(
            "Invalid line length: {} (must be 2-997)",
            line_length
        )));
    }

    let mut lines = Vec::new();
    match part {
        Some(spec) => {
            // For multi-part files, size in =ybegin header is the TOTAL file size
            lines.push(
                format!(
                    "=ybegin part={} total={} line={} size={} name={}",
                    spec.part, spec.total, line_length, spec.file_size, name
                )
                .into_bytes(),
            );
            lines.push(format!("=ypart begin={} end={}", spec.begin, spec.end).into_bytes());
        }
        None => lines.push(
            format!(
                "=ybegin line={} size={} name={}",
                line_length,
                data.len(),
                name
            )
            .into_bytes(),
        ),
    }

    lines.extend(encode_payload(data, line_length));

    let crc32 = crc32fast::hash(data);
    let trailer = match part {
        Some(spec) => format!(
            "=yend size={} part={} pcrc32={:08x}",
            data.len(),
            spec.part,
            crc32
        ),
        None => format!("=yend size={} crc32={:08x}", data.len(), crc32),
    };
    lines.push(trailer.into_bytes());

    Ok(lines)
}

/// Encode binary data into payload lines
///
/// yEnc encoding: output = (input + 42) mod 256
/// Escape sequence: = followed by (output + 64)
fn encode_payload(data: &[u8], line_length: usize) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut current = Vec::with_capacity(line_length);

    for &byte in data {
        let encoded = byte.wrapping_add(42);
        let width = if needs_escape(encoded) { 2 } else { 1 };

        if current.len() + width > line_length {
            lines.push(std::mem::replace(
                &mut current,
                Vec::with_capacity(line_length),
            ));
        }

        if width == 2 {
            current.push(b'=');
            current.push(encoded.wrapping_add(64));
        } else {
            current.push(encoded);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Check if an encoded byte is one of the control bytes that are always escaped
///
/// NUL, TAB, LF, CR, ESC, SPACE, '.', '='
fn needs_escape(byte: u8) -> bool {
    matches!(byte, 0x00 | 0x09 | 0x0A | 0x0D | 0x1B | 0x20 | 0x2E | 0x3D)
}
