use std::collections::HashMap;

/// Key/value fields of a `=ybegin`, `=ypart` or `=yend` line
///
/// Values are kept as raw bytes because yEnc filenames are not guaranteed
/// to be UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YencFields {
    fields: HashMap<String, Vec<u8>>,
}

impl YencFields {
    pub(crate) fn insert(&mut self, key: String, value: Vec<u8>) {
        self.fields.insert(key, value);
    }

    /// Raw value for a key
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.fields.get(key).map(Vec::as_slice)
    }

    /// Value for a key if it is valid UTF-8
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Numeric value for a key
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get_str(key).and_then(|s| s.parse().ok())
    }

    /// Check if a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of parsed fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if no fields were parsed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Envelope markers found in one article
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Fields of the `=ybegin` line
    pub begin: Option<YencFields>,
    /// Fields of the `=ypart` line (multi-part articles only)
    pub part: Option<YencFields>,
    /// Fields of the `=yend` line
    pub end: Option<YencFields>,
}

impl Envelope {
    /// Check if no marker at all was found
    pub fn is_empty(&self) -> bool {
        self.begin.is_none() && self.part.is_none() && self.end.is_none()
    }
}

/// Successfully decoded and CRC-verified article payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedArticle {
    /// Filename from `=ybegin`, already fixed up
    pub name: Option<String>,
    /// Part number for multi-part posts
    pub part: Option<u64>,
    /// Decoded binary data
    pub data: Vec<u8>,
    /// CRC32 of `data` as 8 uppercase hex digits
    pub crc32: String,
}

/// Position of an article inside a multi-part post, used by the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSpec {
    /// Part number (1-based)
    pub part: u32,
    /// Total number of parts
    pub total: u32,
    /// Byte offset where this part begins in the original file (1-based)
    pub begin: u64,
    /// Byte offset where this part ends in the original file
    pub end: u64,
    /// Size of the whole original file
    pub file_size: u64,
}
