//! yEnc envelope parsing, decoding and encoding
//!
//! yEnc is a binary-to-text encoding scheme designed specifically for Usenet.
//! It has only 1-2% overhead compared to 33-40% for Base64.
//!
//! Reference: http://www.yenc.org/yenc-draft.1.3.txt

pub mod decode;
pub mod encode;
pub mod envelope;
pub mod types;

pub use decode::{decode_article, decode_payload, fix_name};
pub use encode::encode_article;
pub use envelope::{parse_envelope, split_fields};
pub use types::{DecodedArticle, Envelope, PartSpec, YencFields};
