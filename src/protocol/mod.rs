//! Protocol Layer: format record in-memory
//!
//! Prinsip desain:
//! - Length-prefixed: 8-byte length di depan payload
//! - Word aligned: setiap record dipad ke kelipatan 8 bytes
//! - No allocation: record ditulis langsung ke arena

mod record;

pub use record::{
    checksum, padded_len, record_words, Checksum, LEN_PREFIX_BYTES, MAX_RECORD_LIMIT, WORD_BYTES,
};
