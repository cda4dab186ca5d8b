//! # Key Hashing and Formatting
//!
//! Deterministic per-field hashing, order-sensitive combination into a
//! composite key hash, and the canonical display form of keys.
//!
//! Hashes must be reproducible across processes and store versions, so
//! nothing here depends on a randomized `BuildHasher`. Text is mixed a word at
//! a time with the FxHash rotate/xor/multiply step.

use crate::model::FieldValue;
use std::hash::Hasher;

/// Separator between field tokens in a display key
pub const KEY_DELIMITER: char = ':';

const SEED: u64 = 0xcbf2_9ce4_8422_2325;
const NULL_HASH: u64 = 0x9e37_79b9_7f4a_7c15;
const TRUE_HASH: u64 = 1;
const FALSE_HASH: u64 = 0;

/// Word-at-a-time mixing hasher
#[derive(Debug, Clone)]
pub struct WordHasher {
    state: u64,
}

impl WordHasher {
    /// FxHash constant (good mixing properties)
    const K: u64 = 0x517c_c1b7_2722_0a95;

    #[inline]
    pub fn new() -> Self {
        Self { state: 0 }
    }

    #[inline]
    pub fn with_seed(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline(always)]
    fn hash_word(&mut self, word: u64) {
        self.state = (self.state.rotate_left(5) ^ word).wrapping_mul(Self::K);
    }

    /// Hash a byte slice. The length is mixed in so that trailing zero bytes
    /// are not lost in the final partial word.
    #[inline]
    pub fn hash_bytes(bytes: &[u8]) -> u64 {
        let mut hasher = Self::new();
        hasher.write(bytes);
        hasher.hash_word(bytes.len() as u64);
        hasher.finish()
    }
}

impl Default for WordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for WordHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.state
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        let mut chunks = bytes.chunks_exact(8);
        for chunk in chunks.by_ref() {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            self.hash_word(u64::from_le_bytes(word));
        }

        let remainder = chunks.remainder();
        if !remainder.is_empty() {
            let mut word = 0u64;
            for (i, &byte) in remainder.iter().enumerate() {
                word |= (byte as u64) << (i * 8);
            }
            self.hash_word(word);
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.hash_word(i);
    }
}

/// Hash contribution of one field value.
///
/// Integers contribute their sign-extended value and floats their exact bit
/// pattern, so `-0.0` and `0.0` differ and a given `NaN` always hashes alike.
pub fn hash_field(value: &FieldValue) -> u64 {
    match value {
        FieldValue::Int(v) => *v as i64 as u64,
        FieldValue::Long(v) => *v as u64,
        FieldValue::Float(v) => v.to_bits() as u64,
        FieldValue::Double(v) => v.to_bits(),
        FieldValue::Boolean(true) => TRUE_HASH,
        FieldValue::Boolean(false) => FALSE_HASH,
        FieldValue::String(v) => WordHasher::hash_bytes(v.as_bytes()),
        FieldValue::Null => NULL_HASH,
    }
}

/// Combine ordered partial hashes into a composite key hash.
/// Order-sensitive: permuting the partials changes the result.
pub fn combine<I>(partials: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    let mut hasher = WordHasher::with_seed(SEED);
    for partial in partials {
        hasher.write_u64(partial);
    }
    avalanche(hasher.finish())
}

/// Composite hash of field values given in key declaration order
pub fn composite_hash(values: &[FieldValue]) -> u64 {
    combine(values.iter().map(hash_field))
}

/// Murmur3 finalizer; spreads entropy into the low bits used for slot selection
#[inline]
fn avalanche(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h
}

/// Canonical display token of a field value.
///
/// Floats use their shortest round-tripping form and keep a fractional part
/// for whole numbers (`2500.0`).
pub fn format_field(value: &FieldValue) -> String {
    match value {
        FieldValue::Int(v) => v.to_string(),
        FieldValue::Long(v) => v.to_string(),
        FieldValue::Float(v) => format!("{v:?}"),
        FieldValue::Double(v) => format!("{v:?}"),
        FieldValue::Boolean(v) => v.to_string(),
        FieldValue::String(v) => v.clone(),
        FieldValue::Null => "null".to_string(),
    }
}

/// Join field tokens in declaration order
pub fn format_key<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            out.push(KEY_DELIMITER);
        }
        out.push_str(token.as_ref());
    }
    out
}

/// Display string of field values given in key declaration order
pub fn display_key(values: &[FieldValue]) -> String {
    let tokens: Vec<String> = values.iter().map(format_field).collect();
    format_key(&tokens)
}

/// Split a display key into at most `arity` tokens. Any extra delimiters
/// stay inside the last token.
pub fn split_key(display: &str, arity: usize) -> Vec<&str> {
    display.splitn(arity.max(1), KEY_DELIMITER).collect()
}
