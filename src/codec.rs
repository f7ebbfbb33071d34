//! Short-code codec
//!
//! Deterministic bijection between non-negative integers and short strings
//! over a fixed alphabet. Codes are always derived from a registry-assigned
//! id, never chosen, so two distinct ids can never collide on one code.

use std::collections::HashMap;

use crate::errors::{LinkforgeError, Result};

/// Digits first, then lowercase, then uppercase (base 62).
pub const DEFAULT_ALPHABET: &str =
    "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub struct CodeCodec {
    alphabet: Vec<char>,
    index: HashMap<char, u64>,
}

impl CodeCodec {
    /// Builds a codec over the given alphabet.
    ///
    /// Fails when the alphabet has fewer than two symbols or contains
    /// duplicates; both are configuration errors, callers should treat
    /// them as fatal at startup.
    pub fn new(alphabet: &str) -> Result<Self> {
        let chars: Vec<char> = alphabet.chars().collect();
        if chars.len() < 2 {
            return Err(LinkforgeError::validation(
                "codec alphabet must have at least two characters",
            ));
        }

        let mut index = HashMap::with_capacity(chars.len());
        for (i, ch) in chars.iter().enumerate() {
            if index.insert(*ch, i as u64).is_some() {
                return Err(LinkforgeError::validation(format!(
                    "codec alphabet contains duplicate character: {ch:?}"
                )));
            }
        }

        Ok(Self {
            alphabet: chars,
            index,
        })
    }

    pub fn base(&self) -> u64 {
        self.alphabet.len() as u64
    }

    /// Encodes a non-negative integer as a short code.
    pub fn encode(&self, num: u64) -> String {
        if num == 0 {
            return self.alphabet[0].to_string();
        }

        let base = self.base();
        let mut digits = Vec::new();
        let mut n = num;
        while n > 0 {
            digits.push(self.alphabet[(n % base) as usize]);
            n /= base;
        }
        digits.iter().rev().collect()
    }

    /// Decodes a short code back into its integer id.
    ///
    /// Rejects empty input and any character outside the alphabet. Both
    /// are reachable from untrusted input (clients guessing codes), so
    /// callers must map this to "not found" rather than a server fault.
    pub fn decode(&self, code: &str) -> Result<u64> {
        if code.is_empty() {
            return Err(LinkforgeError::validation("code must be non-empty"));
        }

        let base = self.base();
        let mut n: u64 = 0;
        for ch in code.chars() {
            let val = self.index.get(&ch).ok_or_else(|| {
                LinkforgeError::validation(format!(
                    "invalid character for this alphabet: {ch:?}"
                ))
            })?;
            n = n
                .checked_mul(base)
                .and_then(|v| v.checked_add(*val))
                .ok_or_else(|| {
                    LinkforgeError::validation("code overflows the id space")
                })?;
        }
        Ok(n)
    }
}

impl Default for CodeCodec {
    fn default() -> Self {
        // DEFAULT_ALPHABET is statically known to be valid
        Self::new(DEFAULT_ALPHABET).expect("default alphabet is valid")
    }
}
