//! Fixed-length binary signature
//!
//! Bits are packed into `u64` words. The persisted form is a 4-byte
//! little-endian bit count followed by the bits packed LSB-first.

use crate::error::{Result, SoundprintError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    words: Vec<u64>,
    len: usize,
}

impl Signature {
    /// All-zero signature of `len` bits
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    pub fn from_bits(bits: &[bool]) -> Self {
        let mut sig = Self::new(bits.len());
        for (i, &bit) in bits.iter().enumerate() {
            if bit {
                sig.words[i / 64] |= 1 << (i % 64);
            }
        }
        sig
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bit at `index`, out-of-range reads as 0
    pub fn get(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    /// Panics when `index` is out of range.
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.len, "bit {} out of range {}", index, self.len);
        let mask = 1u64 << (index % 64);
        if value {
            self.words[index / 64] |= mask;
        } else {
            self.words[index / 64] &= !mask;
        }
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Positions of set bits, ascending
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(w * 64 + tz)
            })
        })
    }

    pub(crate) fn words(&self) -> &[u64] {
        &self.words
    }

    /// Serialize for the `signature` column
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.len.div_ceil(8));
        out.extend_from_slice(&(self.len as u32).to_le_bytes());
        for byte_idx in 0..self.len.div_ceil(8) {
            let word = self.words[byte_idx / 8];
            out.push((word >> ((byte_idx % 8) * 8)) as u8);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(SoundprintError::invalid(format!(
                "signature blob too short: {} bytes",
                bytes.len()
            )));
        }
        let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let payload = &bytes[4..];
        if payload.len() != len.div_ceil(8) {
            return Err(SoundprintError::invalid(format!(
                "signature blob declares {} bits but carries {} bytes",
                len,
                payload.len()
            )));
        }

        let mut sig = Self::new(len);
        for (byte_idx, &byte) in payload.iter().enumerate() {
            sig.words[byte_idx / 8] |= (byte as u64) << ((byte_idx % 8) * 8);
        }
        // Bits past `len` in the last byte must not leak into comparisons
        if len % 64 != 0 {
            if let Some(last) = sig.words.last_mut() {
                *last &= (1u64 << (len % 64)) - 1;
            }
        }
        Ok(sig)
    }
}
