//! Call data layout: a 4-byte function selector followed by 32-byte words
//!
//! Guarded calls forward their encoded arguments to conditions as `data`.
//! Words are big-endian, so comparing two words as byte arrays compares them
//! as unsigned 256-bit integers.

use crate::address::{Address, ADDRESS_LENGTH};
use crate::hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of an encoded argument word
pub const WORD_SIZE: usize = 32;

/// A 32-byte big-endian argument word
pub type Word = [u8; WORD_SIZE];

/// 4-byte function selector
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Selector(pub [u8; 4]);

impl Selector {
    /// Selector for a function signature such as `"withdraw(uint256,uint256)"`
    pub fn from_signature(signature: &str) -> Self {
        let digest = hash::hash(signature.as_bytes());
        Self([digest[0], digest[1], digest[2], digest[3]])
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({self})")
    }
}

/// Encode an unsigned integer as a word
pub fn word_from_u128(value: u128) -> Word {
    let mut word = [0u8; WORD_SIZE];
    word[WORD_SIZE - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Encode an address as a left-padded word
pub fn word_from_address(address: Address) -> Word {
    let mut word = [0u8; WORD_SIZE];
    word[WORD_SIZE - ADDRESS_LENGTH..].copy_from_slice(address.as_bytes());
    word
}

/// Encode a call from a selector and argument words
pub fn encode_call(selector: Selector, args: &[Word]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * WORD_SIZE);
    data.extend_from_slice(&selector.0);
    for arg in args {
        data.extend_from_slice(arg);
    }
    data
}

/// Read the selector of encoded call data
pub fn selector_of(data: &[u8]) -> Option<Selector> {
    let bytes: [u8; 4] = data.get(..4)?.try_into().ok()?;
    Some(Selector(bytes))
}

/// Read argument word `index` of encoded call data
pub fn argument(data: &[u8], index: usize) -> Option<Word> {
    let start = 4usize.checked_add(index.checked_mul(WORD_SIZE)?)?;
    let end = start.checked_add(WORD_SIZE)?;
    data.get(start..end)?.try_into().ok()
}
