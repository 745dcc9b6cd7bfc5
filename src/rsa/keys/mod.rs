pub mod key_writer;
pub mod key_reader;
pub mod key_data;
pub mod key_pair;

pub use key_pair::*;
pub use key_reader::*;
pub use key_writer::*;
pub use key_data::*;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use num_bigint::BigInt;
use num_traits::Zero;

/// Exponent and modulus, the part of a key that exponentiation needs.
#[derive(Debug, Clone)]
pub struct Key {
    pub base: BigInt,
    pub m: BigInt,
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.m == other.m && self.base == other.base
    }
}

#[derive(Debug)]
pub struct KeySet {
    pub public: Key,
    pub private: Key,
}

#[derive(Debug)]
pub enum KeyError {
    Io(io::Error),
    Missing(&'static str),
    Corrupt { field: &'static str, line: usize },
    BadUsername(String),
}

impl Display for KeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyError::Io(e) => write!(f, "Key file IO error: {}", e),
            KeyError::Missing(field) => write!(f, "Key file ends before {}", field),
            KeyError::Corrupt { field, line } => write!(f, "Corrupt {} on key file line {}", field, line),
            KeyError::BadUsername(name) => write!(f, "Username {:?} is not a base-62 string", name),
        }
    }
}

impl Error for KeyError {}

impl From<io::Error> for KeyError {
    fn from(e: io::Error) -> Self {
        KeyError::Io(e)
    }
}

/// Lowercase or uppercase hex digits with an optional leading `-`; no `+`,
/// no `_` separators, no prefix.
pub fn parse_hex(text: &str) -> Option<BigInt> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    BigInt::parse_bytes(text.as_bytes(), 16)
}

fn base62_digit(c: char) -> Option<u32> {
    match c {
        '0'..='9' => Some(c as u32 - '0' as u32),
        'A'..='Z' => Some(c as u32 - 'A' as u32 + 10),
        'a'..='z' => Some(c as u32 - 'a' as u32 + 36),
        _ => None,
    }
}

/// Reads a username as a base-62 number: `0-9`, then `A-Z`, then `a-z`.
pub fn username_to_bigint(name: &str) -> Result<BigInt, KeyError> {
    if name.is_empty() {
        return Err(KeyError::BadUsername(name.to_string()));
    }
    name.chars().try_fold(BigInt::zero(), |acc, c| match base62_digit(c) {
        Some(d) => Ok(acc * 62u32 + d),
        None => Err(KeyError::BadUsername(name.to_string())),
    })
}
