use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Lines, Read};
use std::path::Path;
use num_bigint::BigInt;
use num_traits::Signed;
use crate::rsa::keys::{parse_hex, Key, KeyError};
use crate::rsa::keys::key_data::{PrivateKey, PublicKey};

/// Pulls key fields line by line, failing on the first line that does not parse.
pub struct KeyReader {
    lines: Lines<BufReader<Box<dyn Read>>>,
    line: usize,
}

impl KeyReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { lines: BufReader::new(reader).lines(), line: 0 }
    }

    fn next_line(&mut self, field: &'static str) -> Result<String, KeyError> {
        loop {
            self.line += 1;
            match self.lines.next() {
                Some(Err(e)) if e.kind() == ErrorKind::InvalidData =>
                    return Err(KeyError::Corrupt { field, line: self.line }),
                Some(line) => {
                    let line = line?;
                    let trimmed = line.trim();
                    if !trimmed.is_empty() { return Ok(trimmed.to_string()); }
                }
                None => return Err(KeyError::Missing(field)),
            }
        }
    }

    pub fn read_hex(&mut self, field: &'static str) -> Result<BigInt, KeyError> {
        let line = self.next_line(field)?;
        match parse_hex(&line) {
            Some(v) if !v.is_negative() => Ok(v),
            _ => Err(KeyError::Corrupt { field, line: self.line }),
        }
    }

    /// Like `read_hex`, but the value must exceed `floor`.
    pub fn read_hex_above(&mut self, field: &'static str, floor: u32) -> Result<BigInt, KeyError> {
        let v = self.read_hex(field)?;
        if v <= BigInt::from(floor) {
            return Err(KeyError::Corrupt { field, line: self.line });
        }
        Ok(v)
    }

    pub fn read_text(&mut self, field: &'static str) -> Result<String, KeyError> {
        self.next_line(field)
    }
}

impl PublicKey {
    pub fn read(r: &mut KeyReader) -> Result<Self, KeyError> {
        let m = r.read_hex_above("modulus", 1)?;
        let base = r.read_hex_above("public exponent", 0)?;
        let signature = r.read_hex("signature")?;
        let username = r.read_text("username")?;
        Ok(PublicKey::new(Key { base, m }, signature, username))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, KeyError> {
        PublicKey::read(&mut KeyReader::new(Box::new(File::open(path)?)))
    }
}

impl PrivateKey {
    pub fn read(r: &mut KeyReader) -> Result<Self, KeyError> {
        let m = r.read_hex_above("modulus", 1)?;
        let base = r.read_hex_above("private exponent", 0)?;
        Ok(PrivateKey::new(Key { base, m }))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, KeyError> {
        PrivateKey::read(&mut KeyReader::new(Box::new(File::open(path)?)))
    }
}
