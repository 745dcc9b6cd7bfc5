use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use num_bigint::BigInt;
use crate::rsa::keys::KeyError;
use crate::rsa::keys::key_data::{PrivateKey, PublicKey};

/// Writes key fields one per line: numbers in lowercase hex, text verbatim.
pub struct KeyWriter {
    writer: Box<dyn Write>,
}

impl From<File> for KeyWriter {
    fn from(f: File) -> Self {
        Self::new(Box::new(f))
    }
}

impl KeyWriter {
    pub fn new(f: Box<dyn Write>) -> Self {
        KeyWriter { writer: f }
    }

    pub fn write_hex(&mut self, value: &BigInt) -> io::Result<()> {
        writeln!(self.writer, "{}", value.to_str_radix(16))
    }

    pub fn write_text(&mut self, value: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", value)
    }
}

impl Write for KeyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl PublicKey {
    pub fn write(&self, w: &mut KeyWriter) -> Result<(), KeyError> {
        w.write_hex(&self.key.m)?;
        w.write_hex(&self.key.base)?;
        w.write_hex(&self.signature)?;
        w.write_text(&self.username)?;
        w.flush()?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), KeyError> {
        self.write(&mut KeyWriter::from(File::create(path)?))
    }
}

impl PrivateKey {
    pub fn write(&self, w: &mut KeyWriter) -> Result<(), KeyError> {
        w.write_hex(&self.key.m)?;
        w.write_hex(&self.key.base)?;
        w.flush()?;
        Ok(())
    }

    /// Owner read/write only on Unix.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), KeyError> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        self.write(&mut KeyWriter::from(options.open(path)?))
    }
}
