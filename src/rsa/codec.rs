use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use std::thread;
use crossbeam_channel::{bounded, unbounded};
use indicatif::{ProgressBar, ProgressStyle};
use num_bigint::{BigInt, Sign};
use num_traits::Signed;
use crate::rsa::config::silent;
use crate::rsa::keys::{parse_hex, Key};
use crate::RSA;

/// Prefixed to every plaintext block so leading zero bytes survive the
/// round trip through an integer.
pub const MARKER: u8 = 0xFF;

#[derive(Debug)]
pub enum CodecError {
    Io(io::Error),
    Corrupt { line: usize, reason: String },
    ModulusTooSmall(u64),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Io(e) => write!(f, "IO error: {}", e),
            CodecError::Corrupt { line, reason } => write!(f, "Corrupt ciphertext on line {}: {}", line, reason),
            CodecError::ModulusTooSmall(bits) => write!(f, "Modulus of {} bits cannot hold a block", bits),
        }
    }
}

impl Error for CodecError {}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        CodecError::Io(e)
    }
}

/// `k = (bits(n) - 1) / 8`; each block carries `k - 1` plaintext bytes.
pub fn block_size(n: &BigInt) -> Result<usize, CodecError> {
    let k = (n.bits().saturating_sub(1) / 8) as usize;
    if k < 2 {
        return Err(CodecError::ModulusTooSmall(n.bits()));
    }
    Ok(k)
}

/// Splits `data` into marker-prefixed blocks. A trailing marker-only block is
/// emitted whenever the length is a multiple of `k - 1`, empty input included.
pub fn encode_blocks(data: &[u8], k: usize) -> Vec<BigInt> {
    let payload = k - 1;
    let mut chunks: Vec<&[u8]> = data.chunks(payload).collect();
    if data.len() % payload == 0 {
        chunks.push(&[]);
    }
    chunks.iter().map(|chunk| {
        let mut block = Vec::with_capacity(k);
        block.push(MARKER);
        block.extend_from_slice(chunk);
        BigInt::from_bytes_be(Sign::Plus, &block)
    }).collect()
}

/// Strips the marker from a decrypted block.
pub fn decode_block(m: &BigInt, k: usize) -> Result<Vec<u8>, String> {
    let bytes = m.to_bytes_be().1;
    match bytes.first() {
        Some(&MARKER) if bytes.len() <= k => Ok(bytes[1..].to_vec()),
        Some(&MARKER) => Err(format!("block of {} bytes exceeds {}", bytes.len(), k)),
        _ => Err("missing block marker".to_string()),
    }
}

fn progress_bar(total: usize) -> Option<ProgressBar> {
    if silent() || total == 0 {
        return None;
    }
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} blocks ({eta})") {
        pb.set_style(style.progress_chars("#>-"));
    }
    Some(pb)
}

/// Applies `op` to every block on `threads` workers, returning results in
/// input order.
pub fn exponentiate_all(blocks: Vec<BigInt>, key: &Key, op: fn(&BigInt, &Key) -> BigInt, threads: usize) -> Vec<BigInt> {
    let total = blocks.len();
    let workers = threads.max(1);
    let pb = progress_bar(total);
    let (map_tx, map_rx) = bounded::<(usize, BigInt)>(workers);
    let (reduce_tx, reduce_rx) = unbounded();
    thread::scope(|scope| {
        for _ in 0..workers {
            let r = map_rx.clone();
            let s = reduce_tx.clone();
            let pb = pb.clone();
            scope.spawn(move || {
                for (index, block) in r.iter() {
                    let res = op(&block, key);
                    if let Some(pb) = &pb {
                        pb.inc(1);
                    }
                    if s.send((index, res)).is_err() { break; }
                }
            });
        }
        for item in blocks.into_iter().enumerate() {
            if map_tx.send(item).is_err() { break; }
        }
        drop(map_tx);
    });
    drop(reduce_tx);
    if let Some(pb) = &pb {
        pb.finish_with_message("Done");
    }
    let mut res_collect: Vec<(usize, BigInt)> = reduce_rx.iter().collect();
    res_collect.sort_by_key(|x| x.0);
    res_collect.into_iter().map(|x| x.1).collect()
}

/// Reads the whole plaintext and writes one lowercase hex line per block.
pub fn encrypt_stream(reader: &mut dyn Read, writer: &mut dyn Write, key: &Key, threads: usize) -> Result<(), CodecError> {
    let k = block_size(&key.m)?;
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    let blocks = encode_blocks(&data, k);
    crate::log!("plaintext {} bytes, block size {}, {} blocks", data.len(), k, blocks.len());
    for c in exponentiate_all(blocks, key, RSA::encrypt, threads) {
        writeln!(writer, "{}", c.to_str_radix(16))?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads hex lines, skipping blank lines and non-positive values.
pub fn decrypt_stream(reader: &mut dyn Read, writer: &mut dyn Write, key: &Key, threads: usize) -> Result<(), CodecError> {
    let k = block_size(&key.m)?;
    let mut blocks = Vec::new();
    let mut line_numbers = Vec::new();
    for (i, line) in BufReader::new(reader).lines().enumerate() {
        let line = match line {
            Err(e) if e.kind() == ErrorKind::InvalidData => return Err(CodecError::Corrupt {
                line: i + 1,
                reason: "invalid UTF-8".to_string(),
            }),
            line => line?,
        };
        let text = line.trim();
        if text.is_empty() { continue; }
        let c = parse_hex(text).ok_or_else(|| CodecError::Corrupt {
            line: i + 1,
            reason: "not a hexadecimal number".to_string(),
        })?;
        if !c.is_positive() { continue; }
        blocks.push(c);
        line_numbers.push(i + 1);
    }
    crate::log!("ciphertext {} blocks, block size {}", blocks.len(), k);
    let plain = exponentiate_all(blocks, key, RSA::decrypt, threads);
    for (m, line) in plain.iter().zip(line_numbers) {
        let bytes = decode_block(m, k).map_err(|reason| CodecError::Corrupt { line, reason })?;
        writer.write_all(&bytes)?;
    }
    writer.flush()?;
    Ok(())
}
