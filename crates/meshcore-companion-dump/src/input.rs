//! Reading captures: raw binary or hex text, from a file or stdin.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use clap::ValueEnum;
use thiserror::Error;

/// How the capture is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Hex if the input is only hex digits, whitespace and `#` comment
    /// lines, binary otherwise.
    Auto,
    /// Raw bytes as read from the port.
    Binary,
    /// Hex text; each non-empty line is one delivery.
    Hex,
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),

    #[error("invalid hex on line {line}: {source}")]
    Hex {
        line: usize,
        #[source]
        source: hex::FromHexError,
    },
}

/// Read a whole capture from `path`, or stdin when it is `None` or `-`.
pub fn read(path: Option<&Path>) -> Result<Vec<u8>, InputError> {
    match path {
        Some(p) if p != Path::new("-") => Ok(fs::read(p)?),
        _ => {
            let mut data = Vec::new();
            io::stdin().lock().read_to_end(&mut data)?;
            Ok(data)
        }
    }
}

/// Split a capture into the chunks handed to the reassembler.
///
/// Binary captures are cut every `chunk_size` bytes. Hex captures keep their
/// line structure, so a transparent-mode capture can record one notification
/// per line. Lines starting with `#` are comments.
pub fn chunks(
    data: &[u8],
    format: InputFormat,
    chunk_size: usize,
) -> Result<Vec<Vec<u8>>, InputError> {
    let format = match format {
        InputFormat::Auto if looks_like_hex(data) => InputFormat::Hex,
        InputFormat::Auto => InputFormat::Binary,
        other => other,
    };

    match format {
        InputFormat::Hex => hex_lines(&String::from_utf8_lossy(data)),
        _ => Ok(data
            .chunks(chunk_size.max(1))
            .map(<[u8]>::to_vec)
            .collect()),
    }
}

fn looks_like_hex(data: &[u8]) -> bool {
    let mut digits = 0;
    for line in data.split(|&b| b == b'\n') {
        let first = line.iter().find(|b| !b.is_ascii_whitespace());
        if first == Some(&b'#') {
            continue;
        }
        for &b in line {
            if b.is_ascii_hexdigit() {
                digits += 1;
            } else if !b.is_ascii_whitespace() {
                return false;
            }
        }
    }
    digits > 0
}

fn hex_lines(text: &str) -> Result<Vec<Vec<u8>>, InputError> {
    let mut chunks = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let digits: String = line.split_whitespace().collect();
        let bytes = hex::decode(&digits).map_err(|source| InputError::Hex {
            line: i + 1,
            source,
        })?;
        chunks.push(bytes);
    }
    Ok(chunks)
}
