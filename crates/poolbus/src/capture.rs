use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use crate::exit::{io_error, CliResult};

/// Adapts a hex text capture (`A5 00 10 60 ...`) into the raw byte stream.
///
/// Tokens are whitespace separated, may carry a `0x` prefix or a trailing comma,
/// and may pack several bytes (`A5001060`). `#` starts a comment.
pub struct HexReader<R> {
    inner: R,
    line: String,
    line_number: usize,
    pending: VecDeque<u8>,
}

impl<R: BufRead> HexReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: String::new(),
            line_number: 0,
            pending: VecDeque::new(),
        }
    }
}

impl<R: BufRead> Read for HexReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pending.is_empty() {
            self.line.clear();
            if self.inner.read_line(&mut self.line)? == 0 {
                return Ok(0);
            }
            self.line_number += 1;
            parse_hex_line(&self.line, &mut self.pending).map_err(|token| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line {}: invalid hex token '{token}'", self.line_number),
                )
            })?;
        }

        let count = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

fn parse_hex_line(line: &str, out: &mut VecDeque<u8>) -> Result<(), String> {
    let data = line.split('#').next().unwrap_or_default();
    for token in data.split_whitespace() {
        let digits = token.trim_end_matches(',');
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits);

        if digits.is_empty() || digits.len() % 2 != 0 || !digits.is_ascii() {
            return Err(token.to_string());
        }
        for pair in digits.as_bytes().chunks(2) {
            let pair = std::str::from_utf8(pair).map_err(|_| token.to_string())?;
            let byte = u8::from_str_radix(pair, 16).map_err(|_| token.to_string())?;
            out.push_back(byte);
        }
    }
    Ok(())
}

/// Open a capture file, or stdin for `-`.
pub fn open_capture(path: &Path, hex: bool) -> CliResult<Box<dyn Read>> {
    let source: Box<dyn BufRead> = if path == Path::new("-") {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(path)
            .map_err(|err| io_error(&format!("cannot open {}", path.display()), err))?;
        Box::new(BufReader::new(file))
    };

    if hex {
        Ok(Box::new(HexReader::new(source)))
    } else {
        Ok(Box::new(source))
    }
}
