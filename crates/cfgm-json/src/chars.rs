//! UTF-8 character source over a buffered reader.

use std::io::{self, BufRead};

/// Decodes a byte stream into chars one at a time.
///
/// Read failures and malformed UTF-8 are yielded as `Err` items so the
/// tokenizer can report them with a position.
#[derive(Debug)]
pub struct Utf8Chars<R> {
    reader: R,
}

impl<R: BufRead> Utf8Chars<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

fn read_byte<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>> {
    let byte = loop {
        match reader.fill_buf() {
            Ok(buf) => match buf.first() {
                Some(byte) => break *byte,
                None => return Ok(None),
            },
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    };
    reader.consume(1);
    Ok(Some(byte))
}

fn sequence_width(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

fn invalid_utf8() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8")
}

impl<R: BufRead> Iterator for Utf8Chars<R> {
    type Item = io::Result<char>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = match read_byte(&mut self.reader) {
            Ok(Some(byte)) => byte,
            Ok(None) => return None,
            Err(e) => return Some(Err(e)),
        };
        let width = sequence_width(first);
        if width == 0 {
            return Some(Err(invalid_utf8()));
        }

        let mut buf = [first, 0, 0, 0];
        for slot in buf.iter_mut().take(width).skip(1) {
            match read_byte(&mut self.reader) {
                Ok(Some(byte)) => *slot = byte,
                Ok(None) => {
                    return Some(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "stream ended inside a UTF-8 sequence",
                    )))
                }
                Err(e) => return Some(Err(e)),
            }
        }

        match std::str::from_utf8(&buf[..width]) {
            Ok(s) => s.chars().next().map(Ok),
            Err(_) => Some(Err(invalid_utf8())),
        }
    }
}
