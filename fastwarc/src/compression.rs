// Copyright 2025 Janek Bevendorff
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Handling of record compression.
//!
//! Records in a WARC file are compressed individually so that a reader can
//! seek to any record offset and decompress only that record. Readers here
//! decompress member by member and keep track of where a member ends, which is
//! what allows detecting files compressed as one big gzip member.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;

use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;

/// gzip magic bytes (RFC 1952).
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub fn is_gzip_magic(header: &[u8]) -> bool {
    header.len() >= 2 && header[0] == GZIP_MAGIC[0] && header[1] == GZIP_MAGIC[1]
}

/// The supported methods of compressing a single record.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Compression {
    /// Uncompressed data
    None,
    /// One gzip member per record
    Gzip,
}

impl Compression {
    /// Best guess of compression for a file with the given name.
    ///
    /// Only the path is inspected, never the file.
    pub fn guess_for_filename<P: AsRef<Path>>(path: P) -> Compression {
        match path.as_ref().extension() {
            Some(ext) if ext == "gz" => Compression::Gzip,
            _ => Compression::None,
        }
    }

    /// Write one record's serialized bytes as a self-contained unit.
    pub(crate) fn write_unit<W: Write>(&self, out: &mut W, bytes: &[u8]) -> io::Result<()> {
        match self {
            Compression::None => out.write_all(bytes),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(out, flate2::Compression::default());
                encoder.write_all(bytes)?;
                encoder.finish()?;
                Ok(())
            }
        }
    }
}

enum MemberState<R: BufRead> {
    Member(BufReader<GzDecoder<R>>),
    Done,
}

/// Concatenated gzip members read as one stream, with member boundaries visible.
pub(crate) struct GzipMembers<R: BufRead> {
    state: MemberState<R>,
}

impl<R: BufRead> GzipMembers<R> {
    pub(crate) fn new(inner: R) -> Self {
        GzipMembers {
            state: MemberState::Member(BufReader::new(GzDecoder::new(inner))),
        }
    }

    fn current_exhausted(&mut self) -> io::Result<bool> {
        match &mut self.state {
            MemberState::Member(reader) => Ok(reader.fill_buf()?.is_empty()),
            MemberState::Done => Ok(false),
        }
    }

    fn advance(&mut self) -> io::Result<()> {
        if let MemberState::Member(reader) = std::mem::replace(&mut self.state, MemberState::Done) {
            let mut inner = reader.into_inner().into_inner();
            if !inner.fill_buf()?.is_empty() {
                self.state = MemberState::Member(BufReader::new(GzDecoder::new(inner)));
            }
        }
        Ok(())
    }

    /// Whether the current member holds more than whitespace.
    ///
    /// Leading `\r`/`\n` bytes are consumed. The next member is never touched.
    pub(crate) fn member_has_more(&mut self) -> io::Result<bool> {
        let MemberState::Member(reader) = &mut self.state else {
            return Ok(false);
        };
        loop {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(false);
            }
            let skip = buf.iter().take_while(|b| matches!(b, b'\r' | b'\n')).count();
            if skip == 0 {
                return Ok(true);
            }
            reader.consume(skip);
        }
    }
}

impl<R: BufRead> Read for GzipMembers<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = {
            let available = self.fill_buf()?;
            let n = available.len().min(buf.len());
            buf[..n].copy_from_slice(&available[..n]);
            n
        };
        self.consume(n);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for GzipMembers<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.current_exhausted()? {
            self.advance()?;
        }
        match &mut self.state {
            MemberState::Member(reader) => reader.fill_buf(),
            MemberState::Done => Ok(&[]),
        }
    }

    fn consume(&mut self, amt: usize) {
        if let MemberState::Member(reader) = &mut self.state {
            reader.consume(amt);
        }
    }
}

/// Decompressed record byte source.
pub(crate) enum RecordStream<R: BufRead> {
    Plain(R),
    Gzip(GzipMembers<R>),
}

impl<R: BufRead> RecordStream<R> {
    /// Sniff the gzip magic and wrap the reader accordingly.
    pub(crate) fn detect(mut reader: R) -> io::Result<Self> {
        if is_gzip_magic(reader.fill_buf()?) {
            Ok(RecordStream::Gzip(GzipMembers::new(reader)))
        } else {
            Ok(RecordStream::Plain(reader))
        }
    }

    pub(crate) fn compression(&self) -> Compression {
        match self {
            RecordStream::Plain(_) => Compression::None,
            RecordStream::Gzip(_) => Compression::Gzip,
        }
    }

    pub(crate) fn member_has_more(&mut self) -> io::Result<bool> {
        match self {
            RecordStream::Plain(_) => Ok(false),
            RecordStream::Gzip(members) => members.member_has_more(),
        }
    }
}

impl<R: BufRead> Read for RecordStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            RecordStream::Plain(r) => r.read(buf),
            RecordStream::Gzip(r) => r.read(buf),
        }
    }
}

impl<R: BufRead> BufRead for RecordStream<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            RecordStream::Plain(r) => r.fill_buf(),
            RecordStream::Gzip(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            RecordStream::Plain(r) => r.consume(amt),
            RecordStream::Gzip(r) => r.consume(amt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        Compression::Gzip.write_unit(&mut out, data).unwrap();
        out
    }

    #[test]
    fn test_guess_for_filename() {
        assert_eq!(Compression::guess_for_filename("a.warc.gz"), Compression::Gzip);
        assert_eq!(Compression::guess_for_filename("a.warc"), Compression::None);
    }

    #[test]
    fn test_members_read_as_one_stream() {
        let mut data = gzip(b"first\n");
        data.extend(gzip(b"second\n"));
        let mut stream = RecordStream::detect(&data[..]).unwrap();
        assert_eq!(stream.compression(), Compression::Gzip);

        let mut text = String::new();
        stream.read_to_string(&mut text).unwrap();
        assert_eq!(text, "first\nsecond\n");
    }

    #[test]
    fn test_member_boundary() {
        let mut data = gzip(b"one\r\n\r\n");
        data.extend(gzip(b"two\r\n\r\nthree"));
        let mut stream = RecordStream::detect(&data[..]).unwrap();

        let mut line = Vec::new();
        stream.read_until(b'\n', &mut line).unwrap();
        assert_eq!(line, b"one\r\n");
        assert!(!stream.member_has_more().unwrap());

        line.clear();
        stream.read_until(b'\n', &mut line).unwrap();
        assert_eq!(line, b"two\r\n");
        assert!(stream.member_has_more().unwrap());
    }

    #[test]
    fn test_plain_stream() {
        let mut stream = RecordStream::detect(&b"WARC/1.0\r\n"[..]).unwrap();
        assert_eq!(stream.compression(), Compression::None);
        assert!(!stream.member_has_more().unwrap());
    }
}
