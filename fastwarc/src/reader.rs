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

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::{debug, trace};

use crate::arc::{ArcHeader, ArcRecord};
use crate::compression::{Compression, RecordStream};
use crate::error::{Error, Result};
use crate::record::{parse_header_block, trim_line_ending, HeaderEncoding, HeaderMap, WarcRecord};

/// A record read from a mixed ARC/WARC stream.
#[derive(Debug, Clone)]
pub enum ArchiveRecord {
    Warc(WarcRecord),
    Arc(ArcRecord),
}

impl ArchiveRecord {
    pub fn is_warc(&self) -> bool {
        matches!(self, ArchiveRecord::Warc(_))
    }

    /// The WARC record, or `None` for ARC records.
    pub fn into_warc(self) -> Option<WarcRecord> {
        match self {
            ArchiveRecord::Warc(record) => Some(record),
            ArchiveRecord::Arc(_) => None,
        }
    }

    pub fn stream_pos(&self) -> u64 {
        match self {
            ArchiveRecord::Warc(record) => record.stream_pos(),
            ArchiveRecord::Arc(record) => record.stream_pos(),
        }
    }
}

/// Record stream iterator over WARC (any version) and ARC (v1, v2) files.
///
/// gzip compression is detected from the magic bytes.
pub struct ArchiveIterator<R: BufRead> {
    stream: RecordStream<R>,
    parse_http: bool,
    strict_framing: bool,
    pending_line: Option<Vec<u8>>,
    offset: u64,
    failed: bool,
}

impl ArchiveIterator<BufReader<File>> {
    /// Open an archive file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        ArchiveIterator::new(BufReader::new(file))
    }
}

impl<R: BufRead> ArchiveIterator<R> {
    /// Create a new archive iterator.
    ///
    /// HTTP parsing and strict framing checks are enabled by default.
    ///
    /// # Arguments
    ///
    /// * `reader` - Input stream, plain or gzip-compressed
    pub fn new(reader: R) -> Result<Self> {
        Ok(ArchiveIterator {
            stream: RecordStream::detect(reader)?,
            parse_http: true,
            strict_framing: true,
            pending_line: None,
            offset: 0,
            failed: false,
        })
    }

    /// Parse HTTP headers of `application/http` WARC records.
    pub fn parse_http(mut self, parse_http: bool) -> Self {
        self.parse_http = parse_http;
        self
    }

    /// Fail with [`Error::NonChunkedGzip`] if a gzip member holds more than one record.
    pub fn strict_framing(mut self, strict_framing: bool) -> Self {
        self.strict_framing = strict_framing;
        self
    }

    /// Compression of the underlying stream.
    pub fn compression(&self) -> Compression {
        self.stream.compression()
    }

    /// Read the next record from the stream.
    ///
    /// # Returns
    ///
    /// `Ok(Some(record))` if a record was read, `Ok(None)` if EOF, or an error
    pub fn read_next(&mut self) -> Result<Option<ArchiveRecord>> {
        let (record_start, first_line) = loop {
            let start = self.offset;
            match self.next_line()? {
                None => return Ok(None),
                Some(line) if trim_line_ending(&line).is_empty() => continue,
                Some(line) => break (start, line),
            }
        };

        let record = if first_line.starts_with(b"WARC/") {
            ArchiveRecord::Warc(self.read_warc(record_start, &first_line)?)
        } else {
            ArchiveRecord::Arc(self.read_arc(record_start, first_line)?)
        };

        if self.strict_framing && self.pending_line.is_none() && self.stream.member_has_more()? {
            return Err(Error::NonChunkedGzip {
                offset: record_start,
            });
        }
        Ok(Some(record))
    }

    fn next_line(&mut self) -> Result<Option<Vec<u8>>> {
        if let Some(line) = self.pending_line.take() {
            self.offset += line.len() as u64;
            return Ok(Some(line));
        }
        let mut line = Vec::new();
        let n = self.stream.read_until(b'\n', &mut line)?;
        if n == 0 {
            return Ok(None);
        }
        self.offset += n as u64;
        Ok(Some(line))
    }

    fn push_back(&mut self, line: Vec<u8>) {
        self.offset -= line.len() as u64;
        self.pending_line = Some(line);
    }

    fn read_exact_content(&mut self, record_start: u64, length: usize) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        let actual = (&mut self.stream)
            .take(length as u64)
            .read_to_end(&mut content)?;
        self.offset += actual as u64;
        if actual < length {
            return Err(Error::Truncated {
                offset: record_start,
                expected: length,
                actual,
            });
        }
        Ok(content)
    }

    fn read_warc(&mut self, record_start: u64, status_line: &[u8]) -> Result<WarcRecord> {
        let mut headers = HeaderMap::new(HeaderEncoding::Unicode);
        headers.set_status_line(trim_line_ending(status_line));
        self.offset += parse_header_block(&mut self.stream, &mut headers, false)? as u64;

        let length = headers
            .get("Content-Length")
            .ok_or_else(|| Error::InvalidHeader {
                offset: record_start,
                reason: "missing Content-Length".to_string(),
            })?;
        let length = length.trim().parse::<usize>().map_err(|_| Error::InvalidHeader {
            offset: record_start,
            reason: format!("invalid Content-Length {length:?}"),
        })?;

        let content = self.read_exact_content(record_start, length)?;
        let mut record = WarcRecord::from_parts(headers, content);
        record.set_stream_pos(record_start);
        if self.parse_http {
            record.parse_http();
        }
        trace!(
            offset = record_start,
            record_type = record.record_type().as_str(),
            "Read WARC record"
        );
        Ok(record)
    }

    fn read_arc(&mut self, record_start: u64, header_line: Vec<u8>) -> Result<ArcRecord> {
        let header = ArcHeader::parse(&header_line).ok_or_else(|| Error::InvalidHeader {
            offset: record_start,
            reason: format!(
                "not an ARC or WARC header: {:?}",
                String::from_utf8_lossy(trim_line_ending(&header_line))
            ),
        })?;

        let content = match header.length {
            Some(length) => self.read_exact_content(record_start, length)?,
            None => {
                debug!(
                    offset = record_start,
                    url = header.url.as_str(),
                    "ARC record without usable length, scanning for next header"
                );
                self.scan_arc_content()?
            }
        };

        let mut record = ArcRecord::new(header, header_line, content);
        record.set_stream_pos(record_start);
        Ok(record)
    }

    /// Collect content up to the next line that parses as an ARC header.
    ///
    /// The newline separating the content from the next record is not part of
    /// the content.
    fn scan_arc_content(&mut self) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        while let Some(line) = self.next_line()? {
            if ArcHeader::parse(&line).is_some() {
                self.push_back(line);
                break;
            }
            content.extend_from_slice(&line);
        }
        if content.last() == Some(&b'\n') {
            content.pop();
        }
        Ok(content)
    }
}

impl<R: BufRead> Iterator for ArchiveIterator<R> {
    type Item = Result<ArchiveRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = self.read_next().transpose();
        if matches!(result, Some(Err(_))) {
            self.failed = true;
        }
        result
    }
}
