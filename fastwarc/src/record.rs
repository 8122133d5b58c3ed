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

use std::io::{self, BufRead};

use encoding::all::WINDOWS_1252;
use encoding::{DecoderTrap, Encoding};
use uuid::Uuid;

/// Protocol line written by default for new records.
pub const WARC_1_0: &str = "WARC/1.0";

/// WARC record type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarcRecordType {
    WarcInfo,
    Response,
    Resource,
    Request,
    Metadata,
    Revisit,
    Conversion,
    Continuation,
    Unknown,
}

impl WarcRecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarcRecordType::WarcInfo => "warcinfo",
            WarcRecordType::Response => "response",
            WarcRecordType::Resource => "resource",
            WarcRecordType::Request => "request",
            WarcRecordType::Metadata => "metadata",
            WarcRecordType::Revisit => "revisit",
            WarcRecordType::Conversion => "conversion",
            WarcRecordType::Continuation => "continuation",
            WarcRecordType::Unknown => "unknown",
        }
    }

    /// Map a `WARC-Type` header value to a record type, falling back to `Unknown`.
    pub fn from_header(value: &str) -> Self {
        WarcRecordType::try_from(value.trim()).unwrap_or(WarcRecordType::Unknown)
    }
}

impl TryFrom<&str> for WarcRecordType {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "warcinfo" => Ok(WarcRecordType::WarcInfo),
            "response" => Ok(WarcRecordType::Response),
            "resource" => Ok(WarcRecordType::Resource),
            "request" => Ok(WarcRecordType::Request),
            "metadata" => Ok(WarcRecordType::Metadata),
            "revisit" => Ok(WarcRecordType::Revisit),
            "conversion" => Ok(WarcRecordType::Conversion),
            "continuation" => Ok(WarcRecordType::Continuation),
            "unknown" => Ok(WarcRecordType::Unknown),
            _ => Err("Invalid enum value."),
        }
    }
}

impl From<WarcRecordType> for &'static str {
    fn from(value: WarcRecordType) -> Self {
        value.as_str()
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum HeaderEncoding {
    Unicode,
    Latin1,
}

/// Decode header bytes as UTF-8, or as Windows-1252 if they are not valid UTF-8.
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => WINDOWS_1252
            .decode(bytes, DecoderTrap::Replace)
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Dict-like type representing a WARC or HTTP header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    encoding: HeaderEncoding,
    status_line: Vec<u8>,
    headers: Vec<(Vec<u8>, Vec<u8>)>,
}

impl HeaderMap {
    /// Create a new header map with the specified encoding.
    ///
    /// # Arguments
    ///
    /// * `encoding` - Header source encoding
    pub fn new(encoding: HeaderEncoding) -> Self {
        HeaderMap {
            encoding,
            status_line: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Get the header status line.
    pub fn status_line(&self) -> String {
        self.decode(&self.status_line)
    }

    /// Get the raw status line as bytes.
    pub fn status_line_bytes(&self) -> &[u8] {
        &self.status_line
    }

    /// Set status line contents.
    ///
    /// # Arguments
    ///
    /// * `status_line` - New status line
    pub fn set_status_line(&mut self, status_line: impl AsRef<[u8]>) {
        self.status_line = status_line.as_ref().to_vec();
    }

    /// HTTP status code (unset if header block is not an HTTP response header block).
    pub fn status_code(&self) -> Option<u16> {
        if !self.status_line.starts_with(b"HTTP/") {
            return None;
        }
        let mut parts = self.status_line.splitn(3, |&b| b == b' ');
        // Skip HTTP/
        parts.next()?;
        String::from_utf8_lossy(parts.next()?).parse::<u16>().ok()
    }

    fn decode(&self, byte_str: &[u8]) -> String {
        match &self.encoding {
            HeaderEncoding::Unicode => String::from_utf8_lossy(byte_str).to_string(),
            HeaderEncoding::Latin1 => WINDOWS_1252
                .decode(byte_str, DecoderTrap::Ignore)
                .unwrap_or_else(|_| String::new()),
        }
    }

    /// Raw HTTP reason phrase bytes.
    /// Returns None if the header block is not an HTTP response header block or no reason phrase was given.
    pub fn reason_phrase_bytes(&self) -> Option<&[u8]> {
        if !self.status_line.starts_with(b"HTTP/") {
            return None;
        }
        let mut parts = self.status_line.splitn(3, |&b| b == b' ');
        // Skip HTTP/ and status code
        parts.next()?;
        parts.next()?;
        parts.next()
    }

    /// HTTP reason phrase.
    /// Returns None if the header block is not an HTTP response header block or no reason phrase was given.
    pub fn reason_phrase(&self) -> Option<String> {
        self.reason_phrase_bytes().map(decode_header_bytes)
    }

    /// Get value for (case-insensitive) header key a string.
    /// Duplicate headers are returned as a single value joined with `","`.
    ///
    /// # Arguments
    ///
    /// * `key` - Header key
    pub fn get(&self, key: &str) -> Option<String> {
        Some(self.decode(&self.get_bytes(key.as_bytes())?))
    }

    /// Get value for (case-insensitive) header key as bytes.
    /// Duplicate headers are returned as a single value joined with `","`.
    ///
    /// # Arguments
    ///
    /// * `key` - Header key
    pub fn get_bytes(&self, key: &[u8]) -> Option<Vec<u8>> {
        let values: Vec<&[u8]> = self
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_slice())
            .collect();
        if !values.is_empty() {
            Some(values.as_slice().join(b",".as_slice()))
        } else {
            None
        }
    }

    /// Check if a (case-insensitive) header key exists.
    ///
    /// # Arguments
    ///
    /// * `key` - Header key
    pub fn contains_key(&self, key: &str) -> bool {
        let key_bytes = key.as_bytes();
        self.headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(key_bytes))
    }

    /// Insert new header and overwrite existing header(s) if the key already exists.
    ///
    /// If a header already exists, its first occurrence will be updated and
    /// all following occurrences will be dropped.
    ///
    /// # Arguments
    ///
    /// * `key` - Header key
    /// * `value` - Header value
    pub fn set(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) {
        self.set_bytes(key.as_ref().as_bytes(), value.as_ref().as_bytes());
    }

    /// Insert new header and overwrite existing header(s) if the key already exists.
    ///
    /// # Arguments
    ///
    /// * `key` - Header key as bytes
    /// * `value` - Header value as bytes
    pub fn set_bytes(&mut self, key: &[u8], value: &[u8]) {
        let mut found = false;
        self.headers.retain_mut(|h| {
            if !h.0.eq_ignore_ascii_case(key) {
                true
            } else if !found {
                *h = (key.trim_ascii().to_vec(), value.trim_ascii().to_vec());
                found = true;
                true
            } else {
                false
            }
        });
        if !found {
            self.headers
                .push((key.trim_ascii().to_vec(), value.trim_ascii().to_vec()));
        }
    }

    /// Append header.
    ///
    /// Appending a new header does not check for existing headers with the same name.
    ///
    /// # Arguments
    ///
    /// * `key` - Header key
    /// * `value` - Header value
    pub fn append(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) {
        self.append_bytes(key.as_ref().as_bytes(), value.as_ref().as_bytes());
    }

    /// Append header.
    ///
    /// # Arguments
    ///
    /// * `key` - Header key as bytes
    /// * `value` - Header value as bytes
    pub fn append_bytes(&mut self, key: &[u8], value: &[u8]) {
        self.headers
            .push((key.trim_ascii().to_vec(), value.trim_ascii().to_vec()));
    }

    /// Remove all occurrences of a (case-insensitive) header key.
    ///
    /// Returns the number of removed headers.
    pub fn remove(&mut self, key: &str) -> usize {
        let before = self.headers.len();
        self.headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case(key.as_bytes()));
        before - self.headers.len()
    }

    /// Iterator of keys and values.
    pub fn items(&self) -> impl Iterator<Item = (String, String)> + use<'_> {
        self.headers
            .iter()
            .map(|(k, v)| (self.decode(k), self.decode(v)))
    }

    /// Get the number of headers.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Check if the header map is empty.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Clear all headers.
    pub fn clear(&mut self) {
        self.headers.clear();
        self.status_line.clear();
    }

    /// Write header block into stream.
    pub fn write<W: io::Write>(&self, writer: &mut W) -> io::Result<usize> {
        let mut bytes_written = 0usize;
        if !self.status_line.is_empty() {
            writer.write_all(&self.status_line)?;
            bytes_written += self.status_line.len();
            writer.write_all(b"\r\n")?;
            bytes_written += 2;
        }
        for (key, value) in &self.headers {
            if !key.is_empty() {
                writer.write_all(key)?;
                bytes_written += key.len();
                writer.write_all(b": ")?;
                bytes_written += 2;
            }
            writer.write_all(value)?;
            bytes_written += value.len();
            writer.write_all(b"\r\n")?;
            bytes_written += 2;
        }
        Ok(bytes_written)
    }

    fn add_continuation(&mut self, value: &[u8]) {
        if let Some(last) = self.headers.last_mut() {
            last.1.push(b' ');
            last.1.extend_from_slice(value);
        } else {
            self.headers.push((Vec::new(), value.to_vec()));
        }
    }
}

/// Parse a header block from a buffered reader.
///
/// Reading stops after the first empty line or at the end of the stream.
/// Both `CRLF` and plain `LF` line endings are accepted.
///
/// # Arguments
///
/// * `reader` - Input reader
/// * `target` - Header map to fill
/// * `has_status_line` - Whether first line is a status line or already a header
///
/// # Returns
///
/// Number of bytes read from `reader`
pub fn parse_header_block<R: BufRead>(
    reader: &mut R,
    target: &mut HeaderMap,
    has_status_line: bool,
) -> io::Result<usize> {
    let mut bytes_consumed = 0;
    let mut line = Vec::new();
    let mut first_line = has_status_line;

    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        bytes_consumed += n;

        let trimmed = trim_line_ending(&line);
        if trimmed.is_empty() {
            break;
        }

        if first_line {
            target.set_status_line(trimmed);
            first_line = false;
            continue;
        }

        if trimmed[0] == b' ' || trimmed[0] == b'\t' {
            target.add_continuation(trimmed.trim_ascii());
            continue;
        }

        match memchr::memchr(b':', trimmed) {
            Some(colon_pos) => {
                target.append_bytes(&trimmed[..colon_pos], &trimmed[colon_pos + 1..]);
            }
            // Invalid header, try to preserve it
            None => target.add_continuation(trimmed),
        }
    }

    Ok(bytes_consumed)
}

/// Strip a trailing `\n` or `\r\n` from a line.
pub fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// A WARC record.
///
/// The record block is kept as raw bytes. If HTTP headers are parsed, they are
/// read from the start of the block without consuming it, so writing the record
/// reproduces the original bytes unless the HTTP status line is replaced.
#[derive(Debug, Clone)]
pub struct WarcRecord {
    record_type: WarcRecordType,
    headers: HeaderMap,
    http_headers: Option<HeaderMap>,
    http_header_len: usize,
    content: Vec<u8>,
    stream_pos: u64,
}

impl Default for WarcRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl WarcRecord {
    /// Create a new empty WARC record.
    pub fn new() -> Self {
        WarcRecord {
            record_type: WarcRecordType::Unknown,
            headers: HeaderMap::new(HeaderEncoding::Unicode),
            http_headers: None,
            http_header_len: 0,
            content: Vec::new(),
            stream_pos: 0,
        }
    }

    /// Create a record from a parsed header block and its body.
    ///
    /// The record type is taken from the `WARC-Type` header. `Content-Length`
    /// is left as found; writers recompute it.
    pub fn from_parts(headers: HeaderMap, content: Vec<u8>) -> Self {
        let record_type = headers
            .get("WARC-Type")
            .map(|t| WarcRecordType::from_header(&t))
            .unwrap_or(WarcRecordType::Unknown);
        WarcRecord {
            record_type,
            headers,
            http_headers: None,
            http_header_len: 0,
            content,
            stream_pos: 0,
        }
    }

    pub(crate) fn set_stream_pos(&mut self, pos: u64) {
        self.stream_pos = pos;
    }

    /// Record type (same as `headers['WARC-Type']`).
    pub fn record_type(&self) -> WarcRecordType {
        self.record_type
    }

    /// Record ID (same as `headers['WARC-Record-ID']`).
    pub fn record_id(&self) -> Option<String> {
        self.headers.get("WARC-Record-ID")
    }

    /// Protocol and version tag, e.g. `WARC/1.0`.
    pub fn protocol(&self) -> String {
        self.headers.status_line()
    }

    /// Replace the protocol and version tag.
    pub fn set_protocol(&mut self, protocol: &str) {
        self.headers.set_status_line(protocol);
    }

    /// Record `Content-Type` header.
    pub fn content_type(&self) -> Option<String> {
        self.headers.get("Content-Type")
    }

    /// Set the record `Content-Type` header.
    pub fn set_content_type(&mut self, content_type: &str) {
        self.headers.set("Content-Type", content_type);
    }

    /// WARC record headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// WARC record headers (mutable).
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Whether the record declares an HTTP message block.
    pub fn is_http(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/http"))
    }

    /// Whether HTTP headers have been parsed.
    pub fn is_http_parsed(&self) -> bool {
        self.http_headers.is_some()
    }

    /// HTTP headers if record is an HTTP record and HTTP headers have been parsed yet.
    pub fn http_headers(&self) -> Option<&HeaderMap> {
        self.http_headers.as_ref()
    }

    /// Parse HTTP headers from the start of the record block.
    ///
    /// It is safe to call this method multiple times, even if the record is not an HTTP record.
    /// Returns whether HTTP headers are available afterwards.
    pub fn parse_http(&mut self) -> bool {
        if self.http_headers.is_some() {
            return true;
        }
        if !self.is_http() {
            return false;
        }
        let Some(block_len) = crate::http::header_block_len(&self.content) else {
            return false;
        };
        let mut http_headers = HeaderMap::new(HeaderEncoding::Latin1);
        let mut cursor = io::Cursor::new(&self.content[..block_len]);
        if parse_header_block(&mut cursor, &mut http_headers, true).is_err() {
            return false;
        }
        self.http_headers = Some(http_headers);
        self.http_header_len = block_len;
        true
    }

    /// Replace the HTTP status line in place.
    ///
    /// Only the first line of the record block is rewritten; the remaining
    /// HTTP header bytes and the payload stay untouched.
    pub fn set_http_status_line(&mut self, status_line: &[u8]) {
        let Some(http_headers) = self.http_headers.as_mut() else {
            return;
        };
        let first_line_len = memchr::memchr(b'\n', &self.content[..self.http_header_len])
            .map(|pos| pos + 1)
            .unwrap_or(self.http_header_len);
        let line_ending: &[u8] = if self.content[..first_line_len].ends_with(b"\r\n") {
            b"\r\n"
        } else {
            b"\n"
        };

        let mut content = Vec::with_capacity(self.content.len() + status_line.len());
        content.extend_from_slice(status_line);
        content.extend_from_slice(line_ending);
        content.extend_from_slice(&self.content[first_line_len..]);

        self.http_header_len = self.http_header_len + content.len() - self.content.len();
        self.content = content;
        http_headers.set_status_line(status_line);
        self.headers
            .set_bytes(b"Content-Length", self.content.len().to_string().as_bytes());
    }

    /// Record block length in bytes.
    pub fn content_length(&self) -> usize {
        self.content.len()
    }

    /// Get the record block as a byte slice.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Record payload: the block without HTTP headers (if parsed).
    pub fn payload(&self) -> &[u8] {
        &self.content[self.http_header_len..]
    }

    /// WARC record start offset in the original (uncompressed) stream.
    pub fn stream_pos(&self) -> u64 {
        self.stream_pos
    }

    /// Initialize mandatory headers in a fresh WARC record instance.
    ///
    /// # Arguments
    ///
    /// * `content_length` - WARC record body length in bytes
    /// * `record_type` - WARC-Type
    /// * `record_urn` - WARC-Record-ID as URN without `'<'`, `'>'` (if unset, a random URN will be generated)
    pub fn init_headers(
        &mut self,
        content_length: usize,
        record_type: WarcRecordType,
        record_urn: Option<&str>,
    ) {
        let urn = match record_urn {
            Some(urn) => urn.to_string(),
            None => format!("urn:uuid:{}", Uuid::new_v4()),
        };

        self.record_type = record_type;

        self.headers.clear();
        self.headers.set_status_line(WARC_1_0);
        self.headers
            .append_bytes(b"WARC-Type", self.record_type.as_str().as_bytes());

        let date = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        self.headers.append_bytes(b"WARC-Date", date.as_bytes());

        let record_id = format!("<{urn}>");
        self.headers
            .append_bytes(b"WARC-Record-ID", record_id.as_bytes());

        self.headers
            .append_bytes(b"Content-Length", content_length.to_string().as_bytes());
    }

    /// Set WARC body.
    ///
    /// Any parsed HTTP headers are discarded.
    ///
    /// # Arguments
    ///
    /// * `content` - Body as bytes
    pub fn set_content(&mut self, content: Vec<u8>) {
        self.content = content;
        self.http_headers = None;
        self.http_header_len = 0;
        self.headers
            .set_bytes(b"Content-Length", self.content.len().to_string().as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn http_record(status_line: &str) -> WarcRecord {
        let mut headers = HeaderMap::new(HeaderEncoding::Unicode);
        headers.set_status_line("WARC/0.17");
        headers.append("WARC-Type", "response");
        headers.append("Content-Type", "application/http; msgtype=response");
        let block = format!("{status_line}\r\nContent-Type: text/plain\r\n\r\nhello");
        WarcRecord::from_parts(headers, block.into_bytes())
    }

    #[test]
    fn test_record_type_from_header() {
        assert_eq!(WarcRecordType::from_header("WarcInfo"), WarcRecordType::WarcInfo);
        assert_eq!(WarcRecordType::from_header(" response "), WarcRecordType::Response);
        assert_eq!(WarcRecordType::from_header("bogus"), WarcRecordType::Unknown);
    }

    #[test]
    fn test_header_map_set_and_remove() {
        let mut headers = HeaderMap::new(HeaderEncoding::Unicode);
        headers.append("WARC-Date", "a");
        headers.append("X", "1");
        headers.append("warc-date", "b");
        headers.set("WARC-Date", "c");
        assert_eq!(
            headers.items().collect::<Vec<_>>(),
            vec![
                ("WARC-Date".to_string(), "c".to_string()),
                ("X".to_string(), "1".to_string())
            ]
        );
        assert_eq!(headers.remove("warc-DATE"), 1);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("x"), Some("1".to_string()));
    }

    #[test]
    fn test_parse_header_block_with_continuation() {
        let raw = b"WARC/0.18\r\nWARC-Type: warcinfo\r\nX-Long: first\r\n  second\nContent-Length: 3\r\n\r\nabc";
        let mut headers = HeaderMap::new(HeaderEncoding::Unicode);
        let mut cursor = io::Cursor::new(&raw[..]);
        let consumed = parse_header_block(&mut cursor, &mut headers, true).unwrap();
        assert_eq!(consumed, raw.len() - 3);
        assert_eq!(headers.status_line(), "WARC/0.18");
        assert_eq!(headers.get("X-Long"), Some("first second".to_string()));
        assert_eq!(headers.get("content-length"), Some("3".to_string()));
    }

    #[test]
    fn test_parse_http_keeps_block_bytes() {
        let mut record = http_record("HTTP/1.1 200 OK");
        let original = record.content().to_vec();
        assert!(record.parse_http());
        let http = record.http_headers().unwrap();
        assert_eq!(http.status_code(), Some(200));
        assert_eq!(http.reason_phrase(), Some("OK".to_string()));
        assert_eq!(record.payload(), b"hello");
        assert_eq!(record.content(), original.as_slice());
    }

    #[test]
    fn test_set_http_status_line() {
        let mut record = http_record("HTTP/1.1 404 Not Found");
        assert!(record.parse_http());
        record.set_http_status_line(b"HTTP/1.1 404 Missing%20Page");
        assert_eq!(
            record.content(),
            b"HTTP/1.1 404 Missing%20Page\r\nContent-Type: text/plain\r\n\r\nhello"
        );
        assert_eq!(record.payload(), b"hello");
        assert_eq!(
            record.http_headers().unwrap().reason_phrase(),
            Some("Missing%20Page".to_string())
        );
    }

    #[test]
    fn test_non_http_record_is_not_parsed() {
        let mut headers = HeaderMap::new(HeaderEncoding::Unicode);
        headers.append("WARC-Type", "resource");
        headers.append("Content-Type", "text/plain");
        let mut record = WarcRecord::from_parts(headers, b"HTTP/1.1 200 OK\r\n\r\n".to_vec());
        assert!(!record.parse_http());
        assert_eq!(record.payload(), record.content());
    }

    #[test]
    fn test_init_headers() {
        let mut record = WarcRecord::new();
        record.init_headers(12, WarcRecordType::Metadata, Some("urn:uuid:1234"));
        assert_eq!(record.protocol(), "WARC/1.0");
        assert_eq!(record.record_type(), WarcRecordType::Metadata);
        assert_eq!(record.record_id(), Some("<urn:uuid:1234>".to_string()));
        assert_eq!(record.headers().get("Content-Length"), Some("12".to_string()));
        assert!(record.headers().contains_key("WARC-Date"));
    }

    #[test]
    fn test_decode_header_bytes_falls_back_to_windows_1252() {
        assert_eq!(decode_header_bytes("Päivä".as_bytes()), "Päivä");
        assert_eq!(decode_header_bytes(b"P\xe4iv\xe4"), "Päivä");
    }
}
