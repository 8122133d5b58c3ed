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

//! Legacy ARC records.
//!
//! An ARC record starts with a single space-separated header line, followed by
//! `Archive-length` bytes of content and a newline. Version 1 header lines carry
//! five fields:
//!
//! ```text
//! URL IP-address Archive-date Content-type Archive-length
//! ```
//!
//! Version 2 header lines carry ten:
//!
//! ```text
//! URL IP-address Archive-date Content-type Result-code Checksum Location Offset Filename Archive-length
//! ```
//!
//! The first record of every file is a `filedesc://` record whose content holds
//! the version block and, from version 1.1 on, an XML metadata document.

use crate::record::trim_line_ending;

/// Parsed ARC record header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcHeader {
    pub url: String,
    pub ip_address: Option<String>,
    pub date: String,
    pub content_type: String,
    /// Declared content length, `None` if the field is missing or unparseable.
    pub length: Option<usize>,
}

impl ArcHeader {
    /// Parse an ARC header line (with or without its line ending).
    ///
    /// Returns `None` if the line does not have the shape of an ARC header.
    pub fn parse(line: &[u8]) -> Option<Self> {
        let line = String::from_utf8_lossy(trim_line_ending(line)).into_owned();
        let fields: Vec<&str> = line.split_ascii_whitespace().collect();
        if fields.len() < 3 || !looks_like_url(fields[0]) || !looks_like_date(fields[2]) {
            return None;
        }

        let content_type = match fields.len() {
            3 => String::new(),
            _ => fields[3].to_string(),
        };
        // v1 and v2 lines both end in the length field
        let length = match fields.len() {
            n if n >= 5 => fields[n - 1].parse::<usize>().ok(),
            _ => None,
        };

        Some(ArcHeader {
            url: fields[0].to_string(),
            ip_address: Some(fields[1].to_string()),
            date: fields[2].to_string(),
            content_type,
            length,
        })
    }
}

fn looks_like_url(field: &str) -> bool {
    let lower = field.to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("dns:") || lower.starts_with("filedesc:")
}

fn looks_like_date(field: &str) -> bool {
    field.len() >= 8 && field.bytes().all(|b| b.is_ascii_digit())
}

/// A legacy ARC record.
#[derive(Debug, Clone)]
pub struct ArcRecord {
    header: ArcHeader,
    header_line: Vec<u8>,
    content: Vec<u8>,
    stream_pos: u64,
}

impl ArcRecord {
    /// Create a record from its parsed header, the raw header line and its content.
    pub fn new(header: ArcHeader, header_line: Vec<u8>, content: Vec<u8>) -> Self {
        ArcRecord {
            header,
            header_line: trim_line_ending(&header_line).to_vec(),
            content,
            stream_pos: 0,
        }
    }

    pub(crate) fn set_stream_pos(&mut self, pos: u64) {
        self.stream_pos = pos;
    }

    pub fn header(&self) -> &ArcHeader {
        &self.header
    }

    pub fn url(&self) -> &str {
        &self.header.url
    }

    /// Raw `Archive-date` field (`YYYYMMDDHHMMSS` or shorter).
    pub fn date(&self) -> &str {
        &self.header.date
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.header.ip_address.as_deref()
    }

    pub fn content_type(&self) -> &str {
        &self.header.content_type
    }

    /// Declared `Archive-length`, `None` if the header did not carry a usable length.
    pub fn declared_length(&self) -> Option<usize> {
        self.header.length
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Record start offset in the original (uncompressed) stream.
    pub fn stream_pos(&self) -> u64 {
        self.stream_pos
    }

    /// Whether this is the `filedesc://` file header record.
    pub fn is_filedesc(&self) -> bool {
        self.header.url.to_ascii_lowercase().starts_with("filedesc:")
    }

    /// ARC format version `(major, minor)` from the version block of a `filedesc://` record.
    pub fn version(&self) -> Option<(u32, u32)> {
        if !self.is_filedesc() {
            return None;
        }
        let first_line = self.content.split(|&b| b == b'\n').next()?;
        let first_line = String::from_utf8_lossy(first_line);
        let mut parts = first_line.split_ascii_whitespace();
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        Some((major, minor))
    }

    /// The record as it appears in the ARC file: header line, newline and content.
    pub fn raw(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.header_line.len() + 1 + self.content.len());
        raw.extend_from_slice(&self.header_line);
        raw.push(b'\n');
        raw.extend_from_slice(&self.content);
        raw
    }
}
