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

use std::io::Write;

use crate::compression::Compression;
use crate::digest::sha1_digest;
use crate::error::Result;
use crate::record::{WarcRecord, WarcRecordType};

/// Serializes WARC records onto a stream.
///
/// `Content-Length` is always recomputed from the record block.
pub struct WarcWriter<W: Write> {
    out: W,
    compression: Compression,
    warc_version: Option<String>,
    digests: bool,
    records: usize,
}

impl<W: Write> WarcWriter<W> {
    /// Create a writer producing uncompressed records with their headers as given.
    pub fn new(out: W) -> Self {
        WarcWriter {
            out,
            compression: Compression::None,
            warc_version: None,
            digests: false,
            records: 0,
        }
    }

    /// Compress every record as its own gzip member.
    pub fn gzip(mut self, gzip: bool) -> Self {
        self.compression = if gzip {
            Compression::Gzip
        } else {
            Compression::None
        };
        self
    }

    /// Force the protocol line of every written record, e.g. `WARC/1.0`.
    pub fn warc_version(mut self, version: Option<&str>) -> Self {
        self.warc_version = version.map(str::to_string);
        self
    }

    /// Add `WARC-Block-Digest` and `WARC-Payload-Digest` headers where missing.
    pub fn digests(mut self, digests: bool) -> Self {
        self.digests = digests;
        self
    }

    /// Number of records written so far.
    pub fn records_written(&self) -> usize {
        self.records
    }

    /// Write a WARC record.
    ///
    /// # Returns
    ///
    /// Number of uncompressed bytes written
    pub fn write_record(&mut self, record: &WarcRecord) -> Result<usize> {
        let mut headers = record.headers().clone();
        if let Some(version) = &self.warc_version {
            headers.set_status_line(version);
        }
        headers.set("Content-Length", record.content_length().to_string());

        if self.digests {
            if !headers.contains_key("WARC-Block-Digest") {
                headers.append("WARC-Block-Digest", sha1_digest(record.content()));
            }
            let has_payload = matches!(
                record.record_type(),
                WarcRecordType::Response
                    | WarcRecordType::Resource
                    | WarcRecordType::Request
                    | WarcRecordType::Revisit
            );
            if has_payload && !headers.contains_key("WARC-Payload-Digest") {
                headers.append("WARC-Payload-Digest", sha1_digest(record.payload()));
            }
        }

        let mut buf = Vec::with_capacity(record.content_length() + 512);
        headers.write(&mut buf)?;
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(record.content());
        buf.extend_from_slice(b"\r\n\r\n");

        self.compression.write_unit(&mut self.out, &buf)?;
        self.records += 1;
        Ok(buf.len())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Flush and return the output stream.
    pub fn into_inner(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
