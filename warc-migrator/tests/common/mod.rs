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

//! Archive fixtures built in memory.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use fastwarc::{ArchiveIterator, WarcRecord};
use flate2::write::GzEncoder;

pub const ARC_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<arcmetadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:arc="http://archive.org/arc/1.0/">
<arc:software>Heritrix 1.14.0</arc:software>
<arc:operator>Admin</arc:operator>
<dcterms:isPartOf>test-collection</dcterms:isPartOf>
<dc:description>Test crawl</dc:description>
</arcmetadata>
"#;

pub const HTTP_RESPONSE: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 13\r\n\r\n<p>hello</p>\n";

/// One ARC record: header line, content and the separating newline.
pub fn arc_record(url: &str, date: &str, content_type: &str, content: &[u8]) -> Vec<u8> {
    let mut out = format!("{url} 1.2.3.4 {date} {content_type} {}\n", content.len()).into_bytes();
    out.extend_from_slice(content);
    out.push(b'\n');
    out
}

/// ARC `filedesc://` record, version 1.0 without XML or 1.1 with XML.
pub fn arc_filedesc(version_minor: u32) -> Vec<u8> {
    let mut content = format!(
        "1 {version_minor} InternetArchive\nURL IP-address Archive-date Content-type Archive-length\n"
    );
    if version_minor > 0 {
        content.push_str(ARC_XML);
    }
    let mut out = format!(
        "filedesc://test.arc 0.0.0.0 20080430204825 text/plain {}\n",
        content.len()
    )
    .into_bytes();
    out.extend_from_slice(content.as_bytes());
    out.push(b'\n');
    out
}

/// ARC file with a `filedesc://` record and two data records.
pub fn arc_file(version_minor: u32) -> Vec<u8> {
    let mut data = arc_filedesc(version_minor);
    data.extend(arc_record(
        "http://example.com/",
        "20080430204826",
        "text/html",
        HTTP_RESPONSE,
    ));
    data.extend(arc_record(
        "dns:example.com",
        "20080430204827",
        "text/dns",
        b"20080430204827\nexample.com. 300 IN A 1.2.3.4\n",
    ));
    data
}

/// The records of [`arc_file`] with one gzip member per record.
pub fn arc_file_gzip() -> Vec<u8> {
    let filedesc = arc_filedesc(1);
    let http = arc_record("http://example.com/", "20080430204826", "text/html", HTTP_RESPONSE);
    let dns = arc_record(
        "dns:example.com",
        "20080430204827",
        "text/dns",
        b"example.com. 300 IN A 1.2.3.4\n",
    );
    gzip_members(&[filedesc.as_slice(), http.as_slice(), dns.as_slice()])
}

pub fn warc_record(version: &str, record_type: &str, content_type: &str, block: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "{version}\r\nWARC-Type: {record_type}\r\nWARC-Date: 2008-04-30T20:48:25Z\r\n\
WARC-Record-ID: <urn:uuid:{record_type}-{}>\r\nWARC-Target-URI: http://example.com/\r\n\
Content-Type: {content_type}\r\nContent-Length: {}\r\n\r\n",
        block.len(),
        block.len()
    )
    .into_bytes();
    out.extend_from_slice(block);
    out.extend_from_slice(b"\r\n\r\n");
    out
}

/// WARC 0.17 file with a warcinfo record and one HTTP response record.
pub fn legacy_warc_file(status_line: &[u8]) -> Vec<u8> {
    let mut response = status_line.to_vec();
    response.extend_from_slice(b"\r\nContent-Type: text/html\r\nContent-Length: 13\r\n\r\n<p>hello</p>\n");

    let mut data = warc_record(
        "WARC/0.17",
        "warcinfo",
        "application/warc-fields",
        b"software: Heritrix 1.12.1\r\nhostname: crawling017.archive.org\r\noperator: IA\r\n\r\n",
    );
    data.extend(warc_record(
        "WARC/0.17",
        "response",
        "application/http; msgtype=response",
        &response,
    ));
    data
}

/// Compress each chunk as its own gzip member.
pub fn gzip_members(chunks: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend(gzip_single(chunk));
    }
    out
}

/// Compress everything as one gzip member.
pub fn gzip_single(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn read_records(path: &Path) -> Vec<WarcRecord> {
    ArchiveIterator::open(path)
        .unwrap()
        .map(|r| r.unwrap().into_warc().unwrap())
        .collect()
}

/// Whether every record of the file sits in its own gzip member.
pub fn is_per_record_gzip(path: &Path) -> bool {
    ArchiveIterator::open(path)
        .unwrap()
        .strict_framing(true)
        .all(|r| r.is_ok())
}
