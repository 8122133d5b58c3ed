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

//! Fixed warcinfo and metadata records built from legacy header templates.

use chrono::Utc;
use fastwarc::{WarcRecord, WARC_1_0};

use crate::registry::WarcinfoRegistry;

/// Content type of the metadata record written for a migrated ARC header.
pub const ARC_METADATA_CONTENT_TYPE: &str = "application/x-internet-archive";

/// Digests of the template block, stale once the block is replaced.
const STALE_DIGESTS: [&str; 2] = ["WARC-Block-Digest", "WARC-Payload-Digest"];

/// The header block of one archive: warcinfo fields, the raw ARC metadata
/// payload and the records carrying them.
#[derive(Debug, Clone, Default)]
pub struct ArchiveHandler {
    pub registry: WarcinfoRegistry,
    pub metadata_raw: Vec<u8>,
    pub warcinfo: Option<WarcRecord>,
    pub metadata: Option<WarcRecord>,
}

impl ArchiveHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a WARC/1.0 warcinfo record from `template` with a new payload.
    ///
    /// Digests, `WARC-Filename` and `WARC-Date` of the template are replaced
    /// by the target file name and the current time.
    pub fn create_warcinfo_record(
        template: &WarcRecord,
        payload: Vec<u8>,
        target_name: &str,
    ) -> WarcRecord {
        let mut record = from_template(template, payload);
        record.headers_mut().remove("WARC-Filename");
        record.headers_mut().remove("WARC-Date");
        record.headers_mut().append("WARC-Filename", target_name);
        record
            .headers_mut()
            .append("WARC-Date", Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());
        record
    }

    /// Build a WARC/1.0 metadata record from `template` carrying the raw ARC header.
    ///
    /// All other template headers are kept as they are.
    pub fn create_metadata_record(template: &WarcRecord, payload: Vec<u8>) -> WarcRecord {
        let mut record = from_template(template, payload);
        record.set_content_type(ARC_METADATA_CONTENT_TYPE);
        record
    }
}

fn from_template(template: &WarcRecord, payload: Vec<u8>) -> WarcRecord {
    let mut headers = template.headers().clone();
    for key in STALE_DIGESTS {
        headers.remove(key);
    }
    headers.set_status_line(WARC_1_0);
    let mut record = WarcRecord::from_parts(headers, Vec::new());
    record.set_content(payload);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastwarc::{HeaderEncoding, HeaderMap};
    use pretty_assertions::assert_eq;

    fn template(record_type: &str, content_type: &str) -> WarcRecord {
        let mut headers = HeaderMap::new(HeaderEncoding::Unicode);
        headers.set_status_line("WARC/0.17");
        headers.append("WARC-Type", record_type);
        headers.append("WARC-Record-ID", "<urn:uuid:00000000-0000-0000-0000-000000000001>");
        headers.append("WARC-Date", "2008-04-30T20:48:25Z");
        headers.append("WARC-Filename", "old.arc");
        headers.append("WARC-Block-Digest", "sha1:STALE");
        headers.append("Content-Type", content_type);
        headers.append("Content-Length", "3");
        WarcRecord::from_parts(headers, b"old".to_vec())
    }

    #[test]
    fn test_create_warcinfo_record() {
        let source = template("warcinfo", "application/warc-fields");
        let record = ArchiveHandler::create_warcinfo_record(
            &source,
            b"format: WARC File Format 1.0\r\n".to_vec(),
            "new.warc.gz",
        );
        assert_eq!(record.protocol(), "WARC/1.0");
        assert_eq!(record.content(), b"format: WARC File Format 1.0\r\n");
        let headers = record.headers();
        assert_eq!(headers.get("WARC-Filename"), Some("new.warc.gz".to_string()));
        assert_eq!(headers.get("Content-Length"), Some("30".to_string()));
        assert_ne!(headers.get("WARC-Date"), Some("2008-04-30T20:48:25Z".to_string()));
        assert!(!headers.contains_key("WARC-Block-Digest"));
        assert_eq!(
            headers.get("WARC-Record-ID"),
            source.headers().get("WARC-Record-ID")
        );
    }

    #[test]
    fn test_create_metadata_record() {
        let source = template("metadata", "application/arc");
        let record = ArchiveHandler::create_metadata_record(&source, b"raw arc header".to_vec());
        assert_eq!(record.protocol(), "WARC/1.0");
        assert_eq!(record.content_type(), Some(ARC_METADATA_CONTENT_TYPE.to_string()));
        assert_eq!(record.content(), b"raw arc header");
        let headers = record.headers();
        assert_eq!(headers.get("WARC-Date"), Some("2008-04-30T20:48:25Z".to_string()));
        assert_eq!(headers.get("WARC-Filename"), Some("old.arc".to_string()));
        assert!(!headers.contains_key("WARC-Block-Digest"));
    }
}
