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

//! ARC to WARC record conversion.
//!
//! Every ARC data record becomes one WARC record. The `filedesc://` header
//! record becomes a `warcinfo` record plus a `metadata` record carrying the
//! raw ARC header, which the stream rewriter later turns into the final
//! header pair of the target file.

use std::io::{BufRead, Write};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use fastwarc::http::is_http_response;
use fastwarc::{
    ArcRecord, ArchiveIterator, ArchiveRecord, HeaderEncoding, HeaderMap, WarcRecord,
    WarcRecordType, WarcWriter, WARC_1_0,
};
use sha1::{Digest, Sha1};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::MigrationConfig;
use crate::error::{MigrateError, Result};

pub const WARC_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
pub const HTTP_RESPONSE_CONTENT_TYPE: &str = "application/http;msgtype=response";
pub const ARC_CONTENT_TYPE: &str = "application/arc";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Deterministic record ID `<urn:uuid:…>` from the first 16 bytes of SHA-1(`text`).
pub fn make_warc_uuid(text: &str) -> String {
    let hash = Sha1::digest(text.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash.as_slice()[..16]);
    format!("<urn:uuid:{}>", Uuid::from_bytes(bytes))
}

/// Parse an ARC `Archive-date` field.
///
/// `YYYYMMDDHHMMSS` is tried first, then `YYYYMMDD`. An empty field yields
/// the current time.
pub fn parse_arc_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Utc::now());
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M%S") {
        return Ok(datetime.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
        .ok_or_else(|| MigrateError::InvalidArcDate(raw.to_string()))
}

/// Record type and content type override decided for a data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub record_type: WarcRecordType,
    pub content_type: Option<&'static str>,
}

impl Classification {
    fn of(record_type: WarcRecordType) -> Self {
        Classification {
            record_type,
            content_type: None,
        }
    }
}

/// Inputs of the classification rules for one data record.
pub struct ClassifyInput<'a> {
    /// Lowercased target URL.
    pub url: String,
    pub content_type: &'a str,
    pub payload: &'a [u8],
    pub resource_prefixes: &'a [String],
    pub response_prefixes: &'a [String],
    /// Ignore a non-empty HTTP `Content-Length` when sniffing.
    pub ignore_content_length: bool,
}

/// One step of the classification chain. `None` passes to the next rule.
pub type ClassifyRule = fn(&ClassifyInput) -> Option<Classification>;

/// Classification rules, applied in order until one matches.
pub const CLASSIFY_RULES: &[ClassifyRule] = &[
    resource_prefix_rule,
    response_prefix_rule,
    http_rule,
    dns_rule,
    fallback_rule,
];

fn has_prefix(url: &str, prefixes: &[String]) -> bool {
    prefixes
        .iter()
        .any(|prefix| url.starts_with(&prefix.to_lowercase()))
}

pub fn resource_prefix_rule(input: &ClassifyInput) -> Option<Classification> {
    has_prefix(&input.url, input.resource_prefixes)
        .then(|| Classification::of(WarcRecordType::Resource))
}

pub fn response_prefix_rule(input: &ClassifyInput) -> Option<Classification> {
    has_prefix(&input.url, input.response_prefixes)
        .then(|| Classification::of(WarcRecordType::Response))
}

pub fn http_rule(input: &ClassifyInput) -> Option<Classification> {
    if !input.url.starts_with("http") {
        return None;
    }
    if is_http_response(input.payload, input.ignore_content_length) {
        Some(Classification {
            record_type: WarcRecordType::Response,
            content_type: Some(HTTP_RESPONSE_CONTENT_TYPE),
        })
    } else {
        Some(Classification::of(WarcRecordType::Resource))
    }
}

pub fn dns_rule(input: &ClassifyInput) -> Option<Classification> {
    if !input.url.starts_with("dns") {
        return None;
    }
    if input.content_type.starts_with("text/dns") && input.payload.is_ascii() {
        Some(Classification::of(WarcRecordType::Resource))
    } else {
        Some(Classification::of(WarcRecordType::Response))
    }
}

pub fn fallback_rule(_input: &ClassifyInput) -> Option<Classification> {
    Some(Classification::of(WarcRecordType::Response))
}

/// Run the classification chain.
pub fn classify(input: &ClassifyInput) -> Classification {
    CLASSIFY_RULES
        .iter()
        .find_map(|rule| rule(input))
        .unwrap_or(Classification::of(WarcRecordType::Response))
}

/// Converts ARC records to WARC records.
pub struct ArcTransformer<'a> {
    config: &'a MigrationConfig,
    warcinfo_id: Option<String>,
}

impl<'a> ArcTransformer<'a> {
    pub fn new(config: &'a MigrationConfig) -> Self {
        ArcTransformer {
            config,
            warcinfo_id: None,
        }
    }

    /// ID of the warcinfo record synthesized from the `filedesc://` record, if seen.
    pub fn warcinfo_id(&self) -> Option<&str> {
        self.warcinfo_id.as_deref()
    }

    /// Convert one ARC record into one or two WARC records.
    pub fn convert(&mut self, record: &ArcRecord) -> Result<Vec<WarcRecord>> {
        if record.is_filedesc() {
            let (warcinfo, metadata) = self.convert_filedesc(record)?;
            Ok(vec![warcinfo, metadata])
        } else {
            Ok(vec![self.convert_record(record)?])
        }
    }

    /// Convert an ARC data record.
    pub fn convert_record(&self, record: &ArcRecord) -> Result<WarcRecord> {
        let date = parse_arc_date(record.date())?;

        let mut content_type = record.content_type().trim();
        if content_type.is_empty() {
            content_type = DEFAULT_CONTENT_TYPE;
        }

        let fallback = record.declared_length().is_none();
        if fallback {
            warn!(
                offset = record.stream_pos(),
                url = record.url(),
                "ARC record has no usable length, classifying recovered content"
            );
        }

        let input = ClassifyInput {
            url: record.url().to_lowercase(),
            content_type,
            payload: record.content(),
            resource_prefixes: &self.config.resource_prefixes,
            response_prefixes: &self.config.response_prefixes,
            ignore_content_length: fallback,
        };
        let classification = classify(&input);
        let content_type = classification.content_type.unwrap_or(content_type);

        let mut headers = HeaderMap::new(HeaderEncoding::Unicode);
        headers.set_status_line(WARC_1_0);
        headers.append(
            "WARC-Record-ID",
            make_warc_uuid(&format!("{}{}", record.url(), record.date())),
        );
        headers.append("WARC-Target-URI", record.url());
        if let Some(warcinfo_id) = &self.warcinfo_id {
            headers.append("WARC-Warcinfo-ID", warcinfo_id);
        }
        if let Some(ip) = record.ip_address().map(str::trim) {
            if !ip.is_empty() && ip != "0.0.0.0" {
                headers.append("WARC-IP-Address", ip);
            }
        }
        headers.append("WARC-Date", date.format(WARC_DATE_FORMAT).to_string());
        headers.append("WARC-Type", classification.record_type.as_str());
        headers.append("Content-Type", content_type);
        headers.append("Content-Length", record.content().len().to_string());

        debug!(
            url = record.url(),
            record_type = classification.record_type.as_str(),
            "Converted ARC record"
        );
        Ok(WarcRecord::from_parts(headers, record.content().to_vec()))
    }

    /// Convert the `filedesc://` record into a warcinfo and metadata record pair.
    pub fn convert_filedesc(&mut self, record: &ArcRecord) -> Result<(WarcRecord, WarcRecord)> {
        let now = Utc::now().format(WARC_DATE_FORMAT).to_string();
        let warcinfo_id = make_warc_uuid(&format!("{}{}", record.url(), now));
        let filename = record
            .url()
            .split_once("://")
            .map(|(_, name)| name)
            .unwrap_or_default();

        let software = format!(
            "software: {}/{}\r\n",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );
        let mut headers = HeaderMap::new(HeaderEncoding::Unicode);
        headers.set_status_line(WARC_1_0);
        headers.append("WARC-Type", WarcRecordType::WarcInfo.as_str());
        headers.append("WARC-Record-ID", &warcinfo_id);
        headers.append("WARC-Date", &now);
        headers.append("WARC-Filename", filename);
        headers.append("Content-Type", "application/warc-fields");
        headers.append("Content-Length", software.len().to_string());
        let warcinfo = WarcRecord::from_parts(headers, software.into_bytes());

        let date = record.date().trim();
        let date = date.get(..14).or_else(|| date.get(..8)).unwrap_or(date);
        let raw = record.raw();
        let mut headers = HeaderMap::new(HeaderEncoding::Unicode);
        headers.set_status_line(WARC_1_0);
        headers.append("WARC-Type", WarcRecordType::Metadata.as_str());
        headers.append("WARC-Concurrent-To", &warcinfo_id);
        headers.append(
            "WARC-Record-ID",
            make_warc_uuid(&format!("{}{}-meta", record.url(), record.date())),
        );
        headers.append("WARC-Target-URI", record.url());
        headers.append(
            "WARC-Date",
            parse_arc_date(date)?.format(WARC_DATE_FORMAT).to_string(),
        );
        headers.append("WARC-Warcinfo-ID", &warcinfo_id);
        headers.append("Content-Type", ARC_CONTENT_TYPE);
        headers.append("Content-Length", raw.len().to_string());
        let metadata = WarcRecord::from_parts(headers, raw);

        if let Some((major, minor)) = record.version() {
            debug!(major, minor, "ARC file version");
        }
        self.warcinfo_id = Some(warcinfo_id);
        Ok((warcinfo, metadata))
    }
}

/// Convert an ARC stream into an uncompressed WARC stream.
///
/// Records are written as converted, without digests. Returns the number of
/// WARC records written.
pub fn convert_arc<R: BufRead, W: Write>(
    source: R,
    out: W,
    config: &MigrationConfig,
) -> Result<usize> {
    let mut transformer = ArcTransformer::new(config);
    let mut writer = WarcWriter::new(out);
    let mut records = ArchiveIterator::new(source)?
        .parse_http(false)
        .strict_framing(false);

    while let Some(record) = records.read_next()? {
        match record {
            ArchiveRecord::Arc(arc) => {
                for warc in transformer.convert(&arc)? {
                    writer.write_record(&warc)?;
                }
            }
            ArchiveRecord::Warc(warc) => {
                warn!(
                    offset = warc.stream_pos(),
                    "WARC record in ARC stream, copying unchanged"
                );
                writer.write_record(&warc)?;
            }
        }
    }

    let count = writer.records_written();
    writer.flush()?;
    info!(records = count, "Converted ARC records to WARC");
    Ok(count)
}
