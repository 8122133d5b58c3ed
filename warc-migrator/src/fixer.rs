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

//! Rewriting of a WARC record stream into WARC/1.0.
//!
//! The header block of the stream (the first warcinfo record, and for
//! converted ARC files the metadata record carrying the ARC header) is fixed
//! exactly once. Every other record keeps its block and only gets its protocol
//! line and, where needed, its HTTP reason phrase fixed.

use std::io::{BufRead, Write};
use std::mem;

use fastwarc::{
    decode_header_bytes, ArchiveIterator, WarcRecord, WarcRecordType, WarcWriter, WARC_1_0,
};
use tracing::{debug, info};

use crate::config::MigrationConfig;
use crate::error::{MigrateError, Result};
use crate::extract::{extract_arc_metadata, extract_warcfields};
use crate::handler::ArchiveHandler;
use crate::registry::WarcinfoRegistry;
use crate::transform::ARC_CONTENT_TYPE;

pub const CONFORMS_TO: &str =
    "https://iipc.github.io/warc-specifications/specifications/warc-format/warc-1.0/";
pub const WARC_FORMAT: &str = "WARC File Format 1.0";
const WARC_FIELDS_CONTENT_TYPE: &str = "application/warc-fields";

/// Where the stream being rewritten comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Output of ARC conversion, starting with a warcinfo and ARC metadata pair.
    FromArc,
    /// A WARC 0.x file.
    FromLegacyWarc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RewriteState {
    SeekingInfo,
    InfoFixed,
}

/// Result of one rewrite pass.
#[derive(Debug, Clone)]
pub struct RewriteSummary {
    /// Records written.
    pub records: usize,
    /// Fields of the written warcinfo record, if the header block was found.
    pub warcinfo: Option<WarcinfoRegistry>,
}

fn is_warcinfo(record: &WarcRecord) -> bool {
    record.record_type() == WarcRecordType::WarcInfo
        && has_content_type(record, WARC_FIELDS_CONTENT_TYPE)
}

fn is_arc_metadata(record: &WarcRecord) -> bool {
    record.record_type() == WarcRecordType::Metadata && has_content_type(record, ARC_CONTENT_TYPE)
}

fn has_content_type(record: &WarcRecord, expected: &str) -> bool {
    record
        .content_type()
        .is_some_and(|ct| ct.trim().eq_ignore_ascii_case(expected))
}

pub struct WarcFixer<'a> {
    config: &'a MigrationConfig,
    target_name: String,
}

impl<'a> WarcFixer<'a> {
    /// # Arguments
    ///
    /// * `config` - Migration options
    /// * `target_name` - File name written into `WARC-Filename` of the warcinfo record
    pub fn new(config: &'a MigrationConfig, target_name: impl Into<String>) -> Self {
        WarcFixer {
            config,
            target_name: target_name.into(),
        }
    }

    /// Rewrite `source` into a per-record gzip WARC/1.0 stream on `target`.
    ///
    /// A single-member gzip source fails with the archive library's
    /// non-chunked gzip error, which callers can recover from by
    /// recompressing the source.
    pub fn fix_warc<R: BufRead, W: Write>(
        &self,
        source: R,
        target: W,
        mode: InputMode,
    ) -> Result<RewriteSummary> {
        let mut writer = WarcWriter::new(target)
            .gzip(true)
            .warc_version(Some(WARC_1_0))
            .digests(true);
        let mut records = ArchiveIterator::new(source)?;
        let mut state = RewriteState::SeekingInfo;
        let mut source_handler = ArchiveHandler::new();
        let mut pending: Vec<WarcRecord> = Vec::new();
        let mut target_registry = None;

        while let Some(record) = records.read_next()? {
            let offset = record.stream_pos();
            let Some(mut record) = record.into_warc() else {
                return Err(MigrateError::UnexpectedArcRecord(offset));
            };

            match (state, mode) {
                (RewriteState::SeekingInfo, InputMode::FromArc) => {
                    if is_warcinfo(&record) {
                        debug!(offset, "Found warcinfo record of converted ARC");
                        source_handler.warcinfo = Some(record);
                    } else if is_arc_metadata(&record) && source_handler.warcinfo.is_some() {
                        debug!(offset, "Found ARC metadata record");
                        let metadata = extract_arc_metadata(record.content())?;
                        source_handler.registry = metadata.registry;
                        source_handler.metadata_raw = metadata.raw;
                        source_handler.metadata = Some(record);

                        let target = self.fix_header(mem::take(&mut source_handler))?;
                        write_header(&mut writer, &target)?;
                        for mut record in pending.drain(..) {
                            self.fix_record(&mut record);
                            writer.write_record(&record)?;
                        }
                        target_registry = Some(target.registry);
                        state = RewriteState::InfoFixed;
                    } else {
                        pending.push(record);
                    }
                }
                (RewriteState::SeekingInfo, InputMode::FromLegacyWarc) if is_warcinfo(&record) => {
                    debug!(offset, "Found warcinfo record");
                    let mut payload = record.content();
                    extract_warcfields(&mut payload, &mut source_handler.registry)?;
                    source_handler.warcinfo = Some(record);

                    let target = self.fix_header(mem::take(&mut source_handler))?;
                    write_header(&mut writer, &target)?;
                    target_registry = Some(target.registry);
                    state = RewriteState::InfoFixed;
                }
                _ => {
                    self.fix_record(&mut record);
                    writer.write_record(&record)?;
                }
            }
        }

        if mode == InputMode::FromArc && state == RewriteState::SeekingInfo {
            return Err(MigrateError::MissingHeaderPair);
        }
        if target_registry.is_none() {
            info!("No warcinfo record found, records rewritten without header block");
        }

        writer.flush()?;
        Ok(RewriteSummary {
            records: writer.records_written(),
            warcinfo: target_registry,
        })
    }

    /// Build the target header block from the source one.
    pub fn fix_header(&self, source: ArchiveHandler) -> Result<ArchiveHandler> {
        let target = self.fix_metadata(&source, ArchiveHandler::new());
        self.fix_warcinfo(&source, target)
    }

    /// Fix the warcinfo fields and build the target warcinfo record.
    ///
    /// `conformsTo` and `format` are forced, user fields are applied according
    /// to the configured policy.
    pub fn fix_warcinfo(
        &self,
        source: &ArchiveHandler,
        mut target: ArchiveHandler,
    ) -> Result<ArchiveHandler> {
        let mut registry = source.registry.clone();
        registry.replace("conformsTo", CONFORMS_TO);
        registry.replace("format", WARC_FORMAT);
        registry.merge_user_fields(&self.config.user_metadata, self.config.user_field_policy);
        let payload = registry.serialize(self.config.non_ascii_policy)?;

        let template = match &source.warcinfo {
            Some(record) => record.clone(),
            None => {
                let mut record = WarcRecord::new();
                record.init_headers(0, WarcRecordType::WarcInfo, None);
                record.set_content_type(WARC_FIELDS_CONTENT_TYPE);
                record
            }
        };
        target.warcinfo = Some(ArchiveHandler::create_warcinfo_record(
            &template,
            payload.into_bytes(),
            &self.target_name,
        ));
        target.registry = registry;
        Ok(target)
    }

    /// Carry the raw ARC header payload over into a WARC/1.0 metadata record.
    pub fn fix_metadata(&self, source: &ArchiveHandler, mut target: ArchiveHandler) -> ArchiveHandler {
        target.metadata_raw = source.metadata_raw.clone();
        target.metadata = source
            .metadata
            .as_ref()
            .map(|record| ArchiveHandler::create_metadata_record(record, source.metadata_raw.clone()));
        target
    }

    /// Fix a data record: force the protocol and percent-encode a non-ASCII HTTP reason phrase.
    pub fn fix_record(&self, record: &mut WarcRecord) {
        record.set_protocol(WARC_1_0);

        let Some(http) = record.http_headers() else {
            return;
        };
        let Some(reason) = http.reason_phrase_bytes() else {
            return;
        };
        if reason.is_ascii() {
            return;
        }

        let status_line = http.status_line_bytes();
        let encoded = urlencoding::encode(&decode_header_bytes(reason)).into_owned();
        let mut fixed = status_line[..status_line.len() - reason.len()].to_vec();
        fixed.extend_from_slice(encoded.as_bytes());
        debug!(
            offset = record.stream_pos(),
            reason = %decode_header_bytes(reason),
            "Percent-encoding non-ASCII HTTP reason phrase"
        );

        record.set_http_status_line(&fixed);
        record.headers_mut().remove("WARC-Block-Digest");
    }
}

fn write_header<W: Write>(writer: &mut WarcWriter<W>, target: &ArchiveHandler) -> Result<()> {
    if let Some(warcinfo) = &target.warcinfo {
        writer.write_record(warcinfo)?;
    }
    if let Some(metadata) = &target.metadata {
        writer.write_record(metadata)?;
    }
    Ok(())
}
