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

//! Extraction of legacy warcinfo fields and embedded ARC metadata.

use std::io::BufRead;

use fastwarc::decode_header_bytes;
use quick_xml::errors::IllFormedError;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::debug;

use crate::error::Result;
use crate::registry::WarcinfoRegistry;

pub const ARC_NS: &[u8] = b"http://archive.org/arc/1.0/";
pub const DC_NS: &[u8] = b"http://purl.org/dc/elements/1.1/";
pub const DCTERMS_NS: &[u8] = b"http://purl.org/dc/terms/";
pub const DCMITYPE_NS: &[u8] = b"http://purl.org/dc/dcmitype/";

const METADATA_NAMESPACES: [&[u8]; 4] = [ARC_NS, DC_NS, DCTERMS_NS, DCMITYPE_NS];

/// Wrapper element of the ARC metadata document, never a field itself.
const ARC_METADATA_ROOT: &[u8] = b"arcmetadata";

/// Read `key: value` lines of a warc-fields payload into `registry`.
///
/// Stops at the first blank line or at the end of the input. Keys and values
/// are stored verbatim, so a value keeps its leading space and line ending.
pub fn extract_warcfields<R: BufRead>(reader: &mut R, registry: &mut WarcinfoRegistry) -> Result<()> {
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if line == b"\r\n" || line == b"\n" {
            break;
        }
        match line.iter().position(|&b| b == b':') {
            Some(pos) => registry.set(
                decode_header_bytes(&line[..pos]),
                decode_header_bytes(&line[pos + 1..]),
            ),
            None => debug!(
                line = %String::from_utf8_lossy(&line).trim_end(),
                "Skipping warcinfo line without a colon"
            ),
        }
    }
    Ok(())
}

/// Metadata carried by an ARC file header record.
#[derive(Debug, Clone, Default)]
pub struct ArcMetadata {
    /// The complete payload, byte for byte.
    pub raw: Vec<u8>,
    /// Fields from the embedded XML document, empty if there is none.
    pub registry: WarcinfoRegistry,
}

/// Extract the XML metadata block of an ARC file header record.
///
/// Lines before the first one starting with `<` (the header line and version
/// block) are skipped. Elements in the ARC, Dublin Core, DC Terms and DCMI Type
/// namespaces are collected as local name to text, in document order.
pub fn extract_arc_metadata(payload: &[u8]) -> Result<ArcMetadata> {
    let mut metadata = ArcMetadata {
        raw: payload.to_vec(),
        registry: WarcinfoRegistry::new(),
    };

    let mut xml_start = None;
    let mut pos = 0;
    for line in payload.split_inclusive(|&b| b == b'\n') {
        if line.starts_with(b"<") {
            xml_start = Some(pos);
            break;
        }
        pos += line.len();
    }
    let Some(xml_start) = xml_start else {
        debug!("No XML metadata in ARC header record");
        return Ok(metadata);
    };

    for (name, text) in parse_metadata_xml(&payload[xml_start..])? {
        metadata.registry.set(name, text);
    }
    Ok(metadata)
}

struct OpenElement {
    slot: Option<usize>,
    has_child: bool,
}

fn parse_metadata_xml(xml: &[u8]) -> Result<Vec<(String, String)>> {
    let mut reader = NsReader::from_reader(xml);
    let mut buf = Vec::new();
    let mut fields: Vec<(String, String)> = Vec::new();
    let mut stack: Vec<OpenElement> = Vec::new();

    loop {
        let (ns, event) = reader.read_resolved_event_into(&mut buf)?;
        match event {
            Event::Start(start) => {
                if let Some(parent) = stack.last_mut() {
                    parent.has_child = true;
                }
                let slot = metadata_field_name(&ns, start.local_name().as_ref()).map(|name| {
                    fields.push((name, String::new()));
                    fields.len() - 1
                });
                stack.push(OpenElement {
                    slot,
                    has_child: false,
                });
            }
            Event::Empty(empty) => {
                if let Some(parent) = stack.last_mut() {
                    parent.has_child = true;
                }
                if let Some(name) = metadata_field_name(&ns, empty.local_name().as_ref()) {
                    fields.push((name, String::new()));
                }
            }
            Event::Text(text) => {
                if let Some(OpenElement {
                    slot: Some(slot),
                    has_child: false,
                }) = stack.last()
                {
                    fields[*slot].1.push_str(&text.unescape()?);
                }
            }
            Event::CData(cdata) => {
                if let Some(OpenElement {
                    slot: Some(slot),
                    has_child: false,
                }) = stack.last()
                {
                    fields[*slot]
                        .1
                        .push_str(&decode_header_bytes(&cdata.into_inner()));
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(
            "unclosed element in ARC metadata".to_string(),
        ))
        .into());
    }

    for field in &mut fields {
        let trimmed = field.1.trim();
        if trimmed.len() != field.1.len() {
            field.1 = trimmed.to_string();
        }
    }
    Ok(fields)
}

fn metadata_field_name(ns: &ResolveResult, local_name: &[u8]) -> Option<String> {
    let ResolveResult::Bound(Namespace(uri)) = ns else {
        return None;
    };
    if !METADATA_NAMESPACES.iter().any(|known| known == uri) || local_name == ARC_METADATA_ROOT {
        return None;
    }
    Some(String::from_utf8_lossy(local_name).into_owned())
}
