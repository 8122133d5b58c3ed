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

//! WARC and ARC record reading and writing.
//!
//! - [`ArchiveIterator`] reads WARC (0.x and 1.x) and ARC (v1, v2) records from
//!   plain or gzip-compressed streams.
//! - [`WarcWriter`] serializes WARC records, optionally one gzip member per record.
//! - [`http::is_http_response`] decides whether a captured blob is a complete HTTP response.

pub mod arc;
pub mod compression;
pub mod digest;
mod error;
pub mod http;
mod reader;
mod record;
mod writer;

pub use arc::{ArcHeader, ArcRecord};
pub use compression::Compression;
pub use error::{Error, Result};
pub use reader::{ArchiveIterator, ArchiveRecord};
pub use record::{
    decode_header_bytes, parse_header_block, HeaderEncoding, HeaderMap, WarcRecord,
    WarcRecordType, WARC_1_0,
};
pub use writer::WarcWriter;
