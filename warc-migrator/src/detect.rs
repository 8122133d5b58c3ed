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

use std::io;
use std::path::Path;

use fastwarc::{ArchiveIterator, Compression};
use tracing::{debug, warn};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Arc,
    Warc,
}

/// Classify an archive file by its first record.
///
/// Only the first record is read. A file without any record is an I/O error.
pub fn detect_format(path: impl AsRef<Path>) -> Result<ArchiveFormat> {
    let path = path.as_ref();
    let mut records = ArchiveIterator::open(path)?
        .parse_http(false)
        .strict_framing(false);
    let compression = records.compression();

    let first = records.read_next()?.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("no archive records in {}", path.display()),
        )
    })?;
    let format = if first.is_warc() {
        ArchiveFormat::Warc
    } else {
        ArchiveFormat::Arc
    };
    if Compression::guess_for_filename(path) != compression {
        warn!(path = %path.display(), ?compression, "File extension does not match compression");
    }
    debug!(path = %path.display(), ?format, ?compression, "Detected archive format");
    Ok(format)
}
