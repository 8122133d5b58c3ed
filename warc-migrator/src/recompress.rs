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

//! Recovery from single-member gzip files.
//!
//! Some tools compress a whole WARC file as one gzip member. Such files can
//! still be read sequentially, but not by offset. Recompression writes every
//! record as its own gzip member.

use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};

use fastwarc::{ArchiveIterator, ArchiveRecord, WarcWriter};
use flate2::read::MultiGzDecoder;
use tracing::{debug, info};

use crate::error::{MigrateError, Result};

/// Recompress a gzip WARC stream with one gzip member per record.
///
/// Records are copied unchanged, without forcing a version or adding
/// digests. Returns the number of records written.
pub fn recompress_warc<R: Read, W: Write>(source: R, target: W) -> Result<usize> {
    let mut decoded = tempfile::tempfile()?;
    let bytes = io::copy(&mut MultiGzDecoder::new(source), &mut decoded)?;
    decoded.seek(SeekFrom::Start(0))?;
    debug!(bytes, "Decompressed source into temporary file");

    let mut writer = WarcWriter::new(target).gzip(true);
    let records = ArchiveIterator::new(BufReader::new(decoded))?
        .parse_http(false)
        .strict_framing(false);
    for record in records {
        match record? {
            ArchiveRecord::Warc(record) => {
                writer.write_record(&record)?;
            }
            ArchiveRecord::Arc(record) => {
                return Err(MigrateError::UnexpectedArcRecord(record.stream_pos()));
            }
        }
    }

    let count = writer.records_written();
    writer.flush()?;
    info!(records = count, "Recompressed WARC with one gzip member per record");
    Ok(count)
}
