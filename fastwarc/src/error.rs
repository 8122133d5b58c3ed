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

//! Error types for archive reading and writing.

use thiserror::Error;

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Archive load and write errors.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A gzip member spans more than one record.
    ///
    /// The stream is readable, but records cannot be accessed individually.
    /// Recompressing the file with one member per record fixes it.
    #[error("ERROR: non-chunked gzip file detected at offset {offset}")]
    NonChunkedGzip { offset: u64 },

    /// Malformed WARC or ARC header block
    #[error("Invalid record header at offset {offset}: {reason}")]
    InvalidHeader { offset: u64, reason: String },

    /// Stream ended inside a record body
    #[error("Truncated record at offset {offset}: expected {expected} bytes, got {actual}")]
    Truncated {
        offset: u64,
        expected: usize,
        actual: usize,
    },
}

impl Error {
    /// Whether this error signals single-member gzip framing.
    pub fn is_non_chunked_gzip(&self) -> bool {
        matches!(self, Error::NonChunkedGzip { .. })
    }
}
