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

//! Error types for migration runs.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for migration operations
pub type Result<T> = std::result::Result<T, MigrateError>;

/// Migration error types
#[derive(Error, Debug)]
pub enum MigrateError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading or writing archive records failed
    #[error("Archive error: {0}")]
    Archive(#[from] fastwarc::Error),

    /// Embedded ARC metadata is not well-formed XML
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Target file already exists: {0}")]
    TargetExists(PathBuf),

    #[error("Empty source file: {0}")]
    EmptySource(PathBuf),

    /// ARC date field matches neither `YYYYMMDDHHMMSS` nor `YYYYMMDD`
    #[error("Invalid ARC date: {0:?}")]
    InvalidArcDate(String),

    /// A warcinfo field could not be written under the strict non-ASCII policy
    #[error("Non-ASCII characters in warcinfo field {key:?}")]
    NonAsciiField { key: String },

    /// A converted ARC stream ended before its warcinfo/metadata pair was seen
    #[error("No warcinfo and ARC metadata record pair found")]
    MissingHeaderPair,

    /// A legacy WARC stream unexpectedly contained an ARC record
    #[error("Unexpected ARC record at offset {0} in WARC stream")]
    UnexpectedArcRecord(u64),

    /// Records written by the fix pass differ from records produced by ARC conversion
    #[error("Count mismatch, originally {converted} records, recounted {rewritten} records")]
    CountMismatch { converted: usize, rewritten: usize },

    /// An external validator rejected the output
    #[error("Validation with {tool} failed:\n{output}")]
    Validation { tool: String, output: String },
}

impl MigrateError {
    /// Whether this error is the archive library's single-member gzip signal.
    pub fn is_non_chunked_gzip(&self) -> bool {
        matches!(self, MigrateError::Archive(err) if err.is_non_chunked_gzip())
    }
}
