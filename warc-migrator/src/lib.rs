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

//! Migration of ARC 1.0/1.1 and WARC 0.17/0.18 files to WARC 1.0.
//!
//! ARC files are first converted record by record into a temporary WARC
//! stream. That stream, or a legacy WARC source, is then rewritten into the
//! target: the warcinfo header block is rebuilt from the legacy metadata,
//! every record gets the `WARC/1.0` protocol line and digests, and each record
//! is compressed as its own gzip member. The result is checked with external
//! validators.

pub mod config;
pub mod detect;
mod error;
pub mod extract;
pub mod fixer;
pub mod handler;
pub mod migrate;
pub mod recompress;
pub mod registry;
pub mod transform;
pub mod validate;

pub use config::{MigrationConfig, NonAsciiPolicy, UserFieldPolicy};
pub use detect::{detect_format, ArchiveFormat};
pub use error::{MigrateError, Result};
pub use fixer::{InputMode, RewriteSummary, WarcFixer};
pub use handler::ArchiveHandler;
pub use migrate::{migrate_to_warc, WarcMigrator};
pub use recompress::recompress_warc;
pub use registry::WarcinfoRegistry;
pub use transform::{convert_arc, ArcTransformer};
pub use validate::{run_validation, Validator};
