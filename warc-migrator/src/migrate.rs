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

//! Migration driver.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::MigrationConfig;
use crate::detect::{detect_format, ArchiveFormat};
use crate::error::{MigrateError, Result};
use crate::fixer::{InputMode, RewriteSummary, WarcFixer};
use crate::recompress::recompress_warc;
use crate::transform::convert_arc;
use crate::validate::run_validation;

/// Migrate `source` (ARC or WARC 0.x) into a new WARC/1.0 file at `target`.
///
/// Returns the number of records written.
pub fn migrate_to_warc(
    source: impl AsRef<Path>,
    target: impl AsRef<Path>,
    config: &MigrationConfig,
) -> Result<usize> {
    WarcMigrator::new(source, target, config).migrate()
}

/// One migration run from a source file to a target file.
pub struct WarcMigrator<'a> {
    source: PathBuf,
    target: PathBuf,
    config: &'a MigrationConfig,
}

impl<'a> WarcMigrator<'a> {
    pub fn new(
        source: impl AsRef<Path>,
        target: impl AsRef<Path>,
        config: &'a MigrationConfig,
    ) -> Self {
        WarcMigrator {
            source: source.as_ref().to_path_buf(),
            target: target.as_ref().to_path_buf(),
            config,
        }
    }

    fn target_name(&self) -> String {
        self.target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Run the migration.
    ///
    /// The target must not exist and the source must not be empty. If the
    /// run fails after the target was created, the target is removed again,
    /// except when only validation failed.
    pub fn migrate(&self) -> Result<usize> {
        if self.target.exists() {
            return Err(MigrateError::TargetExists(self.target.clone()));
        }
        if fs::metadata(&self.source)?.len() == 0 {
            return Err(MigrateError::EmptySource(self.source.clone()));
        }

        let format = detect_format(&self.source)?;
        info!(
            source = %self.source.display(),
            target = %self.target.display(),
            ?format,
            "Migrating archive"
        );

        let target = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.target)
            .map_err(|err| match err.kind() {
                io::ErrorKind::AlreadyExists => MigrateError::TargetExists(self.target.clone()),
                _ => MigrateError::Io(err),
            })?;

        let written = match format {
            ArchiveFormat::Arc => self.migrate_arc(&target),
            ArchiveFormat::Warc => self.migrate_warc(&target),
        };
        drop(target);

        let count = match written {
            Ok(count) => count,
            Err(err) => {
                if let Err(remove_err) = fs::remove_file(&self.target) {
                    warn!(error = %remove_err, "Could not remove partial target");
                }
                return Err(err);
            }
        };

        run_validation(&self.config.validators, &self.target)?;
        info!(records = count, target = %self.target.display(), "Migration finished");
        Ok(count)
    }

    /// Convert an ARC source through a temporary WARC and fix it into `target`.
    pub fn migrate_arc(&self, target: &File) -> Result<usize> {
        let mut converted_file = tempfile::tempfile()?;
        let source = BufReader::new(File::open(&self.source)?);
        let converted = convert_arc(source, BufWriter::new(&mut converted_file), self.config)?;
        converted_file.rewind()?;

        let summary = self.fix_warc_file(converted_file, target, InputMode::FromArc)?;
        if summary.records != converted {
            return Err(MigrateError::CountMismatch {
                converted,
                rewritten: summary.records,
            });
        }
        Ok(summary.records)
    }

    /// Fix a WARC 0.x source into `target`.
    pub fn migrate_warc(&self, target: &File) -> Result<usize> {
        let source = File::open(&self.source)?;
        let summary = self.fix_warc_file(source, target, InputMode::FromLegacyWarc)?;
        Ok(summary.records)
    }

    /// Rewrite `source` into `target`, recompressing it once if it turns out
    /// to be a single gzip member.
    pub fn fix_warc_file<R: Read + Seek>(
        &self,
        mut source: R,
        mut target: &File,
        mode: InputMode,
    ) -> Result<RewriteSummary> {
        let fixer = WarcFixer::new(self.config, self.target_name());
        match fixer.fix_warc(BufReader::new(&mut source), BufWriter::new(target), mode) {
            Err(err) if err.is_non_chunked_gzip() => {
                warn!(error = %err, "Recompressing source with one gzip member per record");
                source.rewind()?;
                let mut recompressed = tempfile::tempfile()?;
                recompress_warc(&mut source, BufWriter::new(&mut recompressed))?;
                recompressed.rewind()?;

                target.set_len(0)?;
                target.rewind()?;
                fixer.fix_warc(BufReader::new(recompressed), BufWriter::new(target), mode)
            }
            result => result,
        }
    }
}
