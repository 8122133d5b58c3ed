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

//! External validation of migrated files.

use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{MigrateError, Result};

/// An external validator program, run as `program args... TARGET`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl Validator {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: &[&str]) -> Self {
        Validator {
            name: name.into(),
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// `warcvalid TARGET` followed by `warcio check TARGET`.
    pub fn defaults() -> Vec<Validator> {
        vec![
            Validator::new("warcvalid", "warcvalid", &[]),
            Validator::new("warcio", "warcio", &["check"]),
        ]
    }

    /// Run the validator against `target`.
    ///
    /// A non-zero exit status is a [`MigrateError::Validation`] carrying the
    /// return code and the captured output.
    pub fn run(&self, target: &Path) -> Result<()> {
        debug!(validator = self.name.as_str(), program = self.program.as_str(), "Running validator");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(target)
            .output()?;
        if output.status.success() {
            return Ok(());
        }

        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string());
        Err(MigrateError::Validation {
            tool: self.name.clone(),
            output: [
                format!("Failed: returncode {code}"),
                String::from_utf8_lossy(&output.stdout).into_owned(),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ]
            .join("\n"),
        })
    }
}

/// Run every validator in order, stopping at the first failure.
pub fn run_validation(validators: &[Validator], target: &Path) -> Result<()> {
    for validator in validators {
        validator.run(target)?;
    }
    if !validators.is_empty() {
        info!(target = %target.display(), "Validation passed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = Validator::defaults();
        assert_eq!(defaults[0].program, "warcvalid");
        assert!(defaults[0].args.is_empty());
        assert_eq!(defaults[1].args, vec!["check".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_validation() {
        let ok = Validator::new("ok", "sh", &["-c", "test -n \"$0\""]);
        let failing = Validator::new("bad", "sh", &["-c", "echo broken \"$0\"; exit 3"]);
        let target = Path::new("file.warc.gz");

        run_validation(&[ok.clone()], target).unwrap();
        let err = run_validation(&[ok, failing], target).unwrap_err();
        match err {
            MigrateError::Validation { tool, output } => {
                assert_eq!(tool, "bad");
                assert!(output.starts_with("Failed: returncode 3\n"));
                assert!(output.contains("broken file.warc.gz"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let missing = Validator::new("missing", "warc-migrator-no-such-validator", &[]);
        assert!(matches!(
            missing.run(Path::new("x")),
            Err(MigrateError::Io(_))
        ));
    }
}
