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

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use tracing::Level;

use warc_migrator::{migrate_to_warc, MigrationConfig, NonAsciiPolicy, UserFieldPolicy};

#[derive(Parser)]
#[command(
    name = "warc-migrator",
    about = "Migrate ARC 1.0/1.1 and WARC 0.17/0.18 files to WARC 1.0",
    version
)]
struct Cli {
    /// Source ARC or WARC file
    source: PathBuf,

    /// Target WARC file, must not exist
    target: PathBuf,

    /// Add a warcinfo field, may be given several times
    #[arg(long, num_args = 2, value_names = ["NAME", "VALUE"], action = ArgAction::Append)]
    meta: Vec<String>,

    /// How given warcinfo fields treat fields found in the source
    #[arg(long, value_enum, default_value = "overwrite")]
    user_field_policy: UserFieldPolicyArg,

    /// How non-ASCII characters in warcinfo fields are written
    #[arg(long, value_enum, default_value = "preserve")]
    non_ascii_policy: NonAsciiPolicyArg,

    /// ARC URL prefix always converted to a resource record
    #[arg(long = "resource-prefix", value_name = "PREFIX")]
    resource_prefixes: Vec<String>,

    /// ARC URL prefix always converted to a response record
    #[arg(long = "response-prefix", value_name = "PREFIX")]
    response_prefixes: Vec<String>,

    /// Do not run external validators on the result
    #[arg(long)]
    skip_validation: bool,

    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum UserFieldPolicyArg {
    Overwrite,
    FillMissing,
}

impl From<UserFieldPolicyArg> for UserFieldPolicy {
    fn from(policy: UserFieldPolicyArg) -> Self {
        match policy {
            UserFieldPolicyArg::Overwrite => UserFieldPolicy::Overwrite,
            UserFieldPolicyArg::FillMissing => UserFieldPolicy::FillMissing,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum NonAsciiPolicyArg {
    Preserve,
    Reject,
    PercentEncode,
}

impl From<NonAsciiPolicyArg> for NonAsciiPolicy {
    fn from(policy: NonAsciiPolicyArg) -> Self {
        match policy {
            NonAsciiPolicyArg::Preserve => NonAsciiPolicy::Preserve,
            NonAsciiPolicyArg::Reject => NonAsciiPolicy::Reject,
            NonAsciiPolicyArg::PercentEncode => NonAsciiPolicy::PercentEncode,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl Cli {
    fn config(&self) -> MigrationConfig {
        let mut config = MigrationConfig::default()
            .with_user_field_policy(self.user_field_policy.into())
            .with_non_ascii_policy(self.non_ascii_policy.into());
        for pair in self.meta.chunks_exact(2) {
            config = config.with_meta(&pair[0], &pair[1]);
        }
        for prefix in &self.resource_prefixes {
            config = config.with_resource_prefix(prefix);
        }
        for prefix in &self.response_prefixes {
            config = config.with_response_prefix(prefix);
        }
        if self.skip_validation {
            config = config.without_validation();
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config();
    let count = migrate_to_warc(&cli.source, &cli.target, &config).with_context(|| {
        format!(
            "Migrating {} to {} failed",
            cli.source.display(),
            cli.target.display()
        )
    })?;

    println!(
        "Wrote the migrated warc into {} with {} records.",
        cli.target.display(),
        count
    );
    Ok(())
}
