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

//! Migration run configuration.

use crate::registry::WarcinfoRegistry;
use crate::validate::Validator;

/// How user-supplied warcinfo fields interact with fields extracted from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserFieldPolicy {
    /// User values replace extracted values for the same key.
    #[default]
    Overwrite,
    /// User values are only applied to keys the source did not declare.
    FillMissing,
}

/// How non-ASCII characters in warcinfo field names and values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonAsciiPolicy {
    /// Write them as UTF-8.
    #[default]
    Preserve,
    /// Fail with [`crate::MigrateError::NonAsciiField`].
    Reject,
    /// Percent-encode every non-ASCII character as UTF-8 octets.
    PercentEncode,
}

/// Options of one migration run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Warcinfo fields supplied by the user, in submission order.
    pub user_metadata: WarcinfoRegistry,
    pub user_field_policy: UserFieldPolicy,
    pub non_ascii_policy: NonAsciiPolicy,
    /// ARC URL prefixes always converted to `resource` records.
    pub resource_prefixes: Vec<String>,
    /// ARC URL prefixes always converted to `response` records.
    pub response_prefixes: Vec<String>,
    /// External validators run against the finished target, in order.
    pub validators: Vec<Validator>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        MigrationConfig {
            user_metadata: WarcinfoRegistry::new(),
            user_field_policy: UserFieldPolicy::default(),
            non_ascii_policy: NonAsciiPolicy::default(),
            resource_prefixes: Vec::new(),
            response_prefixes: Vec::new(),
            validators: Validator::defaults(),
        }
    }
}

impl MigrationConfig {
    /// Add a user warcinfo field. Repeated keys keep every value in order.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_metadata.set(key, value);
        self
    }

    pub fn with_user_field_policy(mut self, policy: UserFieldPolicy) -> Self {
        self.user_field_policy = policy;
        self
    }

    pub fn with_non_ascii_policy(mut self, policy: NonAsciiPolicy) -> Self {
        self.non_ascii_policy = policy;
        self
    }

    pub fn with_resource_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.resource_prefixes.push(prefix.into());
        self
    }

    pub fn with_response_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.response_prefixes.push(prefix.into());
        self
    }

    pub fn with_validators(mut self, validators: Vec<Validator>) -> Self {
        self.validators = validators;
        self
    }

    /// Skip external validation entirely.
    pub fn without_validation(self) -> Self {
        self.with_validators(Vec::new())
    }
}
