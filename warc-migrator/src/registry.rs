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

//! Ordered warcinfo field registry.
//!
//! Keys keep their first-insertion order and every key holds a non-empty list
//! of values in the order they were added. Serialization produces the
//! `application/warc-fields` payload of a warcinfo record.

use crate::config::{NonAsciiPolicy, UserFieldPolicy};
use crate::error::{MigrateError, Result};

/// Ordered multimap of warcinfo field names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarcinfoRegistry {
    fields: Vec<(String, Vec<String>)>,
}

impl WarcinfoRegistry {
    pub fn new() -> Self {
        WarcinfoRegistry { fields: Vec::new() }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|(k, _)| k == key)
    }

    /// Append a value to `key`, creating the key at the end if it is new.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.position(&key) {
            Some(pos) => self.fields[pos].1.push(value.into()),
            None => self.fields.push((key, vec![value.into()])),
        }
    }

    /// All values of `key` in insertion order.
    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.position(key).map(|pos| self.fields[pos].1.as_slice())
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Force `key` to a single value, keeping its position if present.
    pub fn replace(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.replace_all(key, vec![value.into()]);
    }

    /// Replace all values of `key`, keeping its position if present.
    ///
    /// An empty `values` list removes the key.
    pub fn replace_all(&mut self, key: impl Into<String>, values: Vec<String>) {
        let key = key.into();
        match (self.position(&key), values.is_empty()) {
            (Some(pos), true) => {
                self.fields.remove(pos);
            }
            (Some(pos), false) => self.fields[pos].1 = values,
            (None, true) => {}
            (None, false) => self.fields.push((key, values)),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keys with their value lists in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Apply user-supplied fields on top of this registry.
    pub fn merge_user_fields(&mut self, user: &WarcinfoRegistry, policy: UserFieldPolicy) {
        for (key, values) in user.iter() {
            if policy == UserFieldPolicy::FillMissing && self.contains_key(key) {
                continue;
            }
            self.replace_all(key, values.to_vec());
        }
    }

    /// Serialize into a warc-fields payload.
    ///
    /// Every value is written as `key:` + value, where the value gets a single
    /// leading space unless it already has one. Each line ends in CRLF; a bare
    /// LF kept from a legacy payload is written as CRLF.
    pub fn serialize(&self, policy: NonAsciiPolicy) -> Result<String> {
        let mut out = String::new();
        for (key, values) in &self.fields {
            let key = apply_non_ascii_policy(key, key, policy)?;
            for value in values {
                let value = apply_non_ascii_policy(&key, value, policy)?;
                out.push_str(&key);
                out.push(':');
                if !value.starts_with(' ') {
                    out.push(' ');
                }
                match value.strip_suffix('\n') {
                    Some(line) => out.push_str(line.strip_suffix('\r').unwrap_or(line)),
                    None => out.push_str(&value),
                }
                out.push_str("\r\n");
            }
        }
        Ok(out)
    }
}

fn apply_non_ascii_policy(key: &str, text: &str, policy: NonAsciiPolicy) -> Result<String> {
    if text.is_ascii() {
        return Ok(text.to_string());
    }
    match policy {
        NonAsciiPolicy::Preserve => Ok(text.to_string()),
        NonAsciiPolicy::Reject => Err(MigrateError::NonAsciiField {
            key: key.to_string(),
        }),
        NonAsciiPolicy::PercentEncode => {
            let mut out = String::with_capacity(text.len() * 3);
            let mut buf = [0u8; 4];
            for c in text.chars() {
                if c.is_ascii() {
                    out.push(c);
                } else {
                    out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
                }
            }
            Ok(out)
        }
    }
}
