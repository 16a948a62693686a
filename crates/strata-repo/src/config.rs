//! Repository configuration.
//!
//! A flat key/value map in the style of git config. The repository reads the
//! `user.name` / `user.email` pair to derive default authorship when a commit
//! or merge does not supply one explicitly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use strata_store::Signature;

/// Config key for the default author/committer name.
pub const USER_NAME: &str = "user.name";

/// Config key for the default author/committer email.
pub const USER_EMAIL: &str = "user.email";

/// Flat configuration map.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    values: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn unset(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    /// Set both identity keys at once.
    pub fn set_identity(&mut self, name: impl Into<String>, email: impl Into<String>) {
        self.set(USER_NAME, name);
        self.set(USER_EMAIL, email);
    }

    /// Build a signature from the configured identity, or `None` when either
    /// identity key is missing.
    pub fn signature(&self, timestamp_ms: i64, tz_offset_minutes: i32) -> Option<Signature> {
        let name = self.get(USER_NAME)?;
        let email = self.get(USER_EMAIL)?;
        Some(Signature::new(name, email, timestamp_ms, tz_offset_minutes))
    }
}
