//! Environment variable sets passed explicitly to child processes.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

/// An owned set of environment variables.
///
/// Built either from the running process (`from_current`) or from the
/// `KEY=VALUE` dump printed by a vendor initialisation script
/// (`parse_dump`). The running process's own environment is never modified;
/// callers hand this mapping to each subprocess instead.
///
/// Names and values are OS strings, so variables that are not valid Unicode
/// reach child processes unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentMapping {
    vars: BTreeMap<OsString, OsString>,
}

impl EnvironmentMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    pub fn from_current() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    /// Parse the output of an environment dump (`set` / `env`).
    ///
    /// Each line is split on the first `=` only, so values may themselves
    /// contain `=`. Lines without a separator, or with an empty name, are
    /// ignored. A repeated name keeps the last value.
    pub fn parse_dump(text: &str) -> Self {
        let mut vars = BTreeMap::new();
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            vars.insert(OsString::from(key), OsString::from(value));
        }
        Self { vars }
    }

    pub fn insert(
        &mut self,
        key: impl Into<OsString>,
        value: impl Into<OsString>,
    ) -> Option<OsString> {
        self.vars.insert(key.into(), value.into())
    }

    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    pub fn contains_key(&self, key: impl AsRef<OsStr>) -> bool {
        self.vars.contains_key(key.as_ref())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}
