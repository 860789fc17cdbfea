//! Per-call configuration bag with default resolution.

use crate::attributes::Visibility;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

pub const OPTION_VISIBILITY: &str = "visibility";
pub const OPTION_DIRECTORY_VISIBILITY: &str = "directory_visibility";
pub const OPTION_RETAIN_VISIBILITY: &str = "retain_visibility";

/// Key/value settings passed to write, copy, move and create-directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    options: HashMap<String, Value>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with `key` set to `value`.
    pub fn with_setting(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut options = self.options.clone();
        options.insert(key.into(), value.into());
        Self { options }
    }

    /// Merge `defaults` underneath the explicit settings.
    pub fn with_defaults(&self, defaults: &HashMap<String, Value>) -> Self {
        let mut options = defaults.clone();
        options.extend(self.options.clone());
        Self { options }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.options
            .get(key)
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn visibility(&self) -> Option<Visibility> {
        self.get_visibility(OPTION_VISIBILITY)
    }

    pub fn directory_visibility(&self) -> Option<Visibility> {
        self.get_visibility(OPTION_DIRECTORY_VISIBILITY)
    }

    /// Whether copy keeps the source visibility when none is given.
    pub fn retain_visibility(&self) -> bool {
        self.get_or(OPTION_RETAIN_VISIBILITY, true)
    }

    fn get_visibility(&self, key: &str) -> Option<Visibility> {
        let raw: String = self.get(key)?;
        match raw.parse() {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("Ignoring config '{}': {}", key, e);
                None
            }
        }
    }
}
