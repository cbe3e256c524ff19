//! Model settings document
//!
//! The model settings JSON names the sync configuration asset under
//! `FileReferences.MotionSync`, relative to where the settings were loaded
//! from.

use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::error::{Result, SyncError};

/// Parsed model settings plus the location they came from
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    json: Value,
    location: String,
}

impl ModelSettings {
    pub fn new(json: Value, location: impl Into<String>) -> Self {
        Self {
            json,
            location: location.into(),
        }
    }

    /// Parse a settings document
    pub fn from_slice(bytes: &[u8], location: impl Into<String>) -> Result<Self> {
        let json =
            serde_json::from_slice(bytes).map_err(|e| SyncError::InvalidConfig(e.to_string()))?;
        Ok(Self::new(json, location))
    }

    pub fn json(&self) -> &Value {
        &self.json
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// `FileReferences.MotionSync`, if the document has a string there
    pub fn motion_sync_reference(&self) -> Option<&str> {
        self.json
            .as_object()?
            .get("FileReferences")?
            .as_object()?
            .get("MotionSync")?
            .as_str()
    }

    /// Resolve an asset reference against the settings location
    pub fn resolve_url(&self, reference: &str) -> String {
        resolve_relative(&self.location, reference)
    }
}

/// Resolve `reference` relative to the document at `base`.
///
/// URL bases (`https://`, `file://`, ...) resolve through [`Url::join`], so
/// queries and fragments on either side are handled. Plain file paths are
/// joined segment by segment with `.` and `..` collapsed. Absolute references
/// are returned unchanged.
pub fn resolve_relative(base: &str, reference: &str) -> String {
    if Url::parse(reference).is_ok() {
        return reference.to_string();
    }
    match Url::parse(base) {
        Ok(base_url) if !base_url.cannot_be_a_base() => match base_url.join(reference) {
            Ok(resolved) => resolved.into(),
            Err(e) => {
                warn!("Cannot resolve '{}' against '{}': {}", reference, base, e);
                reference.to_string()
            }
        },
        _ => join_path(base, reference),
    }
}

/// Join a relative reference onto the directory of a file path
fn join_path(base: &str, reference: &str) -> String {
    if reference.starts_with('/') {
        return reference.to_string();
    }

    let mut segments: Vec<&str> = base.split('/').collect();
    // Drop the document's own file name
    segments.pop();

    for part in reference.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                while let Some(last) = segments.pop() {
                    if !last.is_empty() {
                        break;
                    }
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    if base.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}
