//! Shared types for content stores
//!
//! Artifact sets, publish receipts and the store error type used by every
//! backend.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Files to publish, keyed by their full target path.
///
/// Backed by a `BTreeMap` so iteration order (and therefore every request
/// body built from it) is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    files: BTreeMap<String, String>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    /// Branch (or directory) that now holds the artifacts
    pub target: String,
    /// New revision id (commit SHA for Git backends)
    pub revision: String,
    /// Number of files written
    pub files: usize,
}

/// Store error type
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{method} {url} -> {status}\n{body}")]
    Api {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Branch '{0}' moved while publishing; refusing to overwrite")]
    RefConflict(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Parse(e.to_string())
        } else {
            StoreError::Network(e.to_string())
        }
    }
}
