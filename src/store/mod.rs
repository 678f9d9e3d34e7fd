//! Content Stores Module
//!
//! The publish pipeline talks to its backend through two narrow traits:
//!
//! ```text
//! ┌──────────────────────┐   ┌───────────────────────────┐
//! │     StateStore       │   │      ArtifactStore        │
//! │ read success marker  │   │ replace files atomically  │
//! └──────────────────────┘   └───────────────────────────┘
//!            │                            │
//!       ┌────┴──────────┬─────────────────┘
//!       ▼               ▼
//! ┌─────────────┐ ┌───────────────┐
//! │ GitHubStore │ │ LocalDirStore │
//! └─────────────┘ └───────────────┘
//! ```
//!
//! The marker is never written on its own: it is one of the artifacts, so
//! it lands in the same snapshot as the pages it vouches for.

pub mod types;
pub mod github;
pub mod local;

pub use types::*;
pub use github::GitHubStore;
pub use local::LocalDirStore;

use async_trait::async_trait;

/// Read side of the durable "already published today" marker.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Path of the marker inside the published tree.
    fn state_path(&self) -> &str;

    /// Fetch the raw marker. `Ok(None)` means the marker does not exist.
    async fn fetch_state(&self) -> Result<Option<String>, StoreError>;
}

/// Atomic replacement of the published file set.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Display name for log lines.
    fn display_name(&self) -> String;

    /// Replace the published content with `artifacts`. Either every file
    /// becomes visible or none does.
    async fn publish(
        &self,
        artifacts: &ArtifactSet,
        message: &str,
    ) -> Result<PublishReceipt, StoreError>;
}
