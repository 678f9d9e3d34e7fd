//! Route identifiers and route-list loading
//!
//! A route list is plain text with one identifier per line. Order is kept
//! exactly as written because it drives the order of the index page.

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

use crate::store::StoreError;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static regex"));

/// Opaque route token, e.g. `24`, `N29` or `SL10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteId(String);

impl RouteId {
    /// Build a route id from raw input. Returns `None` for blank input.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe form of the id. Runs of characters outside
    /// `[A-Za-z0-9._-]` collapse to a single `_`.
    pub fn safe_name(&self) -> String {
        sanitize(&self.0)
    }

    /// File name of the route's generated page.
    pub fn page_file_name(&self) -> String {
        format!("{}.html", self.safe_name())
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collapse unsafe character runs to `_`. Idempotent.
pub fn sanitize(value: &str) -> String {
    UNSAFE_CHARS.replace_all(value, "_").into_owned()
}

/// Fatal problems with the route list input.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("route list contained no routes")]
    Empty,

    #[error("duplicate route in route list: {0}")]
    Duplicate(String),

    #[error("routes '{first}' and '{second}' both map to page '{safe_name}.html'")]
    NameCollision {
        first: String,
        second: String,
        safe_name: String,
    },
}

/// Parse a route list, rejecting empty input, duplicates and page-name
/// collisions.
pub fn parse_route_list(text: &str) -> Result<Vec<RouteId>, RouteError> {
    let routes: Vec<RouteId> = text.lines().filter_map(RouteId::new).collect();
    if routes.is_empty() {
        return Err(RouteError::Empty);
    }

    let mut by_safe_name: HashMap<String, &RouteId> = HashMap::with_capacity(routes.len());
    for route in &routes {
        let safe = route.safe_name();
        if let Some(existing) = by_safe_name.get(&safe) {
            if *existing == route {
                return Err(RouteError::Duplicate(route.to_string()));
            }
            return Err(RouteError::NameCollision {
                first: existing.to_string(),
                second: route.to_string(),
                safe_name: safe,
            });
        }
        by_safe_name.insert(safe, route);
    }

    Ok(routes)
}

/// Where the raw route list comes from.
#[async_trait]
pub trait RouteSource: Send + Sync {
    /// Human-readable origin, used in log lines.
    fn describe(&self) -> String;

    /// Fetch the raw route list text.
    async fn load_route_list(&self) -> Result<String, StoreError>;
}

/// Route list read from a local file.
pub struct FileRouteSource {
    path: PathBuf,
}

impl FileRouteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RouteSource for FileRouteSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load_route_list(&self) -> Result<String, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(self.path.display().to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
