// route-tabs - daily status-tab pages for bus routes
// Builds one auto-opening page per route and publishes the site to a Git branch

pub mod config;
pub mod pipeline;
pub mod plan;
pub mod render;
pub mod routes;
pub mod state;
pub mod store;
pub mod window;

pub use config::{token_from_env, ConfigError, PublishConfig, RepoSlug};
pub use pipeline::{run, RunError, RunOptions, RunOutcome};
pub use plan::{open_plan_for_route, Direction, TabPlanEntry};
pub use routes::{parse_route_list, FileRouteSource, RouteError, RouteId, RouteSource};
pub use state::{already_succeeded_today, PublishState};
pub use store::{ArtifactSet, ArtifactStore, GitHubStore, LocalDirStore, StateStore, StoreError};
pub use window::{day_bounds, weekend_bounds, ScheduleWindow};

use tracing::Level;

/// Install the global fmt subscriber. Info by default, debug when verbose.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
