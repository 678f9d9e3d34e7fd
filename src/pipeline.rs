//! Daily publish run
//!
//! Gate → load routes → window → per-route plans → assemble → publish.
//! `now` is captured once by the caller and threaded through every step.

use chrono::DateTime;
use chrono_tz::Tz;
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, PublishConfig};
use crate::render::{assemble, check_reserved_paths, RenderError};
use crate::routes::{parse_route_list, RouteError, RouteSource};
use crate::state::{already_succeeded_today, PublishState};
use crate::store::{ArtifactStore, PublishReceipt, StateStore, StoreError};
use crate::window::{london_today, ScheduleWindow};

/// Fatal run errors. Nothing is retried; the binary reports and exits
/// non-zero.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Routes(#[from] RouteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Today's marker was already present.
    Skipped { date: String },
    /// A new revision was published.
    Published(PublishReceipt),
}

/// Per-run options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Publish even when today's marker says the run already happened.
    pub force: bool,
}

pub fn commit_message(range_hint: &str, route_count: usize) -> String {
    format!(
        "Daily HTML update: {} (+now,+weekend; {} routes + index)",
        range_hint, route_count
    )
}

/// Execute one run against `store`, reading routes from `routes`.
pub async fn run<S, R>(
    store: &S,
    routes: &R,
    config: &PublishConfig,
    now: DateTime<Tz>,
    options: RunOptions,
) -> Result<RunOutcome, RunError>
where
    S: StateStore + ArtifactStore + ?Sized,
    R: RouteSource + ?Sized,
{
    config.validate()?;
    let today = london_today(&now);

    if options.force {
        info!("--force given, skipping publish marker check");
    } else if already_succeeded_today(store, today).await {
        info!("Skip: already succeeded today ({})", today);
        return Ok(RunOutcome::Skipped {
            date: today.format("%Y-%m-%d").to_string(),
        });
    }

    let raw = routes.load_route_list().await?;
    let route_ids = parse_route_list(&raw)?;
    info!("Loaded {} routes from {}", route_ids.len(), routes.describe());

    let window = ScheduleWindow::rolling(today, config.window_days);
    let range_hint = window.range_hint();
    let generated_at = now.format("%Y-%m-%d %H:%M %Z").to_string();

    check_reserved_paths(&route_ids, config, &[store.state_path()])?;
    let mut artifacts = assemble(&route_ids, &window, today, &generated_at, config)?;
    let marker = PublishState::success(&now, &range_hint)
        .to_payload()
        .map_err(RenderError::from)?;
    artifacts.insert(store.state_path(), marker);

    let message = commit_message(&range_hint, route_ids.len());
    info!(
        "Publishing {} files to {}: {}",
        artifacts.len(),
        store.display_name(),
        message
    );
    let receipt = store.publish(&artifacts, &message).await?;
    info!(
        "OK: committed {} routes + index to {}: {}",
        route_ids.len(),
        receipt.target,
        receipt.revision
    );

    Ok(RunOutcome::Published(receipt))
}
