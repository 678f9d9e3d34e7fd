//! Publish state marker and the once-per-day gate
//!
//! The marker lives in the published tree and is the only record of "did
//! today's run already complete". The gate that reads it is advisory: two
//! runs that check at the same moment can both proceed, and the loser then
//! fails on the non-forced branch update.

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::{debug, info, warn};

use crate::store::StateStore;

/// Outcome recorded in the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
}

/// Durable record of the last successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishState {
    /// ISO calendar date of the run, in the configured timezone
    pub date: String,
    pub status: RunStatus,
    /// Window covered by the run, e.g. `2024-06-01 → 2024-06-13`
    pub range: String,
    /// Local wall-clock time of the run, with zone abbreviation
    pub updated_at: String,
}

impl PublishState {
    /// Marker for a successful run at `now`.
    pub fn success<Tz>(now: &DateTime<Tz>, range_hint: &str) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            date: now.date_naive().format("%Y-%m-%d").to_string(),
            status: RunStatus::Success,
            range: range_hint.to_string(),
            updated_at: now.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
        }
    }

    /// Pretty JSON with a trailing newline, as committed to the store.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self).map(|json| json + "\n")
    }

    /// Whether this marker records a success on `today`.
    pub fn is_success_on(&self, today: NaiveDate) -> bool {
        self.status == RunStatus::Success && self.date == today.format("%Y-%m-%d").to_string()
    }
}

/// The two marker fields the gate reads. Anything else in the file is
/// ignored, so markers written by older or newer runs still count.
#[derive(Debug, Deserialize)]
struct MarkerView {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl MarkerView {
    fn is_success_on(&self, today: NaiveDate) -> bool {
        self.status.as_deref() == Some("success")
            && self.date.as_deref() == Some(today.format("%Y-%m-%d").to_string().as_str())
    }
}

/// Check the store for a success marker dated `today`.
///
/// Fails open: a missing, unreadable or malformed marker all count as "not
/// yet published", so a flaky check costs a redundant run, never a skipped
/// one.
pub async fn already_succeeded_today<S>(store: &S, today: NaiveDate) -> bool
where
    S: StateStore + ?Sized,
{
    let raw = match store.fetch_state().await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("No publish marker at {}", store.state_path());
            return false;
        }
        Err(e) => {
            warn!("Publish marker check failed ({}); proceeding with run", e);
            return false;
        }
    };

    match serde_json::from_str::<MarkerView>(&raw) {
        Ok(marker) => {
            let done = marker.is_success_on(today);
            info!(
                "Publish marker: date={} status={} (today {})",
                marker.date.as_deref().unwrap_or("-"),
                marker.status.as_deref().unwrap_or("-"),
                today
            );
            done
        }
        Err(e) => {
            warn!("Publish marker at {} is malformed: {}", store.state_path(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use async_trait::async_trait;
    use chrono::Utc;
    use chrono_tz::Europe::London;

    enum Marker {
        Missing,
        Present(&'static str),
        Unreachable,
    }

    struct FakeState(Marker);

    #[async_trait]
    impl StateStore for FakeState {
        fn state_path(&self) -> &str {
            ".run-state/last_success.json"
        }

        async fn fetch_state(&self) -> Result<Option<String>, StoreError> {
            match &self.0 {
                Marker::Missing => Ok(None),
                Marker::Present(raw) => Ok(Some(raw.to_string())),
                Marker::Unreachable => Err(StoreError::Network("connection reset".to_string())),
            }
        }
    }

    fn june_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn test_gate_missing_marker() {
        assert!(!already_succeeded_today(&FakeState(Marker::Missing), june_first()).await);
    }

    #[tokio::test]
    async fn test_gate_network_failure_fails_open() {
        assert!(!already_succeeded_today(&FakeState(Marker::Unreachable), june_first()).await);
    }

    #[tokio::test]
    async fn test_gate_other_date() {
        let store = FakeState(Marker::Present(
            r#"{"date":"2024-05-31","status":"success","range":"r","updated_at":"u"}"#,
        ));
        assert!(!already_succeeded_today(&store, june_first()).await);
    }

    #[tokio::test]
    async fn test_gate_today_success() {
        let store = FakeState(Marker::Present(
            r#"{"date":"2024-06-01","status":"success","range":"r","updated_at":"u"}"#,
        ));
        assert!(already_succeeded_today(&store, june_first()).await);
    }

    #[tokio::test]
    async fn test_gate_reads_only_date_and_status() {
        let minimal = FakeState(Marker::Present(r#"{"date":"2024-06-01","status":"success"}"#));
        assert!(already_succeeded_today(&minimal, june_first()).await);

        let nulls = FakeState(Marker::Present(
            r#"{"date":"2024-06-01","status":"success","range":null,"updated_at":null,"extra":1}"#,
        ));
        assert!(already_succeeded_today(&nulls, june_first()).await);

        let no_status = FakeState(Marker::Present(r#"{"date":"2024-06-01"}"#));
        assert!(!already_succeeded_today(&no_status, june_first()).await);
    }

    #[tokio::test]
    async fn test_gate_malformed_or_unknown_status() {
        let garbage = FakeState(Marker::Present("<html>not json</html>"));
        assert!(!already_succeeded_today(&garbage, june_first()).await);

        let failed = FakeState(Marker::Present(
            r#"{"date":"2024-06-01","status":"failed","range":"r","updated_at":"u"}"#,
        ));
        assert!(!already_succeeded_today(&failed, june_first()).await);
    }

    #[test]
    fn test_success_payload() {
        // 12:34:56 UTC in June is 13:34:56 BST.
        let now = Utc
            .with_ymd_and_hms(2024, 6, 1, 12, 34, 56)
            .unwrap()
            .with_timezone(&London);
        let state = PublishState::success(&now, "2024-06-01 → 2024-06-13");
        assert_eq!(state.date, "2024-06-01");
        assert_eq!(state.updated_at, "2024-06-01 13:34:56 BST");
        assert!(state.is_success_on(june_first()));

        let payload = state.to_payload().unwrap();
        assert!(payload.ends_with("}\n"));
        assert!(payload.contains("\"status\": \"success\""));
        assert!(payload.contains("\"updated_at\": \"2024-06-01 13:34:56 BST\""));
        let back: PublishState = serde_json::from_str(&payload).unwrap();
        assert_eq!(back, state);
    }
}
