//! Per-route tab plan
//!
//! Builds the ordered list of status-page tabs a route page opens, together
//! with the delay at which each tab is opened. The order and spacing are
//! replayed by index in the browser, so they must not change between runs
//! for the same inputs.
//!
//! ```text
//!  0 ms    now, inbound           60 ms   now, outbound
//!  200 ms  day 0, inbound         260 ms  day 0, outbound
//!  550 ms  day 1, inbound         610 ms  day 1, outbound
//!  ...     (+350 ms per day)
//!  200 + 350*n + 200 ms  weekend, inbound / outbound (+60 ms)
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::routes::RouteId;
use crate::window::{day_bounds, weekend_bounds, ScheduleWindow};

/// Live status lookup page.
pub const STATUS_BASE_URL: &str = "https://tfl.gov.uk/bus/status/";

/// Delay of the first day-scoped tab.
pub const BASE_DELAY_MS: u64 = 200;
/// Spacing between consecutive days.
pub const DAY_SPACING_MS: u64 = 350;
/// Offset of the outbound tab after its inbound twin.
pub const DIRECTION_STAGGER_MS: u64 = 60;
/// Extra gap before the weekend tabs.
pub const WEEKEND_GAP_MS: u64 = 200;

const FUTURE_DATE_SELECTOR: &str = "Future date";
const THIS_WEEKEND_SELECTOR: &str = "This weekend";

/// Travel direction of a status lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Inbound, Direction::Outbound];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }

    fn stagger_ms(&self) -> u64 {
        match self {
            Direction::Inbound => 0,
            Direction::Outbound => DIRECTION_STAGGER_MS,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tab to open: label, target and scheduled delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabPlanEntry {
    pub label: String,
    pub url: String,
    pub delay_ms: u64,
}

/// Undated status URL for a route in one direction. The route id is used
/// both as the search input and as the line id.
pub fn status_url(route: &RouteId, direction: Direction) -> String {
    let r = route.as_str();
    format!("{STATUS_BASE_URL}?input={r}&lineIds={r}&direction={direction}")
}

/// Full tab plan for one route.
///
/// `reference_day` picks the weekend: the upcoming Saturday/Sunday pair as
/// computed by [`weekend_bounds`].
pub fn open_plan_for_route(
    route: &RouteId,
    window: &ScheduleWindow,
    reference_day: NaiveDate,
) -> Vec<TabPlanEntry> {
    let day_count = window.day_count();
    let mut plan = Vec::with_capacity(2 * day_count + 4);

    for direction in Direction::ALL {
        plan.push(TabPlanEntry {
            label: format!("Now — {direction}"),
            url: status_url(route, direction),
            delay_ms: direction.stagger_ms(),
        });
    }

    let future = urlencoding::encode(FUTURE_DATE_SELECTOR);
    for (i, day) in window.days().enumerate() {
        let bounds = day_bounds(day);
        let delay = BASE_DELAY_MS + i as u64 * DAY_SPACING_MS;
        let day_label = day.format("%Y-%m-%d");
        for direction in Direction::ALL {
            plan.push(TabPlanEntry {
                label: format!("{day_label} — {direction}"),
                url: format!(
                    "{}&dateTypeSelect={}&startDate={}&endDate={}",
                    status_url(route, direction),
                    future,
                    bounds.start,
                    bounds.end
                ),
                delay_ms: delay + direction.stagger_ms(),
            });
        }
    }

    let weekend = weekend_bounds(reference_day);
    let this_weekend = urlencoding::encode(THIS_WEEKEND_SELECTOR);
    let weekend_delay = BASE_DELAY_MS + day_count as u64 * DAY_SPACING_MS + WEEKEND_GAP_MS;
    for direction in Direction::ALL {
        plan.push(TabPlanEntry {
            label: format!("This weekend — {direction}"),
            url: format!(
                "{}&startDate={}&endDate={}&dateTypeSelect={}",
                status_url(route, direction),
                weekend.start,
                weekend.end,
                this_weekend
            ),
            delay_ms: weekend_delay + direction.stagger_ms(),
        });
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn route(id: &str) -> RouteId {
        RouteId::new(id).unwrap()
    }

    fn june_window() -> ScheduleWindow {
        ScheduleWindow::new(date(2024, 6, 1), date(2024, 6, 3)).unwrap()
    }

    #[test]
    fn test_plan_example_three_days() {
        let plan = open_plan_for_route(&route("24"), &june_window(), date(2024, 6, 1));
        assert_eq!(plan.len(), 10);

        assert_eq!(plan[0].label, "Now — inbound");
        assert_eq!(plan[0].delay_ms, 0);
        assert_eq!(
            plan[0].url,
            "https://tfl.gov.uk/bus/status/?input=24&lineIds=24&direction=inbound"
        );
        assert_eq!(plan[1].label, "Now — outbound");
        assert_eq!(plan[1].delay_ms, 60);

        assert_eq!(plan[2].label, "2024-06-01 — inbound");
        assert_eq!(plan[2].delay_ms, 200);
        assert_eq!(
            plan[2].url,
            "https://tfl.gov.uk/bus/status/?input=24&lineIds=24&direction=inbound\
             &dateTypeSelect=Future%20date\
             &startDate=2024-06-01T00%3A00%3A00&endDate=2024-06-01T23%3A59%3A59"
        );
        assert_eq!(plan[3].label, "2024-06-01 — outbound");
        assert_eq!(plan[3].delay_ms, 260);
        assert_eq!(plan[4].label, "2024-06-02 — inbound");
        assert_eq!(plan[4].delay_ms, 550);

        assert_eq!(plan[8].label, "This weekend — inbound");
        assert_eq!(plan[8].delay_ms, 200 + 3 * 350 + 200);
        assert_eq!(
            plan[8].url,
            "https://tfl.gov.uk/bus/status/?input=24&lineIds=24&direction=inbound\
             &startDate=2024-06-01T00%3A00%3A00&endDate=2024-06-02T23%3A59%3A59\
             &dateTypeSelect=This%20weekend"
        );
        assert_eq!(plan[9].label, "This weekend — outbound");
        assert_eq!(plan[9].delay_ms, 200 + 3 * 350 + 200 + 60);
        assert!(plan[9].url.contains("direction=outbound"));
    }

    #[test]
    fn test_plan_length_matches_window() {
        for days_ahead in [0u32, 1, 5, 12, 30] {
            let window = ScheduleWindow::rolling(date(2024, 2, 27), days_ahead);
            let plan = open_plan_for_route(&route("N29"), &window, date(2024, 2, 27));
            assert_eq!(plan.len(), 2 + 2 * window.day_count() + 2);
        }
    }

    #[test]
    fn test_plan_delays_monotonic_with_even_day_spacing() {
        let window = ScheduleWindow::rolling(date(2024, 6, 5), 12);
        let plan = open_plan_for_route(&route("SL10"), &window, date(2024, 6, 5));

        for pair in plan.windows(2) {
            assert!(pair[0].delay_ms <= pair[1].delay_ms, "{pair:?}");
        }

        let day_inbound: Vec<u64> = plan[2..plan.len() - 2]
            .iter()
            .step_by(2)
            .map(|e| e.delay_ms)
            .collect();
        assert_eq!(day_inbound.len(), window.day_count());
        for pair in day_inbound.windows(2) {
            assert_eq!(pair[1] - pair[0], DAY_SPACING_MS);
        }
    }

    #[test]
    fn test_plan_is_deterministic() {
        let window = ScheduleWindow::rolling(date(2024, 6, 2), 12);
        let a = open_plan_for_route(&route("24"), &window, date(2024, 6, 2));
        let b = open_plan_for_route(&route("24"), &window, date(2024, 6, 2));
        assert_eq!(a, b);
    }

    #[test]
    fn test_plan_weekend_from_sunday_reference() {
        let window = ScheduleWindow::rolling(date(2024, 6, 2), 0);
        let plan = open_plan_for_route(&route("24"), &window, date(2024, 6, 2));
        let weekend = &plan[plan.len() - 2];
        assert!(weekend.url.contains("startDate=2024-06-08T00%3A00%3A00"));
        assert!(weekend.url.contains("endDate=2024-06-09T23%3A59%3A59"));
    }

    #[test]
    fn test_route_used_verbatim_in_url() {
        let url = status_url(&route("SL10"), Direction::Outbound);
        assert_eq!(
            url,
            "https://tfl.gov.uk/bus/status/?input=SL10&lineIds=SL10&direction=outbound"
        );
    }
}
