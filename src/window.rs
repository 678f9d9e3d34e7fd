// Schedule window and date bounds
// Civil-calendar helpers for the rolling day window and the upcoming weekend

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone};

/// Default window length in days after today (today is included on top).
pub const DEFAULT_WINDOW_DAYS: u32 = 12;
/// Largest accepted window length.
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Today's civil date in the zone `now` was captured in.
pub fn london_today<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDate {
    now.date_naive()
}

// ---------------------------------------------------------------------------
// ScheduleWindow
// ---------------------------------------------------------------------------

/// Inclusive range of calendar days that get date-scoped status links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl ScheduleWindow {
    /// Window from `start` to `end`, both inclusive. Returns `None` if
    /// `end` is before `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// `[today, today + days_ahead]`.
    pub fn rolling(today: NaiveDate, days_ahead: u32) -> Self {
        let end = today
            .checked_add_days(Days::new(days_ahead as u64))
            .unwrap_or(NaiveDate::MAX);
        Self { start: today, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the window, counting both ends.
    pub fn day_count(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Every day of the window in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take(self.day_count())
    }

    /// `"YYYY-MM-DD → YYYY-MM-DD"`, shown on the index page and stored in
    /// the success marker.
    pub fn range_hint(&self) -> String {
        format!("{} → {}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }
}

// ---------------------------------------------------------------------------
// Encoded bounds
// ---------------------------------------------------------------------------

/// Start/end timestamps, percent-encoded for a query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBounds {
    pub start: String,
    pub end: String,
}

fn encode_timestamp(day: NaiveDate, time: &str) -> String {
    let raw = format!("{}T{}", day.format("%Y-%m-%d"), time);
    urlencoding::encode(&raw).into_owned()
}

/// `day 00:00:00` to `day 23:59:59`, local wall clock.
pub fn day_bounds(day: NaiveDate) -> EncodedBounds {
    EncodedBounds {
        start: encode_timestamp(day, "00:00:00"),
        end: encode_timestamp(day, "23:59:59"),
    }
}

/// Saturday on or after `day`. On a Sunday this is six days ahead, never
/// the Saturday that just passed.
pub fn upcoming_saturday(day: NaiveDate) -> NaiveDate {
    let weekday = day.weekday().num_days_from_monday();
    let offset = (5 + 7 - weekday) % 7;
    day.checked_add_days(Days::new(offset as u64))
        .unwrap_or(day)
}

/// Upcoming Saturday 00:00:00 to the following Sunday 23:59:59.
pub fn weekend_bounds(reference_day: NaiveDate) -> EncodedBounds {
    let saturday = upcoming_saturday(reference_day);
    let sunday = saturday.succ_opt().unwrap_or(saturday);
    EncodedBounds {
        start: day_bounds(saturday).start,
        end: day_bounds(sunday).end,
    }
}
