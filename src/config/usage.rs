//! Call counters with a lazy monthly reset.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Monthly and all-time successful call counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageCounters {
    /// Calls recorded in `last_month`.
    pub monthly: u64,
    /// Calls recorded since the counters were created.
    pub total: u64,
    /// Month key (`YYYY-MM`) the monthly count belongs to.
    pub last_month: String,
}

/// Formats the month key for a date.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Month key for the local calendar date.
pub fn current_month() -> String {
    month_key(Local::now().date_naive())
}

impl UsageCounters {
    /// Records one call made in `month`.
    ///
    /// A stale month key zeroes the monthly count before incrementing.
    pub fn record(&mut self, month: &str) {
        if self.last_month != month {
            self.monthly = 0;
            self.last_month = month.to_string();
        }
        self.monthly += 1;
        self.total += 1;
    }

    /// Returns the counters as seen from `month` without mutating them.
    #[must_use]
    pub fn view_for(&self, month: &str) -> Self {
        if self.last_month == month {
            return self.clone();
        }
        Self {
            monthly: 0,
            total: self.total,
            last_month: month.to_string(),
        }
    }
}
