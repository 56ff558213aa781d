use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

#[derive(Debug)]
struct UsageState {
    total_requests: u64,
    day: NaiveDate,
    daily_users: HashSet<String>,
}

impl UsageState {
    fn roll_over(&mut self, today: NaiveDate) {
        if today != self.day {
            debug!(previous = %self.day, %today, "Resetting daily users");
            self.day = today;
            self.daily_users.clear();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub total_requests: u64,
    pub daily_users: usize,
    pub day: NaiveDate,
}

/// Request counters owned by the service. The unique-user set resets when the
/// UTC date changes.
#[derive(Debug)]
pub struct UsageStats {
    state: Mutex<UsageState>,
}

impl UsageStats {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(UsageState {
                total_requests: 0,
                day: now.date_naive(),
                daily_users: HashSet::new(),
            }),
        }
    }

    pub fn record(&self, user: &str) {
        self.record_at(user, Utc::now());
    }

    fn record_at(&self, user: &str, now: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.roll_over(now.date_naive());
        state.total_requests += 1;
        state.daily_users.insert(user.to_string());
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        self.snapshot_at(Utc::now())
    }

    fn snapshot_at(&self, now: DateTime<Utc>) -> UsageSnapshot {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.roll_over(now.date_naive());
        UsageSnapshot {
            total_requests: state.total_requests,
            daily_users: state.daily_users.len(),
            day: state.day,
        }
    }
}

impl Default for UsageStats {
    fn default() -> Self {
        Self::new()
    }
}
