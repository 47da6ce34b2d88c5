use chrono::{DateTime, Utc};

const WINDOW_SECONDS: i64 = 60;

/// Fixed one-minute admission window for one `(tenant, provider)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
    /// Start of the wall-clock minute the counter belongs to.
    pub window_start: DateTime<Utc>,
    /// Admissions granted inside the window.
    pub requests_in_window: u32,
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request admitted and counted.
    Allowed {
        /// Admissions left in the current window.
        remaining: u32,
    },
    /// Ceiling reached; nothing was counted.
    Limited {
        /// Seconds until the next window opens.
        retry_after_seconds: u32,
    },
}

impl RateLimitDecision {
    /// Returns whether the request was admitted.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

impl RateLimitWindow {
    /// Truncates a timestamp to the start of its wall-clock minute.
    #[must_use]
    pub fn minute_start(now: DateTime<Utc>) -> DateTime<Utc> {
        let seconds = now.timestamp();
        let floored = seconds - seconds.rem_euclid(WINDOW_SECONDS);
        DateTime::<Utc>::from_timestamp(floored, 0).unwrap_or(now)
    }

    /// Seconds from `now` until the next wall-clock minute starts, at least one.
    #[must_use]
    pub fn retry_after_seconds(now: DateTime<Utc>) -> u32 {
        let elapsed = (now - Self::minute_start(now))
            .num_seconds()
            .clamp(0, WINDOW_SECONDS - 1);
        u32::try_from(WINDOW_SECONDS - elapsed).unwrap_or(1)
    }

    /// Applies one admission check against the stored window.
    ///
    /// A stored window from another minute is reset before comparing. The counter is only
    /// incremented when the request is admitted, so it never exceeds `limit_per_minute`.
    #[must_use]
    pub fn admit(
        current: Option<Self>,
        now: DateTime<Utc>,
        limit_per_minute: u32,
    ) -> (Self, RateLimitDecision) {
        let minute = Self::minute_start(now);
        let window = match current {
            Some(window) if window.window_start == minute => window,
            _ => Self {
                window_start: minute,
                requests_in_window: 0,
            },
        };

        if window.requests_in_window < limit_per_minute {
            let requests_in_window = window.requests_in_window + 1;
            (
                Self {
                    window_start: minute,
                    requests_in_window,
                },
                RateLimitDecision::Allowed {
                    remaining: limit_per_minute - requests_in_window,
                },
            )
        } else {
            (
                window,
                RateLimitDecision::Limited {
                    retry_after_seconds: Self::retry_after_seconds(now),
                },
            )
        }
    }
}
