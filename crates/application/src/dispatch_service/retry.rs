use std::time::Duration;

use flowgate_core::{AppError, AppResult};

/// Backoff schedule for provider calls that fail at the network level.
///
/// One delay per retry; `[250ms, 750ms]` allows three attempts in total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    backoff: Vec<Duration>,
}

impl RetryPolicy {
    /// Creates a policy from explicit retry delays.
    #[must_use]
    pub fn new(backoff: Vec<Duration>) -> Self {
        Self { backoff }
    }

    /// Parses a comma-separated list of millisecond delays, e.g. `250,750`.
    ///
    /// An empty string disables retries.
    pub fn parse_millis(value: &str) -> AppResult<Self> {
        let backoff = value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.parse::<u64>().map(Duration::from_millis).map_err(|error| {
                    AppError::Validation(format!("invalid retry delay '{item}': {error}"))
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self::new(backoff))
    }

    /// Returns the configured retry delays.
    #[must_use]
    pub fn backoff(&self) -> &[Duration] {
        &self.backoff
    }

    /// Returns the total number of attempts, including the first call.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        u32::try_from(self.backoff.len())
            .unwrap_or(u32::MAX - 1)
            .saturating_add(1)
    }

    /// Returns the delay before the next attempt, or `None` once attempts are exhausted.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        let index = usize::try_from(attempt.checked_sub(1)?).ok()?;
        self.backoff.get(index).copied()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(vec![Duration::from_millis(250), Duration::from_millis(750)])
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use flowgate_core::AppError;

    use super::RetryPolicy;

    #[test]
    fn default_allows_three_attempts() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_after(1), Some(Duration::from_millis(250)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_millis(750)));
        assert_eq!(policy.delay_after(3), None);
    }

    #[test]
    fn parse_millis_accepts_list_and_empty_value() {
        let parsed = RetryPolicy::parse_millis(" 100, 200 ,400");
        assert!(matches!(parsed, Ok(policy) if policy.max_attempts() == 4));

        let disabled = RetryPolicy::parse_millis("");
        assert!(matches!(disabled, Ok(policy) if policy.max_attempts() == 1));
    }

    #[test]
    fn parse_millis_rejects_garbage() {
        assert!(matches!(
            RetryPolicy::parse_millis("250,soon"),
            Err(AppError::Validation(_))
        ));
    }
}
