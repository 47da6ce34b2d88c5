/// Admission ceiling applied to every `(tenant, provider)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Maximum admissions per wall-clock minute.
    pub limit_per_minute: u32,
}

impl RateLimitPolicy {
    /// Default ceiling when nothing is configured.
    pub const DEFAULT_LIMIT_PER_MINUTE: u32 = 60;

    /// Creates a policy with the given ceiling.
    #[must_use]
    pub fn new(limit_per_minute: u32) -> Self {
        Self { limit_per_minute }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT_PER_MINUTE)
    }
}
