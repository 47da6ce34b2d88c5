use std::fmt::{Display, Formatter};

use flowgate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Stable key of an external automation provider adapter, e.g. `webhook_workflow`.
///
/// Adapters are registered at process start; the key is also the rate limit partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderAdapter(String);

impl ProviderAdapter {
    /// Key of the webhook-triggered workflow engine adapter.
    pub const WEBHOOK_WORKFLOW: &'static str = "webhook_workflow";

    /// Creates a validated adapter key.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let is_valid = !value.is_empty()
            && value.chars().all(|character| {
                character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
            });

        if !is_valid {
            return Err(AppError::Validation(format!(
                "provider adapter '{value}' must use lowercase letters, digits or underscores"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the webhook workflow adapter key.
    #[must_use]
    pub fn webhook_workflow() -> Self {
        Self(Self::WEBHOOK_WORKFLOW.to_owned())
    }

    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for ProviderAdapter {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl TryFrom<String> for ProviderAdapter {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProviderAdapter> for String {
    fn from(value: ProviderAdapter) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::ProviderAdapter;

    #[test]
    fn adapter_key_rejects_uppercase_and_spaces() {
        assert!(ProviderAdapter::new("Webhook Workflow").is_err());
        assert!(ProviderAdapter::new("").is_err());
    }

    #[test]
    fn adapter_deserializes_through_validation() {
        let parsed = serde_json::from_str::<ProviderAdapter>("\"webhook_workflow\"");
        assert!(matches!(parsed, Ok(adapter) if adapter == ProviderAdapter::webhook_workflow()));

        let rejected = serde_json::from_str::<ProviderAdapter>("\"bad key\"");
        assert!(rejected.is_err());
    }
}
