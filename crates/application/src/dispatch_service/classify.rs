use flowgate_domain::RunTransition;
use serde_json::Value;

use crate::integration_ports::{ProviderCallResult, RunUpdate};

/// Provider response sorted into ledger consequences.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum AttemptClassification {
    Accepted { status: u16 },
    Succeeded { status: u16, payload: Value },
    Rejected { status: u16, message: String },
    Unreachable { message: String },
}

impl AttemptClassification {
    /// `202` is asynchronous acceptance, any other 2xx completes the run, everything else
    /// the provider answered with is a rejection. Only network failures are retryable.
    pub(super) fn from_call_result(result: ProviderCallResult) -> Self {
        match result {
            ProviderCallResult::Unreachable { message } => Self::Unreachable { message },
            ProviderCallResult::Responded { status: 202, .. } => Self::Accepted { status: 202 },
            ProviderCallResult::Responded { status, body } if (200..300).contains(&status) => {
                Self::Succeeded {
                    status,
                    payload: parse_payload(body.as_str()),
                }
            }
            ProviderCallResult::Responded { status, body } => {
                let message = if body.trim().is_empty() {
                    format!("provider responded with status {status}")
                } else {
                    body
                };
                Self::Rejected { status, message }
            }
        }
    }

    /// Builds the ledger update for a non-retryable classification.
    pub(super) fn into_update(self, attempts: u32) -> RunUpdate {
        let mut update = match self {
            Self::Accepted { status } => {
                let mut update = RunUpdate::new(RunTransition::ProviderAccepted);
                update.http_status = Some(status);
                update
            }
            Self::Succeeded { status, payload } => {
                let mut update = RunUpdate::new(RunTransition::ProviderSucceeded);
                update.http_status = Some(status);
                update.response_payload = Some(payload);
                update
            }
            Self::Rejected { status, message } => {
                let mut update = RunUpdate::new(RunTransition::ProviderRejected);
                update.http_status = Some(status);
                update.error_message = Some(message);
                update
            }
            Self::Unreachable { message } => {
                let mut update = RunUpdate::new(RunTransition::RetriesExhausted);
                update.error_message = Some(message);
                update
            }
        };
        update.attempts = Some(attempts);
        update
    }
}

/// Empty bodies become `null`; bodies that are not JSON are kept as a string.
fn parse_payload(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }

    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_owned()))
}
