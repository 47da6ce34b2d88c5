use flowgate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Lifecycle status of one integration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationRunStatus {
    /// Run row exists; the provider has not answered yet.
    Started,
    /// Provider accepted the request and will call back.
    InProgress,
    /// Provider completed the action.
    Succeeded,
    /// Provider rejected the action or could not be reached.
    Failed,
}

impl IntegrationRunStatus {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::InProgress => "in_progress",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "started" => Ok(Self::Started),
            "in_progress" => Ok(Self::InProgress),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(AppError::Validation(format!(
                "unknown integration run status '{value}'"
            ))),
        }
    }

    /// Returns whether no further event may change the run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Applies one lifecycle event.
    pub fn apply(self, transition: RunTransition) -> Result<Self, RunTransitionRejection> {
        if self.is_terminal() {
            return Err(RunTransitionRejection::AlreadyTerminal(self));
        }

        if transition.source_statuses().contains(&self) {
            Ok(transition.target_status())
        } else {
            Err(RunTransitionRejection::NotApplicable {
                from: self,
                transition,
            })
        }
    }
}

/// Lifecycle event produced by the dispatcher or the callback reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunTransition {
    /// Provider answered 202.
    ProviderAccepted,
    /// Provider answered 2xx other than 202.
    ProviderSucceeded,
    /// Provider answered 4xx/5xx.
    ProviderRejected,
    /// Every network-level attempt failed.
    RetriesExhausted,
    /// No endpoint or adapter was available, so no call was made.
    DispatchAborted,
    /// Provider callback reported success.
    CallbackSucceeded,
    /// Provider callback reported failure.
    CallbackFailed,
}

impl RunTransition {
    /// Returns the statuses from which this event may be applied.
    ///
    /// Callbacks are accepted while the run is still `started` because a fast provider can
    /// finish before the dispatcher records its 202.
    #[must_use]
    pub fn source_statuses(&self) -> &'static [IntegrationRunStatus] {
        match self {
            Self::ProviderAccepted
            | Self::ProviderSucceeded
            | Self::ProviderRejected
            | Self::RetriesExhausted
            | Self::DispatchAborted => &[IntegrationRunStatus::Started],
            Self::CallbackSucceeded | Self::CallbackFailed => &[
                IntegrationRunStatus::Started,
                IntegrationRunStatus::InProgress,
            ],
        }
    }

    /// Returns the status written when the event applies.
    #[must_use]
    pub fn target_status(&self) -> IntegrationRunStatus {
        match self {
            Self::ProviderAccepted => IntegrationRunStatus::InProgress,
            Self::ProviderSucceeded | Self::CallbackSucceeded => IntegrationRunStatus::Succeeded,
            Self::ProviderRejected
            | Self::RetriesExhausted
            | Self::DispatchAborted
            | Self::CallbackFailed => IntegrationRunStatus::Failed,
        }
    }

    /// Maps a callback status string (`succeeded`/`failed`) to its event.
    pub fn from_callback_status(value: &str) -> AppResult<Self> {
        match value {
            "succeeded" => Ok(Self::CallbackSucceeded),
            "failed" => Ok(Self::CallbackFailed),
            _ => Err(AppError::Validation(format!(
                "callback status must be 'succeeded' or 'failed', got '{value}'"
            ))),
        }
    }
}

/// Reason a lifecycle event was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTransitionRejection {
    /// Run already reached a terminal status.
    AlreadyTerminal(IntegrationRunStatus),
    /// Event is not valid from the current non-terminal status.
    NotApplicable {
        /// Current status.
        from: IntegrationRunStatus,
        /// Rejected event.
        transition: RunTransition,
    },
}

#[cfg(test)]
mod tests {
    use super::{IntegrationRunStatus, RunTransition, RunTransitionRejection};

    const ALL_TRANSITIONS: [RunTransition; 7] = [
        RunTransition::ProviderAccepted,
        RunTransition::ProviderSucceeded,
        RunTransition::ProviderRejected,
        RunTransition::RetriesExhausted,
        RunTransition::DispatchAborted,
        RunTransition::CallbackSucceeded,
        RunTransition::CallbackFailed,
    ];

    #[test]
    fn synchronous_outcomes_leave_started() {
        let started = IntegrationRunStatus::Started;
        assert_eq!(
            started.apply(RunTransition::ProviderSucceeded),
            Ok(IntegrationRunStatus::Succeeded)
        );
        assert_eq!(
            started.apply(RunTransition::ProviderRejected),
            Ok(IntegrationRunStatus::Failed)
        );
        assert_eq!(
            started.apply(RunTransition::RetriesExhausted),
            Ok(IntegrationRunStatus::Failed)
        );
        assert_eq!(
            started.apply(RunTransition::ProviderAccepted),
            Ok(IntegrationRunStatus::InProgress)
        );
    }

    #[test]
    fn in_progress_only_resolves_through_callbacks() {
        let in_progress = IntegrationRunStatus::InProgress;
        assert_eq!(
            in_progress.apply(RunTransition::CallbackSucceeded),
            Ok(IntegrationRunStatus::Succeeded)
        );
        assert_eq!(
            in_progress.apply(RunTransition::CallbackFailed),
            Ok(IntegrationRunStatus::Failed)
        );
        assert!(matches!(
            in_progress.apply(RunTransition::ProviderRejected),
            Err(RunTransitionRejection::NotApplicable { .. })
        ));
    }

    #[test]
    fn terminal_statuses_reject_every_event() {
        for terminal in [IntegrationRunStatus::Succeeded, IntegrationRunStatus::Failed] {
            for transition in ALL_TRANSITIONS {
                assert_eq!(
                    terminal.apply(transition),
                    Err(RunTransitionRejection::AlreadyTerminal(terminal))
                );
            }
        }
    }

    #[test]
    fn storage_values_parse_back() {
        for status in [
            IntegrationRunStatus::Started,
            IntegrationRunStatus::InProgress,
            IntegrationRunStatus::Succeeded,
            IntegrationRunStatus::Failed,
        ] {
            assert!(matches!(
                IntegrationRunStatus::parse(status.as_str()),
                Ok(parsed) if parsed == status
            ));
        }
        assert!(IntegrationRunStatus::parse("cancelled").is_err());
    }

    #[test]
    fn callback_status_vocabulary_is_closed() {
        assert_eq!(
            RunTransition::from_callback_status("succeeded").ok(),
            Some(RunTransition::CallbackSucceeded)
        );
        assert!(RunTransition::from_callback_status("in_progress").is_err());
    }
}
