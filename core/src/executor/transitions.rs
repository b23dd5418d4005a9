//! Workflow phase transitions.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Initialized,
    Executing,
    Finalizing,
    Completed,
    Cancelled,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: RunPhase, to: RunPhase },
    #[error("Cannot transition from terminal state {state:?}")]
    FromTerminalState { state: RunPhase },
}

pub struct StateTransition;

impl StateTransition {
    pub fn validate(from: RunPhase, to: RunPhase) -> Result<(), TransitionError> {
        if Self::is_terminal(from) {
            return Err(TransitionError::FromTerminalState { state: from });
        }

        let is_valid = matches!(
            (from, to),
            (RunPhase::Initialized, RunPhase::Executing)
                | (RunPhase::Executing, RunPhase::Finalizing)
                | (RunPhase::Finalizing, RunPhase::Completed)
                // Cancellation can land before or during execution.
                | (RunPhase::Initialized, RunPhase::Cancelled)
                | (RunPhase::Executing, RunPhase::Cancelled)
        );

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }

    pub fn next_phase(current: RunPhase) -> Option<RunPhase> {
        match current {
            RunPhase::Initialized => Some(RunPhase::Executing),
            RunPhase::Executing => Some(RunPhase::Finalizing),
            RunPhase::Finalizing => Some(RunPhase::Completed),
            RunPhase::Completed | RunPhase::Cancelled => None,
        }
    }

    pub fn is_terminal(phase: RunPhase) -> bool {
        matches!(phase, RunPhase::Completed | RunPhase::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(StateTransition::validate(RunPhase::Initialized, RunPhase::Executing).is_ok());
        assert!(StateTransition::validate(RunPhase::Executing, RunPhase::Finalizing).is_ok());
        assert!(StateTransition::validate(RunPhase::Finalizing, RunPhase::Completed).is_ok());
        assert!(StateTransition::validate(RunPhase::Executing, RunPhase::Cancelled).is_ok());
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(StateTransition::validate(RunPhase::Initialized, RunPhase::Finalizing).is_err());
        assert!(StateTransition::validate(RunPhase::Finalizing, RunPhase::Cancelled).is_err());
        assert_eq!(
            StateTransition::validate(RunPhase::Completed, RunPhase::Executing),
            Err(TransitionError::FromTerminalState {
                state: RunPhase::Completed
            })
        );
    }

    #[test]
    fn test_next_phase() {
        assert_eq!(
            StateTransition::next_phase(RunPhase::Initialized),
            Some(RunPhase::Executing)
        );
        assert_eq!(StateTransition::next_phase(RunPhase::Completed), None);
        assert!(StateTransition::is_terminal(RunPhase::Cancelled));
    }
}
