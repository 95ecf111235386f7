//! Unit lifecycle transition rules.

use thiserror::Error;

use crate::executor::types::UnitStatus;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: UnitStatus, to: UnitStatus },
    #[error("Cannot transition from terminal state {state:?}")]
    FromTerminalState { state: UnitStatus },
}

pub struct StateTransition;

impl StateTransition {
    pub fn validate(from: UnitStatus, to: UnitStatus) -> Result<(), TransitionError> {
        if from.is_terminal() {
            return Err(TransitionError::FromTerminalState { state: from });
        }

        let is_valid = match (from, to) {
            (UnitStatus::Pending, UnitStatus::Building) => true,
            (UnitStatus::Building, UnitStatus::Testing) => true,
            (UnitStatus::Testing, UnitStatus::QualityCheck) => true,
            (UnitStatus::QualityCheck, UnitStatus::Publishing) => true,
            (UnitStatus::QualityCheck, UnitStatus::Remediating) => true,
            (UnitStatus::Remediating, UnitStatus::QualityCheck) => true,
            (UnitStatus::Publishing, UnitStatus::Done) => true,

            // Failure from any phase, cancellation on abort.
            (_, UnitStatus::Failed) | (_, UnitStatus::Cancelled) => true,

            _ => false,
        };

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }

    /// The next phase on the happy path.
    pub fn next_phase(current: UnitStatus) -> Option<UnitStatus> {
        match current {
            UnitStatus::Pending => Some(UnitStatus::Building),
            UnitStatus::Building => Some(UnitStatus::Testing),
            UnitStatus::Testing => Some(UnitStatus::QualityCheck),
            UnitStatus::QualityCheck => Some(UnitStatus::Publishing),
            UnitStatus::Remediating => Some(UnitStatus::QualityCheck),
            UnitStatus::Publishing => Some(UnitStatus::Done),
            UnitStatus::Done | UnitStatus::Failed | UnitStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(status: UnitStatus) -> bool {
        status.is_terminal()
    }

    pub fn phase_description(status: UnitStatus) -> &'static str {
        match status {
            UnitStatus::Pending => "waiting for dispatch",
            UnitStatus::Building => "building",
            UnitStatus::Testing => "running tests",
            UnitStatus::QualityCheck => "checking quality gate",
            UnitStatus::Remediating => "remediating quality failures",
            UnitStatus::Publishing => "publishing",
            UnitStatus::Done => "done",
            UnitStatus::Failed => "failed",
            UnitStatus::Cancelled => "cancelled",
        }
    }
}
