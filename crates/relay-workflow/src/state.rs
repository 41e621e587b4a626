//! Explicit workflow states carried in the correlation context.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Named states an issue workflow instance moves through.
pub enum WorkflowState {
    /// A title is being generated for a form that is already open.
    Drafting,
    /// The form was submitted and its fields validated.
    Requested,
    /// The creation command was handed to the executor.
    Submitted,
    /// The executor reported a created issue and the announcement was posted.
    Created,
    /// No follow-up is in flight.
    Idle,
    AssignPending,
    SanitizePending,
    Closed,
}

impl WorkflowState {
    pub const ALL: [WorkflowState; 8] = [
        Self::Drafting,
        Self::Requested,
        Self::Submitted,
        Self::Created,
        Self::Idle,
        Self::AssignPending,
        Self::SanitizePending,
        Self::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drafting => "drafting",
            Self::Requested => "requested",
            Self::Submitted => "submitted",
            Self::Created => "created",
            Self::Idle => "idle",
            Self::AssignPending => "assign_pending",
            Self::SanitizePending => "sanitize_pending",
            Self::Closed => "closed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == raw.trim())
    }

    /// Returns true when the workflow has an announcement message in chat.
    pub fn is_announced(self) -> bool {
        matches!(
            self,
            Self::Created | Self::Idle | Self::AssignPending | Self::SanitizePending | Self::Closed
        )
    }

    pub fn can_transition_to(self, next: WorkflowState) -> bool {
        use WorkflowState::*;
        matches!(
            (self, next),
            (Drafting, Requested)
                | (Requested, Submitted)
                | (Submitted, Created)
                | (Created, AssignPending | SanitizePending | Idle | Closed)
                | (Idle, AssignPending | SanitizePending | Closed)
                | (AssignPending, Idle | Closed)
                | (SanitizePending, Idle | Closed)
        )
    }

    pub fn transition_to(self, next: WorkflowState) -> Result<WorkflowState, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal workflow transition {from} -> {to}")]
/// Raised when a step tries to move a workflow along an edge that does not exist.
pub struct TransitionError {
    pub from: WorkflowState,
    pub to: WorkflowState,
}

#[cfg(test)]
mod tests {
    use super::WorkflowState;

    #[test]
    fn unit_workflow_state_parse_round_trips_every_label() {
        for state in WorkflowState::ALL {
            assert_eq!(WorkflowState::parse(state.as_str()), Some(state));
        }
        assert_eq!(WorkflowState::parse("archived"), None);
    }

    #[test]
    fn functional_created_state_fans_out_to_follow_ups() {
        let created = WorkflowState::Created;
        assert!(created.can_transition_to(WorkflowState::AssignPending));
        assert!(created.can_transition_to(WorkflowState::SanitizePending));
        assert!(created.can_transition_to(WorkflowState::Idle));
        assert!(created.can_transition_to(WorkflowState::Closed));
        assert!(!created.can_transition_to(WorkflowState::Submitted));
    }

    #[test]
    fn regression_closed_state_is_terminal() {
        for next in WorkflowState::ALL {
            assert!(WorkflowState::Closed.transition_to(next).is_err());
        }
    }

    #[test]
    fn unit_transition_error_names_both_states() {
        let error = WorkflowState::Requested
            .transition_to(WorkflowState::Closed)
            .expect_err("requested cannot close");
        assert_eq!(
            error.to_string(),
            "illegal workflow transition requested -> closed"
        );
    }
}
