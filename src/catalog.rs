//! Process catalog: the static table mapping each process type to its
//! ordered lifecycle steps and transition-handler kinds.
//!
//! The catalog is constant per process type and never mutated at runtime;
//! the state machine reads it to compute paths and transitions.

use serde::{Deserialize, Serialize};

use crate::record::RecordState;

/// Configuration enum selecting which lifecycle steps a record follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    /// Validate and close in a single externally-visible transition.
    ClosedDirectly,
    /// Validation straight into answering.
    Response,
    /// Validation, resolution, close without an answer step.
    Resolution,
    ResolutionResponse,
    PlanningResolution,
    PlanningResolutionResponse,
    ExternalProcessing,
    ExternalProcessingResponse,
    /// External handoff with an explicit returned-to-internal step.
    RecordExternalProcessing,
    /// Starts already handed off; no validation step.
    DirectExternalProcessing,
}

impl ProcessType {
    /// All process types, in catalog order.
    pub const ALL: [ProcessType; 10] = [
        ProcessType::ClosedDirectly,
        ProcessType::Response,
        ProcessType::Resolution,
        ProcessType::ResolutionResponse,
        ProcessType::PlanningResolution,
        ProcessType::PlanningResolutionResponse,
        ProcessType::ExternalProcessing,
        ProcessType::ExternalProcessingResponse,
        ProcessType::RecordExternalProcessing,
        ProcessType::DirectExternalProcessing,
    ];

    /// The state a freshly created record of this type starts in.
    pub fn initial_state(&self) -> RecordState {
        self.ideal_path()[0].state
    }

    /// The full ordered step list for this process type.
    ///
    /// Non-empty, strictly ordered, no duplicate steps; the last step is
    /// always the closed state.
    pub fn ideal_path(&self) -> &'static [Step] {
        use RecordState::*;
        match self {
            ProcessType::ClosedDirectly => {
                const STEPS: &[Step] = &[
                    Step::new("validate", PendingValidate),
                    Step::new("closed", Closed),
                ];
                STEPS
            }
            ProcessType::Response => {
                const STEPS: &[Step] = &[
                    Step::new("validate", PendingValidate),
                    Step::new("answer", PendingAnswer),
                    Step::new("closed", Closed),
                ];
                STEPS
            }
            ProcessType::Resolution => {
                const STEPS: &[Step] = &[
                    Step::new("validate", PendingValidate),
                    Step::new("resolute", InResolution),
                    Step::new("closed", Closed),
                ];
                STEPS
            }
            ProcessType::ResolutionResponse => {
                const STEPS: &[Step] = &[
                    Step::new("validate", PendingValidate),
                    Step::new("resolute", InResolution),
                    Step::new("answer", PendingAnswer),
                    Step::new("closed", Closed),
                ];
                STEPS
            }
            ProcessType::PlanningResolution => {
                const STEPS: &[Step] = &[
                    Step::new("validate", PendingValidate),
                    Step::new("plan", Planning),
                    Step::new("resolute", InResolution),
                    Step::new("closed", Closed),
                ];
                STEPS
            }
            ProcessType::PlanningResolutionResponse => {
                const STEPS: &[Step] = &[
                    Step::new("validate", PendingValidate),
                    Step::new("plan", Planning),
                    Step::new("resolute", InResolution),
                    Step::new("answer", PendingAnswer),
                    Step::new("closed", Closed),
                ];
                STEPS
            }
            ProcessType::ExternalProcessing => {
                const STEPS: &[Step] = &[
                    Step::new("validate", PendingValidate),
                    Step::new("external", ExternalProcessing),
                    Step::new("closed", Closed),
                ];
                STEPS
            }
            ProcessType::ExternalProcessingResponse => {
                const STEPS: &[Step] = &[
                    Step::new("validate", PendingValidate),
                    Step::new("external", ExternalProcessing),
                    Step::new("answer", PendingAnswer),
                    Step::new("closed", Closed),
                ];
                STEPS
            }
            ProcessType::RecordExternalProcessing => {
                const STEPS: &[Step] = &[
                    Step::new("validate", PendingValidate),
                    Step::new("external", ExternalProcessing),
                    Step::new("external_return", ExternalReturned),
                    Step::new("closed", Closed),
                ];
                STEPS
            }
            ProcessType::DirectExternalProcessing => {
                const STEPS: &[Step] = &[
                    Step::new("external", ExternalProcessing),
                    Step::new("closed", Closed),
                ];
                STEPS
            }
        }
    }

    /// True when the path contains a pending-answer step.
    pub fn answers(&self) -> bool {
        self.ideal_path()
            .iter()
            .any(|s| s.state == RecordState::PendingAnswer)
    }
}

/// One step in a process type's ideal path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Stable step name used in progress display.
    pub name: &'static str,
    /// The record state this step corresponds to.
    pub state: RecordState,
}

impl Step {
    const fn new(name: &'static str, state: RecordState) -> Self {
        Self { name, state }
    }

    /// Which handler contract the caller must invoke to enter this step.
    pub fn change_kind(&self) -> StateChangeKind {
        StateChangeKind::for_target(self.state)
    }
}

/// Which transition handler applies when entering a state.
///
/// A pure dispatch tag: the caller matches on it and invokes the matching
/// handler contract; selecting the tag has no side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateChangeKind {
    /// Plain state change.
    Standard,
    /// Additionally persists closing metadata and may short-circuit into an
    /// immediate answer.
    PendingAnswer,
}

impl StateChangeKind {
    /// Selects the handler kind for a transition into `target`.
    pub fn for_target(target: RecordState) -> Self {
        if target == RecordState::PendingAnswer {
            StateChangeKind::PendingAnswer
        } else {
            StateChangeKind::Standard
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_path_is_nonempty_and_duplicate_free() {
        for pt in ProcessType::ALL {
            let path = pt.ideal_path();
            assert!(!path.is_empty(), "{:?} has an empty path", pt);
            for (i, a) in path.iter().enumerate() {
                for b in &path[i + 1..] {
                    assert_ne!(a.state, b.state, "{:?} repeats {:?}", pt, a.state);
                }
            }
        }
    }

    #[test]
    fn every_path_ends_closed() {
        for pt in ProcessType::ALL {
            let last = pt.ideal_path().last().unwrap();
            assert_eq!(last.state, RecordState::Closed, "{:?}", pt);
        }
    }

    #[test]
    fn closed_directly_has_exactly_two_steps() {
        assert_eq!(ProcessType::ClosedDirectly.ideal_path().len(), 2);
    }

    #[test]
    fn answer_handler_only_for_pending_answer() {
        assert_eq!(
            StateChangeKind::for_target(RecordState::PendingAnswer),
            StateChangeKind::PendingAnswer
        );
        assert_eq!(
            StateChangeKind::for_target(RecordState::Closed),
            StateChangeKind::Standard
        );
        assert!(!ProcessType::Resolution.answers());
        assert!(ProcessType::ResolutionResponse.answers());
    }
}
