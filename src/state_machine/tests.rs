//! Tests for the record state machine and executor.

use super::*;
use crate::audit::AuditLog;
use crate::catalog::ProcessType;
use crate::hierarchy::GroupHierarchy;
use crate::record::Record;
use crate::store::{MemoryStore, RecordStore};
use crate::types::{GroupId, ThemeId};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;

fn record(process_type: ProcessType) -> Record {
    Record::new(process_type, GroupId(2), GroupId(2), ThemeId(7))
}

fn record_in(process_type: ProcessType, state: RecordState) -> Record {
    let mut r = record(process_type);
    r.record_state = state;
    r
}

/// Creates a test executor with its store and audit log in a temp dir.
fn create_test_workflow<'a>(
    record: Record,
    hierarchy: &'a GroupHierarchy,
    store: &'a MemoryStore,
) -> (
    RecordWorkflow<'a>,
    watch::Receiver<RecordSnapshot>,
    TempDir,
) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let audit = Arc::new(AuditLog::new("test-stream", temp_dir.path()).expect("audit log"));
    store.insert_record(record.clone());
    let (workflow, snapshot_rx) = RecordWorkflow::new(record, hierarchy, store, audit);
    (workflow, snapshot_rx, temp_dir)
}

fn simple_hierarchy() -> GroupHierarchy {
    let mut h = GroupHierarchy::new();
    h.add_group(GroupId(1), None, false).unwrap();
    h.add_group(GroupId(2), Some(GroupId(1)), false).unwrap();
    h.add_group(GroupId(3), Some(GroupId(2)), false).unwrap();
    h
}

#[test]
fn resolution_response_walks_its_ideal_path() {
    let mut r = record(ProcessType::ResolutionResponse);
    assert_eq!(r.record_state, RecordState::PendingValidate);
    assert_eq!(
        next_step_code(&r).unwrap(),
        Some(RecordState::InResolution)
    );

    r.record_state = RecordState::InResolution;
    assert_eq!(
        next_step_code(&r).unwrap(),
        Some(RecordState::PendingAnswer)
    );

    r.record_state = RecordState::PendingAnswer;
    assert_eq!(next_step_code(&r).unwrap(), Some(RecordState::Closed));

    r.record_state = RecordState::Closed;
    assert_eq!(next_step_code(&r).unwrap(), None);
}

#[test]
fn current_step_rejects_states_outside_the_path() {
    let r = record_in(ProcessType::Resolution, RecordState::PendingAnswer);
    let err = current_step(&r).unwrap_err();
    assert!(matches!(err, crate::errors::WorkflowError::InvalidState { .. }));
}

#[test]
fn terminal_states_offer_no_transitions() {
    for state in [
        RecordState::Closed,
        RecordState::Cancelled,
        RecordState::NotProcessed,
    ] {
        let r = record_in(ProcessType::ResolutionResponse, state);
        assert!(transitions(&r).unwrap().is_empty(), "{:?}", state);
    }
}

#[test]
fn normal_steps_offer_advance_and_cancel() {
    let r = record(ProcessType::ResolutionResponse);
    let map = transitions(&r).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(
        map.get(&TransitionKind::Advance),
        Some(&RecordState::InResolution)
    );
    // Cancelling an unvalidated record lands on not-processed.
    assert_eq!(
        map.get(&TransitionKind::Cancel),
        Some(&RecordState::NotProcessed)
    );

    let later = record_in(ProcessType::ResolutionResponse, RecordState::InResolution);
    let map = transitions(&later).unwrap();
    assert_eq!(
        map.get(&TransitionKind::Cancel),
        Some(&RecordState::Cancelled)
    );
}

#[test]
fn externally_returned_offers_return_and_close_instead() {
    let r = record_in(
        ProcessType::RecordExternalProcessing,
        RecordState::ExternalReturned,
    );
    let map = transitions(&r).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(
        map.get(&TransitionKind::Return),
        Some(&RecordState::ExternalProcessing)
    );
    assert_eq!(map.get(&TransitionKind::Close), Some(&RecordState::Closed));
    assert!(!map.contains_key(&TransitionKind::Cancel));
}

#[test]
fn closed_directly_advances_straight_to_closed() {
    let r = record(ProcessType::ClosedDirectly);
    let map = transitions(&r).unwrap();
    assert_eq!(map.get(&TransitionKind::Advance), Some(&RecordState::Closed));
}

#[test]
fn answer_handler_selected_only_for_pending_answer_target() {
    let r = record_in(ProcessType::ResolutionResponse, RecordState::InResolution);
    assert_eq!(
        state_change_method(&r, RecordState::PendingAnswer),
        crate::catalog::StateChangeKind::PendingAnswer
    );
    assert_eq!(
        state_change_method(&r, RecordState::Closed),
        crate::catalog::StateChangeKind::Standard
    );
}

#[test]
fn executor_advances_and_broadcasts_snapshot() {
    let hierarchy = simple_hierarchy();
    let store = MemoryStore::new();
    let (mut workflow, snapshot_rx, _temp) =
        create_test_workflow(record(ProcessType::Resolution), &hierarchy, &store);

    let events = workflow
        .apply(RecordCommand::Advance {
            acting_group: GroupId(2),
            draft_answer: None,
        })
        .expect("Advance should succeed");

    assert_eq!(events.len(), 1);
    match &events[0] {
        RecordEvent::StateChanged { from, to, .. } => {
            assert_eq!(*from, RecordState::PendingValidate);
            assert_eq!(*to, RecordState::InResolution);
        }
        _ => panic!("Expected StateChanged event"),
    }

    assert_eq!(workflow.record().record_state, RecordState::InResolution);
    let snapshot = snapshot_rx.borrow();
    assert_eq!(snapshot.record_state, RecordState::InResolution);
    assert_eq!(snapshot.step_name, Some("resolute"));
}

#[test]
fn executor_persists_only_changed_fields() {
    let hierarchy = simple_hierarchy();
    let store = MemoryStore::new();
    let r = record(ProcessType::Resolution);
    let id = r.id;
    let (mut workflow, _snapshot_rx, _temp) = create_test_workflow(r, &hierarchy, &store);

    workflow
        .apply(RecordCommand::Advance {
            acting_group: GroupId(2),
            draft_answer: None,
        })
        .unwrap();

    let stored = store.load_record(id).unwrap();
    assert_eq!(stored.record_state, RecordState::InResolution);
    assert_eq!(stored.claims_number.0, 0);
    assert!(!stored.alarms.alarm);
}

#[test]
fn entering_pending_answer_persists_closing_metadata() {
    let hierarchy = simple_hierarchy();
    let store = MemoryStore::new();
    let r = record_in(ProcessType::ResolutionResponse, RecordState::InResolution);
    let (mut workflow, _snapshot_rx, _temp) = create_test_workflow(r, &hierarchy, &store);

    workflow
        .apply(RecordCommand::Advance {
            acting_group: GroupId(2),
            draft_answer: None,
        })
        .unwrap();

    assert_eq!(workflow.record().record_state, RecordState::PendingAnswer);
    assert!(workflow.record().closing_date.is_some());
}

#[test]
fn draft_answer_short_circuits_to_closed() {
    let hierarchy = simple_hierarchy();
    let store = MemoryStore::new();
    let r = record_in(ProcessType::ResolutionResponse, RecordState::InResolution);
    let (mut workflow, _snapshot_rx, _temp) = create_test_workflow(r, &hierarchy, &store);

    let events = workflow
        .apply(RecordCommand::Advance {
            acting_group: GroupId(2),
            draft_answer: Some("Resolved as requested.".to_string()),
        })
        .expect("Advance with draft should succeed");

    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], RecordEvent::StateChanged { to: RecordState::PendingAnswer, .. }));
    assert!(matches!(events[1], RecordEvent::AnswerSent { .. }));
    assert!(matches!(events[2], RecordEvent::StateChanged { to: RecordState::Closed, .. }));
    assert_eq!(workflow.record().record_state, RecordState::Closed);
}

#[test]
fn answer_requires_pending_answer_state() {
    let hierarchy = simple_hierarchy();
    let store = MemoryStore::new();
    let r = record(ProcessType::ResolutionResponse);
    let (mut workflow, _snapshot_rx, _temp) = create_test_workflow(r, &hierarchy, &store);

    let result = workflow.apply(RecordCommand::Answer {
        acting_group: GroupId(2),
        body: "too early".to_string(),
    });
    assert!(result.is_err());
    assert_eq!(workflow.record().record_state, RecordState::PendingValidate);
}

#[test]
fn claim_reopens_and_bumps_counter() {
    let hierarchy = simple_hierarchy();
    let store = MemoryStore::new();
    let mut r = record_in(ProcessType::ResolutionResponse, RecordState::Closed);
    r.closing_date = Some(crate::types::TimestampUtc::now());
    let (mut workflow, _snapshot_rx, _temp) = create_test_workflow(r, &hierarchy, &store);

    let events = workflow.apply(RecordCommand::Claim).expect("Claim should succeed");

    assert_eq!(events.len(), 2);
    match &events[0] {
        RecordEvent::Claimed { claims_number, .. } => assert_eq!(claims_number.0, 1),
        _ => panic!("Expected Claimed event"),
    }
    assert_eq!(workflow.record().record_state, RecordState::PendingValidate);
    assert_eq!(workflow.record().claims_number.0, 1);
    assert!(workflow.record().closing_date.is_none());

    // A second claim must wait for another close.
    assert!(workflow.apply(RecordCommand::Claim).is_err());
    assert_eq!(workflow.record().claims_number.0, 1);
}

#[test]
fn reassign_moves_ownership_and_writes_the_trail() {
    let mut hierarchy = simple_hierarchy();
    hierarchy.add_reassign_edge(GroupId(2), GroupId(3)).unwrap();
    let store = MemoryStore::new();
    let r = record_in(ProcessType::ResolutionResponse, RecordState::InResolution);
    let id = r.id;
    let (mut workflow, _snapshot_rx, _temp) = create_test_workflow(r, &hierarchy, &store);

    let events = workflow
        .apply(RecordCommand::Reassign {
            acting_group: GroupId(2),
            target: GroupId(3),
            reason: crate::reassignment::ReassignReason::Manual,
        })
        .expect("Reassign should succeed");

    assert_eq!(events.len(), 1);
    assert_eq!(workflow.record().responsible_profile, GroupId(3));

    let trail = crate::store::AuditTrail::reassignment_trail(&store, id).unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].previous_responsible, GroupId(2));
    assert_eq!(trail[0].next_responsible, GroupId(3));
}

#[test]
fn reassign_to_unresolved_target_is_rejected() {
    let hierarchy = simple_hierarchy();
    let store = MemoryStore::new();
    let r = record_in(ProcessType::ResolutionResponse, RecordState::InResolution);
    let (mut workflow, _snapshot_rx, _temp) = create_test_workflow(r, &hierarchy, &store);

    let result = workflow.apply(RecordCommand::Reassign {
        acting_group: GroupId(2),
        target: GroupId(3),
        reason: crate::reassignment::ReassignReason::Manual,
    });
    assert!(result.is_err());
    assert_eq!(workflow.record().responsible_profile, GroupId(2));
}

#[test]
fn rejected_commands_leave_state_untouched() {
    let hierarchy = simple_hierarchy();
    let store = MemoryStore::new();
    let r = record_in(ProcessType::ResolutionResponse, RecordState::Closed);
    let before = r.clone();
    let (mut workflow, _snapshot_rx, _temp) = create_test_workflow(r, &hierarchy, &store);

    assert!(workflow
        .apply(RecordCommand::Advance {
            acting_group: GroupId(2),
            draft_answer: None,
        })
        .is_err());
    assert!(workflow
        .apply(RecordCommand::Cancel {
            acting_group: GroupId(2),
            reason: "late".to_string(),
        })
        .is_err());
    assert!(before.changed_fields(workflow.record()).is_empty());
}

#[test]
fn external_return_round_trip() {
    let hierarchy = simple_hierarchy();
    let store = MemoryStore::new();
    let r = record_in(
        ProcessType::RecordExternalProcessing,
        RecordState::ExternalReturned,
    );
    let (mut workflow, _snapshot_rx, _temp) = create_test_workflow(r, &hierarchy, &store);

    let events = workflow
        .apply(RecordCommand::Return {
            acting_group: GroupId(2),
        })
        .expect("Return should succeed");
    assert!(matches!(
        events[0],
        RecordEvent::StateChanged { to: RecordState::ExternalProcessing, .. }
    ));

    // Advance back to the returned step, then close it.
    workflow
        .apply(RecordCommand::Advance {
            acting_group: GroupId(2),
            draft_answer: None,
        })
        .unwrap();
    assert_eq!(workflow.record().record_state, RecordState::ExternalReturned);

    workflow
        .apply(RecordCommand::Close {
            acting_group: GroupId(2),
        })
        .unwrap();
    assert_eq!(workflow.record().record_state, RecordState::Closed);
}

#[test]
fn audit_log_receives_command_and_event_entries() {
    let hierarchy = simple_hierarchy();
    let store = MemoryStore::new();
    let r = record(ProcessType::ClosedDirectly);
    store.insert_record(r.clone());

    let temp_dir = TempDir::new().expect("temp dir");
    let audit = Arc::new(AuditLog::new("audit-test", temp_dir.path()).expect("audit log"));
    let (mut workflow, _snapshot_rx) =
        RecordWorkflow::new(r, &hierarchy, &store, Arc::clone(&audit));

    workflow
        .apply(RecordCommand::Advance {
            acting_group: GroupId(2),
            draft_answer: None,
        })
        .unwrap();

    let contents = std::fs::read_to_string(audit.path()).expect("read audit log");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("command_received"));
    assert!(lines[1].contains("StateChanged"));
}

#[test]
fn watch_receiver_dropped_does_not_panic() {
    let hierarchy = simple_hierarchy();
    let store = MemoryStore::new();
    let (mut workflow, snapshot_rx, _temp) =
        create_test_workflow(record(ProcessType::Resolution), &hierarchy, &store);

    drop(snapshot_rx);

    let result = workflow.apply(RecordCommand::Advance {
        acting_group: GroupId(2),
        draft_answer: None,
    });
    assert!(result.is_ok());
    assert_eq!(workflow.record().record_state, RecordState::InResolution);
}
