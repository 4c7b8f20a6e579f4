//! Tests for the action authorizer.

use super::*;
use crate::catalog::ProcessType;
use crate::record::Record;
use crate::store::{MemoryStore, ThemeRow};
use crate::types::ThemeId;

fn hierarchy() -> GroupHierarchy {
    let mut h = GroupHierarchy::new();
    h.add_group(GroupId(1), None, false).unwrap();
    h.add_group(GroupId(2), Some(GroupId(1)), false).unwrap();
    h.add_group(GroupId(3), Some(GroupId(2)), false).unwrap();
    h
}

fn record_in(state: RecordState) -> Record {
    let mut r = Record::new(
        ProcessType::ResolutionResponse,
        GroupId(2),
        GroupId(2),
        ThemeId(7),
    );
    r.record_state = state;
    r
}

fn operator_with_everything(store: &MemoryStore) -> UserId {
    let user = UserId::from("operator");
    store.grant(
        &user,
        [
            PermissionCode::RecordValidate,
            PermissionCode::RecordCancel,
            PermissionCode::RecordCancelRequest,
            PermissionCode::RecordAnswer,
            PermissionCode::RecordResendAnswer,
            PermissionCode::RecordDraftAnswer,
            PermissionCode::RecordClaim,
            PermissionCode::RecordReassign,
            PermissionCode::RecordUpdate,
            PermissionCode::RecordUrgency,
            PermissionCode::RecordReassignToggle,
            PermissionCode::RecordThemeChange,
            PermissionCode::RecordFileUpload,
            PermissionCode::RecordFileDelete,
            PermissionCode::RecordConversation,
            PermissionCode::RecordMultirecord,
            PermissionCode::RecordExternalReturn,
            PermissionCode::RecordClose,
        ],
    );
    user
}

fn authorize_with(
    h: &GroupHierarchy,
    store: &MemoryStore,
    table: &PermissionTable,
    record: &Record,
    user: &UserId,
    acting_group: GroupId,
) -> std::collections::BTreeMap<ActionName, ActionDecision> {
    ActionAuthorizer::new(h, store, store, table)
        .authorize(record, user, acting_group, &[], TimestampUtc::now())
        .expect("authorize should succeed")
}

#[test]
fn responsible_group_with_permissions_can_advance() {
    let h = hierarchy();
    let store = MemoryStore::new();
    let table = PermissionTable::default();
    let user = operator_with_everything(&store);
    let record = record_in(RecordState::PendingValidate);

    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    let advance = actions.get(&ActionName::Advance).expect("advance offered");
    assert!(advance.can_perform);
    assert_eq!(advance.reason, None);
    let cancel = actions.get(&ActionName::Cancel).expect("cancel offered");
    assert!(cancel.can_perform);
}

#[test]
fn missing_permission_is_denied_with_named_gate() {
    let h = hierarchy();
    let store = MemoryStore::new();
    let table = PermissionTable::default();
    let user = UserId::from("intern");
    store.grant(&user, [PermissionCode::RecordUpdate]);
    let record = record_in(RecordState::PendingValidate);

    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    let advance = actions.get(&ActionName::Advance).expect("advance offered");
    assert!(!advance.can_perform);
    assert_eq!(
        advance.reason.as_deref(),
        Some("missing permission 'record_validate'")
    );
    // The permitted action still works.
    assert!(actions.get(&ActionName::Update).unwrap().can_perform);
}

#[test]
fn foreign_group_is_denied_with_authority_reason() {
    let h = hierarchy();
    let store = MemoryStore::new();
    let table = PermissionTable::default();
    let user = operator_with_everything(&store);
    // Record owned by 2; group 3 is a descendant, not an ancestor.
    let record = record_in(RecordState::InResolution);

    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(3));
    let advance = actions.get(&ActionName::Advance).expect("advance offered");
    assert!(!advance.can_perform);
    assert!(advance
        .reason
        .as_deref()
        .unwrap()
        .contains("not the responsible profile"));
}

#[test]
fn ancestor_group_has_authority() {
    let h = hierarchy();
    let store = MemoryStore::new();
    let table = PermissionTable::default();
    let user = operator_with_everything(&store);
    let record = record_in(RecordState::InResolution);

    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(1));
    assert!(actions.get(&ActionName::Advance).unwrap().can_perform);
}

#[test]
fn mayorship_record_requires_the_permission_even_for_the_owner() {
    let h = hierarchy();
    let store = MemoryStore::new();
    let table = PermissionTable::default();
    let user = operator_with_everything(&store);
    let mut record = record_in(RecordState::InResolution);
    record.mayorship = true;

    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    let advance = actions.get(&ActionName::Advance).unwrap();
    assert!(!advance.can_perform);
    assert!(advance.reason.as_deref().unwrap().contains("mayorship"));

    // Granting mayorship opens the record even for a non-owner group.
    store.grant(&user, [PermissionCode::Mayorship]);
    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(3));
    assert!(actions.get(&ActionName::Advance).unwrap().can_perform);
}

#[test]
fn terminal_states_offer_no_transition_actions() {
    let h = hierarchy();
    let store = MemoryStore::new();
    let table = PermissionTable::default();
    let user = operator_with_everything(&store);
    let record = record_in(RecordState::Cancelled);

    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    assert!(!actions.contains_key(&ActionName::Advance));
    assert!(!actions.contains_key(&ActionName::Cancel));
}

#[test]
fn closed_record_drops_the_disallowed_subset() {
    let h = hierarchy();
    let store = MemoryStore::new();
    let table = PermissionTable::default();
    let user = operator_with_everything(&store);
    let record = record_in(RecordState::Closed);

    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    for action in [
        ActionName::Reassign,
        ActionName::Update,
        ActionName::UploadFile,
        ActionName::Multirecord,
        ActionName::AddConversation,
    ] {
        assert!(!actions.contains_key(&action), "{:?} should be dropped", action);
    }
    // Claim and resend stay evaluated on closed records.
    assert!(actions.get(&ActionName::Claim).unwrap().can_perform);
    assert!(actions.get(&ActionName::ResendAnswer).unwrap().can_perform);
}

#[test]
fn upload_on_closed_needs_the_dedicated_permission() {
    let h = hierarchy();
    let store = MemoryStore::new();
    let table = PermissionTable::default();
    let user = operator_with_everything(&store);
    let record = record_in(RecordState::Closed);

    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    assert!(!actions.contains_key(&ActionName::UploadFile));

    store.grant(&user, [PermissionCode::RecordFileUploadClosed]);
    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    let upload = actions.get(&ActionName::UploadFile).expect("upload offered");
    // The exception re-admits the action and lifts the state gate; the
    // authority and permission gates still apply.
    assert!(upload.can_perform);
}

#[test]
fn blocked_applicant_cannot_claim() {
    let h = hierarchy();
    let store = MemoryStore::new();
    let table = PermissionTable::default();
    let user = operator_with_everything(&store);
    let mut record = record_in(RecordState::Closed);
    record.applicant_blocked = true;

    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    let claim = actions.get(&ActionName::Claim).unwrap();
    assert!(!claim.can_perform);
    assert!(claim.reason.as_deref().unwrap().contains("blocked"));
}

#[test]
fn deactivated_theme_forces_theme_change_available() {
    let h = hierarchy();
    let store = MemoryStore::new();
    let table = PermissionTable::default();
    let user = operator_with_everything(&store);
    store.insert_theme(
        ThemeId(7),
        ThemeRow {
            is_active: false,
            ..ThemeRow::default()
        },
    );
    // Even on a cancelled record the action stays available.
    let record = record_in(RecordState::Cancelled);

    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    assert!(actions.get(&ActionName::ThemeChange).unwrap().can_perform);
}

#[test]
fn reassign_without_candidates_is_denied_with_reason() {
    let h = hierarchy();
    let store = MemoryStore::new();
    let table = PermissionTable::default();
    let user = operator_with_everything(&store);
    let record = record_in(RecordState::InResolution);

    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    let reassign = actions.get(&ActionName::Reassign).unwrap();
    assert!(!reassign.can_perform);
    assert!(reassign.reason.is_some());
}

#[test]
fn reassign_with_config_edge_is_offered() {
    let mut h = hierarchy();
    h.add_reassign_edge(GroupId(2), GroupId(3)).unwrap();
    let store = MemoryStore::new();
    let table = PermissionTable::default();
    let user = operator_with_everything(&store);
    let record = record_in(RecordState::InResolution);

    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    let reassign = actions.get(&ActionName::Reassign).unwrap();
    assert!(reassign.can_perform);
}

#[test]
fn draft_answer_only_in_pending_answer() {
    let h = hierarchy();
    let store = MemoryStore::new();
    let table = PermissionTable::default();
    let user = operator_with_everything(&store);

    let record = record_in(RecordState::InResolution);
    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    let draft = actions.get(&ActionName::DraftAnswer).unwrap();
    assert!(!draft.can_perform);
    assert!(draft.reason.as_deref().unwrap().contains("in resolution"));

    let record = record_in(RecordState::PendingAnswer);
    let actions = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    assert!(actions.get(&ActionName::DraftAnswer).unwrap().can_perform);
}

#[test]
fn evaluations_are_independent_per_request() {
    let h = hierarchy();
    let store = MemoryStore::new();
    let table = PermissionTable::default();
    let user = operator_with_everything(&store);
    let record = record_in(RecordState::InResolution);

    let first = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    let second = authorize_with(&h, &store, &table, &record, &user, GroupId(2));
    assert_eq!(first, second);
}
