//! In-memory store used by the test suite and by embedders without a
//! database.
//!
//! One mutex guards all tables: every mutation is serialized, which
//! satisfies the atomicity contract trivially (concurrent transitions on
//! the same record cannot interleave).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::{
    AuditTrail, ConversationStore, PermissionLookup, RecordStore, ResponseChannel, ThemeCatalog,
};
use crate::conversation::{Conversation, Message, UnreadCounter};
use crate::errors::WorkflowError;
use crate::reassignment::ReassignmentEvent;
use crate::record::{Record, RecordField};
use crate::types::{ConversationId, GroupId, PermissionCode, RecordId, ThemeId, UserId};

#[derive(Debug, Default)]
struct Tables {
    records: BTreeMap<RecordId, Record>,
    reassignments: Vec<ReassignmentEvent>,
    conversations: BTreeMap<ConversationId, Conversation>,
    messages: Vec<Message>,
    unread: BTreeMap<(ConversationId, GroupId), u32>,
}

/// Theme row in the in-memory catalog.
#[derive(Debug, Clone, Copy)]
pub struct ThemeRow {
    pub validation_place_days: i64,
    pub is_validated_reassignable: bool,
    pub is_active: bool,
    pub response_channel: Option<ResponseChannel>,
}

impl Default for ThemeRow {
    fn default() -> Self {
        Self {
            validation_place_days: 5,
            is_validated_reassignable: false,
            is_active: true,
            response_channel: Some(ResponseChannel::Email),
        }
    }
}

/// All store traits backed by in-process tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    permissions: Mutex<BTreeMap<UserId, BTreeSet<PermissionCode>>>,
    profiles: Mutex<BTreeMap<GroupId, BTreeSet<PermissionCode>>>,
    themes: Mutex<BTreeMap<ThemeId, ThemeRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_record(&self, record: Record) {
        self.tables
            .lock()
            .expect("store mutex poisoned")
            .records
            .insert(record.id, record);
    }

    pub fn grant(&self, user: &UserId, codes: impl IntoIterator<Item = PermissionCode>) {
        self.permissions
            .lock()
            .expect("store mutex poisoned")
            .entry(user.clone())
            .or_default()
            .extend(codes);
    }

    pub fn set_profile(&self, group: GroupId, codes: impl IntoIterator<Item = PermissionCode>) {
        self.profiles
            .lock()
            .expect("store mutex poisoned")
            .insert(group, codes.into_iter().collect());
    }

    pub fn insert_theme(&self, theme: ThemeId, row: ThemeRow) {
        self.themes
            .lock()
            .expect("store mutex poisoned")
            .insert(theme, row);
    }

    fn theme_row(&self, theme: ThemeId) -> ThemeRow {
        self.themes
            .lock()
            .expect("store mutex poisoned")
            .get(&theme)
            .copied()
            .unwrap_or_default()
    }
}

impl RecordStore for MemoryStore {
    fn load_record(&self, id: RecordId) -> Result<Record, WorkflowError> {
        self.tables
            .lock()
            .expect("store mutex poisoned")
            .records
            .get(&id)
            .cloned()
            .ok_or(WorkflowError::UnknownRecord { record: id })
    }

    fn save_record(
        &self,
        record: &Record,
        changed_fields: &BTreeSet<RecordField>,
    ) -> Result<(), WorkflowError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        let stored = tables
            .records
            .get_mut(&record.id)
            .ok_or(WorkflowError::UnknownRecord { record: record.id })?;
        for field in changed_fields {
            match field {
                RecordField::RecordState => stored.record_state = record.record_state,
                RecordField::ProcessType => stored.process_type = record.process_type,
                RecordField::ResponsibleProfile => {
                    stored.responsible_profile = record.responsible_profile
                }
                RecordField::ClaimsNumber => stored.claims_number = record.claims_number,
                RecordField::ReassignmentNotAllowed => {
                    stored.reassignment_not_allowed = record.reassignment_not_allowed
                }
                RecordField::Mayorship => stored.mayorship = record.mayorship,
                RecordField::ApplicantBlocked => {
                    stored.applicant_blocked = record.applicant_blocked
                }
                RecordField::Theme => stored.theme = record.theme,
                RecordField::ClosingDate => stored.closing_date = record.closing_date,
                RecordField::Alarm => stored.alarms.alarm = record.alarms.alarm,
                RecordField::PendApplicantResponse => {
                    stored.alarms.pend_applicant_response = record.alarms.pend_applicant_response
                }
                RecordField::ApplicantResponse => {
                    stored.alarms.applicant_response = record.alarms.applicant_response
                }
                RecordField::ResponseToResponsible => {
                    stored.alarms.response_to_responsible = record.alarms.response_to_responsible
                }
                RecordField::PendResponseResponsible => {
                    stored.alarms.pend_response_responsible =
                        record.alarms.pend_response_responsible
                }
                RecordField::CitizenAlarm => {
                    stored.alarms.citizen_alarm = record.alarms.citizen_alarm
                }
            }
        }
        Ok(())
    }
}

impl AuditTrail for MemoryStore {
    fn append_reassignment(&self, event: ReassignmentEvent) -> Result<(), WorkflowError> {
        self.tables
            .lock()
            .expect("store mutex poisoned")
            .reassignments
            .push(event);
        Ok(())
    }

    fn reassignment_trail(
        &self,
        record: RecordId,
    ) -> Result<Vec<ReassignmentEvent>, WorkflowError> {
        Ok(self
            .tables
            .lock()
            .expect("store mutex poisoned")
            .reassignments
            .iter()
            .filter(|e| e.record == record)
            .cloned()
            .collect())
    }
}

impl ConversationStore for MemoryStore {
    fn insert_conversation(&self, conversation: Conversation) -> Result<(), WorkflowError> {
        self.tables
            .lock()
            .expect("store mutex poisoned")
            .conversations
            .insert(conversation.id, conversation);
        Ok(())
    }

    fn insert_message(&self, message: Message) -> Result<(), WorkflowError> {
        self.tables
            .lock()
            .expect("store mutex poisoned")
            .messages
            .push(message);
        Ok(())
    }

    fn conversations_of(&self, record: RecordId) -> Result<Vec<Conversation>, WorkflowError> {
        Ok(self
            .tables
            .lock()
            .expect("store mutex poisoned")
            .conversations
            .values()
            .filter(|c| c.record == record)
            .cloned()
            .collect())
    }

    fn conversation(&self, id: ConversationId) -> Result<Option<Conversation>, WorkflowError> {
        Ok(self
            .tables
            .lock()
            .expect("store mutex poisoned")
            .conversations
            .get(&id)
            .cloned())
    }

    fn close_conversation(&self, id: ConversationId) -> Result<(), WorkflowError> {
        if let Some(conversation) = self
            .tables
            .lock()
            .expect("store mutex poisoned")
            .conversations
            .get_mut(&id)
        {
            conversation.is_opened = false;
        }
        Ok(())
    }

    fn messages_of(&self, conversation: ConversationId) -> Result<Vec<Message>, WorkflowError> {
        Ok(self
            .tables
            .lock()
            .expect("store mutex poisoned")
            .messages
            .iter()
            .filter(|m| m.conversation == conversation)
            .cloned()
            .collect())
    }

    fn unread_counter(
        &self,
        conversation: ConversationId,
        group: GroupId,
    ) -> Result<Option<UnreadCounter>, WorkflowError> {
        Ok(self
            .tables
            .lock()
            .expect("store mutex poisoned")
            .unread
            .get(&(conversation, group))
            .map(|count| UnreadCounter {
                conversation,
                group,
                count: *count,
            }))
    }

    fn upsert_unread_counter(
        &self,
        conversation: ConversationId,
        group: GroupId,
    ) -> Result<(), WorkflowError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        *tables.unread.entry((conversation, group)).or_insert(0) += 1;
        Ok(())
    }

    fn delete_unread_counter(
        &self,
        conversation: ConversationId,
        group: GroupId,
    ) -> Result<Option<UnreadCounter>, WorkflowError> {
        Ok(self
            .tables
            .lock()
            .expect("store mutex poisoned")
            .unread
            .remove(&(conversation, group))
            .map(|count| UnreadCounter {
                conversation,
                group,
                count,
            }))
    }
}

impl PermissionLookup for MemoryStore {
    fn has_permission(&self, user: &UserId, code: PermissionCode) -> bool {
        self.permissions
            .lock()
            .expect("store mutex poisoned")
            .get(user)
            .is_some_and(|codes| codes.contains(&code))
    }

    fn profile_of(&self, group: GroupId) -> BTreeSet<PermissionCode> {
        self.profiles
            .lock()
            .expect("store mutex poisoned")
            .get(&group)
            .cloned()
            .unwrap_or_default()
    }
}

impl ThemeCatalog for MemoryStore {
    fn validation_place_days(&self, theme: ThemeId) -> i64 {
        self.theme_row(theme).validation_place_days
    }

    fn is_validated_reassignable(&self, theme: ThemeId) -> bool {
        self.theme_row(theme).is_validated_reassignable
    }

    fn is_theme_active(&self, theme: ThemeId) -> bool {
        self.theme_row(theme).is_active
    }

    fn response_channel_of(&self, record: &Record) -> Option<ResponseChannel> {
        self.theme_row(record.theme).response_channel
    }
}
