//! Alarm propagation: recomputes per-record alarm flags and per-group
//! unread counters whenever a conversation moves.
//!
//! The alarm reflects "is there something unread", not just "did something
//! happen"; reading a thread re-runs the recomputation. A record with no
//! response channel configured is never an error; it simply cannot be in
//! the applicant-response-pending state.

use std::collections::BTreeSet;

use tracing::debug;

use super::{Conversation, ConversationKind, Message, UnreadCounter};
use crate::errors::WorkflowError;
use crate::record::{Record, RecordField};
use crate::store::{ConversationStore, RecordStore, ThemeCatalog};
use crate::types::{ConversationId, GroupId, TimestampUtc};

/// Everything the alarm engine needs from the persistence layer.
pub trait AlarmStore: ConversationStore + RecordStore + ThemeCatalog {}

impl<T: ConversationStore + RecordStore + ThemeCatalog> AlarmStore for T {}

/// Result of one alarm engine pass over a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmUpdate {
    /// Alarm fields the pass actually changed (the only fields persisted).
    pub changed_fields: BTreeSet<RecordField>,
}

/// Recomputes alarm flags and unread counters against one store.
pub struct AlarmEngine<'a> {
    store: &'a dyn AlarmStore,
}

impl<'a> AlarmEngine<'a> {
    pub fn new(store: &'a dyn AlarmStore) -> Self {
        Self { store }
    }

    /// Opens a new conversation thread on a record.
    pub fn open_conversation(&self, conversation: Conversation) -> Result<(), WorkflowError> {
        self.store.insert_conversation(conversation)
    }

    /// Posts a message and propagates its consequences: the message row,
    /// unread counters for every involved group except the author, and the
    /// recomputed alarm flags. Only changed alarm fields are persisted.
    pub fn post_message(
        &self,
        record: &mut Record,
        conversation_id: ConversationId,
        author_group: Option<GroupId>,
        text: &str,
    ) -> Result<AlarmUpdate, WorkflowError> {
        let conversation = self
            .store
            .conversation(conversation_id)?
            .ok_or(WorkflowError::UnknownConversation {
                conversation: conversation_id,
            })?;

        self.store.insert_message(Message {
            conversation: conversation_id,
            author_group,
            record_state: record.record_state,
            text: text.to_string(),
            sent_at: TimestampUtc::now(),
        })?;

        // Counter updates for one message may land in any order, but all
        // land before the operation returns.
        for group in &conversation.groups_involved {
            if Some(*group) != author_group {
                self.store.upsert_unread_counter(conversation_id, *group)?;
            }
        }

        let before = record.clone();
        self.recompute(record)?;
        if conversation.kind == ConversationKind::Applicant && author_group.is_none() {
            // An applicant message raises the alarm unconditionally; the
            // pending flag additionally needs a known response channel.
            record.alarms.alarm = true;
            record.alarms.applicant_response = true;
            record.alarms.pend_applicant_response =
                self.store.response_channel_of(record).is_some();
        }
        self.persist_changed(record, &before)
    }

    /// Marks a conversation read for one group: deletes exactly that
    /// group's unread row. When the reader is the responsible profile and
    /// the row carried unread messages, the alarm flags are recomputed.
    pub fn mark_read(
        &self,
        record: &mut Record,
        conversation_id: ConversationId,
        group: GroupId,
    ) -> Result<Option<UnreadCounter>, WorkflowError> {
        let deleted = self.store.delete_unread_counter(conversation_id, group)?;
        if group == record.responsible_profile
            && deleted.as_ref().is_some_and(|row| row.count > 0)
        {
            let before = record.clone();
            self.recompute(record)?;
            self.persist_changed(record, &before)?;
        }
        Ok(deleted)
    }

    /// Full alarm recovery for one record: recomputes every
    /// conversation-derived flag from stored state. Idempotent, so safe to
    /// re-run over already-correct records concurrently with live traffic.
    pub fn recover_alarms(&self, record: &mut Record) -> Result<AlarmUpdate, WorkflowError> {
        let before = record.clone();
        self.recompute(record)?;
        self.persist_changed(record, &before)
    }

    fn persist_changed(
        &self,
        record: &Record,
        before: &Record,
    ) -> Result<AlarmUpdate, WorkflowError> {
        let changed_fields = record.changed_fields(before);
        if !changed_fields.is_empty() {
            self.store.save_record(record, &changed_fields)?;
            debug!(record = %record.id, fields = changed_fields.len(), "alarms updated");
        }
        Ok(AlarmUpdate { changed_fields })
    }

    /// Derives all conversation alarm flags from stored conversations,
    /// messages and unread rows.
    fn recompute(&self, record: &mut Record) -> Result<(), WorkflowError> {
        let responsible = record.responsible_profile;
        let channel_known = self.store.response_channel_of(record).is_some();

        let mut applicant_response = false;
        let mut response_to_responsible = false;
        let mut pend_response_responsible = false;
        let mut pending_obligation = false;

        for conversation in self.store.conversations_of(record.id)? {
            if !conversation.is_opened {
                continue;
            }
            let messages = self.store.messages_of(conversation.id)?;
            let Some(latest) = messages.last() else {
                continue;
            };
            let responsible_unread = self
                .store
                .unread_counter(conversation.id, responsible)?
                .is_some();

            match conversation.kind {
                ConversationKind::Applicant => {
                    if latest.is_applicant_authored() && responsible_unread {
                        applicant_response = true;
                    }
                }
                ConversationKind::Internal | ConversationKind::External => {
                    let responsible_wrote =
                        messages.iter().any(|m| m.author_group == Some(responsible));
                    let addressed_to_responsible =
                        conversation.creation_group == responsible || responsible_wrote;

                    if latest.author_group != Some(responsible)
                        && addressed_to_responsible
                        && responsible_unread
                    {
                        response_to_responsible = true;
                    }
                    if conversation.require_answer
                        && conversation.creation_group == responsible
                        && latest.author_group == Some(responsible)
                    {
                        pend_response_responsible = true;
                    }
                }
            }

            // Secondary obligation: the responsible group owes an answer in
            // some thread it participates in.
            if conversation.require_answer
                && latest.author_group != Some(responsible)
                && conversation.groups_involved.contains(&responsible)
            {
                pending_obligation = true;
            }
        }

        record.alarms.applicant_response = applicant_response;
        record.alarms.pend_applicant_response = applicant_response && channel_known;
        record.alarms.response_to_responsible = response_to_responsible;
        record.alarms.pend_response_responsible = pend_response_responsible;
        record.alarms.alarm = record.alarms.applicant_response
            || record.alarms.pend_applicant_response
            || response_to_responsible
            || pend_response_responsible
            || pending_obligation;
        Ok(())
    }
}
