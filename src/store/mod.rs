//! Narrow contracts to the excluded collaborators.
//!
//! The core is a library of decision functions; persistence, permission
//! lookup and theme configuration stay outside behind these traits. All
//! store calls issued from within one core operation are assumed to share
//! a transaction.

mod memory;

pub use memory::{MemoryStore, ThemeRow};

use std::collections::BTreeSet;

use crate::conversation::{Conversation, Message, UnreadCounter};
use crate::errors::WorkflowError;
use crate::reassignment::ReassignmentEvent;
use crate::record::{Record, RecordField};
use crate::types::{ConversationId, GroupId, PermissionCode, RecordId, ThemeId, UserId};

/// Record persistence.
pub trait RecordStore {
    fn load_record(&self, id: RecordId) -> Result<Record, WorkflowError>;

    /// Persists only the fields named in `changed_fields`; everything else
    /// must be left untouched by the persistence layer.
    fn save_record(
        &self,
        record: &Record,
        changed_fields: &BTreeSet<RecordField>,
    ) -> Result<(), WorkflowError>;
}

/// Append-only reassignment audit trail.
pub trait AuditTrail {
    fn append_reassignment(&self, event: ReassignmentEvent) -> Result<(), WorkflowError>;

    /// Trail entries for one record, oldest first.
    fn reassignment_trail(&self, record: RecordId) -> Result<Vec<ReassignmentEvent>, WorkflowError>;
}

/// Conversation, message and unread-counter persistence.
pub trait ConversationStore {
    fn insert_conversation(&self, conversation: Conversation) -> Result<(), WorkflowError>;
    fn insert_message(&self, message: Message) -> Result<(), WorkflowError>;
    fn conversations_of(&self, record: RecordId) -> Result<Vec<Conversation>, WorkflowError>;
    fn conversation(&self, id: ConversationId) -> Result<Option<Conversation>, WorkflowError>;
    fn close_conversation(&self, id: ConversationId) -> Result<(), WorkflowError>;

    /// Messages of one conversation, oldest first.
    fn messages_of(&self, conversation: ConversationId) -> Result<Vec<Message>, WorkflowError>;

    fn unread_counter(
        &self,
        conversation: ConversationId,
        group: GroupId,
    ) -> Result<Option<UnreadCounter>, WorkflowError>;

    /// Increments the counter row, creating it with count 1 when absent.
    fn upsert_unread_counter(
        &self,
        conversation: ConversationId,
        group: GroupId,
    ) -> Result<(), WorkflowError>;

    /// Deletes the row and returns it; `None` when no row existed.
    fn delete_unread_counter(
        &self,
        conversation: ConversationId,
        group: GroupId,
    ) -> Result<Option<UnreadCounter>, WorkflowError>;
}

/// Permission lookups against the authentication collaborator.
pub trait PermissionLookup {
    fn has_permission(&self, user: &UserId, code: PermissionCode) -> bool;
    fn profile_of(&self, group: GroupId) -> BTreeSet<PermissionCode>;
}

/// Delivery channel for an answered record. The core only reports which
/// channel metadata applies; sending is the caller's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseChannel {
    Email,
    Sms,
    Letter,
}

/// Read-only theme/catalog configuration facts.
pub trait ThemeCatalog {
    fn validation_place_days(&self, theme: ThemeId) -> i64;
    fn is_validated_reassignable(&self, theme: ThemeId) -> bool;

    /// Deactivated themes force the theme-change action available.
    fn is_theme_active(&self, theme: ThemeId) -> bool;

    /// `None` when the record has no response configuration yet; that is
    /// never an error, merely "cannot be applicant-response-pending".
    fn response_channel_of(&self, record: &Record) -> Option<ResponseChannel>;
}
