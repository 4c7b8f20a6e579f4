//! Conversation threads attached to a record, and the alarm engine that
//! reacts to their messages.

mod alarms;

pub use alarms::{AlarmEngine, AlarmStore, AlarmUpdate};

use serde::{Deserialize, Serialize};

use crate::record::RecordState;
use crate::types::{ConversationId, GroupId, RecordId, TimestampUtc};

/// Who a conversation talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    /// Between groups inside the organization.
    Internal,
    /// With an external operator processing the record.
    External,
    /// With the citizen who filed the request.
    Applicant,
}

/// A message thread owned by exactly one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub record: RecordId,
    pub kind: ConversationKind,
    pub creation_group: GroupId,
    /// Closed conversations no longer feed the alarm engine.
    pub is_opened: bool,
    /// The thread expects an answer from its counterpart.
    pub require_answer: bool,
    /// Groups participating in the thread (the applicant is implicit for
    /// applicant-kind conversations).
    pub groups_involved: Vec<GroupId>,
    pub created_at: TimestampUtc,
}

impl Conversation {
    pub fn new(
        record: RecordId,
        kind: ConversationKind,
        creation_group: GroupId,
        require_answer: bool,
        groups_involved: Vec<GroupId>,
    ) -> Self {
        Self {
            id: ConversationId::new(),
            record,
            kind,
            creation_group,
            is_opened: true,
            require_answer,
            groups_involved,
            created_at: TimestampUtc::now(),
        }
    }
}

/// One message inside a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub conversation: ConversationId,
    /// `None` marks an applicant-authored message.
    pub author_group: Option<GroupId>,
    /// Record state at send time, kept for the audit view.
    pub record_state: RecordState,
    pub text: String,
    pub sent_at: TimestampUtc,
}

impl Message {
    /// True when the message came from the citizen rather than a group.
    pub fn is_applicant_authored(&self) -> bool {
        self.author_group.is_none()
    }
}

/// Per-(conversation, group) unread marker.
///
/// Row existence is the authoritative "has unread messages" signal; the
/// count inside is cosmetic. Deleted when the group reads the thread,
/// recreated on the next message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCounter {
    pub conversation: ConversationId,
    pub group: GroupId,
    pub count: u32,
}
