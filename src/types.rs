//! Strongly typed domain primitives for the record workflow core.
//!
//! These newtypes provide type safety and semantic clarity for group, record
//! and conversation identifiers, timestamps, and claim counters. They are
//! used throughout the decision modules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an organizational group (node in the group tree).
///
/// Group ids are small integers assigned by the organizational registry;
/// candidate orderings throughout the crate sort ascending by this id so
/// repeated evaluations return identical sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a record card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Creates a new random record ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a conversation thread attached to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub Uuid);

impl ConversationId {
    /// Creates a new random conversation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an acting user (operator of a group profile).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a theme (classification of the citizen request).
///
/// Theme configuration (validation thresholds, reassignability) lives in the
/// external [`ThemeCatalog`](crate::store::ThemeCatalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThemeId(pub u64);

impl std::fmt::Display for ThemeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UTC timestamp for events and records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimestampUtc(pub DateTime<Utc>);

impl TimestampUtc {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the timestamp as an RFC3339 string.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Whole days elapsed between this timestamp and `later`.
    pub fn days_until(&self, later: TimestampUtc) -> i64 {
        (later.0 - self.0).num_days()
    }
}

impl Default for TimestampUtc {
    fn default() -> Self {
        Self::now()
    }
}

/// Count of citizen-initiated reopen cycles on a record.
///
/// Only ever increases; a claim resets the record to pending-validate and
/// bumps this counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ClaimsNumber(pub u32);

impl ClaimsNumber {
    /// Returns the counter after one more claim.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// True when the record has been claimed at least once.
    pub fn has_claims(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for ClaimsNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Permission code granted to a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCode {
    RecordValidate,
    RecordCancel,
    RecordCancelRequest,
    RecordAnswer,
    RecordResendAnswer,
    RecordDraftAnswer,
    RecordClaim,
    RecordReassign,
    RecordUpdate,
    RecordUrgency,
    RecordReassignToggle,
    RecordThemeChange,
    RecordFileUpload,
    RecordFileUploadClosed,
    RecordFileDelete,
    RecordConversation,
    RecordMultirecord,
    RecordExternalReturn,
    RecordClose,
    RecordNotProcessed,
    Mayorship,
}

impl PermissionCode {
    /// Stable code string used in configuration files.
    pub fn as_code(&self) -> &'static str {
        match self {
            PermissionCode::RecordValidate => "record_validate",
            PermissionCode::RecordCancel => "record_cancel",
            PermissionCode::RecordCancelRequest => "record_cancel_request",
            PermissionCode::RecordAnswer => "record_answer",
            PermissionCode::RecordResendAnswer => "record_resend_answer",
            PermissionCode::RecordDraftAnswer => "record_draft_answer",
            PermissionCode::RecordClaim => "record_claim",
            PermissionCode::RecordReassign => "record_reassign",
            PermissionCode::RecordUpdate => "record_update",
            PermissionCode::RecordUrgency => "record_urgency",
            PermissionCode::RecordReassignToggle => "record_reassign_toggle",
            PermissionCode::RecordThemeChange => "record_theme_change",
            PermissionCode::RecordFileUpload => "record_file_upload",
            PermissionCode::RecordFileUploadClosed => "record_file_upload_closed",
            PermissionCode::RecordFileDelete => "record_file_delete",
            PermissionCode::RecordConversation => "record_conversation",
            PermissionCode::RecordMultirecord => "record_multirecord",
            PermissionCode::RecordExternalReturn => "record_external_return",
            PermissionCode::RecordClose => "record_close",
            PermissionCode::RecordNotProcessed => "record_not_processed",
            PermissionCode::Mayorship => "mayorship",
        }
    }
}
