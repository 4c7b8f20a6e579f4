//! The static action → permission-code table.
//!
//! Built once at startup or config load and treated as read-only
//! process-wide configuration; there is no runtime registry to reflect
//! over.

use std::collections::BTreeMap;

use super::ActionName;
use crate::types::PermissionCode;

/// Read-only mapping from action to the permission it requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTable {
    entries: BTreeMap<ActionName, PermissionCode>,
}

impl PermissionTable {
    /// Builds a table from explicit entries. Actions absent from the map
    /// require no named permission.
    pub fn from_entries(entries: impl IntoIterator<Item = (ActionName, PermissionCode)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// The permission `action` requires, when one is configured.
    pub fn permission_for(&self, action: ActionName) -> Option<PermissionCode> {
        self.entries.get(&action).copied()
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        use ActionName::*;
        use PermissionCode::*;
        Self::from_entries([
            (Advance, RecordValidate),
            (Cancel, RecordCancel),
            (Return, RecordExternalReturn),
            (Close, RecordClose),
            (Claim, RecordClaim),
            (CancelRequest, RecordCancelRequest),
            (Reassign, RecordReassign),
            (Update, RecordUpdate),
            (ToggleUrgency, RecordUrgency),
            (ToggleReassignable, RecordReassignToggle),
            (ThemeChange, RecordThemeChange),
            (UploadFile, RecordFileUpload),
            (DeleteFile, RecordFileDelete),
            (AddConversation, RecordConversation),
            (DraftAnswer, RecordDraftAnswer),
            (ResendAnswer, RecordResendAnswer),
            (Multirecord, RecordMultirecord),
        ])
    }
}
