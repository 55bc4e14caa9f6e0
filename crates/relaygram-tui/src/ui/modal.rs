// Modal dialog state. Rendering lives in views::modals, key handling in input.

use relaygram_core::constants::{MAX_GROUP_DESCRIPTION_LENGTH, MAX_GROUP_NAME_LENGTH};
use relaygram_core::membership::{validate_group_size, PendingMembers};
use relaygram_core::models::GroupMetadata;

use crate::ui::text_input::TextInput;

#[derive(Debug, Clone, Default)]
pub enum ModalState {
    #[default]
    None,
    NewDirect(NewDirectState),
    NewGroup(NewGroupState),
    GroupInfo(GroupInfoState),
    RenameDisplay(RenameDisplayState),
    Attach(AttachState),
    Help,
}

impl ModalState {
    pub fn is_open(&self) -> bool {
        !matches!(self, ModalState::None)
    }
}

/// Start a direct chat by wallet address
#[derive(Debug, Clone, Default)]
pub struct NewDirectState {
    pub address: TextInput,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Name,
    Description,
    Member,
}

impl GroupField {
    pub fn next(self) -> Self {
        match self {
            GroupField::Name => GroupField::Description,
            GroupField::Description => GroupField::Member,
            GroupField::Member => GroupField::Name,
        }
    }
}

/// New group draft: metadata plus the pending member list
#[derive(Debug, Clone)]
pub struct NewGroupState {
    pub name: TextInput,
    pub description: TextInput,
    pub member: TextInput,
    pub pending: PendingMembers,
    pub focus: GroupField,
    /// Highlighted pending member, for removal
    pub selected: usize,
    pub error: Option<String>,
}

impl Default for NewGroupState {
    fn default() -> Self {
        Self {
            name: TextInput::with_limit(MAX_GROUP_NAME_LENGTH),
            description: TextInput::with_limit(MAX_GROUP_DESCRIPTION_LENGTH),
            member: TextInput::new(),
            pending: PendingMembers::new(),
            focus: GroupField::Member,
            selected: 0,
            error: None,
        }
    }
}

impl NewGroupState {
    /// Move the member field into the pending list.
    pub fn add_pending(&mut self) {
        match self.pending.add(self.member.as_str()) {
            Ok(_) => {
                self.member.clear();
                self.selected = self.pending.len().saturating_sub(1);
                self.error = None;
            }
            Err(err) => self.error = Some(err.to_string()),
        }
    }

    pub fn remove_selected(&mut self) {
        if let Some(addr) = self.pending.as_slice().get(self.selected).cloned() {
            self.pending.remove(&addr);
            self.selected = self.selected.min(self.pending.len().saturating_sub(1));
        }
    }

    /// Addresses and metadata when the draft can be submitted.
    pub fn submission(&mut self) -> Option<(Vec<String>, GroupMetadata)> {
        if let Err(err) = validate_group_size(self.pending.group_size()) {
            self.error = Some(err.to_string());
            return None;
        }
        let non_blank = |s: &str| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        let metadata = GroupMetadata {
            name: non_blank(self.name.as_str()),
            description: non_blank(self.description.as_str()),
        };
        Some((self.pending.as_slice().to_vec(), metadata))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupInfoMode {
    Browse,
    Rename(TextInput),
    EditDescription(TextInput),
    AddMembers(MemberDraft),
    ConfirmRemove(String),
    ConfirmLeave,
}

/// Addresses queued for a single add-members request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDraft {
    pub input: TextInput,
    pub pending: PendingMembers,
    pub error: Option<String>,
}

impl MemberDraft {
    pub fn for_group(member_count: usize) -> Self {
        Self {
            input: TextInput::new(),
            pending: PendingMembers::for_group(member_count),
            error: None,
        }
    }

    pub fn add_pending(&mut self) {
        match self.pending.add(self.input.as_str()) {
            Ok(_) => {
                self.input.clear();
                self.error = None;
            }
            Err(err) => self.error = Some(err.to_string()),
        }
    }

    pub fn remove_last(&mut self) {
        if let Some(addr) = self.pending.as_slice().last().cloned() {
            self.pending.remove(&addr);
        }
    }

    pub fn submission(&mut self) -> Option<Vec<String>> {
        if self.pending.is_empty() {
            self.error = Some("Add at least one address".to_string());
            return None;
        }
        Some(self.pending.as_slice().to_vec())
    }
}

/// Members and admin actions for the open group
#[derive(Debug, Clone)]
pub struct GroupInfoState {
    pub conversation_id: String,
    pub members: Vec<String>,
    pub selected: usize,
    pub mode: GroupInfoMode,
}

impl GroupInfoState {
    pub fn new(conversation_id: &str, members: Vec<String>) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            members,
            selected: 0,
            mode: GroupInfoMode::Browse,
        }
    }

    pub fn selected_member(&self) -> Option<&str> {
        self.members.get(self.selected).map(String::as_str)
    }

    pub fn set_members(&mut self, members: Vec<String>) {
        self.members = members;
        self.selected = self.selected.min(self.members.len().saturating_sub(1));
    }

    pub fn select_next(&mut self) {
        if !self.members.is_empty() {
            self.selected = (self.selected + 1).min(self.members.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayField {
    Label,
    Address,
}

/// Local label and wallet address override for a conversation
#[derive(Debug, Clone)]
pub struct RenameDisplayState {
    pub conversation_id: String,
    pub label: TextInput,
    pub address: TextInput,
    pub focus: DisplayField,
    pub error: Option<String>,
}

impl RenameDisplayState {
    pub fn new(conversation_id: &str, label: Option<&str>, address: Option<&str>) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            label: TextInput::with_text(label.unwrap_or_default()),
            address: TextInput::with_text(address.unwrap_or_default()),
            focus: DisplayField::Label,
            error: None,
        }
    }

    pub fn focused_input(&mut self) -> &mut TextInput {
        match self.focus {
            DisplayField::Label => &mut self.label,
            DisplayField::Address => &mut self.address,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            DisplayField::Label => DisplayField::Address,
            DisplayField::Address => DisplayField::Label,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachField {
    Path,
    Caption,
}

#[derive(Debug, Clone)]
pub struct AttachState {
    pub path: TextInput,
    pub caption: TextInput,
    pub focus: AttachField,
}

impl Default for AttachState {
    fn default() -> Self {
        Self {
            path: TextInput::new(),
            caption: TextInput::new(),
            focus: AttachField::Path,
        }
    }
}

impl AttachState {
    pub fn focused_input(&mut self) -> &mut TextInput {
        match self.focus {
            AttachField::Path => &mut self.path,
            AttachField::Caption => &mut self.caption,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            AttachField::Path => AttachField::Caption,
            AttachField::Caption => AttachField::Path,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(i: u32) -> String {
        format!("0x{:040x}", 0xb000 + i)
    }

    #[test]
    fn group_draft_collects_members() {
        let mut draft = NewGroupState::default();
        draft.member.set(&addr(1));
        draft.add_pending();
        assert_eq!(draft.pending.len(), 1);
        assert!(draft.member.is_empty());

        // duplicate, different case
        draft.member.set(&addr(1).to_uppercase().replacen("0X", "0x", 1));
        draft.add_pending();
        assert_eq!(draft.pending.len(), 1);
        assert!(draft.error.is_some());

        draft.member.set("not-an-address");
        draft.add_pending();
        assert!(draft.error.as_deref().unwrap().contains("not-an-address"));
    }

    #[test]
    fn group_submission_needs_another_member() {
        let mut draft = NewGroupState::default();
        assert!(draft.submission().is_none());
        assert!(draft.error.is_some());

        draft.member.set(&addr(1));
        draft.add_pending();
        draft.member.set(&addr(2));
        draft.add_pending();
        draft.name.set("  Friends ");
        let (addresses, metadata) = draft.submission().unwrap();
        assert_eq!(addresses, vec![addr(1), addr(2)]);
        assert_eq!(metadata.name.as_deref(), Some("Friends"));
        assert_eq!(metadata.description, None);
    }

    #[test]
    fn remove_selected_pending_member() {
        let mut draft = NewGroupState::default();
        for i in 1..=3 {
            draft.member.set(&addr(i));
            draft.add_pending();
        }
        draft.selected = 1;
        draft.remove_selected();
        assert_eq!(draft.pending.as_slice(), &[addr(1), addr(3)]);
    }

    #[test]
    fn member_draft_queues_until_full() {
        let mut draft = MemberDraft::for_group(248);
        assert!(draft.submission().is_none());

        draft.input.set(&addr(1));
        draft.add_pending();
        draft.input.set(&addr(2));
        draft.add_pending();
        assert_eq!(draft.pending.group_size(), 250);

        draft.input.set(&addr(3));
        draft.add_pending();
        assert!(draft.error.as_deref().unwrap().contains("251"));
        assert_eq!(draft.input.as_str(), addr(3));

        draft.remove_last();
        assert_eq!(draft.submission(), Some(vec![addr(1)]));
    }

    #[test]
    fn group_info_selection_is_clamped() {
        let mut info = GroupInfoState::new("g1", vec!["a".into(), "b".into(), "c".into()]);
        info.select_next();
        info.select_next();
        info.select_next();
        assert_eq!(info.selected_member(), Some("c"));
        info.set_members(vec!["a".into()]);
        assert_eq!(info.selected_member(), Some("a"));
    }

    #[test]
    fn group_name_input_is_limited() {
        let mut draft = NewGroupState::default();
        assert!(!draft.name.insert_str(&"x".repeat(MAX_GROUP_NAME_LENGTH + 1)));
    }
}
