//! Direct chat and group membership operations.
//!
//! Everything is validated and every address is resolved to an inbox id
//! before the first mutation, so a rejected request changes nothing.

use crate::constants::{
    DEFAULT_GROUP_NAME, MAX_GROUP_DESCRIPTION_LENGTH, MAX_GROUP_MEMBERS, MAX_GROUP_NAME_LENGTH,
    MIN_GROUP_MEMBERS,
};
use crate::error::{CoreResult, NetworkError, ValidationError};
use crate::events::{CoreEvent, EventBus};
use crate::models::{address, Conversation, GroupMetadata};
use crate::session::Session;

/// Draft member list behind the new-group and add-members forms.
///
/// Group size always counts every member, ourselves included. `existing`
/// is how many members the group already has: 1 for a new group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMembers {
    addresses: Vec<String>,
    existing: usize,
}

impl Default for PendingMembers {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            existing: 1,
        }
    }
}

impl PendingMembers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draft of additions to a group that has `member_count` members.
    pub fn for_group(member_count: usize) -> Self {
        Self {
            addresses: Vec::new(),
            existing: member_count,
        }
    }

    /// Returns the trimmed address that was added.
    pub fn add(&mut self, input: &str) -> Result<String, ValidationError> {
        let candidate = validate_address(input)?;
        if self
            .addresses
            .iter()
            .any(|a| address::addresses_equal(a, &candidate))
        {
            return Err(ValidationError::DuplicateMember(candidate));
        }
        if self.group_size() >= MAX_GROUP_MEMBERS {
            return Err(ValidationError::TooManyMembers {
                count: self.group_size() + 1,
            });
        }
        self.addresses.push(candidate.clone());
        Ok(candidate)
    }

    /// Members the group would have once the draft is applied.
    pub fn group_size(&self) -> usize {
        self.existing + self.addresses.len()
    }

    pub fn remove(&mut self, addr: &str) -> bool {
        let before = self.addresses.len();
        self.addresses.retain(|a| !address::addresses_equal(a, addr));
        self.addresses.len() != before
    }

    pub fn as_slice(&self) -> &[String] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn clear(&mut self) {
        self.addresses.clear();
    }

    /// True once there is something to submit and the resulting size is in bounds.
    pub fn is_ready(&self) -> bool {
        !self.addresses.is_empty() && validate_group_size(self.group_size()).is_ok()
    }
}

fn validate_address(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingAddress);
    }
    if !address::is_valid_address(trimmed) {
        return Err(ValidationError::InvalidAddress(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Every address valid, no case-insensitive duplicates. Returns trimmed addresses.
pub fn validate_addresses(addresses: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut seen: Vec<String> = Vec::with_capacity(addresses.len());
    for input in addresses {
        let addr = validate_address(input)?;
        if seen.iter().any(|s| address::addresses_equal(s, &addr)) {
            return Err(ValidationError::DuplicateMember(addr));
        }
        seen.push(addr);
    }
    Ok(seen)
}

/// `count` is the total membership, ourselves included.
pub fn validate_group_size(count: usize) -> Result<(), ValidationError> {
    if count < MIN_GROUP_MEMBERS {
        return Err(ValidationError::TooFewMembers { count });
    }
    if count > MAX_GROUP_MEMBERS {
        return Err(ValidationError::TooManyMembers { count });
    }
    Ok(())
}

pub fn validate_group_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().chars().count() > MAX_GROUP_NAME_LENGTH {
        return Err(ValidationError::NameTooLong);
    }
    Ok(())
}

pub fn validate_group_description(description: &str) -> Result<(), ValidationError> {
    if description.trim().chars().count() > MAX_GROUP_DESCRIPTION_LENGTH {
        return Err(ValidationError::DescriptionTooLong);
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct MembershipService {
    session: Session,
    events: EventBus,
}

impl MembershipService {
    pub fn new(session: Session, events: EventBus) -> Self {
        Self { session, events }
    }

    /// Open (or reuse) a direct conversation with `addr`.
    pub async fn start_direct(&self, addr: &str) -> CoreResult<Conversation> {
        let addr = validate_address(addr)?;
        let handle = self.session.handle();

        if !handle.can_message(&addr).await? {
            return Err(ValidationError::NotReachable(addr).into());
        }
        let inbox_id = handle
            .find_inbox_id(&addr)
            .await?
            .ok_or_else(|| ValidationError::NotReachable(addr.clone()))?;

        let conversation = handle.new_dm(&inbox_id).await?;
        self.settle(&conversation.id).await;
        tracing::info!(conversation_id = %conversation.id, peer = %addr, "Direct conversation ready");
        self.events.publish(CoreEvent::ConversationCreated {
            conversation_id: conversation.id.clone(),
        });
        Ok(conversation)
    }

    pub async fn create_group(
        &self,
        addresses: &[String],
        metadata: GroupMetadata,
    ) -> CoreResult<Conversation> {
        validate_group_size(addresses.len() + 1)?;
        let addresses = validate_addresses(addresses)?;
        if let Some(own) = addresses
            .iter()
            .find(|a| address::addresses_equal(a, &self.session.address))
        {
            return Err(ValidationError::DuplicateMember(own.clone()).into());
        }
        let name = non_blank(metadata.name);
        let description = non_blank(metadata.description);
        if let Some(name) = &name {
            validate_group_name(name)?;
        }
        if let Some(description) = &description {
            validate_group_description(description)?;
        }

        let inbox_ids = self.resolve_all(&addresses).await?;
        let metadata = GroupMetadata {
            name: Some(name.unwrap_or_else(|| DEFAULT_GROUP_NAME.to_string())),
            description,
        };

        let conversation = self
            .session
            .handle()
            .new_group(&inbox_ids, metadata)
            .await?;
        self.settle(&conversation.id).await;
        tracing::info!(
            conversation_id = %conversation.id,
            members = conversation.member_count(),
            "Group created"
        );
        self.events.publish(CoreEvent::ConversationCreated {
            conversation_id: conversation.id.clone(),
        });
        Ok(conversation)
    }

    pub async fn add_members(&self, conversation_id: &str, addresses: &[String]) -> CoreResult<()> {
        let addresses = validate_addresses(addresses)?;
        if addresses.is_empty() {
            return Err(ValidationError::MissingAddress.into());
        }
        let group = self.require_group(conversation_id).await?;
        let inbox_ids = self.resolve_all(&addresses).await?;

        let added = inbox_ids.iter().filter(|id| !group.has_member(id)).count();
        let resulting = group.member_count() + added;
        if resulting > MAX_GROUP_MEMBERS {
            return Err(ValidationError::TooManyMembers { count: resulting }.into());
        }

        self.session
            .handle()
            .add_members(conversation_id, &inbox_ids)
            .await?;
        self.changed(conversation_id).await;
        Ok(())
    }

    /// Remove members by wallet address.
    pub async fn remove_members(&self, conversation_id: &str, addresses: &[String]) -> CoreResult<()> {
        let addresses = validate_addresses(addresses)?;
        if addresses.is_empty() {
            return Err(ValidationError::MissingAddress.into());
        }
        self.require_group(conversation_id).await?;
        let inbox_ids = self.resolve_all(&addresses).await?;
        self.remove_inbox_ids(conversation_id, &inbox_ids).await
    }

    /// Remove members by inbox id, as listed in the group's member list.
    pub async fn remove_inbox_ids(&self, conversation_id: &str, inbox_ids: &[String]) -> CoreResult<()> {
        self.require_group(conversation_id).await?;
        self.session
            .handle()
            .remove_members(conversation_id, inbox_ids)
            .await?;
        self.changed(conversation_id).await;
        Ok(())
    }

    pub async fn update_name(&self, conversation_id: &str, name: &str) -> CoreResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        validate_group_name(name)?;
        self.require_group(conversation_id).await?;
        self.session
            .handle()
            .update_group_name(conversation_id, name)
            .await?;
        self.changed(conversation_id).await;
        Ok(())
    }

    pub async fn update_description(&self, conversation_id: &str, description: &str) -> CoreResult<()> {
        let description = description.trim();
        validate_group_description(description)?;
        self.require_group(conversation_id).await?;
        self.session
            .handle()
            .update_group_description(conversation_id, description)
            .await?;
        self.changed(conversation_id).await;
        Ok(())
    }

    /// Remove ourselves from a group.
    pub async fn leave(&self, conversation_id: &str) -> CoreResult<()> {
        self.require_group(conversation_id).await?;
        let own = vec![self.session.inbox_id.clone()];
        self.session
            .handle()
            .remove_members(conversation_id, &own)
            .await?;
        tracing::info!(conversation_id = %conversation_id, "Left group");
        self.events.publish(CoreEvent::MembershipChanged {
            conversation_id: conversation_id.to_string(),
        });
        Ok(())
    }

    async fn require_group(&self, conversation_id: &str) -> CoreResult<Conversation> {
        let conversation = self
            .session
            .handle()
            .get_conversation(conversation_id)
            .await?;
        if !conversation.is_group() {
            return Err(ValidationError::NotAGroup(conversation_id.to_string()).into());
        }
        Ok(conversation)
    }

    /// All-or-nothing address resolution.
    async fn resolve_all(&self, addresses: &[String]) -> CoreResult<Vec<String>> {
        let handle = self.session.handle();
        let mut inbox_ids = Vec::with_capacity(addresses.len());
        for addr in addresses {
            match handle.find_inbox_id(addr).await? {
                Some(inbox_id) => inbox_ids.push(inbox_id),
                None => {
                    tracing::warn!("Address not reachable on the network: {}", addr);
                    return Err(ValidationError::NotReachable(addr.clone()).into());
                }
            }
        }
        Ok(inbox_ids)
    }

    async fn settle(&self, conversation_id: &str) {
        if let Err(err) = self.session.handle().sync_conversation(conversation_id).await {
            log_sync_failure(conversation_id, &err);
        }
    }

    async fn changed(&self, conversation_id: &str) {
        self.settle(conversation_id).await;
        self.events.publish(CoreEvent::MembershipChanged {
            conversation_id: conversation_id.to_string(),
        });
    }
}

fn log_sync_failure(conversation_id: &str, err: &NetworkError) {
    tracing::warn!(conversation_id = %conversation_id, "Post-update sync failed: {}", err);
}
