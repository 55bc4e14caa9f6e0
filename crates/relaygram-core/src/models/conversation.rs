use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Decided by the network layer when the conversation is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationKind {
    Direct { peer_inbox_id: String },
    Group(GroupMetadata),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: String,
    pub kind: ConversationKind,
    /// Member inbox ids, including our own
    pub members: Vec<String>,
    pub created_at_ns: Option<i64>,
    pub last_message_at_ns: Option<i64>,
    pub last_message_preview: Option<String>,
}

impl Conversation {
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ConversationKind::Group(_))
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn peer_inbox_id(&self) -> Option<&str> {
        match &self.kind {
            ConversationKind::Direct { peer_inbox_id } => Some(peer_inbox_id),
            ConversationKind::Group(_) => None,
        }
    }

    pub fn group_metadata(&self) -> Option<&GroupMetadata> {
        match &self.kind {
            ConversationKind::Group(metadata) => Some(metadata),
            ConversationKind::Direct { .. } => None,
        }
    }

    pub fn has_member(&self, inbox_id: &str) -> bool {
        self.members.iter().any(|m| m == inbox_id)
    }

    /// Sort key for the conversation list: last activity, else creation, else 0.
    pub fn recency_ms(&self) -> i64 {
        self.last_message_at_ns
            .or(self.created_at_ns)
            .map(ns_to_ms)
            .unwrap_or(0)
    }
}

pub fn ns_to_ms(ns: i64) -> i64 {
    ns / 1_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(created: Option<i64>, last: Option<i64>) -> Conversation {
        Conversation {
            id: "c".into(),
            kind: ConversationKind::Direct {
                peer_inbox_id: "peer".into(),
            },
            members: vec!["me".into(), "peer".into()],
            created_at_ns: created,
            last_message_at_ns: last,
            last_message_preview: None,
        }
    }

    #[test]
    fn recency_prefers_last_message() {
        assert_eq!(
            conversation(Some(1_000_000), Some(9_000_000)).recency_ms(),
            9
        );
        assert_eq!(conversation(Some(4_000_000), None).recency_ms(), 4);
        assert_eq!(conversation(None, None).recency_ms(), 0);
    }

    #[test]
    fn kind_accessors() {
        let direct = conversation(None, None);
        assert!(!direct.is_group());
        assert_eq!(direct.peer_inbox_id(), Some("peer"));
        assert!(direct.group_metadata().is_none());
        assert!(direct.has_member("me"));

        let group = Conversation {
            kind: ConversationKind::Group(GroupMetadata {
                name: Some("Team".into()),
                description: None,
            }),
            ..direct
        };
        assert!(group.is_group());
        assert_eq!(
            group.group_metadata().and_then(|m| m.name.as_deref()),
            Some("Team")
        );
        assert!(group.peer_inbox_id().is_none());
    }
}
