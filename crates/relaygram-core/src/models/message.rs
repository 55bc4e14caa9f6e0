use serde::{Deserialize, Serialize};

/// Reference to an uploaded file, sent as a JSON message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub cid: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireBody {
    File(FilePayload),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    File(FilePayload),
}

impl MessageContent {
    /// Bodies that parse as a file object become `File`; anything else is text.
    pub fn decode(body: &str) -> Self {
        if body.trim_start().starts_with('{') {
            if let Ok(WireBody::File(payload)) = serde_json::from_str::<WireBody>(body) {
                return MessageContent::File(payload);
            }
        }
        MessageContent::Text(body.to_string())
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        match self {
            MessageContent::Text(text) => Ok(text.clone()),
            MessageContent::File(payload) => {
                serde_json::to_string(&WireBody::File(payload.clone()))
            }
        }
    }

    /// Single-line summary used in conversation previews.
    pub fn preview_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::File(payload) => match &payload.caption {
                Some(caption) if !caption.trim().is_empty() => {
                    format!("[file] {} {}", payload.name, caption)
                }
                _ => format!("[file] {}", payload.name),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_inbox_id: String,
    pub sent_at_ns: i64,
    pub content: MessageContent,
}

impl Message {
    pub fn is_from(&self, inbox_id: &str) -> bool {
        self.sender_inbox_id == inbox_id
    }
}

/// Oldest first. Stable, so equal timestamps keep network order.
pub fn sort_by_sent_at(messages: &mut [Message]) {
    messages.sort_by_key(|m| m.sent_at_ns);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> FilePayload {
        FilePayload {
            cid: "bafy123".into(),
            name: "report.pdf".into(),
            size: 2048,
            mime_type: "application/pdf".into(),
            caption: Some("Q3 numbers".into()),
        }
    }

    #[test]
    fn file_payload_wire_format() {
        let body = MessageContent::File(payload()).encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["type"], "file");
        assert_eq!(value["mimeType"], "application/pdf");
        assert_eq!(value["size"], 2048);
        assert_eq!(MessageContent::decode(&body), MessageContent::File(payload()));
    }

    #[test]
    fn non_file_json_is_text() {
        for body in ["{\"type\":\"image\"}", "{not json", "hello", "{\"cid\":\"x\"}"] {
            assert_eq!(
                MessageContent::decode(body),
                MessageContent::Text(body.to_string())
            );
        }
    }

    #[test]
    fn preview_mentions_file_name() {
        let mut p = payload();
        assert_eq!(
            MessageContent::File(p.clone()).preview_text(),
            "[file] report.pdf Q3 numbers"
        );
        p.caption = None;
        assert_eq!(MessageContent::File(p).preview_text(), "[file] report.pdf");
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let msg = |id: &str, at: i64| Message {
            id: id.into(),
            conversation_id: "c".into(),
            sender_inbox_id: "s".into(),
            sent_at_ns: at,
            content: MessageContent::Text(id.into()),
        };
        let mut messages = vec![msg("c", 3), msg("a", 1), msg("b1", 2), msg("b2", 2)];
        sort_by_sent_at(&mut messages);
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b1", "b2", "c"]);
    }
}
