//! Local display-name overrides for conversations.
//!
//! The network only knows inbox ids, so users can attach a label or a
//! wallet address to a direct conversation. Overrides never leave this
//! machine and are stored as JSON in `<data_dir>/display_names.json`.
//!
//! # Invalidation
//! A missing, corrupt, or wrong-version file is treated as empty. The next
//! write replaces it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DISPLAY_NAMES_FILE, GROUP_FALLBACK_TITLE};
use crate::error::{CoreResult, StorageError, ValidationError};
use crate::models::{address, Conversation, ConversationKind};

/// Bump when `DisplayOverride` changes shape.
pub const DISPLAY_NAMES_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl DisplayOverride {
    fn is_empty(&self) -> bool {
        self.label.is_none() && self.address.is_none()
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    schema_version: u32,
    entries: BTreeMap<String, DisplayOverride>,
}

pub struct DisplayNameCache {
    path: PathBuf,
    entries: BTreeMap<String, DisplayOverride>,
}

impl DisplayNameCache {
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(DISPLAY_NAMES_FILE)
    }

    /// Never fails: unreadable files yield an empty cache.
    pub fn open(data_dir: &Path) -> Self {
        let path = Self::path_in(data_dir);
        let entries = match Self::load(&path) {
            Ok(Some(entries)) => entries,
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                tracing::warn!("display_names: discarding {}: {}", path.display(), err);
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    fn load(path: &Path) -> Result<Option<BTreeMap<String, DisplayOverride>>, StorageError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let envelope: Envelope = serde_json::from_slice(&bytes)?;
        if envelope.schema_version != DISPLAY_NAMES_SCHEMA_VERSION {
            tracing::info!(
                "display_names: schema version mismatch (stored={} current={}), discarding",
                envelope.schema_version,
                DISPLAY_NAMES_SCHEMA_VERSION
            );
            return Ok(None);
        }
        Ok(Some(envelope.entries))
    }

    /// Persist `entries`, then adopt them. A failed write leaves memory untouched.
    fn commit(&mut self, entries: BTreeMap<String, DisplayOverride>) -> Result<(), StorageError> {
        self.write(&entries)?;
        self.entries = entries;
        Ok(())
    }

    fn write(&self, entries: &BTreeMap<String, DisplayOverride>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let envelope = Envelope {
            schema_version: DISPLAY_NAMES_SCHEMA_VERSION,
            entries: entries.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;
        let temp_file = self.path.with_extension("json.tmp");
        std::fs::write(&temp_file, &bytes)?;
        std::fs::rename(&temp_file, &self.path)?;
        Ok(())
    }

    // ===== Getters =====

    pub fn get(&self, conversation_id: &str) -> Option<&DisplayOverride> {
        self.entries.get(conversation_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ===== Mutations =====

    /// Blank labels clear the label.
    pub fn set_label(&mut self, conversation_id: &str, label: &str) -> CoreResult<()> {
        let label = label.trim();
        let mut entries = self.entries.clone();
        let entry = entries.entry(conversation_id.to_string()).or_default();
        entry.label = (!label.is_empty()).then(|| label.to_string());
        if entry.is_empty() {
            entries.remove(conversation_id);
        }
        self.commit(entries)?;
        Ok(())
    }

    pub fn set_address(&mut self, conversation_id: &str, addr: &str) -> CoreResult<()> {
        let addr = addr.trim();
        if addr.is_empty() {
            return Err(ValidationError::MissingAddress.into());
        }
        if !address::is_valid_address(addr) {
            return Err(ValidationError::InvalidAddress(addr.to_string()).into());
        }
        let mut entries = self.entries.clone();
        entries.entry(conversation_id.to_string()).or_default().address = Some(addr.to_string());
        self.commit(entries)?;
        Ok(())
    }

    pub fn remove(&mut self, conversation_id: &str) -> CoreResult<bool> {
        if !self.entries.contains_key(conversation_id) {
            return Ok(false);
        }
        let mut entries = self.entries.clone();
        entries.remove(conversation_id);
        self.commit(entries)?;
        Ok(true)
    }
}

/// Title shown for a conversation in the list and chat header.
pub fn display_title(conversation: &Conversation, display: Option<&DisplayOverride>) -> String {
    match &conversation.kind {
        ConversationKind::Group(metadata) => metadata
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(GROUP_FALLBACK_TITLE)
            .to_string(),
        ConversationKind::Direct { peer_inbox_id } => {
            if let Some(label) = display.and_then(|d| d.label.as_deref()) {
                return label.to_string();
            }
            if let Some(addr) = display.and_then(|d| d.address.as_deref()) {
                return address::abbreviate_address(addr);
            }
            address::abbreviate_inbox_id(peer_inbox_id)
        }
    }
}
