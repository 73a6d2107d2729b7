use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::capture::MediaCaptureController;
use crate::cases::CaseBrowser;
use crate::config::ClientConfig;
use crate::conversation::ConversationStore;
use crate::staging::UploadStagingStore;
use crate::submission::CaseSubmissionFlow;
use crate::AppError;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(CaseId);
typed_id!(FileId);

/// Backend ids arrive as strings or integers depending on the table.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(s) => s,
            WireId::Signed(n) => n.to_string(),
            WireId::Unsigned(n) => n.to_string(),
        }
    }
}

pub(crate) fn id_from_wire<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    WireId::deserialize(deserializer).map(String::from)
}

pub(crate) fn opt_id_from_wire<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<WireId>::deserialize(deserializer).map(|id| id.map(String::from))
}

/// Identifies one microphone session from `Acquire` to `Release`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordingId(pub u64);

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec-{}", self.0)
    }
}

/// Explicit timestamp unit. Always read from the shell; the browser target
/// has no system clock.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

// --- Staged files ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Document,
    Audio,
    Image,
}

impl FileKind {
    pub const ALL: [FileKind; 3] = [FileKind::Document, FileKind::Audio, FileKind::Image];

    /// Multipart field name expected by `POST /create_case/`.
    #[must_use]
    pub const fn form_field(self) -> &'static str {
        match self {
            Self::Document => "files",
            Self::Audio => "audio_files",
            Self::Image => "image_files",
        }
    }

    /// The `file_type` tag the backend stores on each file.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Image => "image",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "document" => Some(Self::Document),
            "audio" => Some(Self::Audio),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A file picked by the user, as handed over by the shell.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StagedFile {
    pub kind: FileKind,
    pub name: String,
    pub mime_type: String,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl StagedFile {
    pub fn new(
        kind: FileKind,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    #[must_use]
    pub fn from_selected(kind: FileKind, file: SelectedFile) -> Self {
        Self::new(kind, file.name, file.mime_type, file.data)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

// --- Conversations ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "case_id", rename_all = "snake_case")]
pub enum ConversationScope {
    Global,
    Case(CaseId),
}

impl ConversationScope {
    #[must_use]
    pub fn case_id(&self) -> Option<&CaseId> {
        match self {
            Self::Global => None,
            Self::Case(id) => Some(id),
        }
    }
}

impl fmt::Display for ConversationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Case(id) => write!(f, "case:{id}"),
        }
    }
}

pub struct Model {
    pub config: ClientConfig,
    /// Set once the first request goes out; the config is read-only from then on.
    pub config_locked: bool,
    pub staging: UploadStagingStore,
    pub capture: MediaCaptureController,
    pub submission: CaseSubmissionFlow,
    pub cases: CaseBrowser,
    pub conversations: HashMap<ConversationScope, ConversationStore>,
    pub next_conversation_instance: u64,
    pub active_error: Option<AppError>,
    /// Latest time reported by the shell. Never moves backwards.
    pub clock: UnixTimeMs,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            config: ClientConfig::default(),
            config_locked: false,
            staging: UploadStagingStore::default(),
            capture: MediaCaptureController::default(),
            submission: CaseSubmissionFlow::default(),
            cases: CaseBrowser::default(),
            conversations: HashMap::new(),
            next_conversation_instance: 1,
            active_error: None,
            clock: UnixTimeMs::default(),
        }
    }
}

impl Model {
    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    /// Records a shell clock reading and returns the current time.
    pub fn observe_time(&mut self, at: UnixTimeMs) -> UnixTimeMs {
        self.clock = self.clock.max(at);
        self.clock
    }

    /// Opens a conversation for `scope`, keeping the existing one if already open.
    pub fn open_conversation(&mut self, scope: ConversationScope) -> &mut ConversationStore {
        let instance = self.next_conversation_instance;
        let store = self
            .conversations
            .entry(scope.clone())
            .or_insert_with(|| ConversationStore::new(scope, instance));
        if store.instance() == instance {
            self.next_conversation_instance += 1;
        }
        store
    }

    pub fn close_conversation(&mut self, scope: &ConversationScope) -> bool {
        self.conversations.remove(scope).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_tags() {
        for kind in FileKind::ALL {
            assert_eq!(FileKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(FileKind::from_tag("video"), None);
        assert_eq!(FileKind::Document.form_field(), "files");
        assert_eq!(FileKind::Audio.form_field(), "audio_files");
        assert_eq!(FileKind::Image.form_field(), "image_files");
    }

    #[test]
    fn test_ids_accept_strings_and_numbers() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(deserialize_with = "id_from_wire")]
            id: String,
            #[serde(default, deserialize_with = "opt_id_from_wire")]
            parent: Option<String>,
        }

        let row: Row = serde_json::from_str(r#"{"id": 42, "parent": "abc"}"#).unwrap();
        assert_eq!(row.id, "42");
        assert_eq!(row.parent.as_deref(), Some("abc"));

        let row: Row = serde_json::from_str(r#"{"id": "c-1", "parent": null}"#).unwrap();
        assert_eq!(row.id, "c-1");
        assert_eq!(row.parent, None);

        let row: Row = serde_json::from_str(r#"{"id": "c-2"}"#).unwrap();
        assert_eq!(row.parent, None);
    }

    #[test]
    fn test_scope_case_id() {
        assert_eq!(ConversationScope::Global.case_id(), None);
        let scope = ConversationScope::Case(CaseId::new("c1"));
        assert_eq!(scope.case_id().map(CaseId::as_str), Some("c1"));
        assert_eq!(scope.to_string(), "case:c1");
    }

    #[test]
    fn test_open_conversation_is_idempotent() {
        let mut model = Model::default();
        let first = model.open_conversation(ConversationScope::Global).instance();
        let again = model.open_conversation(ConversationScope::Global).instance();
        assert_eq!(first, again);

        let other = model
            .open_conversation(ConversationScope::Case(CaseId::new("c1")))
            .instance();
        assert_ne!(first, other);
    }

    #[test]
    fn test_clock_never_moves_backwards() {
        let mut model = Model::default();
        assert_eq!(model.observe_time(UnixTimeMs(500)), UnixTimeMs(500));
        assert_eq!(model.observe_time(UnixTimeMs(200)), UnixTimeMs(500));
        assert_eq!(model.observe_time(UnixTimeMs(900)), UnixTimeMs(900));
        assert_eq!(model.clock, UnixTimeMs(900));
    }

    #[test]
    fn test_reopened_conversation_gets_fresh_instance() {
        let mut model = Model::default();
        let first = model.open_conversation(ConversationScope::Global).instance();
        assert!(model.close_conversation(&ConversationScope::Global));
        let second = model.open_conversation(ConversationScope::Global).instance();
        assert_ne!(first, second);
    }
}
