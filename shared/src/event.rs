use serde::{Deserialize, Serialize};

use crate::capabilities::{HttpResult, MicrophoneResult};
use crate::cases::DetailTab;
use crate::model::{CaseId, ConversationScope, FileKind, RecordingId, SelectedFile, UnixTimeMs};

/// Everything that can happen to the core.
///
/// Variants marked `#[serde(skip)]` are capability completions; only the
/// core raises them. Events that need a wall-clock time carry the shell's
/// reading in `at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Noop,

    /// Optional backend override, honoured only before the first request.
    AppStarted {
        base_url: Option<String>,
    },

    // Staging
    FilesSelected {
        kind: FileKind,
        files: Vec<SelectedFile>,
    },
    StagedFileRemoved {
        kind: FileKind,
        index: usize,
    },

    // Recording
    RecordingStartRequested,
    #[serde(skip)]
    MicrophoneAcquired {
        session: RecordingId,
        result: MicrophoneResult,
    },
    /// Pushed by the shell for every recorder data event.
    AudioChunkAvailable {
        session: RecordingId,
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
    },
    RecordingStopRequested {
        at: UnixTimeMs,
    },
    #[serde(skip)]
    RecorderFlushed {
        session: RecordingId,
        result: MicrophoneResult,
    },
    CapturePanelClosed,

    // Case creation
    CaseSubmitRequested,
    #[serde(skip)]
    CaseCreated(Box<HttpResult>),
    SubmissionStatusDismissed,

    // Case list & detail
    CasesRefreshRequested,
    #[serde(skip)]
    CasesLoaded {
        generation: u64,
        result: Box<HttpResult>,
    },
    CaseSelected {
        case_id: CaseId,
    },
    #[serde(skip)]
    CaseDetailLoaded {
        case_id: CaseId,
        result: Box<HttpResult>,
    },
    CaseDetailClosed,
    DetailTabSelected {
        tab: DetailTab,
    },
    CaseDeleteRequested {
        case_id: CaseId,
    },
    #[serde(skip)]
    CaseDeleteConfirmed {
        case_id: CaseId,
        confirmed: bool,
    },
    #[serde(skip)]
    CaseDeleted {
        case_id: CaseId,
        result: Box<HttpResult>,
    },

    // Conversations
    ConversationOpened {
        scope: ConversationScope,
    },
    ConversationClosed {
        scope: ConversationScope,
    },
    ChatMessageSubmitted {
        scope: ConversationScope,
        text: String,
        at: UnixTimeMs,
    },
    #[serde(skip)]
    SearchAnswered {
        scope: ConversationScope,
        instance: u64,
        ticket: u64,
        result: Box<HttpResult>,
    },

    DismissError,
}

impl Event {
    /// Stable name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::AppStarted { .. } => "app_started",
            Self::FilesSelected { .. } => "files_selected",
            Self::StagedFileRemoved { .. } => "staged_file_removed",
            Self::RecordingStartRequested => "recording_start_requested",
            Self::MicrophoneAcquired { .. } => "microphone_acquired",
            Self::AudioChunkAvailable { .. } => "audio_chunk_available",
            Self::RecordingStopRequested { .. } => "recording_stop_requested",
            Self::RecorderFlushed { .. } => "recorder_flushed",
            Self::CapturePanelClosed => "capture_panel_closed",
            Self::CaseSubmitRequested => "case_submit_requested",
            Self::CaseCreated(_) => "case_created",
            Self::SubmissionStatusDismissed => "submission_status_dismissed",
            Self::CasesRefreshRequested => "cases_refresh_requested",
            Self::CasesLoaded { .. } => "cases_loaded",
            Self::CaseSelected { .. } => "case_selected",
            Self::CaseDetailLoaded { .. } => "case_detail_loaded",
            Self::CaseDetailClosed => "case_detail_closed",
            Self::DetailTabSelected { .. } => "detail_tab_selected",
            Self::CaseDeleteRequested { .. } => "case_delete_requested",
            Self::CaseDeleteConfirmed { .. } => "case_delete_confirmed",
            Self::CaseDeleted { .. } => "case_deleted",
            Self::ConversationOpened { .. } => "conversation_opened",
            Self::ConversationClosed { .. } => "conversation_closed",
            Self::ChatMessageSubmitted { .. } => "chat_message_submitted",
            Self::SearchAnswered { .. } => "search_answered",
            Self::DismissError => "dismiss_error",
        }
    }

    /// Events raised by the shell rather than by a capability completion.
    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::FilesSelected { .. }
                | Self::StagedFileRemoved { .. }
                | Self::RecordingStartRequested
                | Self::RecordingStopRequested { .. }
                | Self::CapturePanelClosed
                | Self::CaseSubmitRequested
                | Self::SubmissionStatusDismissed
                | Self::CasesRefreshRequested
                | Self::CaseSelected { .. }
                | Self::CaseDetailClosed
                | Self::DetailTabSelected { .. }
                | Self::CaseDeleteRequested { .. }
                | Self::ConversationOpened { .. }
                | Self::ConversationClosed { .. }
                | Self::ChatMessageSubmitted { .. }
                | Self::DismissError
        )
    }
}
