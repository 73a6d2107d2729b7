use serde::{Deserialize, Serialize};

use crate::capture::RecorderState;
use crate::cases::{CaseDetailState, DetailTab};
use crate::config::ClientConfig;
use crate::conversation::{ConversationStore, LogEntry, Role, PENDING_TEXT};
use crate::model::{ConversationScope, FileKind, Model};
use crate::projection::{CaseSummary, ProjectedFile, ProjectedTask};
use crate::submission::{SubmissionOutcome, SubmissionPhase};
use crate::AppError;

pub const CASE_CHAT_PLACEHOLDER: &str = "Ask a question about this case...";
pub const GLOBAL_CHAT_PLACEHOLDER: &str = "Search across all cases...";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ViewModel {
    pub staging: StagingView,
    pub recorder: RecorderView,
    pub submission: SubmissionView,
    pub cases: CaseListView,
    pub detail: Option<CaseDetailView>,
    pub conversations: Vec<ConversationView>,
    pub error: Option<UserFacingError>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct StagingView {
    pub documents: Vec<StagedFileView>,
    pub audio: Vec<StagedFileView>,
    pub images: Vec<StagedFileView>,
    pub total_files: usize,
    pub can_submit: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StagedFileView {
    pub index: usize,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RecorderView {
    pub state: RecorderState,
    pub can_start: bool,
    pub can_stop: bool,
    pub buffered_bytes: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmissionView {
    pub busy: bool,
    pub progress: Option<String>,
    pub created_case_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct CaseListView {
    pub loading: bool,
    pub error: Option<String>,
    pub cases: Vec<CaseSummary>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CaseDetailView {
    pub case_id: String,
    pub created_at: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub active_tab: DetailTab,
    pub tabs: Vec<TabView>,
    pub documents: Vec<FileView>,
    pub audio: Vec<FileView>,
    pub images: Vec<FileView>,
    pub unclassified_files: Vec<FileView>,
    pub tasks: TasksView,
    pub is_deleting: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TabView {
    pub tab: DetailTab,
    pub label: String,
    pub count: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileView {
    #[serde(flatten)]
    pub file: ProjectedFile,
    /// Link target for download, `<audio>` or `<img>`.
    pub media_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TasksView {
    pub high: Vec<ProjectedTask>,
    pub medium: Vec<ProjectedTask>,
    pub low: Vec<ProjectedTask>,
    pub unclassified: Vec<ProjectedTask>,
    pub total: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConversationView {
    pub scope: ConversationScope,
    pub placeholder: String,
    pub awaiting_response: bool,
    pub entries: Vec<ChatEntryView>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatEntryView {
    pub id: Option<u64>,
    pub role: Role,
    pub text: String,
    pub sources: Vec<String>,
    pub pending: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserFacingError {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl From<&AppError> for UserFacingError {
    fn from(error: &AppError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.user_facing_message(),
            retryable: error.is_retryable(),
        }
    }
}

impl ViewModel {
    #[must_use]
    pub fn from_model(model: &Model) -> Self {
        Self {
            staging: staging_view(model),
            recorder: RecorderView {
                state: model.capture.state(),
                can_start: model.capture.state() == RecorderState::Idle,
                can_stop: model.capture.state() == RecorderState::Recording,
                buffered_bytes: model.capture.buffered_bytes(),
            },
            submission: submission_view(model.submission.phase()),
            cases: CaseListView {
                loading: model.cases.is_loading(),
                error: model.cases.error().map(AppError::user_facing_message),
                cases: model.cases.cases().to_vec(),
            },
            detail: model
                .cases
                .detail()
                .map(|detail| detail_view(detail, &model.config, model.cases.is_deleting(&detail.case_id))),
            conversations: conversation_views(model),
            error: model.active_error.as_ref().map(UserFacingError::from),
        }
    }
}

fn staging_view(model: &Model) -> StagingView {
    let files = |kind: FileKind| -> Vec<StagedFileView> {
        model
            .staging
            .files(kind)
            .iter()
            .enumerate()
            .map(|(index, file)| StagedFileView {
                index,
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
                size_bytes: file.size(),
            })
            .collect()
    };

    StagingView {
        documents: files(FileKind::Document),
        audio: files(FileKind::Audio),
        images: files(FileKind::Image),
        total_files: model.staging.len(),
        can_submit: !model.staging.is_empty() && !model.submission.is_busy(),
    }
}

fn submission_view(phase: &SubmissionPhase) -> SubmissionView {
    let (created_case_id, error) = match phase {
        SubmissionPhase::Done(SubmissionOutcome::Success(case)) => (Some(case.id.to_string()), None),
        SubmissionPhase::Done(SubmissionOutcome::Error(e)) => (None, Some(e.user_facing_message())),
        _ => (None, None),
    };
    SubmissionView {
        busy: matches!(
            phase,
            SubmissionPhase::Preparing | SubmissionPhase::Uploading | SubmissionPhase::Finalizing
        ),
        progress: phase.progress().map(str::to_string),
        created_case_id,
        error,
    }
}

fn detail_view(detail: &CaseDetailState, config: &ClientConfig, is_deleting: bool) -> CaseDetailView {
    let file_views = |files: &[ProjectedFile]| -> Vec<FileView> {
        files
            .iter()
            .map(|file| FileView {
                media_url: match (file.kind, &file.id) {
                    (Some(kind), Some(id)) => config.media_url(kind, id).ok(),
                    _ => None,
                },
                file: file.clone(),
            })
            .collect()
    };

    let projection = detail.projection.as_ref();
    let files = |kind: FileKind| projection.map(|p| file_views(p.files(kind))).unwrap_or_default();
    let tasks = projection
        .map(|p| TasksView {
            high: p.tasks_by_priority.high.clone(),
            medium: p.tasks_by_priority.medium.clone(),
            low: p.tasks_by_priority.low.clone(),
            unclassified: p.unclassified_tasks.clone(),
            total: p.total_tasks,
        })
        .unwrap_or_default();

    let documents = files(FileKind::Document);
    let audio = files(FileKind::Audio);
    let images = files(FileKind::Image);

    let tabs = DetailTab::ALL
        .iter()
        .map(|&tab| TabView {
            tab,
            label: tab.label().to_string(),
            count: match tab {
                DetailTab::Documents => documents.len(),
                DetailTab::Audio => audio.len(),
                DetailTab::Images => images.len(),
                DetailTab::Tasks => tasks.total,
            },
        })
        .collect();

    CaseDetailView {
        case_id: detail.case_id.to_string(),
        created_at: projection.and_then(|p| p.created_at.clone()),
        loading: detail.loading,
        error: detail.error.as_ref().map(AppError::user_facing_message),
        active_tab: detail.active_tab,
        tabs,
        documents,
        audio,
        images,
        unclassified_files: projection
            .map(|p| file_views(&p.unclassified_files))
            .unwrap_or_default(),
        tasks,
        is_deleting,
    }
}

fn conversation_views(model: &Model) -> Vec<ConversationView> {
    let mut stores: Vec<&ConversationStore> = model.conversations.values().collect();
    stores.sort_by_key(|store| store.instance());
    stores.into_iter().map(conversation_view).collect()
}

fn conversation_view(store: &ConversationStore) -> ConversationView {
    let placeholder = match store.scope() {
        ConversationScope::Global => GLOBAL_CHAT_PLACEHOLDER,
        ConversationScope::Case(_) => CASE_CHAT_PLACEHOLDER,
    };

    let entries = store
        .entries()
        .iter()
        .map(|entry| match entry {
            LogEntry::Message(message) => ChatEntryView {
                id: Some(message.id.0),
                role: message.role,
                text: message.text.clone(),
                sources: message.sources.iter().map(|s| s.label.clone()).collect(),
                pending: false,
            },
            LogEntry::Pending { .. } => ChatEntryView {
                id: None,
                role: Role::Assistant,
                text: PENDING_TEXT.to_string(),
                sources: Vec::new(),
                pending: true,
            },
        })
        .collect();

    ConversationView {
        scope: store.scope().clone(),
        placeholder: placeholder.to_string(),
        awaiting_response: store.is_awaiting_response(),
        entries,
    }
}
