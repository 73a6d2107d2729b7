//! Read-only projections of server-owned case payloads.
//!
//! Nothing here touches the network or the model. Every file and task of
//! the input lands in exactly one output bucket; values outside the known
//! tags go to the `unclassified_*` buckets instead of being dropped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{id_from_wire, opt_id_from_wire, CaseId, FileId, FileKind};

pub const DEFAULT_PROCESSING_STATUS: &str = "completed";
pub const DEFAULT_TASK_CATEGORY: &str = "general";
const UNNAMED_FILE: &str = "Unnamed file";
const UNTITLED_TASK: &str = "Untitled task";

// --- Wire payloads ---

/// `GET /case/{id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCaseDetail {
    pub case: RawCase,
    /// Grouped by `file_type` on the server side.
    #[serde(default)]
    pub files: BTreeMap<String, Vec<RawFile>>,
    #[serde(default)]
    pub tasks: RawTasks,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCase {
    #[serde(deserialize_with = "id_from_wire")]
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFile {
    #[serde(default, deserialize_with = "opt_id_from_wire")]
    pub id: Option<String>,
    #[serde(default, alias = "original_filename")]
    pub filename: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub processing_status: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub total_chunks: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawTasks {
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub by_priority: BTreeMap<String, Vec<RawTask>>,
    /// Every task of the case. When present it is the source of truth and
    /// `by_priority` is ignored, since the latter silently omits unknown
    /// priorities.
    #[serde(default)]
    pub all: Option<Vec<RawTask>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawTask {
    #[serde(default, deserialize_with = "opt_id_from_wire")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// `GET /cases`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCaseList {
    #[serde(default)]
    pub cases: Vec<RawCaseListItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCaseListItem {
    #[serde(deserialize_with = "id_from_wire")]
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub files: Vec<RawFileRef>,
    #[serde(default)]
    pub tasks: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawFileRef {
    #[serde(default)]
    pub file_type: Option<String>,
}

// --- Projections ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedFile {
    pub id: Option<FileId>,
    /// `None` for a `file_type` outside the known kinds.
    pub kind: Option<FileKind>,
    pub file_type: String,
    pub filename: String,
    pub created_at: Option<String>,
    pub file_size: Option<u64>,
    pub processing_status: String,
    pub content_preview: Option<String>,
    pub total_chunks: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedTask {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub priority: Option<TaskPriority>,
    /// The priority tag exactly as sent, kept for unclassified tasks.
    pub priority_tag: Option<String>,
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasksByPriority {
    pub high: Vec<ProjectedTask>,
    pub medium: Vec<ProjectedTask>,
    pub low: Vec<ProjectedTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDetailProjection {
    pub case_id: CaseId,
    pub created_at: Option<String>,
    pub documents: Vec<ProjectedFile>,
    pub audio: Vec<ProjectedFile>,
    pub images: Vec<ProjectedFile>,
    pub unclassified_files: Vec<ProjectedFile>,
    pub tasks_by_priority: TasksByPriority,
    pub unclassified_tasks: Vec<ProjectedTask>,
    pub total_tasks: usize,
}

impl CaseDetailProjection {
    #[must_use]
    pub fn files(&self, kind: FileKind) -> &[ProjectedFile] {
        match kind {
            FileKind::Document => &self.documents,
            FileKind::Audio => &self.audio,
            FileKind::Image => &self.images,
        }
    }

    pub fn file_count(&self) -> usize {
        self.documents.len() + self.audio.len() + self.images.len() + self.unclassified_files.len()
    }
}

/// Partitions a case-detail payload into file-kind and task-priority buckets.
#[must_use]
pub fn project(raw: &RawCaseDetail) -> CaseDetailProjection {
    let mut projection = CaseDetailProjection {
        case_id: CaseId::new(raw.case.id.clone()),
        created_at: raw.case.created_at.clone(),
        documents: Vec::new(),
        audio: Vec::new(),
        images: Vec::new(),
        unclassified_files: Vec::new(),
        tasks_by_priority: TasksByPriority::default(),
        unclassified_tasks: Vec::new(),
        total_tasks: 0,
    };

    for (group, files) in &raw.files {
        for file in files {
            let projected = project_file(group, file);
            let bucket = match projected.kind {
                Some(FileKind::Document) => &mut projection.documents,
                Some(FileKind::Audio) => &mut projection.audio,
                Some(FileKind::Image) => &mut projection.images,
                None => &mut projection.unclassified_files,
            };
            bucket.push(projected);
        }
    }

    let tasks: Vec<(Option<&str>, &RawTask)> = match &raw.tasks.all {
        Some(all) => all.iter().map(|task| (None, task)).collect(),
        None => raw
            .tasks
            .by_priority
            .iter()
            .flat_map(|(group, tasks)| tasks.iter().map(move |task| (Some(group.as_str()), task)))
            .collect(),
    };

    for (group, task) in tasks {
        let projected = project_task(group, task);
        let bucket = match projected.priority {
            Some(TaskPriority::High) => &mut projection.tasks_by_priority.high,
            Some(TaskPriority::Medium) => &mut projection.tasks_by_priority.medium,
            Some(TaskPriority::Low) => &mut projection.tasks_by_priority.low,
            None => &mut projection.unclassified_tasks,
        };
        bucket.push(projected);
        projection.total_tasks += 1;
    }

    projection
}

fn project_file(group: &str, file: &RawFile) -> ProjectedFile {
    let file_type = file
        .file_type
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| group.to_string());

    ProjectedFile {
        id: file.id.clone().map(FileId::new),
        kind: FileKind::from_tag(&file_type),
        file_type,
        filename: file
            .filename
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNNAMED_FILE.to_string()),
        created_at: file.created_at.clone(),
        file_size: file.file_size,
        processing_status: file
            .processing_status
            .clone()
            .unwrap_or_else(|| DEFAULT_PROCESSING_STATUS.to_string()),
        content_preview: file.content.clone(),
        total_chunks: file.total_chunks,
    }
}

fn project_task(group: Option<&str>, task: &RawTask) -> ProjectedTask {
    let priority_tag = task.priority.clone().or_else(|| group.map(str::to_string));

    ProjectedTask {
        id: task.id.clone(),
        title: task
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED_TASK.to_string()),
        description: task.description.clone().unwrap_or_default(),
        priority: priority_tag.as_deref().and_then(TaskPriority::from_tag),
        priority_tag,
        category: task
            .category
            .clone()
            .unwrap_or_else(|| DEFAULT_TASK_CATEGORY.to_string()),
    }
}

/// One row of the case list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSummary {
    pub id: CaseId,
    pub created_at: Option<String>,
    pub document_count: usize,
    pub audio_count: usize,
    pub image_count: usize,
    pub task_count: usize,
}

#[must_use]
pub fn summarize(item: &RawCaseListItem) -> CaseSummary {
    let count = |kind: FileKind| {
        item.files
            .iter()
            .filter(|f| f.file_type.as_deref() == Some(kind.tag()))
            .count()
    };

    CaseSummary {
        id: CaseId::new(item.id.clone()),
        created_at: item.created_at.clone(),
        document_count: count(FileKind::Document),
        audio_count: count(FileKind::Audio),
        image_count: count(FileKind::Image),
        task_count: item.tasks.len(),
    }
}
