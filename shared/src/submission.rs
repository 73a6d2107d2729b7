//! Case creation: drives the staged files through `POST /create_case/`.

use serde::{Deserialize, Serialize};

use crate::capabilities::{HttpRequest, HttpResult};
use crate::config::ClientConfig;
use crate::model::{opt_id_from_wire, CaseId};
use crate::staging::UploadStagingStore;
use crate::{AppError, ErrorKind};

pub const PROGRESS_PREPARING: &str = "Preparing files...";
pub const PROGRESS_UPLOADING: &str = "Uploading and processing files...";
pub const PROGRESS_FINALIZING: &str = "Generating AI tasks...";
pub const PROGRESS_SUCCESS: &str = "Case created successfully!";
pub const PROGRESS_FAILED: &str = "Error creating case. Please try again.";
pub const EMPTY_SUBMISSION_MESSAGE: &str =
    "Please add at least one file, audio recording, or image.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    Success(CreatedCase),
    Error(AppError),
}

/// Where a case submission stands.
///
/// `Preparing` and `Finalizing` only last for the update that enters them:
/// `submit` moves on to `Uploading` (or `Done`) and `complete` to `Done`
/// before the core renders. A render between submit and answer therefore
/// always shows `Uploading`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum SubmissionPhase {
    #[default]
    Idle,
    /// Building the multipart body.
    Preparing,
    /// Request is with the backend, which also generates the tasks.
    Uploading,
    /// Reading the backend's answer.
    Finalizing,
    Done(SubmissionOutcome),
}

impl SubmissionPhase {
    /// Advisory status line for the current phase.
    pub fn progress(&self) -> Option<&'static str> {
        match self {
            Self::Idle => None,
            Self::Preparing => Some(PROGRESS_PREPARING),
            Self::Uploading => Some(PROGRESS_UPLOADING),
            Self::Finalizing => Some(PROGRESS_FINALIZING),
            Self::Done(SubmissionOutcome::Success(_)) => Some(PROGRESS_SUCCESS),
            Self::Done(SubmissionOutcome::Error(_)) => Some(PROGRESS_FAILED),
        }
    }
}

/// The record returned for a freshly created case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedCase {
    pub id: CaseId,
    pub created_at: Option<String>,
    pub tasks_generated: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CreateCaseResponse {
    #[serde(default, deserialize_with = "opt_id_from_wire")]
    id: Option<String>,
    #[serde(default, deserialize_with = "opt_id_from_wire")]
    case_id: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    tasks: Option<TaskGenerationSummary>,
}

#[derive(Debug, Deserialize)]
struct TaskGenerationSummary {
    #[serde(default)]
    generated: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CaseSubmissionFlow {
    phase: SubmissionPhase,
}

impl CaseSubmissionFlow {
    pub fn phase(&self) -> &SubmissionPhase {
        &self.phase
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.phase,
            SubmissionPhase::Preparing | SubmissionPhase::Uploading | SubmissionPhase::Finalizing
        )
    }

    /// Builds the one case-creation request for the current staging.
    ///
    /// Empty staging is rejected locally and leaves the phase untouched;
    /// so does a submit while another one is in flight.
    pub fn submit(
        &mut self,
        staging: &UploadStagingStore,
        config: &ClientConfig,
    ) -> Result<HttpRequest, AppError> {
        if self.is_busy() {
            return Err(AppError::validation("A case is already being created."));
        }
        if staging.is_empty() {
            return Err(AppError::validation(EMPTY_SUBMISSION_MESSAGE));
        }

        self.phase = SubmissionPhase::Preparing;
        let (content_type, body) = staging.to_submission_payload().into_parts();

        let request = config
            .create_case_url()
            .and_then(HttpRequest::post)
            .and_then(|request| request.with_body(&content_type, body));

        match request {
            Ok(request) => {
                self.phase = SubmissionPhase::Uploading;
                Ok(request)
            }
            Err(e) => {
                let error = AppError::from(e);
                self.phase = SubmissionPhase::Done(SubmissionOutcome::Error(error.clone()));
                Err(error)
            }
        }
    }

    /// Applies the backend's answer. Staging is cleared only on success.
    /// `None` if no upload was in flight.
    pub fn complete(
        &mut self,
        result: HttpResult,
        staging: &mut UploadStagingStore,
    ) -> Option<Result<CreatedCase, AppError>> {
        if self.phase != SubmissionPhase::Uploading {
            return None;
        }
        self.phase = SubmissionPhase::Finalizing;

        let outcome = interpret_created_case(result);
        self.phase = SubmissionPhase::Done(match &outcome {
            Ok(case) => {
                staging.clear();
                SubmissionOutcome::Success(case.clone())
            }
            Err(e) => SubmissionOutcome::Error(e.clone()),
        });
        Some(outcome)
    }

    /// Back to `Idle` once the outcome has been seen. No-op while busy.
    pub fn reset(&mut self) {
        if !self.is_busy() {
            self.phase = SubmissionPhase::Idle;
        }
    }
}

fn interpret_created_case(result: HttpResult) -> Result<CreatedCase, AppError> {
    let response = result?.error_for_status()?;
    let body: CreateCaseResponse = response.json()?;

    if let Some(message) = body.error.filter(|m| !m.trim().is_empty()) {
        return Err(AppError::new(ErrorKind::BadRequest, message));
    }

    if let Some(reason) = body.tasks.as_ref().and_then(|t| t.error.as_deref()) {
        tracing::warn!(reason, "case created but task generation failed");
    }

    let id = body
        .id
        .or(body.case_id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            AppError::new(ErrorKind::InvalidResponse, "Unexpected response")
                .with_internal("created case carries no id")
        })?;

    Ok(CreatedCase {
        id: CaseId::new(id),
        created_at: body.created_at,
        tasks_generated: body.tasks.and_then(|t| t.generated),
    })
}
