//! Case list, case detail and case deletion.
//!
//! List fetches are tagged with a generation so only the newest one lands.
//! Detail results are kept only for the case that is still selected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::capabilities::{HttpRequest, HttpResult};
use crate::config::ClientConfig;
use crate::model::CaseId;
use crate::projection::{project, summarize, CaseDetailProjection, CaseSummary, RawCaseDetail, RawCaseList};
use crate::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailTab {
    #[default]
    Documents,
    Audio,
    Images,
    Tasks,
}

impl DetailTab {
    pub const ALL: [DetailTab; 4] = [Self::Documents, Self::Audio, Self::Images, Self::Tasks];

    pub fn label(self) -> &'static str {
        match self {
            Self::Documents => "Documents",
            Self::Audio => "Audio",
            Self::Images => "Images",
            Self::Tasks => "Tasks",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseDetailState {
    pub case_id: CaseId,
    pub loading: bool,
    pub projection: Option<CaseDetailProjection>,
    pub error: Option<AppError>,
    pub active_tab: DetailTab,
}

impl CaseDetailState {
    fn loading(case_id: CaseId) -> Self {
        Self {
            case_id,
            loading: true,
            projection: None,
            error: None,
            active_tab: DetailTab::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CaseBrowser {
    cases: Vec<CaseSummary>,
    loading: bool,
    error: Option<AppError>,
    generation: u64,
    detail: Option<CaseDetailState>,
    deleting: BTreeSet<CaseId>,
}

impl CaseBrowser {
    pub fn cases(&self) -> &[CaseSummary] {
        &self.cases
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    pub fn detail(&self) -> Option<&CaseDetailState> {
        self.detail.as_ref()
    }

    pub fn is_deleting(&self, case_id: &CaseId) -> bool {
        self.deleting.contains(case_id)
    }

    /// Starts a new list fetch; any earlier one still in flight becomes stale.
    pub fn refresh(&mut self, config: &ClientConfig) -> Result<(u64, HttpRequest), AppError> {
        let request = HttpRequest::get(config.cases_url(config.cases_page_size(), 0)?)?;
        self.generation += 1;
        self.loading = true;
        Ok((self.generation, request))
    }

    /// `None` when a newer fetch has been started since.
    pub fn apply_list(&mut self, generation: u64, result: HttpResult) -> Option<Result<usize, AppError>> {
        if generation != self.generation {
            return None;
        }
        self.loading = false;

        let parsed = result
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json::<RawCaseList>())
            .map_err(AppError::from);

        Some(match parsed {
            Ok(list) => {
                self.cases = list.cases.iter().map(summarize).collect();
                self.error = None;
                Ok(self.cases.len())
            }
            Err(e) => {
                self.error = Some(e.clone());
                Err(e)
            }
        })
    }

    /// Opens the detail for `case_id` in its loading state.
    pub fn select(&mut self, case_id: CaseId, config: &ClientConfig) -> Result<HttpRequest, AppError> {
        let request = HttpRequest::get(config.case_detail_url(&case_id)?)?;
        self.detail = Some(CaseDetailState::loading(case_id));
        Ok(request)
    }

    /// `None` when the detail was closed or another case was selected meanwhile.
    pub fn apply_detail(&mut self, case_id: &CaseId, result: HttpResult) -> Option<Result<(), AppError>> {
        let detail = self
            .detail
            .as_mut()
            .filter(|d| &d.case_id == case_id && d.loading)?;
        detail.loading = false;

        let parsed = result
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json::<RawCaseDetail>())
            .map_err(AppError::from);

        Some(match parsed {
            Ok(raw) => {
                detail.projection = Some(project(&raw));
                detail.error = None;
                Ok(())
            }
            Err(e) => {
                detail.error = Some(e.clone());
                Err(e)
            }
        })
    }

    pub fn close_detail(&mut self) -> Option<CaseId> {
        self.detail.take().map(|d| d.case_id)
    }

    pub fn select_tab(&mut self, tab: DetailTab) -> bool {
        match self.detail.as_mut() {
            Some(detail) if detail.active_tab != tab => {
                detail.active_tab = tab;
                true
            }
            _ => false,
        }
    }

    /// Builds the delete call. `None` if a delete for this case is already out.
    pub fn begin_delete(
        &mut self,
        case_id: &CaseId,
        config: &ClientConfig,
    ) -> Option<Result<HttpRequest, AppError>> {
        if self.deleting.contains(case_id) {
            return None;
        }
        let request = config
            .delete_case_url(case_id)
            .and_then(HttpRequest::delete)
            .map_err(AppError::from);
        if request.is_ok() {
            self.deleting.insert(case_id.clone());
        }
        Some(request)
    }

    /// Removes the case locally only after a 2xx. On success returns whether
    /// the open detail belonged to the deleted case and was closed.
    pub fn apply_delete(&mut self, case_id: &CaseId, result: HttpResult) -> Result<bool, AppError> {
        self.deleting.remove(case_id);
        result.and_then(|response| response.error_for_status())?;

        self.cases.retain(|c| &c.id != case_id);
        let closes_detail = self.detail.as_ref().is_some_and(|d| &d.case_id == case_id);
        if closes_detail {
            self.detail = None;
        }
        Ok(closes_detail)
    }
}
