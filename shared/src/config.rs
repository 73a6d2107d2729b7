//! Client configuration.
//!
//! Built once at startup and passed by reference to everything that talks
//! to the backend. There is no global API base.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::capabilities::{HttpError, ValidatedUrl};
use crate::model::{CaseId, FileId, FileKind};
use crate::DEFAULT_CASES_PAGE_SIZE;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const BASE_URL_ENV: &str = "CASE_API_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    base_url: String,
    cases_page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cases_page_size: DEFAULT_CASES_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Result<Self, HttpError> {
        let validated = ValidatedUrl::new(base_url)?;
        Ok(Self {
            base_url: validated.as_str().trim_end_matches('/').to_string(),
            cases_page_size: DEFAULT_CASES_PAGE_SIZE,
        })
    }

    /// Reads `CASE_API_BASE_URL`, falling back to the default backend.
    pub fn from_env() -> Result<Self, HttpError> {
        match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(url),
            _ => Ok(Self::default()),
        }
    }

    #[must_use]
    pub fn with_cases_page_size(mut self, size: u32) -> Self {
        self.cases_page_size = size.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cases_page_size(&self) -> u32 {
        self.cases_page_size
    }

    pub fn create_case_url(&self) -> Result<String, HttpError> {
        self.url(&["create_case", ""], &[])
    }

    pub fn cases_url(&self, limit: u32, offset: u32) -> Result<String, HttpError> {
        self.url(
            &["cases"],
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
    }

    pub fn case_detail_url(&self, case_id: &CaseId) -> Result<String, HttpError> {
        self.url(&["case", case_id.as_str()], &[])
    }

    pub fn delete_case_url(&self, case_id: &CaseId) -> Result<String, HttpError> {
        self.url(&["cases", case_id.as_str()], &[])
    }

    pub fn search_url(&self) -> Result<String, HttpError> {
        self.url(&["search"], &[])
    }

    /// Direct link for a stored file; consumed by native link/media tags.
    pub fn media_url(&self, kind: FileKind, file_id: &FileId) -> Result<String, HttpError> {
        let prefix = match kind {
            FileKind::Document => "download",
            FileKind::Audio => "audio",
            FileKind::Image => "image",
        };
        self.url(&[prefix, file_id.as_str()], &[])
    }

    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<String, HttpError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| HttpError::InvalidUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        {
            let mut path = url.path_segments_mut().map_err(|()| HttpError::InvalidUrl {
                url: self.base_url.clone(),
                reason: "base URL cannot carry a path".to_string(),
            })?;
            path.pop_if_empty().extend(segments);
        }

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url.into())
    }
}
