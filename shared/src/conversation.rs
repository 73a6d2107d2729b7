//! Chat-style question/answer loop against the search endpoint.
//!
//! A [`ConversationStore`] owns one append-only log for one scope and allows
//! a single outstanding search at a time. [`ConversationRequestController`]
//! builds the search request and normalizes whatever the backend answers.

use serde::{Deserialize, Serialize};

use crate::capabilities::{HttpError, HttpRequest, HttpResult};
use crate::config::ClientConfig;
use crate::model::{ConversationScope, UnixTimeMs};
use crate::{AppError, ErrorKind};

pub const APOLOGY_TEXT: &str = "Sorry, I encountered an error while searching. Please try again.";
pub const NO_RESPONSE_TEXT: &str = "No response received";
pub const PENDING_TEXT: &str = "Searching...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// Where part of an answer came from. `label` is what gets shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub label: String,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    pub sources: Vec<SourceRef>,
    pub created_at: UnixTimeMs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEntry {
    Message(Message),
    /// Stands in for the assistant answer while the search is in flight.
    Pending { ticket: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchAnswer {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

/// Handed out by [`ConversationStore::submit`]; the ticket comes back with
/// the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub ticket: u64,
    pub query: String,
}

#[derive(Debug, Clone)]
pub struct ConversationStore {
    scope: ConversationScope,
    instance: u64,
    entries: Vec<LogEntry>,
    in_flight: Option<u64>,
    next_message_id: u64,
    next_ticket: u64,
}

impl ConversationStore {
    pub fn new(scope: ConversationScope, instance: u64) -> Self {
        Self {
            scope,
            instance,
            entries: Vec::new(),
            in_flight: None,
            next_message_id: 1,
            next_ticket: 1,
        }
    }

    pub fn scope(&self) -> &ConversationScope {
        &self.scope
    }

    /// Distinguishes this store from an earlier one opened for the same scope.
    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|entry| match entry {
            LogEntry::Message(message) => Some(message),
            LogEntry::Pending { .. } => None,
        })
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Appends the user message and a pending placeholder. `None` for blank
    /// input or while another search is outstanding; the log is untouched then.
    pub fn submit(&mut self, text: &str, now: UnixTimeMs) -> Option<PendingQuery> {
        let query = text.trim();
        if query.is_empty() || self.in_flight.is_some() {
            return None;
        }

        self.push_message(Role::User, query.to_string(), Vec::new(), now);

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.entries.push(LogEntry::Pending { ticket });
        self.in_flight = Some(ticket);

        Some(PendingQuery {
            ticket,
            query: query.to_string(),
        })
    }

    /// Swaps the placeholder for the answer, or for the apology on failure.
    /// Returns false for a ticket this store is not waiting on.
    pub fn resolve(
        &mut self,
        ticket: u64,
        outcome: Result<SearchAnswer, AppError>,
        now: UnixTimeMs,
    ) -> bool {
        if self.in_flight != Some(ticket) {
            return false;
        }
        self.in_flight = None;

        let Some(index) = self
            .entries
            .iter()
            .position(|entry| matches!(entry, LogEntry::Pending { ticket: t } if *t == ticket))
        else {
            return false;
        };
        self.entries.remove(index);

        let (text, sources) = match outcome {
            Ok(answer) => (answer.text, answer.sources),
            Err(_) => (APOLOGY_TEXT.to_string(), Vec::new()),
        };
        self.push_message(Role::Assistant, text, sources, now);
        true
    }

    fn push_message(&mut self, role: Role, text: String, sources: Vec<SourceRef>, now: UnixTimeMs) {
        let id = MessageId(self.next_message_id);
        self.next_message_id += 1;
        self.entries.push(LogEntry::Message(Message {
            id,
            role,
            text,
            sources,
            created_at: now,
        }));
    }
}

#[derive(Debug, Serialize)]
struct SearchRequestBody<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    case_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SearchResponseBody {
    #[serde(default)]
    response: Option<serde_json::Value>,
    #[serde(default)]
    answer: Option<serde_json::Value>,
    #[serde(default)]
    sources: Vec<WireSource>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireSource {
    Bare(String),
    Object {
        #[serde(default)]
        filename: Option<String>,
    },
}

impl WireSource {
    fn filename(self) -> Option<String> {
        let name = match self {
            Self::Bare(name) => Some(name),
            Self::Object { filename } => filename,
        };
        name.filter(|name| !name.trim().is_empty())
    }
}

/// Text out of a loosely typed answer field. Empty strings count as absent.
fn answer_text(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Issues search requests for a conversation. Holds no per-request state.
#[derive(Debug, Clone)]
pub struct ConversationRequestController {
    config: ClientConfig,
}

impl ConversationRequestController {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// `POST /search` with the query and, for a case scope, its id.
    pub fn ask(&self, text: &str, scope: &ConversationScope) -> Result<HttpRequest, HttpError> {
        let body = SearchRequestBody {
            query: text,
            case_id: scope.case_id().map(|id| id.as_str()),
        };
        HttpRequest::post(self.config.search_url()?)?.with_json(&body)
    }

    /// Normalizes the backend answer into one text and an ordered source list.
    pub fn interpret(result: HttpResult) -> Result<SearchAnswer, AppError> {
        let response = result?.error_for_status()?;
        let body: SearchResponseBody = response.json()?;

        let text = answer_text(body.response).or_else(|| answer_text(body.answer));
        if text.is_none() {
            if let Some(message) = body.error.filter(|m| !m.trim().is_empty()) {
                return Err(AppError::new(ErrorKind::Server, "Search failed").with_internal(message));
            }
        }

        let sources = body
            .sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| {
                let filename = source.filename();
                SourceRef {
                    label: filename
                        .clone()
                        .unwrap_or_else(|| format!("Document {}", index + 1)),
                    filename,
                }
            })
            .collect();

        Ok(SearchAnswer {
            text: text.unwrap_or_else(|| NO_RESPONSE_TEXT.to_string()),
            sources,
        })
    }
}
