use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const MAX_URL_LENGTH: usize = 2048;
const MAX_HEADER_VALUE_LENGTH: usize = 8192;
const MANAGED_HEADERS: [&str; 3] = ["host", "content-length", "transfer-encoding"];

/// Backend HTTP capability.
///
/// The shell performs the request and answers with `Ok(HttpResponse)` for
/// anything that came back from the server, whatever the status. `Err` is
/// reserved for transport failures. Status interpretation stays in the core.
pub struct Http<Ev> {
    context: CapabilityContext<HttpRequest, Ev>,
}

impl<Ev> Capability<Ev> for Http<Ev> {
    type Operation = HttpRequest;
    type MappedSelf<MappedEv> = Http<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Http::new(self.context.map_event(f))
    }
}

impl<Ev> Http<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<HttpRequest, Ev>) -> Self {
        Self { context }
    }

    /// Sends `request` once. No retry, no caching.
    pub fn send<F>(&self, request: HttpRequest, make_event: F)
    where
        F: FnOnce(HttpResult) -> Ev + Send + 'static,
        Ev: Send,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(request).await;
            ctx.update_app(make_event(result));
        });
    }
}

/// An absolute `http`/`https` URL with a host and no embedded credentials.
/// Stored in the normalized form `url` produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatedUrl {
    url: String,
    host: String,
}

impl ValidatedUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, HttpError> {
        let raw = url.into();
        let invalid = |reason: String| HttpError::InvalidUrl {
            url: shorten(&raw),
            reason,
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("URL cannot be empty".into()));
        }
        if raw.len() > MAX_URL_LENGTH {
            return Err(invalid(format!("longer than {MAX_URL_LENGTH} bytes")));
        }

        let parsed = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "invalid scheme '{}', only 'http' and 'https' are allowed",
                parsed.scheme()
            )));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(invalid("credentials in URL are not allowed".into()));
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| invalid("URL must have a host".into()))?
            .to_string();

        Ok(Self {
            url: parsed.into(),
            host,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

/// First 100 characters, for error messages.
fn shorten(url: &str) -> String {
    match url.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &url[..idx]),
        None => url.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpHeaders {
    headers: Vec<(String, String)>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing any earlier value regardless of case.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> Result<(), HttpError> {
        let value = value.into();
        let invalid = |reason: &str| HttpError::InvalidHeader {
            name: name.chars().take(50).collect(),
            reason: reason.to_string(),
        };

        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(invalid("header name must be a non-empty token"));
        }
        if MANAGED_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h)) {
            return Err(invalid("this header is set by the shell"));
        }
        if value.len() > MAX_HEADER_VALUE_LENGTH || value.contains(['\r', '\n', '\0']) {
            return Err(invalid("header value is too long or contains CR, LF or NUL"));
        }

        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Body encodings the backend accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Json,
    Multipart { boundary: String },
}

impl ContentType {
    pub fn header_value(&self) -> String {
        match self {
            ContentType::Json => "application/json".to_string(),
            ContentType::Multipart { boundary } => {
                format!("multipart/form-data; boundary={boundary}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    method: HttpMethod,
    url: ValidatedUrl,
    headers: HttpHeaders,
    #[serde(with = "serde_bytes")]
    body: Vec<u8>,
    request_id: String,
}

impl Operation for HttpRequest {
    type Output = HttpResult;
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: ValidatedUrl) -> Self {
        Self {
            method,
            url,
            headers: HttpHeaders::new(),
            body: Vec::new(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn get(url: impl Into<String>) -> Result<Self, HttpError> {
        Ok(Self::new(HttpMethod::Get, ValidatedUrl::new(url)?))
    }

    pub fn post(url: impl Into<String>) -> Result<Self, HttpError> {
        Ok(Self::new(HttpMethod::Post, ValidatedUrl::new(url)?))
    }

    pub fn delete(url: impl Into<String>) -> Result<Self, HttpError> {
        Ok(Self::new(HttpMethod::Delete, ValidatedUrl::new(url)?))
    }

    /// Only `POST` carries a body towards this backend.
    pub fn with_body(mut self, content_type: &ContentType, body: Vec<u8>) -> Result<Self, HttpError> {
        if self.method != HttpMethod::Post {
            return Err(HttpError::InvalidRequest {
                reason: format!("{} requests cannot carry a body", self.method.as_str()),
            });
        }
        self.headers.insert("Content-Type", content_type.header_value())?;
        self.body = body;
        Ok(self)
    }

    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self, HttpError> {
        let body = serde_json::to_vec(value).map_err(|e| HttpError::Serialization {
            message: e.to_string(),
        })?;
        self.with_body(&ContentType::Json, body)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &ValidatedUrl {
        &self.url
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum HttpError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Raised by the shell when no response arrived at all.
    #[error("transport failure: {message}")]
    Transport { message: String },

    #[error("HTTP error {status}")]
    Status {
        status: u16,
        #[serde(with = "serde_bytes")]
        body: Vec<u8>,
    },

    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    status: u16,
    #[serde(with = "serde_bytes")]
    body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(|e| HttpError::InvalidResponse {
            reason: format!("failed to parse JSON: {e}"),
        })
    }

    /// Turns a non-2xx response into `HttpError::Status`.
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HttpError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }
}

pub type HttpResult = Result<HttpResponse, HttpError>;
