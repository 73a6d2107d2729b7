//! Upload staging: three ordered collections of files waiting to become a case.

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::capabilities::ContentType;
use crate::model::{FileKind, StagedFile};

const FALLBACK_PART_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStagingStore {
    documents: Vec<StagedFile>,
    audio: Vec<StagedFile>,
    images: Vec<StagedFile>,
}

impl UploadStagingStore {
    /// Appends in the given order. No dedup and no validation: the file picker
    /// filters what can be selected.
    pub fn add(&mut self, kind: FileKind, files: impl IntoIterator<Item = StagedFile>) {
        self.bucket_mut(kind).extend(files.into_iter().map(|mut file| {
            file.kind = kind;
            file
        }));
    }

    /// Out-of-range indices are ignored.
    pub fn remove(&mut self, kind: FileKind, index: usize) -> Option<StagedFile> {
        let bucket = self.bucket_mut(kind);
        (index < bucket.len()).then(|| bucket.remove(index))
    }

    #[must_use]
    pub fn files(&self, kind: FileKind) -> &[StagedFile] {
        match kind {
            FileKind::Document => &self.documents,
            FileKind::Audio => &self.audio,
            FileKind::Image => &self.images,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.audio.is_empty() && self.images.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len() + self.audio.len() + self.images.len()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.audio.clear();
        self.images.clear();
    }

    #[must_use]
    pub fn to_submission_payload(&self) -> MultipartBody {
        let boundary = format!("----CaseFormBoundary{}", uuid::Uuid::new_v4().simple());
        self.to_submission_payload_with_boundary(boundary)
    }

    /// Every staged file as one `multipart/form-data` body, documents then
    /// audio then images, each kind in insertion order.
    #[must_use]
    pub fn to_submission_payload_with_boundary(&self, boundary: impl Into<String>) -> MultipartBody {
        let mut writer = MultipartWriter::new(boundary.into());
        for kind in FileKind::ALL {
            for file in self.files(kind) {
                writer.file_part(kind.form_field(), &file.name, &file.mime_type, &file.data);
            }
        }
        writer.finish()
    }

    fn bucket_mut(&mut self, kind: FileKind) -> &mut Vec<StagedFile> {
        match kind {
            FileKind::Document => &mut self.documents,
            FileKind::Audio => &mut self.audio,
            FileKind::Image => &mut self.images,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> ContentType {
        ContentType::Multipart {
            boundary: self.boundary.clone(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn into_parts(self) -> (ContentType, Vec<u8>) {
        let content_type = self.content_type();
        (content_type, self.body)
    }
}

struct MultipartWriter {
    boundary: String,
    buf: BytesMut,
}

impl MultipartWriter {
    fn new(boundary: String) -> Self {
        Self {
            boundary,
            buf: BytesMut::new(),
        }
    }

    fn file_part(&mut self, field: &str, filename: &str, mime_type: &str, data: &[u8]) {
        let mime_type = if mime_type.trim().is_empty() {
            FALLBACK_PART_MIME
        } else {
            mime_type
        };
        let header = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            self.boundary,
            escape_quoted(field),
            escape_quoted(filename),
            mime_type,
        );
        self.buf.reserve(header.len() + data.len() + 2);
        self.buf.put_slice(header.as_bytes());
        self.buf.put_slice(data);
        self.buf.put_slice(b"\r\n");
    }

    fn finish(mut self) -> MultipartBody {
        self.buf.put_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        MultipartBody {
            boundary: self.boundary,
            body: self.buf.to_vec(),
        }
    }
}

/// Percent-escapes the characters that would break a quoted header parameter,
/// the way browsers encode form-data filenames.
fn escape_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("%22"),
            '\r' => out.push_str("%0D"),
            '\n' => out.push_str("%0A"),
            _ => out.push(c),
        }
    }
    out
}
