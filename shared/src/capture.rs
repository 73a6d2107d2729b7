//! Microphone recording lifecycle.
//!
//! `Idle -> Requesting -> Recording -> Stopped -> Idle`. The controller never
//! talks to the device itself: it hands out session ids and tells the caller
//! when a `Release` must be issued. Once a session has been granted, every
//! path back to `Idle` goes through a release.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::{MicrophoneError, MicrophoneOutput, RECORDING_EXTENSION, RECORDING_MIME_TYPE};
use crate::model::{FileKind, RecordingId, StagedFile, UnixTimeMs};
use crate::{AppError, ErrorKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecorderState {
    #[default]
    Idle,
    Requesting,
    Recording,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("no audio was captured")]
    EmptyRecording,

    #[error(transparent)]
    Device(#[from] MicrophoneError),

    #[error("recorder answered a flush with {0}")]
    UnexpectedOutput(&'static str),
}

impl From<CaptureError> for AppError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::Device(inner) => inner.into(),
            CaptureError::EmptyRecording => {
                AppError::new(ErrorKind::Recording, "The recording is empty")
            }
            CaptureError::UnexpectedOutput(_) => {
                AppError::new(ErrorKind::Recording, "Recording failed").with_internal(e.to_string())
            }
        }
    }
}

/// What happened to a microphone grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The session is live and recording.
    Recording,
    /// Nobody is waiting for this session any more; release it right away.
    Abandoned,
}

/// Result of a finished stop. `release` must be sent to the device whatever
/// `file` holds.
#[derive(Debug)]
pub struct StopOutcome {
    pub release: RecordingId,
    pub file: Result<StagedFile, CaptureError>,
}

#[derive(Debug, Clone, Default)]
pub struct MediaCaptureController {
    state: RecorderState,
    session: Option<RecordingId>,
    chunks: Vec<Vec<u8>>,
    device_held: bool,
    sequence: u64,
    stopped_at: UnixTimeMs,
}

impl MediaCaptureController {
    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn session(&self) -> Option<RecordingId> {
        self.session
    }

    /// True while a granted stream has not been released yet.
    pub fn holds_device(&self) -> bool {
        self.device_held
    }

    pub fn buffered_bytes(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Opens a new session. `None` unless idle, so a second start while a
    /// request or recording is underway does nothing.
    pub fn begin_start(&mut self) -> Option<RecordingId> {
        if self.state != RecorderState::Idle {
            return None;
        }
        self.sequence += 1;
        let session = RecordingId(self.sequence);
        self.session = Some(session);
        self.chunks.clear();
        self.state = RecorderState::Requesting;
        Some(session)
    }

    pub fn access_granted(&mut self, session: RecordingId) -> GrantOutcome {
        if self.state != RecorderState::Requesting || self.session != Some(session) {
            return GrantOutcome::Abandoned;
        }
        self.device_held = true;
        self.state = RecorderState::Recording;
        GrantOutcome::Recording
    }

    /// Drops back to idle. `None` for a session that is no longer current.
    pub fn access_failed(&mut self, session: RecordingId, error: MicrophoneError) -> Option<AppError> {
        if self.state != RecorderState::Requesting || self.session != Some(session) {
            return None;
        }
        self.reset();
        Some(CaptureError::from(error).into())
    }

    /// Buffers one chunk in arrival order. Empty chunks and chunks from other
    /// sessions are dropped. The recorder emits its last data event after
    /// stop was requested, so chunks are still taken while `Stopped`.
    pub fn push_chunk(&mut self, session: RecordingId, data: Vec<u8>) -> bool {
        let accepting = matches!(self.state, RecorderState::Recording | RecorderState::Stopped);
        if !accepting || self.session != Some(session) || data.is_empty() {
            return false;
        }
        self.chunks.push(data);
        true
    }

    /// Valid only while recording; the caller then flushes the recorder.
    /// `at` is the shell's clock reading and names the sealed file.
    pub fn begin_stop(&mut self, at: UnixTimeMs) -> Option<RecordingId> {
        if self.state != RecorderState::Recording {
            return None;
        }
        self.state = RecorderState::Stopped;
        self.stopped_at = at;
        self.session
    }

    /// Seals the buffer into one audio file and gives the device back.
    /// `None` when the flush belongs to a session that was already torn down.
    pub fn finish_stop(
        &mut self,
        session: RecordingId,
        flushed: Result<MicrophoneOutput, MicrophoneError>,
    ) -> Option<StopOutcome> {
        if self.state != RecorderState::Stopped || self.session != Some(session) {
            return None;
        }

        let mut chunks = std::mem::take(&mut self.chunks);
        let file = match flushed {
            Ok(MicrophoneOutput::Flushed { trailing_chunks }) => {
                chunks.extend(
                    trailing_chunks
                        .into_iter()
                        .map(serde_bytes::ByteBuf::into_vec)
                        .filter(|c| !c.is_empty()),
                );
                seal(chunks, self.stopped_at)
            }
            Ok(MicrophoneOutput::Acquired) => Err(CaptureError::UnexpectedOutput("Acquired")),
            Err(e) => Err(CaptureError::Device(e)),
        };

        self.reset();
        Some(StopOutcome {
            release: session,
            file,
        })
    }

    /// Abandons whatever is in progress. Returns the session to release if
    /// the device was granted; a pending grant is released when it arrives.
    pub fn teardown(&mut self) -> Option<RecordingId> {
        let release = if self.device_held { self.session } else { None };
        self.reset();
        release
    }

    fn reset(&mut self) {
        self.state = RecorderState::Idle;
        self.session = None;
        self.chunks.clear();
        self.device_held = false;
    }
}

fn seal(chunks: Vec<Vec<u8>>, at: UnixTimeMs) -> Result<StagedFile, CaptureError> {
    if chunks.is_empty() {
        return Err(CaptureError::EmptyRecording);
    }
    let data = chunks.concat();
    Ok(StagedFile::new(
        FileKind::Audio,
        format!("recording-{}.{RECORDING_EXTENSION}", at.as_millis()),
        RECORDING_MIME_TYPE,
        data,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_bytes::ByteBuf;

    fn recording() -> (MediaCaptureController, RecordingId) {
        let mut capture = MediaCaptureController::default();
        let session = capture.begin_start().unwrap();
        assert_eq!(capture.access_granted(session), GrantOutcome::Recording);
        (capture, session)
    }

    fn flushed(chunks: &[&[u8]]) -> Result<MicrophoneOutput, MicrophoneError> {
        Ok(MicrophoneOutput::Flushed {
            trailing_chunks: chunks.iter().map(|c| ByteBuf::from(c.to_vec())).collect(),
        })
    }

    #[test]
    fn test_start_is_guarded_by_state() {
        let mut capture = MediaCaptureController::default();
        let session = capture.begin_start().unwrap();
        assert_eq!(capture.state(), RecorderState::Requesting);
        assert!(capture.begin_start().is_none());

        capture.access_granted(session);
        assert_eq!(capture.state(), RecorderState::Recording);
        assert!(capture.begin_start().is_none());
        assert_eq!(capture.session(), Some(session));
    }

    #[test]
    fn test_permission_denied_returns_to_idle() {
        let mut capture = MediaCaptureController::default();
        let session = capture.begin_start().unwrap();

        let error = capture
            .access_failed(session, MicrophoneError::PermissionDenied)
            .unwrap();
        assert_eq!(error.kind, ErrorKind::MicrophonePermissionDenied);
        assert_eq!(capture.state(), RecorderState::Idle);
        assert!(!capture.holds_device());
    }

    #[test]
    fn test_chunks_sealed_in_arrival_order() {
        let (mut capture, session) = recording();
        assert!(capture.push_chunk(session, b"ab".to_vec()));
        assert!(!capture.push_chunk(session, Vec::new()));
        assert!(capture.push_chunk(session, b"cd".to_vec()));
        assert_eq!(capture.buffered_bytes(), 4);

        assert_eq!(capture.begin_stop(UnixTimeMs(1_700_000_000_123)), Some(session));
        assert_eq!(capture.state(), RecorderState::Stopped);

        let outcome = capture.finish_stop(session, flushed(&[b"ef"])).unwrap();
        assert_eq!(outcome.release, session);

        let file = outcome.file.unwrap();
        assert_eq!(file.kind, FileKind::Audio);
        assert_eq!(file.name, "recording-1700000000123.wav");
        assert_eq!(file.mime_type, "audio/wav");
        assert_eq!(file.data, b"abcdef");

        assert_eq!(capture.state(), RecorderState::Idle);
        assert!(!capture.holds_device());
    }

    #[test]
    fn test_last_data_event_after_stop_is_kept() {
        let (mut capture, session) = recording();
        assert!(capture.push_chunk(session, b"ab".to_vec()));
        capture.begin_stop(UnixTimeMs(5));
        assert!(capture.push_chunk(session, b"cd".to_vec()));
        assert!(!capture.push_chunk(RecordingId(session.0 + 1), b"zz".to_vec()));

        let file = capture.finish_stop(session, flushed(&[])).unwrap().file.unwrap();
        assert_eq!(file.data, b"abcd");
        assert_eq!(file.name, "recording-5.wav");

        // nothing is buffered once the session is back to idle
        assert!(!capture.push_chunk(session, b"ef".to_vec()));
        assert_eq!(capture.buffered_bytes(), 0);
    }

    #[test]
    fn test_stop_releases_even_when_sealing_fails() {
        let (mut capture, session) = recording();
        assert!(capture.holds_device());
        capture.begin_stop(UnixTimeMs(1));

        let outcome = capture.finish_stop(session, flushed(&[])).unwrap();
        assert_matches!(outcome.file, Err(CaptureError::EmptyRecording));
        assert_eq!(outcome.release, session);
        assert!(!capture.holds_device());
        assert_eq!(capture.state(), RecorderState::Idle);
    }

    #[test]
    fn test_stop_releases_when_recorder_fails() {
        let (mut capture, session) = recording();
        capture.push_chunk(session, b"abc".to_vec());
        capture.begin_stop(UnixTimeMs(1));

        let outcome = capture
            .finish_stop(
                session,
                Err(MicrophoneError::RecorderFailed {
                    message: "encoder crashed".into(),
                }),
            )
            .unwrap();
        assert_matches!(outcome.file, Err(CaptureError::Device(_)));
        assert!(!capture.holds_device());
        assert_eq!(capture.buffered_bytes(), 0);
    }

    #[test]
    fn test_stop_only_from_recording() {
        let mut capture = MediaCaptureController::default();
        assert!(capture.begin_stop(UnixTimeMs(1)).is_none());
        capture.begin_start();
        assert!(capture.begin_stop(UnixTimeMs(1)).is_none());
        assert_eq!(capture.state(), RecorderState::Requesting);
    }

    #[test]
    fn test_late_grant_after_teardown_is_abandoned() {
        let mut capture = MediaCaptureController::default();
        let session = capture.begin_start().unwrap();
        assert_eq!(capture.teardown(), None);

        assert_eq!(capture.access_granted(session), GrantOutcome::Abandoned);
        assert!(!capture.holds_device());
        assert_eq!(capture.state(), RecorderState::Idle);
    }

    #[test]
    fn test_teardown_while_recording_releases() {
        let (mut capture, session) = recording();
        capture.push_chunk(session, b"abc".to_vec());

        assert_eq!(capture.teardown(), Some(session));
        assert!(!capture.holds_device());
        assert_eq!(capture.buffered_bytes(), 0);

        // the flush answer for the torn-down session changes nothing
        assert!(capture.finish_stop(session, flushed(&[b"x"])).is_none());
    }

    #[test]
    fn test_stale_events_are_ignored() {
        let (mut capture, session) = recording();
        let other = RecordingId(session.0 + 10);
        assert!(!capture.push_chunk(other, b"zz".to_vec()));
        assert!(capture.access_failed(other, MicrophoneError::PermissionDenied).is_none());
        assert_eq!(capture.state(), RecorderState::Recording);
    }

    #[test]
    fn test_sessions_are_unique() {
        let (mut capture, first) = recording();
        capture.begin_stop(UnixTimeMs(1));
        capture.finish_stop(first, flushed(&[b"a"]));
        let second = capture.begin_start().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_capture_error_conversion() {
        let error: AppError = CaptureError::EmptyRecording.into();
        assert_eq!(error.kind, ErrorKind::Recording);
        let error: AppError = CaptureError::Device(MicrophoneError::PermissionDenied).into();
        assert_eq!(error.kind, ErrorKind::MicrophonePermissionDenied);
    }
}
