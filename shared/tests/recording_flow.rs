mod common;

use assert_matches::assert_matches;
use common::{resolve_microphone, send, Tester};
use serde_bytes::ByteBuf;
use shared::capabilities::{MicrophoneError, MicrophoneOperation, MicrophoneOutput};
use shared::capture::RecorderState;
use shared::model::{FileKind, RecordingId, UnixTimeMs};
use shared::{ErrorKind, Event, Model};

const STOP_AT: UnixTimeMs = UnixTimeMs(1_700_000_000_321);

/// Starts a recording and grants the microphone.
fn start_recording(app: &Tester, model: &mut Model) -> RecordingId {
    let mut acquire = send(app, model, Event::RecordingStartRequested).only_microphone();
    let session = acquire.operation.session();
    assert_matches!(acquire.operation, MicrophoneOperation::Acquire { .. });
    assert_eq!(model.capture.state(), RecorderState::Requesting);

    let effects = resolve_microphone(app, model, &mut acquire, Ok(MicrophoneOutput::Acquired));
    assert_eq!(effects.releases(), 0);
    assert_eq!(model.capture.state(), RecorderState::Recording);
    assert!(model.capture.holds_device());
    session
}

#[test]
fn recording_is_staged_as_one_audio_file() {
    let app = Tester::default();
    let mut model = Model::default();
    let session = start_recording(&app, &mut model);

    for chunk in [b"RIFF".to_vec(), b"data".to_vec()] {
        send(&app, &mut model, Event::AudioChunkAvailable { session, data: chunk });
    }
    assert_eq!(app.view(&model).recorder.buffered_bytes, 8);

    let mut flush = send(&app, &mut model, Event::RecordingStopRequested { at: STOP_AT }).only_microphone();
    assert_eq!(flush.operation, MicrophoneOperation::Flush { session });
    assert_eq!(model.capture.state(), RecorderState::Stopped);

    let effects = resolve_microphone(
        &app,
        &mut model,
        &mut flush,
        Ok(MicrophoneOutput::Flushed {
            trailing_chunks: vec![ByteBuf::from(b"tail".to_vec())],
        }),
    );

    assert_eq!(effects.releases(), 1);
    assert_eq!(effects.microphone[0].operation, MicrophoneOperation::Release { session });
    assert!(!model.capture.holds_device());
    assert_eq!(model.capture.state(), RecorderState::Idle);

    let audio = model.staging.files(FileKind::Audio);
    assert_eq!(audio.len(), 1);
    assert_eq!(audio[0].data, b"RIFFdatatail");
    assert_eq!(audio[0].mime_type, "audio/wav");
    assert_eq!(audio[0].name, "recording-1700000000321.wav");
}

#[test]
fn data_event_fired_by_the_stop_is_kept() {
    let app = Tester::default();
    let mut model = Model::default();
    let session = start_recording(&app, &mut model);
    send(&app, &mut model, Event::AudioChunkAvailable { session, data: b"ab".to_vec() });

    let mut flush = send(&app, &mut model, Event::RecordingStopRequested { at: STOP_AT }).only_microphone();
    send(&app, &mut model, Event::AudioChunkAvailable { session, data: b"cd".to_vec() });

    let effects = resolve_microphone(
        &app,
        &mut model,
        &mut flush,
        Ok(MicrophoneOutput::Flushed {
            trailing_chunks: Vec::new(),
        }),
    );

    assert_eq!(effects.releases(), 1);
    let audio = model.staging.files(FileKind::Audio);
    assert_eq!(audio.len(), 1);
    assert_eq!(audio[0].data, b"abcd");
}

#[test]
fn empty_recording_still_releases_the_device() {
    let app = Tester::default();
    let mut model = Model::default();
    start_recording(&app, &mut model);

    let mut flush = send(&app, &mut model, Event::RecordingStopRequested { at: STOP_AT }).only_microphone();
    let effects = resolve_microphone(
        &app,
        &mut model,
        &mut flush,
        Ok(MicrophoneOutput::Flushed {
            trailing_chunks: Vec::new(),
        }),
    );

    assert_eq!(effects.releases(), 1);
    assert!(!model.capture.holds_device());
    assert!(model.staging.is_empty());
    assert_eq!(model.active_error.as_ref().unwrap().kind, ErrorKind::Recording);
}

#[test]
fn recorder_failure_on_stop_still_releases_the_device() {
    let app = Tester::default();
    let mut model = Model::default();
    let session = start_recording(&app, &mut model);
    send(&app, &mut model, Event::AudioChunkAvailable { session, data: b"abc".to_vec() });

    let mut flush = send(&app, &mut model, Event::RecordingStopRequested { at: STOP_AT }).only_microphone();
    let effects = resolve_microphone(
        &app,
        &mut model,
        &mut flush,
        Err(MicrophoneError::RecorderFailed {
            message: "encoder error".into(),
        }),
    );

    assert_eq!(effects.releases(), 1);
    assert!(!model.capture.holds_device());
    assert!(model.staging.is_empty());
}

#[test]
fn permission_denied_returns_to_idle() {
    let app = Tester::default();
    let mut model = Model::default();

    let mut acquire = send(&app, &mut model, Event::RecordingStartRequested).only_microphone();
    let effects = resolve_microphone(
        &app,
        &mut model,
        &mut acquire,
        Err(MicrophoneError::PermissionDenied),
    );

    assert_eq!(effects.releases(), 1);
    assert_eq!(model.capture.state(), RecorderState::Idle);
    assert!(!model.capture.holds_device());

    let error = app.view(&model).error.unwrap();
    assert_eq!(error.code, "MICROPHONE_PERMISSION_DENIED");
    assert_eq!(error.message, "Error accessing microphone. Please check permissions.");

    // a fresh start is possible right away
    let effects = send(&app, &mut model, Event::RecordingStartRequested);
    assert_eq!(effects.microphone.len(), 1);
}

#[test]
fn concurrent_start_is_ignored() {
    let app = Tester::default();
    let mut model = Model::default();
    start_recording(&app, &mut model);

    let effects = send(&app, &mut model, Event::RecordingStartRequested);
    assert!(effects.microphone.is_empty());
    assert_eq!(effects.renders, 0);
    assert_eq!(model.capture.state(), RecorderState::Recording);
}

#[test]
fn closing_the_panel_while_recording_releases() {
    let app = Tester::default();
    let mut model = Model::default();
    let session = start_recording(&app, &mut model);

    let effects = send(&app, &mut model, Event::CapturePanelClosed);
    assert_eq!(effects.releases(), 1);
    assert_eq!(effects.microphone[0].operation, MicrophoneOperation::Release { session });
    assert!(!model.capture.holds_device());
    assert_eq!(model.capture.state(), RecorderState::Idle);

    // chunks that were still on their way are dropped
    send(&app, &mut model, Event::AudioChunkAvailable { session, data: b"late".to_vec() });
    assert_eq!(model.capture.buffered_bytes(), 0);
}

#[test]
fn late_grant_after_panel_closed_is_released() {
    let app = Tester::default();
    let mut model = Model::default();

    let mut acquire = send(&app, &mut model, Event::RecordingStartRequested).only_microphone();
    let session = acquire.operation.session();

    let effects = send(&app, &mut model, Event::CapturePanelClosed);
    assert_eq!(effects.releases(), 0);

    let effects = resolve_microphone(&app, &mut model, &mut acquire, Ok(MicrophoneOutput::Acquired));
    assert_eq!(effects.releases(), 1);
    assert_eq!(effects.microphone[0].operation, MicrophoneOperation::Release { session });
    assert_eq!(model.capture.state(), RecorderState::Idle);
    assert!(!model.capture.holds_device());
}
