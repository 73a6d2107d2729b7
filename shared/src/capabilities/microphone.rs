use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::RecordingId;

pub const RECORDING_MIME_TYPE: &str = "audio/wav";
pub const RECORDING_EXTENSION: &str = "wav";

pub struct Microphone<E> {
    context: CapabilityContext<MicrophoneOperation, E>,
}

impl<Ev> Capability<Ev> for Microphone<Ev> {
    type Operation = MicrophoneOperation;
    type MappedSelf<MappedEv> = Microphone<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Microphone::new(self.context.map_event(f))
    }
}

impl<E> Microphone<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<MicrophoneOperation, E>) -> Self {
        Self { context }
    }

    /// Asks for microphone permission, opens the stream and starts the recorder.
    pub fn acquire<F>(&self, session: RecordingId, callback: F)
    where
        F: FnOnce(MicrophoneResult) -> E + Send + 'static,
        E: Send,
    {
        self.request(MicrophoneOperation::Acquire { session }, callback);
    }

    /// Stops the recorder; the shell answers with whatever chunks it still held.
    pub fn flush<F>(&self, session: RecordingId, callback: F)
    where
        F: FnOnce(MicrophoneResult) -> E + Send + 'static,
        E: Send,
    {
        self.request(MicrophoneOperation::Flush { session }, callback);
    }

    /// Stops every track of the stream. Fire-and-forget.
    pub fn release(&self, session: RecordingId) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(MicrophoneOperation::Release { session }).await;
        });
    }

    fn request<F>(&self, operation: MicrophoneOperation, callback: F)
    where
        F: FnOnce(MicrophoneResult) -> E + Send + 'static,
        E: Send,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(operation).await;
            ctx.update_app(callback(result));
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MicrophoneOperation {
    Acquire { session: RecordingId },
    Flush { session: RecordingId },
    Release { session: RecordingId },
}

impl MicrophoneOperation {
    pub fn session(&self) -> RecordingId {
        match self {
            Self::Acquire { session } | Self::Flush { session } | Self::Release { session } => {
                *session
            }
        }
    }
}

impl Operation for MicrophoneOperation {
    type Output = MicrophoneResult;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MicrophoneOutput {
    Acquired,
    Flushed {
        trailing_chunks: Vec<serde_bytes::ByteBuf>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
pub enum MicrophoneError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("microphone unavailable: {message}")]
    DeviceUnavailable { message: String },

    #[error("recorder failed: {message}")]
    RecorderFailed { message: String },
}

pub type MicrophoneResult = Result<MicrophoneOutput, MicrophoneError>;
