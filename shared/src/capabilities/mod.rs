mod confirm;
mod http;
mod microphone;

pub use self::confirm::{Confirm, ConfirmRequest};
pub use self::http::{
    ContentType, Http, HttpError, HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpResult,
    ValidatedUrl,
};
pub use self::microphone::{
    Microphone, MicrophoneError, MicrophoneOperation, MicrophoneOutput, MicrophoneResult,
    RECORDING_EXTENSION, RECORDING_MIME_TYPE,
};

// Crux's built-in Render capability covers view updates as is.
pub use crux_core::render::Render;

use crate::event::Event;
// The Effect derive refers to the app type by name.
#[allow(unused_imports)]
use crate::App;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub microphone: Microphone<Event>,
    pub confirm: Confirm<Event>,
    pub render: Render<Event>,
}
