#![allow(dead_code)]

use crux_core::testing::AppTester;
use crux_core::Request;
use shared::capabilities::{
    ConfirmRequest, HttpError, HttpRequest, HttpResponse, HttpResult, MicrophoneOperation,
    MicrophoneResult,
};
use shared::{App, Effect, Event, Model};

pub type Tester = AppTester<App, Effect>;

/// Effects of one update, sorted by capability.
#[derive(Default)]
pub struct Effects {
    pub http: Vec<Request<HttpRequest>>,
    pub microphone: Vec<Request<MicrophoneOperation>>,
    pub confirm: Vec<Request<ConfirmRequest>>,
    pub renders: usize,
}

impl Effects {
    fn absorb(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Http(request) => self.http.push(request),
                Effect::Microphone(request) => self.microphone.push(request),
                Effect::Confirm(request) => self.confirm.push(request),
                Effect::Render(_) => self.renders += 1,
            }
        }
    }

    fn merge(&mut self, other: Effects) {
        self.http.extend(other.http);
        self.microphone.extend(other.microphone);
        self.confirm.extend(other.confirm);
        self.renders += other.renders;
    }

    pub fn only_http(mut self) -> Request<HttpRequest> {
        assert_eq!(self.http.len(), 1, "expected exactly one http request");
        self.http.remove(0)
    }

    pub fn only_microphone(mut self) -> Request<MicrophoneOperation> {
        assert_eq!(self.microphone.len(), 1, "expected exactly one microphone request");
        self.microphone.remove(0)
    }

    pub fn releases(&self) -> usize {
        self.microphone
            .iter()
            .filter(|r| matches!(r.operation, MicrophoneOperation::Release { .. }))
            .count()
    }
}

pub fn send(app: &Tester, model: &mut Model, event: Event) -> Effects {
    let update = app.update(event, model);
    feed(app, model, update.effects, update.events)
}

/// Collects `effects` and runs `events` back through the app, as the shell would.
fn feed(app: &Tester, model: &mut Model, effects: Vec<Effect>, events: Vec<Event>) -> Effects {
    let mut out = Effects::default();
    out.absorb(effects);
    for event in events {
        out.merge(send(app, model, event));
    }
    out
}

pub fn resolve_http(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<HttpRequest>,
    result: HttpResult,
) -> Effects {
    let update = app.resolve(request, result).expect("http request should resolve");
    feed(app, model, update.effects, update.events)
}

pub fn resolve_microphone(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<MicrophoneOperation>,
    result: MicrophoneResult,
) -> Effects {
    let update = app
        .resolve(request, result)
        .expect("microphone request should resolve");
    feed(app, model, update.effects, update.events)
}

pub fn resolve_confirm(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<ConfirmRequest>,
    confirmed: bool,
) -> Effects {
    let update = app
        .resolve(request, confirmed)
        .expect("confirm request should resolve");
    feed(app, model, update.effects, update.events)
}

pub fn json(status: u16, body: &str) -> HttpResult {
    Ok(HttpResponse::new(status, body.as_bytes().to_vec()))
}

pub fn transport_failure() -> HttpResult {
    Err(HttpError::Transport {
        message: "connection refused".into(),
    })
}
