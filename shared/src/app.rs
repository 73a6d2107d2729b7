use tracing::{debug, info, warn};

use crate::capabilities::{
    Capabilities, ConfirmRequest, HttpRequest, HttpResult, MicrophoneError, MicrophoneOutput,
};
use crate::capture::GrantOutcome;
use crate::config::ClientConfig;
use crate::conversation::ConversationRequestController;
use crate::event::Event;
use crate::model::{ConversationScope, FileKind, Model, StagedFile};
use crate::view::ViewModel;
use crate::AppError;

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(event = event.name(), user = event.is_user_initiated(), "update");

        match event {
            Event::Noop => return,

            Event::AppStarted { base_url } => {
                if let Some(url) = base_url {
                    Self::configure(model, url);
                }
                Self::refresh_cases(model, caps);
            }

            // --- Staging ---
            Event::FilesSelected { kind, files } => {
                let count = files.len();
                model
                    .staging
                    .add(kind, files.into_iter().map(|f| StagedFile::from_selected(kind, f)));
                debug!(%kind, count, total = model.staging.len(), "files staged");
            }

            Event::StagedFileRemoved { kind, index } => {
                if model.staging.remove(kind, index).is_none() {
                    debug!(%kind, index, "no staged file at index");
                    return;
                }
            }

            // --- Recording ---
            Event::RecordingStartRequested => {
                let Some(session) = model.capture.begin_start() else {
                    debug!(state = ?model.capture.state(), "recorder busy, start ignored");
                    return;
                };
                info!(%session, "requesting microphone");
                caps.microphone
                    .acquire(session, move |result| Event::MicrophoneAcquired { session, result });
            }

            Event::MicrophoneAcquired { session, result } => match result {
                Ok(MicrophoneOutput::Acquired) => match model.capture.access_granted(session) {
                    GrantOutcome::Recording => info!(%session, "recording started"),
                    GrantOutcome::Abandoned => {
                        warn!(%session, "microphone granted to an abandoned session, releasing");
                        caps.microphone.release(session);
                        return;
                    }
                },
                Ok(MicrophoneOutput::Flushed { .. }) => {
                    caps.microphone.release(session);
                    let error = MicrophoneError::RecorderFailed {
                        message: "recorder answered acquire with a flush".into(),
                    };
                    if let Some(error) = model.capture.access_failed(session, error) {
                        model.set_error(error);
                    }
                }
                Err(e) => {
                    caps.microphone.release(session);
                    match model.capture.access_failed(session, e) {
                        Some(error) => {
                            warn!(%session, code = error.code(), "microphone unavailable");
                            model.set_error(error);
                        }
                        None => return,
                    }
                }
            },

            Event::AudioChunkAvailable { session, data } => {
                if !model.capture.push_chunk(session, data) {
                    debug!(%session, "audio chunk dropped");
                    return;
                }
            }

            Event::RecordingStopRequested { at } => {
                let at = model.observe_time(at);
                let Some(session) = model.capture.begin_stop(at) else {
                    debug!(state = ?model.capture.state(), "not recording, stop ignored");
                    return;
                };
                caps.microphone
                    .flush(session, move |result| Event::RecorderFlushed { session, result });
            }

            Event::RecorderFlushed { session, result } => {
                let Some(outcome) = model.capture.finish_stop(session, result) else {
                    warn!(%session, "flush for a torn-down session");
                    return;
                };
                caps.microphone.release(outcome.release);

                match outcome.file {
                    Ok(file) => {
                        info!(%session, name = %file.name, bytes = file.size(), "recording staged");
                        model.staging.add(FileKind::Audio, [file]);
                    }
                    Err(e) => {
                        warn!(%session, error = %e, "recording discarded");
                        model.set_error(e.into());
                    }
                }
            }

            Event::CapturePanelClosed => {
                if let Some(session) = model.capture.teardown() {
                    info!(%session, "recorder torn down");
                    caps.microphone.release(session);
                }
            }

            // --- Case creation ---
            Event::CaseSubmitRequested => {
                match model.submission.submit(&model.staging, &model.config) {
                    Ok(request) => {
                        info!(files = model.staging.len(), "creating case");
                        Self::send(model, caps, request, |result| {
                            Event::CaseCreated(Box::new(result))
                        });
                    }
                    Err(e) => {
                        warn!(code = e.code(), message = %e.message, "case submission rejected");
                        model.set_error(e);
                    }
                }
            }

            Event::CaseCreated(result) => {
                match model.submission.complete(*result, &mut model.staging) {
                    Some(Ok(case)) => {
                        info!(case_id = %case.id, tasks = ?case.tasks_generated, "case created");
                        Self::refresh_cases(model, caps);
                    }
                    Some(Err(e)) => warn!(error = %e, "case creation failed"),
                    None => {
                        warn!("case creation result with no upload in flight");
                        return;
                    }
                }
            }

            Event::SubmissionStatusDismissed => model.submission.reset(),

            // --- Case list & detail ---
            Event::CasesRefreshRequested => Self::refresh_cases(model, caps),

            Event::CasesLoaded { generation, result } => {
                match model.cases.apply_list(generation, *result) {
                    Some(Ok(count)) => debug!(generation, count, "case list loaded"),
                    Some(Err(e)) => warn!(generation, error = %e, "case list failed"),
                    None => {
                        debug!(generation, "stale case list dropped");
                        return;
                    }
                }
            }

            Event::CaseSelected { case_id } => {
                if let Some(previous) = model.cases.close_detail().filter(|p| p != &case_id) {
                    model.close_conversation(&ConversationScope::Case(previous));
                }
                match model.cases.select(case_id.clone(), &model.config) {
                    Ok(request) => Self::send(model, caps, request, move |result| {
                        Event::CaseDetailLoaded {
                            case_id,
                            result: Box::new(result),
                        }
                    }),
                    Err(e) => model.set_error(e),
                }
            }

            Event::CaseDetailLoaded { case_id, result } => {
                match model.cases.apply_detail(&case_id, *result) {
                    Some(Ok(())) => debug!(%case_id, "case detail loaded"),
                    Some(Err(e)) => warn!(%case_id, error = %e, "case detail failed"),
                    None => {
                        debug!(%case_id, "detail for a case no longer selected");
                        return;
                    }
                }
            }

            Event::CaseDetailClosed => {
                if let Some(case_id) = model.cases.close_detail() {
                    model.close_conversation(&ConversationScope::Case(case_id));
                }
            }

            Event::DetailTabSelected { tab } => {
                if !model.cases.select_tab(tab) {
                    return;
                }
            }

            Event::CaseDeleteRequested { case_id } => {
                if model.cases.is_deleting(&case_id) {
                    debug!(%case_id, "delete already in flight");
                    return;
                }
                caps.confirm.ask(ConfirmRequest::delete_case(case_id.as_str()), move |confirmed| {
                    Event::CaseDeleteConfirmed { case_id, confirmed }
                });
                return;
            }

            Event::CaseDeleteConfirmed { case_id, confirmed } => {
                if !confirmed {
                    debug!(%case_id, "delete cancelled");
                    return;
                }
                match model.cases.begin_delete(&case_id, &model.config) {
                    Some(Ok(request)) => {
                        info!(%case_id, "deleting case");
                        Self::send(model, caps, request, move |result| Event::CaseDeleted {
                            case_id,
                            result: Box::new(result),
                        });
                    }
                    Some(Err(e)) => model.set_error(e),
                    None => {
                        debug!(%case_id, "delete already in flight");
                        return;
                    }
                }
            }

            Event::CaseDeleted { case_id, result } => {
                match model.cases.apply_delete(&case_id, *result) {
                    Ok(closed_detail) => {
                        info!(%case_id, closed_detail, "case deleted");
                        model.close_conversation(&ConversationScope::Case(case_id));
                    }
                    Err(e) => {
                        warn!(%case_id, error = %e, "case delete failed");
                        model.set_error(e);
                    }
                }
            }

            // --- Conversations ---
            Event::ConversationOpened { scope } => {
                model.open_conversation(scope);
            }

            Event::ConversationClosed { scope } => {
                if !model.close_conversation(&scope) {
                    return;
                }
            }

            Event::ChatMessageSubmitted { scope, text, at } => {
                let now = model.observe_time(at);
                let controller = ConversationRequestController::new(&model.config);
                let store = model.open_conversation(scope.clone());
                let instance = store.instance();
                let Some(pending) = store.submit(&text, now) else {
                    debug!(%scope, "blank message or search in flight, ignored");
                    return;
                };

                match controller.ask(&pending.query, &scope) {
                    Ok(request) => {
                        let ticket = pending.ticket;
                        Self::send(model, caps, request, move |result| Event::SearchAnswered {
                            scope,
                            instance,
                            ticket,
                            result: Box::new(result),
                        });
                    }
                    Err(e) => {
                        warn!(%scope, error = %e, "search request could not be built");
                        store.resolve(pending.ticket, Err(e.into()), now);
                    }
                }
            }

            Event::SearchAnswered {
                scope,
                instance,
                ticket,
                result,
            } => {
                let outcome = ConversationRequestController::interpret(*result);
                if let Err(e) = &outcome {
                    warn!(%scope, error = %e, "search failed");
                }
                // answers are stamped with the last time the shell reported
                let now = model.clock;
                match model.conversations.get_mut(&scope) {
                    Some(store) if store.instance() == instance => {
                        if !store.resolve(ticket, outcome, now) {
                            warn!(%scope, ticket, "answer for an unknown ticket");
                            return;
                        }
                    }
                    _ => {
                        debug!(%scope, "conversation closed, answer dropped");
                        return;
                    }
                }
            }

            Event::DismissError => model.clear_error(),
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::from_model(model)
    }
}

impl App {
    /// Applies a backend override. Only possible before anything was sent.
    fn configure(model: &mut Model, url: String) {
        if model.config_locked {
            warn!(%url, "backend already in use, override ignored");
            return;
        }
        match ClientConfig::new(url) {
            Ok(config) => {
                let config = config.with_cases_page_size(model.config.cases_page_size());
                info!(base_url = config.base_url(), "backend configured");
                model.config = config;
            }
            Err(e) => {
                let error = AppError::from(e);
                warn!(error = %error, "invalid backend URL");
                model.set_error(error);
            }
        }
    }

    fn refresh_cases(model: &mut Model, caps: &Capabilities) {
        match model.cases.refresh(&model.config) {
            Ok((generation, request)) => {
                Self::send(model, caps, request, move |result| Event::CasesLoaded {
                    generation,
                    result: Box::new(result),
                });
            }
            Err(e) => model.set_error(e),
        }
    }

    /// Every backend call goes through here; the config is frozen from the
    /// first one on.
    fn send<F>(model: &mut Model, caps: &Capabilities, request: HttpRequest, make_event: F)
    where
        F: FnOnce(HttpResult) -> Event + Send + 'static,
    {
        model.config_locked = true;
        debug!(
            method = request.method().as_str(),
            url = request.url().as_str(),
            request_id = request.request_id(),
            "http request"
        );
        caps.http.send(request, make_event);
    }
}
