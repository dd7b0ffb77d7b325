//! Webhook handlers for the voice call flow. Each handler answers one
//! [`CallStep`]; branching lives in the flow engine, side effects
//! (metadata resolution, notifications) live here.

use crate::app::AppState;
use crate::flow::{CallStep, StepParams};
use crate::twiml::VoiceResponse;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Default)]
pub struct LangQuery {
    pub lang: Option<String>,
}

/// The language threaded through redirects. Absent on the first webhook
/// of a call; later steps carry it explicitly.
fn lang_or_default(state: &AppState, query: &LangQuery) -> String {
    match &query.lang {
        Some(lang) if !lang.is_empty() => lang.clone(),
        _ => {
            debug!(
                "webhook without lang parameter, defaulting to '{}'",
                state.config.default_lang
            );
            state.config.default_lang.clone()
        }
    }
}

fn twiml(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

pub async fn inbound(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let lang = lang_or_default(&state, &query);
    twiml(state
        .flow
        .respond(CallStep::Inbound, &lang, &StepParams::new(&params)))
}

pub async fn dial_out(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let lang = lang_or_default(&state, &query);
    twiml(state
        .flow
        .respond(CallStep::DialOut, &lang, &StepParams::new(&params)))
}

pub async fn connect_agent(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let lang = lang_or_default(&state, &query);
    twiml(state
        .flow
        .respond(CallStep::ConnectAgent, &lang, &StepParams::new(&params)))
}

pub async fn accept_call(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let lang = lang_or_default(&state, &query);
    twiml(state
        .flow
        .respond(CallStep::AcceptCall, &lang, &StepParams::new(&params)))
}

pub async fn confirm_connected(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let lang = lang_or_default(&state, &query);
    twiml(state
        .flow
        .respond(CallStep::ConfirmConnected, &lang, &StepParams::new(&params)))
}

pub async fn end_call(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let lang = lang_or_default(&state, &query);
    twiml(state
        .flow
        .respond(CallStep::EndCall, &lang, &StepParams::new(&params)))
}

pub async fn start_voicemail(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let lang = lang_or_default(&state, &query);
    twiml(state
        .flow
        .respond(CallStep::StartVoicemail, &lang, &StepParams::new(&params)))
}

pub async fn end_voicemail(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let lang = lang_or_default(&state, &query);
    twiml(state
        .flow
        .respond(CallStep::EndVoicemail, &lang, &StepParams::new(&params)))
}

/// Fires when a call ends. For completed inbound calls the event history
/// decides whether the agents hear about a missed call or a voicemail;
/// the vendor itself always gets the empty response.
pub async fn status_callback(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let lang = lang_or_default(&state, &query);
    let step_params = StepParams::new(&params);

    if step_params.direction() == "inbound" && step_params.call_status() == "completed" {
        let metadata = state.metadata.resolve(step_params.call_sid()).await;
        // No language on record means the caller hung up before the
        // menu; nobody was expecting that call, so nobody is notified.
        if !metadata.connected && !metadata.lang.is_empty() {
            if metadata.voicemail_recording_id.is_empty() {
                state
                    .mailer
                    .missed_call(&metadata.lang, step_params.from())
                    .await;
            } else {
                state
                    .mailer
                    .voicemail(
                        &metadata.lang,
                        step_params.from(),
                        &metadata.voicemail_recording_id,
                    )
                    .await;
            }
        }
    }

    twiml(state
        .flow
        .respond(CallStep::StatusCallback, &lang, &StepParams::new(&params)))
}

/// Acknowledges recording lifecycle callbacks. The recording itself
/// stays with the vendor; we only log the outcome.
pub async fn recording_status(Form(params): Form<HashMap<String, String>>) -> Response {
    let params = StepParams::new(&params);
    info!(
        recording_sid = params.recording_sid(),
        status = params.get("RecordingStatus"),
        "recording status update"
    );
    twiml(VoiceResponse::noop().render())
}
