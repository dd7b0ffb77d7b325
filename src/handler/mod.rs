use crate::app::AppState;
use crate::flow::FlowRoutes;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

pub mod middleware;
pub mod recordings;
pub mod sms;
pub mod voice;

#[cfg(test)]
mod tests;

pub const VOICE_INBOUND: &str = "/voice/inbound";
pub const VOICE_DIAL_OUT: &str = "/voice/dial-out";
pub const VOICE_CONNECT_AGENT: &str = "/voice/connect-agent";
pub const VOICE_ACCEPT_CALL: &str = "/voice/accept-call";
pub const VOICE_CONFIRM_CONNECTED: &str = "/voice/confirm-connected";
pub const VOICE_END_CALL: &str = "/voice/end-call";
pub const VOICE_START_VOICEMAIL: &str = "/voice/start-voicemail";
pub const VOICE_END_VOICEMAIL: &str = "/voice/end-voicemail";
pub const VOICE_STATUS_CALLBACK: &str = "/voice/status-callback";
pub const VOICE_RECORDING_STATUS: &str = "/voice/recording-status";
pub const SMS_INBOUND: &str = "/sms/inbound";
pub const RECORDINGS: &str = "/recordings/{id}";

/// Next-action URLs handed to the flow engine. Built from the same
/// constants the router registers, so flow and routing cannot drift.
pub fn flow_routes() -> FlowRoutes {
    FlowRoutes {
        dial_out: VOICE_DIAL_OUT.to_string(),
        connect_agent: VOICE_CONNECT_AGENT.to_string(),
        accept_call: VOICE_ACCEPT_CALL.to_string(),
        confirm_connected: VOICE_CONFIRM_CONNECTED.to_string(),
        end_call: VOICE_END_CALL.to_string(),
        start_voicemail: VOICE_START_VOICEMAIL.to_string(),
        end_voicemail: VOICE_END_VOICEMAIL.to_string(),
        recording_status: VOICE_RECORDING_STATUS.to_string(),
    }
}

pub fn router(state: AppState) -> Router {
    // Webhook routes are signature-checked; the recordings redirect is a
    // plain link opened from notification emails.
    let webhooks = Router::new()
        .route(VOICE_INBOUND, post(voice::inbound))
        .route(VOICE_DIAL_OUT, post(voice::dial_out))
        .route(VOICE_CONNECT_AGENT, post(voice::connect_agent))
        .route(VOICE_ACCEPT_CALL, post(voice::accept_call))
        .route(VOICE_CONFIRM_CONNECTED, post(voice::confirm_connected))
        .route(VOICE_END_CALL, post(voice::end_call))
        .route(VOICE_START_VOICEMAIL, post(voice::start_voicemail))
        .route(VOICE_END_VOICEMAIL, post(voice::end_voicemail))
        .route(VOICE_STATUS_CALLBACK, post(voice::status_callback))
        .route(VOICE_RECORDING_STATUS, post(voice::recording_status))
        .route(SMS_INBOUND, post(sms::inbound))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::signature::validate,
        ));

    Router::new()
        .merge(webhooks)
        .route(RECORDINGS, get(recordings::get_recording))
        .with_state(state)
}
