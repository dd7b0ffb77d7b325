//! Inbound text message webhook.

use crate::app::AppState;
use crate::twiml::MessagingResponse;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Form;
use std::collections::HashMap;

/// Forwards the message to the agents by email and auto-replies in both
/// languages, since a text message carries no language selection.
pub async fn inbound(
    State(state): State<AppState>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let from = params.get("From").map(String::as_str).unwrap_or("");
    let body = params.get("Body").map(String::as_str).unwrap_or("");

    state
        .mailer
        .text_message(&state.config.default_lang, from, body)
        .await;

    let reply_en = state.catalog.message("en", |m| &m.messaging.response);
    let reply_fr = state.catalog.message("fr", |m| &m.messaging.response);
    let reply = MessagingResponse {
        body: format!("{}\n{}", reply_en, reply_fr),
    };

    ([(header::CONTENT_TYPE, "application/xml")], reply.render()).into_response()
}
