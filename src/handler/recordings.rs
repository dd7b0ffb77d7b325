//! Voicemail recording links.
//!
//! Notification emails link here instead of embedding vendor URLs, so
//! the mail stays valid even if the vendor changes its console layout.

use axum::extract::Path;
use axum::response::{IntoResponse, Redirect, Response};

const DOWNLOAD_BASE: &str = "https://www.twilio.com/console/voice/api/recordings/recording-logs";

/// Redirects to the vendor console's download page for a recording.
pub async fn get_recording(Path(recording_sid): Path<String>) -> Response {
    Redirect::to(&format!("{}/{}/download", DOWNLOAD_BASE, recording_sid)).into_response()
}
