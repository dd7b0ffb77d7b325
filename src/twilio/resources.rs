use serde::Deserialize;

/// Page of call events as returned by the vendor's Call Event resource.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCallEventsResponse {
    #[serde(default)]
    pub events: Vec<CallEvent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallEvent {
    #[serde(default)]
    pub request: CallEventRequest,
}

/// One historical webhook request the vendor made against a call. The
/// request URL carries the `lang` query parameter threaded through the
/// flow; the parameters are the form fields of that webhook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallEventRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub parameters: CallEventParameters,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallEventParameters {
    #[serde(default)]
    pub dial_call_status: String,
    #[serde(default)]
    pub dial_call_duration: String,
    #[serde(default)]
    pub digits: String,
    #[serde(default)]
    pub recording_sid: String,
}
