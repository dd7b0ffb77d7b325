use super::*;

fn event(url: &str, parameters: CallEventParameters) -> CallEventRequest {
    CallEventRequest {
        url: url.to_string(),
        parameters,
    }
}

fn dial_result(status: &str, duration: &str) -> CallEventParameters {
    CallEventParameters {
        dial_call_status: status.to_string(),
        dial_call_duration: duration.to_string(),
        ..CallEventParameters::default()
    }
}

fn hangup_with_recording(recording_sid: &str) -> CallEventParameters {
    CallEventParameters {
        digits: "hangup".to_string(),
        recording_sid: recording_sid.to_string(),
        ..CallEventParameters::default()
    }
}

fn resolver_with(events: Vec<CallEventRequest>) -> MetadataResolver {
    let mut client = MockCallEventsClient::new();
    client
        .expect_list_call_events()
        .returning(move |_| Ok(events.clone()));
    MetadataResolver::new(Box::new(client))
}

#[tokio::test]
async fn test_connected_requires_completed_dial_with_duration() {
    let resolver = resolver_with(vec![
        event("https://voice.example.com/voice/inbound", CallEventParameters::default()),
        event(
            "https://voice.example.com/voice/end-call?lang=en",
            dial_result("completed", "42"),
        ),
    ]);
    let metadata = resolver.resolve("CA100").await;
    assert!(metadata.connected);
    assert_eq!(metadata.lang, "en");
    assert_eq!(metadata.voicemail_recording_id, "");
}

#[tokio::test]
async fn test_completed_dial_without_duration_is_not_connected() {
    let resolver = resolver_with(vec![event(
        "https://voice.example.com/voice/end-call?lang=en",
        dial_result("completed", ""),
    )]);
    let metadata = resolver.resolve("CA101").await;
    assert!(!metadata.connected);
}

#[tokio::test]
async fn test_voicemail_recording_from_hangup_event() {
    let resolver = resolver_with(vec![
        event(
            "https://voice.example.com/voice/end-call?lang=fr",
            dial_result("no-answer", ""),
        ),
        event(
            "https://voice.example.com/voice/end-voicemail?lang=fr",
            hangup_with_recording("RE37975e538fc06fea00474b868fbcc859"),
        ),
    ]);
    let metadata = resolver.resolve("CA102").await;
    assert!(!metadata.connected);
    assert_eq!(metadata.lang, "fr");
    assert_eq!(
        metadata.voicemail_recording_id,
        "RE37975e538fc06fea00474b868fbcc859"
    );
}

#[tokio::test]
async fn test_hangup_without_recording_is_ignored() {
    let resolver = resolver_with(vec![event(
        "https://voice.example.com/voice/end-voicemail?lang=en",
        CallEventParameters {
            digits: "hangup".to_string(),
            ..CallEventParameters::default()
        },
    )]);
    let metadata = resolver.resolve("CA103").await;
    assert_eq!(metadata.voicemail_recording_id, "");
}

#[tokio::test]
async fn test_lang_comes_from_earliest_event_carrying_one() {
    let resolver = resolver_with(vec![
        event("https://voice.example.com/voice/inbound", CallEventParameters::default()),
        event(
            "https://voice.example.com/voice/accept-call?lang=fr",
            CallEventParameters::default(),
        ),
        event(
            "https://voice.example.com/voice/end-call?lang=en",
            CallEventParameters::default(),
        ),
    ]);
    let metadata = resolver.resolve("CA104").await;
    assert_eq!(metadata.lang, "fr");
}

#[tokio::test]
async fn test_malformed_event_url_is_skipped() {
    let resolver = resolver_with(vec![
        event("not a url", CallEventParameters::default()),
        event(
            "https://voice.example.com/voice/end-call?lang=en",
            CallEventParameters::default(),
        ),
    ]);
    let metadata = resolver.resolve("CA105").await;
    assert_eq!(metadata.lang, "en");
}

#[tokio::test]
async fn test_fetch_failure_resolves_to_zero_metadata() {
    let mut client = MockCallEventsClient::new();
    client
        .expect_list_call_events()
        .returning(|_| Err(anyhow::anyhow!("connection refused")));
    let resolver = MetadataResolver::new(Box::new(client));

    let metadata = resolver.resolve("CA106").await;
    assert_eq!(metadata, CallMetadata::default());
}

#[tokio::test]
async fn test_resolution_is_idempotent() {
    let resolver = resolver_with(vec![
        event(
            "https://voice.example.com/voice/end-call?lang=en",
            dial_result("busy", ""),
        ),
        event(
            "https://voice.example.com/voice/end-voicemail?lang=en",
            hangup_with_recording("RE0123"),
        ),
    ]);
    let first = resolver.resolve("CA107").await;
    let second = resolver.resolve("CA107").await;
    assert_eq!(first, second);
}
