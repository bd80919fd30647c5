// =============
// tests/integration/meeting_flow_tests.rs
// =============
//! End-to-end meeting flows through the HTTP router.
use axum::body::Body;
use axum::http::{Method, StatusCode};
use serde_json::Value;

use crate::test_utils::{fake_runtime, send, send_json, send_with_body, setup_app};

#[tokio::test]
async fn test_join_lookup_delete_flow() {
    let (app, _state, backend) = setup_app(fake_runtime(0));

    let (status, alice) = send_json(
        &app,
        Method::POST,
        "/join?title=demo&name=Alice&region=us-east-1&playbackURL=https%3A%2F%2Fplay.example%2Fdemo",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let info = &alice["JoinInfo"];
    assert_eq!(info["Title"], "demo");
    assert_eq!(info["PlaybackURL"], "https://play.example/demo");
    assert_eq!(info["Meeting"]["MediaRegion"], "us-east-1");
    let meeting_id = info["Meeting"]["MeetingId"].as_str().unwrap().to_string();
    assert!(info["Attendee"]["AttendeeId"].is_string());

    let (status, bob) = send_json(&app, Method::POST, "/join?title=demo&name=Bob").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bob["JoinInfo"]["Meeting"]["MeetingId"], meeting_id.as_str());
    // The first caller's playback URL sticks
    assert_eq!(bob["JoinInfo"]["PlaybackURL"], "https://play.example/demo");
    assert_eq!(backend.create_calls(), 1);

    let bob_id = bob["JoinInfo"]["Attendee"]["AttendeeId"].as_str().unwrap();
    let (status, lookup) = send_json(
        &app,
        Method::GET,
        &format!("/attendee?title=demo&attendee={bob_id}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lookup["AttendeeInfo"]["AttendeeId"], bob_id);
    assert_eq!(lookup["AttendeeInfo"]["Name"], "Bob");

    let (status, meetings) = send_json(&app, Method::GET, "/meetings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(meetings["demo"]["Meeting"]["MeetingId"], meeting_id.as_str());
    assert_eq!(meetings["demo"]["PlaybackURL"], "https://play.example/demo");

    let (status, body) = send(&app, Method::DELETE, "/meeting?name=demo").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert!(!backend.is_live(&meeting_id));

    let (_, meetings) = send_json(&app, Method::GET, "/meetings").await;
    assert_eq!(meetings, serde_json::json!({}));

    // Gone entirely, as if never created
    let (status, body) = send_json(
        &app,
        Method::GET,
        &format!("/attendee?title=demo&attendee={bob_id}"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("demo"));
}

#[tokio::test]
async fn test_nameless_attendee_is_unknown() {
    let (app, _state, _backend) = setup_app(fake_runtime(0));

    let (_, joined) = send_json(&app, Method::POST, "/join?title=quiet").await;
    let id = joined["JoinInfo"]["Attendee"]["AttendeeId"].as_str().unwrap();

    let (status, lookup) =
        send_json(&app, Method::GET, &format!("/attendee?title=quiet&attendee={id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lookup["AttendeeInfo"]["Name"], "unknown");

    // Never-seen attendee ids are not an error either
    let (status, lookup) =
        send_json(&app, Method::GET, "/attendee?title=quiet&attendee=nobody").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lookup["AttendeeInfo"]["Name"], "unknown");
}

#[tokio::test]
async fn test_create_only_does_not_join() {
    let (app, state, backend) = setup_app(fake_runtime(0));

    let (status, created) = send_json(&app, Method::POST, "/meeting?title=viewers").await;
    assert_eq!(status, StatusCode::CREATED);
    let info = created["JoinInfo"].as_object().unwrap();
    assert_eq!(info["Title"], "viewers");
    assert!(info["Meeting"]["MeetingId"].is_string());
    assert!(!info.contains_key("Attendee"));
    assert!(!info.contains_key("PlaybackURL"));
    assert_eq!(backend.attendee_calls(), 0);

    // Repeating it reuses the meeting
    let (_, again) = send_json(&app, Method::POST, "/meeting?title=viewers").await;
    assert_eq!(again["JoinInfo"]["Meeting"], info["Meeting"]);
    assert_eq!(backend.create_calls(), 1);

    // Region defaults apply
    assert_eq!(backend.regions(), vec![state.settings.backend.default_region.clone()]);
}

#[tokio::test]
async fn test_end_keeps_listing_delete_does_not() {
    let (app, _state, backend) = setup_app(fake_runtime(0));
    send(&app, Method::POST, "/join?title=ending&name=Alice").await;
    send(&app, Method::POST, "/join?title=deleting&name=Bob").await;

    let (status, body) = send(&app, Method::POST, "/end?title=ending").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let (status, _) = send(&app, Method::DELETE, "/meeting?name=deleting").await;
    assert_eq!(status, StatusCode::OK);

    let (_, meetings) = send_json(&app, Method::GET, "/meetings").await;
    let meetings = meetings.as_object().unwrap();
    assert!(meetings.contains_key("ending"));
    assert!(!meetings.contains_key("deleting"));
    assert_eq!(backend.delete_calls(), 2);
}

#[tokio::test]
async fn test_backend_failure_is_forbidden_and_service_survives() {
    let (app, _state, backend) = setup_app(fake_runtime(0));
    backend.fail_create(true);

    let (status, body) = send_json(&app, Method::POST, "/join?title=demo&name=Alice").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("unavailable"));

    let (_, meetings) = send_json(&app, Method::GET, "/meetings").await;
    assert_eq!(meetings, serde_json::json!({}));

    backend.fail_create(false);
    let (status, _) = send_json(&app, Method::POST, "/join?title=demo&name=Alice").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_unknown_title_errors() {
    let (app, _state, _backend) = setup_app(fake_runtime(0));

    for (method, uri) in [
        (Method::POST, "/end?title=ghost"),
        (Method::DELETE, "/meeting?name=ghost"),
        (Method::GET, "/attendee?title=ghost&attendee=a-1"),
    ] {
        let (status, body) = send_json(&app, method, uri).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(body["error"], "Meeting not found: ghost", "{uri}");
    }
}

#[tokio::test]
async fn test_invalid_parameters_rejected_before_backend() {
    let (app, _state, backend) = setup_app(fake_runtime(0));

    for uri in [
        "/join",
        "/join?title=",
        "/join?title=demo&region=Mars",
        "/join?title=bad%0Atitle",
        // unparseable query string
        "/join?title=a&title=b",
        "/meeting",
        "/end",
    ] {
        let (status, body) = send_json(&app, Method::POST, uri).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert!(body["error"].as_str().unwrap().starts_with("Invalid input"), "{uri}");
    }

    let (status, _) = send_json(&app, Method::GET, "/attendee?title=demo").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_json(&app, Method::DELETE, "/meeting?title=demo").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(backend.create_calls(), 0);
}

#[tokio::test]
async fn test_unmatched_routes_are_404() {
    let (app, _state, _backend) = setup_app(fake_runtime(0));

    for (method, uri) in [
        (Method::GET, "/nope"),
        (Method::GET, "/join?title=demo"),
        (Method::PUT, "/meeting?title=demo"),
        (Method::DELETE, "/meetings"),
        (Method::GET, "/end?title=demo"),
    ] {
        let (status, body) = send(&app, method, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(&body[..], b"404 Not Found", "{uri}");
    }
}

#[tokio::test]
async fn test_client_logs_accepted() {
    let (app, _state, _backend) = setup_app(fake_runtime(0));

    let (status, _) = send_with_body(
        &app,
        Method::POST,
        "/logs",
        Body::from("INFO session started\nWARN reconnecting\n"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_http_joins_share_one_meeting() {
    let (app, _state, backend) = setup_app(fake_runtime(0));
    backend.set_latency(std::time::Duration::from_millis(25));

    let requests: Vec<_> = (0..10)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                send_json(&app, Method::POST, &format!("/join?title=rush&name=u{i}")).await
            })
        })
        .collect();

    let mut ids: Vec<Value> = Vec::new();
    for request in requests {
        let (status, body) = request.await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        ids.push(body["JoinInfo"]["Meeting"]["MeetingId"].clone());
    }

    assert_eq!(backend.create_calls(), 1);
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
}
