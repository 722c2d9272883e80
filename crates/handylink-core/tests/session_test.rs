// Session-level tests for the `Handy` facade against a wiremock relay.
#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use handylink_core::{CoreError, Handy, ModeState, PlayRequest, SessionConfig};
use handylink_core::model::PlaybackState;

// ── Helpers ─────────────────────────────────────────────────────────

fn ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "result": 0 }))
}

fn config(server: &MockServer) -> SessionConfig {
    SessionConfig {
        api_url: server.uri(),
        offset_samples: 3,
        ..SessionConfig::default()
    }
}

async fn mount_device(server: &MockServer, fw_status: u8, mode: u8) {
    Mock::given(method("GET"))
        .and(path("/connected"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "connected": true })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fwVersion": "3.2.3",
            "fwStatus": fw_status,
            "hwVersion": "1.0",
            "model": "H01",
            "branch": "master"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "mode": mode })))
        .mount(server)
        .await;
}

async fn paired(server: &MockServer, mode: u8) -> Handy {
    paired_with(server, mode, config(server)).await
}

async fn paired_with(server: &MockServer, mode: u8, config: SessionConfig) -> Handy {
    mount_device(server, 0, mode).await;
    let handy = Handy::new(config);
    handy
        .pair(&SecretString::from("test-key".to_owned()))
        .await
        .unwrap();
    handy
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

fn position_of(requests: &[Request], verb: &str, route: &str) -> Option<usize> {
    requests
        .iter()
        .position(|r| r.method.as_str() == verb && r.url.path() == route)
}

/// Responds with a fixed template and records when each request arrived.
#[derive(Clone)]
struct Recorder {
    hits: Arc<Mutex<Vec<(String, Instant)>>>,
    template: ResponseTemplate,
}

impl Recorder {
    fn new(hits: &Arc<Mutex<Vec<(String, Instant)>>>, template: ResponseTemplate) -> Self {
        Self {
            hits: Arc::clone(hits),
            template,
        }
    }
}

impl Respond for Recorder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.hits
            .lock()
            .unwrap()
            .push((request.url.path().to_owned(), Instant::now()));
        self.template.clone()
    }
}

// ── Pairing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pair_returns_device_info() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;

    assert!(handy.is_paired());
    let session = handy.session().unwrap();
    assert_eq!(session.device_info().fw_version, "3.2.3");
}

#[tokio::test]
async fn test_pair_rejects_firmware_needing_update() {
    let server = MockServer::start().await;
    mount_device(&server, 2, 0).await;

    let handy = Handy::new(config(&server));
    let err = handy
        .pair(&SecretString::from("old-device".to_owned()))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::FirmwareIncompatible { version } if version == "3.2.3"));
    assert!(!handy.is_paired());
}

#[tokio::test]
async fn test_pair_offline_device_is_connectivity_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connected"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "connected": false })))
        .mount(&server)
        .await;

    let handy = Handy::new(config(&server));
    let err = handy
        .pair(&SecretString::from("k".to_owned()))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Connectivity { .. }));
}

#[tokio::test]
async fn test_zero_poll_interval_is_rejected_before_pairing() {
    let server = MockServer::start().await;
    let handy = Handy::new(SessionConfig {
        poll_interval: Duration::ZERO,
        ..config(&server)
    });

    let err = handy
        .pair(&SecretString::from("test-key".to_owned()))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { field, .. } if field == "poll_interval"));
    assert!(!handy.is_paired());
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_commands_require_pairing() {
    let handy = Handy::new(SessionConfig::default());
    let err = handy
        .execute("set_velocity", &json!({ "velocity": 10 }))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotPaired));
}

// ── Validation happens before any HTTP call ─────────────────────────

#[tokio::test]
async fn test_out_of_range_params_make_no_calls() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    let before = request_count(&server).await;

    for (kind, params) in [
        ("set_velocity", json!({ "velocity": -1 })),
        ("set_velocity", json!({ "velocity": 101 })),
        ("direct_position", json!({ "position": 120 })),
        ("set_range", json!({ "min": 80, "max": 20 })),
    ] {
        let err = handy.execute(kind, &params).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }), "{kind} {params}");
    }

    let err = handy.execute("warp", &Value::Null).await.unwrap_err();
    assert!(matches!(err, CoreError::UnknownCommand { .. }));

    assert_eq!(request_count(&server).await, before);
}

#[tokio::test]
async fn test_velocity_boundaries_accepted() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    Mock::given(method("PUT"))
        .and(path("/hamp/velocity"))
        .respond_with(ok())
        .expect(2)
        .mount(&server)
        .await;

    for velocity in [0, 100] {
        let result = handy
            .execute("set_velocity", &json!({ "velocity": velocity }))
            .await
            .unwrap();
        assert!(result.ok);
    }
}

#[tokio::test]
async fn test_set_position_holds_a_degenerate_range() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    Mock::given(method("PUT"))
        .and(path("/slide"))
        .and(body_json(json!({ "min": 40, "max": 40 })))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;

    handy
        .execute("set_position", &json!({ "position": 40 }))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_inverted_range_is_rejected_without_calls() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    let before = request_count(&server).await;

    let err = handy
        .execute("set_range", &json!({ "min": 90, "max": 10 }))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { field, .. } if field == "min"));
    assert_eq!(request_count(&server).await, before);
}

#[tokio::test]
async fn test_sync_time_needs_no_mode_switch() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    Mock::given(method("PUT"))
        .and(path("/hstp/time"))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;
    let before = request_count(&server).await;

    handy.execute("sync_time", &Value::Null).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[before..].iter().all(|r| r.url.path() != "/mode"));
}

// ── Mode preconditions ──────────────────────────────────────────────

#[tokio::test]
async fn test_cached_mode_avoids_redundant_switches() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    Mock::given(method("PUT"))
        .and(path("/mode"))
        .and(body_json(json!({ "mode": 1 })))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/hdsp/command"))
        .respond_with(ok())
        .expect(2)
        .mount(&server)
        .await;

    handy
        .execute("direct_position", &json!({ "position": 10 }))
        .await
        .unwrap();
    handy
        .execute("direct_position", &json!({ "position": 90 }))
        .await
        .unwrap();

    assert_eq!(
        handy.session().unwrap().cached_mode().await,
        ModeState::Hdsp
    );
}

#[tokio::test]
async fn test_failed_mode_switch_is_reported_as_transition_error() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    Mock::given(method("PUT"))
        .and(path("/mode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "code": 1001, "name": "DeviceNotConnected", "message": "Device not connected" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/hdsp/command"))
        .respond_with(ok())
        .expect(0)
        .mount(&server)
        .await;

    let err = handy
        .execute("direct_position", &json!({ "position": 10 }))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::ModeTransition {
            to: ModeState::Hdsp,
            ..
        }
    ));
    assert!(err.is_rejection());
}

// ── Script playback ─────────────────────────────────────────────────

async fn mount_script_endpoints(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/servertime"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "serverTime": 1_700_000_000_000_i64 })),
        )
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/mode"))
        .and(body_json(json!({ "mode": 2 })))
        .respond_with(ok())
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/hssp/setup"))
        .and(body_json(json!({ "timeout": 5000 })))
        .respond_with(ok())
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/hssp/play"))
        .respond_with(ok())
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/hssp/stop"))
        .respond_with(ok())
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_play_script_switches_to_hssp_before_play() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    mount_script_endpoints(&server).await;

    let mut request = PlayRequest::new("https://scripts.test/a.csv");
    request.start_time_ms = 250;
    handy.play_script(request).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let switch = position_of(&requests, "PUT", "/mode").unwrap();
    let setup = position_of(&requests, "PUT", "/hssp/setup").unwrap();
    let play = position_of(&requests, "PUT", "/hssp/play").unwrap();
    assert!(switch < setup && setup < play);

    let body: Value = serde_json::from_slice(&requests[play].body).unwrap();
    assert_eq!(body["url"], "https://scripts.test/a.csv");
    assert_eq!(body["startTime"], 250);
    assert_eq!(body["loop"], false);
    assert!(body["serverTime"].as_i64().unwrap() > 0);

    let state = handy.script_state().unwrap();
    assert_eq!(state.state, PlaybackState::Playing);
    assert_eq!(state.url.as_deref(), Some("https://scripts.test/a.csv"));

    handy.stop_script().await.unwrap();
    assert_eq!(handy.script_state().unwrap().state, PlaybackState::Stopped);
}

#[tokio::test]
async fn test_supplied_offset_skips_sampling() {
    let server = MockServer::start().await;
    let handy = paired(&server, 2).await;
    mount_script_endpoints(&server).await;

    handy
        .execute(
            "play_script",
            &json!({ "url": "https://scripts.test/b.csv", "csOffset": 42.0 }),
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(position_of(&requests, "GET", "/servertime"), None);
    assert_eq!(position_of(&requests, "PUT", "/mode"), None);
}

#[tokio::test]
async fn test_typed_play_request_is_validated_before_any_call() {
    let server = MockServer::start().await;
    let handy = paired(&server, 2).await;
    let before = request_count(&server).await;

    let err = handy
        .play_script(PlayRequest::new("not a url"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { field, .. } if field == "url"));

    let mut request = PlayRequest::new("https://scripts.test/a.csv");
    request.start_time_ms = -1;
    let err = handy.play_script(request).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { field, .. } if field == "startTime"));

    assert_eq!(request_count(&server).await, before);
}

#[tokio::test]
async fn test_seek_switches_to_hssp_and_sends_server_time() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    mount_script_endpoints(&server).await;
    Mock::given(method("PUT"))
        .and(path("/hssp/seek"))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;

    handy.seek_script(1_200, Some(42.0)).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(position_of(&requests, "GET", "/servertime"), None);
    let switch = position_of(&requests, "PUT", "/mode").unwrap();
    let seek = position_of(&requests, "PUT", "/hssp/seek").unwrap();
    assert!(switch < seek);

    let body: Value = serde_json::from_slice(&requests[seek].body).unwrap();
    assert_eq!(body["time"], 1_200);
    assert!(body["serverTime"].as_i64().unwrap() > 0);
    assert_eq!(body.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn test_seek_keeps_playing_state() {
    let server = MockServer::start().await;
    let handy = paired(&server, 2).await;
    mount_script_endpoints(&server).await;
    Mock::given(method("PUT"))
        .and(path("/hssp/seek"))
        .respond_with(ok())
        .mount(&server)
        .await;

    let mut request = PlayRequest::new("https://scripts.test/a.csv");
    request.offset_ms = Some(0.0);
    handy.play_script(request).await.unwrap();
    handy.seek_script(9_000, Some(0.0)).await.unwrap();

    let state = handy.script_state().unwrap();
    assert_eq!(state.state, PlaybackState::Playing);
    assert_eq!(state.position, Some(9_000.0));
}

#[tokio::test]
async fn test_stop_is_not_undone_by_an_in_flight_poll() {
    let server = MockServer::start().await;
    let handy = paired_with(
        &server,
        2,
        SessionConfig {
            poll_interval: Duration::from_millis(50),
            ..config(&server)
        },
    )
    .await;
    mount_script_endpoints(&server).await;
    Mock::given(method("GET"))
        .and(path("/hssp/state"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "state": 4, "position": 10.0 }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let mut request = PlayRequest::new("https://scripts.test/a.csv");
    request.offset_ms = Some(0.0);
    handy.play_script(request).await.unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;
    handy.stop_script().await.unwrap();
    assert_eq!(handy.script_state().unwrap().state, PlaybackState::Stopped);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(handy.script_state().unwrap().state, PlaybackState::Stopped);
}

#[tokio::test]
async fn test_set_loop_cancels_running_pattern() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    Mock::given(method("PUT"))
        .and(path("/hamp/velocity"))
        .respond_with(ok())
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/hssp/loop"))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;

    let ticket = handy.execute_pattern("edge", &Value::Null).await.unwrap();
    handy.set_loop(true).await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), ticket.wait())
        .await
        .unwrap();
    assert_eq!(handy.session().unwrap().active_pattern(), None);
}

// ── Clock offset ────────────────────────────────────────────────────

#[tokio::test]
async fn test_compute_offset_issues_exactly_n_calls() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    Mock::given(method("GET"))
        .and(path("/servertime"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "serverTime": 1_000_000 })))
        .expect(5)
        .mount(&server)
        .await;

    let offset = handy.compute_offset(Some(5)).await.unwrap();
    assert!(offset.computed);
    assert_eq!(offset.sample_count, 5);
}

#[tokio::test]
async fn test_failed_sample_yields_no_offset() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    Mock::given(method("GET"))
        .and(path("/servertime"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = handy.compute_offset(Some(4)).await.unwrap_err();
    assert!(matches!(err, CoreError::ClockSync { sample: 1, total: 4, .. }));

    let offset = handy.session().unwrap().offset().await;
    assert!(!offset.computed);
}

// ── Patterns ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_slow_pattern_floors_at_ten() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    Mock::given(method("PUT"))
        .and(path("/hamp/velocity"))
        .and(body_json(json!({ "velocity": 10 })))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;

    let ticket = handy
        .execute_pattern("slow", &json!({ "currentVelocity": 15 }))
        .await
        .unwrap();
    assert_eq!(ticket.velocity, Some(10));
    tokio::time::timeout(Duration::from_secs(5), ticket.wait())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_speed_pattern_uses_remembered_velocity() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    Mock::given(method("PUT"))
        .and(path("/hamp/velocity"))
        .respond_with(ok())
        .mount(&server)
        .await;

    handy
        .execute("set_velocity", &json!({ "velocity": 90 }))
        .await
        .unwrap();
    let ticket = handy.execute_pattern("speed", &Value::Null).await.unwrap();
    assert_eq!(ticket.velocity, Some(100));
    tokio::time::timeout(Duration::from_secs(5), ticket.wait())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let last = requests
        .iter()
        .rev()
        .find(|r| r.url.path() == "/hamp/velocity")
        .unwrap();
    let body: Value = serde_json::from_slice(&last.body).unwrap();
    assert_eq!(body, json!({ "velocity": 100 }));
}

#[tokio::test]
async fn test_new_command_cancels_running_pattern() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    Mock::given(method("PUT"))
        .and(path("/hamp/velocity"))
        .respond_with(ok())
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/hamp/stop"))
        .respond_with(ok())
        .mount(&server)
        .await;

    let ticket = handy.execute_pattern("edge", &Value::Null).await.unwrap();
    assert_eq!(ticket.steps, 4);
    assert!(!ticket.is_finished());

    handy.execute("stop", &Value::Null).await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), ticket.wait())
        .await
        .unwrap();
    assert_eq!(handy.session().unwrap().active_pattern(), None);
}

#[tokio::test]
async fn test_edge_steps_fire_on_schedule_past_a_failure() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    let hits = Arc::new(Mutex::new(Vec::new()));
    for route in ["/hamp/velocity", "/hamp/start"] {
        Mock::given(method("PUT"))
            .and(path(route))
            .respond_with(Recorder::new(&hits, ok()))
            .mount(&server)
            .await;
    }
    Mock::given(method("PUT"))
        .and(path("/hamp/stop"))
        .respond_with(Recorder::new(&hits, ResponseTemplate::new(502)))
        .mount(&server)
        .await;

    let ticket = handy.execute_pattern("edge", &Value::Null).await.unwrap();
    tokio::time::timeout(Duration::from_secs(10), ticket.wait())
        .await
        .unwrap();

    let hits = hits.lock().unwrap().clone();
    let routes: Vec<&str> = hits.iter().map(|(route, _)| route.as_str()).collect();
    assert_eq!(
        routes,
        vec![
            "/hamp/velocity",
            "/hamp/velocity",
            "/hamp/stop",
            "/hamp/velocity",
            "/hamp/start"
        ]
    );

    let first = hits[0].1;
    for ((route, at), expected_ms) in hits.iter().zip([0_u64, 3_000, 5_000, 7_000, 7_000]) {
        let offset = at.duration_since(first);
        let expected = Duration::from_millis(expected_ms);
        let drift = offset.abs_diff(expected);
        assert!(
            drift < Duration::from_millis(400),
            "{route} fired at {offset:?}, expected {expected:?}"
        );
    }
}

#[tokio::test]
async fn test_unknown_pattern_is_rejected() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;
    let err = handy
        .execute_pattern("wave", &Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::UnknownPattern { name } if name == "wave"));
}

// ── Status / firmware ───────────────────────────────────────────────

#[tokio::test]
async fn test_status_and_firmware_report() {
    let server = MockServer::start().await;
    let handy = paired(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/slide"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "min": 0.0, "max": 100.0 })))
        .mount(&server)
        .await;

    let status = handy.status().await.unwrap();
    assert!(status.connected);
    assert_eq!(status.mode, Some(ModeState::Hssp));

    let report = handy.check_firmware().await.unwrap();
    assert!(!report.update_required);
    assert_eq!(report.update_message, "Firmware is up to date");
}

#[tokio::test]
async fn test_unpair_drops_session() {
    let server = MockServer::start().await;
    let handy = paired(&server, 0).await;

    assert!(handy.unpair());
    assert!(!handy.is_paired());
    assert!(!handy.unpair());
    assert!(matches!(handy.script_state(), Err(CoreError::NotPaired)));
}
