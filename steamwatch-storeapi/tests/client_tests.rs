//! `SteamStoreApi` against a local canned HTTP server.
//!
//! Each test gets its own listener on an ephemeral port: no network access.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rstest::rstest;
use steamwatch_core::{AppId, PackageId};
use steamwatch_storeapi::{CatalogFetcher, FetchError, SteamStoreApi, StubFetcher};

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

struct Route {
    needle: &'static str,
    status: u16,
    body: String,
}

fn route(needle: &'static str, body: &str) -> Route {
    Route {
        needle,
        status: 200,
        body: body.to_string(),
    }
}

/// Serve `routes` forever; returns the base URL and the request log.
fn serve(routes: Vec<Route>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base = format!("http://{}/api", listener.local_addr().expect("addr"));
    let log = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&log);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("read");
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).unwrap_or(0) == 0 || header == "\r\n" {
                    break;
                }
            }
            seen.lock().unwrap().push(request_line.clone());

            let (status, body) = routes
                .iter()
                .find(|r| request_line.contains(r.needle))
                .map(|r| (r.status, r.body.clone()))
                .unwrap_or((404, String::from("{}")));
            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    (base, log)
}

fn api(base: &str, cc: Option<&str>) -> SteamStoreApi {
    SteamStoreApi::new(base, cc.map(str::to_string), Duration::from_secs(5))
}

const APP: &str = r#"{"316750": {"success": true, "data": {
    "type": "game", "name": "Stardew Valley", "packages": [100, "200"],
    "platforms": {"linux": true},
    "release_date": {"coming_soon": false, "date": "26 Feb, 2016"}
}}}"#;

const PKG_100: &str = r#"{"100": {"success": true, "data": {
    "name": "Base", "price": {"currency": "EUR", "final": 1399},
    "platforms": {"linux": true}, "release_date": {"coming_soon": false}
}}}"#;

const PKG_200: &str = r#"{"200": {"success": true, "data": {
    "name": "Bundle", "price": {"currency": "EUR", "final": 2499}
}}}"#;

// ---------------------------------------------------------------------------
// SteamStoreApi
// ---------------------------------------------------------------------------

#[test]
fn fetches_app_then_each_package() {
    let (base, log) = serve(vec![
        route("appids=316750", APP),
        route("packageids=100", PKG_100),
        route("packageids=200", PKG_200),
    ]);

    let fetched = api(&base, Some("de")).fetch(AppId(316750)).expect("fetch");
    assert_eq!(fetched.app.name.as_deref(), Some("Stardew Valley"));
    assert_eq!(fetched.app.supports_linux, Some(true));
    let ids: Vec<_> = fetched.packages.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![PackageId(100), PackageId(200)]);
    assert_eq!(fetched.packages[1].price, Some(2499));
    assert_eq!(fetched.packages[1].supports_linux, None);

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].contains("/api/appdetails"), "got: {}", requests[0]);
    assert!(requests.iter().all(|r| r.contains("cc=de")));
}

#[test]
fn missing_package_is_skipped() {
    let (base, _) = serve(vec![
        route("appids=316750", APP),
        route("packageids=100", PKG_100),
        route("packageids=200", r#"{"200": {"success": false}}"#),
    ]);
    let fetched = api(&base, None).fetch(AppId(316750)).expect("fetch");
    assert_eq!(fetched.packages.len(), 1);
    assert_eq!(fetched.packages[0].id, PackageId(100));
}

#[test]
fn unknown_app_is_not_found() {
    let (base, _) = serve(vec![route("appids=5", r#"{"5": {"success": false}}"#)]);
    let err = api(&base, None).fetch(AppId(5)).unwrap_err();
    assert!(matches!(err, FetchError::AppNotFound(AppId(5))), "got: {err}");
}

#[rstest]
#[case(500, "{}")]
#[case(503, "busy")]
fn http_errors_carry_status(#[case] status: u16, #[case] body: &str) {
    let (base, _) = serve(vec![Route {
        needle: "appids=9",
        status,
        body: body.to_string(),
    }]);
    let err = api(&base, None).fetch(AppId(9)).unwrap_err();
    match err {
        FetchError::Status { status: got, url } => {
            assert_eq!(got, status);
            assert!(url.ends_with("/appdetails"));
        }
        other => panic!("expected status error, got: {other}"),
    }
}

#[test]
fn non_json_body_is_malformed() {
    let (base, _) = serve(vec![route("appids=9", "<html>maintenance</html>")]);
    let err = api(&base, None).fetch(AppId(9)).unwrap_err();
    assert!(matches!(err, FetchError::Malformed { .. }), "got: {err}");
}

#[test]
fn connection_refused_is_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let err = api(&format!("http://127.0.0.1:{port}/api"), None)
        .fetch(AppId(1))
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// StubFetcher
// ---------------------------------------------------------------------------

#[test]
fn stub_serves_canned_results_and_records_calls() {
    let stub = StubFetcher::new();
    let handle = stub.clone();
    handle.fail(AppId(2), "offline");

    assert!(matches!(stub.fetch(AppId(1)), Err(FetchError::AppNotFound(_))));
    assert!(matches!(stub.fetch(AppId(2)), Err(FetchError::Unavailable(_))));
    assert_eq!(handle.calls(), vec![AppId(1), AppId(2)]);
}
