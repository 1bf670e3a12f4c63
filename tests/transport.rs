use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use prode_terminal::api::{ApiClient, ApiError, PredictionApi};
use prode_terminal::config::Config;

struct Captured {
    request_line: String,
    authorization: Option<String>,
    body: String,
}

/// Serves one canned response and reports what the client sent.
fn serve_once(status_line: &'static str, body: &'static str) -> (String, mpsc::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        let mut request_line = String::new();
        reader.read_line(&mut request_line).expect("request line");
        let mut authorization = None;
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("header");
            let line = line.trim_end().to_string();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                let name = name.trim().to_ascii_lowercase();
                let value = value.trim().to_string();
                if name == "authorization" {
                    authorization = Some(value);
                } else if name == "content-length" {
                    content_length = value.parse().unwrap_or(0);
                }
            }
        }
        let mut buf = vec![0u8; content_length];
        reader.read_exact(&mut buf).expect("body");
        let _ = tx.send(Captured {
            request_line: request_line.trim_end().to_string(),
            authorization,
            body: String::from_utf8_lossy(&buf).to_string(),
        });
        let response = format!(
            "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let mut stream = stream;
        stream.write_all(response.as_bytes()).expect("write");
        stream.flush().expect("flush");
    });
    (format!("http://{addr}"), rx)
}

fn client_for(base: String) -> ApiClient {
    let config = Config {
        api_url: base,
        ..Config::default()
    };
    ApiClient::new(&config).expect("client")
}

#[test]
fn bearer_token_is_attached_and_competition_path_used() {
    let (base, rx) = serve_once("HTTP/1.1 200 OK", r#"{"roundName":"Fecha 1","gamesByDate":[]}"#);
    let mut api = client_for(base);
    api.set_bearer(Some("tok-1".to_string()));

    let matchday = api.fetch_matches().expect("fetch ok");
    assert_eq!(matchday.round_name, "Fecha 1");

    let seen = rx.recv().expect("captured");
    assert_eq!(seen.request_line, "GET /promiedos/lpf/current HTTP/1.1");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer tok-1"));
}

#[test]
fn unauthorized_fires_hook_and_drops_bearer() {
    let (base, rx) = serve_once("HTTP/1.1 401 Unauthorized", "");
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let mut api = client_for(base).on_unauthorized(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    api.set_bearer(Some("expired".to_string()));

    let err = api.fetch_my_predictions().expect_err("401 should fail");
    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(err.status(), Some(401));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(api.bearer().is_none());

    let seen = rx.recv().expect("captured");
    assert_eq!(seen.request_line, "GET /pronostics/my-pronostics HTTP/1.1");
}

#[test]
fn server_error_carries_status() {
    let (base, _rx) = serve_once("HTTP/1.1 503 Service Unavailable", r#"{"message":"down"}"#);
    let mut api = client_for(base);

    let err = api.fetch_leaderboard().expect_err("503 should fail");
    assert_eq!(err.status(), Some(503));
    assert!(err.to_string().contains("503"));
}

#[test]
fn bulk_send_posts_wire_shape_without_session() {
    let (base, rx) = serve_once("HTTP/1.1 201 Created", r#"{"created":1}"#);
    let mut api = client_for(base);
    let batch = vec![prode_terminal::predictions::OutboundPrediction {
        external_id: "g1".to_string(),
        prediction: prode_terminal::predictions::OutboundScores { scores: [2, 1] },
    }];

    let ack = api.send_predictions(&batch).expect("send ok");
    assert_eq!(ack.body["created"], 1);

    let seen = rx.recv().expect("captured");
    assert_eq!(seen.request_line, "POST /pronostics/bulk HTTP/1.1");
    assert!(seen.authorization.is_none());
    let body: serde_json::Value = serde_json::from_str(&seen.body).expect("json body");
    assert_eq!(
        body,
        serde_json::json!([{ "externalId": "g1", "prediction": { "scores": [2, 1] } }])
    );
}

#[test]
fn verify_credential_posts_credential() {
    let (base, rx) = serve_once(
        "HTTP/1.1 200 OK",
        r#"{"user":{"id":7,"name":"Ana"},"access_token":"tok-9"}"#,
    );
    let mut api = client_for(base);

    let user = api.verify_credential("google-jwt").expect("verify ok");
    assert_eq!(user.user.id, 7);
    assert_eq!(user.access_token.as_deref(), Some("tok-9"));

    let seen = rx.recv().expect("captured");
    assert_eq!(seen.request_line, "POST /auth/google/verify HTTP/1.1");
    let body: serde_json::Value = serde_json::from_str(&seen.body).expect("json body");
    assert_eq!(body["credential"], "google-jwt");
}
