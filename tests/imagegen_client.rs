//! Image-generation client tests against a local HTTP server

#![cfg(feature = "imagegen")]

use std::io::Read;
use std::sync::{Arc, Mutex};
use svgshot::imagegen::{GenerationRequest, ImageGenClient, ImageGenConfig, ImageSize};
use svgshot::Error;
use tiny_http::{Header, Response, Server};

const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-pixels";

#[derive(Default)]
struct Seen {
    auth: Option<String>,
    body: Option<serde_json::Value>,
}

/// Serve `requests` requests on `port`: the generation endpoint answers with
/// `status` and `body`, `/img.png` returns a fixed payload.
fn start_server(port: u16, status: u16, body: String, requests: usize) -> (String, Arc<Mutex<Seen>>) {
    let server = Server::http(("127.0.0.1", port)).unwrap();
    let seen = Arc::new(Mutex::new(Seen::default()));
    let seen_srv = seen.clone();

    std::thread::spawn(move || {
        for mut request in server.incoming_requests().take(requests) {
            let path = request.url().to_string();
            let response = match path.as_str() {
                "/generate" => {
                    let mut raw = String::new();
                    request.as_reader().read_to_string(&mut raw).unwrap();
                    let mut s = seen_srv.lock().unwrap();
                    s.auth = request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Authorization"))
                        .map(|h| h.value.as_str().to_string());
                    s.body = serde_json::from_str(&raw).ok();
                    Response::from_string(body.clone())
                        .with_status_code(status)
                        .with_header("Content-Type: application/json".parse::<Header>().unwrap())
                }
                "/img.png" => Response::from_data(FAKE_PNG.to_vec())
                    .with_header("Content-Type: image/png".parse::<Header>().unwrap()),
                _ => Response::from_string("Not Found").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });

    (format!("http://127.0.0.1:{}", port), seen)
}

fn client(base: &str) -> ImageGenClient {
    let mut cfg = ImageGenConfig::new("test-key");
    cfg.endpoint = format!("{}/generate", base);
    cfg.timeout_ms = 5000;
    ImageGenClient::new(cfg).unwrap()
}

#[test]
fn generates_and_downloads() {
    let port = 18091;
    let body = format!(
        r#"{{"output":{{"choices":[{{"finish_reason":"stop","message":{{"role":"assistant","content":[{{"image":"http://127.0.0.1:{}/img.png"}}]}}}}]}},"request_id":"abc"}}"#,
        port
    );
    let (base, seen) = start_server(port, 200, body, 2);
    let client = client(&base);

    let request = GenerationRequest::new("a lighthouse at dusk").with_size(ImageSize { width: 1280, height: 720 });
    let url = client.generate(&request).expect("generate");
    assert_eq!(url, format!("{}/img.png", base));

    {
        let s = seen.lock().unwrap();
        assert_eq!(s.auth.as_deref(), Some("Bearer test-key"));
        let sent = s.body.as_ref().expect("json body");
        assert_eq!(sent["input"]["messages"][0]["content"][0]["text"], "a lighthouse at dusk");
        assert_eq!(sent["parameters"]["size"], "1280*720");
    }

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("images/nested/lighthouse.png");
    let written = client.download(&url, &out).expect("download");
    assert_eq!(written, FAKE_PNG.len() as u64);
    assert_eq!(std::fs::read(&out).unwrap(), FAKE_PNG);
}

#[test]
fn api_errors_carry_code_and_message() {
    let (base, _) = start_server(
        18092,
        401,
        r#"{"code":"InvalidApiKey","message":"Invalid API-key provided.","request_id":"x"}"#.to_string(),
        1,
    );
    let err = client(&base).generate(&GenerationRequest::new("anything")).unwrap_err();
    match err {
        Error::Api { code, message } => {
            assert_eq!(code, "InvalidApiKey");
            assert_eq!(message, "Invalid API-key provided.");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn api_error_without_json_falls_back_to_status() {
    let (base, _) = start_server(18093, 503, "upstream down".to_string(), 1);
    let err = client(&base).generate(&GenerationRequest::new("anything")).unwrap_err();
    match err {
        Error::Api { code, .. } => assert_eq!(code, "503"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn empty_choices_is_reported() {
    let (base, _) = start_server(18094, 200, r#"{"output":{"choices":[]}}"#.to_string(), 1);
    let err = client(&base).generate(&GenerationRequest::new("anything")).unwrap_err();
    assert!(matches!(err, Error::EmptyResponse), "{:?}", err);
}

#[test]
fn failed_download_writes_nothing() {
    let (base, _) = start_server(18095, 200, String::new(), 1);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("missing.png");
    let err = client(&base).download(&format!("{}/gone.png", base), &out).unwrap_err();
    assert!(matches!(err, Error::NetworkError(_)), "{:?}", err);
    assert!(!out.exists());
}
