//! Endpoint behavior against a scripted card transport

use std::sync::{Arc, Mutex};

use cardbridge_apdu_core::transport::TransportError;
use cardbridge_apdu_core::{Bytes as ApduBytes, CardTransport, MockTransport};
use cardbridge_host::frame::{self, FRAME_READ_TIMEOUT, FrameError};
use cardbridge_host::protocol::{Request, Response};
use cardbridge_host::service::SignerService;
use cardbridge_host::stdio::{self, RunMode};
use cardbridge_host::http;
use cardbridge_openpgp::{OpenPgpSigner, Result as CardResult, SessionFactory};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request as HttpRequest, StatusCode};
use tokio::io::AsyncWriteExt;

#[derive(Clone)]
struct SharedTransport(Arc<Mutex<MockTransport>>);

impl CardTransport for SharedTransport {
    fn transmit_raw(&mut self, command: &[u8]) -> std::result::Result<ApduBytes, TransportError> {
        self.0.lock().unwrap().transmit_raw(command)
    }
}

struct ScriptedFactory(SharedTransport);

impl SessionFactory for ScriptedFactory {
    type Transport = SharedTransport;

    fn open_session(&self) -> CardResult<Self::Transport> {
        Ok(self.0.clone())
    }
}

fn scripted_service<I>(responses: I) -> (SignerService<ScriptedFactory>, SharedTransport)
where
    I: IntoIterator,
    I::Item: Into<ApduBytes>,
{
    let transport = SharedTransport(Arc::new(Mutex::new(MockTransport::with_responses(
        responses,
    ))));
    let signer = OpenPgpSigner::new(ScriptedFactory(transport.clone()));
    (
        SignerService::new(signer, Some("123456".into())),
        transport,
    )
}

fn uncompressed_point() -> Vec<u8> {
    let mut point = vec![0x04];
    point.extend((0u8..64).collect::<Vec<_>>());
    point
}

fn public_key_response() -> Vec<u8> {
    let point = uncompressed_point();
    let mut inner = vec![0x86, point.len() as u8];
    inner.extend_from_slice(&point);

    let mut response = vec![0x7F, 0x49, inner.len() as u8];
    response.extend_from_slice(&inner);
    response.extend_from_slice(&[0x90, 0x00]);
    response
}

fn signature_response(fill: u8) -> Vec<u8> {
    let mut response = vec![fill; 64];
    response.extend_from_slice(&[0x90, 0x00]);
    response
}

fn sign_script() -> Vec<Vec<u8>> {
    vec![
        vec![0x90, 0x00],
        vec![0x90, 0x00],
        public_key_response(),
        signature_response(0x5A),
    ]
}

#[tokio::test]
async fn unknown_command_yields_structured_error() {
    let (service, transport) = scripted_service(Vec::<Vec<u8>>::new());

    let response = service.dispatch(Request::Unknown).await;
    assert_eq!(response, Response::error("Unknown command"));
    assert!(transport.0.lock().unwrap().transmitted().is_empty());
}

#[tokio::test]
async fn sign_hash_dispatch_returns_hex_signature() {
    let (service, _) = scripted_service(sign_script());

    let response = service
        .dispatch(Request::SignHash {
            hash: hex::encode([0u8; 64]),
            pin: None,
        })
        .await;
    assert_eq!(
        response,
        Response::Signature {
            signature: hex::encode([0x5A; 64]),
        }
    );
}

#[tokio::test]
async fn sign_message_is_hashed_before_signing() {
    let (service, transport) = scripted_service(sign_script());

    let response = service
        .dispatch(Request::SignMessage {
            hash: "hello".into(),
            pin: None,
        })
        .await;
    assert!(matches!(response, Response::Signature { .. }));

    // The PSO payload is the SHA-512 of the text, not the text itself
    use sha2::{Digest, Sha512};
    let expected = Sha512::digest(b"hello");
    let transmitted = transport.0.lock().unwrap().transmitted().to_vec();
    assert_eq!(&transmitted[3][5..69], expected.as_slice());
}

#[tokio::test]
async fn non_hex_hash_fails_before_any_card_traffic() {
    let (service, transport) = scripted_service(Vec::<Vec<u8>>::new());

    let response = service
        .dispatch(Request::SignHash {
            hash: "not hex".into(),
            pin: None,
        })
        .await;
    assert!(matches!(response, Response::Error { error } if error.contains("hex")));
    assert!(transport.0.lock().unwrap().transmitted().is_empty());
}

#[tokio::test]
async fn missing_pin_is_reported_when_none_configured() {
    let transport = SharedTransport(Arc::new(Mutex::new(MockTransport::with_responses(
        Vec::<Vec<u8>>::new(),
    ))));
    let service = SignerService::new(OpenPgpSigner::new(ScriptedFactory(transport)), None);

    let response = service
        .dispatch(Request::SignHash {
            hash: hex::encode([0u8; 64]),
            pin: None,
        })
        .await;
    assert!(matches!(response, Response::Error { error } if error.contains("PIN")));
}

#[tokio::test]
async fn stdio_loop_serves_multiple_requests() {
    let (service, _) = scripted_service([vec![0x90, 0x00], public_key_response()]);

    let (client, server) = tokio::io::duplex(4096);
    let server_task = tokio::spawn(async move {
        let (mut reader, mut writer) = tokio::io::split(server);
        stdio::serve_streams(&service, RunMode::Loop, &mut reader, &mut writer).await
    });

    let (mut client_reader, mut client_writer) = tokio::io::split(client);

    let frame = frame::encode(&serde_json::json!({"command": "getPublicKey"})).unwrap();
    client_writer.write_all(&frame).await.unwrap();
    let first: serde_json::Value = frame::read_message(&mut client_reader, FRAME_READ_TIMEOUT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first["publicKey"], hex::encode(uncompressed_point()));

    let frame = frame::encode(&serde_json::json!({"command": "reboot"})).unwrap();
    client_writer.write_all(&frame).await.unwrap();
    let second: serde_json::Value = frame::read_message(&mut client_reader, FRAME_READ_TIMEOUT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second["error"], "Unknown command");

    // Closing the pipe ends the loop cleanly
    drop(client_writer);
    drop(client_reader);
    assert!(server_task.await.unwrap().is_ok());
}

#[tokio::test]
async fn stdio_once_exits_after_one_exchange() {
    let (service, _) = scripted_service([vec![0x90, 0x00], public_key_response()]);

    let (client, server) = tokio::io::duplex(4096);
    let server_task = tokio::spawn(async move {
        let (mut reader, mut writer) = tokio::io::split(server);
        stdio::serve_streams(&service, RunMode::Once, &mut reader, &mut writer).await
    });

    let (mut client_reader, mut client_writer) = tokio::io::split(client);
    let frame = frame::encode(&serde_json::json!({"command": "getPublicKey"})).unwrap();
    client_writer.write_all(&frame).await.unwrap();

    let response: serde_json::Value = frame::read_message(&mut client_reader, FRAME_READ_TIMEOUT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(response["publicKey"], hex::encode(uncompressed_point()));

    // The server side returns without waiting for another frame
    assert!(server_task.await.unwrap().is_ok());
}

#[tokio::test(start_paused = true)]
async fn stdio_once_times_out_without_input() {
    let (service, _) = scripted_service(Vec::<Vec<u8>>::new());

    let (_client, server) = tokio::io::duplex(64);
    let (mut reader, mut writer) = tokio::io::split(server);

    let result = stdio::serve_streams(&service, RunMode::Once, &mut reader, &mut writer).await;
    assert!(matches!(result, Err(FrameError::Timeout)));
}

fn sign_request_body(hash: &str, pin: Option<&str>) -> Full<Bytes> {
    let mut body = serde_json::json!({ "hash": hash });
    if let Some(pin) = pin {
        body["pin"] = pin.into();
    }
    Full::new(Bytes::from(serde_json::to_vec(&body).unwrap()))
}

async fn body_json(response: hyper::Response<Full<Bytes>>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn http_sign_route_happy_path() {
    let (service, _) = scripted_service(sign_script());

    let request = HttpRequest::builder()
        .method(Method::POST)
        .uri("/sign")
        .body(sign_request_body(&hex::encode([0u8; 64]), Some("123456")))
        .unwrap();

    let response = http::handle(&service, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["signature"], hex::encode([0x5A; 64]));
    assert_eq!(body["publicKey"], hex::encode(uncompressed_point()));
}

#[tokio::test]
async fn http_unmatched_routes_are_json_404() {
    let (service, _) = scripted_service(Vec::<Vec<u8>>::new());

    for (method, path) in [
        (Method::GET, "/sign"),
        (Method::POST, "/other"),
        (Method::PUT, "/"),
    ] {
        let request = HttpRequest::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = http::handle(&service, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Not Found");
    }
}

#[tokio::test]
async fn http_malformed_body_is_400() {
    let (service, _) = scripted_service(Vec::<Vec<u8>>::new());

    let request = HttpRequest::builder()
        .method(Method::POST)
        .uri("/sign")
        .body(Full::new(Bytes::from_static(b"not json")))
        .unwrap();

    let response = http::handle(&service, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_card_failure_is_500() {
    // VERIFY answers with a blocked retry counter
    let (service, _) = scripted_service([vec![0x90, 0x00], vec![0x69, 0x83]]);

    let request = HttpRequest::builder()
        .method(Method::POST)
        .uri("/sign")
        .body(sign_request_body(&hex::encode([0u8; 64]), Some("123456")))
        .unwrap();

    let response = http::handle(&service, request).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("PIN blocked")
    );
}
