//! HTTP binding
//!
//! One route: `POST /sign` with a JSON body `{hash, pin}` answers
//! `{signature, publicKey}` on success or `{error}` with an error status.
//! Everything else is a JSON 404.

use std::fmt;
use std::net::SocketAddr;

use cardbridge_openpgp::SessionFactory;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::service::service_fn;
use hyper::{Method, Request as HttpRequest, Response as HttpResponse, StatusCode, header};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::protocol::Response;
use crate::service::SignerService;

#[derive(Debug, Deserialize)]
struct SignBody {
    hash: String,
    #[serde(default)]
    pin: Option<String>,
}

/// Bind the listener and serve connections until the process exits
pub async fn serve<F>(service: SignerService<F>, addr: SocketAddr) -> std::io::Result<()>
where
    F: SessionFactory + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "HTTP endpoint listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service.clone();

        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let handler = service_fn(move |request| {
                let service = service.clone();
                async move { Ok::<_, hyper::Error>(handle(&service, request).await) }
            });

            if let Err(err) = hyper::server::conn::http1::Builder::new()
                .serve_connection(io, handler)
                .await
            {
                debug!(%peer, %err, "connection ended");
            }
        });
    }
}

/// Route one request
///
/// # Panics
///
/// Panics if `Response::builder()` fails, which cannot happen with the
/// static headers used here.
pub async fn handle<F, B>(
    service: &SignerService<F>,
    request: HttpRequest<B>,
) -> HttpResponse<Full<Bytes>>
where
    F: SessionFactory + Send + Sync + 'static,
    B: Body,
    B::Error: fmt::Display,
{
    if request.method() != Method::POST || request.uri().path() != "/sign" {
        return json_response(StatusCode::NOT_FOUND, &Response::error("Not Found"));
    }

    let body = match request.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &Response::error(format!("failed to read body: {err}")),
            );
        }
    };

    let body: SignBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(err) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &Response::error(format!("invalid request body: {err}")),
            );
        }
    };

    match service.sign_hash(&body.hash, body.pin).await {
        Ok(result) => json_response(
            StatusCode::OK,
            &Response::SignatureWithKey {
                signature: hex::encode(result.signature),
                public_key: hex::encode(result.public_key),
            },
        ),
        Err(err) => json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &Response::error(err.to_string()),
        ),
    }
}

fn json_response(status: StatusCode, body: &Response) -> HttpResponse<Full<Bytes>> {
    let payload = serde_json::to_vec(body).expect("response envelope serializes");

    HttpResponse::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(payload)))
        .expect("static response")
}
