//! The HTTP seam of the OTLP exporter.
//!
//! Exporters send fully built [`Request`]s through an [`HttpClient`] and
//! inspect the [`Response`] themselves. Implementations must hand back
//! non-success responses as `Ok` so callers can read the status and headers
//! such as `Retry-After`; `Err` is reserved for requests that never produced
//! a response.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]

use async_trait::async_trait;
use std::fmt::Debug;

#[doc(no_inline)]
pub use bytes::Bytes;
#[doc(no_inline)]
pub use http::{Request, Response};

/// Error returned when a request could not be completed.
pub type HttpError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A minimal interface necessary for sending requests over HTTP.
///
/// Users sometime choose HTTP clients that rely on a certain async runtime.
/// This trait allows them to bring their own.
#[async_trait]
pub trait HttpClient: Debug + Send + Sync {
    /// Send the specified HTTP request with a `Bytes` payload.
    ///
    /// Returns the HTTP response, including the status code, headers and
    /// body, whatever the status.
    ///
    /// Returns an error if it can't connect to the server or the request could
    /// not be completed, e.g. because of a timeout or a loss of connection.
    async fn send_bytes(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError>;
}

#[cfg(feature = "reqwest")]
mod reqwest {
    use otellogs::otel_debug;

    use super::{async_trait, Bytes, HttpClient, HttpError, Request, Response};

    #[async_trait]
    impl HttpClient for reqwest::Client {
        async fn send_bytes(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
            otel_debug!(name: "ReqwestClient.Send", uri = request.uri().to_string());
            let request = request.try_into()?;
            let mut response = self.execute(request).await?;
            let headers = std::mem::take(response.headers_mut());
            let mut http_response = Response::builder()
                .status(response.status())
                .body(response.bytes().await?)?;
            *http_response.headers_mut() = headers;

            Ok(http_response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct EchoClient {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpClient for EchoClient {
        async fn send_bytes(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
            self.seen.lock().unwrap().push(request.uri().to_string());
            if request.body().is_empty() {
                return Err("empty body".into());
            }
            Ok(Response::builder()
                .status(503)
                .header("retry-after", "3")
                .body(request.into_body())?)
        }
    }

    #[tokio::test]
    async fn client_is_usable_as_trait_object() {
        let echo = Arc::new(EchoClient::default());
        let client: Arc<dyn HttpClient> = echo.clone();

        let request = Request::post("http://localhost:4318/v1/logs")
            .body(Bytes::from_static(b"payload"))
            .unwrap();
        let response = client.send_bytes(request).await.unwrap();

        assert_eq!(response.status(), 503);
        assert_eq!(response.headers()["retry-after"], "3");
        assert_eq!(response.body().as_ref(), b"payload");
        assert_eq!(
            echo.seen.lock().unwrap().as_slice(),
            ["http://localhost:4318/v1/logs"]
        );
    }

    #[tokio::test]
    async fn failed_request_is_an_error() {
        let client = EchoClient::default();
        let request = Request::post("http://localhost:4318/v1/logs")
            .body(Bytes::new())
            .unwrap();

        let err = client.send_bytes(request).await.unwrap_err();
        assert_eq!(err.to_string(), "empty body");
    }

    #[cfg(feature = "reqwest")]
    #[tokio::test]
    async fn reqwest_returns_throttled_responses() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(
                    b"HTTP/1.1 429 Too Many Requests\r\n\
                      Retry-After: 7\r\n\
                      Content-Length: 0\r\n\
                      Connection: close\r\n\r\n",
                )
                .await
                .unwrap();
        });

        let request = Request::post(format!("http://{addr}/v1/logs"))
            .body(Bytes::from_static(b"payload"))
            .unwrap();
        let response = ::reqwest::Client::new()
            .send_bytes(request)
            .await
            .unwrap();

        assert_eq!(response.status(), 429);
        assert_eq!(response.headers()["retry-after"], "7");
        server.await.unwrap();
    }
}
