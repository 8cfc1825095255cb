// ABOUTME: HTTP GET readiness check over a plain hyper HTTP/1 connection.
// ABOUTME: Any status other than the expected one, or any connection failure, means not ready.

use async_trait::async_trait;
use http_body_util::Empty;
use hyper::Uri;
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;

use super::check::{CheckFailure, ReadinessCheck};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// `GET url` must answer with `expected_status` within `request_timeout`.
#[derive(Debug, Clone)]
pub struct HttpCheck {
    uri: Uri,
    expected_status: u16,
    request_timeout: Duration,
}

impl HttpCheck {
    pub fn new(url: &str) -> Result<Self, CheckFailure> {
        let uri: Uri = url
            .parse()
            .map_err(|e| CheckFailure::InvalidTarget(format!("{url}: {e}")))?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => {
                return Err(CheckFailure::InvalidTarget(format!(
                    "{url}: unsupported scheme {other}"
                )));
            }
            None => {
                return Err(CheckFailure::InvalidTarget(format!(
                    "{url}: missing http:// scheme"
                )));
            }
        }

        if uri.host().is_none() {
            return Err(CheckFailure::InvalidTarget(format!("{url}: missing host")));
        }

        Ok(Self {
            uri,
            expected_status: 200,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    async fn get(&self) -> Result<u16, CheckFailure> {
        // IPv6 literals keep their brackets in the URI but not in a socket address.
        let host = self
            .uri
            .host()
            .unwrap_or("localhost")
            .trim_start_matches('[')
            .trim_end_matches(']');
        let port = self.uri.port_u16().unwrap_or(80);

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| CheckFailure::Connection(e.to_string()))?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| CheckFailure::Connection(format!("HTTP handshake failed: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::trace!("health check connection closed: {}", e);
            }
        });

        let path = self
            .uri
            .path_and_query()
            .map(|p| p.as_str())
            .unwrap_or("/");
        let authority = self
            .uri
            .authority()
            .map(|a| a.as_str())
            .unwrap_or(host);

        let req = hyper::Request::builder()
            .method("GET")
            .uri(path)
            .header("Host", authority)
            .header("User-Agent", concat!("stackup/", env!("CARGO_PKG_VERSION")))
            .body(Empty::<bytes::Bytes>::new())
            .map_err(|e| CheckFailure::InvalidTarget(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| CheckFailure::Connection(format!("request failed: {e}")))?;

        Ok(resp.status().as_u16())
    }
}

#[async_trait]
impl ReadinessCheck for HttpCheck {
    async fn check(&self) -> Result<(), CheckFailure> {
        let status = tokio::time::timeout(self.request_timeout, self.get())
            .await
            .map_err(|_| CheckFailure::Timeout(self.request_timeout))??;

        if status == self.expected_status {
            Ok(())
        } else {
            Err(CheckFailure::Status {
                expected: self.expected_status,
                actual: status,
            })
        }
    }

    fn describe(&self) -> String {
        format!("GET {}", self.uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response per accepted connection.
    async fn serve(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        serve_on(listener, response)
    }

    fn serve_on(listener: TcpListener, response: &'static str) -> String {
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}/health")
    }

    #[test]
    fn rejects_https_and_missing_scheme() {
        assert!(matches!(
            HttpCheck::new("https://localhost/health"),
            Err(CheckFailure::InvalidTarget(_))
        ));
        assert!(matches!(
            HttpCheck::new("localhost:8000/health"),
            Err(CheckFailure::InvalidTarget(_))
        ));
    }

    #[test]
    fn describe_shows_url() {
        let check = HttpCheck::new("http://localhost:8000/health").unwrap();
        assert_eq!(check.describe(), "GET http://localhost:8000/health");
    }

    #[tokio::test]
    async fn ok_response_is_ready() {
        let url = serve("HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nok").await;
        let check = HttpCheck::new(&url).unwrap();
        assert!(check.check().await.is_ok());
    }

    #[tokio::test]
    async fn ipv6_literal_host_is_reachable() {
        // Hosts without an IPv6 loopback have nothing to connect to.
        let Ok(listener) = TcpListener::bind("[::1]:0").await else {
            return;
        };
        let url = serve_on(listener, "HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nok");
        assert!(url.starts_with("http://[::1]:"));

        let check = HttpCheck::new(&url).unwrap();
        assert!(check.check().await.is_ok());
    }

    #[tokio::test]
    async fn error_status_is_not_ready() {
        let url = serve("HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\n\r\n").await;
        let check = HttpCheck::new(&url).unwrap();
        assert!(matches!(
            check.check().await,
            Err(CheckFailure::Status {
                expected: 200,
                actual: 503
            })
        ));
    }

    #[tokio::test]
    async fn refused_connection_is_not_ready() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let check = HttpCheck::new(&format!("http://{addr}/health")).unwrap();
        assert!(!check.is_ready().await);
    }
}
