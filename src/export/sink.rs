//! Object sinks: where encoded tables are delivered
//!
//! A destination root is either a local directory (plain path or `file://`)
//! or an HTTP(S) prefix that accepts `PUT`. Each object fully replaces any
//! previous object of the same name, so reruns overwrite. Bodies are
//! streamed; a body that fails midway never replaces the previous object.

use super::body::ObjectBody;
use async_trait::async_trait;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Unsupported destination '{0}'")]
    UnsupportedDestination(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Object body failed: {0}")]
    Body(#[source] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered {status}")]
    Status { url: String, status: u16 },
}

#[async_trait]
pub trait ObjectSink: Send + Sync {
    /// Stream `body` as `object_name` under the destination root, replacing it
    ///
    /// Returns where the object landed.
    async fn put(&self, object_name: &str, body: ObjectBody) -> Result<String, SinkError>;

    /// Destination root, for logging
    fn describe(&self) -> String;
}

/// Writes objects as files in a directory
pub struct LocalDirSink {
    root: PathBuf,
}

impl LocalDirSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalDirSink { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError + '_ {
    move |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl ObjectSink for LocalDirSink {
    async fn put(&self, object_name: &str, body: ObjectBody) -> Result<String, SinkError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(io_error(&self.root))?;

        let target = self.root.join(object_name);
        // Hidden temp name so a crashed run never leaves a half-written <table>.csv
        let staging = self
            .root
            .join(format!(".{}.{}.partial", object_name, std::process::id()));

        if let Err(e) = write_staging(&staging, body).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(io_error(&target)(e));
        }

        Ok(target.display().to_string())
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

async fn write_staging(staging: &Path, mut body: ObjectBody) -> Result<(), SinkError> {
    let file = tokio::fs::File::create(staging)
        .await
        .map_err(io_error(staging))?;
    let mut file = tokio::io::BufWriter::new(file);

    while let Some(chunk) = body.next_chunk().await.map_err(SinkError::Body)? {
        file.write_all(&chunk).await.map_err(io_error(staging))?;
    }

    file.flush().await.map_err(io_error(staging))?;
    Ok(())
}

/// `PUT`s objects below an HTTP(S) prefix
pub struct HttpSink {
    client: reqwest::Client,
    root: Url,
    token: Option<String>,
}

impl HttpSink {
    pub fn new(root: Url, token: Option<String>) -> Result<Self, SinkError> {
        if root.cannot_be_a_base() {
            return Err(SinkError::UnsupportedDestination(root.to_string()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()?;

        Ok(HttpSink { client, root, token })
    }

    /// `<root>/<object_name>`, with the name percent-encoded as one path segment
    pub fn object_url(&self, object_name: &str) -> Result<Url, SinkError> {
        let mut url = self.root.clone();
        url.path_segments_mut()
            .map_err(|_| SinkError::UnsupportedDestination(self.root.to_string()))?
            .pop_if_empty()
            .push(object_name);
        Ok(url)
    }
}

#[async_trait]
impl ObjectSink for HttpSink {
    async fn put(&self, object_name: &str, body: ObjectBody) -> Result<String, SinkError> {
        let url = self.object_url(object_name)?;

        // Length is unknown up front, the body goes out chunked
        let mut request = self
            .client
            .put(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/tab-separated-values")
            .body(reqwest::Body::wrap_stream(body.into_stream()));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(url.to_string())
    }

    fn describe(&self) -> String {
        self.root.to_string()
    }
}

/// Pick the sink for a destination root
pub fn sink_for_destination(
    root: &str,
    token: Option<String>,
) -> Result<Arc<dyn ObjectSink>, SinkError> {
    if root.starts_with("http://") || root.starts_with("https://") {
        let url = Url::parse(root).map_err(|_| SinkError::UnsupportedDestination(root.to_string()))?;
        return Ok(Arc::new(HttpSink::new(url, token)?));
    }

    if let Some(path) = root.strip_prefix("file://") {
        return Ok(Arc::new(LocalDirSink::new(path)));
    }

    if root.contains("://") {
        return Err(SinkError::UnsupportedDestination(root.to_string()));
    }

    if token.is_some() {
        log::warn!("⚠️  Destination token ignored for local destination {}", root);
    }
    Ok(Arc::new(LocalDirSink::new(root)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::body::object_body;
    use std::io::Write;
    use tempfile::tempdir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn entries(dir: &Path) -> Vec<std::ffi::OsString> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect()
    }

    #[tokio::test]
    async fn test_local_put_overwrites() {
        let dir = tempdir().unwrap();
        let sink = LocalDirSink::new(dir.path().join("nested"));

        sink.put("signature.csv", ObjectBody::from_bytes(b"old\n".to_vec()))
            .await
            .unwrap();
        let location = sink
            .put("signature.csv", ObjectBody::from_bytes(b"new\n".to_vec()))
            .await
            .unwrap();

        let target = dir.path().join("nested").join("signature.csv");
        assert_eq!(location, target.display().to_string());
        assert_eq!(std::fs::read(&target).unwrap(), b"new\n");
        assert_eq!(
            entries(&dir.path().join("nested")),
            vec![std::ffi::OsString::from("signature.csv")]
        );
    }

    #[tokio::test]
    async fn test_local_put_streams_large_body() {
        let dir = tempdir().unwrap();
        let sink = LocalDirSink::new(dir.path());

        let (mut writer, body) = object_body();
        let producer = tokio::task::spawn_blocking(move || {
            for i in 0..200_000u32 {
                writeln!(writer, "{}\tsig{}()", i, i).unwrap();
            }
            writer.finish().unwrap()
        });

        sink.put("signature.csv", body).await.unwrap();
        let written = producer.await.unwrap();

        let stored = std::fs::read(dir.path().join("signature.csv")).unwrap();
        assert_eq!(stored.len() as u64, written);
        assert_eq!(stored.iter().filter(|&&b| b == b'\n').count(), 200_000);
    }

    #[tokio::test]
    async fn test_local_failed_body_keeps_previous_object() {
        let dir = tempdir().unwrap();
        let sink = LocalDirSink::new(dir.path());
        sink.put("signature.csv", ObjectBody::from_bytes(b"old\n".to_vec()))
            .await
            .unwrap();

        let (mut writer, body) = object_body();
        let producer = tokio::task::spawn_blocking(move || {
            writer.write_all(b"half a ro").unwrap();
            writer.flush().unwrap();
            writer.abort(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"));
        });

        let result = sink.put("signature.csv", body).await;
        producer.await.unwrap();

        assert!(matches!(result, Err(SinkError::Body(_))));
        assert_eq!(std::fs::read(dir.path().join("signature.csv")).unwrap(), b"old\n");
        assert_eq!(entries(dir.path()), vec![std::ffi::OsString::from("signature.csv")]);
    }

    #[test]
    fn test_destination_selection() {
        let local = sink_for_destination("/tmp/sigflow-out", None).unwrap();
        assert_eq!(local.describe(), "/tmp/sigflow-out");

        let file = sink_for_destination("file:///tmp/sigflow-out", None).unwrap();
        assert_eq!(file.describe(), "/tmp/sigflow-out");

        let http = sink_for_destination("https://storage.example.com/bucket/dump", None).unwrap();
        assert_eq!(http.describe(), "https://storage.example.com/bucket/dump");

        assert!(matches!(
            sink_for_destination("gs://bucket/dump", None),
            Err(SinkError::UnsupportedDestination(_))
        ));
    }

    #[test]
    fn test_object_url_handles_trailing_slash() {
        let root = Url::parse("https://storage.example.com/bucket/dump/").unwrap();
        let sink = HttpSink::new(root, None).unwrap();

        assert_eq!(
            sink.object_url("signature.csv").unwrap().as_str(),
            "https://storage.example.com/bucket/dump/signature.csv"
        );
    }

    /// Decode a complete chunked body, `None` while more bytes are needed
    fn decode_chunked(mut raw: &[u8]) -> Option<Vec<u8>> {
        let mut body = Vec::new();
        loop {
            let line_end = raw.windows(2).position(|w| w == b"\r\n")?;
            let size_field = std::str::from_utf8(&raw[..line_end]).unwrap();
            let size = usize::from_str_radix(size_field.split(';').next().unwrap().trim(), 16).unwrap();
            raw = &raw[line_end + 2..];
            if raw.len() < size + 2 {
                return None;
            }
            if size == 0 {
                return Some(body);
            }
            body.extend_from_slice(&raw[..size]);
            raw = &raw[size + 2..];
        }
    }

    /// Accept one request, answer with `status`, return the head and decoded body
    async fn serve_once(listener: TcpListener, status: &'static str) -> (String, Vec<u8>) {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];

        let (head, body) = loop {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed before sending the full request");
            request.extend_from_slice(&buf[..n]);

            let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&request[..head_end]).to_string();
            let raw_body = &request[head_end + 4..];

            let lower = head.to_lowercase();
            if lower.contains("transfer-encoding: chunked") {
                if let Some(body) = decode_chunked(raw_body) {
                    break (head, body);
                }
                continue;
            }

            let length: usize = lower
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            if raw_body.len() >= length {
                break (head, raw_body[..length].to_vec());
            }
        };

        let response = format!("HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n", status);
        tokio::io::AsyncWriteExt::write_all(&mut socket, response.as_bytes()).await.unwrap();
        tokio::io::AsyncWriteExt::shutdown(&mut socket).await.unwrap();
        (head, body)
    }

    #[tokio::test]
    async fn test_http_put_streams_body_with_token() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(listener, "200 OK"));

        let root = format!("http://{}/dump", addr);
        let sink = sink_for_destination(&root, Some("secret".to_string())).unwrap();

        let (mut writer, body) = object_body();
        let producer = tokio::task::spawn_blocking(move || {
            writer.write_all(b"1\tabc\n").unwrap();
            writer.flush().unwrap();
            writer.write_all(b"2\tdef\n").unwrap();
            writer.finish().unwrap()
        });

        let location = sink.put("signature.csv", body).await.unwrap();
        assert_eq!(producer.await.unwrap(), 12);
        assert_eq!(location, format!("http://{}/dump/signature.csv", addr));

        let (head, body) = server.await.unwrap();
        assert!(head.starts_with("PUT /dump/signature.csv HTTP/1.1\r\n"));
        let head = head.to_lowercase();
        assert!(head.contains("authorization: bearer secret"));
        assert!(head.contains("transfer-encoding: chunked"));
        assert_eq!(body, b"1\tabc\n2\tdef\n".to_vec());
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(listener, "403 Forbidden"));

        let sink = sink_for_destination(&format!("http://{}/dump", addr), None).unwrap();
        let result = sink
            .put("signature.csv", ObjectBody::from_bytes(b"x\n".to_vec()))
            .await;
        server.await.unwrap();

        match result {
            Err(SinkError::Status { status, .. }) => assert_eq!(status, 403),
            other => panic!("expected status error, got {:?}", other.map(|_| ())),
        }
    }
}
