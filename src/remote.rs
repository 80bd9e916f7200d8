//! Remote Source: the backend API holding the authoritative record set.
//!
//! The response body is untrusted. Anything that is not a well-formed
//! `{"error": <int>, "data": [...]}` document is a transport failure, and the
//! `data` payload is only decoded when `error == 0`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::AppConfig;
use crate::state::Record;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unexpected HTTP status {0}")]
    Status(StatusCode),
    #[error("Malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Result of one fetch. `error_code != 0` means the records must be ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    pub error_code: i64,
    pub records: Vec<Record>,
}

impl RemoteResponse {
    pub fn ok(records: Vec<Record>) -> Self {
        Self {
            error_code: 0,
            records,
        }
    }

    pub fn rejected(error_code: i64) -> Self {
        Self {
            error_code,
            records: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }
}

#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch(&self) -> Result<RemoteResponse, RemoteError>;
}

#[derive(Deserialize)]
struct WireEnvelope {
    error: i64,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct WireRecord {
    #[serde(default)]
    id: i64,
    kode_provinsi: i64,
    nama_provinsi: String,
    kode_kabupaten_kota: i64,
    nama_kabupaten_kota: String,
    rata_rata_lama_sekolah: f64,
    satuan: String,
    tahun: i32,
}

impl From<WireRecord> for Record {
    fn from(wire: WireRecord) -> Self {
        Record {
            id: wire.id,
            province_code: wire.kode_provinsi,
            province_name: wire.nama_provinsi,
            regency_code: wire.kode_kabupaten_kota,
            regency_name: wire.nama_kabupaten_kota,
            value: wire.rata_rata_lama_sekolah,
            unit: wire.satuan,
            year: wire.tahun,
        }
    }
}

/// Decode an API response body
pub fn decode_response(body: &[u8]) -> Result<RemoteResponse, RemoteError> {
    let envelope: WireEnvelope = serde_json::from_slice(body)?;
    if envelope.error != 0 {
        return Ok(RemoteResponse::rejected(envelope.error));
    }

    let records: Vec<WireRecord> = match envelope.data {
        serde_json::Value::Null => Vec::new(),
        data => serde_json::from_value(data)?,
    };

    Ok(RemoteResponse::ok(
        records.into_iter().map(Record::from).collect(),
    ))
}

pub struct HttpRemoteSource {
    client: reqwest::Client,
    url: String,
}

impl HttpRemoteSource {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, RemoteError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url: url.into(),
        })
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, RemoteError> {
        Self::new(config.api_url.clone(), config.request_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch(&self) -> Result<RemoteResponse, RemoteError> {
        log::debug!("GET {}", self.url);
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status));
        }

        let body = response.bytes().await?;
        decode_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const BODY: &str = r#"{
        "message": "OK",
        "error": 0,
        "data": [
            {
                "id": 1,
                "kode_provinsi": 32,
                "nama_provinsi": "JAWA BARAT",
                "kode_kabupaten_kota": 3201,
                "nama_kabupaten_kota": "KABUPATEN BOGOR",
                "rata_rata_lama_sekolah": 8.32,
                "satuan": "TAHUN",
                "tahun": 2022
            },
            {
                "kode_provinsi": 32,
                "nama_provinsi": "JAWA BARAT",
                "kode_kabupaten_kota": 3273,
                "nama_kabupaten_kota": "KOTA BANDUNG",
                "rata_rata_lama_sekolah": 11.02,
                "satuan": "TAHUN",
                "tahun": 2022
            }
        ]
    }"#;

    /// Serve one canned HTTP response on a local port
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{}/data", addr)
    }

    // Local test servers must not go through a proxy configured in the environment
    fn local_source(url: String) -> HttpRemoteSource {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpRemoteSource::with_client(client, url)
    }

    #[test]
    fn test_from_config_uses_api_url() {
        let config = AppConfig {
            api_url: "http://localhost:9/records".to_string(),
            request_timeout_ms: Some(100),
            ..AppConfig::default()
        };
        let source = HttpRemoteSource::from_config(&config).unwrap();
        assert_eq!(source.url(), "http://localhost:9/records");
    }

    #[test]
    fn test_decode_success() {
        let response = decode_response(BODY.as_bytes()).unwrap();
        assert!(response.is_success());
        assert_eq!(response.records.len(), 2);

        let bogor = &response.records[0];
        assert_eq!(bogor.id, 1);
        assert_eq!(bogor.regency_name, "KABUPATEN BOGOR");
        assert_eq!(bogor.value, 8.32);
        assert_eq!(bogor.year, 2022);

        // Records without an id are new to the local store
        assert_eq!(response.records[1].id, 0);
    }

    #[test]
    fn test_decode_rejection_ignores_payload() {
        let response = decode_response(br#"{"error": 1, "data": "nope"}"#).unwrap();
        assert_eq!(response, RemoteResponse::rejected(1));
    }

    #[test]
    fn test_decode_empty_and_missing_data() {
        assert_eq!(
            decode_response(br#"{"error": 0, "data": []}"#).unwrap(),
            RemoteResponse::ok(Vec::new())
        );
        assert_eq!(
            decode_response(br#"{"error": 0}"#).unwrap(),
            RemoteResponse::ok(Vec::new())
        );
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            decode_response(b"<html>gateway timeout</html>"),
            Err(RemoteError::Malformed(_))
        ));
        assert!(matches!(
            decode_response(br#"{"data": []}"#),
            Err(RemoteError::Malformed(_))
        ));
        assert!(matches!(
            decode_response(br#"{"error": 0, "data": [{"tahun": "soon"}]}"#),
            Err(RemoteError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_http_fetch() {
        let url = serve_once("HTTP/1.1 200 OK", BODY).await;
        let source = local_source(url);

        let response = source.fetch().await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.records.len(), 2);
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let url = serve_once("HTTP/1.1 503 Service Unavailable", "{}").await;
        let source = local_source(url);

        match source.fetch().await {
            Err(RemoteError::Status(status)) => assert_eq!(status.as_u16(), 503),
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_unreachable() {
        // Bind then drop to get a port nothing listens on
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let source = local_source(format!("http://{}/data", addr));

        assert!(matches!(source.fetch().await, Err(RemoteError::Network(_))));
    }
}
