//! Test helpers for collection pipeline integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use weather_collector::{Broker, PublishError, Reading, Settings};

/// How the stub weather API answers each request.
#[derive(Clone)]
pub enum StubBehavior {
    /// 200 with the given JSON body
    Json(String),
    /// Given status code with a short body
    Status(u16),
    /// Accept the connection and never answer
    Hang,
}

/// Minimal HTTP/1.1 server standing in for a weather API.
pub struct StubServer {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(behavior: StubBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = requests.clone();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let behavior = behavior.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    let request_line = request.lines().next().unwrap_or_default().to_string();
                    seen.lock().unwrap().push(request_line);

                    let (status, body) = match behavior {
                        StubBehavior::Json(body) => (200, body),
                        StubBehavior::Status(code) => (code, "{\"error\":\"stub\"}".to_string()),
                        StubBehavior::Hang => {
                            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                            return;
                        }
                    };
                    let response = format!(
                        "HTTP/1.1 {} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}/v1/forecast", self.addr)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Broker that records payloads and can refuse every delivery.
#[derive(Default)]
pub struct RecordingBroker {
    pub refuse: bool,
    pub attempts: AtomicU32,
    pub payloads: Mutex<Vec<Vec<u8>>>,
}

impl RecordingBroker {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.payloads
            .lock()
            .unwrap()
            .iter()
            .map(|p| Reading::from_json(p).unwrap())
            .collect()
    }
}

impl Broker for RecordingBroker {
    async fn deliver(&self, _queue: &str, payload: &[u8]) -> Result<(), PublishError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(PublishError::Broker("connection refused".to_string()));
        }
        self.payloads.lock().unwrap().push(payload.to_vec());
        Ok(())
    }
}

/// Settings pointing at a stub source with immediate retries.
pub fn settings_for(base_url: &str) -> Settings {
    let base_url = base_url.to_string();
    Settings::from_lookup(move |key| match key {
        "COLLECTOR_LAT" => Some("-23.55".to_string()),
        "COLLECTOR_LON" => Some("-46.63".to_string()),
        "COLLECTOR_CITY" => Some("São Paulo".to_string()),
        "COLLECTOR_INTERVAL_MINUTES" => Some("30".to_string()),
        "OPEN_METEO_BASE_URL" => Some(base_url.clone()),
        "COLLECTOR_HTTP_TIMEOUT_SECS" => Some("1".to_string()),
        "COLLECTOR_RETRY_DELAY_SECS" => Some("0".to_string()),
        _ => None,
    })
}
