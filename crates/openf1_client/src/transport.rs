//! HTTP transport seam.
//!
//! `OpenF1Client` talks to the network through this trait so tests can
//! script responses and count calls without a live server.

use async_trait::async_trait;
use common::config::HttpConfig;
use common::Error;
use serde_json::Value;

/// A raw upstream reply: the status code, plus the parsed JSON body
/// for 200 responses. Non-200 bodies are not needed by the client.
#[derive(Debug, Clone)]
pub struct BackendReply {
    pub status: u16,
    pub body: Option<Value>,
}

#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// Issue one GET and return the status plus parsed body.
    ///
    /// Transport-level trouble (timeout, connect failure, malformed
    /// 200 payload) comes back as `Err`; HTTP error statuses are `Ok`
    /// replies for the client to branch on.
    async fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<BackendReply, Error>;
}

/// Production backend over a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(config: &HttpConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(4)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to build reqwest client");

        Self { client }
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<BackendReply, Error> {
        let resp = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("{url}: {e}"))
                } else {
                    Error::Http(format!("{url}: {e}"))
                }
            })?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Ok(BackendReply { status, body: None });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| Error::Http(format!("malformed payload from {url}: {e}")))?;

        Ok(BackendReply {
            status,
            body: Some(body),
        })
    }
}
