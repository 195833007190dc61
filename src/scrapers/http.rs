use crate::config::{ClientConfig, RetryPolicy};
use crate::errors::{Result, ScraperError};
use crate::util::retry_with_backoff;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Shared HTTP session.
///
/// Wraps one `reqwest::Client` (connection pool, cookie store, default
/// headers) built from a [`ClientConfig`]. Cloning is cheap and every clone
/// talks through the same pool.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, header_value(&config.accept)?);
        headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .timeout(config.timeout)
            .build()
            .map_err(ScraperError::RequestError)?;

        Ok(Self { client, retry: config.retry })
    }

    /// GET with retries; returns the response only for a 2xx status.
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        retry_with_backoff(&self.retry, url, || async move {
            let response = self.client.get(url).query(query).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ScraperError::HttpStatus { status: status.as_u16(), url: url.to_string() });
            }
            Ok(response)
        })
        .await
    }

    pub async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self.get(url, query).await?;
        let text = response.text().await?;
        let json: Value = serde_json::from_str(&text)?;
        debug!("成功获取 JSON 响应: {}", url);
        Ok(json)
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url, &[]).await?;
        Ok(response.text().await?)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ScraperError::DataError(format!("invalid header value: {}", e)))
}

/// 请求频率限制，保证同一来源的两次请求间隔不小于 `min_interval`
pub struct RequestPacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(time) = *last {
            let elapsed = time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("等待 {:?} 以遵守频率限制", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_from_default_config() {
        assert!(HttpClient::new(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn bad_header_value_is_rejected() {
        let mut config = ClientConfig::default();
        config.accept = "text/html\n".to_string();
        assert!(HttpClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn pacer_spaces_out_requests() {
        let pacer = RequestPacer::new(Duration::from_millis(50));
        let start = Instant::now();
        pacer.wait().await;
        pacer.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
