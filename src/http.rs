//! Blocking HTTP access to the gallery site.
//!
//! Everything that touches the network goes through the [`Http`] trait so the
//! catalog and cache logic can be exercised without a live site.

use reqwest::blocking::Client;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum HttpError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

pub trait Http {
    /// GET a page and return its body as text
    fn get_text(&self, url: &str) -> Result<String, HttpError>;

    /// GET a binary resource
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, HttpError>;
}

pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, HttpError> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().map_err(|e| HttpError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

impl Http for HttpClient {
    fn get_text(&self, url: &str) -> Result<String, HttpError> {
        self.get(url)?.text().map_err(|e| HttpError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        self.get(url)?
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| HttpError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}
