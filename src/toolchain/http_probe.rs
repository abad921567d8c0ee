//! Availability probe over HTTP

use log::debug;

/// Checks whether a URL currently serves a successful response
#[derive(Debug, Clone, Default)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// `true` for a 2xx response. Transport errors count as "not yet", like a failed download.
    pub async fn is_available(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                debug!("GET {} -> {}", url, status);
                status.is_success()
            }
            Err(e) => {
                debug!("GET {} failed: {}", url, e);
                false
            }
        }
    }
}
