// Localization catalog download
//
// Catalog URIs are paths on the same host as `/sdk`. The request reuses the
// SOAP client's HTTP client so the session cookie and TLS settings apply.

use tracing::debug;

use crate::error::Error;
use crate::vim::client::VimClient;

impl VimClient {
    /// Fetch the raw text of a localization catalog document.
    pub async fn fetch_catalog(&self, uri: &str) -> Result<String, Error> {
        let url = self.sdk_url().join(uri)?;
        debug!("GET {}", url);

        let resp = self
            .http()
            .get(url)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
