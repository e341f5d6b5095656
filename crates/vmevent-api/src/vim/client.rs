// vim25 SOAP client
//
// Wraps `reqwest::Client` with envelope construction, SOAPAction versioning
// and fault mapping. Endpoint groups (session, events, property collector,
// descriptions) are inherent methods in sibling modules so this file stays
// focused on transport mechanics.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::vim::models::{ManagedObjectReference, ServiceContent};
use crate::vim::soap::{self, Request};
use crate::xml::XmlNode;

/// API version sent in `SOAPAction` until the endpoint reports its own.
const DEFAULT_API_VERSION: &str = "8.0";

/// HTTP client for one vim25 `/sdk` endpoint.
///
/// Construction performs `RetrieveServiceContent`, so a `VimClient` always
/// knows the manager references for the endpoint it talks to. The session
/// cookie lives in the shared cookie jar; call [`login`](Self::login) before
/// anything that needs authorization.
pub struct VimClient {
    http: reqwest::Client,
    sdk_url: Url,
    timeout: Duration,
    api_version: String,
    service: ServiceContent,
}

impl VimClient {
    /// Create a client from a `TransportConfig` and fetch the service content.
    ///
    /// A cookie jar is added if the config doesn't carry one; vim25 sessions
    /// are cookie-based.
    pub async fn connect(sdk_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Self::connect_with_client(http, sdk_url, transport.timeout).await
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub async fn connect_with_client(
        http: reqwest::Client,
        sdk_url: Url,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let this = ManagedObjectReference::new("ServiceInstance", "ServiceInstance");
        let req = Request::new("RetrieveServiceContent", &this);
        let resp = send(&http, &sdk_url, DEFAULT_API_VERSION, req, Some(timeout)).await?;
        let returnval = resp
            .child("returnval")
            .ok_or_else(|| Error::missing("ServiceContent", &resp.name))?;
        let service = ServiceContent::from_node(returnval)?;

        let api_version = if service.about.api_version.is_empty() {
            DEFAULT_API_VERSION.to_owned()
        } else {
            service.about.api_version.clone()
        };
        debug!(
            endpoint = %sdk_url,
            product = %service.about.full_name,
            api_version = %api_version,
            "retrieved service content"
        );

        Ok(Self {
            http,
            sdk_url,
            timeout,
            api_version,
            service,
        })
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The `/sdk` endpoint URL.
    pub fn sdk_url(&self) -> &Url {
        &self.sdk_url
    }

    /// Manager references reported by the endpoint.
    pub fn service(&self) -> &ServiceContent {
        &self.service
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Per-call timeout for ordinary (non-blocking) methods.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Invoke a method with the default per-call timeout.
    pub(crate) async fn call(&self, req: Request) -> Result<XmlNode, Error> {
        self.call_with_timeout(req, Some(self.timeout)).await
    }

    /// Invoke a method; `None` disables the request timeout entirely.
    pub(crate) async fn call_with_timeout(
        &self,
        req: Request,
        timeout: Option<Duration>,
    ) -> Result<XmlNode, Error> {
        send(&self.http, &self.sdk_url, &self.api_version, req, timeout).await
    }
}

async fn send(
    http: &reqwest::Client,
    url: &Url,
    api_version: &str,
    req: Request,
    timeout: Option<Duration>,
) -> Result<XmlNode, Error> {
    let op = req.op();
    debug!(op, "POST {}", url);

    let mut builder = http
        .post(url.clone())
        .header(CONTENT_TYPE, "text/xml; charset=utf-8")
        .header("SOAPAction", format!("urn:vim25/{api_version}"))
        .body(req.into_envelope());
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    let resp = builder.send().await.map_err(|e| timeout_or(e, timeout))?;
    let status = resp.status();
    let body = resp.text().await.map_err(|e| timeout_or(e, timeout))?;

    // Faults arrive as HTTP 500 with a regular envelope.
    let doc = match XmlNode::parse(&body) {
        Ok(doc) => doc,
        Err(_) if !status.is_success() => {
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }
        Err(e) => return Err(e),
    };

    if !status.is_success() {
        return Err(soap::find_fault(&doc).unwrap_or(Error::Http {
            status: status.as_u16(),
            body,
        }));
    }

    soap::unwrap_response(&doc, op)
}

fn timeout_or(err: reqwest::Error, timeout: Option<Duration>) -> Error {
    match timeout {
        Some(t) if err.is_timeout() => Error::Timeout {
            timeout_secs: t.as_secs(),
        },
        _ => Error::Transport(err),
    }
}
