//! Signed request dispatch.

use std::sync::Arc;

use deta_credentials::{
    CONTENT_TYPE_HEADER, CanonicalRequest, Credential, SIGNATURE_HEADER, SignedHeaders,
    TIMESTAMP_HEADER,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};
use url::Url;

use crate::{Clock, ClientConfig, ClientError, Request, Response, SystemClock};

/// Sends requests to the API host, signing each one as it goes out.
///
/// Holds nothing mutable besides the HTTP connection pool: the credential is
/// immutable and every [`send`](Self::send) takes its own timestamp, so a
/// dispatcher can be cloned and shared across tasks freely.
///
/// # Examples
///
/// ```no_run
/// use deta_client::{ClientConfig, Dispatcher, Request};
/// use deta_credentials::Credential;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let credential: Credential = "abc123_s3cr3t".parse()?;
/// let dispatcher = Dispatcher::new(&ClientConfig::default(), credential)?;
///
/// let response = dispatcher.send(&Request::get("/spaces/")).await?;
/// println!("{}", response.text());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Dispatcher {
    host: Url,
    credential: Credential,
    headers: Vec<(String, String)>,
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    /// Create a dispatcher for the configured host.
    pub fn new(config: &ClientConfig, credential: Credential) -> Result<Self, ClientError> {
        for (name, _) in &config.headers {
            ensure_not_reserved(name)?;
        }

        Ok(Self {
            host: config.host_url()?,
            credential,
            headers: config.headers.clone(),
            http: config.http_client()?,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The credential requests are signed with.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Compute the signing headers for `request` carrying `payload` at `timestamp`.
    ///
    /// `payload` must be the bytes that will be transmitted.
    pub fn sign(&self, request: &Request, payload: &[u8], timestamp: u64) -> SignedHeaders {
        let canonical = CanonicalRequest::new(
            request.method().as_str(),
            request.path(),
            timestamp,
            request.content_type(),
            payload,
        );
        self.credential.sign_headers(&canonical)
    }

    /// Sign and send a request.
    ///
    /// The body is serialized exactly once and the resulting bytes are both
    /// signed and transmitted. The timestamp is taken here, at send time, so
    /// calling `send` again (e.g. to retry) produces a fresh signature rather
    /// than replaying an old one.
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        for (name, _) in request.headers() {
            ensure_not_reserved(name)?;
        }

        let payload = request.body().payload()?;
        let url = self.url(request)?;

        let timestamp = self.clock.now();
        let signed = self.sign(request, &payload, timestamp);
        let headers = self.merge_headers(request, &signed)?;

        debug!(
            method = %request.method(),
            path = request.path(),
            timestamp,
            bytes = payload.len(),
            "sending signed request"
        );

        let response = self
            .http
            .request(request.method().clone(), url)
            .headers(headers)
            .body(payload)
            .send()
            .await?;

        let response = Response::read(response).await?;
        if !response.status().is_success() {
            warn!(
                method = %request.method(),
                path = request.path(),
                status = response.status().as_u16(),
                "request rejected"
            );
        }

        response.error_for_status()
    }

    fn url(&self, request: &Request) -> Result<Url, ClientError> {
        if !request.path().starts_with('/') {
            return Err(ClientError::InvalidRequest(format!(
                "path {:?} must start with '/'",
                request.path()
            )));
        }

        let mut url = endpoint(&self.host, request.path())?;
        if !request.query().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query());
        }
        Ok(url)
    }

    fn merge_headers(
        &self,
        request: &Request,
        signed: &SignedHeaders,
    ) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();

        for (name, value) in self.headers.iter().chain(request.headers()) {
            headers.append(header_name(name)?, header_value(name, value)?);
        }

        for (name, value) in signed.headers() {
            headers.insert(header_name(name)?, header_value(name, &value)?);
        }

        Ok(headers)
    }
}

/// Append `path` to the path of `base`.
///
/// Fails if the URL parser would send anything other than the path as
/// written, e.g. by resolving `..` or percent-encoding non-ASCII text.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, ClientError> {
    let expected = format!("{}{}", base.path().trim_end_matches('/'), path);

    let mut url = base.clone();
    url.set_path(&expected);

    if url.path() != expected {
        return Err(ClientError::InvalidRequest(format!(
            "path {path:?} would be sent as {:?}",
            url.path()
        )));
    }
    Ok(url)
}

fn ensure_not_reserved(name: &str) -> Result<(), ClientError> {
    let reserved = [TIMESTAMP_HEADER, SIGNATURE_HEADER, CONTENT_TYPE_HEADER];
    if reserved
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return Err(ClientError::ReservedHeader(name.to_string()));
    }
    Ok(())
}

fn header_name(name: &str) -> Result<HeaderName, ClientError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ClientError::InvalidRequest(format!("invalid header name {name:?}: {e}")))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value)
        .map_err(|e| ClientError::InvalidRequest(format!("invalid value for header {name}: {e}")))
}
