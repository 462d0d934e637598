//! HTTP client for the DartPad service
//!
//! Every endpoint takes a JSON body posted as `text/plain; charset=utf-8`,
//! which keeps the requests CORS-simple for the browser front-end the service
//! was built for. Non-success statuses become [`Error::Http`] and are never
//! retried here.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use url::Url;

use padlink_core::prelude::*;
use padlink_core::{
    AnalysisResult, CompileRequest, CompileResponse, CompletionResult, FormatResult,
    GenerateCodeRequest, ReloadMode, SourceRequest, UpdateCodeRequest, VersionInfo,
};

use crate::channel::{Channel, Endpoint};
use crate::services::DartServices;

/// Content type the service expects for request bodies
pub const REQUEST_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed [`DartServices`] implementation
#[derive(Debug, Clone)]
pub struct DartServicesClient {
    http: Client,
    /// Host URL, always ending in `/`
    base: Url,
}

impl DartServicesClient {
    /// Create a client for an explicit host URL (e.g. `http://localhost:8080`)
    pub fn new(host: &str, request_timeout: Duration) -> Result<Self> {
        let base = parse_host(host)?;
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::transport(format!("Failed to create HTTP client: {}", e)))?;

        info!("DartPad service host: {}", base);
        Ok(Self { http, base })
    }

    /// Create a client for a release channel
    pub fn for_channel(channel: &Channel, request_timeout: Duration) -> Result<Self> {
        Self::new(&channel.host_url(), request_timeout)
    }

    pub fn host(&self) -> &Url {
        &self.base
    }

    /// Full URL of an endpoint
    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url> {
        self.base
            .join(&endpoint.path())
            .map_err(|_| Error::invalid_host(self.base.to_string()))
    }

    /// POST `body` and return the raw response text
    async fn post_text<B: Serialize + ?Sized>(&self, endpoint: Endpoint, body: &B) -> Result<String> {
        let url = self.endpoint_url(endpoint)?;
        let payload = serde_json::to_string(body)?;

        debug!("POST {} ({} bytes)", url, payload.len());

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, REQUEST_CONTENT_TYPE)
            .body(payload)
            .send()
            .await
            .map_err(|e| map_transport_error(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned {}", endpoint, status);
            return Err(Error::http(
                endpoint.name(),
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| map_transport_error(endpoint, e))
    }

    /// POST `body` and decode the JSON response; an empty body decodes to `T::default()`
    async fn post_json<B, T>(&self, endpoint: Endpoint, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Default,
    {
        let text = self.post_text(endpoint, body).await?;
        decode_body(endpoint, &text)
    }
}

impl DartServices for DartServicesClient {
    async fn compile(&self, request: &CompileRequest, mode: ReloadMode) -> Result<CompileResponse> {
        self.post_json(Endpoint::for_compile(mode), request).await
    }

    async fn analyze(&self, source: &str) -> Result<AnalysisResult> {
        self.post_json(Endpoint::Analyze, &SourceRequest::new(source))
            .await
    }

    async fn format(&self, source: &str, offset: usize) -> Result<FormatResult> {
        self.post_json(Endpoint::Format, &SourceRequest::at(source, offset))
            .await
    }

    async fn complete(&self, source: &str, offset: usize) -> Result<CompletionResult> {
        self.post_json(Endpoint::Complete, &SourceRequest::at(source, offset))
            .await
    }

    async fn version(&self) -> Result<VersionInfo> {
        self.post_json(Endpoint::Version, &json!({})).await
    }

    async fn generate_code(&self, request: &GenerateCodeRequest) -> Result<String> {
        let source = self.post_text(Endpoint::GenerateCode, request).await?;
        non_empty_source(source)
    }

    async fn update_code(&self, request: &UpdateCodeRequest) -> Result<String> {
        let source = self.post_text(Endpoint::UpdateCode, request).await?;
        non_empty_source(source)
    }
}

fn parse_host(host: &str) -> Result<Url> {
    let mut normalized = host.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    let url = Url::parse(&normalized).map_err(|_| Error::invalid_host(host))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(Error::invalid_host(host)),
    }
}

fn decode_body<T: DeserializeOwned + Default>(endpoint: Endpoint, text: &str) -> Result<T> {
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(text)
        .map_err(|e| Error::protocol(format!("{} response: {}", endpoint, e)))
}

fn non_empty_source(source: String) -> Result<String> {
    if source.trim().is_empty() {
        Err(Error::generation("the service returned no code"))
    } else {
        Ok(source)
    }
}

fn map_transport_error(endpoint: Endpoint, error: reqwest::Error) -> Error {
    if let Some(status) = error.status() {
        Error::http(
            endpoint.name(),
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
        )
    } else if error.is_timeout() {
        Error::transport(format!("{} timed out: {}", endpoint, error))
    } else if error.is_connect() {
        Error::transport(format!("{} connection error: {}", endpoint, error))
    } else {
        Error::transport(format!("{}: {}", endpoint, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(host: &str) -> DartServicesClient {
        DartServicesClient::new(host, DEFAULT_REQUEST_TIMEOUT).unwrap()
    }

    #[test]
    fn test_endpoint_url_from_bare_host() {
        let client = client("http://localhost:8080");
        assert_eq!(
            client.endpoint_url(Endpoint::CompileNewDdc).unwrap().as_str(),
            "http://localhost:8080/api/v3/compileNewDDC"
        );
    }

    #[test]
    fn test_endpoint_url_keeps_host_path_prefix() {
        let client = client("https://example.com/dartpad");
        assert_eq!(
            client.endpoint_url(Endpoint::Analyze).unwrap().as_str(),
            "https://example.com/dartpad/api/v3/analyze"
        );
    }

    #[test]
    fn test_for_channel() {
        let client = DartServicesClient::for_channel(&Channel::Main, DEFAULT_REQUEST_TIMEOUT)
            .unwrap();
        assert_eq!(
            client
                .endpoint_url(Endpoint::CompileNewDdcReload)
                .unwrap()
                .as_str(),
            "https://master.api.dartpad.dev/api/v3/compileNewDDCReload"
        );
    }

    #[test]
    fn test_invalid_host_rejected() {
        let err = DartServicesClient::new("not a url", DEFAULT_REQUEST_TIMEOUT).unwrap_err();
        assert!(matches!(err, Error::InvalidHost { .. }));
        let err = DartServicesClient::new("ftp://example.com", DEFAULT_REQUEST_TIMEOUT).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_decode_empty_body_is_default() {
        let resp: CompileResponse = decode_body(Endpoint::CompileNewDdcReload, "  ").unwrap();
        assert_eq!(resp, CompileResponse::default());
    }

    #[test]
    fn test_decode_malformed_body_is_protocol_error() {
        let err = decode_body::<AnalysisResult>(Endpoint::Analyze, "<html>").unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_non_empty_source() {
        assert!(non_empty_source("void main() {}".to_string()).is_ok());
        assert!(matches!(
            non_empty_source("\n".to_string()),
            Err(Error::Generation { .. })
        ));
    }
}
