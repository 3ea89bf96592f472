//! SigV4-signed JSON over HTTPS.

use std::time::{Duration, SystemTime};

use aws_config::SdkConfig;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{
    SignableBody, SignableRequest, SigningParams, SigningSettings, sign,
};
use aws_sigv4::sign::v4;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{AgentCoreError, AgentCoreResult};

/// Signing name shared by the AgentCore data and control planes.
pub const SERVICE_NAME: &str = "bedrock-agentcore";

const DEFAULT_REGION: &str = "us-east-1";

/// An HTTP client that signs every request with the ambient AWS credentials.
#[derive(Clone)]
pub struct SignedClient {
    http: reqwest::Client,
    credentials: Option<SharedCredentialsProvider>,
    region: String,
    service: String,
}

impl SignedClient {
    pub fn new(sdk_config: &SdkConfig, service: impl Into<String>) -> Self {
        let region = sdk_config
            .region()
            .map(|r| r.as_ref().to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        Self {
            http: reqwest::Client::new(),
            credentials: sdk_config.credentials_provider(),
            region,
            service: service.into(),
        }
    }

    /// Replace the underlying HTTP client, e.g. to set a request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> AgentCoreResult<Self> {
        self.http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Send a signed request and return the raw response body.
    ///
    /// Non-2xx responses become [`AgentCoreError::Status`] with the error code
    /// taken from `x-amzn-errortype` or the body's `__type`.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> AgentCoreResult<Vec<u8>> {
        let provider = self
            .credentials
            .as_ref()
            .ok_or_else(|| AgentCoreError::Credentials("no credentials provider configured".into()))?;
        let credentials = provider
            .provide_credentials()
            .await
            .map_err(|e| AgentCoreError::Credentials(e.to_string()))?;
        let identity = credentials.into();

        let signing_params: SigningParams<'_> = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(&self.service)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| AgentCoreError::Signing(e.to_string()))?
            .into();

        let mut all_headers: Vec<(&str, &str)> = vec![("content-type", "application/json")];
        all_headers.extend_from_slice(headers);

        let signable = SignableRequest::new(
            method.as_str(),
            url,
            all_headers.iter().copied(),
            SignableBody::Bytes(&body),
        )
        .map_err(|e| AgentCoreError::Signing(e.to_string()))?;
        let (instructions, _signature) = sign(signable, &signing_params)
            .map_err(|e| AgentCoreError::Signing(e.to_string()))?
            .into_parts();

        let mut request = self.http.request(method.clone(), url);
        for (name, value) in &all_headers {
            request = request.header(*name, *value);
        }
        for (name, value) in instructions.headers() {
            request = request.header(name, value);
        }

        debug!(%method, url, bytes = body.len(), "agentcore request");
        let response = request.body(body).send().await?;
        let status = response.status();
        let error_type = response
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();
        debug!(%method, url, status = status.as_u16(), bytes = bytes.len(), "agentcore response");

        if !status.is_success() {
            let (code, message) = parse_error(error_type.as_deref(), &bytes);
            return Err(AgentCoreError::Status {
                status: status.as_u16(),
                code,
                message,
            });
        }
        Ok(bytes)
    }

    pub async fn post_json<B, R>(&self, url: &str, body: &B) -> AgentCoreResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)?;
        let bytes = self.send(Method::POST, url, &[], payload).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn get_json<R: DeserializeOwned>(&self, url: &str) -> AgentCoreResult<R> {
        let bytes = self.send(Method::GET, url, &[], Vec::new()).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// `(code, message)` from an AWS JSON error response.
pub(crate) fn parse_error(error_type: Option<&str>, body: &[u8]) -> (String, String) {
    let json: serde_json::Value = serde_json::from_slice(body).unwrap_or(serde_json::Value::Null);
    let code = error_type
        .map(str::to_string)
        .or_else(|| json.get("__type").and_then(|v| v.as_str()).map(str::to_string))
        .map(|c| normalize_error_code(&c))
        .unwrap_or_else(|| "Unknown".to_string());
    let message = json
        .get("message")
        .or_else(|| json.get("Message"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
    (code, message)
}

/// `ValidationException:http://internal.amazon.com/...` and
/// `com.amazonaws.x#ValidationException` both become `ValidationException`.
fn normalize_error_code(raw: &str) -> String {
    let head = raw.split(':').next().unwrap_or(raw);
    head.rsplit('#').next().unwrap_or(head).to_string()
}
