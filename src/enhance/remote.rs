use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default upscaling endpoint; overridable per batch for self-hosted relays.
pub const DEFAULT_SERVICE_URL: &str = "https://fal.run/fal-ai/real-esrgan";
/// Factor requested from the remote model.
pub const UPSCALE_FACTOR: u32 = 2;
/// Quality used for the JPEG submitted to the service.
pub const UPLOAD_JPEG_QUALITY: u8 = 95;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("missing or rejected API credentials")]
    Unauthenticated,
    #[error("upscale service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("invalid response from upscale service: {0}")]
    InvalidResponse(String),
}

/// Black-box seam between the orchestrator and the remote service; lets batch
/// tests script per-file behavior without a network.
pub trait Upscaler {
    fn upscale(&self, jpeg: &[u8], api_key: &str) -> Result<Vec<u8>, RemoteError>;
}

#[derive(Serialize)]
struct UpscalePayload {
    image_url: String,
    scale: u32,
}

#[derive(Deserialize)]
struct UpscaleResponse {
    #[serde(default)]
    image: Option<UpscaledImage>,
}

#[derive(Deserialize)]
struct UpscaledImage {
    #[serde(default)]
    url: String,
}

pub struct RemoteUpscaleClient {
    service_url: String,
    client: Client,
}

impl RemoteUpscaleClient {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> Result<Url, RemoteError> {
        let trimmed = self.service_url.trim();
        if trimmed.is_empty() {
            return Err(RemoteError::ServiceUnavailable(
                "service url is empty".to_string(),
            ));
        }
        Url::parse(trimmed).map_err(|err| RemoteError::ServiceUnavailable(err.to_string()))
    }
}

impl Default for RemoteUpscaleClient {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_URL)
    }
}

impl Upscaler for RemoteUpscaleClient {
    /// Submits a composited JPEG as a base64 data URL, then fetches the
    /// upscaled result from the URL in the success payload.
    fn upscale(&self, jpeg: &[u8], api_key: &str) -> Result<Vec<u8>, RemoteError> {
        let key = api_key.trim();
        if key.is_empty() {
            return Err(RemoteError::Unauthenticated);
        }

        let payload = UpscalePayload {
            image_url: format!("data:image/jpeg;base64,{}", BASE64.encode(jpeg)),
            scale: UPSCALE_FACTOR,
        };

        let response = self
            .client
            .post(self.endpoint()?)
            .header(AUTHORIZATION, format!("Key {}", key))
            .json(&payload)
            .send()
            .map_err(|err| RemoteError::ServiceUnavailable(err.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(RemoteError::Unauthenticated)
            }
            status if !status.is_success() => {
                return Err(RemoteError::ServiceUnavailable(status.to_string()))
            }
            _ => {}
        }

        let parsed = response
            .json::<UpscaleResponse>()
            .map_err(|err| RemoteError::InvalidResponse(err.to_string()))?;
        let result_url = parsed
            .image
            .map(|image| image.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                RemoteError::InvalidResponse("missing upscaled image url".to_string())
            })?;

        let fetched = self
            .client
            .get(&result_url)
            .send()
            .map_err(|err| RemoteError::ServiceUnavailable(err.to_string()))?;
        if !fetched.status().is_success() {
            return Err(RemoteError::ServiceUnavailable(fetched.status().to_string()));
        }

        let bytes = fetched
            .bytes()
            .map_err(|err| RemoteError::InvalidResponse(err.to_string()))?;
        if bytes.is_empty() {
            return Err(RemoteError::InvalidResponse(
                "upscaled image is empty".to_string(),
            ));
        }
        Ok(bytes.to_vec())
    }
}
