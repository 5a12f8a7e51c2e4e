//! HTTP client for the remote processing service.
//!
//! Each accepted file becomes exactly one processing request. When the
//! service answers with a URL instead of embedded bytes, the processed image
//! is downloaded as part of the same task so the UI only ever sees a finished
//! [`ProcessedResult`].

use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

use super::response::{self, ImageReference};
use crate::config::{ConfigError, ServiceConfig};
use crate::error::{format_size, UploadError};
use crate::state::data::{Payload, ProcessedResult, ResultSource, SelectedFile};

const API_KEY_HEADER: &str = "X-API-Key";

/// Cheap to clone: `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct ProcessingClient {
    http: reqwest::Client,
    endpoint: Url,
    field_name: String,
    api_key: Option<String>,
    max_response_bytes: u64,
}

impl ProcessingClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint_url()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("upload-preview/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            field_name: config.field_name.clone(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            max_response_bytes: config.max_response_bytes,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Run one request. Takes `self` so the future is `'static` for `Task::perform`.
    pub async fn process(self, payload: Payload) -> Result<ProcessedResult, UploadError> {
        let result = match payload {
            Payload::File(file) => self.upload(file).await,
            Payload::DocumentUrl(document) => self.submit_document(document).await,
        };

        if let Err(UploadError::Network(reason)) = &result {
            error!("❌ Request to {} failed: {}", self.endpoint, reason);
        }

        result
    }

    /// Multipart POST of the file, then resolve the processed image.
    pub async fn upload(&self, file: SelectedFile) -> Result<ProcessedResult, UploadError> {
        info!(
            "📤 POST {} ({}, {} bytes)",
            self.endpoint, file.name, file.size
        );

        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.media_type)
            .map_err(|e| UploadError::Protocol(format!("Invalid media type: {}", e)))?;
        let form = Form::new().part(self.field_name.clone(), part);

        let mut request = self.http.post(self.endpoint.clone()).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = self.read_body(response).await?;
        debug!("Service answered {} with {} bytes", status, body.len());

        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message: response::rejection_message(status.as_u16(), &body),
            });
        }

        match response::image_reference(&body, &self.endpoint)? {
            ImageReference::Embedded(bytes) => Ok(ProcessedResult::Image {
                bytes,
                source: ResultSource::Embedded,
            }),
            ImageReference::Remote(url) => {
                let bytes = self.fetch_result(&url).await?;
                Ok(ProcessedResult::Image {
                    bytes,
                    source: ResultSource::Remote(url),
                })
            }
        }
    }

    /// URL-reference flow: POST `?url=<document>` with the API key, read the grade.
    pub async fn submit_document(&self, document: Url) -> Result<ProcessedResult, UploadError> {
        info!("📤 POST {} for {}", self.endpoint, document);

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .query(&[("url", document.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = self.read_body(response).await?;

        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message: response::url_reference_rejection_message(status.as_u16(), &body),
            });
        }

        response::grade(&body).map(ProcessedResult::Grade)
    }

    /// Download the processed image the service pointed at
    async fn fetch_result(&self, url: &Url) -> Result<Vec<u8>, UploadError> {
        debug!("Fetching processed image from {}", url);

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message: format!(
                    "Could not download the processed image (status {})",
                    status.as_u16()
                ),
            });
        }

        let bytes = self.read_body(response).await?;
        if bytes.is_empty() {
            return Err(UploadError::Protocol("The processed image is empty".to_string()));
        }

        Ok(bytes)
    }

    /// Read a response body, giving up past `max_response_bytes`
    async fn read_body(&self, mut response: reqwest::Response) -> Result<Vec<u8>, UploadError> {
        let limit = self.max_response_bytes;
        let too_large = || {
            UploadError::Protocol(format!(
                "The service response is larger than {}",
                format_size(limit)
            ))
        };

        if response.content_length().is_some_and(|length| length > limit) {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}
