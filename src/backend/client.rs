//! HTTP client for the model server.

use std::path::Path;

use tracing::debug;

use crate::audio::has_extension;

use super::Backend;
use super::types::{BackendError, HealthResponse, LoadRequest, ModelInfo, VoiceCloneRequest};

/// HTTP-based backend client.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpBackend {
    /// Create a new HTTP backend client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Use a preconfigured client.
    #[cfg(test)]
    pub(super) fn with_client(base_url: &str, client: reqwest::blocking::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL for this backend.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// MIME type for the reference upload. Unconverted fallbacks are sent as
    /// opaque bytes.
    fn ref_audio_mime(path: &Path) -> &'static str {
        if has_extension(path, "wav") {
            "audio/wav"
        } else {
            "application/octet-stream"
        }
    }

    fn check_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // The server puts its exception text in the body
        let detail = response.text().unwrap_or_default();
        if detail.is_empty() {
            Err(BackendError::RequestFailed(format!("Status: {status}")))
        } else {
            Err(BackendError::RequestFailed(format!("Status: {status}: {detail}")))
        }
    }
}

impl Backend for HttpBackend {
    fn health(&self) -> Result<HealthResponse, BackendError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        Self::check_status(response)?
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    fn load_model(&self, request: &LoadRequest) -> Result<ModelInfo, BackendError> {
        let url = format!("{}/load", self.base_url);
        debug!(?request, "POST {url}");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        Self::check_status(response)?
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    fn generate_voice_clone(&self, request: &VoiceCloneRequest) -> Result<Vec<u8>, BackendError> {
        let url = format!("{}/generate_voice_clone", self.base_url);

        let audio_data = std::fs::read(&request.ref_audio)
            .map_err(|_| BackendError::FileNotFound(request.ref_audio.display().to_string()))?;

        let file_name = request
            .ref_audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("reference.wav");

        let file_part = reqwest::blocking::multipart::Part::bytes(audio_data)
            .file_name(file_name.to_string())
            .mime_str(Self::ref_audio_mime(&request.ref_audio))
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        let mut form = reqwest::blocking::multipart::Form::new().part("ref_audio", file_part);
        for (name, value) in request.form_fields() {
            form = form.text(name, value);
        }

        debug!(file = file_name, "POST {url}");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        if response.status().as_u16() == 409 {
            return Err(BackendError::ModelNotLoaded(
                "load a model before generating".to_string(),
            ));
        }

        Self::check_status(response)?
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}
