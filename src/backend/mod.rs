//! Backend communication with the TTS model server.
//!
//! The model server hosts the pretrained Qwen3-TTS weights and the inference
//! runtime. This module only knows its HTTP surface.

mod client;
mod types;

pub use client::HttpBackend;
pub use types::{
    AttnImplementation, BackendError, HealthResponse, LoadRequest, ModelInfo, Precision,
    VoiceCloneRequest, is_cuda_device,
};

/// Trait for model server communication.
///
/// This trait abstracts the HTTP communication with the model server,
/// allowing for mock implementations in tests.
#[cfg_attr(test, mockall::automock)]
pub trait Backend {
    /// Check backend health status.
    fn health(&self) -> Result<HealthResponse, BackendError>;

    /// Load a pretrained model onto a device.
    fn load_model(&self, request: &LoadRequest) -> Result<ModelInfo, BackendError>;

    /// Clone the reference voice speaking the request text.
    ///
    /// # Returns
    /// Raw WAV audio data
    fn generate_voice_clone(&self, request: &VoiceCloneRequest) -> Result<Vec<u8>, BackendError>;
}

/// Create a backend for the given base URL.
pub fn create_backend(base_url: &str) -> HttpBackend {
    HttpBackend::new(base_url)
}
