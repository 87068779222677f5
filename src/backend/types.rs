//! Backend request/response types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when communicating with the backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),
}

/// Health check response from backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub cuda_available: bool,
    #[serde(default)]
    pub gpu: Option<String>,
}

/// Numeric precision the model weights are loaded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Float16,
    Float32,
}

/// Attention kernel the model uses internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttnImplementation {
    #[serde(rename = "flash_attention_2")]
    FlashAttention2,
    #[serde(rename = "eager")]
    Eager,
}

/// Returns true for `cuda` and `cuda:N` device strings.
pub fn is_cuda_device(device: &str) -> bool {
    device.starts_with("cuda")
}

/// Request to load a pretrained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRequest {
    pub model_id: String,
    pub device: String,
    pub dtype: Precision,
    pub attn_implementation: AttnImplementation,
}

impl LoadRequest {
    /// Build a load request, picking precision and attention from the device.
    ///
    /// Half precision and Flash Attention 2 are only used on CUDA devices;
    /// `flash_attn = false` forces eager attention everywhere.
    pub fn for_device(model_id: impl Into<String>, device: impl Into<String>, flash_attn: bool) -> Self {
        let device = device.into();
        let cuda = is_cuda_device(&device);

        Self {
            model_id: model_id.into(),
            dtype: if cuda {
                Precision::Float16
            } else {
                Precision::Float32
            },
            attn_implementation: if cuda && flash_attn {
                AttnImplementation::FlashAttention2
            } else {
                AttnImplementation::Eager
            },
            device,
        }
    }
}

/// Response after a model is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_id: String,
    pub device: String,
    pub dtype: Precision,
    pub attn_implementation: AttnImplementation,
    #[serde(default)]
    pub sample_rate: Option<u32>,
}

/// Request for voice-clone generation.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceCloneRequest {
    pub text: String,
    pub language: String,
    pub ref_audio: PathBuf,
    /// Reference transcript; `None` in x-vector-only mode.
    pub ref_text: Option<String>,
    pub x_vector_only_mode: bool,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
}

impl VoiceCloneRequest {
    /// Create a request with the default sampling parameters.
    pub fn new(text: impl Into<String>, language: impl Into<String>, ref_audio: PathBuf) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
            ref_audio,
            ref_text: None,
            x_vector_only_mode: false,
            temperature: 0.7,
            top_p: 0.8,
            repetition_penalty: 1.1,
        }
    }

    /// Set the reference transcript.
    pub fn with_ref_text(mut self, ref_text: impl Into<String>) -> Self {
        self.ref_text = Some(ref_text.into());
        self
    }

    /// Clone from the speaker embedding only; drops any transcript.
    pub fn x_vector_only(mut self) -> Self {
        self.x_vector_only_mode = true;
        self.ref_text = None;
        self
    }

    /// Set sampling parameters.
    pub fn with_sampling(mut self, temperature: f32, top_p: f32, repetition_penalty: f32) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self.repetition_penalty = repetition_penalty;
        self
    }

    /// Text fields of the multipart form, in send order.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("text", self.text.clone()),
            ("language", self.language.clone()),
            ("temperature", self.temperature.to_string()),
            ("top_p", self.top_p.to_string()),
            ("repetition_penalty", self.repetition_penalty.to_string()),
            ("x_vector_only_mode", self.x_vector_only_mode.to_string()),
        ];

        if let Some(ref_text) = &self.ref_text {
            fields.push(("ref_text", ref_text.clone()));
        }

        fields
    }
}
