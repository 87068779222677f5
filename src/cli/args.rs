//! CLI argument definitions and validation.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

/// Default pretrained model served by the backend.
pub const DEFAULT_MODEL_ID: &str = "Qwen/Qwen3-TTS-12Hz-1.7B-Base";

/// Clone a voice with Qwen3-TTS-12Hz-1.7B-Base.
#[derive(Parser, Debug)]
#[command(name = "qwen-clone")]
#[command(about = "Clone a voice from a reference clip using Qwen3-TTS")]
#[command(version)]
pub struct Args {
    /// Path to reference audio file (WAV, or any format ffmpeg can read)
    #[arg(long)]
    pub ref_audio: PathBuf,

    /// Transcript of the reference audio
    #[arg(long)]
    pub ref_text: Option<String>,

    /// Text to synthesize
    #[arg(long)]
    pub text: String,

    /// Language of the output text (e.g. Portuguese, English, Chinese)
    #[arg(long, default_value = "Portuguese")]
    pub language: String,

    /// Output file path (.wav or .mp3)
    #[arg(long, default_value = "output.wav")]
    pub out: PathBuf,

    /// Use only the speaker embedding (no reference text)
    #[arg(long)]
    pub x_vector_only: bool,

    /// Sampling temperature
    #[arg(long, default_value = "0.7")]
    pub temperature: f32,

    /// Top-p sampling
    #[arg(long, default_value = "0.8")]
    pub top_p: f32,

    /// Repetition penalty
    #[arg(long, default_value = "1.1")]
    pub repetition_penalty: f32,

    /// Device to use (cuda, cuda:N or cpu); defaults to cuda when the backend has it
    #[arg(long)]
    pub device: Option<String>,

    /// Disable Flash Attention 2 (use if you encounter errors)
    #[arg(long)]
    pub no_flash_attn: bool,

    /// Pretrained model to load
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    /// Backend host address
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Backend port
    #[arg(long, default_value = "9290")]
    pub port: u16,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Errors that can occur when validating arguments.
#[derive(Error, Debug)]
pub enum ArgsError {
    #[error("Reference audio file not found: {0}")]
    RefAudioNotFound(PathBuf),

    #[error("You must provide --ref-text UNLESS you use --x-vector-only")]
    MissingRefText,
}

/// Validated parameters for a single cloning run.
#[derive(Debug, Clone, PartialEq)]
pub struct CloneOptions {
    pub ref_audio: PathBuf,
    /// Transcript to send; always `None` in x-vector-only mode.
    pub ref_text: Option<String>,
    pub x_vector_only: bool,
    pub text: String,
    pub language: String,
    pub out: PathBuf,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub device: Option<String>,
    pub flash_attn: bool,
    pub model_id: String,
}

impl Args {
    /// Check the inputs and build the options for a run.
    ///
    /// # Returns
    /// * `Ok(CloneOptions)` when the reference audio exists and a transcript
    ///   is present (or x-vector-only mode is requested)
    /// * `Err(ArgsError)` otherwise
    pub fn validate(&self) -> Result<CloneOptions, ArgsError> {
        if !self.ref_audio.exists() {
            return Err(ArgsError::RefAudioNotFound(self.ref_audio.clone()));
        }

        let ref_text = self
            .ref_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        if ref_text.is_none() && !self.x_vector_only {
            return Err(ArgsError::MissingRefText);
        }

        Ok(CloneOptions {
            ref_audio: self.ref_audio.clone(),
            ref_text: if self.x_vector_only {
                None
            } else {
                ref_text.map(str::to_string)
            },
            x_vector_only: self.x_vector_only,
            text: self.text.clone(),
            language: self.language.clone(),
            out: self.out.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            repetition_penalty: self.repetition_penalty,
            device: self.device.clone(),
            flash_attn: !self.no_flash_attn,
            model_id: self.model_id.clone(),
        })
    }

    /// Base URL of the model server.
    pub fn backend_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
