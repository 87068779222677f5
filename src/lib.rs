//! qwen-clone: Voice cloning CLI for Qwen3-TTS base models.
//!
//! This crate loads a pretrained Qwen3-TTS model on a model server, feeds it a
//! reference clip plus target text, and writes the cloned voice to WAV or MP3.

pub mod audio;
pub mod backend;
pub mod cli;
pub mod engine;
