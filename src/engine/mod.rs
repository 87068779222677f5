//! Voice clone orchestrator.
//!
//! This module provides the engine that coordinates between the validated
//! CLI options, the audio converter and the model backend.

mod clone;

pub use clone::{CloneEngine, CloneError};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioError, MockAudioConverter, Waveform, wav_info};
    use crate::backend::{
        AttnImplementation, BackendError, HealthResponse, MockBackend, ModelInfo, Precision,
    };
    use crate::cli::{ArgsError, CloneOptions, DEFAULT_MODEL_ID};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn options(ref_audio: PathBuf, out: PathBuf) -> CloneOptions {
        CloneOptions {
            ref_audio,
            ref_text: Some("Bom dia a todos".to_string()),
            x_vector_only: false,
            text: "Olá mundo".to_string(),
            language: "Portuguese".to_string(),
            out,
            temperature: 0.7,
            top_p: 0.8,
            repetition_penalty: 1.1,
            device: Some("cpu".to_string()),
            flash_attn: true,
            model_id: DEFAULT_MODEL_ID.to_string(),
        }
    }

    fn reference_wav(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        Waveform::new(vec![0.1; 2400], 24000).write_wav(&path).unwrap();
        path
    }

    fn generated_wav() -> Vec<u8> {
        Waveform::new(vec![0.2; 4800], 24000).to_wav_bytes().unwrap()
    }

    fn model_info() -> ModelInfo {
        ModelInfo {
            model_id: DEFAULT_MODEL_ID.to_string(),
            device: "cpu".to_string(),
            dtype: Precision::Float32,
            attn_implementation: AttnImplementation::Eager,
            sample_rate: Some(24000),
        }
    }

    // ===========================================
    // Validation before model contact
    // ===========================================

    #[test]
    fn test_clone_missing_ref_audio_never_touches_backend() {
        let temp_dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let converter = MockAudioConverter::new();

        let engine = CloneEngine::new(backend, converter);
        let result = engine.clone_voice(&options(
            PathBuf::from("/nonexistent/ref.wav"),
            temp_dir.path().join("out.wav"),
        ));

        assert!(matches!(
            result,
            Err(CloneError::InvalidArgs(ArgsError::RefAudioNotFound(_)))
        ));
    }

    // ===========================================
    // Device selection
    // ===========================================

    #[test]
    fn test_resolve_device_explicit_skips_health() {
        let engine = CloneEngine::new(MockBackend::new(), MockAudioConverter::new());
        assert_eq!(engine.resolve_device(Some("cuda:1")).unwrap(), "cuda:1");
    }

    #[test]
    fn test_resolve_device_auto_cuda() {
        let mut backend = MockBackend::new();
        backend.expect_health().times(1).returning(|| {
            Ok(HealthResponse {
                status: "healthy".to_string(),
                cuda_available: true,
                gpu: Some("NVIDIA RTX 5060".to_string()),
            })
        });

        let engine = CloneEngine::new(backend, MockAudioConverter::new());
        assert_eq!(engine.resolve_device(None).unwrap(), "cuda");
    }

    #[test]
    fn test_resolve_device_auto_cpu() {
        let mut backend = MockBackend::new();
        backend.expect_health().times(1).returning(|| {
            Ok(HealthResponse {
                status: "healthy".to_string(),
                cuda_available: false,
                gpu: None,
            })
        });

        let engine = CloneEngine::new(backend, MockAudioConverter::new());
        assert_eq!(engine.resolve_device(None).unwrap(), "cpu");
    }

    #[test]
    fn test_resolve_device_backend_down() {
        let mut backend = MockBackend::new();
        backend.expect_health().times(1).returning(|| {
            Err(BackendError::ConnectionFailed(
                "Connection refused".to_string(),
            ))
        });

        let engine = CloneEngine::new(backend, MockAudioConverter::new());
        assert!(matches!(
            engine.resolve_device(None),
            Err(CloneError::BackendError(BackendError::ConnectionFailed(_)))
        ));
    }

    // ===========================================
    // Model loading
    // ===========================================

    #[test]
    fn test_load_model_cuda_request() {
        let mut backend = MockBackend::new();
        backend
            .expect_load_model()
            .withf(|req| {
                req.device == "cuda"
                    && req.dtype == Precision::Float16
                    && req.attn_implementation == AttnImplementation::FlashAttention2
            })
            .times(1)
            .returning(|_| Ok(model_info()));

        let engine = CloneEngine::new(backend, MockAudioConverter::new());
        assert!(engine.load_model(DEFAULT_MODEL_ID, "cuda", true).is_ok());
    }

    #[test]
    fn test_load_model_failure_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let ref_audio = reference_wav(temp_dir.path(), "ref.wav");
        let out = temp_dir.path().join("out.wav");

        let mut backend = MockBackend::new();
        backend
            .expect_load_model()
            .times(1)
            .returning(|_| Err(BackendError::RequestFailed("Status: 500".to_string())));

        let engine = CloneEngine::new(backend, MockAudioConverter::new());
        let result = engine.clone_voice(&options(ref_audio, out.clone()));

        assert!(matches!(result, Err(CloneError::ModelLoad(_))));
        assert!(!out.exists());
    }

    // ===========================================
    // Full runs
    // ===========================================

    #[test]
    fn test_clone_voice_wav() {
        let temp_dir = TempDir::new().unwrap();
        let ref_audio = reference_wav(temp_dir.path(), "ref.wav");
        let out = temp_dir.path().join("out.wav");

        let mut backend = MockBackend::new();
        backend
            .expect_load_model()
            .times(1)
            .returning(|_| Ok(model_info()));
        let expected_ref = ref_audio.clone();
        backend
            .expect_generate_voice_clone()
            .withf(move |req| {
                req.ref_audio == expected_ref
                    && req.text == "Olá mundo"
                    && req.language == "Portuguese"
                    && req.ref_text.as_deref() == Some("Bom dia a todos")
                    && !req.x_vector_only_mode
            })
            .times(1)
            .returning(|_| Ok(generated_wav()));

        let engine = CloneEngine::new(backend, MockAudioConverter::new());
        let written = engine.clone_voice(&options(ref_audio, out.clone())).unwrap();

        assert_eq!(written, out);
        assert_eq!(wav_info(&out).unwrap().frames, 4800);
    }

    #[test]
    fn test_clone_voice_x_vector_only_without_transcript() {
        let temp_dir = TempDir::new().unwrap();
        let ref_audio = reference_wav(temp_dir.path(), "ref.wav");
        let out = temp_dir.path().join("out.wav");

        let mut backend = MockBackend::new();
        backend
            .expect_load_model()
            .times(1)
            .returning(|_| Ok(model_info()));
        backend
            .expect_generate_voice_clone()
            .withf(|req| req.x_vector_only_mode && req.ref_text.is_none())
            .times(1)
            .returning(|_| Ok(generated_wav()));

        let mut opts = options(ref_audio, out.clone());
        opts.x_vector_only = true;
        opts.ref_text = None;

        let engine = CloneEngine::new(backend, MockAudioConverter::new());
        assert!(engine.clone_voice(&opts).is_ok());
        assert!(out.exists());
    }

    #[test]
    fn test_clone_voice_temp_reference_removed_after_generation_failure() {
        let temp_dir = TempDir::new().unwrap();
        let ref_audio = temp_dir.path().join("ref.ogg");
        std::fs::write(&ref_audio, b"OggS").unwrap();
        let out = temp_dir.path().join("out.wav");

        let converted: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&converted);

        let mut converter = MockAudioConverter::new();
        converter.expect_is_available().return_const(true);
        converter.expect_to_wav().times(1).returning(move |_, dst| {
            Waveform::new(vec![0.1; 2400], 24000).write_wav(dst).unwrap();
            *seen.lock().unwrap() = Some(dst.to_path_buf());
            Ok(())
        });

        let generated_from: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
        let used = Arc::clone(&generated_from);

        let mut backend = MockBackend::new();
        backend
            .expect_load_model()
            .times(1)
            .returning(|_| Ok(model_info()));
        backend
            .expect_generate_voice_clone()
            .times(1)
            .returning(move |req| {
                assert!(req.ref_audio.exists());
                *used.lock().unwrap() = Some(req.ref_audio.clone());
                Err(BackendError::RequestFailed("CUDA out of memory".to_string()))
            });

        let engine = CloneEngine::new(backend, converter);
        let result = engine.clone_voice(&options(ref_audio, out));

        assert!(matches!(result, Err(CloneError::Synthesis(_))));
        let temp_path = converted.lock().unwrap().clone().unwrap();
        assert_eq!(generated_from.lock().unwrap().clone(), Some(temp_path.clone()));
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_clone_voice_temp_reference_removed_after_success() {
        let temp_dir = TempDir::new().unwrap();
        let ref_audio = temp_dir.path().join("ref.m4a");
        std::fs::write(&ref_audio, b"ftyp").unwrap();
        let out = temp_dir.path().join("out.wav");

        let converted: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&converted);

        let mut converter = MockAudioConverter::new();
        converter.expect_is_available().return_const(true);
        converter.expect_to_wav().times(1).returning(move |_, dst| {
            Waveform::new(vec![0.1; 2400], 24000).write_wav(dst).unwrap();
            *seen.lock().unwrap() = Some(dst.to_path_buf());
            Ok(())
        });

        let mut backend = MockBackend::new();
        backend
            .expect_load_model()
            .times(1)
            .returning(|_| Ok(model_info()));
        backend
            .expect_generate_voice_clone()
            .times(1)
            .returning(|_| Ok(generated_wav()));

        let engine = CloneEngine::new(backend, converter);
        assert!(engine.clone_voice(&options(ref_audio, out.clone())).is_ok());

        let temp_path = converted.lock().unwrap().clone().unwrap();
        assert!(!temp_path.exists());
        assert!(out.exists());
    }

    #[test]
    fn test_clone_voice_mp3_fallback_to_wav() {
        let temp_dir = TempDir::new().unwrap();
        let ref_audio = reference_wav(temp_dir.path(), "ref.wav");
        let out = temp_dir.path().join("result.mp3");

        let mut converter = MockAudioConverter::new();
        converter.expect_is_available().return_const(true);
        converter
            .expect_to_mp3()
            .times(1)
            .returning(|_, _, _| Err(AudioError::ConversionFailed("encoder missing".to_string())));

        let mut backend = MockBackend::new();
        backend
            .expect_load_model()
            .times(1)
            .returning(|_| Ok(model_info()));
        backend
            .expect_generate_voice_clone()
            .times(1)
            .returning(|_| Ok(generated_wav()));

        let engine = CloneEngine::new(backend, converter);
        let written = engine.clone_voice(&options(ref_audio, out)).unwrap();

        assert_eq!(written, temp_dir.path().join("result.wav"));
        assert!(written.exists());
    }

    #[test]
    fn test_clone_voice_undecodable_audio() {
        let temp_dir = TempDir::new().unwrap();
        let ref_audio = reference_wav(temp_dir.path(), "ref.wav");

        let mut backend = MockBackend::new();
        backend
            .expect_load_model()
            .times(1)
            .returning(|_| Ok(model_info()));
        backend
            .expect_generate_voice_clone()
            .times(1)
            .returning(|_| Ok(b"<html>502 Bad Gateway</html>".to_vec()));

        let engine = CloneEngine::new(backend, MockAudioConverter::new());
        let result = engine.clone_voice(&options(ref_audio, temp_dir.path().join("out.wav")));

        assert!(matches!(result, Err(CloneError::AudioError(_))));
    }

    // ===========================================
    // Error reporting
    // ===========================================

    #[test]
    fn test_model_load_error_chain_names_cause_once() {
        let temp_dir = TempDir::new().unwrap();
        let ref_audio = reference_wav(temp_dir.path(), "ref.wav");

        let mut backend = MockBackend::new();
        backend.expect_load_model().times(1).returning(|_| {
            Err(BackendError::ConnectionFailed(
                "error sending request for url (http://127.0.0.1:9/load)".to_string(),
            ))
        });

        let engine = CloneEngine::new(backend, MockAudioConverter::new());
        let err = engine
            .clone_voice(&options(ref_audio, temp_dir.path().join("out.wav")))
            .unwrap_err();
        let report = format!("{:#}", anyhow::Error::from(err));

        assert!(report.starts_with("Failed to load model: "));
        assert_eq!(report.matches("Connection failed").count(), 1);
    }

    #[test]
    fn test_audio_error_chain_names_cause_once() {
        let err = CloneError::from(AudioError::ConversionFailed("no lame".to_string()));
        let report = format!("{:#}", anyhow::Error::from(err));

        assert_eq!(report, "Conversion failed: no lame");
    }

    #[test]
    fn test_synthesis_error_chain_names_cause_once() {
        let err = CloneError::Synthesis(BackendError::RequestFailed("Status: 500".to_string()));
        let report = format!("{:#}", anyhow::Error::from(err));

        assert_eq!(report, "Error during synthesis: Request failed: Status: 500");
    }
}
