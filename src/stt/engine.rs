use crate::audio::AudioFormat;
use crate::error::{Result, VocastError};
use std::sync::Arc;

/// Trait for speech-to-text transcription of a self-contained clip.
///
/// This trait allows swapping implementations (real Whisper vs mock).
pub trait TranscriptionEngine: Send + Sync {
    /// Transcribe one audio clip to text.
    ///
    /// Blocking; may take seconds for long clips. Empty or degenerate clips
    /// must return an empty string rather than an error, so a silence-only
    /// cycle never fails the pipeline.
    ///
    /// # Arguments
    /// * `pcm` - Raw little-endian PCM bytes
    /// * `format` - Sample rate and width of the bytes
    fn transcribe(&self, pcm: &[u8], format: AudioFormat) -> Result<String>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;

    /// Check if the engine is ready
    fn is_ready(&self) -> bool;
}

/// Implement TranscriptionEngine for Arc<T> to allow sharing across tasks.
impl<T: TranscriptionEngine> TranscriptionEngine for Arc<T> {
    fn transcribe(&self, pcm: &[u8], format: AudioFormat) -> Result<String> {
        (**self).transcribe(pcm, format)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Mock engine for testing
#[derive(Debug, Clone)]
pub struct MockEngine {
    model_name: String,
    response: String,
    should_fail: bool,
}

impl MockEngine {
    /// Create a new mock engine with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock transcription".to_string(),
            should_fail: false,
        }
    }

    /// Configure the mock to return a specific response
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on transcribe
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl TranscriptionEngine for MockEngine {
    fn transcribe(&self, pcm: &[u8], _format: AudioFormat) -> Result<String> {
        if pcm.is_empty() {
            return Ok(String::new());
        }
        if self.should_fail {
            Err(VocastError::Transcription {
                message: "mock transcription failure".to_string(),
            })
        } else {
            Ok(self.response.clone())
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_engine_returns_response() {
        let engine = MockEngine::new("test-model").with_response("Hello, this is a test");

        let pcm = vec![0u8; 1000];
        let result = engine.transcribe(&pcm, AudioFormat::default());

        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Hello, this is a test");
    }

    #[test]
    fn test_mock_engine_returns_error_when_configured() {
        let engine = MockEngine::new("test-model").with_failure();

        let pcm = vec![0u8; 1000];
        let result = engine.transcribe(&pcm, AudioFormat::default());

        match result {
            Err(VocastError::Transcription { message }) => {
                assert_eq!(message, "mock transcription failure");
            }
            _ => panic!("Expected Transcription error"),
        }
    }

    #[test]
    fn test_empty_clip_yields_empty_text_even_when_failing() {
        // Degenerate clips must never fail the pipeline.
        let engine = MockEngine::new("test-model").with_failure();
        let result = engine.transcribe(&[], AudioFormat::default());
        assert_eq!(result.unwrap(), "");
    }

    #[test]
    fn test_mock_engine_model_name() {
        let engine = MockEngine::new("whisper-base");
        assert_eq!(engine.model_name(), "whisper-base");
    }

    #[test]
    fn test_mock_engine_is_ready() {
        assert!(MockEngine::new("test-model").is_ready());
        assert!(!MockEngine::new("test-model").with_failure().is_ready());
    }

    #[test]
    fn test_engine_trait_is_object_safe() {
        // Verify that we can use Box<dyn TranscriptionEngine>
        let engine: Box<dyn TranscriptionEngine> =
            Box::new(MockEngine::new("test-model").with_response("boxed test"));

        assert_eq!(engine.model_name(), "test-model");
        assert!(engine.is_ready());

        let result = engine.transcribe(&[0u8; 100], AudioFormat::default());
        assert_eq!(result.unwrap(), "boxed test");
    }

    #[test]
    fn test_arc_blanket_impl() {
        let engine = Arc::new(MockEngine::new("shared").with_response("shared result"));
        let result = engine.transcribe(&[0u8; 10], AudioFormat::default());
        assert_eq!(result.unwrap(), "shared result");
        assert_eq!(engine.model_name(), "shared");
    }

    #[test]
    fn test_mock_engine_large_clip() {
        let engine = MockEngine::new("test-model").with_response("long audio transcription");

        // Simulate 10 seconds of 16kHz 16-bit audio
        let pcm = vec![0u8; 16000 * 2 * 10];
        let result = engine.transcribe(&pcm, AudioFormat::default());

        assert_eq!(result.unwrap(), "long audio transcription");
    }
}
