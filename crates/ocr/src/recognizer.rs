use scanlet_core::LanguageSet;
use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::progress::FileProgress;
use crate::types::RecognitionOutput;

#[derive(Debug, Clone, Error)]
pub enum RecognitionError {
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("OCR engine not available")]
    NotAvailable,
    #[error("Recognition task aborted: {0}")]
    Aborted(String),
}

/// Internal stages an engine goes through for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    LoadingCore,
    InitializingApi,
    LoadingLanguage,
    Recognizing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineEvent {
    pub phase: EnginePhase,
    /// Fraction of the current phase completed.
    pub progress: f32,
}

impl EngineEvent {
    pub fn new(phase: EnginePhase, progress: f32) -> Self {
        Self { phase, progress }
    }
}

/// Abstraction over an OCR backend.
/// Implementations accept encoded image bytes and return the recognized text.
/// Calls are blocking; [`OcrExecutor`] moves them off the async scheduler.
pub trait OcrBackend: Send + Sync {
    fn recognize(
        &self,
        image_bytes: &[u8],
        languages: &LanguageSet,
        on_event: &dyn Fn(EngineEvent),
    ) -> Result<String, RecognitionError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string, optionally after a delay, walking through the same
/// phases a real engine reports.
#[derive(Debug, Clone)]
pub struct MockRecognizer {
    pub text: String,
    pub delay: Duration,
    pub available: bool,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), delay: Duration::ZERO, available: true }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// An engine that fails to initialize for every image.
    pub fn unavailable() -> Self {
        Self { text: String::new(), delay: Duration::ZERO, available: false }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(
        &self,
        _image_bytes: &[u8],
        _languages: &LanguageSet,
        on_event: &dyn Fn(EngineEvent),
    ) -> Result<String, RecognitionError> {
        on_event(EngineEvent::new(EnginePhase::LoadingCore, 1.0));
        if !self.available {
            return Err(RecognitionError::NotAvailable);
        }
        on_event(EngineEvent::new(EnginePhase::LoadingLanguage, 1.0));
        on_event(EngineEvent::new(EnginePhase::Recognizing, 0.0));
        on_event(EngineEvent::new(EnginePhase::Recognizing, 0.5));
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        on_event(EngineEvent::new(EnginePhase::Recognizing, 1.0));
        Ok(self.text.clone())
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{EngineEvent, EnginePhase, OcrBackend, RecognitionError};
    use leptess::LepTess;
    use scanlet_core::LanguageSet;

    /// libtesseract does not report progress through leptess, so only the
    /// start and end of recognition are surfaced.
    pub struct TesseractRecognizer {
        data_path: Option<String>,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>) -> Self {
            Self { data_path }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(
            &self,
            image_bytes: &[u8],
            languages: &LanguageSet,
            on_event: &dyn Fn(EngineEvent),
        ) -> Result<String, RecognitionError> {
            on_event(EngineEvent::new(EnginePhase::InitializingApi, 0.0));
            let mut lt = LepTess::new(self.data_path.as_deref(), &languages.to_string())
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;
            on_event(EngineEvent::new(EnginePhase::LoadingLanguage, 1.0));
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;
            on_event(EngineEvent::new(EnginePhase::Recognizing, 0.0));
            let text = lt
                .get_utf8_text()
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;
            on_event(EngineEvent::new(EnginePhase::Recognizing, 1.0));
            Ok(text)
        }
    }
}

// ── Executor ──────────────────────────────────────────────────────────────────

/// Runs a backend on the blocking pool and forwards recognition-phase progress.
pub struct OcrExecutor<R: OcrBackend> {
    backend: Arc<R>,
}

impl<R: OcrBackend> Clone for OcrExecutor<R> {
    fn clone(&self) -> Self {
        Self { backend: Arc::clone(&self.backend) }
    }
}

impl<R: OcrBackend + 'static> OcrExecutor<R> {
    pub fn new(backend: R) -> Self {
        Self { backend: Arc::new(backend) }
    }

    /// Recognize one image. Only [`EnginePhase::Recognizing`] events reach
    /// `progress`; fractions are clamped to 0–1 and never move backwards.
    /// On failure no text is returned.
    pub async fn recognize(
        &self,
        image: Arc<[u8]>,
        languages: &LanguageSet,
        progress: FileProgress,
    ) -> Result<RecognitionOutput, RecognitionError> {
        let backend = Arc::clone(&self.backend);
        let languages = languages.clone();

        let task = tokio::task::spawn_blocking(move || -> Result<RecognitionOutput, RecognitionError> {
            let last = Cell::new(0.0f32);
            let on_event = |event: EngineEvent| {
                if event.phase != EnginePhase::Recognizing || event.progress.is_nan() {
                    return;
                }
                let p = event.progress.clamp(0.0, 1.0);
                if p > last.get() {
                    last.set(p);
                    progress.report(p);
                }
            };
            let text = backend.recognize(&image, &languages, &on_event)?;
            on_event(EngineEvent::new(EnginePhase::Recognizing, 1.0));
            Ok(RecognitionOutput { text, progress: last.get() })
        });

        task.await
            .map_err(|e| RecognitionError::Aborted(e.to_string()))?
    }
}
