use scanlet_core::{ProcessingOptions, ScanConfig};
use thiserror::Error;
use tokio::task::JoinSet;

use crate::extract::Extractor;
use crate::preprocess::{NormalizeError, Normalizer};
use crate::progress::{BatchProgress, FileProgress};
use crate::recognizer::{OcrBackend, OcrExecutor, RecognitionError};
use crate::types::{ExtractedFields, InputFile, ScanResult};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image preprocessing failed: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("OCR recognition failed: {0}")]
    Recognition(#[from] RecognitionError),
    #[error("Processing task aborted: {0}")]
    Aborted(String),
}

/// Drives normalize → recognize → extract for every file of a batch.
pub struct BatchOrchestrator<R: OcrBackend> {
    executor: OcrExecutor<R>,
    normalizer: Normalizer,
}

impl<R: OcrBackend + 'static> BatchOrchestrator<R> {
    pub fn new(recognizer: R) -> Self {
        Self::with_normalizer(recognizer, Normalizer::default())
    }

    pub fn with_normalizer(recognizer: R, normalizer: Normalizer) -> Self {
        Self { executor: OcrExecutor::new(recognizer), normalizer }
    }

    pub fn from_config(recognizer: R, config: &ScanConfig) -> Self {
        Self::with_normalizer(recognizer, Normalizer::new(config.normalize))
    }

    /// Process every file concurrently and return one result per file, in input
    /// order. Waits for every file to settle; a failure in one file is reported in
    /// its own result and never affects the others.
    ///
    /// `progress` is reset to 0 on entry and reaches 100 on return, so runs that
    /// may overlap each need their own `BatchProgress`.
    pub async fn run_batch(
        &self,
        files: &[InputFile],
        options: &ProcessingOptions,
        progress: &BatchProgress,
    ) -> Vec<ScanResult> {
        let total = files.len();
        progress.reset();
        tracing::info!("Starting scan batch: {total} file(s), languages {}", options.languages);

        let mut join_set: JoinSet<(usize, ScanResult)> = JoinSet::new();
        for (index, file) in files.iter().enumerate() {
            let executor = self.executor.clone();
            let normalizer = self.normalizer;
            let file = file.clone();
            let options = options.clone();
            let file_progress = progress.for_file(index, total);

            join_set.spawn(async move {
                let outcome =
                    process_file(&executor, normalizer, &file, &options, file_progress).await;
                (index, into_scan_result(index, &file, outcome))
            });
        }

        // Results land in fixed slots so completion order never affects ordering.
        let mut slots: Vec<Option<ScanResult>> = vec![None; total];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => tracing::error!("Scan task failed: {e}"),
            }
        }

        let results: Vec<ScanResult> = files
            .iter()
            .zip(slots)
            .enumerate()
            .map(|(index, (file, slot))| {
                slot.unwrap_or_else(|| {
                    let err = PipelineError::Aborted("task panicked".into());
                    ScanResult::failed(index, file, err.to_string())
                })
            })
            .collect();

        progress.finish();
        let failed = results.iter().filter(|r| r.is_error()).count();
        tracing::info!("Scan batch finished: {} ok, {failed} failed", total - failed);
        results
    }
}

async fn process_file<R: OcrBackend + 'static>(
    executor: &OcrExecutor<R>,
    normalizer: Normalizer,
    file: &InputFile,
    options: &ProcessingOptions,
    progress: FileProgress,
) -> Result<(String, ExtractedFields), PipelineError> {
    // 1. Normalize (decode / encode are blocking).
    let image = {
        let file = file.clone();
        let options = options.clone();
        tokio::task::spawn_blocking(move || normalizer.normalize(&file, &options))
            .await
            .map_err(|e| PipelineError::Aborted(e.to_string()))??
    };

    // 2. Run OCR.
    let recognized = executor
        .recognize(image.bytes, &options.languages, progress)
        .await?;

    // 3. Extract structured fields.
    let extracted = if options.auto_detect_fields {
        Extractor::extract(&recognized.text)
    } else {
        ExtractedFields::default()
    };

    Ok((recognized.text, extracted))
}

fn into_scan_result(
    index: usize,
    file: &InputFile,
    outcome: Result<(String, ExtractedFields), PipelineError>,
) -> ScanResult {
    match outcome {
        Ok((text, extracted)) => {
            tracing::debug!("Scanned {}: {} chars", file.name, text.len());
            ScanResult::succeeded(index, file, text, extracted)
        }
        Err(e) => {
            tracing::warn!("Scan failed for {}: {e}", file.name);
            ScanResult::failed(index, file, e.to_string())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::PreviewStore;
    use crate::recognizer::{EngineEvent, EnginePhase, MockRecognizer};
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use rust_decimal::Decimal;
    use scanlet_core::LanguageSet;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([200u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn input(previews: &PreviewStore, name: &str, bytes: Vec<u8>) -> InputFile {
        let bytes: Arc<[u8]> = bytes.into();
        InputFile {
            name: name.into(),
            mime_type: "image/png".into(),
            size_bytes: bytes.len() as u64,
            preview: previews.create(bytes.clone()),
            bytes,
        }
    }

    /// Reads the first byte of the (uncompressed) image as a delay in tens of ms
    /// and echoes it back as text.
    struct Staggered;

    impl OcrBackend for Staggered {
        fn recognize(
            &self,
            image_bytes: &[u8],
            _languages: &LanguageSet,
            on_event: &dyn Fn(EngineEvent),
        ) -> Result<String, RecognitionError> {
            let tag = image_bytes.first().copied().unwrap_or(0);
            for step in 1..=4 {
                std::thread::sleep(Duration::from_millis(tag as u64 * 10 / 4));
                on_event(EngineEvent::new(EnginePhase::Recognizing, step as f32 / 4.0));
            }
            Ok(format!("file {tag}"))
        }
    }

    #[tokio::test]
    async fn single_file_produces_fields() {
        let previews = PreviewStore::new();
        let orchestrator = BatchOrchestrator::new(MockRecognizer::new(
            "Starbucks\n01/15/2024\nLatte 4.50\nTax 0.38\nTotal $4.88",
        ));
        let files = vec![input(&previews, "coffee.png", tiny_png())];
        let results = orchestrator
            .run_batch(&files, &ProcessingOptions::default(), &BatchProgress::new())
            .await;

        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.error, None);
        assert_eq!(r.id, 0);
        assert_eq!(r.preview, files[0].preview);
        assert_eq!(r.extracted_data.total, Some(Decimal::new(488, 2)));
        assert_eq!(r.extracted_data.merchant.as_deref(), Some("Starbucks"));
    }

    #[tokio::test]
    async fn corrupt_file_fails_alone() {
        let previews = PreviewStore::new();
        let orchestrator = BatchOrchestrator::new(MockRecognizer::new("SHOP\nTotal 1.00"));
        let files = vec![
            input(&previews, "a.png", tiny_png()),
            input(&previews, "broken.png", b"definitely not a png".to_vec()),
            input(&previews, "c.png", tiny_png()),
        ];
        let results = orchestrator
            .run_batch(&files, &ProcessingOptions::default(), &BatchProgress::new())
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].error.is_none());
        assert!(results[2].error.is_none());
        let broken = &results[1];
        assert!(broken.error.as_deref().unwrap().contains("preprocessing"));
        assert!(broken.extracted_data.is_empty());
        assert!(broken.text.is_empty());
    }

    #[tokio::test]
    async fn results_follow_input_order_despite_completion_order() {
        let previews = PreviewStore::new();
        let orchestrator = BatchOrchestrator::new(Staggered);
        // The first file finishes last.
        let tags = [9u8, 1, 5, 0];
        let files: Vec<InputFile> = tags
            .iter()
            .map(|t| input(&previews, &format!("r{t}.png"), vec![*t]))
            .collect();
        let opts = ProcessingOptions { compress_image: false, ..Default::default() };
        let results = orchestrator.run_batch(&files, &opts, &BatchProgress::new()).await;

        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.file_name, files[i].name);
            assert_eq!(r.id, i);
            assert_eq!(r.text, format!("file {}", tags[i]));
        }
    }

    #[tokio::test]
    async fn progress_is_monotonic_and_ends_at_100() {
        let previews = PreviewStore::new();
        let orchestrator = BatchOrchestrator::new(Staggered);
        let files: Vec<InputFile> = [4u8, 2, 6]
            .iter()
            .map(|t| input(&previews, "r.png", vec![*t]))
            .collect();
        let opts = ProcessingOptions { compress_image: false, ..Default::default() };
        let progress = BatchProgress::new();
        let mut rx = progress.subscribe();

        let watcher = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let v = *rx.borrow_and_update();
                seen.push(v);
                if v == 100 {
                    break;
                }
            }
            seen
        });

        orchestrator.run_batch(&files, &opts, &progress).await;
        let seen = watcher.await.unwrap();

        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "regressed: {seen:?}");
        assert_eq!(seen.last(), Some(&100));
        assert_eq!(progress.current(), 100);
    }

    #[tokio::test]
    async fn engine_unavailable_fails_every_file() {
        let previews = PreviewStore::new();
        let orchestrator = BatchOrchestrator::new(MockRecognizer::unavailable());
        let files: Vec<InputFile> =
            (0..3).map(|i| input(&previews, &format!("{i}.png"), tiny_png())).collect();
        let progress = BatchProgress::new();
        let results = orchestrator
            .run_batch(&files, &ProcessingOptions::default(), &progress)
            .await;

        assert_eq!(results.len(), 3);
        for r in &results {
            assert_eq!(
                r.error.as_deref(),
                Some("OCR recognition failed: OCR engine not available")
            );
        }
        assert_eq!(progress.current(), 100);
    }

    #[tokio::test]
    async fn field_detection_can_be_disabled() {
        let previews = PreviewStore::new();
        let orchestrator = BatchOrchestrator::new(MockRecognizer::new("SHOP\nTotal 3.00"));
        let files = vec![input(&previews, "a.png", tiny_png())];
        let opts = ProcessingOptions { auto_detect_fields: false, ..Default::default() };
        let results = orchestrator.run_batch(&files, &opts, &BatchProgress::new()).await;

        assert!(results[0].error.is_none());
        assert_eq!(results[0].text, "SHOP\nTotal 3.00");
        assert!(results[0].extracted_data.is_empty());
    }

    #[tokio::test]
    async fn uncompressed_bytes_reach_the_engine() {
        let previews = PreviewStore::new();
        let orchestrator = BatchOrchestrator::new(Staggered);
        // Not a decodable image, but compression is off so it is never decoded.
        let files = vec![input(&previews, "raw.png", vec![3, 0xAB, 0xCD])];
        let opts = ProcessingOptions { compress_image: false, ..Default::default() };
        let results = orchestrator.run_batch(&files, &opts, &BatchProgress::new()).await;
        assert_eq!(results[0].text, "file 3");
    }

    #[tokio::test]
    async fn empty_batch_completes() {
        let orchestrator = BatchOrchestrator::new(MockRecognizer::new(""));
        let progress = BatchProgress::new();
        let results = orchestrator
            .run_batch(&[], &ProcessingOptions::default(), &progress)
            .await;
        assert!(results.is_empty());
        assert_eq!(progress.current(), 100);
    }
}
