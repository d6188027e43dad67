pub mod extract;
pub mod ingest;
pub mod pipeline;
pub mod preprocess;
pub mod preview;
pub mod progress;
pub mod recognizer;
pub mod session;
pub mod types;

pub use extract::Extractor;
pub use ingest::{IngestError, IngestReport};
pub use pipeline::{BatchOrchestrator, PipelineError};
pub use preprocess::{NormalizeError, NormalizedImage, Normalizer};
pub use preview::{PreviewHandle, PreviewStore};
pub use progress::{BatchProgress, FileProgress};
pub use recognizer::{
    EngineEvent, EnginePhase, MockRecognizer, OcrBackend, OcrExecutor, RecognitionError,
};
pub use session::{BatchRun, IngestSummary, ScanSession};
pub use types::{ExtractedFields, InputFile, LineItem, RawFile, RecognitionOutput, ScanResult};

pub use scanlet_core::{LanguageSet, ProcessingOptions, ScanConfig};
