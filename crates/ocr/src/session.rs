use scanlet_core::{IngestLimits, ProcessingOptions, ScanConfig};

use crate::ingest::{self, IngestError};
use crate::pipeline::BatchOrchestrator;
use crate::preview::PreviewStore;
use crate::progress::BatchProgress;
use crate::recognizer::OcrBackend;
use crate::types::{InputFile, RawFile, ScanResult};

/// Snapshot of the session taken when a run starts.
///
/// `progress` belongs to this run alone, so a superseded run that is still
/// finishing can never move the percentage an observer of a newer run sees.
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub generation: u64,
    pub files: Vec<InputFile>,
    pub options: ProcessingOptions,
    pub progress: BatchProgress,
}

#[derive(Debug, Default)]
pub struct IngestSummary {
    pub accepted: usize,
    pub rejected: Vec<IngestError>,
}

/// Owner of the pending files, the current result set, and the preview handles
/// behind both.
///
/// Every run recomputes the whole pending set and replaces the result list
/// wholesale. Each run is tagged with a generation; a completion whose generation
/// is no longer current (because a newer run started or the session was cleared
/// meanwhile) is discarded.
#[derive(Debug)]
pub struct ScanSession {
    files: Vec<InputFile>,
    results: Vec<ScanResult>,
    options: ProcessingOptions,
    limits: IngestLimits,
    previews: PreviewStore,
    generation: u64,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new(&ScanConfig::default())
    }
}

impl ScanSession {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            files: Vec::new(),
            results: Vec::new(),
            options: config.options.clone(),
            limits: config.limits,
            previews: PreviewStore::new(),
            generation: 0,
        }
    }

    pub fn files(&self) -> &[InputFile] {
        &self.files
    }

    pub fn results(&self) -> &[ScanResult] {
        &self.results
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    /// Takes effect from the next run.
    pub fn set_options(&mut self, options: ProcessingOptions) {
        self.options = options;
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Validate and append files. Nothing is admitted when the submission exceeds
    /// the per-upload count; otherwise rejected files are returned one error each.
    pub fn ingest(&mut self, files: Vec<RawFile>) -> Result<IngestSummary, IngestError> {
        let report = ingest::validate(files, &self.limits, &self.previews)?;
        let accepted = report.accepted.len();
        self.files.extend(report.accepted);
        tracing::info!(
            "Ingested {accepted} file(s), rejected {}; {} pending",
            report.rejected.len(),
            self.files.len()
        );
        Ok(IngestSummary { accepted, rejected: report.rejected })
    }

    /// Start a run over every pending file with the current options.
    pub fn begin_run(&mut self) -> BatchRun {
        self.generation += 1;
        BatchRun {
            generation: self.generation,
            files: self.files.clone(),
            options: self.options.clone(),
            progress: BatchProgress::new(),
        }
    }

    /// Publish a run's results. Returns `false`, leaving the current results
    /// untouched, when the run is stale. Results for files removed while the
    /// run was in flight are dropped.
    pub fn complete_run(&mut self, generation: u64, results: Vec<ScanResult>) -> bool {
        if generation != self.generation {
            tracing::warn!(
                "Discarding {} result(s) from stale run {generation} (current {})",
                results.len(),
                self.generation
            );
            return false;
        }
        let before = results.len();
        self.results = results;
        self.results.retain(|r| self.previews.is_live(&r.preview));
        if self.results.len() < before {
            tracing::debug!(
                "Dropped {} result(s) for files removed during run {generation}",
                before - self.results.len()
            );
        }
        true
    }

    /// Begin a run, process it, and publish the results. Callers that want live
    /// progress drive `begin_run` and `complete_run` themselves and subscribe to
    /// `BatchRun::progress`.
    pub async fn run<R: OcrBackend + 'static>(
        &mut self,
        orchestrator: &BatchOrchestrator<R>,
    ) -> &[ScanResult] {
        let run = self.begin_run();
        let results = orchestrator.run_batch(&run.files, &run.options, &run.progress).await;
        self.complete_run(run.generation, results);
        &self.results
    }

    /// Drop one pending file, release its preview, and drop its result.
    /// Does not re-run anything. A run already in flight stays current and its
    /// other results are still published.
    pub fn remove_file(&mut self, index: usize) -> Option<InputFile> {
        if index >= self.files.len() {
            return None;
        }
        let file = self.files.remove(index);
        self.results.retain(|r| r.preview != file.preview);
        self.previews.revoke(&file.preview);
        tracing::info!("Removed {} from pending files", file.name);
        Some(file)
    }

    /// Release every preview and empty both the file and result lists.
    pub fn clear(&mut self) {
        for file in self.files.drain(..) {
            self.previews.revoke(&file.preview);
        }
        self.results.clear();
        self.generation += 1;
        tracing::info!("Cleared scan session");
    }
}
