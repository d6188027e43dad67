use std::sync::Arc;
use tokio::sync::watch;

/// Batch-wide percentage contributed by file `index` of `total` at local
/// fraction `fraction`.
pub fn batch_percent(index: usize, fraction: f32, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    let pct = (index as f64 + fraction as f64) / total as f64 * 100.0;
    pct.round().clamp(0.0, 100.0) as u8
}

/// Single batch progress value, 0–100, published to any number of subscribers.
///
/// Values only ever move up within a run: every update is folded in with `max`.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    tx: Arc<watch::Sender<u8>>,
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchProgress {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> u8 {
        *self.tx.borrow()
    }

    /// Start of a new run.
    pub fn reset(&self) {
        self.tx.send_replace(0);
    }

    /// Fold in a candidate percentage. Returns `true` if the published value rose.
    pub fn record(&self, percent: u8) -> bool {
        let percent = percent.min(100);
        self.tx.send_if_modified(|current| {
            if percent > *current {
                *current = percent;
                true
            } else {
                false
            }
        })
    }

    pub fn finish(&self) {
        self.record(100);
    }

    pub fn for_file(&self, index: usize, total: usize) -> FileProgress {
        FileProgress { index, total, batch: self.clone() }
    }
}

/// Per-file progress observer. Reports local fractions that the batch folds into
/// its single percentage.
#[derive(Debug, Clone)]
pub struct FileProgress {
    index: usize,
    total: usize,
    batch: BatchProgress,
}

impl FileProgress {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn report(&self, fraction: f32) {
        self.batch.record(batch_percent(self.index, fraction, self.total));
    }
}
