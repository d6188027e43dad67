use scanlet_core::IngestLimits;
use std::sync::Arc;
use thiserror::Error;

use crate::preview::PreviewStore;
use crate::types::{InputFile, RawFile};

/// Rejections raised at the ingestion boundary, before any processing starts.
/// These never become `ScanResult`s.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("Too many files: {count} submitted, at most {limit} per upload")]
    TooManyFiles { count: usize, limit: usize },
    #[error("{name}: unsupported file type '{mime_type}', only images are accepted")]
    UnsupportedType { name: String, mime_type: String },
    #[error("{name}: file is {size_bytes} bytes, limit is {limit} bytes")]
    TooLarge { name: String, size_bytes: u64, limit: u64 },
}

/// Outcome of one ingestion: the admitted files plus one error per rejected file.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub accepted: Vec<InputFile>,
    pub rejected: Vec<IngestError>,
}

/// Validate a submission. The count limit applies to the whole submission and
/// admits nothing when exceeded; type and size limits apply per file.
/// Each admitted file gets a live preview handle from `previews`.
pub fn validate(
    files: Vec<RawFile>,
    limits: &IngestLimits,
    previews: &PreviewStore,
) -> Result<IngestReport, IngestError> {
    if files.len() > limits.max_files_per_ingest {
        return Err(IngestError::TooManyFiles {
            count: files.len(),
            limit: limits.max_files_per_ingest,
        });
    }

    let mut report = IngestReport::default();
    for raw in files {
        match check(&raw, limits) {
            Ok(()) => {
                let bytes: Arc<[u8]> = raw.bytes.into();
                let preview = previews.create(Arc::clone(&bytes));
                report.accepted.push(InputFile {
                    name: raw.name,
                    mime_type: raw.mime_type,
                    size_bytes: raw.size_bytes,
                    bytes,
                    preview,
                });
            }
            Err(e) => {
                tracing::warn!("Rejected at ingestion: {e}");
                report.rejected.push(e);
            }
        }
    }
    Ok(report)
}

fn check(raw: &RawFile, limits: &IngestLimits) -> Result<(), IngestError> {
    if !raw.mime_type.starts_with("image/") {
        return Err(IngestError::UnsupportedType {
            name: raw.name.clone(),
            mime_type: raw.mime_type.clone(),
        });
    }
    // Trust whichever is larger: the declared size or the bytes actually present.
    let size_bytes = raw.size_bytes.max(raw.bytes.len() as u64);
    if size_bytes > limits.max_file_bytes {
        return Err(IngestError::TooLarge {
            name: raw.name.clone(),
            size_bytes,
            limit: limits.max_file_bytes,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str, size: usize) -> RawFile {
        RawFile::new(name, "image/png", vec![0; size])
    }

    #[test]
    fn eleven_files_rejected_before_anything_is_admitted() {
        let previews = PreviewStore::new();
        let files: Vec<RawFile> = (0..11).map(|i| png(&format!("{i}.png"), 8)).collect();
        let err = validate(files, &IngestLimits::default(), &previews).unwrap_err();
        assert_eq!(err, IngestError::TooManyFiles { count: 11, limit: 10 });
        assert_eq!(previews.live_count(), 0);
    }

    #[test]
    fn ten_files_are_accepted() {
        let previews = PreviewStore::new();
        let files: Vec<RawFile> = (0..10).map(|i| png(&format!("{i}.png"), 8)).collect();
        let report = validate(files, &IngestLimits::default(), &previews).unwrap();
        assert_eq!(report.accepted.len(), 10);
        assert!(report.rejected.is_empty());
        assert_eq!(previews.live_count(), 10);
    }

    #[test]
    fn oversize_png_is_rejected_individually() {
        let previews = PreviewStore::new();
        let big = png("big.png", 12 * 1024 * 1024);
        let report =
            validate(vec![png("ok.png", 16), big], &IngestLimits::default(), &previews).unwrap();
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.accepted[0].name, "ok.png");
        assert!(matches!(
            &report.rejected[..],
            [IngestError::TooLarge { name, .. }] if name == "big.png"
        ));
        assert_eq!(previews.live_count(), 1);
    }

    #[test]
    fn declared_size_counts() {
        let mut raw = png("liar.png", 4);
        raw.size_bytes = 11 * 1024 * 1024;
        let report = validate(vec![raw], &IngestLimits::default(), &PreviewStore::new()).unwrap();
        assert!(report.accepted.is_empty());
        assert_eq!(report.rejected.len(), 1);
    }

    #[test]
    fn exactly_at_limit_is_accepted() {
        let limits = IngestLimits { max_file_bytes: 64, ..Default::default() };
        let report = validate(vec![png("edge.png", 64)], &limits, &PreviewStore::new()).unwrap();
        assert_eq!(report.accepted.len(), 1);
    }

    #[test]
    fn non_image_is_rejected() {
        let raw = RawFile::new("notes.pdf", "application/pdf", vec![1, 2, 3]);
        let report = validate(vec![raw], &IngestLimits::default(), &PreviewStore::new()).unwrap();
        assert!(report.accepted.is_empty());
        assert_eq!(
            report.rejected,
            vec![IngestError::UnsupportedType {
                name: "notes.pdf".into(),
                mime_type: "application/pdf".into()
            }]
        );
    }

    #[test]
    fn accepted_file_preview_resolves_to_bytes() {
        let previews = PreviewStore::new();
        let raw = RawFile::new("a.jpg", "image/jpeg", vec![7, 8, 9]);
        let report = validate(vec![raw], &IngestLimits::default(), &previews).unwrap();
        let file = &report.accepted[0];
        assert_eq!(previews.resolve(&file.preview).as_deref(), Some(&[7u8, 8, 9][..]));
        assert_eq!(file.size_bytes, 3);
    }
}
