use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::preview::PreviewHandle;

/// A file as handed over by the selection / drop surface, before validation.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len() as u64,
            bytes,
        }
    }
}

/// A validated file admitted to a scan session.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub bytes: Arc<[u8]>,
    pub preview: PreviewHandle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub amount: Decimal,
}

/// Structured fields recovered from recognized text. Every field is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub total: Option<Decimal>,
    /// First date-like token, verbatim.
    pub date: Option<String>,
    pub merchant: Option<String>,
    pub tax: Option<Decimal>,
    pub items: Vec<LineItem>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// The raw date token read as a calendar date, if it can be.
    pub fn interpreted_date(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(scanlet_core::interpret_date)
    }
}

/// Output of recognizing one image.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOutput {
    pub text: String,
    /// Highest recognition-phase fraction observed, 0.0–1.0.
    pub progress: f32,
}

/// One entry of a batch's result set. Either `error` is `None` and
/// `extracted_data` holds whatever was found, or `error` is set and both `text`
/// and `extracted_data` are empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Index of the file within the batch at launch time.
    pub id: usize,
    pub file_name: String,
    pub text: String,
    pub extracted_data: ExtractedFields,
    pub preview: PreviewHandle,
    pub error: Option<String>,
}

impl ScanResult {
    pub fn succeeded(
        id: usize,
        file: &InputFile,
        text: String,
        extracted_data: ExtractedFields,
    ) -> Self {
        Self {
            id,
            file_name: file.name.clone(),
            text,
            extracted_data,
            preview: file.preview,
            error: None,
        }
    }

    pub fn failed(id: usize, file: &InputFile, error: impl Into<String>) -> Self {
        Self {
            id,
            file_name: file.name.clone(),
            text: String::new(),
            extracted_data: ExtractedFields::default(),
            preview: file.preview,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
