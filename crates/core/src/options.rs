use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_LANGUAGE: &str = "eng";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("At least one OCR language is required")]
    NoLanguages,
    #[error("Invalid language code: '{0}'")]
    InvalidLanguage(String),
}

/// Non-empty, ordered set of OCR language codes (e.g. `eng`, `fra`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LanguageSet(BTreeSet<String>);

impl LanguageSet {
    pub fn new<I, S>(codes: I) -> Result<Self, OptionsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for code in codes {
            let code: String = code.into();
            let code = code.trim().to_lowercase();
            if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(OptionsError::InvalidLanguage(code));
            }
            set.insert(code);
        }
        if set.is_empty() {
            return Err(OptionsError::NoLanguages);
        }
        Ok(Self(set))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for LanguageSet {
    fn default() -> Self {
        Self(BTreeSet::from([DEFAULT_LANGUAGE.to_string()]))
    }
}

/// Joined with `+`, the form Tesseract expects for multi-language models.
impl fmt::Display for LanguageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join("+"))
    }
}

impl TryFrom<Vec<String>> for LanguageSet {
    type Error = OptionsError;
    fn try_from(codes: Vec<String>) -> Result<Self, Self::Error> {
        LanguageSet::new(codes)
    }
}

impl From<LanguageSet> for Vec<String> {
    fn from(set: LanguageSet) -> Self {
        set.0.into_iter().collect()
    }
}

/// Per-run configuration. A batch run snapshots this value; changes only apply to
/// the next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    pub languages: LanguageSet,
    pub compress_image: bool,
    pub auto_detect_fields: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            languages: LanguageSet::default(),
            compress_image: true,
            auto_detect_fields: true,
        }
    }
}
