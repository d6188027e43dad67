pub mod config;
pub mod date;
pub mod money;
pub mod options;

pub use config::{ConfigError, IngestLimits, NormalizeSettings, ScanConfig};
pub use date::interpret_date;
pub use money::parse_amount;
pub use options::{LanguageSet, OptionsError, ProcessingOptions};
