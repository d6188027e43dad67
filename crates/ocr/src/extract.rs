use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use scanlet_core::parse_amount;

use crate::types::{ExtractedFields, LineItem};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_total,
    r"(?i)\b(?:total|amount\s+due|balance|amnt|ttl|sum)\b\s*:?\s*[$€£¥]?\s*(\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2})\b");
re!(re_tax,
    r"(?i)\b(?:tax|gst|hst|vat|tps|tvq)\b\s*:?\s*[$€£¥]?\s*(\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2})\b");
re!(re_date,
    r"\b(?:\d{4}[/.\-]\d{1,2}[/.\-]\d{1,2}|\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4})\b");
re!(re_summary_line,
    r"(?i)\b(?:total|sub\s*-?\s*total|amount\s+due|balance|amnt|ttl|sum|tax|gst|hst|vat|tps|tvq|change)\b");
re!(re_line_item,
    r"^(.*\S)\s+[$€£¥]?\s*(\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2})$");

// ── Public extraction API ─────────────────────────────────────────────────────

pub struct Extractor;

impl Extractor {
    /// Extract structured fields from raw OCR text. Never fails: anything not
    /// found stays `None` / empty.
    pub fn extract(ocr_text: &str) -> ExtractedFields {
        ExtractedFields {
            total: Self::extract_total(ocr_text),
            date: Self::extract_date(ocr_text),
            merchant: Self::extract_merchant(ocr_text),
            tax: Self::extract_tax(ocr_text),
            items: Self::extract_items(ocr_text),
        }
    }

    // ── Amounts ───────────────────────────────────────────────────────────────

    /// Last anchored amount: subtotals are printed before the final total.
    fn extract_total(text: &str) -> Option<Decimal> {
        last_amount(re_total(), text)
    }

    fn extract_tax(text: &str) -> Option<Decimal> {
        last_amount(re_tax(), text)
    }

    // ── Date ─────────────────────────────────────────────────────────────────

    fn extract_date(text: &str) -> Option<String> {
        re_date().find(text).map(|m| m.as_str().to_string())
    }

    // ── Merchant ──────────────────────────────────────────────────────────────

    /// First non-blank line ahead of the first date token, or the first
    /// non-blank line overall when the text has no date.
    fn extract_merchant(text: &str) -> Option<String> {
        let head = match re_date().find(text) {
            Some(m) => &text[..m.start()],
            None => text,
        };
        head.lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
    }

    // ── Line items ────────────────────────────────────────────────────────────

    fn extract_items(text: &str) -> Vec<LineItem> {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter(|l| !re_summary_line().is_match(l))
            .filter_map(|l| {
                let c = re_line_item().captures(l)?;
                let description = c.get(1)?.as_str().trim().to_string();
                let amount = parse_amount(c.get(2)?.as_str())?;
                Some(LineItem { description, amount })
            })
            .collect()
    }
}

fn last_amount(re: &Regex, text: &str) -> Option<Decimal> {
    re.captures_iter(text)
        .filter_map(|c| parse_amount(c.get(1)?.as_str()))
        .last()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
